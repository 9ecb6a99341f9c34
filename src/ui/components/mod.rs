mod command_input;
mod form;
mod input;
mod key_result;
mod toast;

pub use command_input::{CommandEvent, CommandInput};
pub use form::{Form, FormEvent};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use toast::{Toast, ToastKind, Toasts};
