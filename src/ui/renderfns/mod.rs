pub mod chart;
pub mod footer;
pub mod header;
pub mod utils;

pub use chart::draw_clicks_chart;
pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{centered, format_created, short_link, truncate};
