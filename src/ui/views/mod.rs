mod about;
mod create_shorten;
mod dashboard;
mod error;
mod landing;
mod login;
mod redirect;
mod register;
mod shorten_item;

pub use about::AboutView;
pub use dashboard::DashboardView;
pub use error::ErrorView;
pub use landing::LandingView;
pub use login::LoginView;
pub use redirect::RedirectView;
pub use register::RegisterView;

use crate::app::Services;
use crate::routes::Route;
use crate::ui::view::View;

/// Construct the view for an already guarded route
pub fn build(route: &Route, services: &Services) -> Box<dyn View> {
  match route {
    Route::Landing => Box::new(LandingView::new(services.ctx.auth.is_logged_in())),
    Route::About => Box::new(AboutView::new()),
    Route::Register => Box::new(RegisterView::new(services.clone())),
    Route::Login => Box::new(LoginView::new(services.clone())),
    Route::Dashboard => Box::new(DashboardView::new(services.clone())),
    Route::Redirect(code) => Box::new(RedirectView::new(code, services.clone())),
    Route::Error => Box::new(ErrorView::new()),
    Route::NotFound(path) => Box::new(ErrorView::not_found(path)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::FakeApi;
  use crate::app::tests::{services, RecordingClipboard};
  use std::sync::Arc;

  #[tokio::test]
  async fn test_breadcrumbs() {
    let (services, _rx, _) = services(Arc::new(FakeApi::default()), RecordingClipboard::default());
    let label = |route: Route| build(&route, &services).breadcrumb_label();

    assert_eq!(label(Route::Landing), "Home");
    assert_eq!(label(Route::Dashboard), "Dashboard");
    assert_eq!(label(Route::Error), "Error");
    assert_eq!(label(Route::NotFound("/x".to_string())), "Not found /x");
  }
}
