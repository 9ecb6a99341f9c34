use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tracing::{info, warn};

use crate::api::LoginRequest;
use crate::app::Services;
use crate::hooks::Login;
use crate::query::{MutationState, QueryError};
use crate::routes::Route;
use crate::ui::components::{Form, FormEvent, KeyResult, Toast};
use crate::ui::renderfns::centered;
use crate::ui::view::{ShortcutInfo, View, ViewAction};

pub struct LoginView {
  services: Services,
  form: Form,
  login: Login,
}

impl LoginView {
  pub fn new(services: Services) -> Self {
    Self {
      form: Form::new().field("Username").secret("Password"),
      login: Login::new(&services.ctx),
      services,
    }
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.login.is_pending() {
      return ViewAction::None;
    }
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(values)) => {
        let mut values = values.into_iter();
        self.login.mutate(LoginRequest {
          username: values.next().unwrap_or_default(),
          password: values.next().unwrap_or_default(),
        });
        ViewAction::None
      }
      KeyResult::Event(FormEvent::Cancelled) => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let rect = centered(area, 50, self.form.height() + 4);
    frame.render_widget(Clear, rect);
    let block = Block::default()
      .title(" Login Here ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(self.form.height()), Constraint::Min(1)])
      .split(inner);
    let pending = self.login.is_pending();
    self.form.render(frame, chunks[0], !pending);

    let status = if pending {
      "Loading..."
    } else {
      "<enter> login  <esc> back  (no account? :register)"
    };
    frame.render_widget(
      Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
      chunks[1],
    );
  }

  fn breadcrumb_label(&self) -> String {
    "Login".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if !self.login.poll() {
      return ViewAction::None;
    }
    match self.login.state() {
      MutationState::Success(_) => {
        info!("logged in");
        self.form.clear();
        self.services.notify(Toast::success("Login Successful!"));
        ViewAction::Replace(Route::Dashboard)
      }
      MutationState::Error(QueryError::Validation(message)) => {
        self.services.notify(Toast::error(message.clone()));
        ViewAction::None
      }
      MutationState::Error(e) => {
        warn!(error = %e, "login failed");
        self.services.notify(Toast::error("Login Failed!"));
        ViewAction::None
      }
      MutationState::Idle | MutationState::Pending => ViewAction::None,
    }
  }

  fn is_editing(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("tab", "next field").with_priority(10),
      ShortcutInfo::new("enter", "submit").with_priority(20),
      ShortcutInfo::new("esc", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::FakeApi;
  use crate::app::tests::{services_with_token, RecordingClipboard};
  use crate::event::Event;
  use crossterm::event::{KeyCode, KeyModifiers};
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn fill(view: &mut LoginView, username: &str, password: &str) {
    for c in username.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    for c in password.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
  }

  #[tokio::test]
  async fn test_login_goes_to_dashboard() {
    let api = Arc::new(FakeApi::default());
    let (services, mut rx, _) = services_with_token(api, RecordingClipboard::default(), None);
    let auth = services.ctx.auth.clone();
    let mut view = LoginView::new(services);

    fill(&mut view, "ann", "secret1");
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(view.tick(), ViewAction::Replace(Route::Dashboard));
    assert_eq!(auth.token(), "jwt-for-ann");
    assert!(matches!(
      rx.try_recv(),
      Ok(Event::Notify(toast)) if toast.message == "Login Successful!"
    ));
  }

  #[tokio::test]
  async fn test_bad_password_stays() {
    let api = Arc::new(FakeApi::default());
    let (services, mut rx, _) = services_with_token(api, RecordingClipboard::default(), None);
    let mut view = LoginView::new(services);

    fill(&mut view, "ann", "nope");
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(view.tick(), ViewAction::None);
    assert!(matches!(
      rx.try_recv(),
      Ok(Event::Notify(toast)) if toast.message == "Login Failed!"
    ));
  }
}
