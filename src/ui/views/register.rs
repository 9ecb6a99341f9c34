use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tracing::warn;

use crate::api::RegisterRequest;
use crate::app::Services;
use crate::hooks::register;
use crate::query::{Mutation, MutationState, QueryError};
use crate::routes::Route;
use crate::ui::components::{Form, FormEvent, KeyResult, Toast};
use crate::ui::renderfns::centered;
use crate::ui::view::{ShortcutInfo, View, ViewAction};

pub struct RegisterView {
  services: Services,
  form: Form,
  register: Mutation<RegisterRequest, String>,
}

impl RegisterView {
  pub fn new(services: Services) -> Self {
    Self {
      form: Form::new().field("UserName").field("Email").secret("Password"),
      register: register(&services.ctx),
      services,
    }
  }
}

impl View for RegisterView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.register.is_pending() {
      return ViewAction::None;
    }
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(values)) => {
        let [username, email, password] = <[String; 3]>::try_from(values).unwrap_or_default();
        self
          .register
          .mutate(RegisterRequest::user(&username, &email, &password));
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
      .title(" Register Here ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(self.form.height()), Constraint::Min(1)])
      .split(inner);
    let pending = self.register.is_pending();
    self.form.render(frame, chunks[0], !pending);

    let status = if pending {
      "Loading..."
    } else {
      "<enter> register  <esc> back  (have an account? :login)"
    };
    frame.render_widget(
      Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
      chunks[1],
    );
  }

  fn breadcrumb_label(&self) -> String {
    "Register".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if !self.register.poll() {
      return ViewAction::None;
    }
    match self.register.state() {
      MutationState::Success(_) => {
        self.form.clear();
        self.services.notify(Toast::success("Registration Successful"));
        ViewAction::Replace(Route::Login)
      }
      MutationState::Error(QueryError::Validation(message)) => {
        self.services.notify(Toast::error(message.clone()));
        ViewAction::None
      }
      MutationState::Error(e) => {
        warn!(error = %e, "registration failed");
        self.services.notify(Toast::error("Registration Failed!"));
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
