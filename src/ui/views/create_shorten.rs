use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::sync::PoisonError;
use tracing::warn;

use crate::api::ShortenResponse;
use crate::app::Services;
use crate::hooks::shorten_url;
use crate::query::{Mutation, MutationState, QueryError};
use crate::ui::components::{Form, FormEvent, KeyResult, Toast};
use crate::ui::renderfns::{centered, short_link};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
  Close,
}

/// "Create new short link" dialog.
///
/// After a link is created it stays open showing the new URL; `c` copies it
/// and closes.
pub struct CreateShorten {
  services: Services,
  form: Form,
  mutation: Mutation<String, ShortenResponse>,
  created: Option<String>,
}

impl CreateShorten {
  pub fn new(services: Services) -> Self {
    let mutation = shorten_url(&services.ctx, &services.token());
    Self {
      form: Form::new().field("Enter URL"),
      mutation,
      created: None,
      services,
    }
  }

  pub fn created(&self) -> Option<&str> {
    self.created.as_deref()
  }

  pub fn is_pending(&self) -> bool {
    self.mutation.is_pending()
  }

  fn copy_created(&mut self) -> KeyResult<DialogEvent> {
    let Some(link) = self.created.clone() else {
      return KeyResult::Handled;
    };
    let result = self
      .services
      .clipboard
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .copy(&link);
    match result {
      Ok(()) => {
        self.services.notify(Toast::success("Short URL Copied to Clipboard"));
        KeyResult::Event(DialogEvent::Close)
      }
      Err(e) => {
        warn!(error = %e, "clipboard write failed");
        self.services.notify(Toast::error("Failed to copy URL"));
        KeyResult::Handled
      }
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<DialogEvent> {
    if self.created.is_some() {
      return match key.code {
        KeyCode::Char('c') | KeyCode::Enter => self.copy_created(),
        KeyCode::Esc | KeyCode::Char('q') => KeyResult::Event(DialogEvent::Close),
        _ => KeyResult::Handled,
      };
    }

    if self.is_pending() {
      return match key.code {
        KeyCode::Esc => KeyResult::Event(DialogEvent::Close),
        _ => KeyResult::Handled,
      };
    }

    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(values)) => {
        let url = values.into_iter().next().unwrap_or_default();
        self.mutation.mutate(url);
        KeyResult::Handled
      }
      KeyResult::Event(FormEvent::Cancelled) => KeyResult::Event(DialogEvent::Close),
      KeyResult::Handled | KeyResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Returns `true` if the state changed
  pub fn tick(&mut self) -> bool {
    if !self.mutation.poll() {
      return false;
    }
    match self.mutation.state() {
      MutationState::Success(created) => {
        self.created = Some(short_link(self.services.config.frontend_url(), &created.short_url));
        self.form.clear();
        self.services.notify(Toast::success("Short URL created!"));
      }
      MutationState::Error(QueryError::Validation(message)) => {
        self.services.notify(Toast::error(message.clone()));
      }
      MutationState::Error(e) => {
        warn!(error = %e, "shorten failed");
        self.services.notify(Toast::error("Create ShortURL Failed"));
      }
      MutationState::Idle | MutationState::Pending => {}
    }
    true
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let rect = centered(area, 64, self.form.height() + 6);
    frame.render_widget(Clear, rect);

    let block = Block::default()
      .title(" Create New Shorten Url ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(self.form.height()),
        Constraint::Min(1),
      ])
      .split(inner);

    self.form.render(frame, chunks[0], self.created.is_none() && !self.is_pending());

    let status = match (&self.created, self.is_pending()) {
      (Some(link), _) => Line::from(vec![
        Span::styled(link.as_str(), Style::default().fg(Color::Cyan).bold()),
        Span::styled("   <c> copy  <esc> close", Style::default().fg(Color::DarkGray)),
      ]),
      (None, true) => Line::styled("Creating...", Style::default().fg(Color::DarkGray)),
      (None, false) => Line::styled(
        "<enter> create  <esc> cancel",
        Style::default().fg(Color::DarkGray),
      ),
    };
    frame.render_widget(Paragraph::new(status), chunks[1]);
  }
}
