use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::routes::Route;
use crate::ui::view::{ShortcutInfo, View, ViewAction};

const DEFAULT_MESSAGE: &str = "An unexpected error has occurred.";
const NOT_FOUND_MESSAGE: &str = "We can't seem to find the page you're looking for";

/// Generic error page, also used for unknown paths
pub struct ErrorView {
  message: String,
  path: Option<String>,
}

impl ErrorView {
  pub fn new() -> Self {
    Self {
      message: DEFAULT_MESSAGE.to_string(),
      path: None,
    }
  }

  pub fn not_found(path: &str) -> Self {
    Self {
      message: NOT_FOUND_MESSAGE.to_string(),
      path: Some(path.to_string()),
    }
  }

  pub fn message(&self) -> &str {
    &self.message
  }
}

impl View for ErrorView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('h') | KeyCode::Enter => ViewAction::Replace(Route::Landing),
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let mut lines = vec![
      Line::styled("Oops! Something went wrong", Style::default().fg(Color::Red).bold()),
      Line::raw(""),
      Line::raw(self.message.as_str()),
    ];
    if let Some(path) = &self.path {
      lines.push(Line::styled(path.as_str(), Style::default().fg(Color::DarkGray)));
    }
    lines.push(Line::raw(""));
    lines.push(Line::styled(
      "<h> back to home   <q> back",
      Style::default().fg(Color::DarkGray),
    ));

    let paragraph = Paragraph::new(lines)
      .alignment(Alignment::Center)
      .block(
        Block::default()
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Red)),
      )
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.path {
      Some(path) => format!("Not found {}", path),
      None => "Error".to_string(),
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("h", "home").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(20),
    ]
  }
}
