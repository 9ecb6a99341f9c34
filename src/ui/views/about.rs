use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::ui::view::{View, ViewAction};

const INTRO: &str = "ShortLink simplifies URL shortening for efficient sharing. \
  Generate, manage and track your shortened links from one place.";

const FEATURES: &[(&str, &str)] = &[
  (
    "Simple URL Shortening",
    "Create short, memorable URLs in a few keystrokes. Paste a link and get a \
     shortened version back, ready to share anywhere.",
  ),
  (
    "Powerful Analytics",
    "Track how each link performs with daily click counts, and see the total \
     across every link you own.",
  ),
  (
    "Enhanced Security",
    "Links are tied to your account. Every request is authorized with your \
     token, and nobody else can delete your links.",
  ),
  (
    "Fast and Reliable",
    "Short links redirect straight to their destination, so they keep working \
     wherever your audience opens them.",
  ),
];

#[derive(Default)]
pub struct AboutView {
  scroll: u16,
}

impl AboutView {
  pub fn new() -> Self {
    Self::default()
  }

  fn lines() -> Vec<Line<'static>> {
    let mut lines = vec![Line::raw(INTRO), Line::raw("")];
    for (title, body) in FEATURES {
      lines.push(Line::styled(*title, Style::default().fg(Color::Cyan).bold()));
      lines.push(Line::raw(*body));
      lines.push(Line::raw(""));
    }
    lines
  }
}

impl View for AboutView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new(Self::lines())
      .block(
        Block::default()
          .title(" About ShortLink ")
          .title_alignment(Alignment::Center)
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Blue)),
      )
      .wrap(Wrap { trim: true })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    "About".to_string()
  }
}
