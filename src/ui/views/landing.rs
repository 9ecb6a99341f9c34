use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::routes::Route;
use crate::ui::view::{ShortcutInfo, View, ViewAction};

const CARDS: &[(&str, &str)] = &[
  (
    "Simple URL Shortening",
    "Paste a long link and get a short, memorable one back.",
  ),
  (
    "Powerful Analytics",
    "See how often each link is opened, day by day.",
  ),
  (
    "Enhanced Security",
    "Your links live behind your account and a signed token.",
  ),
  (
    "Fast and Reliable",
    "Short links redirect straight to the original address.",
  ),
];

pub struct LandingView {
  logged_in: bool,
}

impl LandingView {
  pub fn new(logged_in: bool) -> Self {
    Self { logged_in }
  }
}

impl View for LandingView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('d') | KeyCode::Enter => ViewAction::Push(Route::Dashboard),
      KeyCode::Char('l') if !self.logged_in => ViewAction::Push(Route::Login),
      KeyCode::Char('s') if !self.logged_in => ViewAction::Push(Route::Register),
      KeyCode::Char('a') => ViewAction::Push(Route::About),
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(7), Constraint::Min(4)])
      .split(area);

    let mut hero = vec![
      Line::styled(
        "Manage Links, Simplify Your Life",
        Style::default().fg(Color::Cyan).bold(),
      ),
      Line::raw(""),
      Line::raw("ShortLink turns long URLs into short ones you can share, and tracks every click."),
      Line::raw(""),
    ];
    let action = if self.logged_in {
      "<enter> open your dashboard   <a> about"
    } else {
      "<l> log in   <s> sign up   <a> about"
    };
    hero.push(Line::styled(action, Style::default().fg(Color::DarkGray)));

    frame.render_widget(
      Paragraph::new(hero)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM)),
      chunks[0],
    );

    let constraints: Vec<Constraint> = CARDS.iter().map(|_| Constraint::Ratio(1, CARDS.len() as u32)).collect();
    let cards = Layout::default()
      .direction(Direction::Horizontal)
      .constraints(constraints)
      .split(chunks[1]);

    for ((title, body), card) in CARDS.iter().zip(cards.iter()) {
      let paragraph = Paragraph::new(*body)
        .block(
          Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue))
            .title(format!(" {} ", title)),
        )
        .wrap(Wrap { trim: true });
      frame.render_widget(paragraph, *card);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Home".to_string()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "go to").with_priority(10),
      ShortcutInfo::new("a", "about").with_priority(20),
      ShortcutInfo::new("q", "quit").with_priority(30),
    ]
  }
}
