use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use tracing::{info, warn};

use crate::app::Services;
use crate::ui::components::Toast;
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// Where the backend serves the redirect for a short code
pub fn target_url(api_url: &str, code: &str) -> String {
  format!("{}/{}", api_url.trim_end_matches('/'), code)
}

/// `/s/:code`: hands the short link to the browser, which follows the
/// backend redirect
pub struct RedirectView {
  services: Services,
  target: String,
  opened: bool,
}

impl RedirectView {
  pub fn new(code: &str, services: Services) -> Self {
    Self {
      target: target_url(&services.config.api.url, code),
      opened: false,
      services,
    }
  }

  fn open(&mut self) {
    self.opened = true;
    let target = self.target.clone();
    let services = self.services.clone();
    tokio::task::spawn_blocking(move || match open::that(&target) {
      Ok(()) => info!(%target, "opened in browser"),
      Err(e) => {
        warn!(%target, error = %e, "failed to open browser");
        services.notify(Toast::error(format!("Could not open {}", target)));
      }
    });
  }
}

impl View for RedirectView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('o') | KeyCode::Enter => {
        self.open();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let lines = vec![
      Line::raw(""),
      Line::styled("Redirecting...", Style::default().fg(Color::Cyan).bold()),
      Line::raw(""),
      Line::raw(self.target.as_str()),
      Line::raw(""),
      Line::styled(
        "<o> open again   <q> back",
        Style::default().fg(Color::DarkGray),
      ),
    ];
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
  }

  fn breadcrumb_label(&self) -> String {
    "Redirect".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if !self.opened {
      self.open();
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("q", "back")]
  }
}
