pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use crate::auth::token_subject;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use renderfns::{draw_footer, draw_header};

/// Keep a list selection inside `0..len`, selecting the first row when
/// nothing is selected yet
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match (state.selected(), len) {
    (_, 0) => state.select(None),
    (None, _) => state.select(Some(0)),
    (Some(i), len) if i >= len => state.select(Some(len - 1)),
    _ => {}
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let area = frame.area();

  let content = if app.hides_chrome() {
    area
  } else {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Breadcrumb
      ])
      .split(area);

    let services = app.services();
    let config = services.config.clone();
    let auth = &services.ctx.auth;
    let user = auth
      .is_logged_in()
      .then(|| token_subject(&auth.token()).unwrap_or_else(|| "logged in".to_string()));
    let shortcuts = app
      .current_view_mut()
      .map(|view| view.shortcuts())
      .unwrap_or_default();

    draw_header(
      frame,
      chunks[0],
      config.title.as_deref().unwrap_or("ShortLink"),
      &config.api.url,
      user.as_deref(),
      &shortcuts,
    );
    draw_footer(frame, chunks[2], &app.breadcrumb());
    chunks[1]
  };

  if let Some(view) = app.current_view_mut() {
    view.render(frame, content);
  }

  app.command_input().render_overlay(frame, content);
  app.toasts().render(frame, content);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_selection_clamped() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(5));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
