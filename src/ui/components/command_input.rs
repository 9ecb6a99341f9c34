use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Action};
use crate::routes::Route;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_ROWS: usize = 8;

/// Events emitted by command input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// Command or path submitted
  Submitted(String),
  /// Command cancelled
  Cancelled,
}

/// One palette row: what Enter submits and where it ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
  pub label: String,
  pub description: &'static str,
  /// Screen the route guard lands on, `None` for actions like `quit`
  pub target: Option<Route>,
  /// The guard sends this somewhere other than what was asked for
  pub redirected: bool,
}

impl Suggestion {
  fn new(label: String, description: &'static str, action: Action, logged_in: bool) -> Self {
    let (target, redirected) = match action {
      Action::Navigate(route) => {
        let landed = route.clone().guard(logged_in);
        let redirected = landed != route;
        (Some(landed), redirected)
      }
      _ => (None, false),
    };
    Self {
      label,
      description,
      target,
      redirected,
    }
  }
}

fn describe_path(route: &Route) -> &'static str {
  match route {
    Route::Redirect(_) => "Follow short link",
    Route::NotFound(_) => "Unknown path",
    _ => "Open page",
  }
}

/// `:` palette over commands and raw paths
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected: usize,
  logged_in: bool,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn value(&self) -> &str {
    self.input.value()
  }

  /// Route guards in the suggestions depend on this
  pub fn set_logged_in(&mut self, logged_in: bool) {
    self.logged_in = logged_in;
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.selected = 0;
  }

  fn close(&mut self) {
    self.active = false;
    self.input.clear();
    self.selected = 0;
  }

  /// Rows for the current input. A path gets a single row previewing
  /// where it resolves.
  pub fn suggestions(&self) -> Vec<Suggestion> {
    let value = self.input.value().trim();
    if value.starts_with('/') {
      let action = commands::resolve(value);
      let description = match &action {
        Action::Navigate(route) => describe_path(route),
        _ => "Open page",
      };
      return vec![Suggestion::new(
        value.to_string(),
        description,
        action,
        self.logged_in,
      )];
    }

    commands::get_suggestions(value)
      .into_iter()
      .map(|cmd| {
        Suggestion::new(
          cmd.name.to_string(),
          cmd.description,
          commands::resolve(cmd.name),
          self.logged_in,
        )
      })
      .collect()
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected
  }

  fn step(&mut self, forward: bool) {
    let len = self.suggestions().len();
    if len == 0 {
      return;
    }
    self.selected = if forward {
      (self.selected + 1) % len
    } else {
      (self.selected + len - 1) % len
    };
  }

  /// Handle a key event. Call this regardless of active state, `:` activates.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.close();
        return KeyResult::Event(CommandEvent::Cancelled);
      }
      KeyCode::Enter => {
        let submitted = self.resolve_command();
        self.close();
        return KeyResult::Event(CommandEvent::Submitted(submitted));
      }
      KeyCode::Tab | KeyCode::Down => {
        self.step(true);
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.step(false);
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.input.handle_key(key) {
      InputResult::Consumed => {
        self.selected = 0;
        KeyResult::Handled
      }
      InputResult::Submitted(_) | InputResult::Cancelled => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// The selected row's label, or the raw lowercased input when nothing
  /// matched so the app can report it as unknown.
  fn resolve_command(&self) -> String {
    match self.suggestions().into_iter().nth(self.selected) {
      Some(row) => row.label,
      None => self.input.value().trim().to_lowercase(),
    }
  }

  fn row(suggestion: &Suggestion) -> ListItem<'static> {
    let path = suggestion
      .target
      .as_ref()
      .map(Route::path)
      .unwrap_or_default();
    let path_style = if suggestion.redirected {
      Style::default().fg(Color::Yellow)
    } else {
      Style::default().fg(Color::Green)
    };
    let path = if suggestion.redirected {
      format!("-> {}", path)
    } else {
      path
    };

    ListItem::new(Line::from(vec![
      Span::styled(
        format!("{:<11}", suggestion.label),
        Style::default().fg(Color::Cyan),
      ),
      Span::styled(format!("{:<14}", path), path_style),
      Span::styled(suggestion.description, Style::default().fg(Color::DarkGray)),
    ]))
  }

  /// Render the palette at the top of `area` when active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let rows = suggestions.len().min(MAX_ROWS) as u16;
    let width = (area.width * 70 / 100).clamp(40, 72).min(area.width);
    let overlay = Rect::new(area.x + 1, area.y + 1, width, 3 + rows).intersection(area);

    frame.render_widget(Clear, overlay);
    let title = if self.logged_in {
      " Go to "
    } else {
      " Go to (logged out) "
    };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(title);
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);
    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let prompt = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(prompt), chunks[0]);

    if suggestions.is_empty() || chunks[1].height == 0 {
      return;
    }
    let items: Vec<ListItem> = suggestions.iter().take(MAX_ROWS).map(Self::row).collect();
    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default().with_selected(Some(self.selected));
    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(input: &mut CommandInput, s: &str) {
    for c in s.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn palette(logged_in: bool, text: &str) -> CommandInput {
    let mut input = CommandInput::new();
    input.set_logged_in(logged_in);
    input.activate();
    type_str(&mut input, text);
    input
  }

  #[test]
  fn test_inactive_ignores_keys() {
    let mut input = CommandInput::new();
    assert_eq!(input.handle_key(key(KeyCode::Char('j'))), KeyResult::NotHandled);
    assert_eq!(input.handle_key(key(KeyCode::Char(':'))), KeyResult::Handled);
    assert!(input.is_active());
  }

  #[test]
  fn test_submit_uses_selected_suggestion() {
    let mut input = palette(true, "dash");
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Submitted("dashboard".to_string()))
    );
    assert!(!input.is_active());
  }

  #[test]
  fn test_paths_are_submitted_verbatim() {
    let mut input = palette(false, "/s/AbC");
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Submitted("/s/AbC".to_string()))
    );
  }

  #[test]
  fn test_path_preview_shows_destination() {
    let input = palette(false, "/s/AbC");
    assert_eq!(
      input.suggestions(),
      vec![Suggestion {
        label: "/s/AbC".to_string(),
        description: "Follow short link",
        target: Some(Route::Redirect("AbC".to_string())),
        redirected: false,
      }]
    );

    let input = palette(false, "/nope");
    assert_eq!(input.suggestions()[0].description, "Unknown path");
  }

  #[test]
  fn test_suggestions_follow_route_guard() {
    let logged_out = palette(false, "dashboard");
    let row = &logged_out.suggestions()[0];
    assert_eq!(row.target, Some(Route::Login));
    assert!(row.redirected);

    let logged_in = palette(true, "dashboard");
    let row = &logged_in.suggestions()[0];
    assert_eq!(row.target, Some(Route::Dashboard));
    assert!(!row.redirected);

    let login = palette(true, "login");
    assert_eq!(login.suggestions()[0].target, Some(Route::Dashboard));
  }

  #[test]
  fn test_actions_have_no_path() {
    let input = palette(true, "quit");
    assert_eq!(input.suggestions()[0].target, None);
  }

  #[test]
  fn test_selection_wraps() {
    let mut input = palette(true, "");
    let len = input.suggestions().len();
    input.handle_key(key(KeyCode::Up));
    assert_eq!(input.selected_suggestion(), len - 1);
    input.handle_key(key(KeyCode::Down));
    assert_eq!(input.selected_suggestion(), 0);
  }

  #[test]
  fn test_unknown_input_is_lowercased() {
    let mut input = palette(true, "ZZZ");
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Submitted("zzz".to_string()))
    );
  }

  #[test]
  fn test_escape_cancels() {
    let mut input = palette(true, "ab");
    assert_eq!(
      input.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(CommandEvent::Cancelled)
    );
    assert_eq!(input.value(), "");
  }
}
