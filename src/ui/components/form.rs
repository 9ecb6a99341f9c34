use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// Enter on the last field; values in field order
  Submitted(Vec<String>),
  Cancelled,
}

#[derive(Debug, Clone)]
struct Field {
  label: &'static str,
  input: TextInput,
}

/// A vertical stack of labelled text inputs.
///
/// Tab / Down / Enter move to the next field, Shift-Tab / Up go back. Enter
/// on the last field submits.
#[derive(Debug, Clone, Default)]
pub struct Form {
  fields: Vec<Field>,
  focus: usize,
}

impl Form {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn field(mut self, label: &'static str) -> Self {
    self.fields.push(Field {
      label,
      input: TextInput::new(),
    });
    self
  }

  pub fn secret(mut self, label: &'static str) -> Self {
    self.fields.push(Field {
      label,
      input: TextInput::masked(),
    });
    self
  }

  pub fn focus(&self) -> usize {
    self.focus
  }

  pub fn values(&self) -> Vec<String> {
    self.fields.iter().map(|f| f.input.value().to_string()).collect()
  }

  pub fn clear(&mut self) {
    for field in &mut self.fields {
      field.input.clear();
    }
    self.focus = 0;
  }

  fn next(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + 1).min(self.fields.len() - 1);
    }
  }

  fn previous(&mut self) {
    self.focus = self.focus.saturating_sub(1);
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.next();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.previous();
        return KeyResult::Handled;
      }
      _ => {}
    }

    let Some(field) = self.fields.get_mut(self.focus) else {
      return KeyResult::NotHandled;
    };
    match field.input.handle_key(key) {
      InputResult::Consumed => KeyResult::Handled,
      InputResult::Submitted(_) => {
        if self.focus + 1 < self.fields.len() {
          self.next();
          KeyResult::Handled
        } else {
          KeyResult::Event(FormEvent::Submitted(self.values()))
        }
      }
      InputResult::Cancelled => KeyResult::Event(FormEvent::Cancelled),
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Height needed to draw every field
  pub fn height(&self) -> u16 {
    self.fields.len() as u16 * 3
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, enabled: bool) {
    let constraints: Vec<Constraint> = self.fields.iter().map(|_| Constraint::Length(3)).collect();
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints(constraints)
      .split(area);

    for (i, (field, row)) in self.fields.iter().zip(rows.iter()).enumerate() {
      let focused = enabled && i == self.focus;
      let border = if focused { Color::Yellow } else { Color::DarkGray };
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(format!(" {} ", field.label));

      let mut spans = vec![Span::raw(field.input.display())];
      if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow))); // Cursor
      }
      frame.render_widget(Paragraph::new(Line::from(spans)).block(block), *row);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(form: &mut Form, s: &str) {
    for c in s.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_enter_advances_then_submits() {
    let mut form = Form::new().field("Username").secret("Password");
    type_str(&mut form, "ann");
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert_eq!(form.focus(), 1);
    type_str(&mut form, "secret1");
    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::Submitted(vec![
        "ann".to_string(),
        "secret1".to_string()
      ]))
    );
  }

  #[test]
  fn test_focus_moves_and_clamps() {
    let mut form = Form::new().field("A").field("B");
    form.handle_key(key(KeyCode::BackTab));
    assert_eq!(form.focus(), 0);
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.focus(), 1);
  }

  #[test]
  fn test_escape_cancels() {
    let mut form = Form::new().field("Url");
    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancelled)
    );
  }
}
