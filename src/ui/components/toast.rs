use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_VISIBLE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Success,
  Error,
  Info,
}

/// A transient message shown in the corner of the screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
  pub kind: ToastKind,
  pub message: String,
}

impl Toast {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      kind: ToastKind::Success,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      kind: ToastKind::Error,
      message: message.into(),
    }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self {
      kind: ToastKind::Info,
      message: message.into(),
    }
  }

  fn color(&self) -> Color {
    match self.kind {
      ToastKind::Success => Color::Green,
      ToastKind::Error => Color::Red,
      ToastKind::Info => Color::Cyan,
    }
  }
}

/// Queue of visible toasts, oldest first
#[derive(Debug)]
pub struct Toasts {
  ttl: Duration,
  items: VecDeque<(Toast, Instant)>,
}

impl Toasts {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      items: VecDeque::new(),
    }
  }

  pub fn push(&mut self, toast: Toast, now: Instant) {
    self.items.push_back((toast, now + self.ttl));
    while self.items.len() > MAX_VISIBLE {
      self.items.pop_front();
    }
  }

  /// Drop expired toasts. Returns `true` if any were removed.
  pub fn tick(&mut self, now: Instant) -> bool {
    let before = self.items.len();
    self.items.retain(|(_, expires)| *expires > now);
    self.items.len() != before
  }

  pub fn visible(&self) -> impl Iterator<Item = &Toast> {
    self.items.iter().map(|(toast, _)| toast)
  }

  /// Render stacked in the top-right corner of `area`
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = 40.min(area.width);
    let mut y = area.y;
    for toast in self.visible() {
      let height = 3;
      if y + height > area.y + area.height {
        break;
      }
      let rect = Rect::new(area.x + area.width - width, y, width, height);
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(toast.color()));
      let paragraph = Paragraph::new(toast.message.as_str())
        .block(block)
        .style(Style::default().fg(toast.color()))
        .wrap(Wrap { trim: true });

      frame.render_widget(Clear, rect);
      frame.render_widget(paragraph, rect);
      y += height;
    }
  }
}
