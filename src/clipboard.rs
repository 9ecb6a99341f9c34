//! Copying short links to the system clipboard.

use base64::Engine;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::{Duration, Instant};

pub trait Clipboard: Send {
  fn copy(&mut self, text: &str) -> io::Result<()>;
}

/// Sets the clipboard through the OSC 52 terminal escape, which works over
/// SSH and needs no platform clipboard library.
pub struct Osc52<W> {
  out: W,
}

impl Osc52<io::Stdout> {
  pub fn stdout() -> Self {
    Self { out: io::stdout() }
  }
}

impl<W: Write> Osc52<W> {
  pub fn new(out: W) -> Self {
    Self { out }
  }

  pub fn into_inner(self) -> W {
    self.out
  }
}

impl<W: Write + Send> Clipboard for Osc52<W> {
  fn copy(&mut self, text: &str) -> io::Result<()> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(text);
    write!(self.out, "\x1b]52;c;{}\x07", encoded)?;
    self.out.flush()
  }
}

/// "Copied!" feedback.
///
/// Every copy schedules its own reset; an earlier copy's reset still fires
/// even if a later copy happened in between.
#[derive(Debug)]
pub struct CopyIndicator {
  duration: Duration,
  resets: VecDeque<Instant>,
  copied: bool,
}

impl CopyIndicator {
  pub fn new(duration: Duration) -> Self {
    Self {
      duration,
      resets: VecDeque::new(),
      copied: false,
    }
  }

  pub fn trigger(&mut self, now: Instant) {
    self.copied = true;
    self.resets.push_back(now + self.duration);
  }

  /// Apply every reset due at `now`. Returns `true` if the flag changed.
  pub fn tick(&mut self, now: Instant) -> bool {
    let mut changed = false;
    while self.resets.front().is_some_and(|due| *due <= now) {
      self.resets.pop_front();
      if self.copied {
        self.copied = false;
        changed = true;
      }
    }
    changed
  }

  pub fn is_copied(&self) -> bool {
    self.copied
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_osc52_sequence() {
    let mut clipboard = Osc52::new(Vec::new());
    clipboard.copy("http://sho.rt/s/abc").unwrap();
    let written = String::from_utf8(clipboard.into_inner()).unwrap();
    assert_eq!(written, "\x1b]52;c;aHR0cDovL3Noby5ydC9zL2FiYw==\x07");
  }

  #[test]
  fn test_indicator_resets_after_exactly_three_seconds() {
    let start = Instant::now();
    let mut indicator = CopyIndicator::new(Duration::from_millis(3000));
    indicator.trigger(start);
    assert!(indicator.is_copied());

    assert!(!indicator.tick(start + Duration::from_millis(2999)));
    assert!(indicator.is_copied());

    assert!(indicator.tick(start + Duration::from_millis(3000)));
    assert!(!indicator.is_copied());
  }

  #[test]
  fn test_overlapping_copies_reset_independently() {
    let start = Instant::now();
    let mut indicator = CopyIndicator::new(Duration::from_millis(3000));
    indicator.trigger(start);
    indicator.trigger(start + Duration::from_millis(1000));

    // The first copy's reset clears the flag despite the second copy
    indicator.tick(start + Duration::from_millis(3000));
    assert!(!indicator.is_copied());

    // A copy after that is cleared again by the second reset
    indicator.trigger(start + Duration::from_millis(3500));
    indicator.tick(start + Duration::from_millis(4000));
    assert!(!indicator.is_copied());

    indicator.tick(start + Duration::from_millis(6500));
    assert!(!indicator.is_copied());
  }
}
