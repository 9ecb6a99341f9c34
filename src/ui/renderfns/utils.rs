use chrono::NaiveDateTime;
use ratatui::prelude::*;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// The public URL of a short link
pub fn short_link(frontend_url: &str, short_url: &str) -> String {
  format!("{}/s/{}", frontend_url.trim_end_matches('/'), short_url)
}

/// "Jan 5, 2025" style date for list rows
pub fn format_created(date: &NaiveDateTime) -> String {
  date.format("%b %-d, %Y").to_string()
}

/// A `width` x `height` rect centered in `area`, clipped to fit
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}
