use ratatui::prelude::*;
use ratatui::symbols;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};

use crate::api::AnalyticsPoint;

/// Chart coordinates: x is days since the earliest point, y the count.
/// Points may arrive in any order. Days without clicks simply have no bar.
pub fn chart_data(points: &[AnalyticsPoint]) -> Vec<(f64, f64)> {
  let Some(start) = points.iter().map(|p| p.click_date).min() else {
    return Vec::new();
  };
  points
    .iter()
    .map(|p| {
      let day = (p.click_date - start).num_days() as f64;
      (day, p.count as f64)
    })
    .collect()
}

/// Upper x bound covering every bar, at least one day wide
fn x_max(data: &[(f64, f64)]) -> f64 {
  data.iter().map(|(x, _)| *x).fold(1.0, f64::max)
}

/// Bar chart of daily clicks inside a bordered block titled `title`
pub fn draw_clicks_chart(frame: &mut Frame, area: Rect, title: &str, points: &[AnalyticsPoint]) {
  let total: u64 = points.iter().map(|p| p.count).sum();
  let block = Block::default()
    .title(format!(" {} ({} clicks) ", title, total))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let dates = points.iter().map(|p| p.click_date);
  let (Some(first), Some(last)) = (dates.clone().min(), dates.max()) else {
    let empty = Paragraph::new("No clicks yet")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(empty, area);
    return;
  };

  let data = chart_data(points);
  let x_bound = x_max(&data);
  let y_max = points.iter().map(|p| p.count).max().unwrap_or(0).max(1) as f64;

  let dataset = Dataset::default()
    .marker(symbols::Marker::HalfBlock)
    .graph_type(GraphType::Bar)
    .style(Style::default().fg(Color::Magenta))
    .data(&data);

  let chart = Chart::new(vec![dataset])
    .block(block)
    .x_axis(
      Axis::default()
        .style(Style::default().fg(Color::DarkGray))
        .bounds([0.0, x_bound])
        .labels([
          first.format("%Y-%m-%d").to_string(),
          last.format("%Y-%m-%d").to_string(),
        ]),
    )
    .y_axis(
      Axis::default()
        .style(Style::default().fg(Color::DarkGray))
        .bounds([0.0, y_max])
        .labels(["0".to_string(), format!("{}", y_max as u64)]),
    );

  frame.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  fn point(date: &str, count: u64) -> AnalyticsPoint {
    AnalyticsPoint {
      click_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
      count,
    }
  }

  #[test]
  fn test_chart_data_keeps_gaps() {
    let data = chart_data(&[point("2024-01-01", 3), point("2024-01-04", 1)]);
    assert_eq!(data, vec![(0.0, 3.0), (3.0, 1.0)]);
  }

  #[test]
  fn test_unordered_points_stay_inside_axis() {
    let data = chart_data(&[
      point("2024-01-05", 2),
      point("2024-01-01", 3),
      point("2024-01-03", 1),
    ]);
    assert_eq!(data, vec![(4.0, 2.0), (0.0, 3.0), (2.0, 1.0)]);
    assert_eq!(x_max(&data), 4.0);
  }

  #[test]
  fn test_x_max_single_day() {
    assert_eq!(x_max(&chart_data(&[point("2024-01-01", 1)])), 1.0);
  }

  #[test]
  fn test_chart_data_empty() {
    assert!(chart_data(&[]).is_empty());
  }
}
