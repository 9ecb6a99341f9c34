use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, ListItem, Paragraph, Wrap};
use std::sync::PoisonError;
use std::time::Instant;
use tracing::{info, warn};

use crate::api::ShortUrlRecord;
use crate::app::Services;
use crate::clipboard::CopyIndicator;
use crate::hooks::{fetch_analytics_data, AnalyticsQuery, DeleteUrl, DeleteUrlConfig, FetchAnalyticsConfig};
use crate::qr::{self, Delivery};
use crate::query::{QueryError, QueryState};
use crate::routes::Route;
use crate::ui::components::Toast;
use crate::ui::renderfns::{draw_clicks_chart, format_created, short_link, truncate};

/// One row of the dashboard list and the actions available on it.
pub struct ShortenItem {
  record: ShortUrlRecord,
  services: Services,
  copied: CopyIndicator,
  /// Link whose analytics are open, empty when closed
  selected_url: String,
  analytics: AnalyticsQuery,
  delete: DeleteUrl,
}

impl ShortenItem {
  pub fn new(record: ShortUrlRecord, services: Services) -> Self {
    let analytics = Self::analytics_query(&services, "");
    let delete = DeleteUrl::new(
      &services.ctx,
      DeleteUrlConfig {
        token: services.token(),
        on_success: Some(Box::new({
          let services = services.clone();
          move |_: &str| services.notify(Toast::success("Short link deleted"))
        })),
        on_error: Some(Box::new({
          let services = services.clone();
          move |e: &QueryError, short_url: &str| {
            warn!(%short_url, error = %e, "delete failed");
            services.notify(Toast::error("Failed to delete short link"))
          }
        })),
      },
    );

    Self {
      record,
      copied: CopyIndicator::new(services.config.copy_feedback()),
      selected_url: String::new(),
      analytics,
      delete,
      services,
    }
  }

  fn analytics_query(services: &Services, short_url: &str) -> AnalyticsQuery {
    let nav = services.clone();
    let mut query = fetch_analytics_data(
      &services.ctx,
      FetchAnalyticsConfig {
        short_url: short_url.to_string(),
        token: services.token(),
        enabled: !short_url.is_empty(),
        on_error: Some(Box::new(move |e: &QueryError| {
          warn!(error = %e, "analytics fetch failed");
          nav.navigate(Route::Error);
        })),
      },
    );
    query.fetch();
    query
  }

  pub fn record(&self) -> &ShortUrlRecord {
    &self.record
  }

  /// Refresh with the latest server copy, keeping UI state
  pub fn set_record(&mut self, record: ShortUrlRecord) {
    self.record = record;
  }

  pub fn link(&self) -> String {
    short_link(self.services.config.frontend_url(), &self.record.short_url)
  }

  /// Actions are disabled while a delete is in flight
  pub fn is_busy(&self) -> bool {
    self.delete.is_pending()
  }

  pub fn is_copied(&self) -> bool {
    self.copied.is_copied()
  }

  pub fn analytics_open(&self) -> bool {
    !self.selected_url.is_empty()
  }

  pub fn analytics(&self) -> &AnalyticsQuery {
    &self.analytics
  }

  pub fn copy(&mut self, now: Instant) {
    if self.is_busy() {
      return;
    }
    let link = self.link();
    let result = self
      .services
      .clipboard
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .copy(&link);
    match result {
      Ok(()) => {
        self.copied.trigger(now);
        self.services.notify(Toast::success("Short URL copied!"));
      }
      Err(e) => {
        warn!(error = %e, "clipboard write failed");
        self.services.notify(Toast::error("Copy failed"));
      }
    }
  }

  /// Open or close the analytics chart for this link
  pub fn toggle_analytics(&mut self) {
    if self.is_busy() {
      return;
    }
    self.selected_url = if self.analytics_open() {
      String::new()
    } else {
      self.record.short_url.clone()
    };
    self.analytics = Self::analytics_query(&self.services, &self.selected_url);
  }

  /// Render the QR code off the UI thread, then share or download it
  pub fn export_qr(&self) {
    if self.is_busy() {
      return;
    }
    let link = self.link();
    let short_url = self.record.short_url.clone();
    let qr_config = self.services.config.qr.clone();
    let sharer = if qr_config.share {
      self.services.sharer.clone()
    } else {
      None
    };
    let services = self.services.clone();

    tokio::task::spawn_blocking(move || {
      let result = qr::qr_png(&link, qr_config.size, qr_config.scale).and_then(|png| {
        qr::export(&png, &short_url, sharer.as_deref(), &qr_config.download_dir())
      });
      match result {
        Ok(Delivery::Shared(path)) => {
          info!(path = %path.display(), "QR code shared");
          services.notify(Toast::success("QR code shared"));
        }
        Ok(Delivery::Downloaded(path)) => {
          services.notify(Toast::success(format!("QR code saved to {}", path.display())));
        }
        Err(e) => {
          warn!(error = %e, "QR export failed");
          services.notify(Toast::error("Failed to export QR code"));
        }
      }
    });
  }

  pub fn delete(&mut self) {
    if !self.is_busy() {
      self.delete.mutate(&self.record.short_url);
    }
  }

  /// Returns `true` if anything visible changed
  pub fn tick(&mut self, now: Instant) -> bool {
    let copied = self.copied.tick(now);
    let analytics = self.analytics.poll();
    let deleted = self.delete.poll();
    copied || analytics || deleted
  }

  pub fn list_item(&self, width: usize) -> ListItem<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    let mut title = vec![
      Span::styled(self.link(), Style::default().fg(Color::Cyan).bold()),
      Span::raw("  "),
      Span::styled(format!("{} clicks", self.record.click_count), Style::default().fg(Color::Green)),
      Span::raw("  "),
      Span::styled(format_created(&self.record.created_date), dim),
    ];
    if self.is_copied() {
      title.push(Span::styled("  Copied!", Style::default().fg(Color::Yellow)));
    }
    if self.is_busy() {
      title.push(Span::styled("  deleting...", Style::default().fg(Color::Red)));
    }
    if self.analytics_open() {
      title.push(Span::styled("  [analytics]", Style::default().fg(Color::Magenta)));
    }

    let original = Line::from(Span::styled(
      format!("  {}", truncate(&self.record.original_url, width.saturating_sub(4))),
      dim,
    ));
    ListItem::new(vec![Line::from(title), original])
  }

  /// Analytics panel: chart, loading state, or a hint
  pub fn render_analytics(&self, frame: &mut Frame, area: Rect) {
    if !self.analytics_open() {
      let hint = Paragraph::new("Press 'a' to show analytics for the selected link")
        .block(Block::default().borders(Borders::ALL).title(" Analytics "))
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
      frame.render_widget(hint, area);
      return;
    }

    let title = format!("/s/{}", self.selected_url);
    match self.analytics.state() {
      QueryState::Success(points) => draw_clicks_chart(frame, area, &title, points),
      QueryState::Error(e) => {
        let error = Paragraph::new(format!("Error: {}", e))
          .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title)))
          .style(Style::default().fg(Color::Red));
        frame.render_widget(error, area);
      }
      QueryState::Loading | QueryState::Idle => {
        let loading = Paragraph::new("Loading analytics...")
          .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title)))
          .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(loading, area);
      }
    }
  }
}
