use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListState, Paragraph};
use std::time::Instant;

use crate::api::ShortUrlRecord;
use crate::app::Services;
use crate::hooks::{fetch_my_short_urls, fetch_total_clicks, MyUrlsQuery, TotalClicksQuery};
use crate::query::{QueryError, QueryState};
use crate::routes::Route;
use crate::ui::components::KeyResult;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::draw_clicks_chart;
use crate::ui::view::{ShortcutInfo, View, ViewAction};

use super::create_shorten::{CreateShorten, DialogEvent};
use super::shorten_item::ShortenItem;

/// Total clicks chart above the user's links
pub struct DashboardView {
  services: Services,
  urls: MyUrlsQuery,
  clicks: TotalClicksQuery,
  items: Vec<ShortenItem>,
  list_state: ListState,
  create: Option<CreateShorten>,
}

impl DashboardView {
  pub fn new(services: Services) -> Self {
    let token = services.token();
    let mut urls = fetch_my_short_urls(&services.ctx, &token);
    let mut clicks = fetch_total_clicks(&services.ctx, &token);
    urls.fetch();
    clicks.fetch();

    let mut view = Self {
      services,
      urls,
      clicks,
      items: Vec::new(),
      list_state: ListState::default(),
      create: None,
    };
    view.sync_items();
    view
  }

  pub fn items(&self) -> &[ShortenItem] {
    &self.items
  }

  pub fn is_creating(&self) -> bool {
    self.create.is_some()
  }

  fn selected(&mut self) -> Option<&mut ShortenItem> {
    let idx = self.list_state.selected()?;
    self.items.get_mut(idx)
  }

  /// Rebuild rows from the query data, keeping the UI state of rows whose
  /// link is still present
  fn sync_items(&mut self) {
    let records: Vec<ShortUrlRecord> = self.urls.data().cloned().unwrap_or_default();
    let mut previous = std::mem::take(&mut self.items);

    self.items = records
      .into_iter()
      .map(|record| {
        match previous
          .iter()
          .position(|item| item.record().short_url == record.short_url)
        {
          Some(pos) => {
            let mut item = previous.swap_remove(pos);
            item.set_record(record);
            item
          }
          None => ShortenItem::new(record, self.services.clone()),
        }
      })
      .collect();
    ensure_valid_selection(&mut self.list_state, self.items.len());
  }

  fn render_chart(&self, frame: &mut Frame, area: Rect) {
    match self.clicks.state() {
      QueryState::Success(points) => draw_clicks_chart(frame, area, "Total clicks", points),
      QueryState::Error(e) => {
        let error = Paragraph::new(format!("Failed to load clicks: {}", e))
          .block(Block::default().borders(Borders::ALL).title(" Total clicks "))
          .style(Style::default().fg(Color::Red));
        frame.render_widget(error, area);
      }
      QueryState::Loading | QueryState::Idle => {
        let loading = Paragraph::new("Loading...")
          .block(Block::default().borders(Borders::ALL).title(" Total clicks "))
          .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(loading, area);
      }
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    ensure_valid_selection(&mut self.list_state, self.items.len());

    let title = match self.urls.state() {
      QueryState::Loading => " My links (loading...) ".to_string(),
      QueryState::Error(e) => format!(" My links (error: {}) ", e),
      _ if self.urls.is_fetching() => format!(" My links ({}) refreshing... ", self.items.len()),
      _ => format!(" My links ({}) ", self.items.len()),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.items.is_empty() && !self.urls.is_loading() {
      let content = if self.urls.is_error() {
        "Failed to load links. Press 'r' to retry."
      } else {
        "No short links yet. Press 'n' to create one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<_> = self.items.iter().map(|item| item.list_item(width)).collect();
    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_analytics(&self, frame: &mut Frame, area: Rect) {
    let open = self.items.iter().find(|item| item.analytics_open());
    let selected = self.list_state.selected().and_then(|i| self.items.get(i));
    match open.or(selected) {
      Some(item) => item.render_analytics(frame, area),
      None => {
        let empty = Paragraph::new("")
          .block(Block::default().borders(Borders::ALL).title(" Analytics "));
        frame.render_widget(empty, area);
      }
    }
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(dialog) = &mut self.create {
      if let KeyResult::Event(DialogEvent::Close) = dialog.handle_key(key) {
        self.create = None;
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('c') | KeyCode::Enter => {
        if let Some(item) = self.selected() {
          item.copy(Instant::now());
        }
      }
      KeyCode::Char('a') => {
        if let Some(item) = self.selected() {
          item.toggle_analytics();
        }
      }
      KeyCode::Char('Q') => {
        if let Some(item) = self.selected() {
          item.export_qr();
        }
      }
      KeyCode::Char('d') => {
        if let Some(item) = self.selected() {
          item.delete();
        }
      }
      KeyCode::Char('n') => self.create = Some(CreateShorten::new(self.services.clone())),
      KeyCode::Char('r') => {
        self.urls.refetch();
        self.clicks.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(12), Constraint::Min(5)])
      .split(area);
    let columns = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
      .split(rows[1]);

    self.render_chart(frame, rows[0]);
    self.render_list(frame, columns[0]);
    self.render_analytics(frame, columns[1]);

    if let Some(dialog) = &self.create {
      dialog.render(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Dashboard".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    let now = Instant::now();
    for item in &mut self.items {
      item.tick(now);
    }
    if let Some(dialog) = &mut self.create {
      dialog.tick();
    }

    let urls_changed = self.urls.poll();
    self.clicks.poll();
    if urls_changed {
      self.sync_items();
    }

    let urls_denied = self.urls.take_new_error().is_some_and(QueryError::is_unauthorized);
    let clicks_denied = self.clicks.take_new_error().is_some_and(QueryError::is_unauthorized);
    if urls_denied || clicks_denied {
      return ViewAction::Push(Route::Error);
    }
    ViewAction::None
  }

  fn is_editing(&self) -> bool {
    self.create.is_some()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.create.is_some() {
      return vec![
        ShortcutInfo::new("enter", "create").with_priority(10),
        ShortcutInfo::new("esc", "close").with_priority(20),
      ];
    }
    vec![
      ShortcutInfo::new(":", "go to").with_priority(10),
      ShortcutInfo::new("n", "new").with_priority(20),
      ShortcutInfo::new("c", "copy").with_priority(30),
      ShortcutInfo::new("a", "analytics").with_priority(40),
      ShortcutInfo::new("Q", "qr").with_priority(50),
      ShortcutInfo::new("d", "delete").with_priority(60),
      ShortcutInfo::new("r", "refresh").with_priority(70),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{record, Calls, FakeApi};
  use crate::app::tests::{services, RecordingClipboard};
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn codes(view: &DashboardView) -> Vec<String> {
    view
      .items()
      .iter()
      .map(|item| item.record().short_url.clone())
      .collect()
  }

  async fn settle(view: &mut DashboardView) {
    tokio::time::sleep(Duration::from_millis(30)).await;
    view.tick();
  }

  #[tokio::test]
  async fn test_lists_newest_first() {
    let api = Arc::new(FakeApi::with_urls(vec![
      record("old", "2024-01-01"),
      record("new", "2024-05-01"),
    ]));
    let (services, _rx, _) = services(api.clone(), RecordingClipboard::default());
    let mut view = DashboardView::new(services);
    settle(&mut view).await;

    assert_eq!(codes(&view), vec!["new", "old"]);
    assert_eq!(Calls::get(&api.calls.total_clicks), 1);
  }

  #[tokio::test]
  async fn test_delete_removes_row() {
    let api = Arc::new(FakeApi::with_urls(vec![
      record("a", "2024-01-01"),
      record("b", "2024-02-01"),
    ]));
    let (services, _rx, _) = services(api.clone(), RecordingClipboard::default());
    let mut view = DashboardView::new(services);
    settle(&mut view).await;

    // "b" is first
    view.handle_key(key(KeyCode::Char('d')));
    settle(&mut view).await;
    settle(&mut view).await;

    assert_eq!(codes(&view), vec!["a"]);
    assert_eq!(Calls::get(&api.calls.delete), 1);
  }

  #[tokio::test]
  async fn test_rows_keep_state_across_refetch() {
    let api = Arc::new(FakeApi::with_urls(vec![
      record("a", "2024-01-01"),
      record("b", "2024-02-01"),
    ]));
    let (services, _rx, _) = services(api.clone(), RecordingClipboard::default());
    let mut view = DashboardView::new(services);
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('j')));
    view.handle_key(key(KeyCode::Char('a')));
    view.handle_key(key(KeyCode::Char('r')));
    settle(&mut view).await;

    assert!(view.items()[1].analytics_open());
    assert!(!view.items()[0].analytics_open());
  }

  #[tokio::test]
  async fn test_new_link_dialog_adds_row() {
    let api = Arc::new(FakeApi::default());
    let (services, _rx, _) = services(api.clone(), RecordingClipboard::default());
    let mut view = DashboardView::new(services);
    settle(&mut view).await;
    assert!(view.items().is_empty());

    view.handle_key(key(KeyCode::Char('n')));
    assert!(view.is_creating());
    assert!(view.is_editing());
    for c in "https://rust-lang.org".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;
    settle(&mut view).await;

    assert_eq!(codes(&view), vec!["c1"]);
    view.handle_key(key(KeyCode::Esc));
    assert!(!view.is_creating());
  }

  #[tokio::test]
  async fn test_unauthorized_routes_to_error_once_per_failure() {
    let api = Arc::new(FakeApi::with_urls(vec![record("a", "2024-01-01")]));
    let (services, _rx, _) = services(api.clone(), RecordingClipboard::default());
    let mut view = DashboardView::new(services);
    settle(&mut view).await;

    *api.fail_urls.lock().unwrap() = true;
    view.handle_key(key(KeyCode::Char('r')));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(view.tick(), ViewAction::Push(Route::Error));
    assert_eq!(view.tick(), ViewAction::None);

    // Issuing the retry is not itself a failure
    view.handle_key(key(KeyCode::Char('r')));
    assert_eq!(view.tick(), ViewAction::None);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(view.tick(), ViewAction::Push(Route::Error));
  }

  #[tokio::test]
  async fn test_quit_pops() {
    let api = Arc::new(FakeApi::default());
    let (services, _rx, _) = services(api, RecordingClipboard::default());
    let mut view = DashboardView::new(services);
    assert_eq!(view.handle_key(key(KeyCode::Char('q'))), ViewAction::Pop);
  }
}
