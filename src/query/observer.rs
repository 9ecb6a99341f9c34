use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

use super::client::{fetcher, FetchOutcome, Fetcher, Payload, QueryClient, QueryStatus};
use super::error::QueryError;
use super::key::QueryKey;

/// The state of a query, as seen by a view
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
  /// Query is disabled or has not been started
  Idle,
  /// First fetch in progress, no data yet
  Loading,
  /// Data available (possibly refetching in the background)
  Success(T),
  /// Last fetch failed
  Error(QueryError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }
}

/// Per-query behaviour
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
  /// How long fetched data counts as fresh
  pub stale_time: Duration,
  /// Disabled queries never fetch and report no data
  pub enabled: bool,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      stale_time: Duration::from_secs(60), // Default 1 minute
      enabled: true,
    }
  }
}

type Select<R, T> = Arc<dyn Fn(&R) -> T + Send + Sync>;
type ErrorCallback = Box<dyn FnMut(&QueryError) + Send>;

/// An observer of one cache key.
///
/// `Query<R, T>` fetches raw `R` payloads through the shared `QueryClient`
/// and exposes `T = select(&R)` to the view. Every observer of the same key
/// shares one cache entry, so two views of the same list issue one request.
///
/// Call `poll()` from the tick handler; it pulls the latest entry state and
/// returns `true` when something the view renders changed.
pub struct Query<R, T = R> {
  client: QueryClient,
  key: QueryKey,
  fetcher: Fetcher,
  select: Select<R, T>,
  options: QueryOptions,
  on_error: Option<ErrorCallback>,
  receiver: Option<watch::Receiver<u64>>,
  status: QueryStatus,
  data: Option<T>,
  error: Option<QueryError>,
  is_fetching: bool,
  /// Raw payload `data` was derived from
  derived_from: Option<Payload>,
  /// Request whose failure was already reported to `on_error`
  reported_error: Option<u64>,
  /// A failure arrived that `take_new_error` has not handed out yet
  unseen_error: bool,
}

impl<R> Query<R, R>
where
  R: Clone + Send + Sync + 'static,
{
  /// Create a query for `key` with the given fetcher.
  ///
  /// Nothing happens until `fetch()` is called, which subscribes to the key
  /// and issues a request when the cache has no fresh data.
  ///
  /// # Example
  ///
  /// ```ignore
  /// let api = api.clone();
  /// let mut query = Query::new(client, QueryKey::new(["my-shortenurls"]), move || {
  ///     let api = api.clone();
  ///     async move { api.my_urls(&token).await.map_err(QueryError::from) }
  /// })
  /// .with_stale_time(Duration::from_secs(10));
  /// query.fetch();
  /// ```
  pub fn new<F, Fut>(client: QueryClient, key: QueryKey, fetch: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, QueryError>> + Send + 'static,
  {
    Self {
      client,
      key,
      fetcher: fetcher(fetch),
      select: Arc::new(R::clone),
      options: QueryOptions::default(),
      on_error: None,
      receiver: None,
      status: QueryStatus::Idle,
      data: None,
      error: None,
      is_fetching: false,
      derived_from: None,
      reported_error: None,
      unseen_error: false,
    }
  }
}

impl<R, T> Query<R, T>
where
  R: Send + Sync + 'static,
  T: 'static,
{
  /// Replace the transform applied to the raw payload.
  ///
  /// Call before `fetch()`; the returned query starts unmounted.
  pub fn select<U>(mut self, select: impl Fn(&R) -> U + Send + Sync + 'static) -> Query<R, U> {
    self.unmount();
    Query {
      client: self.client.clone(),
      key: self.key.clone(),
      fetcher: self.fetcher.clone(),
      select: Arc::new(select),
      options: self.options,
      on_error: self.on_error.take(),
      receiver: None,
      status: QueryStatus::Idle,
      data: None,
      error: None,
      is_fetching: false,
      derived_from: None,
      reported_error: None,
      unseen_error: false,
    }
  }

  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.options.stale_time = duration;
    self
  }

  pub fn with_enabled(mut self, enabled: bool) -> Self {
    self.options.enabled = enabled;
    self
  }

  /// Called once per failed fetch, from `poll()`.
  pub fn on_error(mut self, callback: impl FnMut(&QueryError) + Send + 'static) -> Self {
    self.on_error = Some(Box::new(callback));
    self
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn options(&self) -> QueryOptions {
    self.options
  }

  pub fn is_enabled(&self) -> bool {
    self.options.enabled
  }

  /// Get the current state of the query.
  pub fn state(&self) -> QueryState<&T> {
    match (self.status, &self.data, &self.error) {
      (QueryStatus::Error, _, Some(error)) => QueryState::Error(error.clone()),
      (_, Some(data), _) => QueryState::Success(data),
      (QueryStatus::Loading, None, _) => QueryState::Loading,
      _ => QueryState::Idle,
    }
  }

  /// Get the transformed data, if any.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  /// True while the first fetch is running and no data exists yet.
  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading && self.data.is_none()
  }

  /// True while any request for this key is in flight.
  pub fn is_fetching(&self) -> bool {
    self.is_fetching
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  pub fn error(&self) -> Option<&QueryError> {
    self.error.as_ref()
  }

  /// The current error, if it comes from a failure not seen through this
  /// method before. A refetch starting on a failed entry is not a new failure.
  pub fn take_new_error(&mut self) -> Option<&QueryError> {
    if !std::mem::take(&mut self.unseen_error) {
      return None;
    }
    self.error.as_ref()
  }

  /// Subscribe to the key and fetch unless the cache holds fresh data.
  ///
  /// A no-op on disabled queries.
  pub fn fetch(&mut self) -> Option<FetchOutcome> {
    if !self.options.enabled {
      return None;
    }
    self.mount();
    let outcome = self
      .client
      .fetch(&self.key, self.fetcher.clone(), self.options.stale_time);
    self.sync();
    Some(outcome)
  }

  /// Force a refetch, even if data is fresh or a request is in flight.
  pub fn refetch(&mut self) {
    if !self.options.enabled {
      return;
    }
    self.mount();
    self.client.refetch(&self.key, self.fetcher.clone());
    self.sync();
  }

  /// Enable or disable the query.
  ///
  /// Enabling behaves like a fresh mount. Disabling stops observing the key
  /// and clears local data; the cache entry itself stays.
  pub fn set_enabled(&mut self, enabled: bool) {
    if self.options.enabled == enabled {
      return;
    }
    self.options.enabled = enabled;
    if enabled {
      self.fetch();
    } else {
      self.unmount();
      self.reset();
    }
  }

  /// Poll for cache changes.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    let changed = match &mut self.receiver {
      Some(rx) => match rx.has_changed() {
        Ok(changed) => {
          if changed {
            rx.borrow_and_update();
          }
          changed
        }
        Err(_) => {
          // Entry dropped by `QueryClient::clear`
          self.receiver = None;
          self.reset();
          return true;
        }
      },
      None => return false,
    };

    if changed {
      self.sync();
    }
    changed
  }

  fn mount(&mut self) {
    if self.receiver.is_none() {
      self.receiver = Some(self.client.observe(&self.key));
    }
  }

  fn unmount(&mut self) {
    if self.receiver.take().is_some() {
      self.client.unobserve(&self.key);
    }
  }

  fn reset(&mut self) {
    self.status = QueryStatus::Idle;
    self.data = None;
    self.error = None;
    self.is_fetching = false;
    self.derived_from = None;
    self.unseen_error = false;
  }

  /// Pull the entry's current state into this observer.
  fn sync(&mut self) {
    let Some(snapshot) = self.client.snapshot(&self.key) else {
      self.reset();
      return;
    };

    self.status = snapshot.status;
    self.is_fetching = snapshot.is_fetching;
    self.error = snapshot.error.clone();

    match &snapshot.payload {
      Some(payload) => {
        let unchanged = self
          .derived_from
          .as_ref()
          .map(|prev| Arc::ptr_eq(prev, payload))
          .unwrap_or(false);
        if !unchanged {
          match payload.downcast_ref::<R>() {
            Some(raw) => {
              self.data = Some((self.select)(raw));
              self.derived_from = Some(payload.clone());
            }
            None => {
              warn!(key = %self.key, "cached payload has an unexpected type");
              self.data = None;
              self.derived_from = None;
            }
          }
        }
      }
      None => {
        self.data = None;
        self.derived_from = None;
      }
    }

    let failed = snapshot.status == QueryStatus::Error && snapshot.error_seq.is_some();
    if failed && self.reported_error != snapshot.error_seq {
      self.reported_error = snapshot.error_seq;
      self.unseen_error = true;
      if let (Some(callback), Some(error)) = (self.on_error.as_mut(), snapshot.error.as_ref()) {
        callback(error);
      }
    }
  }
}

impl<R, T> Drop for Query<R, T> {
  fn drop(&mut self) {
    if self.receiver.take().is_some() {
      self.client.unobserve(&self.key);
    }
  }
}

impl<R, T: std::fmt::Debug> std::fmt::Debug for Query<R, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("status", &self.status)
      .field("data", &self.data)
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Mutex;

  async fn settle<R, T>(query: &mut Query<R, T>)
  where
    R: Send + Sync + 'static,
    T: 'static,
  {
    tokio::time::sleep(Duration::from_millis(20)).await;
    query.poll();
  }

  fn counted(client: &QueryClient, counter: Arc<AtomicU32>) -> Query<Vec<u32>> {
    Query::new(client.clone(), QueryKey::new(["numbers"]), move || {
      let counter = counter.clone();
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(vec![3, 1, 2])
      }
    })
  }

  #[tokio::test]
  async fn test_query_success() {
    let client = QueryClient::new();
    let mut query = counted(&client, Arc::new(AtomicU32::new(0)));

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    settle(&mut query).await;
    assert!(query.is_success());
    assert_eq!(query.data(), Some(&vec![3, 1, 2]));
  }

  #[tokio::test]
  async fn test_query_error_calls_on_error_once() {
    let client = QueryClient::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut query: Query<i32> = Query::new(client, QueryKey::new(["bad"]), || async {
      Err(QueryError::Fetch("Something went wrong".to_string()))
    })
    .on_error(move |e| sink.lock().unwrap().push(e.to_string()));

    query.fetch();
    settle(&mut query).await;
    query.poll();

    assert!(query.is_error());
    assert_eq!(
      query.error(),
      Some(&QueryError::Fetch("Something went wrong".to_string()))
    );
    assert_eq!(*seen.lock().unwrap(), vec!["Something went wrong".to_string()]);
  }

  #[tokio::test]
  async fn test_refetch_start_does_not_repeat_error() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let sink = seen.clone();
    let mut query: Query<i32> = Query::new(client, QueryKey::new(["flaky"]), move || {
      let n = counter.fetch_add(1, Ordering::SeqCst);
      async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if n == 0 {
          Ok(7)
        } else {
          Err(QueryError::Fetch("down".to_string()))
        }
      }
    })
    .on_error(move |_| {
      sink.fetch_add(1, Ordering::SeqCst);
    });

    query.fetch();
    settle(&mut query).await;
    assert_eq!(query.data(), Some(&7));

    query.refetch();
    settle(&mut query).await;
    assert!(query.is_error());
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(query.take_new_error().is_some());

    // Still in error with data while the next request runs
    query.refetch();
    query.poll();
    assert!(query.is_fetching());
    assert!(query.is_error());
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(query.take_new_error().is_none());

    settle(&mut query).await;
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert!(query.take_new_error().is_some());
    assert!(query.take_new_error().is_none());
  }

  #[tokio::test]
  async fn test_select_transforms_raw_payload() {
    let client = QueryClient::new();
    let mut sorted = counted(&client, Arc::new(AtomicU32::new(0))).select(|raw: &Vec<u32>| {
      let mut v = raw.clone();
      v.sort();
      v
    });
    sorted.fetch();
    settle(&mut sorted).await;
    assert_eq!(sorted.data(), Some(&vec![1, 2, 3]));

    // A second observer with another transform sees the same raw payload
    let mut total = counted(&client, Arc::new(AtomicU32::new(0))).select(|raw| raw.iter().sum::<u32>());
    total.fetch();
    assert_eq!(total.data(), Some(&6));
  }

  #[tokio::test]
  async fn test_observers_of_one_key_share_requests() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut a = counted(&client, counter.clone());
    let mut b = counted(&client, counter.clone());

    a.fetch();
    b.fetch();
    settle(&mut a).await;
    b.poll();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(a.data(), b.data());
  }

  #[tokio::test]
  async fn test_disabled_query_never_fetches() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counted(&client, counter.clone()).with_enabled(false);

    assert_eq!(query.fetch(), None);
    query.refetch();
    settle(&mut query).await;

    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(query.data().is_none());
    assert!(matches!(query.state(), QueryState::Idle));
  }

  #[tokio::test]
  async fn test_toggle_enabled_keeps_cache_entry() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counted(&client, counter.clone()).with_stale_time(Duration::from_secs(60));

    query.fetch();
    settle(&mut query).await;
    assert!(query.data().is_some());

    query.set_enabled(false);
    assert!(query.data().is_none());
    assert_eq!(client.observers(query.key()), 0);

    // Re-enabling serves the cached entry without a new request
    query.set_enabled(true);
    assert_eq!(query.data(), Some(&vec![3, 1, 2]));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_invalidation_reaches_mounted_observer() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counted(&client, counter.clone()).with_stale_time(Duration::from_secs(60));

    query.fetch();
    settle(&mut query).await;
    client.invalidate(&QueryKey::new(["numbers"]));
    settle(&mut query).await;

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(query.is_success());
  }

  #[tokio::test]
  async fn test_drop_unobserves() {
    let client = QueryClient::new();
    let key = QueryKey::new(["numbers"]);
    {
      let mut query = counted(&client, Arc::new(AtomicU32::new(0)));
      query.fetch();
      assert_eq!(client.observers(&key), 1);
    }
    assert_eq!(client.observers(&key), 0);
  }

  #[tokio::test]
  async fn test_clear_resets_observer() {
    let client = QueryClient::new();
    let mut query = counted(&client, Arc::new(AtomicU32::new(0)));
    query.fetch();
    settle(&mut query).await;

    client.clear();
    assert!(query.poll());
    assert!(query.data().is_none());
  }
}
