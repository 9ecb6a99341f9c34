//! Process-wide query cache shared by every `Query` observer.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

use super::error::QueryError;
use super::key::QueryKey;

/// Raw fetch result as stored in the cache
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Type-erased fetch function registered by observers
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Payload, QueryError>> + Send + Sync>;

/// Erase a typed fetch function into a `Fetcher`.
pub fn fetcher<R, F, Fut>(fetch: F) -> Fetcher
where
  R: Send + Sync + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<R, QueryError>> + Send + 'static,
{
  Arc::new(move || {
    let future = fetch();
    async move { future.await.map(|data| Arc::new(data) as Payload) }.boxed()
  })
}

/// Lifecycle status of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  Idle,
  Loading,
  Success,
  Error,
}

/// What `QueryClient::fetch` decided to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  /// A new request was issued with this sequence number
  Started(u64),
  /// A request for this key is already in flight and was joined
  Deduped,
  /// Cached data is still fresh, nothing to do
  Fresh,
}

/// Point-in-time view of an entry, handed to observers
#[derive(Clone)]
pub struct Snapshot {
  pub payload: Option<Payload>,
  pub status: QueryStatus,
  pub error: Option<QueryError>,
  /// Sequence number of the request that produced `error`
  pub error_seq: Option<u64>,
  pub updated_at: Option<Instant>,
  pub is_fetching: bool,
  pub version: u64,
}

struct Entry {
  payload: Option<Payload>,
  status: QueryStatus,
  error: Option<QueryError>,
  error_seq: Option<u64>,
  updated_at: Option<Instant>,
  invalidated: bool,
  /// Sequence number of the most recently issued request. Numbers come from
  /// a client-wide counter, so they are never reused after `clear()`.
  seq: u64,
  in_flight: Option<u64>,
  observers: usize,
  version: u64,
  /// Latest fetcher registered for this key, used to refetch on invalidation
  fetcher: Option<Fetcher>,
  changed: watch::Sender<u64>,
}

impl Entry {
  fn new() -> Self {
    let (changed, _) = watch::channel(0);
    Self {
      payload: None,
      status: QueryStatus::Idle,
      error: None,
      error_seq: None,
      updated_at: None,
      invalidated: false,
      seq: 0,
      in_flight: None,
      observers: 0,
      version: 0,
      fetcher: None,
      changed,
    }
  }

  fn is_stale(&self, stale_time: Duration) -> bool {
    if self.invalidated || self.payload.is_none() {
      return true;
    }
    self
      .updated_at
      .map(|t| t.elapsed() >= stale_time)
      .unwrap_or(true)
  }

  /// Publish a change to every subscriber of this key.
  fn publish(&mut self) {
    self.version += 1;
    self.changed.send_replace(self.version);
  }

  fn snapshot(&self) -> Snapshot {
    Snapshot {
      payload: self.payload.clone(),
      status: self.status,
      error: self.error.clone(),
      error_seq: self.error_seq,
      updated_at: self.updated_at,
      is_fetching: self.in_flight.is_some(),
      version: self.version,
    }
  }
}

/// Handle to the shared query cache.
///
/// Cloning is cheap; all clones see the same entries. Entries are created on
/// first observation and live until `clear()`.
#[derive(Clone, Default)]
pub struct QueryClient {
  entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
  next_seq: Arc<AtomicU64>,
}

impl QueryClient {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Register interest in a key and subscribe to its changes.
  pub fn observe(&self, key: &QueryKey) -> watch::Receiver<u64> {
    let mut entries = self.lock();
    let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
    entry.observers += 1;
    entry.changed.subscribe()
  }

  /// Drop interest in a key. In-flight requests keep running.
  pub fn unobserve(&self, key: &QueryKey) {
    if let Some(entry) = self.lock().get_mut(key) {
      entry.observers = entry.observers.saturating_sub(1);
    }
  }

  pub fn observers(&self, key: &QueryKey) -> usize {
    self.lock().get(key).map(|e| e.observers).unwrap_or(0)
  }

  pub fn snapshot(&self, key: &QueryKey) -> Option<Snapshot> {
    self.lock().get(key).map(Entry::snapshot)
  }

  pub fn is_fetching(&self, key: &QueryKey) -> bool {
    self
      .lock()
      .get(key)
      .map(|e| e.in_flight.is_some())
      .unwrap_or(false)
  }

  /// Fetch `key` unless fresh data is cached or a request is already running.
  pub fn fetch(&self, key: &QueryKey, fetcher: Fetcher, stale_time: Duration) -> FetchOutcome {
    let mut entries = self.lock();
    let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
    entry.fetcher = Some(fetcher.clone());

    if entry.in_flight.is_some() && !entry.invalidated {
      debug!(%key, "joining in-flight request");
      return FetchOutcome::Deduped;
    }
    if !entry.is_stale(stale_time) {
      return FetchOutcome::Fresh;
    }

    FetchOutcome::Started(self.start(key, entry, fetcher))
  }

  /// Issue a new request for `key`, superseding any request in flight.
  pub fn refetch(&self, key: &QueryKey, fetcher: Fetcher) -> u64 {
    let mut entries = self.lock();
    let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
    entry.fetcher = Some(fetcher.clone());
    self.start(key, entry, fetcher)
  }

  /// Mark every entry under `prefix` invalid.
  ///
  /// Entries with live observers refetch right away; the rest refetch on
  /// their next access. Returns the number of entries matched.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut entries = self.lock();
    let mut matched = 0;
    for (key, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
      matched += 1;
      entry.invalidated = true;
      match (entry.observers, entry.fetcher.clone()) {
        (n, Some(fetcher)) if n > 0 => {
          self.start(key, entry, fetcher);
        }
        _ => entry.publish(),
      }
    }
    debug!(%prefix, matched, "invalidated queries");
    matched
  }

  /// Drop every entry. Observers see their channel close.
  pub fn clear(&self) {
    self.lock().clear();
    debug!("query cache cleared");
  }

  fn start(&self, key: &QueryKey, entry: &mut Entry, fetcher: Fetcher) -> u64 {
    let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
    entry.seq = seq;
    entry.in_flight = Some(seq);
    entry.invalidated = false;
    if entry.payload.is_none() {
      entry.status = QueryStatus::Loading;
    }
    entry.publish();
    debug!(%key, seq, "starting fetch");

    let client = self.clone();
    let key = key.clone();
    let future = fetcher();
    tokio::spawn(async move {
      let result = future.await;
      client.complete(&key, seq, result);
    });

    seq
  }

  fn complete(&self, key: &QueryKey, seq: u64, result: Result<Payload, QueryError>) {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(key) else {
      return;
    };
    if entry.seq != seq {
      debug!(%key, seq, latest = entry.seq, "discarding superseded response");
      return;
    }

    entry.in_flight = None;
    match result {
      Ok(payload) => {
        entry.payload = Some(payload);
        entry.status = QueryStatus::Success;
        entry.error = None;
        entry.error_seq = None;
        entry.updated_at = Some(Instant::now());
      }
      Err(error) => {
        debug!(%key, %error, "fetch failed");
        entry.status = QueryStatus::Error;
        entry.error = Some(error);
        entry.error_seq = Some(seq);
      }
    }
    entry.publish();
  }
}

impl std::fmt::Debug for QueryClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryClient")
      .field("entries", &self.lock().len())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicU32;

  fn counting_fetcher(counter: Arc<AtomicU32>, delay: Duration) -> Fetcher {
    fetcher(move || {
      let counter = counter.clone();
      async move {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(delay).await;
        Ok(n)
      }
    })
  }

  fn value(client: &QueryClient, key: &QueryKey) -> Option<u32> {
    client
      .snapshot(key)
      .and_then(|s| s.payload)
      .and_then(|p| p.downcast_ref::<u32>().copied())
  }

  #[tokio::test]
  async fn test_concurrent_fetches_share_one_request() {
    let client = QueryClient::new();
    let key = QueryKey::new(["k"]);
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::from_millis(30));

    assert!(matches!(
      client.fetch(&key, fetcher.clone(), Duration::from_secs(10)),
      FetchOutcome::Started(1)
    ));
    assert_eq!(
      client.fetch(&key, fetcher.clone(), Duration::from_secs(10)),
      FetchOutcome::Deduped
    );

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(value(&client, &key), Some(1));

    // Fresh data is served without another call
    assert_eq!(
      client.fetch(&key, fetcher, Duration::from_secs(10)),
      FetchOutcome::Fresh
    );
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_stale_data_is_kept_during_background_refetch() {
    let client = QueryClient::new();
    let key = QueryKey::new(["k"]);
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::from_millis(20));

    client.fetch(&key, fetcher.clone(), Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(
      client.fetch(&key, fetcher, Duration::ZERO),
      FetchOutcome::Started(2)
    ));
    let snapshot = client.snapshot(&key).unwrap();
    assert!(snapshot.is_fetching);
    assert_eq!(snapshot.status, QueryStatus::Success);
    assert_eq!(value(&client, &key), Some(1));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(value(&client, &key), Some(2));
  }

  #[tokio::test]
  async fn test_superseded_response_is_discarded() {
    let client = QueryClient::new();
    let key = QueryKey::new(["k"]);

    let slow = fetcher(|| async {
      tokio::time::sleep(Duration::from_millis(80)).await;
      Ok("old")
    });
    let fast = fetcher(|| async { Ok("new") });

    client.refetch(&key, slow);
    client.refetch(&key, fast);
    tokio::time::sleep(Duration::from_millis(120)).await;

    let payload = client.snapshot(&key).unwrap().payload.unwrap();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"new"));
  }

  #[tokio::test]
  async fn test_invalidate_refetches_observed_keys_only() {
    let client = QueryClient::new();
    let watched = QueryKey::new(["urls", "a"]);
    let idle = QueryKey::new(["urls", "b"]);
    let other = QueryKey::new(["clicks"]);
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::ZERO);

    let _rx = client.observe(&watched);
    for key in [&watched, &idle, &other] {
      client.fetch(key, fetcher.clone(), Duration::from_secs(60));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 3);

    assert_eq!(client.invalidate(&QueryKey::new(["urls"])), 2);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 4);

    // The unobserved key refetches on its next access despite a long stale time
    assert!(matches!(
      client.fetch(&idle, fetcher.clone(), Duration::from_secs(60)),
      FetchOutcome::Started(_)
    ));
    assert_eq!(
      client.fetch(&other, fetcher, Duration::from_secs(60)),
      FetchOutcome::Fresh
    );
  }

  #[tokio::test]
  async fn test_unobserve_does_not_cancel_fetch() {
    let client = QueryClient::new();
    let key = QueryKey::new(["k"]);
    let counter = Arc::new(AtomicU32::new(0));

    let _first = client.observe(&key);
    let _second = client.observe(&key);
    client.fetch(
      &key,
      counting_fetcher(counter, Duration::from_millis(20)),
      Duration::ZERO,
    );
    client.unobserve(&key);
    assert_eq!(client.observers(&key), 1);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(value(&client, &key), Some(1));
  }

  #[tokio::test]
  async fn test_error_keeps_previous_payload() {
    let client = QueryClient::new();
    let key = QueryKey::new(["k"]);
    let ok = fetcher(|| async { Ok(5u32) });
    let failing = fetcher(|| async { Err::<u32, _>(QueryError::Fetch("down".into())) });

    client.refetch(&key, ok);
    tokio::time::sleep(Duration::from_millis(10)).await;
    client.refetch(&key, failing);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let snapshot = client.snapshot(&key).unwrap();
    assert_eq!(snapshot.status, QueryStatus::Error);
    assert_eq!(snapshot.error, Some(QueryError::Fetch("down".into())));
    assert_eq!(value(&client, &key), Some(5));
  }

  #[tokio::test]
  async fn test_subscribers_are_notified() {
    let client = QueryClient::new();
    let key = QueryKey::new(["k"]);
    let mut rx = client.observe(&key);
    let ok = fetcher(|| async { Ok(1u32) });

    client.refetch(&key, ok);
    tokio::time::timeout(Duration::from_secs(1), async {
      while value(&client, &key).is_none() {
        rx.changed().await.unwrap();
      }
    })
    .await
    .unwrap();
  }
}
