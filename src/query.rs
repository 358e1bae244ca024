//! Async query and mutation bindings for data fetching with caching.
//!
//! Inspired by TanStack Query: a `Query<T>` encapsulates async data fetching
//! with loading/success/error states, and a `Mutation<I, T>` encapsulates a
//! single write that invalidates cache keys on success.
//!
//! # Example
//!
//! ```ignore
//! let svc = services.client.clone();
//! let mut query = Query::new(services.cache.clone(), key, move || {
//!     let svc = svc.clone();
//!     async move { svc.list::<Resource>().await.map_err(|e| e.to_string()) }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cache::{Hit, QueryCache, QueryKey};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
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

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Async read binding with state management.
///
/// The fetch itself goes through the shared [`QueryCache`]: concurrent
/// queries with the same key coalesce into one underlying request, and
/// `poll()` re-fetches in the background when the key has been invalidated
/// since the data was obtained.
///
/// There is no automatic retry: a failed query stays in the error state
/// until `refetch()` is called.
pub struct Query<T> {
  state: QueryState<T>,
  cache: QueryCache,
  key: QueryKey,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<Hit<T>, String>>>,
  seen_generation: u64,
}

impl<T> Query<T>
where
  T: Clone + Send + Serialize + DeserializeOwned + 'static,
{
  /// Create a new query with the given cache key and fetcher function.
  ///
  /// The fetcher is a closure that returns a future performing the actual
  /// service call; the cache decides whether it runs at all.
  pub fn new<F, Fut>(cache: QueryCache, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      cache,
      key,
      fetcher: Arc::new(move || Box::pin(fetcher())),
      receiver: None,
      seen_generation: 0,
    }
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Start fetching data if not already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, even if already loading or data exists.
  pub fn refetch(&mut self) {
    // Dropping the receiver discards the pending result
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch and watch for invalidation.
  ///
  /// Returns `true` if the state changed. Call this from the event loop
  /// tick; a key invalidated by a mutation triggers the background re-fetch
  /// here.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    if let Some(receiver) = &mut self.receiver {
      match receiver.try_recv() {
        Ok(Ok(hit)) => {
          self.state = QueryState::Success(hit.data);
          self.seen_generation = hit.generation;
          self.receiver = None;
          changed = true;
        }
        Ok(Err(error)) => {
          tracing::warn!(key = self.key.label(), error, "query failed");
          self.state = QueryState::Error(error);
          self.receiver = None;
          changed = true;
        }
        Err(mpsc::error::TryRecvError::Empty) => {}
        Err(mpsc::error::TryRecvError::Disconnected) => {
          self.state = QueryState::Error("query was cancelled".to_string());
          self.receiver = None;
          changed = true;
        }
      }
    }

    // Successful data whose key has since been invalidated is re-fetched in
    // the background. Errors are not retried.
    if !self.state.is_loading()
      && self.state.is_success()
      && self.cache.generation(&self.key) != self.seen_generation
    {
      self.start_fetch();
      changed = true;
    }

    changed
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let cache = self.cache.clone();
    let key = self.key.clone();
    let fetcher = Arc::clone(&self.fetcher);
    tokio::spawn(async move {
      let result = cache.fetch(&key, || (fetcher)()).await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key.label())
      .field("state", &self.state)
      .field("seen_generation", &self.seen_generation)
      .finish_non_exhaustive()
  }
}

/// The state of a mutation
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  Idle,
  Running,
  Success(T),
  Error(String),
}

type RunnerFn<I, T> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Async write binding.
///
/// `run(input)` performs exactly one service call. On success the configured
/// cache keys are invalidated (from `poll`, on the event loop), which
/// schedules background re-fetches in the queries watching those keys. On
/// failure nothing is invalidated and the error is surfaced to the caller.
pub struct Mutation<I, T> {
  state: MutationState<T>,
  runner: RunnerFn<I, T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  cache: QueryCache,
  invalidates: Vec<QueryKey>,
}

impl<I, T> Mutation<I, T>
where
  I: Send + 'static,
  T: Send + 'static,
{
  pub fn new<F, Fut>(cache: QueryCache, invalidates: Vec<QueryKey>, runner: F) -> Self
  where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: MutationState::Idle,
      runner: Arc::new(move |input| Box::pin(runner(input))),
      receiver: None,
      cache,
      invalidates,
    }
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_running(&self) -> bool {
    matches!(self.state, MutationState::Running)
  }

  /// Start the write. Ignored while a previous run is still in flight.
  pub fn run(&mut self, input: I) {
    if self.is_running() {
      return;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Running;

    let runner = Arc::clone(&self.runner);
    tokio::spawn(async move {
      let result = (runner)(input).await;
      let _ = tx.send(result);
    });
  }

  /// Poll for completion. Invalidation happens here, on the event loop, so
  /// cache writes stay serialized with everything else the app does.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(value)) => {
        for key in &self.invalidates {
          self.cache.invalidate(key);
        }
        self.state = MutationState::Success(value);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        tracing::warn!(error, "mutation failed");
        self.state = MutationState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = MutationState::Error("mutation was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  /// Take the success value, resetting to idle. Returns `None` otherwise.
  pub fn take_success(&mut self) -> Option<T> {
    if matches!(self.state, MutationState::Success(_)) {
      match std::mem::replace(&mut self.state, MutationState::Idle) {
        MutationState::Success(value) => Some(value),
        _ => unreachable!(),
      }
    } else {
      None
    }
  }

  /// Take the error message, resetting to idle. Returns `None` otherwise.
  pub fn take_error(&mut self) -> Option<String> {
    if matches!(self.state, MutationState::Error(_)) {
      match std::mem::replace(&mut self.state, MutationState::Idle) {
        MutationState::Error(e) => Some(e),
        _ => unreachable!(),
      }
    } else {
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;
  use std::time::Duration;

  fn key() -> QueryKey {
    QueryKey::new("rows", "order=id.asc")
  }

  /// Stand-in for the remote service: rows behind a lock.
  type FakeRows = Arc<Mutex<Vec<(u32, String)>>>;

  fn list_query(cache: &QueryCache, rows: &FakeRows) -> Query<Vec<(u32, String)>> {
    let rows = rows.clone();
    Query::new(cache.clone(), key(), move || {
      let rows = rows.clone();
      async move { Ok(rows.lock().unwrap().clone()) }
    })
  }

  fn insert_mutation(cache: &QueryCache, rows: &FakeRows) -> Mutation<(u32, String), u32> {
    let rows = rows.clone();
    Mutation::new(cache.clone(), vec![key()], move |row: (u32, String)| {
      let rows = rows.clone();
      async move {
        let id = row.0;
        rows.lock().unwrap().push(row);
        Ok(id)
      }
    })
  }

  async fn settle<T: Clone + Send + Serialize + DeserializeOwned + 'static>(
    query: &mut Query<T>,
  ) {
    for _ in 0..50 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      if query.poll() && !query.is_loading() {
        return;
      }
    }
    panic!("query did not settle");
  }

  #[tokio::test]
  async fn test_query_success() {
    let cache = QueryCache::new();
    let rows: FakeRows = Arc::new(Mutex::new(vec![(1, "drill".to_string())]));
    let mut query = list_query(&cache, &rows);

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    settle(&mut query).await;
    assert_eq!(query.data(), Some(&vec![(1, "drill".to_string())]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let cache = QueryCache::new();
    let mut query: Query<Vec<u32>> = Query::new(cache, key(), || async {
      Err("connection refused".to_string())
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("connection refused"));

    // No automatic retry: the error state persists across polls.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!query.poll());
    assert!(query.is_error());
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let cache = QueryCache::new();
    let mut query: Query<u32> = Query::new(cache, key(), || async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok(42)
    });

    query.fetch();
    assert!(query.is_loading());
    query.fetch();
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_create_appears_in_next_query() {
    let cache = QueryCache::new();
    let rows: FakeRows = Arc::new(Mutex::new(Vec::new()));

    let mut query = list_query(&cache, &rows);
    query.fetch();
    settle(&mut query).await;
    assert_eq!(query.data(), Some(&Vec::new()));

    let mut create = insert_mutation(&cache, &rows);
    create.run((7, "ladder".to_string()));
    for _ in 0..50 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      if create.poll() {
        break;
      }
    }
    assert_eq!(create.take_success(), Some(7));

    // Invalidation schedules a background re-fetch on the next poll.
    assert!(query.poll());
    assert!(query.is_loading());
    settle(&mut query).await;
    assert_eq!(query.data(), Some(&vec![(7, "ladder".to_string())]));
  }

  #[tokio::test]
  async fn test_duplicate_creates_are_not_deduplicated() {
    let cache = QueryCache::new();
    let rows: FakeRows = Arc::new(Mutex::new(Vec::new()));
    let mut create = insert_mutation(&cache, &rows);

    for _ in 0..2 {
      create.run((3, "pallet".to_string()));
      for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if create.poll() {
          break;
        }
      }
      assert!(create.take_success().is_some());
    }

    assert_eq!(rows.lock().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_update_reflected_for_exactly_one_row() {
    let cache = QueryCache::new();
    let rows: FakeRows = Arc::new(Mutex::new(vec![
      (1, "drill".to_string()),
      (2, "ladder".to_string()),
    ]));

    let mut query = list_query(&cache, &rows);
    query.fetch();
    settle(&mut query).await;

    let update_rows = rows.clone();
    let mut update = Mutation::new(
      cache.clone(),
      vec![key()],
      move |(id, name): (u32, String)| {
        let rows = update_rows.clone();
        async move {
          let mut rows = rows.lock().unwrap();
          let row = rows.iter_mut().find(|r| r.0 == id).ok_or("row not found")?;
          row.1 = name;
          Ok(id)
        }
      },
    );

    update.run((2, "forklift".to_string()));
    for _ in 0..50 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      if update.poll() {
        break;
      }
    }
    assert_eq!(update.take_success(), Some(2));

    query.poll();
    settle(&mut query).await;
    assert_eq!(
      query.data(),
      Some(&vec![(1, "drill".to_string()), (2, "forklift".to_string())])
    );
  }

  #[tokio::test]
  async fn test_failed_mutation_invalidates_nothing() {
    let cache = QueryCache::new();
    let rows: FakeRows = Arc::new(Mutex::new(vec![(1, "drill".to_string())]));

    let mut query = list_query(&cache, &rows);
    query.fetch();
    settle(&mut query).await;

    let mut broken: Mutation<(), ()> = Mutation::new(cache.clone(), vec![key()], |_| async {
      Err("permission denied".to_string())
    });
    broken.run(());
    for _ in 0..50 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      if broken.poll() {
        break;
      }
    }
    assert_eq!(broken.take_error(), Some("permission denied".to_string()));

    // The cached key was not invalidated, so the query stays settled.
    assert!(!query.poll());
    assert!(query.state().is_success());
  }
}
