//! In-memory keyed cache with request coalescing and explicit invalidation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use super::key::QueryKey;

/// Where a fetch result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  /// Fresh data from the service.
  Network,
  /// Served from the cache within the staleness window.
  Cache,
  /// Joined another caller's in-flight request.
  Shared,
}

/// A resolved fetch: the data plus the slot generation it belongs to.
#[derive(Debug, Clone)]
pub struct Hit<T> {
  pub data: T,
  pub generation: u64,
  pub source: Source,
}

/// Process-wide query cache, keyed by (table, parameters).
///
/// The handle is cheap to clone and share; all slots live behind one lock.
/// Per key it guarantees:
/// - at most one fetch in flight (later callers join the pending one),
/// - writes serialized under the lock, last successful fetch wins,
/// - `invalidate` bumps a generation counter that live queries watch for.
///
/// Values are stored as serialized JSON so slots of different entity types
/// can share one map.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Inner>,
}

struct Inner {
  slots: Mutex<HashMap<String, Slot>>,
  stale_time: Duration,
  tickets: AtomicU64,
}

#[derive(Default)]
struct Slot {
  value: Option<Stored>,
  inflight: Option<Inflight>,
  generation: u64,
}

struct Stored {
  json: serde_json::Value,
  stored_at: Instant,
}

struct Inflight {
  ticket: u64,
  tx: broadcast::Sender<Result<serde_json::Value, String>>,
}

enum Plan {
  Hit(serde_json::Value, u64),
  Join(broadcast::Receiver<Result<serde_json::Value, String>>),
  Fetch {
    ticket: u64,
    tx: broadcast::Sender<Result<serde_json::Value, String>>,
  },
}

impl QueryCache {
  pub fn new() -> Self {
    Self::with_stale_time(Duration::from_secs(5 * 60))
  }

  /// Cached values older than `stale_time` are bypassed and re-fetched.
  pub fn with_stale_time(stale_time: Duration) -> Self {
    Self {
      inner: Arc::new(Inner {
        slots: Mutex::new(HashMap::new()),
        stale_time,
        tickets: AtomicU64::new(1),
      }),
    }
  }

  /// Current generation for a key. Bumped by every `invalidate`; `0` for
  /// keys that have never been touched.
  pub fn generation(&self, key: &QueryKey) -> u64 {
    let slots = self.inner.slots.lock().expect("cache lock poisoned");
    slots.get(key.hash()).map(|s| s.generation).unwrap_or(0)
  }

  /// Drop the cached value for a key and bump its generation.
  ///
  /// Does not trigger a fetch itself: live `Query` bindings notice the
  /// generation change on their next poll and re-fetch in the background.
  pub fn invalidate(&self, key: &QueryKey) {
    let mut slots = self.inner.slots.lock().expect("cache lock poisoned");
    let slot = slots.entry(key.hash().to_string()).or_default();
    slot.value = None;
    slot.generation += 1;
    tracing::debug!(
      key = key.label(),
      generation = slot.generation,
      "cache invalidated"
    );
  }

  /// Fetch through the cache.
  ///
  /// Returns the cached value when fresh; otherwise either joins the
  /// in-flight request for this key or runs `fetcher` and stores the result.
  /// A failed fetch stores nothing, so the next caller retries.
  pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Hit<T>, String>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, String>>,
  {
    let plan = {
      let mut slots = self.inner.slots.lock().expect("cache lock poisoned");
      let slot = slots.entry(key.hash().to_string()).or_default();

      if let Some(stored) = &slot.value {
        if stored.stored_at.elapsed() <= self.inner.stale_time {
          Plan::Hit(stored.json.clone(), slot.generation)
        } else if let Some(inflight) = &slot.inflight {
          Plan::Join(inflight.tx.subscribe())
        } else {
          self.begin_fetch(slot)
        }
      } else if let Some(inflight) = &slot.inflight {
        Plan::Join(inflight.tx.subscribe())
      } else {
        self.begin_fetch(slot)
      }
    };

    match plan {
      Plan::Hit(json, generation) => {
        let data = decode(json)?;
        Ok(Hit {
          data,
          generation,
          source: Source::Cache,
        })
      }
      Plan::Join(mut rx) => match rx.recv().await {
        Ok(Ok(json)) => {
          let data = decode(json)?;
          Ok(Hit {
            data,
            generation: self.generation(key),
            source: Source::Shared,
          })
        }
        Ok(Err(e)) => Err(e),
        // Sender dropped without sending: the fetching task went away.
        Err(_) => Err("query was cancelled".to_string()),
      },
      Plan::Fetch { ticket, tx } => match fetcher().await {
        Ok(data) => {
          let json = serde_json::to_value(&data)
            .map_err(|e| format!("failed to serialize cached value: {}", e))?;

          let generation = {
            let mut slots = self.inner.slots.lock().expect("cache lock poisoned");
            let slot = slots.entry(key.hash().to_string()).or_default();
            // Last successful fetch wins, even if the slot was invalidated
            // while we were in flight; the bumped generation makes pollers
            // fetch again.
            slot.value = Some(Stored {
              json: json.clone(),
              stored_at: Instant::now(),
            });
            if slot.inflight.as_ref().map(|f| f.ticket) == Some(ticket) {
              slot.inflight = None;
            }
            slot.generation
          };

          // Waiters may have gone away; that's fine.
          let _ = tx.send(Ok(json));
          Ok(Hit {
            data,
            generation,
            source: Source::Network,
          })
        }
        Err(e) => {
          {
            let mut slots = self.inner.slots.lock().expect("cache lock poisoned");
            if let Some(slot) = slots.get_mut(key.hash()) {
              if slot.inflight.as_ref().map(|f| f.ticket) == Some(ticket) {
                slot.inflight = None;
              }
            }
          }

          let _ = tx.send(Err(e.clone()));
          Err(e)
        }
      },
    }
  }

  fn begin_fetch(&self, slot: &mut Slot) -> Plan {
    let ticket = self.inner.tickets.fetch_add(1, Ordering::Relaxed);
    let (tx, _) = broadcast::channel(1);
    slot.inflight = Some(Inflight {
      ticket,
      tx: tx.clone(),
    });
    Plan::Fetch { ticket, tx }
  }
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

fn decode<T: DeserializeOwned>(json: serde_json::Value) -> Result<T, String> {
  serde_json::from_value(json).map_err(|e| format!("failed to decode cached value: {}", e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicU32;

  fn key() -> QueryKey {
    QueryKey::new("resources", "order=created_at.desc")
  }

  #[tokio::test]
  async fn test_miss_then_hit() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let c = calls.clone();
    let first = cache
      .fetch(&key(), move || async move {
        c.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(vec![1, 2, 3])
      })
      .await
      .unwrap();
    assert_eq!(first.source, Source::Network);
    assert_eq!(first.data, vec![1, 2, 3]);

    let c = calls.clone();
    let second = cache
      .fetch(&key(), move || async move {
        c.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(vec![9])
      })
      .await
      .unwrap();
    assert_eq!(second.source, Source::Cache);
    assert_eq!(second.data, vec![1, 2, 3]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_fetches_coalesce() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let fetch = |cache: QueryCache, calls: Arc<AtomicU32>| async move {
      cache
        .fetch(&key(), move || async move {
          tokio::time::sleep(Duration::from_millis(50)).await;
          calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, String>(vec!["r1".to_string()])
        })
        .await
    };

    let a = tokio::spawn(fetch(cache.clone(), calls.clone()));
    let b = tokio::spawn(fetch(cache.clone(), calls.clone()));

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    // Only one underlying fetch; both callers see the same data.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.data, b.data);
    assert!(a.source == Source::Network || a.source == Source::Shared);
    assert!(b.source == Source::Network || b.source == Source::Shared);
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let fetch = |cache: QueryCache, calls: Arc<AtomicU32>| async move {
      cache
        .fetch(&key(), move || async move {
          let n = calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, String>(n)
        })
        .await
        .unwrap()
    };

    let first = fetch(cache.clone(), calls.clone()).await;
    assert_eq!(first.data, 0);
    assert_eq!(first.generation, 0);

    cache.invalidate(&key());
    assert_eq!(cache.generation(&key()), 1);

    let second = fetch(cache.clone(), calls.clone()).await;
    assert_eq!(second.data, 1);
    assert_eq!(second.source, Source::Network);
    assert_eq!(second.generation, 1);
  }

  #[tokio::test]
  async fn test_failed_fetch_is_not_cached() {
    let cache = QueryCache::new();

    let err: Result<Hit<u32>, String> = cache
      .fetch(&key(), || async { Err("connection refused".to_string()) })
      .await;
    assert_eq!(err.unwrap_err(), "connection refused");

    // Next caller retries and can succeed.
    let ok = cache
      .fetch(&key(), || async { Ok::<_, String>(7u32) })
      .await
      .unwrap();
    assert_eq!(ok.data, 7);
    assert_eq!(ok.source, Source::Network);
  }

  #[tokio::test]
  async fn test_stale_value_is_refetched() {
    let cache = QueryCache::with_stale_time(Duration::ZERO);
    let calls = Arc::new(AtomicU32::new(0));

    for expected in 0..2u32 {
      let c = calls.clone();
      let hit = cache
        .fetch(&key(), move || async move {
          Ok::<_, String>(c.fetch_add(1, Ordering::SeqCst))
        })
        .await
        .unwrap();
      assert_eq!(hit.data, expected);
      assert_eq!(hit.source, Source::Network);
    }
  }
}
