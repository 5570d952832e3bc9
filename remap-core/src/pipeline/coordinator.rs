use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::cache::layout::{ArtifactKind, CacheKey};
use crate::cache::store::CacheStore;
use crate::error::{RemapError, Result};

/// What a producer hands back: a staged artifact plus an optional integrity
/// marker the store verifies before publication.
#[derive(Clone, Debug)]
pub struct BuildProduct {
    pub temp_path: PathBuf,
    pub expected_hash: Option<String>,
}

impl BuildProduct {
    pub fn new(temp_path: impl Into<PathBuf>) -> Self {
        Self {
            temp_path: temp_path.into(),
            expected_hash: None,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.expected_hash = Some(hash.into());
        self
    }
}

type FlightKey = (ArtifactKind, CacheKey);
/// Settled outcome fanned out to every waiter. Failures carry an equivalent
/// description rather than the original error, which is not shareable.
type Outcome = std::result::Result<PathBuf, String>;

enum Role {
    Leader(watch::Sender<Option<Outcome>>),
    Waiter(watch::Receiver<Option<Outcome>>),
}

/// Deduplicates concurrent builds per (kind, key): at most one producer runs
/// for a key at a time, later callers await the same in-flight result, and
/// unrelated keys never block each other.
pub struct Coordinator {
    cache: Arc<CacheStore>,
    in_flight: DashMap<FlightKey, watch::Receiver<Option<Outcome>>>,
}

impl Coordinator {
    pub fn new(cache: Arc<CacheStore>) -> Self {
        Self {
            cache,
            in_flight: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Return the cached artifact for (kind, key), or run `producer` to build
    /// it, publishing the result on success. Concurrent callers for the same
    /// key share one producer invocation; each retry after a failure starts a
    /// fresh build.
    pub async fn get_or_build<F, Fut>(
        &self,
        kind: ArtifactKind,
        key: &CacheKey,
        producer: F,
    ) -> Result<PathBuf>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BuildProduct>>,
    {
        if let Some(path) = self.cache.locate(kind, key) {
            tracing::debug!(%kind, %key, "cache hit");
            return Ok(path);
        }

        // Atomic check-and-insert of the in-flight marker. The watch cell
        // retains its settled value, so a receiver obtained here can never
        // miss the wakeup even if the marker is removed before it polls.
        let role = match self.in_flight.entry((kind, key.clone())) {
            Entry::Occupied(occupied) => Role::Waiter(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                vacant.insert(rx);
                Role::Leader(tx)
            }
        };

        match role {
            Role::Waiter(rx) => {
                tracing::debug!(%kind, %key, "awaiting in-flight build");
                await_outcome(rx).await
            }
            Role::Leader(tx) => {
                let guard = FlightGuard {
                    map: &self.in_flight,
                    key: (kind, key.clone()),
                };
                tracing::info!(%kind, %key, "starting build");
                let outcome = self.run_build(kind, key, producer).await;
                let shared: Outcome = match &outcome {
                    Ok(path) => Ok(path.clone()),
                    Err(e) => Err(e.to_string()),
                };
                // settle before the guard removes the marker
                let _ = tx.send(Some(shared));
                drop(guard);
                outcome
            }
        }
    }

    async fn run_build<F, Fut>(&self, kind: ArtifactKind, key: &CacheKey, producer: F) -> Result<PathBuf>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BuildProduct>>,
    {
        let product = producer().await?;
        self.cache
            .publish(kind, key, &product.temp_path, product.expected_hash.as_deref())
    }
}

async fn await_outcome(mut rx: watch::Receiver<Option<Outcome>>) -> Result<PathBuf> {
    let settled = rx
        .wait_for(Option::is_some)
        .await
        .map_err(|_| RemapError::Build("build abandoned before completion".to_string()))?
        .clone();
    match settled {
        Some(Ok(path)) => Ok(path),
        Some(Err(message)) => Err(RemapError::Build(message)),
        None => Err(RemapError::Build("build settled without an outcome".to_string())),
    }
}

/// Clears the in-flight marker once the build settles, including when the
/// leader's future is dropped mid-build.
struct FlightGuard<'a> {
    map: &'a DashMap<FlightKey, watch::Receiver<Option<Outcome>>>,
    key: FlightKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (tempfile::TempDir, Coordinator) {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = Arc::new(CacheStore::open(dir.path().join("cache")).expect("open"));
        (dir, Coordinator::new(cache))
    }

    fn key() -> CacheKey {
        CacheKey::new("1.21.4", "mojmap")
    }

    async fn write_staged(coordinator: &Coordinator, name: &str, data: &[u8]) -> PathBuf {
        let path = coordinator.cache().staging_dir().join(name);
        tokio::fs::write(&path, data).await.expect("stage");
        path
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_producer() {
        let (_dir, coordinator) = setup();
        let calls = AtomicUsize::new(0);

        let build = |tag: usize| {
            let calls = &calls;
            let coordinator = &coordinator;
            async move {
                coordinator
                    .get_or_build(ArtifactKind::MappingFile, &key(), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        let temp =
                            write_staged(coordinator, &format!("b{tag}.tiny"), b"mapping").await;
                        Ok(BuildProduct::new(temp))
                    })
                    .await
            }
        };

        let (a, b, c) = tokio::join!(build(0), build(1), build(2));
        let path = a.expect("a");
        assert_eq!(b.expect("b"), path);
        assert_eq!(c.expect("c"), path);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn dedup_holds_across_spawned_tasks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = Arc::new(CacheStore::open(dir.path().join("cache")).expect("open"));
        let coordinator = Arc::new(Coordinator::new(cache));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let coordinator = Arc::clone(&coordinator);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                coordinator
                    .get_or_build(ArtifactKind::MappingFile, &key(), || {
                        let coordinator = Arc::clone(&coordinator);
                        let calls = Arc::clone(&calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
                            let temp = coordinator.cache().staging_dir().join("contended.tiny");
                            tokio::fs::write(&temp, b"mapping").await?;
                            Ok(BuildProduct::new(temp))
                        }
                    })
                    .await
            }));
        }
        let mut paths = Vec::new();
        for handle in handles {
            paths.push(handle.await.expect("join").expect("build"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(paths.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn cache_hit_short_circuits_producer() {
        let (_dir, coordinator) = setup();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            coordinator
                .get_or_build(ArtifactKind::MappingFile, &key(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let temp = write_staged(&coordinator, "once.tiny", b"mapping").await;
                    Ok(BuildProduct::new(temp))
                })
                .await
                .expect("build");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_reaches_every_waiter_and_retry_is_fresh() {
        let (_dir, coordinator) = setup();

        let failing = |_: usize| {
            let coordinator = &coordinator;
            async move {
                coordinator
                    .get_or_build(ArtifactKind::RenamedJar, &key(), || async {
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Err::<BuildProduct, _>(RemapError::Build("renamer exploded".into()))
                    })
                    .await
            }
        };
        let (a, b) = tokio::join!(failing(0), failing(1));
        for result in [a, b] {
            let err = result.unwrap_err();
            assert!(err.to_string().contains("renamer exploded"), "{err}");
        }

        // marker cleared: the next call invokes a fresh producer and succeeds
        let temp = write_staged(&coordinator, "retry.jar", b"jar").await;
        let path = coordinator
            .get_or_build(ArtifactKind::RenamedJar, &key(), || async {
                Ok(BuildProduct::new(temp))
            })
            .await
            .expect("retry");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn corrupt_product_fails_the_build_and_caches_nothing() {
        let (_dir, coordinator) = setup();
        let temp = write_staged(&coordinator, "bad.tiny", b"corrupt").await;
        let err = coordinator
            .get_or_build(ArtifactKind::MappingFile, &key(), || async {
                Ok(BuildProduct::new(temp).with_hash("00ff"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RemapError::CacheCorruption { .. }));
        assert!(!coordinator.cache().has(ArtifactKind::MappingFile, &key()));
    }

    #[tokio::test]
    async fn distinct_keys_build_independently() {
        let (_dir, coordinator) = setup();
        let calls = AtomicUsize::new(0);

        for version in ["1.21.3", "1.21.4"] {
            let k = CacheKey::new(version, "mojmap");
            coordinator
                .get_or_build(ArtifactKind::MappingFile, &k, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let temp =
                        write_staged(&coordinator, &format!("{version}.tiny"), b"mapping").await;
                    Ok(BuildProduct::new(temp))
                })
                .await
                .expect("build");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
