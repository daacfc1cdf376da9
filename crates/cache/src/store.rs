//! Process-wide task cache with trailing-debounce persistence

use indexmap::IndexMap;
use monoflow_core::{CacheValue, Error, Result, CACHE_DEBOUNCE};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// task name -> entry name -> value, in insertion order
pub type CacheTable = IndexMap<String, IndexMap<String, CacheValue>>;

/// Counters describing the store's persistence activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Completed writes of the backing file
    pub persisted: u64,
}

/// Key/value store scoped by task name and backed by a JSON document.
///
/// Cloning is cheap and every clone shares the same table, backing path
/// and pending timer. The in-memory table is authoritative; the file is a
/// snapshot written once no `set` has happened for the debounce window.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<Inner>,
}

struct Inner {
    table: Mutex<CacheTable>,
    path: Mutex<Option<PathBuf>>,
    dir: Mutex<Option<PathBuf>>,
    timer: Mutex<TimerSlot>,
    debounce: Duration,
    persisted: AtomicU64,
}

#[derive(Default)]
struct TimerSlot {
    armed: bool,
    deadline: Option<Instant>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> Self {
        Self::with_debounce(CACHE_DEBOUNCE)
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(CacheTable::new()),
                path: Mutex::new(None),
                dir: Mutex::new(None),
                timer: Mutex::new(TimerSlot::default()),
                debounce,
                persisted: AtomicU64::new(0),
            }),
        }
    }

    /// Set the backing file. When it exists its table replaces the one in
    /// memory; a file that does not parse as a cache table is reported as
    /// `CorruptCacheFile` and leaves the store untouched.
    pub fn configure(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| Error::file_system(&path, "read cache file", e))?;
            let table: CacheTable = serde_json::from_str(&content)
                .map_err(|e| Error::corrupt_cache_file(&path, e))?;

            tracing::debug!(
                path = %path.display(),
                tasks = table.len(),
                "Loaded task cache"
            );
            *self.inner.table.lock() = table;
        }

        *self.inner.path.lock() = Some(path);
        Ok(())
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.inner.path.lock().clone()
    }

    /// Directory handlers may use for their own cached artifacts. The store
    /// only records it; nothing is created or written there.
    pub fn set_dir(&self, dir: impl Into<PathBuf>) {
        *self.inner.dir.lock() = Some(dir.into());
    }

    pub fn dir(&self) -> Option<PathBuf> {
        self.inner.dir.lock().clone()
    }

    pub fn get(&self, task: &str, name: &str) -> Option<CacheValue> {
        self.inner
            .table
            .lock()
            .get(task)
            .and_then(|entries| entries.get(name))
            .cloned()
    }

    /// Store a value and (re)arm the persistence timer
    pub fn set(&self, task: &str, name: &str, value: impl Into<CacheValue>) {
        self.inner
            .table
            .lock()
            .entry(task.to_string())
            .or_default()
            .insert(name.to_string(), value.into());

        self.schedule_persist();
    }

    /// Copy of the whole table
    pub fn snapshot(&self) -> CacheTable {
        self.inner.table.lock().clone()
    }

    /// Write the table now and cancel any pending timer
    pub fn flush(&self) -> Result<()> {
        {
            let mut timer = self.inner.timer.lock();
            timer.deadline = None;
        }
        self.inner.persist()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            persisted: self.inner.persisted.load(Ordering::Relaxed),
        }
    }

    fn schedule_persist(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            // No runtime to host the timer
            if let Err(e) = self.inner.persist() {
                tracing::warn!(error = %e, "Failed to persist task cache");
            }
            return;
        };

        let mut timer = self.inner.timer.lock();
        timer.deadline = Some(Instant::now() + self.inner.debounce);
        if timer.armed {
            return;
        }
        timer.armed = true;
        drop(timer);

        let inner = Arc::clone(&self.inner);
        handle.spawn(async move { inner.run_timer().await });
    }
}

impl Inner {
    /// Sleep until the most recent deadline has passed without being pushed
    /// back, then persist once.
    async fn run_timer(self: Arc<Self>) {
        loop {
            let deadline = {
                let mut timer = self.timer.lock();
                match timer.deadline {
                    Some(deadline) if deadline > Instant::now() => deadline,
                    Some(_) => {
                        timer.armed = false;
                        timer.deadline = None;
                        break;
                    }
                    // flushed in the meantime
                    None => {
                        timer.armed = false;
                        return;
                    }
                }
            };
            tokio::time::sleep_until(deadline).await;
        }

        if let Err(e) = self.persist() {
            tracing::warn!(error = %e, "Failed to persist task cache");
        }
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = self.path.lock().clone() else {
            return Ok(());
        };

        let content = {
            let table = self.table.lock();
            serde_json::to_string_pretty(&*table)?
        };
        monoflow_utils::replace_file(&path, &content)?;

        self.persisted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(path = %path.display(), "Persisted task cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_is_visible_immediately() {
        let store = CacheStore::new();

        store.set("lint", "text", "hello");
        store.set("lint", "count", 3);
        store.set("lint", "clean", true);

        assert_eq!(store.get("lint", "text"), Some(CacheValue::from("hello")));
        assert_eq!(store.get("lint", "count").and_then(|v| v.as_i64()), Some(3));
        assert_eq!(store.get("lint", "clean").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn test_get_missing_task_or_entry() {
        let store = CacheStore::new();
        assert_eq!(store.get("build", "anything"), None);

        store.set("build", "hash", "abc");
        assert_eq!(store.get("build", "other"), None);
        assert_eq!(store.get("test", "hash"), None);
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let store = CacheStore::new();
        store.set("build", "hash", "abc");
        store.set("build", "hash", "def");

        assert_eq!(store.get("build", "hash"), Some(CacheValue::from("def")));
        assert_eq!(store.snapshot()["build"].len(), 1);
    }

    #[test]
    fn test_dir_is_shared_between_clones() {
        let store = CacheStore::new();
        let clone = store.clone();
        assert_eq!(clone.dir(), None);

        store.set_dir("/repo/.cache");

        assert_eq!(clone.dir(), Some(PathBuf::from("/repo/.cache")));
        assert_eq!(store.path(), None);
    }

    #[test]
    fn test_configure_missing_file_keeps_table() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::new();
        store.set("build", "hash", "abc");

        store.configure(temp_dir.path().join("absent.json")).unwrap();

        assert_eq!(store.get("build", "hash"), Some(CacheValue::from("abc")));
    }

    #[test]
    fn test_configure_replaces_table_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, r#"{"test": {"passed": true, "runs": 4}}"#).unwrap();

        let store = CacheStore::new();
        store.set("build", "hash", "abc");
        store.configure(&path).unwrap();

        assert_eq!(store.get("build", "hash"), None);
        assert_eq!(store.get("test", "passed"), Some(CacheValue::Bool(true)));
        assert_eq!(store.get("test", "runs").and_then(|v| v.as_i64()), Some(4));
    }

    #[test]
    fn test_configure_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();

        let store = CacheStore::new();
        let err = store.configure(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptCacheFile { .. }));
        assert_eq!(store.path(), None);
    }

    #[test]
    fn test_configure_rejects_non_scalar_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, r#"{"build": {"files": ["a", "b"]}}"#).unwrap();

        let err = CacheStore::new().configure(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptCacheFile { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_writes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".temp").join("cache.json");
        let store = CacheStore::new();
        store.configure(&path).unwrap();

        store.set("cache", "a", 1);
        tokio::time::sleep(Duration::from_millis(400)).await;
        store.set("cache", "b", 2);
        tokio::time::sleep(Duration::from_millis(400)).await;
        store.set("cache", "a", 3);
        tokio::time::sleep(Duration::from_millis(900)).await;

        // each set pushed the deadline back
        assert!(!path.exists());
        assert_eq!(store.stats().persisted, 0);

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.stats().persisted, 1);
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["cache"]["a"], 3);
        assert_eq!(json["cache"]["b"], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_without_path_writes_nothing() {
        let store = CacheStore::new();
        store.set("cache", "test", true);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.stats().persisted, 0);
        assert_eq!(store.get("cache", "test"), Some(CacheValue::Bool(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_immediately_and_disarms_timer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        let store = CacheStore::new();
        store.configure(&path).unwrap();

        store.set("build", "hash", "abc");
        store.flush().unwrap();
        assert!(path.exists());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.stats().persisted, 1);
    }

    #[tokio::test]
    async fn test_reload_and_persist_is_byte_identical() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        let original = "{\n  \"zeta\": {\n    \"b\": \"two\",\n    \"a\": 1.5\n  },\n  \"alpha\": {\n    \"done\": false\n  }\n}";
        fs::write(&path, original).unwrap();

        let store = CacheStore::new();
        store.configure(&path).unwrap();
        store.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_set_outside_runtime_persists_synchronously() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        let store = CacheStore::new();
        store.configure(&path).unwrap();

        store.set("build", "hash", "abc");

        assert_eq!(store.stats().persisted, 1);
        assert!(fs::read_to_string(&path).unwrap().contains("\"hash\": \"abc\""));
    }
}
