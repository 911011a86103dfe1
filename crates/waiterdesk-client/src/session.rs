//! Persisted session state.
//!
//! The session (bearer token + user profile) lives in a small key-value store
//! under two fixed keys and is always written and cleared as a pair. The store
//! is pluggable: [`FileKeyValueStore`] for the CLI, [`MemoryKeyValueStore`]
//! for tests and embedders that persist elsewhere.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;
use tokio::sync::watch;

use waiterdesk_core::prelude::*;
use waiterdesk_core::{Session, User};

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key holding the JSON-encoded user profile.
pub const USER_KEY: &str = "auth_user";

/// Minimal synchronous key-value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

/// Process-local store. Counts removals so callers can assert clear semantics.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
    removals: Mutex<BTreeMap<String, usize>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `key` was removed while present.
    pub fn removal_count(&self, key: &str) -> usize {
        self.removals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.remove(key).is_some() {
            let mut removals = self.removals.lock().unwrap_or_else(|e| e.into_inner());
            *removals.entry(key.to_string()).or_insert(0) += 1;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File store
// ─────────────────────────────────────────────────────────────────────────────

/// JSON object on disk, rewritten atomically (temp file + rename) on every
/// change. An advisory lock on a sidecar file serializes writers across
/// processes.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    /// Default location: `<data dir>/waiterdesk/session.json`.
    pub fn default_path() -> PathBuf {
        dirs_data_dir().join("waiterdesk").join("session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            Error::storage(format!("{} is corrupt: {e}", self.path.display()))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        let temp_path = self.path.with_extension("json.tmp");
        write_private(&temp_path, content.as_bytes())
            .map_err(|e| Error::storage(format!("Failed to write temp file: {e}")))?;
        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| Error::storage(format!("Failed to rename temp file: {e}")))?;
        Ok(())
    }

    /// Run `f` over the stored map while holding the cross-process lock.
    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        lock_file
            .lock_exclusive()
            .map_err(|e| Error::storage(format!("Failed to lock session store: {e}")))?;

        let result = self.read_all().and_then(|mut entries| {
            if f(&mut entries) {
                self.write_all(&entries)
            } else {
                Ok(())
            }
        });

        if let Err(e) = lock_file.unlock() {
            warn!("Failed to unlock {:?}: {}", self.lock_path, e);
        }
        result
    }
}

fn dirs_data_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Write `bytes` to a fresh file readable only by the owner; the store holds
/// a bearer token.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session store
// ─────────────────────────────────────────────────────────────────────────────

/// Typed access to the persisted session.
///
/// Clones share the same backing store, write gate and change notifications.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    /// Serializes compare-and-clear against save within this process.
    gate: Arc<Mutex<()>>,
    authenticated: Arc<watch::Sender<bool>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &*self.authenticated.borrow())
            .finish()
    }
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let has_token = matches!(store.get(TOKEN_KEY), Ok(Some(_)));
        let (tx, _rx) = watch::channel(has_token);
        Self {
            store,
            gate: Arc::new(Mutex::new(())),
            authenticated: Arc::new(tx),
        }
    }

    /// Session store over a fresh [`MemoryKeyValueStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValueStore::new()))
    }

    /// Persist token and user together.
    pub fn save(&self, session: &Session) -> Result<()> {
        let user = serde_json::to_string(&session.user)?;
        let _guard = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        self.store.set(USER_KEY, &user)?;
        self.store.set(TOKEN_KEY, &session.token)?;
        self.authenticated.send_replace(true);
        debug!("Session saved for user {}", session.user.id);
        Ok(())
    }

    /// Load the persisted session, if both halves are present.
    pub fn load(&self) -> Result<Option<Session>> {
        let Some(token) = self.store.get(TOKEN_KEY)? else {
            return Ok(None);
        };
        let Some(user) = self.store.get(USER_KEY)? else {
            return Ok(None);
        };
        let user: User = serde_json::from_str(&user)
            .map_err(|e| Error::storage(format!("Stored user profile is invalid: {e}")))?;
        Ok(Some(Session { token, user }))
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.store.get(TOKEN_KEY)
    }

    /// Remove token and user.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        self.clear_locked()
    }

    /// Clear the session only if it still holds `token`.
    ///
    /// Returns `true` when this call performed the clear. Concurrent callers
    /// that observed the same stale token get `false`.
    pub fn clear_if_token(&self, token: &str) -> Result<bool> {
        let _guard = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        match self.store.get(TOKEN_KEY)? {
            Some(current) if current == token => {
                self.clear_locked()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn clear_locked(&self) -> Result<()> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)?;
        self.authenticated.send_replace(false);
        Ok(())
    }

    /// Observe login/logout transitions (`true` while a token is stored).
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use waiterdesk_core::UserRole;

    fn session(token: &str) -> Session {
        Session {
            token: token.to_string(),
            user: User {
                id: "u1".into(),
                name: "Ana".into(),
                email: "ana@example.com".into(),
                role: UserRole::Waiter,
                restaurant_id: Some("r1".into()),
            },
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = SessionStore::in_memory();
        assert!(store.load().unwrap().is_none());

        store.save(&session("tok")).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.token, "tok");
        assert_eq!(loaded.user.restaurant_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_clear_removes_both_keys() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = SessionStore::new(kv.clone());
        store.save(&session("tok")).unwrap();

        store.clear().unwrap();
        assert!(kv.get(TOKEN_KEY).unwrap().is_none());
        assert!(kv.get(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_clear_if_token_only_matches_current() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = SessionStore::new(kv.clone());
        store.save(&session("new-token")).unwrap();

        assert!(!store.clear_if_token("old-token").unwrap());
        assert!(store.token().unwrap().is_some());

        assert!(store.clear_if_token("new-token").unwrap());
        assert!(!store.clear_if_token("new-token").unwrap());
        assert_eq!(kv.removal_count(TOKEN_KEY), 1);
    }

    #[test]
    fn test_subscribe_tracks_authentication() {
        let store = SessionStore::in_memory();
        let rx = store.subscribe();
        assert!(!*rx.borrow());

        store.save(&session("tok")).unwrap();
        assert!(*rx.borrow());

        store.clear().unwrap();
        assert!(!*rx.borrow());
    }

    #[test]
    fn test_token_without_user_is_no_session() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(TOKEN_KEY, "tok").unwrap();
        let store = SessionStore::new(kv);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_user_is_storage_error() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(TOKEN_KEY, "tok").unwrap();
        kv.set(USER_KEY, "{not json").unwrap();
        let store = SessionStore::new(kv);
        assert!(matches!(store.load(), Err(Error::Storage { .. })));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("session.json");

        let first = SessionStore::new(Arc::new(FileKeyValueStore::new(&path)));
        first.save(&session("disk-token")).unwrap();

        let second = SessionStore::new(Arc::new(FileKeyValueStore::new(&path)));
        assert_eq!(second.token().unwrap().as_deref(), Some("disk-token"));
        assert!(*second.subscribe().borrow());

        second.clear().unwrap();
        assert!(first.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let temp = tempdir().unwrap();
        let store = FileKeyValueStore::new(temp.path().join("absent.json"));
        assert!(store.get(TOKEN_KEY).unwrap().is_none());
        // Removing from a missing file must not create it.
        store.remove(TOKEN_KEY).unwrap();
        assert!(!store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let path = temp.path().join("session.json");
        // A stale temp file left world-readable by an earlier crash
        std::fs::write(path.with_extension("json.tmp"), "{}").unwrap();

        let store = FileKeyValueStore::new(&path);
        store.set(TOKEN_KEY, "secret").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("session.json");
        std::fs::write(&path, "[1,2,3]").unwrap();
        let store = FileKeyValueStore::new(&path);
        assert!(matches!(store.get(TOKEN_KEY), Err(Error::Storage { .. })));
    }
}
