use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ApiResult;
use crate::models::{Session, User};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Key/value persistence backing the session store.
pub trait SessionStorage {
    fn get(&self, key: &str) -> ApiResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> ApiResult<()>;
    fn remove(&mut self, key: &str) -> ApiResult<()>;
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes through a temporary file so readers never see a partial value.
    fn set(&mut self, key: &str, value: &str) -> ApiResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{key}.tmp.{}", std::process::id()));
        if let Err(err) = write_private(&tmp, value.as_bytes())
            .and_then(|()| std::fs::rename(&tmp, self.path_for(key)))
        {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> ApiResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Creates `path` readable by the owner only. The token is a bearer credential.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> ApiResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> ApiResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// In-memory session mirrored to a [`SessionStorage`]. The store is the only
/// writer of the persisted keys.
#[derive(Debug)]
pub struct SessionStore<S> {
    storage: S,
    token: Option<String>,
    user: Option<User>,
}

impl<S: SessionStorage> SessionStore<S> {
    /// Starts unauthenticated; call [`SessionStore::load`] to pick up persisted state.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            token: None,
            user: None,
        }
    }

    pub fn load(&mut self) -> ApiResult<()> {
        self.token = self
            .storage
            .get(TOKEN_KEY)?
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        self.user = match self.storage.get(USER_KEY)? {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring unreadable persisted user");
                    None
                }
            },
            None => None,
        };

        tracing::debug!(authenticated = self.is_authenticated(), "session loaded");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn get(&self) -> Option<Session> {
        match (&self.token, &self.user) {
            (Some(token), Some(user)) => Some(Session {
                user: user.clone(),
                token: token.clone(),
            }),
            _ => None,
        }
    }

    /// Persists the user before the token, so a failed write never leaves a
    /// token behind without its user.
    pub fn set(&mut self, session: Session) -> ApiResult<()> {
        let user_json = serde_json::to_string(&session.user)?;
        self.storage.set(USER_KEY, &user_json)?;
        self.storage.set(TOKEN_KEY, &session.token)?;
        self.token = Some(session.token);
        self.user = Some(session.user);
        Ok(())
    }

    pub fn clear(&mut self) -> ApiResult<()> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(USER_KEY)?;
        self.token = None;
        self.user = None;
        Ok(())
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn sample_session() -> Session {
        Session {
            user: User {
                username: "mehta".to_string(),
                role: Role::Counselor,
            },
            token: "jwt-123".to_string(),
        }
    }

    #[test]
    fn empty_storage_loads_unauthenticated() {
        let mut store = SessionStore::new(MemoryStorage::default());
        store.load().unwrap();
        assert!(!store.is_authenticated());
        assert!(store.get().is_none());
    }

    #[test]
    fn set_persists_both_keys() {
        let mut store = SessionStore::new(MemoryStorage::default());
        store.set(sample_session()).unwrap();
        assert_eq!(store.storage().get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-123"));
        let user = store.storage().get(USER_KEY).unwrap().unwrap();
        assert!(user.contains("\"counselor\""));
        assert_eq!(store.get(), Some(sample_session()));
    }

    #[test]
    fn clear_removes_memory_and_storage() {
        let mut store = SessionStore::new(MemoryStorage::default());
        store.set(sample_session()).unwrap();
        store.clear().unwrap();
        assert!(!store.is_authenticated());
        assert!(store.user().is_none());
        assert!(store.storage().get(TOKEN_KEY).unwrap().is_none());
        assert!(store.storage().get(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn token_alone_authenticates() {
        let mut storage = MemoryStorage::default();
        storage.set(TOKEN_KEY, "jwt-only").unwrap();
        storage.set(USER_KEY, "{not json").unwrap();
        let mut store = SessionStore::new(storage);
        store.load().unwrap();
        assert!(store.is_authenticated());
        assert!(store.user().is_none());
        assert!(store.get().is_none());
    }

    #[test]
    fn file_storage_writes_private_files_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");
        let mut store = SessionStore::new(FileStorage::new(&state));
        store.set(sample_session()).unwrap();
        store.set(sample_session()).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&state)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec![TOKEN_KEY.to_string(), USER_KEY.to_string()]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            for name in names {
                let mode = std::fs::metadata(state.join(name)).unwrap().permissions().mode();
                assert_eq!(mode & 0o777, 0o600);
            }
        }
    }

    /// Storage whose token writes always fail.
    #[derive(Default)]
    struct FailingTokenStorage {
        inner: MemoryStorage,
    }

    impl SessionStorage for FailingTokenStorage {
        fn get(&self, key: &str) -> ApiResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> ApiResult<()> {
            if key == TOKEN_KEY {
                return Err(std::io::Error::other("disk full").into());
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> ApiResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn failed_token_write_leaves_store_unauthenticated() {
        let mut store = SessionStore::new(FailingTokenStorage::default());
        assert!(store.set(sample_session()).is_err());
        assert!(!store.is_authenticated());

        let mut reloaded = SessionStore::new(FailingTokenStorage {
            inner: store.storage().inner.clone(),
        });
        reloaded.load().unwrap();
        assert!(!reloaded.is_authenticated());
    }

    #[test]
    fn file_storage_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SessionStore::new(FileStorage::new(dir.path().join("state")));
        store.set(sample_session()).unwrap();

        let mut reloaded = SessionStore::new(FileStorage::new(dir.path().join("state")));
        reloaded.load().unwrap();
        assert_eq!(reloaded.get(), Some(sample_session()));

        reloaded.clear().unwrap();
        assert!(!dir.path().join("state").join(TOKEN_KEY).exists());
        assert!(!dir.path().join("state").join(USER_KEY).exists());
    }
}
