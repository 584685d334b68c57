//! On-disk copy of the backend session cookie.
//!
//! `login` and the item requests run in separate processes, so the cookie the
//! backend sets on login is written to a JSON file and loaded by the next run.

use std::{
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    anyhow::{Context, anyhow},
    cookie_store::CookieStore,
    reqwest_cookie_store::CookieStoreMutex,
    tracing::{debug, warn},
};

/// Cookie jar shared with the HTTP client, optionally backed by a file.
#[derive(Clone)]
pub struct SessionStore {
    jar: Arc<CookieStoreMutex>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Jar that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            jar: Arc::new(CookieStoreMutex::new(CookieStore::default())),
            path: None,
        }
    }

    /// Jar seeded from `path`. A missing or unreadable file starts empty.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        let store = match std::fs::File::open(&path) {
            Ok(file) => match cookie_store::serde::json::load(BufReader::new(file)) {
                Ok(store) => {
                    debug!(path = %path.display(), "loaded saved session");
                    store
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable session file");
                    CookieStore::default()
                },
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CookieStore::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open session file");
                CookieStore::default()
            },
        };
        Self {
            jar: Arc::new(CookieStoreMutex::new(store)),
            path: Some(path),
        }
    }

    pub fn jar(&self) -> Arc<CookieStoreMutex> {
        Arc::clone(&self.jar)
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the jar to its file. Session cookies without an expiry are kept
    /// too, since they are what the backend issues on login.
    pub async fn persist(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut buf = Vec::new();
        {
            let store = self
                .jar
                .lock()
                .map_err(|_| anyhow!("session cookie jar lock poisoned"))?;
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut buf)
                .map_err(|e| anyhow!("cannot serialize session cookies: {e}"))?;
        }
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }
        tokio::fs::write(path, buf)
            .await
            .with_context(|| format!("cannot write {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        debug!(path = %path.display(), "saved session");
        Ok(())
    }

    /// Drop every cookie and delete the file.
    pub async fn clear(&self) -> anyhow::Result<()> {
        self.jar
            .lock()
            .map_err(|_| anyhow!("session cookie jar lock poisoned"))?
            .clear();
        let Some(path) = &self.path else {
            return Ok(());
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("cannot remove {}", path.display())),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn add_session_cookie(store: &SessionStore) {
        let url = url::Url::parse("http://127.0.0.1:5000/api/users/login").unwrap();
        store
            .jar
            .lock()
            .unwrap()
            .parse("session=abc123; Path=/", &url)
            .unwrap();
    }

    fn cookie_value(store: &SessionStore) -> Option<String> {
        store
            .jar
            .lock()
            .unwrap()
            .get("127.0.0.1", "/", "session")
            .map(|c| c.value().to_string())
    }

    #[tokio::test]
    async fn session_cookie_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let first = SessionStore::open(path.clone());
        add_session_cookie(&first);
        first.persist().await.unwrap();
        assert!(path.is_file());

        let second = SessionStore::open(path.clone());
        assert_eq!(cookie_value(&second).as_deref(), Some("abc123"));

        second.clear().await.unwrap();
        assert!(cookie_value(&second).is_none());
        assert!(!path.exists());
        assert!(cookie_value(&SessionStore::open(path)).is_none());
    }

    #[tokio::test]
    async fn unreadable_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(cookie_value(&SessionStore::open(path)).is_none());
    }

    #[tokio::test]
    async fn in_memory_store_never_touches_disk() {
        let store = SessionStore::in_memory();
        add_session_cookie(&store);
        store.persist().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.path().is_none());
    }
}
