use crate::domain::ports::SessionStore;
use crate::utils::error::{AdminError, Result};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

fn poisoned<T>(_: PoisonError<T>) -> AdminError {
    AdminError::invalid_state("Session lock poisoned by an earlier panic")
}

/// 登入狀態。由呼叫端注入，所有請求共用同一份
#[derive(Clone)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
    store: Arc<dyn SessionStore>,
}

impl Session {
    /// 從 store 載入既有 token
    pub fn restore(store: Arc<dyn SessionStore>) -> Result<Self> {
        let token = store.load()?;
        if token.is_some() {
            tracing::debug!("Restored session token from store");
        }
        Ok(Self {
            token: Arc::new(RwLock::new(token)),
            store,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            store: Arc::new(MemorySessionStore::default()),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn login(&self, token: &str) -> Result<()> {
        self.store.save(token)?;
        *self.token.write().map_err(poisoned)? = Some(token.to_string());
        tracing::info!("🔑 Session started");
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        *self.token.write().map_err(poisoned)? = None;
        self.store.clear()?;
        tracing::info!("Session cleared");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().map_err(poisoned)?.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().map_err(poisoned)? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().map_err(poisoned)? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_and_logout_update_store() {
        let store = Arc::new(MemorySessionStore::default());
        let session = Session::restore(store.clone()).unwrap();
        assert!(!session.is_authenticated());

        session.login("abc123").unwrap();
        assert_eq!(session.token().as_deref(), Some("abc123"));
        assert_eq!(store.load().unwrap().as_deref(), Some("abc123"));

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_poisoned_store_fails_login() {
        let store = Arc::new(MemorySessionStore::default());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.token.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let session = Session {
            token: Arc::new(RwLock::new(None)),
            store,
        };
        let err = session.login("abc123").unwrap_err();
        assert!(matches!(err, AdminError::InvalidState { .. }));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::restore(Arc::new(MemorySessionStore::with_token("t0"))).unwrap();
        let shared = session.clone();
        session.logout().unwrap();
        assert!(!shared.is_authenticated());
    }
}
