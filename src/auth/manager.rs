use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::refresh::AuthService;
use crate::error::{DispatchError, RefreshFailure};
use crate::hooks::SessionExpiredHandler;
use crate::models::auth::CredentialPair;
use crate::store::{self, CredentialStore};

type SharedRefresh = Shared<BoxFuture<'static, Result<CredentialPair, RefreshFailure>>>;

/// Session manager
/// Owns the refresh sub-protocol and the session teardown that follows a failed refresh
pub struct SessionManager {
    /// Shared credential storage
    store: Arc<dyn CredentialStore>,

    /// Remote refresh and logout operations
    auth: Arc<dyn AuthService>,

    /// Login redirect capability
    redirect: Arc<dyn SessionExpiredHandler>,

    /// Route passed to the redirect handler
    login_route: String,

    /// Refreshes in flight, keyed by the refresh token they were started with
    in_flight: Arc<Mutex<HashMap<String, SharedRefresh>>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        auth: Arc<dyn AuthService>,
        redirect: Arc<dyn SessionExpiredHandler>,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            store,
            auth,
            redirect,
            login_route: login_route.into(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Stored access token, if any
    pub fn access_token(&self) -> Result<Option<String>, DispatchError> {
        store::access_token(self.store.as_ref()).map_err(|e| DispatchError::Store(format!("{:#}", e)))
    }

    /// Send the application to the login entry point
    pub fn redirect_to_login(&self) {
        self.redirect.redirect_to_login(&self.login_route);
    }

    /// Refresh the stored credentials
    ///
    /// Concurrent callers holding the same refresh token share one auth service
    /// call. On failure the session is torn down once (logout, credentials
    /// cleared, login redirect) and every waiting caller receives the failure.
    pub async fn refresh(&self) -> Result<CredentialPair, DispatchError> {
        let refresh_token = store::refresh_token(self.store.as_ref())
            .map_err(|e| DispatchError::Store(format!("{:#}", e)))?
            .ok_or(DispatchError::RefreshFailed(RefreshFailure::NoRefreshToken))?;

        let refresh = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            in_flight
                .entry(refresh_token.clone())
                .or_insert_with(|| {
                    tracing::debug!("Starting credential refresh");
                    self.start_refresh(refresh_token)
                })
                .clone()
        };

        refresh.await.map_err(DispatchError::RefreshFailed)
    }

    /// Number of refreshes currently in flight
    pub fn pending_refreshes(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn start_refresh(&self, refresh_token: String) -> SharedRefresh {
        let store = self.store.clone();
        let auth = self.auth.clone();
        let redirect = self.redirect.clone();
        let login_route = self.login_route.clone();
        let in_flight = self.in_flight.clone();

        async move {
            let outcome = match auth.refresh_credential(&refresh_token).await {
                Ok(pair) => store::save_pair(store.as_ref(), &pair)
                    .map(|_| pair)
                    .map_err(|e| format!("failed to store refreshed credentials: {:#}", e)),
                Err(e) => Err(format!("{:#}", e)),
            };

            let result = match outcome {
                Ok(pair) => {
                    tracing::info!("Stored refreshed credentials");
                    Ok(pair)
                }
                Err(reason) => {
                    tracing::error!("Credential refresh failed: {}", reason);
                    end_session(store.as_ref(), auth.as_ref(), redirect.as_ref(), &login_route)
                        .await;
                    Err(RefreshFailure::Rejected(reason))
                }
            };

            in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&refresh_token);

            result
        }
        .boxed()
        .shared()
    }
}

/// Logout, drop local credentials and redirect to login
async fn end_session(
    store: &dyn CredentialStore,
    auth: &dyn AuthService,
    redirect: &dyn SessionExpiredHandler,
    login_route: &str,
) {
    let access_token = store::access_token(store).unwrap_or_else(|e| {
        tracing::warn!("Failed to read access token for logout: {:#}", e);
        None
    });
    if let Err(e) = auth.logout(access_token.as_deref()).await {
        tracing::warn!("Logout failed: {:#}", e);
    }
    if let Err(e) = store::clear(store) {
        tracing::warn!("Failed to clear stored credentials: {:#}", e);
    }
    redirect.redirect_to_login(login_route);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeAuth {
        refreshes: AtomicUsize,
        logouts: AtomicUsize,
        logout_tokens: Mutex<Vec<Option<String>>>,
        fail: bool,
        delay: Duration,
    }

    impl FakeAuth {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                refreshes: AtomicUsize::new(0),
                logouts: AtomicUsize::new(0),
                logout_tokens: Mutex::new(Vec::new()),
                fail,
                delay: Duration::from_millis(20),
            })
        }
    }

    #[async_trait]
    impl AuthService for FakeAuth {
        async fn refresh_credential(&self, refresh_token: &str) -> anyhow::Result<CredentialPair> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                anyhow::bail!("refresh token revoked");
            }
            Ok(CredentialPair {
                access_token: format!("access-from-{}", refresh_token),
                access_expiry: None,
                refresh_token: "refresh-2".to_string(),
                refresh_expiry: None,
            })
        }

        async fn logout(&self, access_token: Option<&str>) -> anyhow::Result<()> {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            self.logout_tokens
                .lock()
                .unwrap()
                .push(access_token.map(str::to_string));
            Ok(())
        }
    }

    fn manager(
        store: MemoryStore,
        auth: Arc<FakeAuth>,
    ) -> (SessionManager, Arc<AtomicUsize>) {
        let redirects = Arc::new(AtomicUsize::new(0));
        let counter = redirects.clone();
        let redirect = move |route: &str| {
            assert_eq!(route, "/login");
            counter.fetch_add(1, Ordering::SeqCst);
        };
        let manager = SessionManager::new(Arc::new(store), auth, Arc::new(redirect), "/login");
        (manager, redirects)
    }

    #[tokio::test]
    async fn test_refresh_stores_new_pair_under_fixed_keys() {
        let store = MemoryStore::with_tokens(Some("access-1"), Some("refresh-1"));
        let auth = FakeAuth::new(false);
        let (manager, redirects) = manager(store.clone(), auth.clone());

        let pair = manager.refresh().await.unwrap();
        assert_eq!(pair.access_token, "access-from-refresh-1");

        assert_eq!(
            store.get("access").unwrap().as_deref(),
            Some("access-from-refresh-1")
        );
        assert_eq!(store.get("refresh").unwrap().as_deref(), Some("refresh-2"));
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(auth.logouts.load(Ordering::SeqCst), 0);
        assert_eq!(redirects.load(Ordering::SeqCst), 0);
        assert_eq!(manager.pending_refreshes(), 0);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_skips_auth_service() {
        let store = MemoryStore::with_tokens(Some("access-1"), None);
        let auth = FakeAuth::new(false);
        let (manager, redirects) = manager(store, auth.clone());

        let err = manager.refresh().await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::RefreshFailed(RefreshFailure::NoRefreshToken)
        ));
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(auth.logouts.load(Ordering::SeqCst), 0);
        assert_eq!(redirects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_ends_session_once() {
        let store = MemoryStore::with_tokens(Some("access-1"), Some("refresh-1"));
        let auth = FakeAuth::new(true);
        let (manager, redirects) = manager(store.clone(), auth.clone());

        let err = manager.refresh().await.unwrap_err();
        assert!(err.redirected());
        assert_eq!(auth.logouts.load(Ordering::SeqCst), 1);
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_logout_uses_access_token_read_before_clearing() {
        let store = MemoryStore::with_tokens(Some("access-1"), Some("refresh-1"));
        let auth = FakeAuth::new(true);
        let (manager, _) = manager(store.clone(), auth.clone());

        manager.refresh().await.unwrap_err();
        assert_eq!(
            *auth.logout_tokens.lock().unwrap(),
            vec![Some("access-1".to_string())]
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_are_deduplicated() {
        let store = MemoryStore::with_tokens(Some("access-1"), Some("refresh-1"));
        let auth = FakeAuth::new(false);
        let (manager, _) = manager(store, auth.clone());

        let (a, b, c) = tokio::join!(manager.refresh(), manager.refresh(), manager.refresh());
        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(manager.pending_refreshes(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_failures_tear_down_once() {
        let store = MemoryStore::with_tokens(Some("access-1"), Some("refresh-1"));
        let auth = FakeAuth::new(true);
        let (manager, redirects) = manager(store, auth.clone());

        let (a, b) = tokio::join!(manager.refresh(), manager.refresh());
        assert!(a.is_err() && b.is_err());
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(auth.logouts.load(Ordering::SeqCst), 1);
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
    }
}
