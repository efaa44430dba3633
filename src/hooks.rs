// Injectable side effects: login redirect and user-facing error surfacing

use crate::error::DispatchError;

/// Invoked when the session can no longer be used and the user must log in again
pub trait SessionExpiredHandler: Send + Sync {
    fn redirect_to_login(&self, route: &str);
}

/// Default UI error surfacing
pub trait ErrorNotifier: Send + Sync {
    fn notify(&self, error: &DispatchError);
}

impl<F> SessionExpiredHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect_to_login(&self, route: &str) {
        self(route)
    }
}

impl<F> ErrorNotifier for F
where
    F: Fn(&DispatchError) + Send + Sync,
{
    fn notify(&self, error: &DispatchError) {
        self(error)
    }
}

/// Logs the redirect instead of navigating
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl SessionExpiredHandler for LogRedirect {
    fn redirect_to_login(&self, route: &str) {
        tracing::warn!(route = route, "Session unusable, redirecting to login");
    }
}

/// Surfaces errors through the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ErrorNotifier for LogNotifier {
    fn notify(&self, error: &DispatchError) {
        tracing::error!(code = error.error_code(), "{}", error);
    }
}
