//! Application-wide state shared with the whole UI tree

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::types::User;

/// Shared app context holding the current user.
///
/// Passed explicitly to the components that need it. `set_user` is the
/// single mutation entry point; readers see the last committed value.
#[derive(Clone)]
pub struct AppContext {
    user: Arc<watch::Sender<Option<User>>>,
    writes: Arc<AtomicU64>,
}

impl AppContext {
    pub fn new() -> Self {
        let (user, _) = watch::channel(None);
        Self {
            user: Arc::new(user),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current authenticated user (if any)
    pub fn current_user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    /// Check if a user is signed in
    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    pub fn set_user(&self, user: User) {
        tracing::info!(user_id = %user.id, "current user updated");
        self.user.send_replace(Some(user));
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Receiver notified on every `set_user`.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    /// Number of writes so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("user", &*self.user.borrow())
            .field("writes", &self.writes())
            .finish()
    }
}
