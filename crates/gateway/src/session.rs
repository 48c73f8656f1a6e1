// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Per-root session cache.
//!
//! Each root gets its own `OnceCell`, so concurrent first callers for the
//! same root share one authorization while other roots proceed
//! independently. A failed authorization leaves the cell empty and the next
//! caller tries again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::id::RootName;

/// Produces an authenticated session for a root.
///
/// The credential is an opaque key; gateways pass it through untouched.
#[async_trait]
pub trait Authorizer<S>: Send + Sync {
    async fn authorize(&self, root: &RootName, credential: Option<&str>) -> Result<S>;
}

pub struct SessionCache<S> {
    sessions: Mutex<HashMap<RootName, Arc<OnceCell<Arc<S>>>>>,
}

impl<S> Default for SessionCache<S> {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: Send + Sync> SessionCache<S> {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, root: &RootName) -> Arc<OnceCell<Arc<S>>> {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions
            .entry(root.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Returns the cached session for `root`, authorizing on first use
    pub async fn get_or_authorize(
        &self,
        root: &RootName,
        credential: Option<&str>,
        authorizer: &dyn Authorizer<S>,
    ) -> Result<Arc<S>> {
        let cell = self.cell(root);
        let session = cell
            .get_or_try_init(|| async {
                diagnostics::info!("Authorizing root {root}", root: root.to_string());
                authorizer.authorize(root, credential).await.map(Arc::new)
            })
            .await?;
        Ok(session.clone())
    }

    /// The session for `root` if one has already been established
    pub fn get(&self, root: &RootName) -> Option<Arc<S>> {
        let sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.get(root).and_then(|cell| cell.get().cloned())
    }

    #[must_use]
    pub fn contains(&self, root: &RootName) -> bool {
        self.get(root).is_some()
    }

    /// Number of established sessions
    #[must_use]
    pub fn len(&self) -> usize {
        let sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.values().filter(|cell| cell.initialized()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, Operation};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingAuthorizer {
        handshakes: AtomicUsize,
        failures_left: AtomicUsize,
    }

    impl CountingAuthorizer {
        fn new(failures: usize) -> Self {
            Self {
                handshakes: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl Authorizer<String> for CountingAuthorizer {
        async fn authorize(&self, root: &RootName, _credential: Option<&str>) -> Result<String> {
            let n = self.handshakes.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                return Err(GatewayError::root_unresolved(
                    Operation::GetRoot,
                    root,
                    "handshake rejected",
                ));
            }
            Ok(format!("session-{}-{}", root.root(), n))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_authorizes_once() {
        let cache = Arc::new(SessionCache::<String>::new());
        let auth = Arc::new(CountingAuthorizer::new(0));
        let root = RootName::new("sim", "shared");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let (cache, auth, root) = (cache.clone(), auth.clone(), root.clone());
            handles.push(tokio::spawn(async move {
                cache.get_or_authorize(&root, None, auth.as_ref()).await
            }));
        }

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(auth.handshakes.load(Ordering::SeqCst), 1);
        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_roots_get_separate_sessions() {
        let cache = SessionCache::<String>::new();
        let auth = CountingAuthorizer::new(0);
        let a = cache
            .get_or_authorize(&RootName::new("sim", "a"), None, &auth)
            .await
            .unwrap();
        let b = cache
            .get_or_authorize(&RootName::new("sim", "b"), None, &auth)
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(auth.handshakes.load(Ordering::SeqCst), 2);

        let again = cache
            .get_or_authorize(&RootName::new("sim", "a"), None, &auth)
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(auth.handshakes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_authorization_is_not_cached() {
        let cache = SessionCache::<String>::new();
        let auth = CountingAuthorizer::new(1);
        let root = RootName::new("sim", "flaky");

        let err = cache.get_or_authorize(&root, None, &auth).await.unwrap_err();
        assert!(matches!(err, GatewayError::RootUnresolved { .. }));
        assert!(!cache.contains(&root));
        assert!(cache.is_empty());

        let session = cache.get_or_authorize(&root, None, &auth).await.unwrap();
        assert_eq!(session.as_str(), "session-flaky-2");
        assert!(cache.contains(&root));
    }
}
