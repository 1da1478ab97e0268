//! Secret-gated fetch.
//!
//! `fetch` is the only operation that writes to the sandbox, so it is the
//! only one that checks the write secret.

use std::sync::Arc;

use ripple_core::{History, WriteSecret};
use ripple_store::LocalStore;
use tracing::{info, warn};

use crate::{QueryError, QueryRouter};

/// Fetches files from the network into the local sandbox.
pub struct AccessGate {
    secret: WriteSecret,
    router: Arc<QueryRouter>,
    store: Arc<LocalStore>,
}

impl AccessGate {
    /// Creates a gate guarded by `secret`.
    pub fn new(secret: WriteSecret, router: Arc<QueryRouter>, store: Arc<LocalStore>) -> Self {
        Self {
            secret,
            router,
            store,
        }
    }

    /// Resolves `name` through the network and stores it locally.
    ///
    /// A wrong secret is refused before any query is made.
    pub async fn fetch(&self, name: &str, secret: &str) -> Result<(), QueryError> {
        if !self.secret.matches(secret) {
            warn!(name, "Fetch refused: wrong secret");
            return Err(QueryError::AccessDenied("wrong secret".into()));
        }

        let content = self.router.query(name, &History::new()).await?;

        // The target may not exist yet; containment is judged on the resolved path
        if !self.store.is_contained(name) {
            warn!(name, "Fetch refused: target escapes sandbox");
            return Err(QueryError::AccessDenied(name.to_string()));
        }

        self.store.write(name, &content)?;
        info!(name, size = content.len(), "Fetched file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, router, Reply, ScriptedClient};
    use std::fs;

    fn gate(
        root: &std::path::Path,
        client: Arc<ScriptedClient>,
    ) -> (AccessGate, Arc<LocalStore>) {
        let (router, _, store) = router(root, "me:1", &["p:1"], client, 6);
        let gate = AccessGate::new(
            WriteSecret::new("sesame"),
            Arc::new(router),
            store.clone(),
        );
        (gate, store)
    }

    #[tokio::test]
    async fn test_wrong_secret_makes_no_calls_and_no_writes() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new();
        client.script(&addr("p:1"), Reply::Content("remote"));
        let (gate, store) = gate(dir.path(), client.clone());

        let err = gate.fetch("x.txt", "open").await.unwrap_err();

        assert!(matches!(err, QueryError::AccessDenied(_)));
        assert_eq!(client.query_count(), 0);
        assert_eq!(store.stats().writes, 0);
        assert!(!dir.path().join("x.txt").exists());
    }

    #[tokio::test]
    async fn test_fetch_writes_remote_content() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new();
        client.script(&addr("p:1"), Reply::Content("remote"));
        let (gate, _) = gate(dir.path(), client.clone());

        gate.fetch("x.txt", "sesame").await.unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("x.txt")).unwrap(), "remote");
        // Top-level floods start from a fresh history
        let (_, _, history, _) = client.queries.lock()[0].clone();
        assert_eq!(history.as_slice(), &[addr("me:1")]);
    }

    #[tokio::test]
    async fn test_fetch_overwrites_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/old.txt"), "old").unwrap();
        let client = ScriptedClient::new();
        client.script(&addr("p:1"), Reply::Content("new"));
        let (gate, _) = gate(dir.path(), client.clone());

        // Local hit: content is rewritten in place
        gate.fetch("sub/old.txt", "sesame").await.unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("sub/old.txt")).unwrap(),
            "old"
        );

        gate.fetch("deep/er/new.txt", "sesame").await.unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("deep/er/new.txt")).unwrap(),
            "new"
        );
    }

    #[tokio::test]
    async fn test_unhandled_leaves_sandbox_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new();
        client.script(&addr("p:1"), Reply::Unhandled);
        let (gate, store) = gate(dir.path(), client.clone());

        let err = gate.fetch("missing.txt", "sesame").await.unwrap_err();

        assert_eq!(err, QueryError::Unhandled);
        assert_eq!(store.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_escaping_target_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        let client = ScriptedClient::new();
        client.script(&addr("p:1"), Reply::Content("payload"));
        let (gate, store) = gate(&root, client.clone());

        let err = gate.fetch("../planted.txt", "sesame").await.unwrap_err();

        assert!(matches!(err, QueryError::AccessDenied(_)));
        assert!(!dir.path().join("planted.txt").exists());
        assert_eq!(store.stats().writes, 0);
    }
}
