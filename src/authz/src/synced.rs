//! Enforcer shared between tasks, with periodic policy reload
//!
//! Decisions take a read lock and mutations a write lock on the wrapped
//! [`Enforcer`]. A reload builds the new rows and role graphs before taking
//! their place, so a decision sees either the old policy or the new one.

use crate::enforcer::Enforcer;
use crate::error::Result;
use crate::matcher::Value;
use crate::types::{PolicyOp, Rule};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handle of a running reload loop
struct AutoLoad {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Thread-safe enforcer
pub struct SyncedEnforcer {
    enforcer: Arc<RwLock<Enforcer>>,
    auto_load: Mutex<Option<AutoLoad>>,
}

impl SyncedEnforcer {
    pub fn new(enforcer: Enforcer) -> Self {
        Self {
            enforcer: Arc::new(RwLock::new(enforcer)),
            auto_load: Mutex::new(None),
        }
    }

    /// Shared read access to the wrapped enforcer
    pub async fn read(&self) -> RwLockReadGuard<'_, Enforcer> {
        self.enforcer.read().await
    }

    /// Exclusive access to the wrapped enforcer
    pub async fn write(&self) -> RwLockWriteGuard<'_, Enforcer> {
        self.enforcer.write().await
    }

    pub async fn enforce<I, V>(&self, rvals: I) -> Result<bool>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enforcer.read().await.enforce(rvals)
    }

    pub async fn enforce_ex<I, V>(&self, rvals: I) -> Result<(bool, Vec<String>)>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enforcer.read().await.enforce_ex(rvals)
    }

    /// Reload the policy from the adapter
    pub async fn load_policy(&self) -> Result<()> {
        self.enforcer.write().await.load_policy().await
    }

    pub async fn save_policy(&self) -> Result<()> {
        self.enforcer.write().await.save_policy().await
    }

    // ========================================================================
    // Auto-load
    // ========================================================================

    /// Reload the policy every `interval` on a background task
    ///
    /// Returns false if a reload loop is already running. Failed reloads are
    /// logged and leave the current policy in place.
    pub fn start_auto_load_policy(&self, interval: Duration) -> bool {
        let mut auto_load = self.auto_load.lock();
        if auto_load.as_ref().is_some_and(|running| !running.handle.is_finished()) {
            return false;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let enforcer = self.enforcer.clone();
        let handle = tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "Auto-load policy started");
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let mut enforcer = enforcer.write().await;
                        match enforcer.load_policy().await {
                            Ok(()) => debug!("Auto-load policy reloaded"),
                            Err(err) => warn!(error = %err, "Auto-load policy failed"),
                        }
                    }
                }
            }
            info!("Auto-load policy stopped");
        });

        *auto_load = Some(AutoLoad { token, handle });
        true
    }

    /// Stop the reload loop and wait for it to finish
    pub async fn stop_auto_load_policy(&self) {
        let running = self.auto_load.lock().take();
        if let Some(AutoLoad { token, handle }) = running {
            token.cancel();
            if let Err(err) = handle.await {
                warn!(error = %err, "Auto-load task ended abnormally");
            }
        }
    }

    pub fn is_auto_loading_running(&self) -> bool {
        self.auto_load
            .lock()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    // ========================================================================
    // Delegated mutations
    // ========================================================================

    pub async fn add_policy<S: AsRef<str>>(&self, params: &[S]) -> Result<bool> {
        self.enforcer.write().await.add_policy(params).await
    }

    pub async fn add_policies(&self, rules: Vec<Rule>) -> Result<bool> {
        self.enforcer.write().await.add_policies(rules).await
    }

    pub async fn update_policy<S: AsRef<str>>(&self, old_rule: &[S], new_rule: &[S]) -> Result<bool> {
        self.enforcer
            .write()
            .await
            .update_policy(old_rule, new_rule)
            .await
    }

    pub async fn remove_policy<S: AsRef<str>>(&self, params: &[S]) -> Result<bool> {
        self.enforcer.write().await.remove_policy(params).await
    }

    pub async fn remove_policies(&self, rules: Vec<Rule>) -> Result<bool> {
        self.enforcer.write().await.remove_policies(rules).await
    }

    pub async fn remove_filtered_policy<S: AsRef<str>>(&self, field_index: usize, field_values: &[S]) -> Result<bool> {
        self.enforcer
            .write()
            .await
            .remove_filtered_policy(field_index, field_values)
            .await
    }

    pub async fn add_grouping_policy<S: AsRef<str>>(&self, params: &[S]) -> Result<bool> {
        self.enforcer.write().await.add_grouping_policy(params).await
    }

    pub async fn remove_grouping_policy<S: AsRef<str>>(&self, params: &[S]) -> Result<bool> {
        self.enforcer
            .write()
            .await
            .remove_grouping_policy(params)
            .await
    }

    pub async fn build_role_links(&self) -> Result<()> {
        self.enforcer.write().await.build_role_links()
    }

    pub async fn build_incremental_role_links(&self, op: PolicyOp, ptype: &str, rules: &[Rule]) -> Result<()> {
        self.enforcer
            .write()
            .await
            .build_incremental_role_links(op, ptype, rules)
    }

    pub async fn get_policy(&self) -> Vec<Rule> {
        self.enforcer.read().await.get_policy()
    }

    pub async fn get_grouping_policy(&self) -> Vec<Rule> {
        self.enforcer.read().await.get_grouping_policy()
    }

    pub async fn has_policy<S: AsRef<str>>(&self, params: &[S]) -> bool {
        self.enforcer.read().await.has_policy(params)
    }
}

impl Drop for SyncedEnforcer {
    fn drop(&mut self) {
        if let Some(running) = self.auto_load.get_mut().take() {
            running.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::persist::{Adapter, MemoryAdapter};
    use crate::types::to_rule;

    const MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act
"#;

    async fn synced(adapter: &MemoryAdapter) -> SyncedEnforcer {
        let model = Model::from_text(MODEL).unwrap();
        let adapter: Arc<dyn Adapter> = Arc::new(adapter.clone());
        SyncedEnforcer::new(Enforcer::new(model, Some(adapter)).await.unwrap())
    }

    #[tokio::test]
    async fn test_delegated_mutations() {
        let adapter = MemoryAdapter::new();
        let e = synced(&adapter).await;

        assert!(e.add_policy(&["admin", "data1", "read"]).await.unwrap());
        assert!(e.add_grouping_policy(&["alice", "admin"]).await.unwrap());
        assert!(e.enforce(["alice", "data1", "read"]).await.unwrap());
        assert_eq!(adapter.rules("g", "g").await, vec![to_rule(&["alice", "admin"])]);

        assert!(e.remove_grouping_policy(&["alice", "admin"]).await.unwrap());
        assert!(!e.enforce(["alice", "data1", "read"]).await.unwrap());
        assert!(e.has_policy(&["admin", "data1", "read"]).await);
    }

    #[tokio::test]
    async fn test_load_policy_replaces_rows() {
        let adapter = MemoryAdapter::new();
        let e = synced(&adapter).await;
        e.write().await.enable_auto_save(false);
        e.add_policy(&["bob", "data2", "write"]).await.unwrap();
        assert!(e.enforce(["bob", "data2", "write"]).await.unwrap());

        e.load_policy().await.unwrap();
        assert!(!e.enforce(["bob", "data2", "write"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_auto_load_picks_up_changes() {
        let adapter = MemoryAdapter::new();
        let e = synced(&adapter).await;
        assert!(!e.enforce(["alice", "data1", "read"]).await.unwrap());

        assert!(e.start_auto_load_policy(Duration::from_millis(10)));
        assert!(!e.start_auto_load_policy(Duration::from_millis(10)));
        assert!(e.is_auto_loading_running());

        adapter
            .add_policy("p", "p", &to_rule(&["alice", "data1", "read"]))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(e.enforce(["alice", "data1", "read"]).await.unwrap());

        e.stop_auto_load_policy().await;
        assert!(!e.is_auto_loading_running());
    }

    #[tokio::test]
    async fn test_stop_does_not_wait_for_interval() {
        let adapter = MemoryAdapter::new();
        let e = synced(&adapter).await;
        e.start_auto_load_policy(Duration::from_secs(3600));

        let stopped = tokio::time::timeout(Duration::from_secs(1), e.stop_auto_load_policy()).await;
        assert!(stopped.is_ok());
        assert!(!e.is_auto_loading_running());
    }
}
