use async_trait::async_trait;

use crate::{
    domain::{
        FilterRule, HistoryEntry, NewRelayRecord, NewTarget, RelayRecord, Target, UserId, Watcher,
    },
    Result,
};

/// Storage port for watchers, targets, filters and relay history.
///
/// Handles are compared case-insensitively and without a leading `@`.
/// Targets are never hard-deleted: removal flips `active` off and a later
/// registration of the same (watcher, account, group) reactivates the same row.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Register a watcher, or return the existing one unchanged.
    async fn ensure_watcher(&self, id: UserId, display_name: &str) -> Result<Watcher>;
    async fn get_watcher(&self, id: UserId) -> Result<Option<Watcher>>;

    /// Consistent snapshot of every active target across all watchers.
    async fn list_active_targets(&self) -> Result<Vec<Target>>;
    async fn list_watcher_targets(&self, watcher: UserId) -> Result<Vec<Target>>;
    async fn find_target(&self, watcher: UserId, handle: &str) -> Result<Option<Target>>;

    /// Insert or reactivate a target; the identifying triple is unique.
    async fn upsert_target(&self, target: NewTarget) -> Result<Target>;
    /// Deactivate every active target of `watcher` with this handle.
    async fn deactivate_target(&self, watcher: UserId, handle: &str) -> Result<bool>;

    /// Replace the rule set on every active target of `watcher` with this handle.
    async fn set_filter(
        &self,
        watcher: UserId,
        handle: &str,
        rule: &FilterRule,
    ) -> Result<Option<Target>>;
    async fn clear_filter(&self, watcher: UserId, handle: &str) -> Result<bool>;

    async fn append_relay_record(&self, record: NewRelayRecord) -> Result<RelayRecord>;
    async fn watcher_history(&self, watcher: UserId) -> Result<Vec<HistoryEntry>>;

    /// Account directory: remember the latest handle seen for an account.
    async fn remember_account(&self, account: UserId, handle: &str) -> Result<()>;
    async fn resolve_handle(&self, handle: &str) -> Result<Option<UserId>>;
}
