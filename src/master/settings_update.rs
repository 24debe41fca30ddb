use crate::api::{TimeValue, TimeValueParseError};
use crate::master::MasterService;
use crate::publish::Clock;
use crate::routing::{AllocationConstraint, AllocationPlanner};
use crate::state::{Settings, Version};
use std::collections::BTreeMap;
use tokio::time::Duration;

/// Transient settings change. An empty value removes the key.
#[derive(Clone, Debug, Default)]
pub struct UpdateTransientSettingsRequest {
    settings: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl UpdateTransientSettingsRequest {
    pub fn new() -> Self {
        UpdateTransientSettingsRequest::default()
    }

    pub fn put(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// How long to wait for every node to ack. Zero means don't wait.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_str(self, timeout: &str) -> Result<Self, TimeValueParseError> {
        let timeout = TimeValue::parse(timeout)?;
        Ok(self.timeout(timeout.as_duration()))
    }

    pub fn settings(&self) -> &BTreeMap<String, String> {
        &self.settings
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UpdateTransientSettingsResponse {
    /// Every node applied the new settings before the timeout.
    pub acknowledged: bool,
    pub transient_settings: Settings,
    pub version: Version,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum UpdateSettingsError {
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

impl<C: Clock> MasterService<C> {
    /// Merges the request into the transient settings and publishes the result. If the change
    /// moves the set of excluded nodes, shard placement is re-planned in the same version.
    pub async fn update_transient_settings(
        &self,
        request: UpdateTransientSettingsRequest,
    ) -> Result<UpdateTransientSettingsResponse, UpdateSettingsError> {
        if request.settings.keys().any(|key| key.trim().is_empty()) {
            return Err(UpdateSettingsError::InvalidSetting("setting key must not be empty".into()));
        }

        let timeout = self.ack_timeout(request.timeout);
        let delta = request.settings;

        let result = self
            .submit_state_update("update-transient-settings", timeout, |current, nodes| {
                let merged = current.transient_settings().merge(&delta);
                let before = AllocationConstraint::from_settings(current.transient_settings(), nodes);
                let after = AllocationConstraint::from_settings(&merged, nodes);

                let mut next = current.next_version().transient_settings(merged);
                if before != after {
                    next = next.routing_table(AllocationPlanner::plan(current.routing_table(), nodes, &after));
                }
                Ok::<_, UpdateSettingsError>(next)
            })
            .await?;

        Ok(UpdateTransientSettingsResponse {
            acknowledged: result.round.is_acknowledged(),
            transient_settings: result.state.transient_settings().clone(),
            version: result.state.version(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::test_utils::TestCluster;
    use crate::master::CreateIndexRequest;
    use crate::state::{NodeId, EXCLUDE_ID_SETTING};

    #[tokio::test]
    async fn settings_are_merged_and_acknowledged() {
        let cluster = TestCluster::start(&["node-1", "node-2", "node-3"]);

        let response = cluster
            .master
            .update_transient_settings(UpdateTransientSettingsRequest::new().put("a", "1").put("b", "2"))
            .await
            .unwrap();
        assert!(response.acknowledged);

        let response = cluster
            .master
            .update_transient_settings(UpdateTransientSettingsRequest::new().put("a", "3").put("b", ""))
            .await
            .unwrap();

        assert!(response.acknowledged);
        assert_eq!(response.transient_settings.get("a"), Some("3"));
        assert!(!response.transient_settings.contains_key("b"));
        for reader in cluster.readers.values() {
            assert_eq!(reader.current().transient_settings(), &response.transient_settings);
        }
    }

    #[tokio::test]
    async fn empty_key_is_rejected_before_publishing() {
        let cluster = TestCluster::start(&["node-1"]);

        let result = cluster
            .master
            .update_transient_settings(UpdateTransientSettingsRequest::new().put(" ", "x"))
            .await;

        assert!(matches!(result, Err(UpdateSettingsError::InvalidSetting(_))));
        assert_eq!(cluster.master.state().await.version(), Version::new(0));
    }

    #[tokio::test]
    async fn exclusion_replans_but_unrelated_settings_do_not() {
        let cluster = TestCluster::start(&["node-1", "node-2", "node-3"]);
        cluster
            .master
            .create_index(CreateIndexRequest::new("test").shards(3).replicas(0))
            .await
            .unwrap();
        cluster.master.start_initializing_shards(None).await;
        let table_before = cluster.master.state().await.shared_routing_table();

        cluster
            .master
            .update_transient_settings(UpdateTransientSettingsRequest::new().put("unrelated", "x"))
            .await
            .unwrap();
        let carried = cluster.master.state().await.shared_routing_table();
        assert!(std::sync::Arc::ptr_eq(&table_before, &carried));

        let response = cluster
            .master
            .update_transient_settings(UpdateTransientSettingsRequest::new().put(EXCLUDE_ID_SETTING, "node-2"))
            .await
            .unwrap();
        assert!(response.acknowledged);

        let node_2 = NodeId::new("node-2");
        for reader in cluster.readers.values() {
            let state = reader.current();
            assert_eq!(state.version(), response.version);
            let copies: Vec<_> = state.routing_table().copies_on_node(&node_2).collect();
            assert_eq!(copies.len(), 1);
            assert!(copies.iter().all(|c| c.relocating() && c.relocating_node_id().is_some()));
        }
    }

    #[tokio::test]
    async fn zero_timeout_is_not_acknowledged_but_still_applies() {
        let cluster = TestCluster::start(&["node-1", "node-2"]);

        let response = cluster
            .master
            .update_transient_settings(
                UpdateTransientSettingsRequest::new()
                    .put(EXCLUDE_ID_SETTING, "node-2")
                    .timeout_str("0s")
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(!response.acknowledged);
        assert_eq!(response.transient_settings.get(EXCLUDE_ID_SETTING), Some("node-2"));
        let applied = cluster.reader("node-2").wait_for_version(response.version).await.unwrap();
        assert_eq!(applied.transient_settings(), &response.transient_settings);
    }
}
