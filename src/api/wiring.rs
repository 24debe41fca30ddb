use crate::api::cluster::{self, ClusterAdminClient, LocalCluster};
use crate::api::options::ClusterOptionsValidated;
use crate::api::types::MemberInfo;
use crate::api::ClusterOptions;
use crate::master::MasterService;
use crate::membership::StaticMembership;
use crate::state::{DiscoveryNode, DiscoveryNodes, NodeId};
use crate::transport::LocalTransport;
use std::collections::{BTreeMap, BTreeSet};
use std::convert::TryFrom;
use std::sync::Arc;

pub struct LocalClusterConfig {
    pub members: Vec<MemberInfo>,
    pub master_node_id: String,
    pub info_logger: slog::Logger,
    pub options: ClusterOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterCreationError {
    #[error("Illegal options for configuring cluster: {0}")]
    IllegalOptions(String),
    #[error("cluster must have at least one member")]
    NoMembers,
    #[error("member {0} is listed more than once")]
    DuplicateMember(String),
    #[error("master node ID not in cluster members")]
    MasterNotInCluster,
}

pub async fn try_create_local_cluster(config: LocalClusterConfig) -> Result<LocalCluster, ClusterCreationError> {
    let root_logger = config.info_logger;

    let options = ClusterOptionsValidated::try_from(config.options)
        .map_err(|e| ClusterCreationError::IllegalOptions(e.to_string()))?;
    validate_members(&config.members, &config.master_node_id)?;

    let transport = LocalTransport::new(root_logger.new(slog::o!("Component" => "Transport")));

    let mut nodes = BTreeMap::new();
    for member in config.members.iter() {
        let handle = cluster::spawn_node(&root_logger, &transport, member, options.node_event_queue_size);
        nodes.insert(handle.node_id().clone(), handle);
    }

    let membership = StaticMembership::new(DiscoveryNodes::new(
        config.members.into_iter().map(DiscoveryNode::from),
    ));

    let master = MasterService::new(
        root_logger.new(slog::o!("Component" => "Master", "NodeId" => config.master_node_id.clone())),
        NodeId::new(config.master_node_id),
        Arc::new(transport.clone()),
        Arc::new(membership.clone()),
        options.default_ack_timeout,
    );

    Ok(LocalCluster::new(
        root_logger,
        ClusterAdminClient::new(Arc::new(master)),
        nodes,
        transport,
        membership,
        options.node_event_queue_size,
    ))
}

fn validate_members(members: &[MemberInfo], master_node_id: &str) -> Result<(), ClusterCreationError> {
    if members.is_empty() {
        return Err(ClusterCreationError::NoMembers);
    }

    let mut seen = BTreeSet::new();
    for member in members {
        if !seen.insert(member.node_id.as_str()) {
            return Err(ClusterCreationError::DuplicateMember(member.node_id.clone()));
        }
    }

    if !seen.contains(master_node_id) {
        return Err(ClusterCreationError::MasterNotInCluster);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Version;
    use tokio::time::Duration;

    fn config(ids: &[&str], master: &str) -> LocalClusterConfig {
        LocalClusterConfig {
            members: ids.iter().map(|id| MemberInfo::data_node(*id)).collect(),
            master_node_id: master.to_string(),
            info_logger: slog::Logger::root(slog::Discard, slog::o!()),
            options: ClusterOptions::default(),
        }
    }

    #[tokio::test]
    async fn rejects_bad_configs() {
        assert!(matches!(
            try_create_local_cluster(config(&[], "a")).await,
            Err(ClusterCreationError::NoMembers)
        ));
        assert!(matches!(
            try_create_local_cluster(config(&["a", "a"], "a")).await,
            Err(ClusterCreationError::DuplicateMember(_))
        ));
        assert!(matches!(
            try_create_local_cluster(config(&["a", "b"], "c")).await,
            Err(ClusterCreationError::MasterNotInCluster)
        ));

        let mut bad_options = config(&["a"], "a");
        bad_options.options.node_event_queue_size = Some(0);
        assert!(matches!(
            try_create_local_cluster(bad_options).await,
            Err(ClusterCreationError::IllegalOptions(_))
        ));
    }

    #[tokio::test]
    async fn joined_node_receives_the_next_round() {
        let mut cluster = try_create_local_cluster(config(&["a", "b"], "a")).await.unwrap();
        let joined = cluster.join_node(MemberInfo::data_node("c")).local_state().clone();

        let response = cluster.admin().reroute(Some(Duration::from_secs(5))).await;

        assert!(response.acknowledged);
        assert_eq!(joined.last_applied_version(), Version::new(1));
        assert_eq!(cluster.nodes().count(), 3);
        assert!(cluster.remove_node("c"));
        assert!(!cluster.remove_node("c"));
    }
}
