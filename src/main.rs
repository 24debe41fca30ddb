use cluster_state::{
    try_create_local_cluster, ClusterOptions, CreateIndexRequest, LocalCluster, LocalClusterConfig, MemberInfo,
    UpdateTransientSettingsRequest, EXCLUDE_ID_SETTING,
};
use slog::Drain;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cluster = try_create_local_cluster(demo_cluster_config()).await?;
    let admin = cluster.admin();

    let created = admin
        .create_index(CreateIndexRequest::new("demo").shards(3).replicas(1))
        .await?;
    println!("create index: acknowledged={} version={}", created.acknowledged, created.version);
    admin.start_initializing_shards(None).await;
    admin.start_initializing_shards(None).await;
    print_routing(&cluster, "after start");

    let response = admin
        .update_transient_settings(UpdateTransientSettingsRequest::new().put(EXCLUDE_ID_SETTING, "node-1"))
        .await?;
    println!(
        "exclude node-1: acknowledged={} version={} settings={:?}",
        response.acknowledged,
        response.version,
        response.transient_settings.as_map()
    );
    print_routing(&cluster, "after exclude");

    let completed = admin.complete_relocations(None).await;
    println!("complete relocations: applied={} version={}", completed.applied, completed.version);
    print_routing(&cluster, "after relocation");

    let response = admin
        .update_transient_settings(
            UpdateTransientSettingsRequest::new()
                .put(EXCLUDE_ID_SETTING, "")
                .timeout_str("0s")?,
        )
        .await?;
    println!(
        "clear exclude with 0s timeout: acknowledged={} settings={:?}",
        response.acknowledged,
        response.transient_settings.as_map()
    );

    Ok(())
}

fn print_routing(cluster: &LocalCluster, label: &str) {
    println!("--- {} ---", label);
    for node in cluster.nodes() {
        let state = node.local_state().current();
        println!("{} @ version {}:", node.node_id(), state.version());
        for copy in state.routing_table().copies() {
            println!(
                "    {} {:?} {:?} on {:?} -> {:?}",
                copy.shard_id(),
                copy.role(),
                copy.state(),
                copy.node_id(),
                copy.relocating_node_id()
            );
        }
    }
}

fn demo_cluster_config() -> LocalClusterConfig {
    LocalClusterConfig {
        members: vec![
            MemberInfo::data_node("node-1"),
            MemberInfo::data_node("node-2"),
            MemberInfo::data_node("node-3"),
        ],
        master_node_id: "node-1".to_string(),
        info_logger: create_root_logger_for_stdout(),
        options: ClusterOptions::default(),
    }
}

fn create_root_logger_for_stdout() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!())
}
