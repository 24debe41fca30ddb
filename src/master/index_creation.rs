use crate::master::MasterService;
use crate::publish::Clock;
use crate::routing::{AllocationConstraint, AllocationPlanner, IndexRoutingTable};
use crate::state::Version;
use tokio::time::Duration;

#[derive(Clone, Debug)]
pub struct CreateIndexRequest {
    name: String,
    number_of_shards: u32,
    number_of_replicas: u32,
    timeout: Option<Duration>,
}

impl CreateIndexRequest {
    /// Defaults to 5 shards with 1 replica each.
    pub fn new(name: impl Into<String>) -> Self {
        CreateIndexRequest {
            name: name.into(),
            number_of_shards: 5,
            number_of_replicas: 1,
            timeout: None,
        }
    }

    pub fn shards(mut self, number_of_shards: u32) -> Self {
        self.number_of_shards = number_of_shards;
        self
    }

    pub fn replicas(mut self, number_of_replicas: u32) -> Self {
        self.number_of_replicas = number_of_replicas;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn validate(&self) -> Result<(), CreateIndexError> {
        if self.name.is_empty() {
            return Err(CreateIndexError::InvalidIndexRequest("index name must not be empty".into()));
        }
        if self.name.chars().any(|c| c.is_uppercase() || c.is_whitespace() || c == ',') {
            return Err(CreateIndexError::InvalidIndexRequest(format!(
                "index name {:?} must be lowercase without whitespace or commas",
                self.name
            )));
        }
        if self.number_of_shards == 0 {
            return Err(CreateIndexError::InvalidIndexRequest(
                "index must have at least one shard".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateIndexResponse {
    pub acknowledged: bool,
    pub version: Version,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CreateIndexError {
    #[error("index {0} already exists")]
    IndexAlreadyExists(String),
    #[error("invalid create index request: {0}")]
    InvalidIndexRequest(String),
}

impl<C: Clock> MasterService<C> {
    /// Adds an index with every copy unassigned, then allocates what it can in the same version.
    /// New copies start out initializing.
    pub async fn create_index(&self, request: CreateIndexRequest) -> Result<CreateIndexResponse, CreateIndexError> {
        request.validate()?;
        let timeout = self.ack_timeout(request.timeout);

        let result = self
            .submit_state_update("create-index", timeout, |current, nodes| {
                if current.routing_table().has_index(&request.name) {
                    return Err(CreateIndexError::IndexAlreadyExists(request.name.clone()));
                }

                let index =
                    IndexRoutingTable::new_unassigned(&request.name, request.number_of_shards, request.number_of_replicas);
                let table = current.routing_table().with_index(index);
                let constraint = AllocationConstraint::from_settings(current.transient_settings(), nodes);

                Ok(current
                    .next_version()
                    .routing_table(AllocationPlanner::plan(&table, nodes, &constraint)))
            })
            .await?;

        Ok(CreateIndexResponse {
            acknowledged: result.round.is_acknowledged(),
            version: result.state.version(),
        })
    }
}
