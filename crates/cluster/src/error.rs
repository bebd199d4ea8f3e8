use crate::feature::ClusterId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The id was minted by a different build of the index.
    StaleCluster { cluster: ClusterId, current_build: u32 },
    UnknownCluster(ClusterId),
    NoChildren(ClusterId),
    InvalidOptions(String),
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::StaleCluster {
                cluster,
                current_build,
            } => write!(
                f,
                "cluster {cluster} belongs to an earlier index build (current build {current_build})"
            ),
            IndexError::UnknownCluster(id) => write!(f, "no cluster with id {id}"),
            IndexError::NoChildren(id) => write!(f, "cluster {id} has no children"),
            IndexError::InvalidOptions(msg) => write!(f, "invalid cluster options: {msg}"),
        }
    }
}

impl std::error::Error for IndexError {}
