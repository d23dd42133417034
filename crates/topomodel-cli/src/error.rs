use std::path::PathBuf;
use thiserror::Error;
use topomodel::core::forcefield::params::ForceFieldLoadError;
use topomodel::engine::TopologyError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("Failed to load force field '{path}': {source}", path = path.display())]
    ForceField {
        path: PathBuf,
        #[source]
        source: ForceFieldLoadError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install logger: {0}")]
    Logging(String),
}
