use std::path::PathBuf;

/// Problems with the waypoint layout. Raised at startup only; the engine
/// refuses to run on a layout it cannot build a closed path through.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SceneError {
    #[error("a closed tour needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),

    #[error("waypoint '{name}' has non-positive radius {radius}")]
    InvalidRadius { name: String, radius: f32 },

    #[error("waypoint index {index} out of range (tour has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("starpath.yaml not found")]
    NotFound,

    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),
}
