use std::path::PathBuf;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to process archive {path}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("malformed class entry `{entry}`: missing 0xCAFEBABE header")]
    MalformedClass { entry: String },
    #[error("failed to rewrite `{entry}`")]
    Transform {
        entry: String,
        #[source]
        source: BoxError,
    },
}
