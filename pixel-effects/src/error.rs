use std::path::PathBuf;

use thiserror::Error;

/// Errors from image I/O and effect parsing.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("failed to open image {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode image {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Anything outside the `G`/`S`/`E`/`B` palette.
    #[error("unknown effect code {0:?}")]
    UnknownEffect(String),
}
