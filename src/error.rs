//! Error types.
//!
//! Only backend resource failures are values. Broken graph declarations
//! (unregistered handles, executing twice, unbalanced markers) panic.

use std::path::PathBuf;

use thiserror::Error;

/// Backend resource failure.
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("Failed to create {kind}: {reason}")]
    ResourceCreationFailed { kind: &'static str, reason: String },
    #[error("Failed to load shader {path:?}: {reason}")]
    ShaderLoadFailed { path: PathBuf, reason: String },
    #[error("Failed to load texture {path:?}: {source}")]
    TextureLoadFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to load model {path:?}: {reason}")]
    ModelLoadFailed { path: PathBuf, reason: String },
    #[error("Invalid {kind} handle")]
    InvalidHandle { kind: &'static str },
    #[error("Failed to present: {0}")]
    PresentFailed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type RendererResult<T> = Result<T, RendererError>;

/// Failure surfaced by [`RenderGraph::setup`](crate::render_graph::RenderGraph::setup).
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Pass '{pass}' failed to create a transient resource: {source}")]
    TransientCreationFailed {
        pass: String,
        #[source]
        source: RendererError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RendererError::InvalidHandle { kind: "image" };
        assert_eq!(err.to_string(), "Invalid image handle");

        let err = GraphError::TransientCreationFailed {
            pass: "gbuffer".into(),
            source: RendererError::ResourceCreationFailed {
                kind: "image",
                reason: "zero extent".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Pass 'gbuffer' failed to create a transient resource: Failed to create image: zero extent"
        );
    }
}
