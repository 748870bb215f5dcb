use contacts_core::GraphError;

/// Errors surfaced by [`crate::ListStore`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ListError {
    #[error("contact source {name} is already streaming and cannot be shared")]
    SourceAlreadyStreaming { name: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
