use common::thiserror::{self, Error};
use provider::ProviderError;

use crate::chain::NodeRef;

/// One back-edge identified by the cycle analyser as unbreakable.
#[derive(Debug, Clone, Error)]
#[error("{} circular link between `{from}` ({from_type}) and `{to}` ({to_type})", if .direct { "direct" } else { "indirect" })]
pub struct CircularLink {
    pub from: String,
    pub from_type: String,
    pub to: String,
    pub to_type: String,
    pub direct: bool,
    /// Every resource name on the cycle, from the node the back-edge closed
    /// on through to the node that closed it. Used by top-level cleanup to
    /// decide which provisional roots must stay visible for diagnostics.
    pub participants: Vec<String>,
}

/// Structured, reason-coded errors raised while resolving a blueprint's
/// links. Every variant is a stable identifier a caller can match on; the
/// `Display` impl is for humans, not for programmatic branching.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A provider reported that `from_type` may link to `to_type` but
    /// returned no implementation for the pair.
    #[error(
        "provider for `{from_type}` claims it can link to `{to_type}` but supplied no link \
         implementation for `{from}` -> `{to}`"
    )]
    MissingLinkImplementation {
        from: String,
        from_type: String,
        to: String,
        to_type: String,
        /// The chain forest as it stood at the moment this edge was probed.
        /// Advisory only: callers must not treat it as a complete or valid
        /// forest, just as a diagnostic aid for locating the failure.
        partial_roots: Vec<NodeRef>,
    },

    /// One or more cycles made entirely of hard links were found.
    #[error("{} circular hard link(s) found", .cycles.len())]
    CircularLinks {
        cycles: Vec<CircularLink>,
        /// The forest as built (after top-level cleanup) before the hard
        /// cycles were found to make the whole build a failure. Advisory
        /// only, same caveat as `MissingLinkImplementation::partial_roots`.
        partial_roots: Vec<NodeRef>,
    },

    /// The blueprint document itself could not be loaded or parsed.
    #[error("invalid blueprint{}: {message}", path.as_ref().map(|p| format!(" `{p}`")).unwrap_or_default())]
    InvalidBlueprint {
        path: Option<String>,
        message: String,
    },

    /// A `CancellationToken` was observed cancelled at a suspension point.
    #[error("link resolution was cancelled")]
    Cancelled,

    /// `Engine::links` was invoked a second time on an instance that has
    /// already built (successfully or not). This is a programming error in
    /// the caller, not a property of the blueprint.
    #[error("this engine instance has already been built; construct a new one to rebuild")]
    AlreadyBuilt,

    /// A provider call itself failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
