use std::sync::Arc;

use blueprint::Blueprint;
use common::tokio_util::sync::CancellationToken;
use provider::ProviderLookup;

use crate::builder;
use crate::chain::NodeRef;
use crate::error::EngineError;
use crate::warning::Warning;

/// Distinguishes "never built" from "build failed" internally, so
/// `warnings()` can tell the two apart even though its documented external
/// behaviour collapses "not yet built" and "built with no resources" into
/// the same empty-list response (§9 Design Notes, Open Question 3).
enum BuildState {
    NotBuilt,
    Built {
        roots: Vec<NodeRef>,
        warnings: Vec<Warning>,
    },
    Failed,
}

/// Resolves a single blueprint's implicit dependency graph into a chain
/// forest. An `Engine` is single-use: construct one per blueprint and call
/// [`Engine::links`] at most once on it (a second call returns
/// [`EngineError::AlreadyBuilt`] without touching any provider again).
pub struct Engine {
    blueprint: Blueprint,
    providers: Arc<dyn ProviderLookup>,
    state: BuildState,
}

impl Engine {
    pub fn new(blueprint: Blueprint, providers: Arc<dyn ProviderLookup>) -> Self {
        Self {
            blueprint,
            providers,
            state: BuildState::NotBuilt,
        }
    }

    /// Build (or return the cached result of having already built) the
    /// chain forest. See §6 for the returned shape and §7 for error
    /// semantics: cancellation never returns a partial forest, but
    /// `EngineError::MissingLinkImplementation` and `EngineError::CircularLinks`
    /// carry the forest as it stood at the point of failure in their own
    /// `partial_roots` field, for diagnostics only — callers must not treat
    /// it as a complete or valid forest.
    pub async fn links(&mut self, token: &CancellationToken) -> Result<Vec<NodeRef>, EngineError> {
        match &self.state {
            BuildState::Built { roots, .. } => return Ok(roots.clone()),
            BuildState::Failed => return Err(EngineError::AlreadyBuilt),
            BuildState::NotBuilt => {}
        }

        if token.is_cancelled() {
            self.state = BuildState::Failed;
            return Err(EngineError::Cancelled);
        }

        match builder::build(&self.blueprint, self.providers.as_ref(), token).await {
            Ok(output) => {
                let roots = output.roots.clone();
                self.state = BuildState::Built {
                    roots: output.roots,
                    warnings: output.warnings,
                };
                Ok(roots)
            }
            Err(err) => {
                self.state = BuildState::Failed;
                Err(err)
            }
        }
    }

    /// Advisory warnings over the final forest. Triggers [`Engine::links`]
    /// on first call if not already built; per the inherited behaviour
    /// recorded in §9, an empty blueprint yields an empty warning list
    /// rather than propagating whatever `links()` itself would have
    /// returned.
    pub async fn warnings(&mut self, token: &CancellationToken) -> Result<Vec<Warning>, EngineError> {
        if let BuildState::NotBuilt = self.state {
            if self.blueprint.resources.is_empty() {
                self.state = BuildState::Built {
                    roots: Vec::new(),
                    warnings: Vec::new(),
                };
                return Ok(Vec::new());
            }
            self.links(token).await?;
        }

        match &self.state {
            BuildState::Built { warnings, .. } => Ok(warnings.clone()),
            BuildState::Failed => Err(EngineError::AlreadyBuilt),
            BuildState::NotBuilt => unreachable!("links() always leaves Built or Failed"),
        }
    }
}
