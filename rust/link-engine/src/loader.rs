use std::path::Path;

use blueprint::{Blueprint, LoadError};

use crate::error::EngineError;

/// Load and parse a blueprint document, wrapping any failure into
/// [`EngineError::InvalidBlueprint`] so callers of this crate never need to
/// depend on `blueprint::LoadError` directly (§4.7).
pub fn load_blueprint(path: impl AsRef<Path>) -> Result<Blueprint, EngineError> {
    let path = path.as_ref();
    blueprint::load(path).map_err(|err| EngineError::InvalidBlueprint {
        path: Some(path.display().to_string()),
        message: describe(err),
    })
}

fn describe(err: LoadError) -> String {
    err.to_string()
}
