use std::path::{Path, PathBuf};

use common::thiserror::{self, Error};

use crate::resource::Blueprint;

/// Format a blueprint document was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Infer the format from a file extension, defaulting to YAML for
    /// anything unrecognised (most blueprint authors write `.yaml`/`.yml`).
    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read blueprint file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse blueprint{}: {source}", path.as_ref().map(|p| format!(" `{}`", p.display())).unwrap_or_default())]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: ParseError,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Yaml(#[from] common::serde_yaml::Error),
    #[error(transparent)]
    Json(#[from] common::serde_json::Error),
}

/// Parse a blueprint document already held in memory.
pub fn parse(source: &str, format: Format) -> Result<Blueprint, ParseError> {
    match format {
        Format::Yaml => Ok(common::serde_yaml::from_str(source)?),
        Format::Json => Ok(common::serde_json::from_str(source)?),
    }
}

/// Load and parse a blueprint document from a file, inferring its format
/// from the file extension.
pub fn load(path: impl AsRef<Path>) -> Result<Blueprint, LoadError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&source, Format::from_extension(path)).map_err(|source| LoadError::Parse {
        path: Some(path.to_path_buf()),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
resources:
  orderApi:
    type: api
    metadata:
      labels:
        app: orderApi
    linkSelector:
      byLabel:
        app: orderApi
"#;

    const JSON: &str = r#"{
        "resources": {
            "orderApi": {
                "type": "api",
                "metadata": { "labels": { "app": "orderApi" } },
                "linkSelector": { "byLabel": { "app": "orderApi" } }
            }
        }
    }"#;

    #[test]
    fn yaml_and_json_parse_to_the_same_blueprint() {
        let from_yaml = parse(YAML, Format::Yaml).expect("valid yaml");
        let from_json = parse(JSON, Format::Json).expect("valid json");
        assert_eq!(from_yaml, from_json);

        let order_api = &from_yaml.resources["orderApi"];
        assert_eq!(order_api.resource_type, "api");
        assert_eq!(order_api.namespace(), "api");
        assert_eq!(order_api.metadata_labels()["app"], "orderApi");
        assert_eq!(order_api.selector_by_label()["app"], "orderApi");
    }

    #[test]
    fn malformed_link_selector_fails_to_parse() {
        let bad = r#"{
            "resources": {
                "x": { "type": "api", "linkSelector": { "byLabel": ["not", "a", "map"] } }
            }
        }"#;
        let err = parse(bad, Format::Json).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn empty_blueprint_parses_to_no_resources() {
        let blueprint = parse("resources: {}", Format::Yaml).expect("valid yaml");
        assert!(blueprint.resources.is_empty());
    }
}
