use std::sync::Arc;

use provider::{LinkHandle, ProviderError, ProviderLookup};

/// The outcome of probing whether resource type `a` may link to resource
/// type `b`.
pub struct EdgeProbeResult {
    pub can_link_to: bool,
    pub implementation: Option<Arc<dyn LinkHandle>>,
}

/// Ask `a`'s provider (resolved from the namespace prefix of `type_a`)
/// whether `type_a` may link to `type_b`, and fetch the implementation for
/// the pair. A namespace with no registered provider is reported as simply
/// unable to link (§4.2): this is not a contract violation, since plenty of
/// resource types (leaves with no outbound edges at all) never need one.
pub async fn can_link(
    providers: &dyn ProviderLookup,
    type_a: &str,
    type_b: &str,
) -> Result<EdgeProbeResult, ProviderError> {
    let namespace = type_a.split_once('/').map_or(type_a, |(ns, _)| ns);
    let Some(provider) = providers.provider_for(namespace) else {
        return Ok(EdgeProbeResult {
            can_link_to: false,
            implementation: None,
        });
    };

    let implementation = provider.link(type_a, type_b).await?;
    let can_link_to = provider
        .resource(type_a)
        .map(|capability| {
            capability
                .can_link_to()
                .iter()
                .any(|allowed| allowed == type_b)
        })
        .unwrap_or(false);

    Ok(EdgeProbeResult {
        can_link_to,
        implementation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider::test_utils::StubProvider;
    use provider::{LinkKind, ProviderRegistry};

    #[tokio::test]
    async fn unregistered_namespace_cannot_link() {
        let registry = ProviderRegistry::new();
        let result = can_link(&registry, "gcp/pubsub/topic", "gcp/function/cloudfunction")
            .await
            .unwrap();
        assert!(!result.can_link_to);
        assert!(result.implementation.is_none());
    }

    #[tokio::test]
    async fn allowed_and_implemented_pair_reports_both() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(
            StubProvider::new("aws")
                .with_resource("aws/lambda/function", &["aws/dynamodb/table"], false)
                .with_link("aws/lambda/function", "aws/dynamodb/table", LinkKind::Hard),
        ));

        let result = can_link(&registry, "aws/lambda/function", "aws/dynamodb/table")
            .await
            .unwrap();
        assert!(result.can_link_to);
        assert!(result.implementation.is_some());
    }
}
