use std::sync::Arc;

use blueprint::{parse, Format};
use common::tokio_util::sync::CancellationToken;
use link_engine::{Engine, EngineError};
use provider::test_utils::StubProvider;
use provider::{LinkKind, Provider, ProviderRegistry};

fn registry() -> ProviderRegistry {
    let aws = StubProvider::new("aws")
        .with_resource("aws/api/gateway", &["aws/lambda/function"], false)
        .with_resource(
            "aws/lambda/function",
            &["aws/dynamodb/table", "aws/lambda/function"],
            false,
        )
        .with_resource("aws/dynamodb/table", &["aws/dynamodb/stream"], false)
        .with_resource("aws/dynamodb/stream", &["aws/lambda/function"], false)
        .with_resource("aws/iam/role", &["aws/lambda/function"], false)
        .with_link("aws/api/gateway", "aws/lambda/function", LinkKind::Soft)
        .with_link("aws/lambda/function", "aws/dynamodb/table", LinkKind::Hard)
        .with_link("aws/lambda/function", "aws/lambda/function", LinkKind::Soft)
        .with_link("aws/dynamodb/table", "aws/dynamodb/stream", LinkKind::Hard)
        .with_link("aws/dynamodb/stream", "aws/lambda/function", LinkKind::Hard)
        .with_link("aws/iam/role", "aws/lambda/function", LinkKind::Hard);

    ProviderRegistry::from_iter([Arc::new(aws) as Arc<dyn Provider>])
}

const RICH_LINKING: &str = r#"
resources:
  orderApi:
    type: aws/api/gateway
    metadata: { labels: { app: orderApi } }
    linkSelector: { byLabel: { app: orderApi } }
  orderQueue:
    type: aws/api/gateway
    metadata: { labels: { app: orderWorkflow } }
    linkSelector: { byLabel: { app: orderWorkflow } }
  processOrdersFunction:
    type: aws/lambda/function
    metadata: { labels: { app: orderWorkflow } }
    linkSelector: { byLabel: { system: orders } }
  createOrderFunction:
    type: aws/lambda/function
    metadata: { labels: { app: orderApi } }
    linkSelector: { byLabel: { system: orders } }
  getOrdersFunction:
    type: aws/lambda/function
    metadata: { labels: { app: orderApi } }
    linkSelector: { byLabel: { system: orders } }
  ordersTable:
    type: aws/dynamodb/table
    metadata: { labels: { system: orders } }
    linkSelector: { byLabel: { system: orders } }
  ordersStream:
    type: aws/dynamodb/stream
    metadata: { labels: { system: orders } }
    linkSelector: { byLabel: { workflow: orderStats } }
  statsAccumulatorFunction:
    type: aws/lambda/function
    metadata: { labels: { workflow: orderStats } }
  standaloneRole:
    type: aws/iam/role
"#;

#[tokio::test]
async fn rich_linking_builds_expected_forest_and_warnings() {
    let blueprint = parse(RICH_LINKING, Format::Yaml).unwrap();
    let providers = Arc::new(registry()) as Arc<dyn provider::ProviderLookup>;
    let mut engine = Engine::new(blueprint, providers);
    let token = CancellationToken::new();

    let roots = engine.links(&token).await.expect("build should succeed");
    let root_names: Vec<String> = roots.iter().map(|r| r.borrow().resource_name.clone()).collect();

    assert!(root_names.contains(&"orderApi".to_string()));
    assert!(root_names.contains(&"orderQueue".to_string()));
    assert!(root_names.contains(&"standaloneRole".to_string()));
    assert!(!root_names.contains(&"createOrderFunction".to_string()));
    assert!(!root_names.contains(&"ordersTable".to_string()));

    let warnings = engine.warnings(&token).await.expect("warnings should succeed");
    let warned: Vec<String> = warnings.iter().map(|w| w.resource_name.clone()).collect();
    assert!(warned.contains(&"statsAccumulatorFunction".to_string()));
    assert!(warned.contains(&"standaloneRole".to_string()));
    assert_eq!(warned.len(), 2);
}

#[tokio::test]
async fn no_links_produces_isolated_roots_with_warnings() {
    let blueprint = parse(
        r#"
resources:
  fnOne:
    type: aws/lambda/function
    metadata: { labels: { app: one } }
  fnTwo:
    type: aws/lambda/function
    metadata: { labels: { app: one } }
  standaloneRole:
    type: aws/iam/role
"#,
        Format::Yaml,
    )
    .unwrap();

    let providers = Arc::new(registry()) as Arc<dyn provider::ProviderLookup>;
    let mut engine = Engine::new(blueprint, providers);
    let token = CancellationToken::new();

    let roots = engine.links(&token).await.unwrap();
    assert_eq!(roots.len(), 3);

    let warnings = engine.warnings(&token).await.unwrap();
    assert_eq!(warnings.len(), 2);
}

#[tokio::test]
async fn missing_implementation_fails_the_build() {
    let blueprint = parse(
        r#"
resources:
  exchangeRatesFunction:
    type: aws/lambda/function
    metadata: { labels: { app: exchangeRates } }
    linkSelector: { byLabel: { app: exchangeRates } }
  saveExchangeRatesFunction:
    type: aws/lambda/function
    metadata: { labels: { app: exchangeRates } }
"#,
        Format::Yaml,
    )
    .unwrap();

    let aws = StubProvider::new("aws").with_resource(
        "aws/lambda/function",
        &["aws/lambda/function"],
        false,
    );
    let providers =
        Arc::new(ProviderRegistry::from_iter([Arc::new(aws) as Arc<dyn Provider>]))
            as Arc<dyn provider::ProviderLookup>;
    let mut engine = Engine::new(blueprint, providers);
    let token = CancellationToken::new();

    let err = engine.links(&token).await.unwrap_err();
    assert!(matches!(err, EngineError::MissingLinkImplementation { .. }));
}

#[tokio::test]
async fn hard_cycle_fails_with_circular_links() {
    let blueprint = parse(
        r#"
resources:
  ordersTable:
    type: aws/dynamodb/table
    metadata: { labels: { system: orders } }
    linkSelector: { byLabel: { system: orders } }
  ordersStream:
    type: aws/dynamodb/stream
    metadata: { labels: { system: orders } }
    linkSelector: { byLabel: { workflow: orderStats } }
  statsAccumulatorFunction:
    type: aws/lambda/function
    metadata: { labels: { workflow: orderStats, system: orders } }
    linkSelector: { byLabel: { system: orders } }
"#,
        Format::Yaml,
    )
    .unwrap();

    let providers = Arc::new(registry()) as Arc<dyn provider::ProviderLookup>;
    let mut engine = Engine::new(blueprint, providers);
    let token = CancellationToken::new();

    let err = engine.links(&token).await.unwrap_err();
    match err {
        EngineError::CircularLinks { cycles, partial_roots } => {
            assert!(!cycles.is_empty());
            assert!(!partial_roots.is_empty());
        }
        other => panic!("expected CircularLinks, got {other:?}"),
    }
}

#[tokio::test]
async fn soft_cycle_succeeds_and_does_not_recurse_forever() {
    // Same ring shape as the hard-cycle fixture, but the stream -> lambda
    // edge is soft, so the cycle is permitted. An external `anchorApi`
    // resource links into the ring so its nodes survive top-level cleanup
    // as non-roots reachable from a real root, exercising both the cycle
    // analyser's soft-cycle path and the warning collector's cycle guard.
    let blueprint = parse(
        r#"
resources:
  anchorApi:
    type: aws/api/gateway
    metadata: { labels: { app: anchor } }
    linkSelector: { byLabel: { system: orders } }
  ordersTable:
    type: aws/dynamodb/table
    metadata: { labels: { system: orders } }
    linkSelector: { byLabel: { system: orders } }
  ordersStream:
    type: aws/dynamodb/stream
    metadata: { labels: { system: orders } }
    linkSelector: { byLabel: { workflow: orderStats } }
  statsAccumulatorFunction:
    type: aws/lambda/function
    metadata: { labels: { workflow: orderStats, system: orders } }
    linkSelector: { byLabel: { system: orders } }
"#,
        Format::Yaml,
    )
    .unwrap();

    let aws = StubProvider::new("aws")
        .with_resource("aws/api/gateway", &["aws/dynamodb/table"], false)
        .with_resource("aws/lambda/function", &["aws/dynamodb/table"], false)
        .with_resource("aws/dynamodb/table", &["aws/dynamodb/stream"], false)
        .with_resource("aws/dynamodb/stream", &["aws/lambda/function"], false)
        .with_link("aws/api/gateway", "aws/dynamodb/table", LinkKind::Soft)
        .with_link("aws/lambda/function", "aws/dynamodb/table", LinkKind::Hard)
        .with_link("aws/dynamodb/table", "aws/dynamodb/stream", LinkKind::Hard)
        .with_link("aws/dynamodb/stream", "aws/lambda/function", LinkKind::Soft);

    let providers = Arc::new(ProviderRegistry::from_iter([Arc::new(aws) as Arc<dyn Provider>]))
        as Arc<dyn provider::ProviderLookup>;
    let mut engine = Engine::new(blueprint, providers);
    let token = CancellationToken::new();

    let roots = engine.links(&token).await.expect("soft cycle must not fail the build");
    let root_names: Vec<String> = roots.iter().map(|r| r.borrow().resource_name.clone()).collect();
    assert_eq!(root_names, vec!["anchorApi".to_string()]);

    let warnings = engine.warnings(&token).await.expect("warning collection must terminate");
    assert!(warnings.is_empty());
}

#[tokio::test]
async fn cancelled_token_yields_no_forest() {
    let blueprint = parse(RICH_LINKING, Format::Yaml).unwrap();
    let providers = Arc::new(registry()) as Arc<dyn provider::ProviderLookup>;
    let mut engine = Engine::new(blueprint, providers);
    let token = CancellationToken::new();
    token.cancel();

    let err = engine.links(&token).await.unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}

#[tokio::test]
async fn rebuilding_a_cancelled_engine_is_rejected() {
    let blueprint = parse(RICH_LINKING, Format::Yaml).unwrap();
    let providers = Arc::new(registry()) as Arc<dyn provider::ProviderLookup>;
    let mut engine = Engine::new(blueprint, providers);
    let token = CancellationToken::new();
    token.cancel();

    assert!(engine.links(&token).await.is_err());
    let second = engine.links(&token).await.unwrap_err();
    assert!(matches!(second, EngineError::AlreadyBuilt));
}

#[tokio::test]
async fn rebuilding_a_built_engine_never_reconsults_providers() {
    let blueprint = parse(RICH_LINKING, Format::Yaml).unwrap();
    let aws = Arc::new(
        StubProvider::new("aws")
            .with_resource("aws/api/gateway", &["aws/lambda/function"], false)
            .with_resource(
                "aws/lambda/function",
                &["aws/dynamodb/table", "aws/lambda/function"],
                false,
            )
            .with_resource("aws/dynamodb/table", &["aws/dynamodb/stream"], false)
            .with_resource("aws/dynamodb/stream", &["aws/lambda/function"], false)
            .with_resource("aws/iam/role", &["aws/lambda/function"], false)
            .with_link("aws/api/gateway", "aws/lambda/function", LinkKind::Soft)
            .with_link("aws/lambda/function", "aws/dynamodb/table", LinkKind::Hard)
            .with_link("aws/dynamodb/table", "aws/dynamodb/stream", LinkKind::Hard)
            .with_link("aws/dynamodb/stream", "aws/lambda/function", LinkKind::Hard)
            .with_link("aws/iam/role", "aws/lambda/function", LinkKind::Hard),
    );
    let providers = Arc::new(ProviderRegistry::from_iter([aws.clone() as Arc<dyn Provider>]))
        as Arc<dyn provider::ProviderLookup>;
    let mut engine = Engine::new(blueprint, providers);
    let token = CancellationToken::new();

    engine.links(&token).await.expect("first build should succeed");
    let calls_after_first_build = aws.link_call_count();
    assert!(calls_after_first_build > 0);

    let second = engine.links(&token).await.unwrap_err();
    assert!(matches!(second, EngineError::AlreadyBuilt));
    assert_eq!(aws.link_call_count(), calls_after_first_build);
}

#[tokio::test]
async fn empty_blueprint_has_no_warnings_and_no_error() {
    let blueprint = parse("resources: {}", Format::Yaml).unwrap();
    let providers = Arc::new(registry()) as Arc<dyn provider::ProviderLookup>;
    let mut engine = Engine::new(blueprint, providers);
    let token = CancellationToken::new();

    let warnings = engine.warnings(&token).await.unwrap();
    assert!(warnings.is_empty());
}
