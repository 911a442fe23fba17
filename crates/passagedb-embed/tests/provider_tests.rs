use passagedb_core::config::{EmbeddingConfig, RerankConfig};
use passagedb_core::error::Error;
use passagedb_embed::{embedder_from_config, reranker_from_config};

#[test]
fn factory_honors_provider_names() {
    let hash = EmbeddingConfig::default();
    let embedder = embedder_from_config(&hash).expect("hash embedder");
    assert_eq!(embedder.dim(), hash.dim);

    let none = RerankConfig::default();
    assert!(reranker_from_config(&none).expect("none reranker").is_none());

    let http = EmbeddingConfig {
        provider: "http".to_string(),
        endpoint: "http://127.0.0.1:9000/embed".to_string(),
        ..Default::default()
    };
    assert!(embedder_from_config(&http).is_ok());
}

#[test]
fn factory_rejects_unknown_providers() {
    let bad = EmbeddingConfig { provider: "cloud".to_string(), ..Default::default() };
    assert!(matches!(embedder_from_config(&bad), Err(Error::Validation(_))));

    let bad = RerankConfig { provider: "cross".to_string(), ..Default::default() };
    assert!(matches!(reranker_from_config(&bad), Err(Error::Validation(_))));
}
