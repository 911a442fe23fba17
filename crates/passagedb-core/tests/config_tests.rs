use figment::providers::{Format, Toml};
use figment::Figment;
use figment::providers::Serialized;

use passagedb_core::config::{expand_path, resolve_with_base, AppConfig};

#[test]
fn defaults_are_complete() {
    let cfg = AppConfig::from_figment(
        Figment::new().merge(Serialized::defaults(AppConfig::default())),
    )
    .expect("defaults extract");

    assert_eq!(cfg.embedding.provider, "hash");
    assert_eq!(cfg.embedding.dim, 384);
    assert_eq!(cfg.rerank.provider, "none");
    assert_eq!(cfg.retrieval.per_doc, 2);
    assert_eq!(cfg.retrieval.neighbors, 2);
    assert_eq!(cfg.retrieval.overfetch_factor, 4);
    assert_eq!(cfg.server.addr, "127.0.0.1:8080");
}

#[test]
fn toml_overrides_defaults() {
    let toml = r#"
        [embedding]
        provider = "http"
        endpoint = "http://127.0.0.1:9000/embed"
        dim = 768

        [retrieval]
        per_doc = 3
    "#;
    let cfg = AppConfig::from_figment(
        Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(toml)),
    )
    .expect("extract");

    assert_eq!(cfg.embedding.provider, "http");
    assert_eq!(cfg.embedding.dim, 768);
    assert_eq!(cfg.retrieval.per_doc, 3);
    // untouched sections keep their defaults
    assert_eq!(cfg.retrieval.neighbors, 2);
    assert_eq!(cfg.data.store_dir, "data/store");
}

#[test]
fn expand_and_resolve_paths() {
    std::env::set_var("PASSAGEDB_TEST_DIR", "/srv/corpus");
    let p = expand_path("${PASSAGEDB_TEST_DIR}/index");
    assert_eq!(p, std::path::PathBuf::from("/srv/corpus/index"));

    let base = std::path::Path::new("/opt/app");
    assert_eq!(resolve_with_base(base, "data/store"), std::path::PathBuf::from("/opt/app/data/store"));
    assert_eq!(resolve_with_base(base, "/abs/store"), std::path::PathBuf::from("/abs/store"));
}
