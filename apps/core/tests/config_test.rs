use std::time::{SystemTime, UNIX_EPOCH};

fn unique_config_path(label: &str) -> std::path::PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir()
        .join("gestock")
        .join(format!("{label}-{unique}"))
        .join("config.toml")
}

#[test]
fn accepts_default_config() {
    let cfg = gestock_core::config::Config::default();
    assert_eq!(cfg.display_limit, 50);
    assert_eq!(cfg.browse_limit, 30);
    assert_eq!(cfg.fuzzy_threshold, 0.4);
    assert_eq!(cfg.debounce_ms, 150);
    assert_eq!(cfg.default_source, "products.csv");
    assert!(cfg.cache_db_path.to_string_lossy().contains("gestock"));
    assert!(gestock_core::config::validate(&cfg).is_ok());
}

#[test]
fn rejects_display_limit_out_of_range() {
    let cfg = gestock_core::config::Config {
        display_limit: 500,
        ..Default::default()
    };
    assert!(gestock_core::config::validate(&cfg).is_err());
}

#[test]
fn rejects_threshold_and_browse_limit_out_of_range() {
    let cfg = gestock_core::config::Config {
        fuzzy_threshold: 1.5,
        ..Default::default()
    };
    assert!(gestock_core::config::validate(&cfg).is_err());

    let cfg = gestock_core::config::Config {
        browse_limit: 80,
        ..Default::default()
    };
    assert!(gestock_core::config::validate(&cfg).is_err());
}

#[test]
fn missing_file_loads_defaults() {
    let path = unique_config_path("cfg-missing");
    let cfg = gestock_core::config::load(Some(&path)).unwrap();

    assert_eq!(cfg.config_path, path);
    assert_eq!(cfg.display_limit, 50);
}

#[test]
fn saved_config_loads_back() {
    let path = unique_config_path("cfg-save");
    let cfg = gestock_core::config::Config {
        default_source: "https://example.com/products.csv".to_string(),
        debounce_ms: 300,
        config_path: path.clone(),
        ..Default::default()
    };
    gestock_core::config::save(&cfg).unwrap();

    let loaded = gestock_core::config::load(Some(&path)).unwrap();
    assert_eq!(loaded, cfg);

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn partial_file_fills_in_defaults() {
    let path = unique_config_path("cfg-partial");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "fuzzy_threshold = 0.25\n").unwrap();

    let cfg = gestock_core::config::load(Some(&path)).unwrap();
    assert_eq!(cfg.fuzzy_threshold, 0.25);
    assert_eq!(cfg.display_limit, 50);

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn invalid_values_in_file_are_rejected() {
    let path = unique_config_path("cfg-invalid");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "debounce_ms = 60000\n").unwrap();

    let error = gestock_core::config::load(Some(&path)).unwrap_err();
    assert!(matches!(error, gestock_core::config::ConfigError::Invalid(_)));

    std::fs::write(&path, "display_limit = \"lots\"\n").unwrap();
    let error = gestock_core::config::load(Some(&path)).unwrap_err();
    assert!(matches!(error, gestock_core::config::ConfigError::Parse(_)));

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}
