use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use gestock_core::config::Config;
use gestock_core::contract::SearchResponse;
use gestock_core::runtime::{run, Cli};

fn unique_dir(label: &str) -> std::path::PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir()
        .join("gestock")
        .join(format!("{label}-{unique}"))
}

fn test_config(dir: &std::path::Path) -> Config {
    Config {
        default_source: dir.join("products.csv").to_string_lossy().into_owned(),
        cache_db_path: dir.join("cache.sqlite3"),
        output_dir: dir.join("export"),
        log_dir: dir.join("logs"),
        config_path: dir.join("config.toml"),
        ..Default::default()
    }
}

fn run_args(config: &Config, args: &[&str]) -> String {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::new();
    run(cli, config, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn precios_loads_csv_then_serves_from_cache() {
    let dir = unique_dir("runtime-precios");
    std::fs::create_dir_all(&dir).unwrap();
    let csv = dir.join("upload.csv");
    std::fs::write(
        &csv,
        "itemCode,name,price,lastUpdated\nA1,Yerba,\"9,00\",2024-01-01\nA1,Yerba,\"10,50\",\n",
    )
    .unwrap();
    let config = test_config(&dir);
    let csv_arg = csv.to_string_lossy().into_owned();

    let printed = run_args(&config, &["gestock", "precios", "yerba", "--csv", &csv_arg, "--json"]);
    let response: SearchResponse = serde_json::from_str(&printed).unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].price, 10.5);
    assert!(config.config_path.exists());

    std::fs::remove_file(&csv).unwrap();
    let printed = run_args(&config, &["gestock", "precios"]);
    assert!(printed.contains("1 productos (precio MÁXIMO por producto) — mostrando 50"));
    assert!(printed.contains("$\u{a0}10,50"));
    assert!(printed.contains("—"));

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn precios_clear_drops_cached_catalog() {
    let dir = unique_dir("runtime-clear");
    std::fs::create_dir_all(&dir).unwrap();
    let csv = dir.join("upload.csv");
    std::fs::write(&csv, "name,price\nSal,300\n").unwrap();
    let config = test_config(&dir);
    let csv_arg = csv.to_string_lossy().into_owned();

    run_args(&config, &["gestock", "precios", "--csv", &csv_arg]);
    let printed = run_args(&config, &["gestock", "precios", "--clear"]);
    assert!(printed.contains("Datos de precios borrados."));

    let printed = run_args(&config, &["gestock", "precios", "sal", "--json"]);
    let response: SearchResponse = serde_json::from_str(&printed).unwrap();
    assert_eq!(response.loaded, 0);
    assert!(response.error.unwrap().contains("products.csv"));

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn labels_export_and_script_write_artifacts() {
    let dir = unique_dir("runtime-labels");
    let config = test_config(&dir);
    let out_arg = dir.join("out").to_string_lossy().into_owned();

    let printed = run_args(
        &config,
        &["gestock", "labels", "export", "--out", &out_arg, "Café Ñandú", "Agua"],
    );
    assert!(printed.starts_with("Exportado: "));
    let written = std::fs::read_to_string(dir.join("out").join("etiquetas_nombres.csv")).unwrap();
    assert_eq!(
        written,
        "\"name\",\"$\",\"price\"\r\n\"Café Ñandú\",\"$\",\"\"\r\n\"Agua\",\"$\",\"\""
    );

    run_args(&config, &["gestock", "labels", "script", "--out", &out_arg]);
    assert!(dir.join("out").join("formatear_hoja.gs").exists());

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn labels_search_prints_hint_when_nothing_matches() {
    let dir = unique_dir("runtime-search");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("products.csv"), "name,itemCode\nArroz Largo,AR1\n").unwrap();
    let config = test_config(&dir);

    let printed = run_args(&config, &["gestock", "labels", "search", "arroz"]);
    assert_eq!(printed, "  1. Arroz Largo\n     AR1\n");

    let printed = run_args(&config, &["gestock", "labels", "search", "zzzz", "qqqq"]);
    assert!(printed.starts_with("No hay coincidencias."));

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn export_without_names_is_an_argument_error() {
    let error = Cli::try_parse_from(["gestock", "labels", "export", "--out", "x"]).unwrap_err();
    assert_eq!(error.exit_code(), 2);
}
