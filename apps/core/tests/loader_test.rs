use std::sync::mpsc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use gestock_core::loader::{load, load_in_background, DataSource, LoadError};

fn unique_file(label: &str) -> std::path::PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir()
        .join("gestock")
        .join(format!("{label}-{unique}.csv"))
}

#[test]
fn loads_csv_from_disk_with_invalid_utf8_replaced() {
    let path = unique_file("loader-disk");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut bytes = b"name,price\nAz".to_vec();
    bytes.push(0xff);
    bytes.extend_from_slice(b"car,100\n");
    std::fs::write(&path, bytes).unwrap();

    let records = load(&DataSource::Path(path.clone())).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("name"), Some("Az\u{fffd}car"));

    std::fs::remove_file(path).unwrap();
}

#[test]
fn missing_file_reports_origin() {
    let path = unique_file("loader-missing");
    let error = load(&DataSource::Path(path.clone())).unwrap_err();

    assert!(matches!(error, LoadError::Io { .. }));
    assert!(error.to_string().contains(&path.display().to_string()));
}

#[test]
fn background_load_delivers_completion() {
    let (tx, rx) = mpsc::channel();
    let handle = load_in_background(
        DataSource::text("inline.csv", "name\nArroz\nFideos\n"),
        move |completion| {
            tx.send(completion).unwrap();
        },
    );

    let completion = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    handle.join().unwrap();

    assert_eq!(completion.origin, "inline.csv");
    assert_eq!(completion.result.unwrap().len(), 2);
}
