use fcrypt_logger::{AUDIT_TARGET, LevelFilter, Logger};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn read_single_log(dir: &Path) -> String {
    let path = fs::read_dir(dir)
        .expect("directory should exist")
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");
    fs::read_to_string(path).expect("log file should be readable")
}

#[test]
fn audit_events_go_to_their_own_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");
    let audit_dir = tmp_dir.path().join("audit");

    let logger = Logger::builder()
        .name("integration-audit")
        .console(false)
        .audit_path(&audit_dir)
        .path(&log_dir)
        .level(LevelFilter::WARN)
        .init()?;
    assert_eq!(logger.writers(), 2);

    tracing::info!("routine event");
    tracing::info!(target: AUDIT_TARGET, schema = "credentials", "Key rotated");
    tracing::warn!(target: AUDIT_TARGET, field = "secret", "Rejected bulk update");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let audit = read_single_log(&audit_dir);
    assert!(audit.contains("Rejected bulk update"));
    assert!(audit.contains("Key rotated"), "audit trail ignores the level filter");
    assert!(!audit.contains("routine event"));
    assert!(audit.lines().all(|line| line.starts_with('{')));

    let main = read_single_log(&log_dir);
    assert!(main.contains("Rejected bulk update"));
    assert!(!main.contains("Key rotated"));
    assert!(!main.contains("routine event"));

    Ok(())
}
