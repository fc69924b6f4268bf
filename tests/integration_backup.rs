// tests/integration_backup.rs
use layerfix_core::repository::{FsRepository, SourceRepository, BACKUP_DIR};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[test]
fn test_backup_dir_created() -> Result<()> {
    let d = tempdir()?;
    fs::write(d.path().join("page.tsx"), "original")?;

    let repo = FsRepository::new(d.path())?;
    let original = repo.read(Path::new("page.tsx"))?;
    repo.backup(Path::new("page.tsx"), &original)?;

    assert!(d.path().join(BACKUP_DIR).exists());
    Ok(())
}

#[test]
fn test_timestamp_folder() -> Result<()> {
    let d = tempdir()?;
    let repo = FsRepository::with_stamp(d.path(), 1_700_000_000);
    repo.backup(Path::new("src/app/page.tsx"), "original")?;

    let backup_root = d.path().join(BACKUP_DIR);
    let entries: Vec<_> = fs::read_dir(backup_root)?.collect();
    assert_eq!(entries.len(), 1);

    let first_entry = entries[0]
        .as_ref()
        .map_err(std::string::ToString::to_string)?;
    assert!(first_entry.path().is_dir());
    assert_eq!(first_entry.file_name().to_string_lossy(), "1700000000");
    Ok(())
}

#[test]
fn test_existing_backed_up_before_write() -> Result<()> {
    let d = tempdir()?;
    let file = Path::new("tsconfig.json");
    fs::write(d.path().join(file), "{\"compilerOptions\":{}}")?;

    let repo = FsRepository::with_stamp(d.path(), 7);
    let original = repo.read(file)?;
    let saved = repo.backup(file, &original)?;
    repo.write(file, "{}")?;

    assert_eq!(fs::read_to_string(saved)?, "{\"compilerOptions\":{}}");
    assert_eq!(fs::read_to_string(d.path().join(file))?, "{}");
    Ok(())
}

#[test]
fn test_retention_cleanup() -> Result<()> {
    let d = tempdir()?;
    for stamp in 10..16 {
        FsRepository::with_stamp(d.path(), stamp).backup(Path::new("a.js"), "x")?;
    }
    fs::create_dir_all(d.path().join(BACKUP_DIR).join("not-a-stamp"))?;

    let removed = FsRepository::with_stamp(d.path(), 16).cleanup_old_backups(3);
    assert_eq!(removed, 3);

    let mut left: Vec<String> = fs::read_dir(d.path().join(BACKUP_DIR))?
        .filter_map(std::result::Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["13", "14", "15", "not-a-stamp"]);
    Ok(())
}
