use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    let catalog = ProcedureCatalog::from_dir(dir.path().join("does-not-exist")).unwrap();
    assert!(catalog.is_empty());
}

#[test]
fn test_loads_sql_files_by_stem() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("GetUser.sql"),
        "CREATE PROCEDURE GetUser(IN id INT) SELECT id;",
    )
    .unwrap();
    fs::write(dir.path().join("SetFlag.SQL"), "CREATE PROCEDURE SetFlag() SELECT 1;").unwrap();
    fs::write(dir.path().join("README.md"), "not a procedure").unwrap();
    fs::create_dir(dir.path().join("nested.sql")).unwrap();

    let catalog = ProcedureCatalog::from_dir(dir.path()).unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["GetUser", "SetFlag"]);
    assert!(catalog.contains("SetFlag"));
    assert!(!catalog.contains("README"));

    let get_user = catalog.get("GetUser").unwrap();
    assert_eq!(get_user.path, dir.path().join("GetUser.sql"));
    assert!(get_user.definition.starts_with("CREATE PROCEDURE GetUser"));
}
