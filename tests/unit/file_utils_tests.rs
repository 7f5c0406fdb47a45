/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use fusion_translator::file_utils::FileManager;

use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_with_existing_file_should_return_true() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "page.txt", "content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    assert!(FileManager::dir_exists(temp_dir.path()));
    Ok(())
}

#[test]
fn test_file_exists_with_missing_file_should_return_false() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

#[test]
fn test_relative_key_should_use_forward_slashes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = common::create_test_file(temp_dir.path(), "shop/chairs/oak.txt", "x")?;

    assert_eq!(FileManager::relative_key(temp_dir.path(), &nested)?, "shop/chairs/oak.txt");
    assert!(FileManager::relative_key(temp_dir.path().join("other"), &nested).is_err());
    Ok(())
}

#[test]
fn test_write_to_file_should_create_parent_dirs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("a/b/c/container_1.txt");

    FileManager::write_to_file(&path, "[fusion_text]Hi[/fusion_text]")?;
    assert_eq!(FileManager::read_to_string(&path)?, "[fusion_text]Hi[/fusion_text]");
    Ok(())
}

#[test]
fn test_read_json_with_invalid_content_should_fail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.json", "{ not json")?;

    let result: Result<Vec<String>> = FileManager::read_json(&path);
    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid JSON"));
    Ok(())
}

#[test]
fn test_find_files_in_missing_dir_should_fail() {
    assert!(FileManager::find_files("definitely/not/here", "txt").is_err());
}
