//! File-system lookup for playable media.
//!
//! Search walks the tree; the random-folder listing deliberately does
//! not (it mirrors how the two entry points behave).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// List files directly inside `folder`, non-recursive.
pub fn list_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(folder).with_context(|| format!("read folder {}", folder.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Recursively collect files whose name contains `query`.
///
/// The match is a case-sensitive substring test against the file name
/// only, never the full path.
pub fn search(folder: &Path, query: &str) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    walk(folder, query, &mut matches)
        .with_context(|| format!("search {}", folder.display()))?;
    matches.sort();
    Ok(matches)
}

fn walk(dir: &Path, query: &str, matches: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, query, matches)?;
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.contains(query) {
                matches.push(path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tree() -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "homecast-library-test-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("jazz1.mp3"), b"x").unwrap();
        fs::write(root.join("rock.mp3"), b"x").unwrap();
        fs::write(root.join("sub").join("jazz2.mp3"), b"x").unwrap();
        root
    }

    #[test]
    fn list_folder_is_non_recursive() {
        let root = make_tree();
        let files = list_folder(&root).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["jazz1.mp3", "rock.mp3"]);
    }

    #[test]
    fn search_descends_and_matches_substring() {
        let root = make_tree();
        let files = search(&root, "jazz").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["jazz1.mp3", "jazz2.mp3"]);
    }

    #[test]
    fn search_is_case_sensitive() {
        let root = make_tree();
        assert!(search(&root, "JAZZ").unwrap().is_empty());
    }

    #[test]
    fn missing_folder_is_an_error() {
        assert!(list_folder(Path::new("/nonexistent/homecast")).is_err());
        assert!(search(Path::new("/nonexistent/homecast"), "x").is_err());
    }
}
