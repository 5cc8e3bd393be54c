//! PATH lookup for runtime discovery.
//!
//! The CLI runs from a terminal, so the inherited PATH is authoritative; it
//! is re-read on every call rather than cached so that discovery always
//! reflects the current environment.

use std::path::{Path, PathBuf};

/// Platform-specific PATH separator.
#[cfg(windows)]
const PATH_SEP: char = ';';
#[cfg(not(windows))]
const PATH_SEP: char = ':';

/// Directories listed in `PATH`, in order, with empty entries dropped.
pub fn search_dirs() -> Vec<PathBuf> {
    let path = std::env::var("PATH").unwrap_or_default();
    path.split(PATH_SEP)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// `which`-like lookup of `cmd` over an explicit directory list.
pub fn which_in(cmd: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    #[cfg(windows)]
    let extensions: Vec<String> = std::env::var("PATHEXT")
        .unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string())
        .split(';')
        .map(|e| e.trim_start_matches('.').to_string())
        .collect();

    for dir in dirs {
        let base = Path::new(dir).join(cmd);

        // On Unix: just check the exact name
        #[cfg(not(windows))]
        {
            if base.is_file() {
                return Some(base);
            }
        }

        // On Windows: check with each PATHEXT extension
        #[cfg(windows)]
        {
            if base.is_file() {
                return Some(base);
            }
            for name in with_pathext(cmd, &extensions) {
                let candidate = Path::new(dir).join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// `cmd` with each extension appended: `python3.13` -> `python3.13.EXE`.
#[cfg(any(windows, test))]
fn with_pathext(cmd: &str, extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| format!("{}.{}", cmd, ext))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_which_in_returns_first_match() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("python3"), "").unwrap();
        std::fs::write(first.path().join("python3"), "").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(
            which_in("python3", &dirs),
            Some(first.path().join("python3"))
        );
    }

    #[test]
    fn test_which_in_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("python3")).unwrap();
        assert_eq!(which_in("python3", &[dir.path().to_path_buf()]), None);
    }

    #[test]
    fn test_pathext_appends_to_versioned_names() {
        let extensions = vec!["EXE".to_string(), "CMD".to_string()];
        assert_eq!(
            with_pathext("python3.13", &extensions),
            vec!["python3.13.EXE".to_string(), "python3.13.CMD".to_string()]
        );
    }
}
