use anyhow::Result;
use std::path::{Path, PathBuf};

/// Find the runner binary.
///
/// Names containing a path separator are taken relative to `workdir`,
/// bare names (`npx`, `node`) are looked up on the system PATH.
pub fn find_binary(name: &str, workdir: &Path) -> Result<PathBuf> {
    let candidate = Path::new(name);
    let mut checked_paths = Vec::new();

    if candidate.components().count() > 1 {
        let path = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            workdir.join(candidate)
        };
        checked_paths.push(format!("Explicit path: {:?}", path));
        if path.is_file() {
            return Ok(path);
        }
    } else if let Ok(path) = which::which(name) {
        return Ok(path);
    } else {
        checked_paths.push("System PATH".to_string());
    }

    Err(anyhow::anyhow!(
        "Could not find runner binary '{}'. Checked:\n{}",
        name,
        checked_paths.join("\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_lists_checked_paths() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_binary("./bin/not-a-runner", dir.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not-a-runner"));
        assert!(msg.contains("Explicit path"));
    }

    #[test]
    fn test_explicit_relative_path_resolves_against_workdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/runner"), "#!/bin/sh\n").unwrap();

        let found = find_binary("bin/runner", dir.path()).unwrap();
        assert_eq!(found, dir.path().join("bin/runner"));
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_name_uses_path() {
        let found = find_binary("sh", Path::new(".")).unwrap();
        assert!(found.ends_with("sh"));
    }
}
