use reqflow_core::paths::CONFIG_FILE;
use std::path::{Path, PathBuf};

/// Resolve the directory `reqflow.yaml` is read from.
///
/// Priority:
/// 1. `--root` flag / `REQFLOW_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `reqflow.yaml`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_config_dir(&cwd).unwrap_or(cwd)
}

fn find_config_dir(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(CONFIG_FILE).is_file() {
            return Some(dir);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_config_in_ancestor() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "pipeline: {}\n").unwrap();
        let subdir = dir.path().join("runs/today");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_config_dir(&subdir), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn no_config_anywhere() {
        let dir = TempDir::new().unwrap();
        let subdir = dir.path().join("a/b");
        std::fs::create_dir_all(&subdir).unwrap();
        // An ancestor of the temp dir could in principle hold a config; only
        // assert we never stop below the temp root.
        if let Some(found) = find_config_dir(&subdir) {
            assert!(!found.starts_with(dir.path()));
        }
    }
}
