use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        Self::with_dirs(project_root, user_data_dir)
    }

    /// Builds paths for an explicit root, with data stored alongside it.
    pub fn with_root(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self::with_dirs(project_root.clone(), project_root)
    }

    fn with_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let secrets_path = user_data_dir.join("secrets.yaml");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            secrets_path,
        }
    }

    /// Resolves a configured documents directory against the project root.
    pub fn resolve_documents_dir(&self, configured: &Path) -> PathBuf {
        resolve_against(&self.project_root, configured)
    }

    /// Resolves a configured database file against the user data directory.
    pub fn resolve_store_path(&self, configured: &Path) -> PathBuf {
        resolve_against(&self.user_data_dir, configured)
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_against(base: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        base.join(configured)
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("RAGBOT_ROOT") {
        return PathBuf::from(root);
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("RAGBOT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    project_root.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_their_bases() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_root(tmp.path());

        assert_eq!(
            paths.resolve_documents_dir(Path::new("documents")),
            tmp.path().join("documents")
        );
        assert_eq!(
            paths.resolve_store_path(Path::new("vector_db/rag.db")),
            tmp.path().join("vector_db/rag.db")
        );
        assert!(paths.log_dir.exists());
    }

    #[test]
    fn absolute_paths_are_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_root(tmp.path());
        let absolute = tmp.path().join("elsewhere").join("docs");

        assert_eq!(paths.resolve_documents_dir(&absolute), absolute);
    }
}
