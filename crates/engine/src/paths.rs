//! Locating the KeyQuest root: the directory holding `assets/content`
//! (read-only game data) and `saves` (the persisted state file).

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::content::GAMES_FILE;

pub const ROOT_ENV_VAR: &str = "KEYQUEST_ROOT";
pub const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub root: PathBuf,
    pub content_dir: PathBuf,
    pub save_dir: PathBuf,
}

impl AppPaths {
    pub fn state_file(&self) -> PathBuf {
        self.save_dir.join(STATE_FILE_NAME)
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{var} is not valid unicode")]
    EnvNotUnicode { var: &'static str },
    #[error("could not locate the running executable: {0}")]
    CurrentExe(#[source] io::Error),
    #[error("could not create save directory {path}: {source}")]
    CreateSaveDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{env_var}={path} has no assets/content/{games_file}", games_file = GAMES_FILE)]
    InvalidEnvRoot { path: PathBuf, env_var: &'static str },
    #[error(
        "no KeyQuest root found above {searched} (looked for assets/content/{games_file}); \
         set {env_var} to the directory that holds assets/",
        games_file = GAMES_FILE
    )]
    RootNotFound {
        searched: PathBuf,
        env_var: &'static str,
    },
}

/// Uses `KEYQUEST_ROOT` when set, otherwise walks up from the executable
/// and then from the working directory.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match env::var(ROOT_ENV_VAR) {
        Ok(raw) => {
            let path = canonical_or_raw(Path::new(&raw));
            if !holds_content(&path) {
                return Err(StartupError::InvalidEnvRoot {
                    path,
                    env_var: ROOT_ENV_VAR,
                });
            }
            path
        }
        Err(env::VarError::NotUnicode(_)) => {
            return Err(StartupError::EnvNotUnicode { var: ROOT_ENV_VAR })
        }
        Err(env::VarError::NotPresent) => discover_root()?,
    };
    app_paths_for_root(root)
}

pub fn app_paths_for_root(root: PathBuf) -> Result<AppPaths, StartupError> {
    let save_dir = root.join("saves");
    fs::create_dir_all(&save_dir).map_err(|source| StartupError::CreateSaveDir {
        path: save_dir.clone(),
        source,
    })?;
    Ok(AppPaths {
        content_dir: root.join("assets").join("content"),
        save_dir,
        root,
    })
}

fn discover_root() -> Result<PathBuf, StartupError> {
    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let exe_dir = exe.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut starts = vec![exe_dir.clone()];
    if let Ok(cwd) = env::current_dir() {
        starts.push(cwd);
    }

    starts
        .iter()
        .find_map(|start| find_root_above(start))
        .map(|root| canonical_or_raw(&root))
        .ok_or(StartupError::RootNotFound {
            searched: exe_dir,
            env_var: ROOT_ENV_VAR,
        })
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    let found = start.ancestors().find(|dir| holds_content(dir))?;
    debug!(start = %start.display(), root = %found.display(), "root_discovered");
    Some(found.to_path_buf())
}

fn holds_content(dir: &Path) -> bool {
    dir.join("assets").join("content").join(GAMES_FILE).is_file()
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
