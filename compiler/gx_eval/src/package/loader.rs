//! Reading package directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{RawPackage, SourceFile};
use crate::config::LoaderConfig;

/// Failure to read a package directory.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no source files in {dir:?}")]
    NoSources { dir: PathBuf },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> LoadError + '_ {
    move |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read every source file in `dir` (not its subdirectories), sorted by
/// path.
#[tracing::instrument(level = "debug", skip(config), fields(extension = %config.extension))]
pub fn load(dir: &Path, config: &LoaderConfig) -> Result<RawPackage, LoadError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        let matches = path
            .extension()
            .is_some_and(|ext| ext == config.extension.as_str());
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(LoadError::NoSources {
            dir: dir.to_path_buf(),
        });
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path).map_err(io_error(&path))?;
        files.push(SourceFile { path, text });
    }
    tracing::debug!(files = files.len(), "loaded package");
    Ok(RawPackage {
        dir: dir.to_path_buf(),
        files,
    })
}
