//! File resolution and the load/validate entry points.

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    eval,
    instance::ConfigInstance,
    walk,
};

/// Loads from the first existing usual path of the instance's schema.
///
/// Fails with [`ConfigError::NoUsualPath`] when the schema has none, and
/// [`ConfigError::NoExistingUsualPath`] when none of them exist.
pub fn load(conf: &mut ConfigInstance) -> Result<()> {
    let usual = conf.schema().usual_paths();
    if usual.is_empty() {
        return Err(ConfigError::NoUsualPath {
            schema: conf.schema().name().to_string(),
        });
    }
    let Some(existing) = usual.iter().find(|p| p.exists()).cloned() else {
        return Err(ConfigError::NoExistingUsualPath {
            paths: usual.to_vec(),
        });
    };
    load_path(conf, existing)
}

/// Reads one file and evaluates it into `conf`. The path is absolutized
/// first so relative nested includes resolve against the file's directory
/// regardless of the caller's working directory.
pub fn load_path(conf: &mut ConfigInstance, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::PathNotFound {
            path: path.to_path_buf(),
        });
    }
    let path = absolutize(path)?;
    let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
        path: path.clone(),
        source: e,
    })?;
    debug!(path = %path.display(), schema = conf.schema().name(), "loading configuration");
    eval::evaluate(conf, &text, Some(&path))
}

/// Evaluates each path in order into the same instance: a shallow
/// sequential merge where the last file to set a parameter wins. A failure
/// aborts the call, but earlier files' effects remain applied.
pub fn load_paths<P: AsRef<Path>>(conf: &mut ConfigInstance, paths: &[P]) -> Result<()> {
    for path in paths {
        load_path(conf, path)?;
    }
    Ok(())
}

/// Reads all available content from an already-open input and evaluates it.
/// Relative includes then resolve against the working directory.
pub fn load_reader(conf: &mut ConfigInstance, mut reader: impl Read) -> Result<()> {
    let mut text = String::new();
    reader.read_to_string(&mut text).map_err(|e| ConfigError::Io {
        path: PathBuf::from("<reader>"),
        source: e,
    })?;
    eval::evaluate(conf, &text, None)
}

/// Walks the whole configuration tree collecting every validation message,
/// and fails once with the aggregate list if any were produced.
pub fn validate(conf: &ConfigInstance) -> Result<()> {
    let errors = walk::collect_errors(conf);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation { errors })
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}
