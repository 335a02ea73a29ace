use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::error::BuildError;

/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `--verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Outcome of a write that is skipped when the target already holds the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    Unchanged,
}

pub fn write_if_changed(path: &Path, contents: &[u8]) -> Result<WriteStatus, BuildError> {
    if path.is_file() {
        match fs::read(path) {
            Ok(existing) if existing == contents => {
                debug!("Skipped (Unchanged): {}", path.display());
                return Ok(WriteStatus::Unchanged);
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read {} for comparison: {}", path.display(), e),
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| BuildError::io(path, e))?;
    Ok(WriteStatus::Written)
}

/// Copies `source` to `target` unless `target` already has identical content.
pub fn smart_copy_file(source: &Path, target: &Path) -> Result<WriteStatus, BuildError> {
    if target.is_file() {
        let source_content = fs::read(source).map_err(|e| BuildError::io(source, e))?;
        let target_content = fs::read(target).map_err(|e| BuildError::io(target, e))?;
        if source_content == target_content {
            debug!("Skipped (Unchanged Content): {}", source.display());
            return Ok(WriteStatus::Unchanged);
        }
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    fs::copy(source, target).map_err(|e| BuildError::io(source, e))?;
    debug!("Copied: {} -> {}", source.display(), target.display());
    Ok(WriteStatus::Written)
}

/// Mirrors the asset directory into `target`. Any failure is an `AssetCopy` error.
pub fn copy_assets(assets: &Path, target: &Path) -> Result<usize, BuildError> {
    let asset_error = |source| BuildError::AssetCopy {
        path: assets.to_path_buf(),
        source,
    };
    let mut copied = 0;
    for entry in WalkDir::new(assets).sort_by_file_name() {
        let entry = entry.map_err(|e| asset_error(e.into()))?;
        let Ok(rel) = entry.path().strip_prefix(assets) else {
            continue;
        };
        let dest = target.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(asset_error)?;
            continue;
        }
        let unchanged = dest.is_file() && fs::read(entry.path()).ok() == fs::read(&dest).ok();
        if !unchanged {
            fs::copy(entry.path(), &dest).map_err(asset_error)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Paths a clean build may never remove.
fn protected_paths(config: &BuildConfig) -> Vec<PathBuf> {
    let mut protected = vec![absolute(&config.source), absolute(&config.assets)];
    if let Some(templates) = &config.templates {
        protected.push(absolute(templates));
    }
    protected
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Removes the allow-listed generated files and directories from the output root.
/// Entries containing a build input, and directories inside the content root, are kept.
pub fn clean_output(config: &BuildConfig) -> Result<usize, BuildError> {
    let clean = &config.site.clean;
    let protected = protected_paths(config);
    let dirs = clean
        .dirs
        .iter()
        .cloned()
        .chain(config.site.sections.iter().map(|s| s.slug.clone()));
    let candidates = clean.files.iter().cloned().chain(dirs);

    let source = absolute(&config.source);

    let mut removed = 0;
    for name in candidates {
        let path = config.target.join(&name);
        if !path.exists() {
            continue;
        }
        let resolved = absolute(&path);
        // directories under the content root may hold page sources
        let holds_inputs = protected.iter().any(|p| p.starts_with(&resolved))
            || (path.is_dir() && resolved.starts_with(&source));
        if holds_inputs {
            warn!("Not cleaning {}: it holds build inputs", path.display());
            continue;
        }
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| BuildError::io(&path, e))?;
        debug!("Removed {}", path.display());
        removed += 1;
    }
    info!("Cleaned {} generated entries from {}", removed, config.target.display());
    Ok(removed)
}
