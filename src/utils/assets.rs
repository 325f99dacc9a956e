//! Static asset copying.

use super::watch::is_temp_file;
use anyhow::{Context, Result};
use std::{fs, path::Path};
use walkdir::WalkDir;

/// Mirror every file under `assets` into `output`. Returns the number copied.
///
/// A missing assets directory copies nothing.
pub fn copy_assets(assets: &Path, output: &Path) -> Result<usize> {
    if !assets.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(assets).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if !entry.file_type().is_file() || is_temp_file(path) {
            continue;
        }

        let relative = path.strip_prefix(assets)?;
        let target = output.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &target)
            .with_context(|| format!("Failed to copy asset {}", relative.display()))?;
        copied += 1;
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_assets_mirrors_tree() {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("assets");
        let output = dir.path().join("docs");
        fs::create_dir_all(assets.join("img")).unwrap();
        fs::write(assets.join("img/logo.svg"), "<svg/>").unwrap();
        fs::write(assets.join("robots.txt"), "User-agent: *").unwrap();
        fs::write(assets.join("robots.txt~"), "backup").unwrap();

        assert_eq!(copy_assets(&assets, &output).unwrap(), 2);
        assert_eq!(fs::read_to_string(output.join("img/logo.svg")).unwrap(), "<svg/>");
        assert!(!output.join("robots.txt~").exists());
    }

    #[test]
    fn test_missing_assets_dir() {
        let dir = TempDir::new().unwrap();
        assert_eq!(copy_assets(&dir.path().join("nope"), dir.path()).unwrap(), 0);
    }
}
