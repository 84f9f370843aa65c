use std::path::{Component, Path, PathBuf};

use crate::error::{PackError, Result};

/// Resolve an archive entry path under `base`, refusing anything that would
/// land outside of it.
pub fn resolve_entry<P: AsRef<Path>, B: AsRef<Path>>(entry_path: P, base: B) -> Result<PathBuf> {
    let entry_path = entry_path.as_ref();
    let base = base.as_ref();

    let relative = normalize_relative(entry_path).ok_or_else(|| PackError::ZipSlip {
        entry:    entry_path.to_path_buf(),
        resolved: base.join(entry_path),
    })?;

    let resolved = base.join(relative);
    if !resolved.starts_with(base) {
        return Err(PackError::ZipSlip {
            entry: entry_path.to_path_buf(),
            resolved,
        });
    }
    Ok(resolved)
}

/// Check that `name` is usable as a packaged entry name: relative,
/// `/`-separated, and free of `.`/`..` segments.
pub fn validate_entry_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if invalid {
        return Err(PackError::InvalidEntryName(name.to_string()));
    }
    Ok(())
}

/// Lexically normalize a relative path. `None` when the path is absolute or
/// climbs above its starting point.
fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => result.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(result)
}
