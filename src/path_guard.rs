//! Boundary checks for asset paths
//!
//! Asset paths come from untrusted data in both directions: `asset.path` in a
//! descriptor on import, and `asset.name` stored in a container on export.
//! Resolution is lexical only; nothing here touches the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::error::{PtimerError, Result};

/// Join `untrusted` onto `root` and require the result to stay strictly inside `root`
///
/// `.` segments are dropped and `..` pops a segment pushed earlier. Popping
/// past `root`, absolute paths, drive prefixes, and paths naming `root` itself
/// are rejected with [`PtimerError::PathTraversal`].
pub fn resolve_within(root: &Path, untrusted: impl AsRef<Path>) -> Result<PathBuf> {
    let untrusted = untrusted.as_ref();
    let reject = || PtimerError::PathTraversal {
        root: root.to_path_buf(),
        path: untrusted.to_path_buf(),
    };

    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;

    for component in untrusted.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(reject());
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return Err(reject()),
        }
    }

    if depth == 0 {
        return Err(reject());
    }

    Ok(resolved)
}

/// Render a path produced by [`resolve_within`] relative to `root`, with `/` separators
pub fn relative_path(root: &Path, resolved: &Path) -> Result<String> {
    let relative = resolved
        .strip_prefix(root)
        .map_err(|_| PtimerError::PathTraversal {
            root: root.to_path_buf(),
            path: resolved.to_path_buf(),
        })?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/timer")
    }

    #[test]
    fn test_plain_name_resolves_under_root() {
        let p = resolve_within(&root(), "beep.wav").unwrap();
        assert_eq!(p, PathBuf::from("/srv/timer/beep.wav"));
    }

    #[test]
    fn test_subdirectories_are_allowed() {
        let p = resolve_within(&root(), "sounds/./beep.wav").unwrap();
        assert_eq!(p, PathBuf::from("/srv/timer/sounds/beep.wav"));

        let p = resolve_within(&root(), "sounds/../beep.wav").unwrap();
        assert_eq!(p, PathBuf::from("/srv/timer/beep.wav"));
    }

    #[test]
    fn test_parent_escape_is_rejected() {
        for bad in ["../../etc/passwd", "../escape", "a/../../b", ".."] {
            let err = resolve_within(&root(), bad).unwrap_err();
            assert!(
                matches!(err, PtimerError::PathTraversal { .. }),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_absolute_override_is_rejected() {
        assert!(resolve_within(&root(), "/etc/passwd").is_err());
    }

    #[test]
    fn test_root_itself_is_rejected() {
        for bad in ["", ".", "a/.."] {
            assert!(resolve_within(&root(), bad).is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let p = resolve_within(&root(), "sounds/beep.wav").unwrap();
        assert_eq!(relative_path(&root(), &p).unwrap(), "sounds/beep.wav");
        assert!(relative_path(&root(), Path::new("/elsewhere/x")).is_err());
    }

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("..".to_string()),
            Just(".".to_string()),
            "[a-z]{1,6}",
        ]
    }

    proptest! {
        #[test]
        fn resolved_paths_never_leave_root(parts in proptest::collection::vec(segment(), 0..8)) {
            let untrusted = parts.join("/");
            if let Ok(resolved) = resolve_within(&root(), &untrusted) {
                prop_assert!(resolved.starts_with(root()));
                prop_assert_ne!(resolved, root());
            }
        }
    }
}
