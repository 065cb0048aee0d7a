//! Node name rules.
//!
//! Node names are absolute, slash-separated paths. `/` names the root
//! group of a whole-file walk; everything else is `/a/b/...` without empty
//! segments or a trailing slash.

use crate::error::{Error, Result};

/// Check that `name` is a well-formed node name.
pub fn validate_name(name: &str) -> Result<()> {
    let malformed = !name.contains('/')
        || name.contains("//")
        || (name.len() > 1 && name.ends_with('/'));
    if malformed {
        return Err(Error::MalformedName(name.to_string()));
    }
    Ok(())
}

/// Name with its last `/segment` removed: `""` for top-level names.
pub fn parent_of(name: &str) -> &str {
    name.rfind('/').map_or("", |i| &name[..i])
}

/// Split into parent and last segment.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => ("", name),
    }
}

/// Store path of a parent as returned by [`parent_of`].
pub(crate) fn store_path(parent: &str) -> &str {
    if parent.is_empty() {
        "/"
    } else {
        parent
    }
}

/// Walk root as used for naming: `.` and `/` collapse to empty and a
/// trailing slash is dropped.
pub(crate) fn walk_root(from: &str) -> &str {
    match from {
        "." | "/" => "",
        other => other.trim_end_matches('/'),
    }
}

/// Name of an entry found below `root`.
///
/// `.` names `root` itself, `/` when `root` is empty.
pub(crate) fn join(root: &str, name: &str) -> String {
    if name == "." {
        if root.is_empty() {
            "/".to_string()
        } else {
            root.to_string()
        }
    } else {
        let mut path = format!("{}/{}", walk_root(root), name);
        if path.len() > 1 && path.ends_with('/') {
            path.pop();
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_and_malformed_names() {
        for ok in ["/", "/a", "/a/b", "/a b/c"] {
            assert!(validate_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "a", "/a//b", "/a/", "//"] {
            assert!(
                matches!(validate_name(bad), Err(Error::MalformedName(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn parents() {
        assert_eq!(parent_of("/a/b"), "/a");
        assert_eq!(parent_of("/a"), "");
        assert_eq!(parent_of("/"), "");
        assert_eq!(split_name("/a/b"), ("/a", "b"));
        assert_eq!(store_path(parent_of("/a")), "/");
    }

    #[test]
    fn joining() {
        assert_eq!(join(walk_root("/"), "."), "/");
        assert_eq!(join(walk_root("/"), "g"), "/g");
        assert_eq!(join(walk_root("."), "g/d"), "/g/d");
        assert_eq!(join(walk_root("/g/"), "."), "/g");
        assert_eq!(join(walk_root("/g/"), "d"), "/g/d");
        assert_eq!(join("/", "attr"), "/attr");
        assert_eq!(join("/g/d", "attr"), "/g/d/attr");
    }
}
