//! Resolving object references to path names.
//!
//! A reference carries no path of its own. It is resolved by walking every
//! group, dataset and named type reachable from the root, creating a fresh
//! reference at each path and comparing. The walk always runs to the end,
//! so when an object is reachable under several paths the one visited last
//! is reported.

use std::collections::HashMap;

use hltree_format::{EntryKind, File, ObjectId, ObjectKind, ObjectReference};

use crate::error::Result;
use crate::probe;

/// Name reported for references that match no object.
pub const UNRESOLVED: &str = "UNKNOWN";

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Depth-first walk in name order. An object reachable by several links is
/// visited under each path; a group already on the current descent path is
/// not entered again.
fn visit_candidates(
    file: &File,
    group: &str,
    stack: &mut Vec<ObjectId>,
    visit: &mut dyn FnMut(&str, ObjectReference),
) -> Result<()> {
    for entry in file.children(group)? {
        let EntryKind::Object { kind, id } = entry.kind else {
            continue;
        };
        let path = child_path(group, &entry.name);
        visit(&path, file.create_reference(&path)?);
        if kind == ObjectKind::Group && !stack.contains(&id) {
            stack.push(id);
            visit_candidates(file, &path, stack, visit)?;
            stack.pop();
        }
    }
    Ok(())
}

fn walk(file: &File, visit: &mut dyn FnMut(&str, ObjectReference)) -> Result<()> {
    let root = file.open_group("/")?;
    visit_candidates(file, "/", &mut vec![root], visit)
}

/// Path of the object `target` points at, if any.
pub fn resolve_reference(file: &File, target: &ObjectReference) -> Option<String> {
    let mut found = None;
    let walked = walk(file, &mut |path, candidate| {
        if probe::same_reference(&candidate, target) {
            found = Some(path.to_string());
        }
    });
    if let Err(e) = walked {
        tracing::warn!(error = %e, "reference walk failed");
        return None;
    }
    found
}

/// Reference-to-path map built by one walk.
///
/// Lookups give the same answers as [`resolve_reference`].
#[derive(Debug, Default)]
pub struct PathIndex {
    paths: HashMap<ObjectReference, String>,
}

impl PathIndex {
    pub fn build(file: &File) -> Result<Self> {
        let mut paths = HashMap::new();
        walk(file, &mut |path, candidate| {
            paths.insert(candidate, path.to_string());
        })?;
        tracing::debug!(entries = paths.len(), "built reference path index");
        Ok(PathIndex { paths })
    }

    pub fn resolve(&self, target: &ObjectReference) -> Option<&str> {
        self.paths.get(target).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
