//! Namespace path algebra.
//!
//! Paths are immutable string-backed values over the coordination service's
//! hierarchical namespace. Construction compresses repeated and trailing
//! separators; resolution and normalization are separate, explicit steps so
//! callers decide when `.`/`..` segments are collapsed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An absolute or relative path in the coordination namespace.
///
/// The raw string is compressed at construction: runs of `/` collapse to a
/// single separator and a trailing `/` is dropped (the root `/` itself is
/// preserved). `NodePath` never touches the network; it is rebuilt from a
/// string at every command invocation and only ever replaced, not mutated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NodePath {
    raw: String,
}

impl NodePath {
    /// Builds a path from a string, compressing redundant separators.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: compress(&raw.into()),
        }
    }

    /// The root path `/`.
    pub fn root() -> Self {
        Self { raw: "/".to_string() }
    }

    /// The compressed string form.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this path starts at the namespace root.
    pub fn is_absolute(&self) -> bool {
        self.raw.starts_with('/')
    }

    /// Whether this is the empty path.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Splits the path into its parts.
    ///
    /// The empty path has zero parts. The root path has exactly one part,
    /// the empty string, which acts as the absolute-root sentinel: any
    /// absolute path's first part is `""`.
    pub fn parts(&self) -> Vec<&str> {
        if self.raw.is_empty() {
            Vec::new()
        } else if self.raw == "/" {
            vec![""]
        } else {
            self.raw.split('/').collect()
        }
    }

    /// The last component of the path, `""` for the root and empty paths.
    pub fn name(&self) -> &str {
        self.raw.rsplit('/').next().unwrap_or("")
    }

    /// Resolves `rel` against this path.
    ///
    /// An empty `rel` yields this path; an absolute `rel` is returned
    /// verbatim; otherwise the two are joined with a separator (or `rel`
    /// alone when this path is empty). No `.`/`..` collapsing happens here.
    pub fn resolve(&self, rel: &NodePath) -> NodePath {
        if rel.is_empty() {
            self.clone()
        } else if rel.is_absolute() {
            rel.clone()
        } else if self.is_empty() {
            rel.clone()
        } else {
            NodePath::new(format!("{}/{}", self.raw, rel.raw))
        }
    }

    /// Appends a single child name.
    pub fn child(&self, name: &str) -> NodePath {
        self.resolve(&NodePath::new(name))
    }

    /// Collapses `.` and `..` segments.
    ///
    /// Parts are folded left-to-right over a stack: `.` is dropped; `..`
    /// pops the previous part unless there is nothing to pop, the path is
    /// already climbing (`..` on top), or the top is the absolute-root
    /// sentinel, where `..` is ignored. A relative path can therefore keep
    /// leading `..` parts, while an absolute path never climbs above `/`.
    pub fn normalize(&self) -> NodePath {
        let mut stack: Vec<&str> = Vec::new();
        for part in self.parts() {
            match part {
                "." => {}
                ".." => match stack.last() {
                    Some(&"") => {}
                    Some(&"..") | None => stack.push(".."),
                    Some(_) => {
                        stack.pop();
                    }
                },
                other => stack.push(other),
            }
        }
        NodePath::from_parts(&stack)
    }

    /// The parent path, or `None` at the root, a bare name, or the empty path.
    pub fn parent(&self) -> Option<NodePath> {
        let parts = self.parts();
        if parts.len() <= 1 {
            None
        } else {
            Some(NodePath::from_parts(&parts[..parts.len() - 1]))
        }
    }

    fn from_parts(parts: &[&str]) -> NodePath {
        let raw = match parts {
            [] => String::new(),
            [""] => "/".to_string(),
            _ => parts.join("/"),
        };
        NodePath { raw }
    }
}

fn compress(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_slash = false;
    for ch in s.chars() {
        if ch == '/' {
            if !prev_slash {
                out.push('/');
            }
            prev_slash = true;
        } else {
            out.push(ch);
            prev_slash = false;
        }
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for NodePath {
    fn from(raw: String) -> Self {
        NodePath::new(raw)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.raw
    }
}

impl From<&str> for NodePath {
    fn from(raw: &str) -> Self {
        NodePath::new(raw)
    }
}
