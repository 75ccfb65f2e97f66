//! Source and destination descriptors.
//!
//! # Path Convention
//!
//! Paths are `/`-separated strings without extension:
//! - `"/"` - root directory destination
//! - `"/blog"` - directory
//! - `"/blog/post"` - page (extension lives in `ext`, e.g. `".html"`)
//!
//! [`Dest::output_path`] turns a destination into a relative filesystem path;
//! that mapping is what writers rely on. Page destinations pass through
//! [`normalize`] first, so two pages share an output path only when their
//! `path + ext` is equal.

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Where a node comes from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Src {
    /// Source path without extension. Empty for pages without a source file.
    pub path: String,
    /// Source extension including the dot (e.g. `".md"`).
    pub ext: String,
    /// Last modification time reported by the walker.
    pub last_modified: Option<SystemTime>,
    /// Creation time reported by the walker.
    pub created: Option<SystemTime>,
    /// Remote origin when the file is fetched rather than read from disk.
    pub remote: Option<String>,
}

impl Src {
    /// Create a source descriptor from path and extension.
    #[must_use]
    pub fn new(path: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ext: ext.into(),
            ..Default::default()
        }
    }

    /// Check if there is no backing source file.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.path.is_empty()
    }
}

/// Where a node is written to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dest {
    /// Output path without extension.
    pub path: String,
    /// Output extension including the dot.
    pub ext: String,
    /// Hash of the last written content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Dest {
    /// Relative filesystem path for `path + ext`.
    ///
    /// Empty, `.` and `..` segments are dropped so the result never escapes
    /// the output directory.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        safe_relative_path(&format!("{}{}", self.path, self.ext))
    }
}

/// Partial destination update for [`Page::update_dest`](crate::Page::update_dest).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DestUpdate {
    /// New path, if changing.
    pub path: Option<String>,
    /// New extension, if changing.
    pub ext: Option<String>,
}

impl DestUpdate {
    /// Update both path and extension.
    #[must_use]
    pub fn new(path: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ext: Some(ext.into()),
        }
    }

    /// Update only the path.
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ext: None,
        }
    }

    /// Update only the extension.
    #[must_use]
    pub fn ext(ext: impl Into<String>) -> Self {
        Self {
            path: None,
            ext: Some(ext.into()),
        }
    }
}

/// How page URLs are derived from destinations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrlStyle {
    /// URL is `path + ext`.
    #[default]
    Literal,
    /// HTML pages drop their `.html` extension.
    NoHtmlExtension,
}

/// Copy-only asset registered on a directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticFile {
    /// Source path, with extension.
    pub src: String,
    /// Destination path, with extension.
    pub dest: String,
}

impl StaticFile {
    /// Create a static file descriptor.
    #[must_use]
    pub fn new(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
        }
    }

    /// Relative filesystem path for the destination.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        safe_relative_path(&self.dest)
    }
}

/// Join a `/`-separated base path and a name.
#[must_use]
pub fn join(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if name.is_empty() {
        return if base.is_empty() { "/".to_owned() } else { base.to_owned() };
    }
    format!("{base}/{name}")
}

/// Last segment of a `/`-separated path.
#[must_use]
pub fn basename(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Everything before the last segment of a `/`-separated path.
#[must_use]
pub fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Resolve empty, `.` and `..` segments of a `/`-separated path.
///
/// The result is absolute. `..` never climbs above the root. An empty input
/// stays empty.
#[must_use]
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

fn safe_relative_path(path: &str) -> PathBuf {
    path.split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect()
}
