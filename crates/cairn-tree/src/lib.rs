//! Content tree for the cairn static site builder.
//!
//! This crate provides:
//! - [`ContentTree`]: arena of [`Directory`] and [`Page`] nodes with stable ids
//! - Data cascade: a node's effective [`Data`] is its parent's merged with its
//!   own, with per-key [`MergeStrategy`] declared under `mergedKeys`
//! - URL derivation from destinations ([`Page::update_dest`])
//! - Page content as raw text/bytes or a parsed HTML [`Document`]
//! - Per-directory [`Component`] registries and static files
//!
//! Loading files, rendering templates and writing output are the caller's
//! business; this crate only models the tree in between.
//!
//! # Quick Start
//!
//! ```
//! use cairn_tree::{ContentTree, Data, Page, Src};
//!
//! let mut tree = ContentTree::new();
//! let root = tree.root();
//! tree.set_directory_data(root, Data::from_json_str(r#"{"tags": ["site"]}"#).unwrap());
//!
//! let blog = tree.ensure_directory("blog");
//! let data = Data::from_json_str(r#"{"tags": ["rust"]}"#).unwrap();
//! let post = Page::from_source(Src::new("/blog/2024-05-01_hello", ".md"), data);
//! let id = tree.set_page(blog, "hello", post).unwrap();
//!
//! let effective = tree.page_data(id).unwrap();
//! assert_eq!(effective.tags(), vec!["site", "rust"]);
//! assert_eq!(tree.page(id).unwrap().dest().path, "/blog/hello");
//! ```

mod component;
mod content;
mod data;
mod date;
mod directory;
pub mod document;
mod location;
mod merge;
mod node;
mod page;
mod tree;
mod value;

pub use component::{BoxError, Component, ComponentError, ComponentRender, Components};
pub use content::{Content, RawContent};
pub use data::{Data, DataError, keys};
pub use date::split_date_prefix;
pub use directory::Directory;
pub use document::{DocNode, Document, DocumentError, Element};
pub use location::{
    Dest, DestUpdate, Src, StaticFile, UrlStyle, basename, dirname, join, normalize,
};
pub use merge::{MergeKeys, MergeStrategy, cascade};
pub use page::Page;
pub use tree::{
    ContentTree, DirId, DirIter, Directories, PageId, PageIter, Pages, StaticFileIter,
    TreeOptions,
};
pub use value::{Map, Opaque, Value};
