//! Directories: interior nodes of the tree.
//!
//! A directory owns its pages and subdirectories through two name-keyed,
//! insertion-ordered mappings. Page names and directory names are separate
//! namespaces, so `blog` can name both a page and a subdirectory of the same
//! directory.

use std::collections::HashMap;
use std::sync::Arc;

use crate::component::{Component, Components};
use crate::data::Data;
use crate::location::{Dest, Src, StaticFile};
use crate::node::NodeCore;
use crate::tree::{DirId, PageId};

/// Name-keyed mapping that remembers insertion order.
///
/// Replacing an existing name keeps its original position.
#[derive(Clone, Debug)]
pub(crate) struct NamedEntries<Id> {
    order: Vec<String>,
    index: HashMap<String, Id>,
}

impl<Id> Default for NamedEntries<Id> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<Id: Copy> NamedEntries<Id> {
    pub(crate) fn get(&self, name: &str) -> Option<Id> {
        self.index.get(name).copied()
    }

    /// Insert or replace, returning the replaced id.
    pub(crate) fn insert(&mut self, name: &str, id: Id) -> Option<Id> {
        let previous = self.index.insert(name.to_owned(), id);
        if previous.is_none() {
            self.order.push(name.to_owned());
        }
        previous
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Id> {
        let id = self.index.remove(name)?;
        self.order.retain(|entry| entry != name);
        Some(id)
    }

    /// Id at insertion position `pos`.
    pub(crate) fn id_at(&self, pos: usize) -> Option<Id> {
        self.order.get(pos).and_then(|name| self.get(name))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, Id)> + '_ {
        self.order
            .iter()
            .filter_map(|name| Some((name.as_str(), self.get(name)?)))
    }

    pub(crate) fn ids(&self) -> Vec<Id> {
        self.iter().map(|(_, id)| id).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

/// Interior node: pages, subdirectories, static files and components.
#[derive(Debug, Default)]
pub struct Directory {
    pub(crate) core: NodeCore,
    pub(crate) pages: NamedEntries<PageId>,
    pub(crate) dirs: NamedEntries<DirId>,
    pub(crate) static_files: Vec<StaticFile>,
    pub(crate) components: Components,
}

impl Directory {
    pub(crate) fn new(src: Src, dest: Dest, data: Data) -> Self {
        Self {
            core: NodeCore::new(src, dest, data),
            ..Default::default()
        }
    }

    /// Source descriptor.
    #[must_use]
    pub fn src(&self) -> &Src {
        &self.core.src
    }

    /// Destination descriptor.
    #[must_use]
    pub fn dest(&self) -> &Dest {
        &self.core.dest
    }

    /// Parent directory, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<DirId> {
        self.core.parent
    }

    /// Own (unmerged) data.
    #[must_use]
    pub fn data(&self) -> &Data {
        self.core.data()
    }

    /// Own pages in insertion order.
    pub fn pages(&self) -> impl Iterator<Item = (&str, PageId)> + '_ {
        self.pages.iter()
    }

    /// Own subdirectories in insertion order.
    pub fn directories(&self) -> impl Iterator<Item = (&str, DirId)> + '_ {
        self.dirs.iter()
    }

    /// Own static files in insertion order.
    #[must_use]
    pub fn static_files(&self) -> &[StaticFile] {
        &self.static_files
    }

    /// Own component registry, without ancestors.
    #[must_use]
    pub fn components(&self) -> &Components {
        &self.components
    }

    /// Check if there are no pages, subdirectories or static files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.len() == 0 && self.dirs.len() == 0 && self.static_files.is_empty()
    }

    /// Register a static file; an entry with the same `src` is replaced in place.
    pub(crate) fn set_static_file(&mut self, file: StaticFile) {
        match self.static_files.iter_mut().find(|f| f.src == file.src) {
            Some(existing) => *existing = file,
            None => self.static_files.push(file),
        }
    }

    pub(crate) fn unset_static_file(&mut self, src: &str) -> Option<StaticFile> {
        let pos = self.static_files.iter().position(|f| f.src == src)?;
        Some(self.static_files.remove(pos))
    }

    pub(crate) fn set_component(&mut self, component: Component) -> Option<Arc<Component>> {
        self.components
            .insert(component.name().to_owned(), Arc::new(component))
    }
}
