//! Content tree arena.
//!
//! Pages and directories live in two flat arenas addressed by [`PageId`] and
//! [`DirId`]. A node's parent is an id (a non-owning back-reference); the
//! parent owns the child through its name-keyed mapping. Ids stay valid until
//! the node is removed and are never reused.
//!
//! # Phases
//!
//! Structural writes take `&mut ContentTree`, reads take `&ContentTree`, so
//! the borrow checker keeps mutation out of read phases. During rendering,
//! [`ContentTree::render_split`] hands out the directories for reading and the
//! pages for writing, which lets each page be processed on its own thread:
//!
//! ```
//! use cairn_tree::{ContentTree, Page};
//! use rayon::prelude::*;
//!
//! let mut tree = ContentTree::new();
//! let root = tree.root();
//! tree.set_page(root, "index", Page::create("/", "<p>hi</p>"));
//!
//! let (dirs, pages) = tree.render_split();
//! pages.par_iter_mut().for_each(|(_, page)| {
//!     let layout = page.effective_data(dirs).layout().unwrap_or("base.vto").to_owned();
//!     page.internal_mut().insert("layout", layout);
//! });
//! ```

use std::fmt::Display;
use std::sync::Arc;

use rayon::prelude::*;

use crate::component::{Component, Components};
use crate::data::{Data, keys};
use crate::date::split_date_prefix;
use crate::directory::Directory;
use crate::location::{Dest, DestUpdate, Src, StaticFile, UrlStyle, join, normalize};
use crate::merge::cascade_base;
use crate::page::Page;

/// Handle of a page in a [`ContentTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(usize);

/// Handle of a directory in a [`ContentTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirId(usize);

/// Directory arena.
#[derive(Debug, Default)]
pub struct Directories {
    slots: Vec<Option<Directory>>,
}

impl Directories {
    /// Directory by id.
    #[must_use]
    pub fn get(&self, id: DirId) -> Option<&Directory> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Effective data of a directory; the cascade base for unknown ids.
    #[must_use]
    pub fn effective_data(&self, id: DirId) -> Arc<Data> {
        let Some(dir) = self.get(id) else {
            return cascade_base();
        };
        dir.core.effective(|| match dir.core.parent {
            Some(parent) => self.effective_data(parent),
            None => cascade_base(),
        })
    }

    /// Number of live directories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Check if there are no live directories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_mut(&mut self, id: DirId) -> Option<&mut Directory> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    fn insert(&mut self, dir: Directory) -> DirId {
        self.slots.push(Some(dir));
        DirId(self.slots.len() - 1)
    }

    fn remove(&mut self, id: DirId) -> Option<Directory> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }
}

/// Page arena.
#[derive(Debug, Default)]
pub struct Pages {
    slots: Vec<Option<Page>>,
}

impl Pages {
    /// Page by id.
    #[must_use]
    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable page by id.
    pub fn get_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Iterate live pages in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (PageId, &Page)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|page| (PageId(i), page)))
    }

    /// Iterate live pages in parallel, each with exclusive access.
    pub fn par_iter_mut(&mut self) -> impl ParallelIterator<Item = (PageId, &mut Page)> + '_ {
        self.slots
            .par_iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|page| (PageId(i), page)))
    }

    /// Number of live pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Check if there are no live pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, page: Page) -> PageId {
        self.slots.push(Some(page));
        PageId(self.slots.len() - 1)
    }

    fn remove(&mut self, id: PageId) -> Option<Page> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }
}

/// Options for a new tree.
#[derive(Clone, Debug, Default)]
pub struct TreeOptions {
    /// How page URLs are derived.
    pub url_style: UrlStyle,
    /// Own data of the root directory.
    pub root_data: Data,
}

/// Hierarchy of directories and pages with cascading data.
#[derive(Debug)]
pub struct ContentTree {
    dirs: Directories,
    pages: Pages,
    root: DirId,
    url_style: UrlStyle,
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::with_options(TreeOptions::default())
    }
}

impl ContentTree {
    /// Create a tree with an empty root directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree from options.
    #[must_use]
    pub fn with_options(options: TreeOptions) -> Self {
        let mut dirs = Directories::default();
        let root = dirs.insert(Directory::new(
            Src::new("/", ""),
            Dest {
                path: "/".to_owned(),
                ..Default::default()
            },
            options.root_data,
        ));
        Self {
            dirs,
            pages: Pages::default(),
            root,
            url_style: options.url_style,
        }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> DirId {
        self.root
    }

    /// URL style applied by [`update_page_dest`](Self::update_page_dest).
    #[must_use]
    pub fn url_style(&self) -> UrlStyle {
        self.url_style
    }

    /// Directory arena.
    #[must_use]
    pub fn directories(&self) -> &Directories {
        &self.dirs
    }

    /// Page arena.
    #[must_use]
    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    /// Directories for reading and pages for writing, for parallel rendering.
    pub fn render_split(&mut self) -> (&Directories, &mut Pages) {
        (&self.dirs, &mut self.pages)
    }

    /// Page by id.
    #[must_use]
    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(id)
    }

    /// Mutable page by id.
    pub fn page_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.pages.get_mut(id)
    }

    /// Directory by id.
    #[must_use]
    pub fn directory(&self, id: DirId) -> Option<&Directory> {
        self.dirs.get(id)
    }

    /// Effective data of a page.
    #[must_use]
    pub fn page_data(&self, id: PageId) -> Option<Arc<Data>> {
        Some(self.pages.get(id)?.effective_data(&self.dirs))
    }

    /// Effective data of a directory.
    #[must_use]
    pub fn directory_data(&self, id: DirId) -> Option<Arc<Data>> {
        self.dirs.get(id)?;
        Some(self.dirs.effective_data(id))
    }

    /// Replace a page's own data. Returns `true` if a cached value was dropped.
    pub fn set_page_data(&mut self, id: PageId, data: Data) -> bool {
        self.pages
            .get_mut(id)
            .is_some_and(|page| page.core.set_data(data))
    }

    /// Replace a directory's own data, invalidating everything below it.
    ///
    /// Returns `true` if the directory's cached value was dropped.
    pub fn set_directory_data(&mut self, id: DirId, data: Data) -> bool {
        let Some(dir) = self.dirs.get_mut(id) else {
            return false;
        };
        let changed = dir.core.set_data(data);
        if changed {
            self.refresh_children(id);
        }
        changed
    }

    /// Drop a page's cached effective data.
    pub fn refresh_page_cache(&mut self, id: PageId) -> bool {
        self.pages.get_mut(id).is_some_and(Page::refresh_cache)
    }

    /// Drop a directory's cached effective data and, if it was cached, that of
    /// everything below it.
    ///
    /// A dirty directory cannot have clean descendants, since computing theirs
    /// computes its own, so the recursion stops there.
    pub fn refresh_cache(&mut self, id: DirId) -> bool {
        let changed = self
            .dirs
            .get_mut(id)
            .is_some_and(|dir| dir.core.invalidate());
        if changed {
            self.refresh_children(id);
        }
        changed
    }

    fn refresh_children(&mut self, id: DirId) {
        let Some(dir) = self.dirs.get(id) else {
            return;
        };
        let page_ids = dir.pages.ids();
        let dir_ids = dir.dirs.ids();

        let mut dropped = 0usize;
        for page_id in page_ids {
            if self.refresh_page_cache(page_id) {
                dropped += 1;
            }
        }
        tracing::debug!(dir = %dir_path(&self.dirs, id), pages = dropped, "Invalidated page caches");

        for dir_id in dir_ids {
            self.refresh_cache(dir_id);
        }
    }

    /// Create a subdirectory, or return the existing one with that name.
    ///
    /// A `YYYY-MM-DD_` prefix on `name` is stripped from the destination and
    /// stored as the directory's `date`. Returns `None` if `parent` is unknown.
    pub fn create_directory(&mut self, parent: DirId, name: &str) -> Option<DirId> {
        let parent_dir = self.dirs.get(parent)?;
        if let Some(existing) = parent_dir.dirs.get(name) {
            return Some(existing);
        }

        let mut data = Data::new();
        let dest_name = match split_date_prefix(name) {
            Some((date, rest)) => {
                data.insert(keys::DATE, date);
                rest
            }
            None => name,
        };
        let src = Src::new(join(&parent_dir.core.src.path, name), "");
        let dest = Dest {
            path: normalize(&join(&parent_dir.core.dest.path, dest_name)),
            ..Default::default()
        };
        tracing::debug!(src = %src.path, dest = %dest.path, "Created directory");

        let mut dir = Directory::new(src, dest, data);
        dir.core.parent = Some(parent);
        let id = self.dirs.insert(dir);
        self.dirs.get_mut(parent)?.dirs.insert(name, id);
        Some(id)
    }

    /// Remove a subdirectory and everything below it.
    pub fn unset_directory(&mut self, parent: DirId, name: &str) -> bool {
        let Some(id) = self
            .dirs
            .get_mut(parent)
            .and_then(|dir| dir.dirs.remove(name))
        else {
            return false;
        };

        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(dir) = self.dirs.remove(id) else {
                continue;
            };
            for (_, page_id) in dir.pages.iter() {
                self.pages.remove(page_id);
            }
            stack.extend(dir.dirs.iter().map(|(_, child)| child));
        }
        tracing::debug!(name, "Removed directory");
        true
    }

    /// Attach a page under `name`, replacing any page already there.
    ///
    /// The page's destination is rebased onto the directory's. A replaced
    /// page keeps its id. Its written hash carries over only when the new
    /// page has none, so a hash the caller already set on the new page wins.
    /// Returns `None` if `dir` is unknown.
    pub fn set_page(&mut self, dir: DirId, name: &str, mut page: Page) -> Option<PageId> {
        let directory = self.dirs.get_mut(dir)?;
        page.reparent(dir, &directory.core.dest.path);

        if let Some(existing) = directory.pages.get(name)
            && let Some(slot) = self.pages.get_mut(existing)
        {
            if page.core.dest.hash.is_none() && slot.core.dest.hash.is_some() {
                page.core.dest.hash = slot.core.dest.hash.take();
                tracing::debug!(name, "Carried over written hash");
            }
            *slot = page;
            tracing::debug!(name, "Replaced page");
            return Some(existing);
        }

        let id = self.pages.insert(page);
        directory.pages.insert(name, id);
        tracing::debug!(name, "Added page");
        Some(id)
    }

    /// Detach and return the page under `name`.
    pub fn unset_page(&mut self, dir: DirId, name: &str) -> Option<Page> {
        let id = self.dirs.get_mut(dir)?.pages.remove(name)?;
        let mut page = self.pages.remove(id)?;
        page.core.parent = None;
        page.refresh_cache();
        tracing::debug!(name, "Removed page");
        Some(page)
    }

    /// Page under `name` in `dir`.
    #[must_use]
    pub fn page_by_name(&self, dir: DirId, name: &str) -> Option<PageId> {
        self.dirs.get(dir)?.pages.get(name)
    }

    /// Subdirectory under `name` in `dir`.
    #[must_use]
    pub fn directory_by_name(&self, dir: DirId, name: &str) -> Option<DirId> {
        self.dirs.get(dir)?.dirs.get(name)
    }

    /// Find a directory by `/`-separated source names relative to the root.
    #[must_use]
    pub fn resolve_directory(&self, path: &str) -> Option<DirId> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.root, |dir, name| self.directory_by_name(dir, name))
    }

    /// Find or create a directory by `/`-separated source names.
    pub fn ensure_directory(&mut self, path: &str) -> DirId {
        let mut current = self.root;
        for name in path.split('/').filter(|segment| !segment.is_empty()) {
            match self.create_directory(current, name) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Register a static file, replacing an entry with the same source.
    pub fn set_static_file(&mut self, dir: DirId, file: StaticFile) -> bool {
        let Some(directory) = self.dirs.get_mut(dir) else {
            return false;
        };
        directory.set_static_file(file);
        true
    }

    /// Remove the static file registered for `src`.
    pub fn unset_static_file(&mut self, dir: DirId, src: &str) -> Option<StaticFile> {
        self.dirs.get_mut(dir)?.unset_static_file(src)
    }

    /// Register a component on a directory, returning the one it replaces.
    pub fn set_component(&mut self, dir: DirId, component: Component) -> Option<Arc<Component>> {
        self.dirs.get_mut(dir)?.set_component(component)
    }

    /// Components visible from `dir`: its own merged over every ancestor's,
    /// nearest name winning. Recomputed on each call.
    #[must_use]
    pub fn get_components(&self, dir: DirId) -> Components {
        let mut chain = Vec::new();
        let mut current = Some(dir);
        while let Some(id) = current {
            let Some(directory) = self.dirs.get(id) else {
                break;
            };
            chain.push(directory);
            current = directory.core.parent;
        }

        let mut components = Components::new();
        for directory in chain.into_iter().rev() {
            components.extend(
                directory
                    .components
                    .iter()
                    .map(|(name, component)| (name.clone(), Arc::clone(component))),
            );
        }
        components
    }

    /// Directories from `dir` down, depth first, in insertion order.
    #[must_use]
    pub fn walk_directories(&self, dir: DirId) -> DirIter<'_> {
        DirIter::new(&self.dirs, dir)
    }

    /// All pages under `dir`: own pages first, then each subdirectory's.
    #[must_use]
    pub fn get_pages(&self, dir: DirId) -> PageIter<'_> {
        PageIter {
            walk: self.walk_directories(dir),
            pages: &self.pages,
            current: None,
        }
    }

    /// All static files under `dir`, in the same order as [`get_pages`](Self::get_pages).
    #[must_use]
    pub fn get_static_files(&self, dir: DirId) -> StaticFileIter<'_> {
        StaticFileIter {
            walk: self.walk_directories(dir),
            current: std::slice::Iter::default(),
        }
    }

    /// Copy a page for an extra output; see [`Page::duplicate`].
    #[must_use]
    pub fn duplicate_page(&self, id: PageId, index: impl Display, data: &Data) -> Option<Page> {
        Some(self.pages.get(id)?.duplicate(&self.dirs, index, data))
    }

    /// Update a page's destination using the tree's URL style.
    pub fn update_page_dest(&mut self, id: PageId, update: DestUpdate) -> bool {
        let style = self.url_style;
        let Some(page) = self.pages.get_mut(id) else {
            return false;
        };
        page.update_dest(update, style);
        true
    }

    /// Record the hash of content the writer has just materialized.
    pub fn mark_written(&mut self, id: PageId, hash: impl Into<String>) -> bool {
        let Some(page) = self.pages.get_mut(id) else {
            return false;
        };
        page.mark_written(hash);
        true
    }

    /// Pages under `dir` whose content differs from what was last written.
    pub fn stale_pages(&self, dir: DirId) -> impl Iterator<Item = (PageId, &Page)> + '_ {
        self.get_pages(dir).filter(|(_, page)| !page.is_fresh())
    }
}

fn dir_path(dirs: &Directories, id: DirId) -> String {
    dirs.get(id)
        .map(|dir| dir.core.src.path.clone())
        .unwrap_or_default()
}

/// Depth-first directory iterator. Cloning restarts nothing; call
/// [`ContentTree::walk_directories`] again for a fresh walk.
#[derive(Clone, Debug)]
pub struct DirIter<'a> {
    dirs: &'a Directories,
    stack: Vec<DirId>,
}

impl<'a> DirIter<'a> {
    fn new(dirs: &'a Directories, start: DirId) -> Self {
        Self {
            dirs,
            stack: vec![start],
        }
    }
}

impl<'a> Iterator for DirIter<'a> {
    type Item = (DirId, &'a Directory);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            let Some(dir) = self.dirs.get(id) else {
                continue;
            };
            let children = dir.dirs.ids();
            self.stack.extend(children.into_iter().rev());
            return Some((id, dir));
        }
    }
}

/// Depth-first page iterator returned by [`ContentTree::get_pages`].
#[derive(Clone, Debug)]
pub struct PageIter<'a> {
    walk: DirIter<'a>,
    pages: &'a Pages,
    current: Option<(&'a Directory, usize)>,
}

impl<'a> Iterator for PageIter<'a> {
    type Item = (PageId, &'a Page);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((dir, pos)) = &mut self.current
                && let Some(id) = dir.pages.id_at(*pos)
            {
                *pos += 1;
                if let Some(page) = self.pages.get(id) {
                    return Some((id, page));
                }
                continue;
            }
            let (_, dir) = self.walk.next()?;
            self.current = Some((dir, 0));
        }
    }
}

/// Depth-first static file iterator returned by [`ContentTree::get_static_files`].
#[derive(Clone, Debug)]
pub struct StaticFileIter<'a> {
    walk: DirIter<'a>,
    current: std::slice::Iter<'a, StaticFile>,
}

impl<'a> Iterator for StaticFileIter<'a> {
    type Item = &'a StaticFile;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(file) = self.current.next() {
                return Some(file);
            }
            let (_, dir) = self.walk.next()?;
            self.current = dir.static_files.iter();
        }
    }
}
