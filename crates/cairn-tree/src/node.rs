//! State shared by pages and directories.
//!
//! Both node kinds own a source, a destination, their own data and a memoized
//! effective-data cache. The cache is an explicit `(value, dirty)` pair:
//!
//! ```text
//!            read (compute)
//!   dirty ───────────────────▶ clean
//!     ▲                          │
//!     └──────────────────────────┘
//!      own-data write / refresh
//! ```
//!
//! Reads go through `&self` and may run concurrently; the cache cell is a
//! read-mostly lock populated by the first reader. Invalidation needs
//! `&mut self`, which is how the tree keeps structural writes out of read
//! phases.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::data::Data;
use crate::location::{Dest, Src};
use crate::merge::cascade;
use crate::tree::DirId;

/// Memoized effective data.
#[derive(Debug)]
struct DataCache {
    value: Arc<Data>,
    dirty: bool,
}

impl Default for DataCache {
    fn default() -> Self {
        Self {
            value: Arc::default(),
            dirty: true,
        }
    }
}

/// Source, destination, data and cache of a single node.
#[derive(Debug, Default)]
pub(crate) struct NodeCore {
    pub(crate) src: Src,
    pub(crate) dest: Dest,
    pub(crate) parent: Option<DirId>,
    data: Arc<Data>,
    cache: RwLock<DataCache>,
}

impl NodeCore {
    pub(crate) fn new(src: Src, dest: Dest, data: Data) -> Self {
        Self {
            src,
            dest,
            parent: None,
            data: Arc::new(data),
            cache: RwLock::default(),
        }
    }

    /// Own (unmerged) data.
    pub(crate) fn data(&self) -> &Data {
        &self.data
    }

    /// Replace own data. Returns whether a populated cache was dropped.
    pub(crate) fn set_data(&mut self, data: Data) -> bool {
        self.data = Arc::new(data);
        self.invalidate()
    }

    /// Edit own data in place; the cache is dropped up front.
    pub(crate) fn data_mut(&mut self) -> &mut Data {
        self.invalidate();
        Arc::make_mut(&mut self.data)
    }

    /// Effective data, computing it from `parent` on a cache miss.
    ///
    /// `parent` is only called when the cache is dirty.
    pub(crate) fn effective(&self, parent: impl FnOnce() -> Arc<Data>) -> Arc<Data> {
        {
            let cache = self.cache.read();
            if !cache.dirty {
                return Arc::clone(&cache.value);
            }
        }

        let computed = Arc::new(cascade(&parent(), &self.data));
        tracing::trace!(src = %self.src.path, "Computed effective data");

        let mut cache = self.cache.write();
        // Another reader may have filled the cache meanwhile; both computed
        // the same value from the same inputs, keep the first.
        if cache.dirty {
            cache.value = computed;
            cache.dirty = false;
        }
        Arc::clone(&cache.value)
    }

    /// Drop the cache. Returns `true` if it was clean.
    pub(crate) fn invalidate(&mut self) -> bool {
        let cache = self.cache.get_mut();
        if cache.dirty {
            return false;
        }
        *cache = DataCache::default();
        true
    }

    /// Check if the cache currently holds a value.
    #[cfg(test)]
    pub(crate) fn is_cached(&self) -> bool {
        !self.cache.read().dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::cascade_base;
    use crate::value::Value;

    fn core(title: &str) -> NodeCore {
        let data: Data = [("title", title)].into_iter().collect();
        NodeCore::new(Src::default(), Dest::default(), data)
    }

    #[test]
    fn test_initially_dirty() {
        let mut node = core("a");
        assert!(!node.is_cached());
        assert!(!node.invalidate(), "dirty cache reports unchanged");
    }

    #[test]
    fn test_read_populates_then_invalidate_reports_changed() {
        let mut node = core("a");
        let effective = node.effective(cascade_base);
        assert_eq!(effective["title"], Value::from("a"));
        assert!(node.is_cached());
        assert!(node.invalidate());
        assert!(!node.invalidate());
    }

    #[test]
    fn test_parent_not_consulted_when_clean() {
        let node = core("a");
        node.effective(cascade_base);
        let effective = node.effective(|| panic!("parent read on a clean cache"));
        assert_eq!(effective["title"], Value::from("a"));
    }

    #[test]
    fn test_set_data_recomputes() {
        let mut node = core("a");
        node.effective(cascade_base);
        assert!(node.set_data([("title", "b")].into_iter().collect()));
        assert_eq!(node.effective(cascade_base)["title"], Value::from("b"));
    }

    #[test]
    fn test_data_mut_invalidates() {
        let mut node = core("a");
        node.effective(cascade_base);
        node.data_mut().insert("title", "c");
        assert!(!node.is_cached());
        assert_eq!(node.effective(cascade_base)["title"], Value::from("c"));
    }
}
