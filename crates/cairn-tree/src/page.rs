//! Pages: leaf content units of the tree.

use std::fmt::Display;
use std::sync::Arc;

use crate::content::{Content, RawContent};
use crate::data::{Data, keys};
use crate::date::split_date_prefix;
use crate::document::Document;
use crate::location::{Dest, DestUpdate, Src, UrlStyle, basename, dirname, join, normalize};
use crate::merge::cascade_base;
use crate::node::NodeCore;
use crate::tree::{DirId, Directories};

/// A leaf content unit.
///
/// A page owns its source and destination descriptors, its own data, its
/// content and an internal data bag reserved for plugins. It belongs to at
/// most one directory; pages built with [`Page::create`] start detached.
#[derive(Debug, Default)]
pub struct Page {
    pub(crate) core: NodeCore,
    content: Content,
    internal: Data,
}

impl Page {
    /// Create a page from a walker-supplied source and loader-supplied data.
    ///
    /// A `YYYY-MM-DD_` prefix on the file name is stripped from the
    /// destination and stored as `date` unless the data already has one.
    #[must_use]
    pub fn from_source(src: Src, mut data: Data) -> Self {
        let name = basename(&src.path);
        let dest_name = match split_date_prefix(name) {
            Some((date, rest)) => {
                if !data.contains_key(keys::DATE) {
                    data.insert(keys::DATE, date);
                }
                rest
            }
            None => name,
        };
        let dest = Dest {
            path: normalize(&join(dirname(&src.path), dest_name)),
            ext: src.ext.clone(),
            hash: None,
        };

        Self {
            core: NodeCore::new(src, dest, data),
            ..Default::default()
        }
    }

    /// Create a page without a source file.
    ///
    /// The destination is derived from `url` (`/a/` becomes `/a/index.html`,
    /// `/feed.xml` becomes `/feed` + `.xml`) and the URL is then recomputed by
    /// [`update_dest`](Self::update_dest), the same way as for pages read from
    /// disk.
    #[must_use]
    pub fn create(url: &str, content: impl Into<RawContent>) -> Self {
        let (path, ext) = split_url(url);
        let mut data = Data::new();
        data.insert(keys::URL, url);

        let mut page = Self {
            core: NodeCore::new(Src::default(), Dest { path, ext, hash: None }, data),
            ..Default::default()
        };
        page.set_content(content);
        page.update_dest(DestUpdate::default(), UrlStyle::Literal);
        page
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

    /// Parent directory, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<DirId> {
        self.core.parent
    }

    /// Own (unmerged) data.
    #[must_use]
    pub fn data(&self) -> &Data {
        self.core.data()
    }

    /// Replace own data, dropping the effective-data cache.
    pub fn set_data(&mut self, data: Data) {
        self.core.set_data(data);
    }

    /// Edit own data in place, dropping the effective-data cache.
    pub fn data_mut(&mut self) -> &mut Data {
        self.core.data_mut()
    }

    /// Effective data: parent directories cascaded with own data.
    #[must_use]
    pub fn effective_data(&self, dirs: &Directories) -> Arc<Data> {
        self.core.effective(|| match self.core.parent {
            Some(parent) => dirs.effective_data(parent),
            None => cascade_base(),
        })
    }

    /// Drop the effective-data cache. Returns `true` if it held a value.
    pub fn refresh_cache(&mut self) -> bool {
        self.core.invalidate()
    }

    /// Plugin-only data, never part of the cascade.
    #[must_use]
    pub fn internal(&self) -> &Data {
        &self.internal
    }

    /// Mutable plugin-only data.
    pub fn internal_mut(&mut self) -> &mut Data {
        &mut self.internal
    }

    /// Merge `update` into the destination and derive `url`.
    ///
    /// The path is [normalized](crate::normalize) first, so `/a/./b` and
    /// `/a/b` name the same destination.
    ///
    /// - `.html` with basename `index`: the directory URL (`/a/index` → `/a/`)
    /// - [`UrlStyle::NoHtmlExtension`] on other `.html` pages: path only
    /// - otherwise: path followed by extension
    ///
    /// Calling it again with the same arguments changes nothing.
    pub fn update_dest(&mut self, update: DestUpdate, style: UrlStyle) {
        if let Some(path) = update.path {
            self.core.dest.path = path;
        }
        self.core.dest.path = normalize(&self.core.dest.path);
        if let Some(ext) = update.ext {
            self.core.dest.ext = ext;
        }

        let url = derive_url(&self.core.dest, style);
        if self.core.data().url() != Some(url.as_str()) {
            self.core.data_mut().insert(keys::URL, url);
        }
    }

    /// Raw content, serializing a document-only page on first read.
    pub fn content(&mut self) -> Option<&RawContent> {
        self.content.raw()
    }

    /// Raw content without memoizing, for readers holding `&Page`.
    #[must_use]
    pub fn content_snapshot(&self) -> Option<RawContent> {
        self.content.snapshot()
    }

    /// Replace the content, dropping any parsed document.
    pub fn set_content(&mut self, content: impl Into<RawContent>) {
        self.content.set_raw(content.into());
    }

    /// Parsed HTML document.
    ///
    /// Only pages whose destination extension is `.html` or `.htm` parse their
    /// raw content; for others this is `None` unless a document was set.
    pub fn document(&mut self) -> Option<&Document> {
        let parse = self.is_html();
        self.content.document(parse)
    }

    /// Mutable parsed document. Edits show up in the next
    /// [`content`](Self::content) read.
    pub fn document_mut(&mut self) -> Option<&mut Document> {
        let parse = self.is_html();
        self.content.document_mut(parse)
    }

    /// Replace the content with a document, dropping any raw content.
    pub fn set_document(&mut self, document: Document) {
        self.content.set_document(document);
    }

    /// Hash of the current content.
    #[must_use]
    pub fn content_hash(&self) -> Option<String> {
        self.content.snapshot().map(|raw| raw.hash())
    }

    /// Check if the last written hash matches the current content.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        match (&self.core.dest.hash, self.content_hash()) {
            (Some(written), Some(current)) => *written == current,
            _ => false,
        }
    }

    /// Record the hash of content the writer has just materialized.
    pub fn mark_written(&mut self, hash: impl Into<String>) {
        self.core.dest.hash = Some(hash.into());
    }

    /// Copy this page for an extra output (pagination, locale variants).
    ///
    /// The copy keeps the parent and destination, gets this page's effective
    /// data (minus `page`) overlaid with `data` as its own data, and a source
    /// path suffixed with `[index]` so it tracks separately. The destination
    /// hash is not copied.
    #[must_use]
    pub fn duplicate(&self, dirs: &Directories, index: impl Display, data: &Data) -> Self {
        let mut own = (*self.effective_data(dirs)).clone();
        own.remove(keys::PAGE);
        own.overlay(data);

        let mut src = self.core.src.clone();
        src.path = format!("{}[{index}]", src.path);

        let dest = Dest {
            hash: None,
            ..self.core.dest.clone()
        };

        let mut core = NodeCore::new(src, dest, own);
        core.parent = self.core.parent;
        Self {
            core,
            content: self.content.clone(),
            internal: Data::new(),
        }
    }

    /// Attach to `parent`, rebasing the destination onto `parent_dest`.
    pub(crate) fn reparent(&mut self, parent: DirId, parent_dest: &str) {
        self.core.parent = Some(parent);
        self.core.dest.path = join(parent_dest, basename(&self.core.dest.path));
        self.core.invalidate();
    }

    fn is_html(&self) -> bool {
        matches!(self.core.dest.ext.as_str(), ".html" | ".htm")
    }
}

fn derive_url(dest: &Dest, style: UrlStyle) -> String {
    let is_html = dest.ext == ".html";
    if is_html && basename(&dest.path) == "index" {
        return format!("{}/", dirname(&dest.path));
    }
    if is_html && style == UrlStyle::NoHtmlExtension {
        return dest.path.clone();
    }
    format!("{}{}", dest.path, dest.ext)
}

fn split_url(url: &str) -> (String, String) {
    if url.ends_with('/') {
        return (format!("{url}index"), ".html".to_owned());
    }
    let name = basename(url);
    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let cut = url.len() - (name.len() - dot);
            (url[..cut].to_owned(), url[cut..].to_owned())
        }
        _ => (url.to_owned(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use chrono::NaiveDate;

    #[test]
    fn test_update_dest_index_url_idempotent() {
        let mut page = Page::default();
        page.update_dest(DestUpdate::new("/a/index", ".html"), UrlStyle::Literal);
        assert_eq!(page.data().url(), Some("/a/"));
        page.update_dest(DestUpdate::new("/a/index", ".html"), UrlStyle::Literal);
        assert_eq!(page.data().url(), Some("/a/"));
        assert_eq!(page.dest().path, "/a/index");
        assert_eq!(page.dest().ext, ".html");
    }

    #[test]
    fn test_update_dest_root_index() {
        let mut page = Page::default();
        page.update_dest(DestUpdate::new("/index", ".html"), UrlStyle::NoHtmlExtension);
        assert_eq!(page.data().url(), Some("/"));
    }

    #[test]
    fn test_update_dest_no_html_extension() {
        let mut page = Page::default();
        page.update_dest(DestUpdate::new("/about", ".html"), UrlStyle::NoHtmlExtension);
        assert_eq!(page.data().url(), Some("/about"));
    }

    #[test]
    fn test_update_dest_no_html_extension_keeps_other_extensions() {
        let mut page = Page::default();
        page.update_dest(DestUpdate::new("/feed", ".xml"), UrlStyle::NoHtmlExtension);
        assert_eq!(page.data().url(), Some("/feed.xml"));
    }

    #[test]
    fn test_update_dest_literal() {
        let mut page = Page::default();
        page.update_dest(DestUpdate::new("/about", ".html"), UrlStyle::Literal);
        assert_eq!(page.data().url(), Some("/about.html"));
    }

    #[test]
    fn test_update_dest_partial() {
        let mut page = Page::default();
        page.update_dest(DestUpdate::new("/post", ".md"), UrlStyle::Literal);
        page.update_dest(DestUpdate::ext(".html"), UrlStyle::Literal);
        assert_eq!(page.dest().path, "/post");
        assert_eq!(page.data().url(), Some("/post.html"));
    }

    #[test]
    fn test_create_directory_url() {
        let page = Page::create("/a/", "<p>x</p>");
        assert!(page.src().is_virtual());
        assert_eq!(page.dest().path, "/a/index");
        assert_eq!(page.dest().ext, ".html");
        assert_eq!(page.data().url(), Some("/a/"));
        assert!(page.parent().is_none());
    }

    #[test]
    fn test_create_with_extension() {
        let page = Page::create("/feed.xml", "<rss/>");
        assert_eq!(page.dest().path, "/feed");
        assert_eq!(page.dest().ext, ".xml");
        assert_eq!(page.data().url(), Some("/feed.xml"));
    }

    #[test]
    fn test_create_without_extension() {
        let page = Page::create("/robots", "User-agent: *");
        assert_eq!(page.dest().path, "/robots");
        assert_eq!(page.dest().ext, "");
        assert_eq!(page.data().url(), Some("/robots"));
    }

    #[test]
    fn test_create_dotfile_has_no_extension() {
        let page = Page::create("/.nojekyll", "");
        assert_eq!(page.dest().path, "/.nojekyll");
        assert_eq!(page.dest().ext, "");
    }

    #[test]
    fn test_from_source_strips_date_prefix() {
        let page = Page::from_source(Src::new("/blog/2020-06-21_hello", ".md"), Data::new());
        assert_eq!(page.dest().path, "/blog/hello");
        assert_eq!(page.dest().ext, ".md");
        assert_eq!(page.src().path, "/blog/2020-06-21_hello");
        let expected = NaiveDate::from_ymd_opt(2020, 6, 21)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(page.data().date(), Some(expected));
    }

    #[test]
    fn test_from_source_keeps_explicit_date() {
        let data: Data = [("date", "2001-01-01")].into_iter().collect();
        let page = Page::from_source(Src::new("/2020-06-21_hello", ".md"), data);
        assert_eq!(page.dest().path, "/hello");
        assert_eq!(page.data()["date"], Value::from("2001-01-01"));
    }

    #[test]
    fn test_content_document_round_trip() {
        let mut page = Page::default();
        page.update_dest(DestUpdate::new("/a", ".html"), UrlStyle::Literal);
        page.set_content("<h1>Title</h1>");
        page.document_mut()
            .unwrap()
            .find_first_mut("h1")
            .unwrap()
            .set_text("Changed");
        assert_eq!(
            page.content().and_then(RawContent::as_text),
            Some("<h1>Changed</h1>")
        );
    }

    #[test]
    fn test_update_dest_normalizes_path() {
        let mut dotted = Page::default();
        dotted.update_dest(DestUpdate::new("/a/./b", ".html"), UrlStyle::Literal);
        let mut parent = Page::default();
        parent.update_dest(DestUpdate::new("/a/../a/b", ".html"), UrlStyle::Literal);
        let mut plain = Page::default();
        plain.update_dest(DestUpdate::new("/a/b", ".html"), UrlStyle::Literal);

        assert_eq!(dotted.dest().path, "/a/b");
        assert_eq!(dotted.data().url(), Some("/a/b.html"));
        assert_eq!(dotted.dest(), plain.dest());
        assert_eq!(parent.dest(), plain.dest());

        let created = Page::create("/x//y/../z.html", "");
        assert_eq!(created.dest().path, "/x/z");
        assert_eq!(created.data().url(), Some("/x/z.html"));
    }

    #[test]
    fn test_script_survives_document_round_trip() {
        let html = "<script>if (a < b && c > 1) { go(); }</script>";
        let mut page = Page::create("/", html);
        assert!(page.document_mut().is_some());
        assert_eq!(page.content().and_then(RawContent::as_text), Some(html));
    }

    #[test]
    fn test_content_not_mirrored_into_data() {
        let page = Page::create("/a.html", "<p>x</p>");
        assert!(!page.data().contains_key("content"));
        assert_eq!(page.data().len(), 1);
    }

    #[test]
    fn test_document_absent_for_non_html() {
        let mut page = Page::create("/styles.css", "body { color: red }");
        assert!(page.document().is_none());
        assert!(page.document_mut().is_none());
        assert_eq!(
            page.content().and_then(RawContent::as_text),
            Some("body { color: red }")
        );
    }

    #[test]
    fn test_freshness() {
        let mut page = Page::create("/a/", "<p>v1</p>");
        assert!(!page.is_fresh());
        let hash = page.content_hash().unwrap();
        page.mark_written(hash);
        assert!(page.is_fresh());
        page.set_content("<p>v2</p>");
        assert!(!page.is_fresh());
    }

    #[test]
    fn test_internal_data_not_in_cascade() {
        let mut page = Page::create("/a/", "");
        page.internal_mut().insert("search_index", true);
        let dirs = Directories::default();
        assert!(!page.effective_data(&dirs).contains_key("search_index"));
        assert_eq!(page.internal()["search_index"], Value::Bool(true));
    }
}
