//! Site assembly: ordering, tag index, navigation and listings.
//!
//! Assembly is a pure function of the rendered documents. It never touches the
//! filesystem, so equal inputs always produce an equal [`Site`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use folio_content::{slugify, ContentTree, Document, Rendered, TocEntry};

/// Page size used when none is configured.
pub const DEFAULT_PAGINATE: usize = 10;

/// A document that parsed and rendered successfully.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub document: Document,
    pub rendered: Rendered,
}

/// Which spelling of a tag is displayed when documents disagree on case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagCase {
    /// Spelling from the first document, in content path order
    #[default]
    FirstSeen,
    Lowercase,
}

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub base_url: String,
    pub paginate: usize,
    pub tag_case: TagCase,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            base_url: "/".to_string(),
            paginate: DEFAULT_PAGINATE,
            tag_case: TagCase::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagLink {
    pub name: String,
    /// Absent for draft pages, whose tags have no listing
    pub url: Option<String>,
}

/// One render-ready document with its computed navigation.
#[derive(Debug, Clone)]
pub struct Page {
    pub document: Document,
    pub tree: ContentTree,
    pub toc: Vec<TocEntry>,
    pub url: String,
    /// Artifact path relative to the output root
    pub output_path: PathBuf,
    pub tags: Vec<TagLink>,
    /// Newer neighbour in the global ordering
    pub prev: Option<PageLink>,
    /// Older neighbour in the global ordering
    pub next: Option<PageLink>,
}

impl Page {
    pub fn title(&self) -> String {
        self.document.title()
    }

    pub fn is_draft(&self) -> bool {
        self.document.is_draft()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub title: String,
    pub url: String,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub description: Option<String>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub title: String,
    pub number: usize,
    pub total: usize,
    pub entries: Vec<ListingEntry>,
    pub url: String,
    pub output_path: PathBuf,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagEntry {
    /// Display name
    pub name: String,
    pub slug: String,
    pub url: String,
    /// Document slugs in global order
    pub pages: Vec<String>,
}

/// Tags keyed by their case-folded form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    entries: BTreeMap<String, TagEntry>,
}

impl TagIndex {
    /// Look up a tag in any casing.
    pub fn get(&self, tag: &str) -> Option<&TagEntry> {
        self.entries.get(&fold(tag))
    }

    /// Entries ordered by folded key.
    pub fn iter(&self) -> impl Iterator<Item = &TagEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything needed to write a site.
#[derive(Debug, Clone)]
pub struct Site {
    /// Published pages in global order, then drafts in path order
    pub pages: Vec<Page>,
    pub tags: TagIndex,
    pub listings: Vec<ListingPage>,
    pub tag_listings: Vec<ListingPage>,
    pub tags_url: String,
}

impl Site {
    /// Slugs of published pages, newest first.
    pub fn ordering(&self) -> Vec<&str> {
        self.pages
            .iter()
            .filter(|p| !p.is_draft())
            .map(|p| p.document.slug.as_str())
            .collect()
    }

    pub fn page(&self, slug: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.document.slug == slug)
    }
}

pub struct SiteAssembler {
    options: AssembleOptions,
    base_url: String,
}

impl SiteAssembler {
    pub fn new(options: AssembleOptions) -> Self {
        let base_url = normalize_base_url(&options.base_url);
        Self { options, base_url }
    }

    /// Fold rendered documents into a site. Slugs must already be unique.
    pub fn assemble(&self, mut documents: Vec<RenderedDocument>) -> Site {
        documents.sort_by(|a, b| a.document.relative_path.cmp(&b.document.relative_path));

        let mut ordering: Vec<usize> = (0..documents.len())
            .filter(|&i| !documents[i].document.is_draft())
            .collect();
        ordering.sort_by(|&a, &b| publish_order(&documents[a].document, &documents[b].document));

        let tags = self.tag_index(&documents, &ordering);

        let links: Vec<PageLink> = documents
            .iter()
            .map(|d| PageLink {
                title: d.document.title(),
                url: self.page_url(&d.document.slug),
            })
            .collect();

        let position: HashMap<usize, usize> = ordering
            .iter()
            .enumerate()
            .map(|(pos, &index)| (index, pos))
            .collect();

        let listing_entries: Vec<ListingEntry> = ordering
            .iter()
            .map(|&i| listing_entry(&documents[i].document, &links[i]))
            .collect();

        let listings = self.paginate("Posts", "", &listing_entries);

        let by_slug: HashMap<&str, &ListingEntry> = ordering
            .iter()
            .zip(&listing_entries)
            .map(|(&i, entry)| (documents[i].document.slug.as_str(), entry))
            .collect();

        let mut tag_listings = Vec::new();
        for tag in tags.iter() {
            let entries: Vec<ListingEntry> = tag
                .pages
                .iter()
                .filter_map(|slug| by_slug.get(slug.as_str()).map(|e| (*e).clone()))
                .collect();
            let title = format!("Tagged \u{201c}{}\u{201d}", tag.name);
            tag_listings.extend(self.paginate(&title, &format!("tags/{}", tag.slug), &entries));
        }

        let mut published: Vec<Option<Page>> = Vec::with_capacity(ordering.len());
        published.resize_with(ordering.len(), || None);
        let mut drafts = Vec::new();

        for (index, doc) in documents.into_iter().enumerate() {
            let (prev, next) = match position.get(&index) {
                Some(&pos) => (
                    pos.checked_sub(1).map(|p| links[ordering[p]].clone()),
                    ordering.get(pos + 1).map(|&n| links[n].clone()),
                ),
                None => (None, None),
            };

            let page = self.page(doc, &tags, prev, next);
            match position.get(&index) {
                Some(&pos) => published[pos] = Some(page),
                None => drafts.push(page),
            }
        }

        let mut pages: Vec<Page> = published.into_iter().flatten().collect();
        pages.extend(drafts);

        Site {
            pages,
            tags,
            listings,
            tag_listings,
            tags_url: join_url(&self.base_url, "tags"),
        }
    }

    fn page(
        &self,
        doc: RenderedDocument,
        tags: &TagIndex,
        prev: Option<PageLink>,
        next: Option<PageLink>,
    ) -> Page {
        let RenderedDocument { document, rendered } = doc;
        let draft = document.is_draft();

        let mut seen = HashSet::new();
        let tag_links = document
            .tags()
            .iter()
            .filter(|t| !fold(t).is_empty() && seen.insert(fold(t)))
            .map(|t| match tags.get(t).filter(|_| !draft) {
                Some(entry) => TagLink {
                    name: entry.name.clone(),
                    url: Some(entry.url.clone()),
                },
                None => TagLink {
                    name: t.trim().to_string(),
                    url: None,
                },
            })
            .collect();

        Page {
            url: self.page_url(&document.slug),
            output_path: PathBuf::from(&document.slug).join("index.html"),
            tree: rendered.tree,
            toc: rendered.toc,
            tags: tag_links,
            prev,
            next,
            document,
        }
    }

    fn tag_index(&self, documents: &[RenderedDocument], ordering: &[usize]) -> TagIndex {
        let mut entries: BTreeMap<String, TagEntry> = BTreeMap::new();
        let mut first_seen: Vec<String> = Vec::new();

        // Canonical names come from content path order
        for doc in documents.iter().filter(|d| !d.document.is_draft()) {
            for tag in doc.document.tags() {
                let key = fold(tag);
                if key.is_empty() {
                    continue;
                }
                if !entries.contains_key(&key) {
                    first_seen.push(key.clone());
                }
                entries.entry(key.clone()).or_insert_with(|| TagEntry {
                    name: match self.options.tag_case {
                        TagCase::FirstSeen => tag.trim().to_string(),
                        TagCase::Lowercase => key,
                    },
                    slug: String::new(),
                    url: String::new(),
                    pages: Vec::new(),
                });
            }
        }

        // Slug suffixes follow the same first-seen order as display names
        let mut used = HashSet::new();
        for key in &first_seen {
            let Some(entry) = entries.get_mut(key) else {
                continue;
            };
            let base = match slugify(key) {
                s if s.is_empty() => "tag".to_string(),
                s => s,
            };
            let mut slug = base.clone();
            let mut n = 1;
            while !used.insert(slug.clone()) {
                slug = format!("{}-{}", base, n);
                n += 1;
            }
            entry.url = join_url(&self.base_url, &format!("tags/{}", slug));
            entry.slug = slug;
        }

        for &i in ordering {
            let document = &documents[i].document;
            let mut seen = HashSet::new();
            for tag in document.tags() {
                let key = fold(tag);
                if !seen.insert(key.clone()) {
                    continue;
                }
                if let Some(entry) = entries.get_mut(&key) {
                    entry.pages.push(document.slug.clone());
                }
            }
        }

        TagIndex { entries }
    }

    fn paginate(&self, title: &str, dir: &str, entries: &[ListingEntry]) -> Vec<ListingPage> {
        let per_page = self.options.paginate.max(1);
        let chunks: Vec<&[ListingEntry]> = if entries.is_empty() {
            vec![entries]
        } else {
            entries.chunks(per_page).collect()
        };
        let total = chunks.len();

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let number = i + 1;
                let (url, output_path) = self.listing_location(dir, number);
                ListingPage {
                    title: title.to_string(),
                    number,
                    total,
                    entries: chunk.to_vec(),
                    url,
                    output_path,
                    prev_url: (number > 1).then(|| self.listing_location(dir, number - 1).0),
                    next_url: (number < total).then(|| self.listing_location(dir, number + 1).0),
                }
            })
            .collect()
    }

    fn listing_location(&self, dir: &str, number: usize) -> (String, PathBuf) {
        let rel = match (dir.is_empty(), number) {
            (_, 1) => dir.to_string(),
            (true, n) => format!("page/{}", n),
            (false, n) => format!("{}/page/{}", dir, n),
        };
        let path = if rel.is_empty() {
            PathBuf::from("index.html")
        } else {
            PathBuf::from(&rel).join("index.html")
        };
        (join_url(&self.base_url, &rel), path)
    }

    fn page_url(&self, slug: &str) -> String {
        join_url(&self.base_url, slug)
    }
}

/// Date descending, undated last, then slug ascending.
fn publish_order(a: &Document, b: &Document) -> Ordering {
    match (a.date(), b.date()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.slug.cmp(&b.slug))
}

fn listing_entry(document: &Document, link: &PageLink) -> ListingEntry {
    ListingEntry {
        title: link.title.clone(),
        url: link.url.clone(),
        date: document.date().map(|d| d.format("%Y-%m-%d").to_string()),
        description: document.description().map(str::to_string),
    }
}

fn fold(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Ensure the base URL starts and ends with `/` unless it is absolute.
pub fn normalize_base_url(base: &str) -> String {
    let trimmed = base.trim();
    let mut url = if trimmed.contains("://") || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

fn join_url(base: &str, rel: &str) -> String {
    if rel.is_empty() {
        base.to_string()
    } else {
        format!("{}{}/", base, rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(relative: &str, raw: &str) -> RenderedDocument {
        let document = Document::parse(PathBuf::from(relative), PathBuf::from(relative), raw).unwrap();
        let rendered = document.render().unwrap();
        RenderedDocument { document, rendered }
    }

    fn dated(relative: &str, date: &str, tags: &str) -> RenderedDocument {
        doc(
            relative,
            &format!("---\ndate: {}\ntags: [{}]\n---\nbody\n", date, tags),
        )
    }

    fn assembler(paginate: usize) -> SiteAssembler {
        SiteAssembler::new(AssembleOptions {
            paginate,
            ..Default::default()
        })
    }

    #[test]
    fn orders_by_date_then_slug_with_undated_last() {
        let site = assembler(10).assemble(vec![
            doc("undated.md", "no date\n"),
            dated("b.md", "2024-01-01", ""),
            dated("a.md", "2024-01-01", ""),
            dated("newest.md", "2024-06-01", ""),
        ]);

        assert_eq!(site.ordering(), vec!["newest", "a", "b", "undated"]);
    }

    #[test]
    fn links_neighbours_along_the_ordering() {
        let site = assembler(10).assemble(vec![
            dated("old.md", "2023-01-01", ""),
            dated("mid.md", "2023-06-01", ""),
            dated("new.md", "2024-01-01", ""),
        ]);

        let mid = site.page("mid").unwrap();
        assert_eq!(mid.prev.as_ref().map(|l| l.url.as_str()), Some("/new/"));
        assert_eq!(mid.next.as_ref().map(|l| l.url.as_str()), Some("/old/"));

        let newest = site.page("new").unwrap();
        assert!(newest.prev.is_none());
        assert_eq!(newest.next.as_ref().map(|l| l.title.as_str()), Some("Mid"));
    }

    #[test]
    fn tags_fold_case_and_keep_first_seen_spelling() {
        let site = assembler(10).assemble(vec![
            dated("b.md", "2024-02-01", "rust"),
            dated("a.md", "2024-01-01", "Rust, Go"),
        ]);

        let rust = site.tags.get("RUST").unwrap();
        assert_eq!(rust.name, "Rust");
        assert_eq!(rust.slug, "rust");
        assert_eq!(rust.url, "/tags/rust/");
        assert_eq!(rust.pages, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(site.tags.len(), 2);
    }

    #[test]
    fn lowercase_policy_lowercases_names() {
        let site = SiteAssembler::new(AssembleOptions {
            tag_case: TagCase::Lowercase,
            ..Default::default()
        })
        .assemble(vec![dated("a.md", "2024-01-01", "Hugo")]);

        assert_eq!(site.tags.get("hugo").unwrap().name, "hugo");
    }

    #[test]
    fn duplicate_tags_within_a_document_count_once() {
        let site = assembler(10).assemble(vec![dated("a.md", "2024-01-01", "Go, go, GO")]);

        assert_eq!(site.tags.get("go").unwrap().pages, vec!["a".to_string()]);
        assert_eq!(site.page("a").unwrap().tags.len(), 1);
    }

    #[test]
    fn colliding_tag_slugs_are_disambiguated() {
        let site = assembler(10).assemble(vec![dated("a.md", "2024-01-01", "c, c!")]);

        let slugs: Vec<&str> = site.tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["c", "c-1"]);
    }

    #[test]
    fn tag_slug_suffixes_follow_first_seen_order() {
        let site = assembler(10).assemble(vec![
            dated("a.md", "2024-01-01", "c!"),
            dated("b.md", "2024-02-01", "c"),
        ]);

        assert_eq!(site.tags.get("c!").map(|t| t.slug.as_str()), Some("c"));
        assert_eq!(site.tags.get("c").map(|t| t.slug.as_str()), Some("c-1"));
    }

    #[test]
    fn drafts_stand_alone() {
        let site = assembler(10).assemble(vec![
            dated("a.md", "2024-01-01", "go"),
            doc("wip.md", "---\ndraft: true\ntags: [secret]\n---\nwip\n"),
        ]);

        assert_eq!(site.ordering(), vec!["a"]);
        assert!(site.tags.get("secret").is_none());

        let wip = site.page("wip").unwrap();
        assert!(wip.prev.is_none() && wip.next.is_none());
        assert_eq!(
            wip.tags,
            vec![TagLink {
                name: "secret".to_string(),
                url: None
            }]
        );
        assert!(site.listings[0].entries.iter().all(|e| e.url != "/wip/"));
    }

    #[test]
    fn paginates_home_and_tag_listings() {
        let site = assembler(2).assemble(vec![
            dated("a.md", "2024-01-01", "x"),
            dated("b.md", "2024-01-02", "x"),
            dated("c.md", "2024-01-03", "x"),
        ]);

        let paths: Vec<PathBuf> = site.listings.iter().map(|l| l.output_path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("index.html"), PathBuf::from("page/2/index.html")]
        );
        assert_eq!(site.listings[0].next_url.as_deref(), Some("/page/2/"));
        assert_eq!(site.listings[1].prev_url.as_deref(), Some("/"));
        assert_eq!(site.listings[1].entries[0].url, "/a/");

        let tag_paths: Vec<PathBuf> = site
            .tag_listings
            .iter()
            .map(|l| l.output_path.clone())
            .collect();
        assert_eq!(
            tag_paths,
            vec![
                PathBuf::from("tags/x/index.html"),
                PathBuf::from("tags/x/page/2/index.html")
            ]
        );
    }

    #[test]
    fn empty_site_still_has_a_home_listing() {
        let site = assembler(10).assemble(Vec::new());

        assert_eq!(site.listings.len(), 1);
        assert!(site.listings[0].entries.is_empty());
        assert!(site.tag_listings.is_empty());
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(normalize_base_url("blog"), "/blog/");
        assert_eq!(normalize_base_url("/"), "/");
        assert_eq!(
            normalize_base_url("https://example.com"),
            "https://example.com/"
        );

        let site = SiteAssembler::new(AssembleOptions {
            base_url: "/blog".to_string(),
            ..Default::default()
        })
        .assemble(vec![dated("a.md", "2024-01-01", "")]);

        assert_eq!(site.page("a").unwrap().url, "/blog/a/");
    }
}
