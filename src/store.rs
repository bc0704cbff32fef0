//! Page store contract and the in-memory snapshot that implements it.

use crate::error::StoreError;
use crate::page::Page;
use std::collections::{BTreeMap, HashMap};

/// Read-only queries resolution needs from page storage.
///
/// Errors are storage failures, never "not found": a missing page is `None`.
pub trait PageStore: Send + Sync {
    /// Home page of a language.
    fn root_page(&self, language_code: &str) -> Result<Option<Page>, StoreError>;

    /// Content page with `urlname` in exactly this language.
    fn find_content_page(
        &self,
        language_code: &str,
        urlname: &str,
    ) -> Result<Option<Page>, StoreError>;

    /// Content pages with `urlname` in any language.
    fn find_content_pages_any_language(&self, urlname: &str) -> Result<Vec<Page>, StoreError>;

    /// Public content page in `language_code` from the same translation
    /// group as `page`.
    fn translation_sibling(
        &self,
        page: &Page,
        language_code: &str,
    ) -> Result<Option<Page>, StoreError>;
}

/// Immutable page snapshot with lookup indexes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pages: Vec<Page>,
    by_locale_urlname: HashMap<(String, String), usize>,
    by_urlname: HashMap<String, Vec<usize>>,
    by_group: HashMap<i64, Vec<usize>>,
}

impl MemoryStore {
    pub fn new(pages: Vec<Page>) -> Self {
        let mut by_locale_urlname = HashMap::new();
        let mut by_urlname: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_group: HashMap<i64, Vec<usize>> = HashMap::new();

        for (index, page) in pages.iter().enumerate() {
            if !page.is_content() {
                continue;
            }
            by_locale_urlname
                .entry((page.language_code.clone(), page.urlname.clone()))
                .or_insert(index);
            by_urlname.entry(page.urlname.clone()).or_default().push(index);
            if let Some(group) = page.translation_group {
                by_group.entry(group).or_default().push(index);
            }
        }

        Self {
            pages,
            by_locale_urlname,
            by_urlname,
            by_group,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageStore for MemoryStore {
    fn root_page(&self, language_code: &str) -> Result<Option<Page>, StoreError> {
        Ok(self
            .pages
            .iter()
            .find(|page| page.is_root && page.language_code == language_code)
            .cloned())
    }

    fn find_content_page(
        &self,
        language_code: &str,
        urlname: &str,
    ) -> Result<Option<Page>, StoreError> {
        let key = (language_code.to_string(), urlname.to_string());
        Ok(self
            .by_locale_urlname
            .get(&key)
            .map(|&index| self.pages[index].clone()))
    }

    fn find_content_pages_any_language(&self, urlname: &str) -> Result<Vec<Page>, StoreError> {
        Ok(self
            .by_urlname
            .get(urlname)
            .map(|indexes| indexes.iter().map(|&i| self.pages[i].clone()).collect())
            .unwrap_or_default())
    }

    fn translation_sibling(
        &self,
        page: &Page,
        language_code: &str,
    ) -> Result<Option<Page>, StoreError> {
        // Group identity is required; sharing a urlname or language is not enough.
        let Some(group) = page.translation_group else {
            return Ok(None);
        };
        Ok(self.by_group.get(&group).and_then(|indexes| {
            indexes
                .iter()
                .map(|&i| &self.pages[i])
                .find(|sibling| {
                    sibling.id != page.id
                        && sibling.language_code == language_code
                        && sibling.is_public()
                })
                .cloned()
        }))
    }
}

/// Assign translation groups from `(from_id, to_id)` translation links.
///
/// Every connected set of linked pages becomes one group. These groups are
/// numbered after the largest group already set on an unlinked page, so a
/// derived group never shares an id with an explicit one. Pages without
/// links keep their current group.
pub fn translation_groups_from_links(pages: &mut [Page], links: &[(i64, i64)]) {
    let mut parent: BTreeMap<i64, i64> = BTreeMap::new();

    fn find(parent: &mut BTreeMap<i64, i64>, id: i64) -> i64 {
        let mut root = id;
        while let Some(&next) = parent.get(&root) {
            if next == root {
                break;
            }
            root = next;
        }
        // Path compression
        let mut current = id;
        while current != root {
            let next = parent.get(&current).copied().unwrap_or(root);
            parent.insert(current, root);
            current = next;
        }
        root
    }

    for &(from, to) in links {
        parent.entry(from).or_insert(from);
        parent.entry(to).or_insert(to);
        let a = find(&mut parent, from);
        let b = find(&mut parent, to);
        if a != b {
            let (low, high) = if a < b { (a, b) } else { (b, a) };
            parent.insert(high, low);
        }
    }

    let offset = pages
        .iter()
        .filter(|page| !parent.contains_key(&page.id))
        .filter_map(|page| page.translation_group)
        .max()
        .unwrap_or(0);

    let ids: Vec<i64> = parent.keys().copied().collect();
    let mut numbering: BTreeMap<i64, i64> = BTreeMap::new();
    for id in ids {
        let root = find(&mut parent, id);
        let next = offset + numbering.len() as i64 + 1;
        numbering.entry(root).or_insert(next);
    }

    for page in pages.iter_mut() {
        if parent.contains_key(&page.id) {
            let root = find(&mut parent, page.id);
            page.translation_group = numbering.get(&root).copied();
        }
    }
}
