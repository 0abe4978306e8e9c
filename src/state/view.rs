/// List view state for the game catalog
///
/// Holds the local mirror of the catalog plus everything the list screen
/// derives from it: search text, status filter, sort order and the bulk
/// selection. The visible list is never stored; it is recomputed from the
/// current snapshot by `project` whenever it is needed.

use std::collections::HashSet;

use super::data::{CatalogItem, GameStatus, SortKey};

/// Filter and order `items` for display.
///
/// Title search is a case-insensitive substring match (blank matches all),
/// the status filter is an exact match, and ordering is a stable sort on the
/// lower-cased key so equal keys keep their incoming order. Descending order
/// is the ascending result reversed.
pub fn project(
    items: &[CatalogItem],
    query: &str,
    status_filter: Option<GameStatus>,
    sort_key: SortKey,
    ascending: bool,
) -> Vec<CatalogItem> {
    let needle = query.trim().to_lowercase();

    let mut visible: Vec<CatalogItem> = items
        .iter()
        .filter(|item| needle.is_empty() || item.title.to_lowercase().contains(&needle))
        .filter(|item| status_filter.map_or(true, |status| item.status == status))
        .cloned()
        .collect();

    // sort_by_cached_key is stable
    visible.sort_by_cached_key(|item| sort_value(item, sort_key));

    if !ascending {
        visible.reverse();
    }

    visible
}

fn sort_value(item: &CatalogItem, key: SortKey) -> String {
    match key {
        SortKey::Title => item.title.to_lowercase(),
        SortKey::Platform => item.platform.to_lowercase(),
        SortKey::Status => item.status.name().to_lowercase(),
    }
}

/// Snapshot of the list screen
#[derive(Debug, Clone)]
pub struct ViewState {
    items: Vec<CatalogItem>,
    pub query: String,
    pub status_filter: Option<GameStatus>,
    pub sort_key: SortKey,
    pub ascending: bool,
    selection_mode: bool,
    selected: HashSet<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            query: String::new(),
            status_filter: None,
            sort_key: SortKey::Title,
            ascending: true,
            selection_mode: false,
            selected: HashSet::new(),
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full local mirror, in store order
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Replace the mirror wholesale (no merging)
    pub fn replace_items(&mut self, items: Vec<CatalogItem>) {
        self.items = items;
    }

    /// Current projection of the mirror
    pub fn visible(&self) -> Vec<CatalogItem> {
        project(&self.items, &self.query, self.status_filter, self.sort_key, self.ascending)
    }

    /// IDs of the current projection, in display order
    pub fn visible_ids(&self) -> Vec<String> {
        self.visible().into_iter().filter_map(|item| item.id).collect()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn set_status_filter(&mut self, status: Option<GameStatus>) {
        self.status_filter = status;
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    pub fn toggle_direction(&mut self) {
        self.ascending = !self.ascending;
    }

    // ========== Selection ==========

    pub fn selection_mode(&self) -> bool {
        self.selection_mode
    }

    pub fn selected(&self) -> &HashSet<String> {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Start a fresh selection session
    pub fn enter_selection_mode(&mut self) {
        self.selected.clear();
        self.selection_mode = true;
    }

    /// Flip membership of `id`
    pub fn toggle_select(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Replace the selection with exactly `visible_ids`
    pub fn select_all_visible<I, S>(&mut self, visible_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected = visible_ids.into_iter().map(Into::into).collect();
    }

    /// Empty the selection and leave selection mode
    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.selection_mode = false;
    }

    /// Items eligible for a bulk delete right now: selected AND visible in
    /// the projection computed at call time.
    pub fn deletable_selection(&self) -> Vec<CatalogItem> {
        self.visible()
            .into_iter()
            .filter(|item| item.id.as_deref().is_some_and(|id| self.selected.contains(id)))
            .collect()
    }
}
