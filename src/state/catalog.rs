use std::sync::Arc;

use super::data::CatalogItem;
use super::view::ViewState;
use crate::backend::CatalogStore;
use crate::error::Result;

/// Identifies one issued `load_all`. Completions carrying a ticket older
/// than the latest one are stale and get dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// The list screen's controller.
///
/// Owns the local mirror (through `ViewState`) and issues write-through
/// commands to the catalog store. The mirror is only replaced wholesale,
/// after a successful fetch.
pub struct CatalogController {
    store: Arc<dyn CatalogStore>,
    view: ViewState,
    latest_load: u64,
}

impl CatalogController {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            view: ViewState::new(),
            latest_load: 0,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn store(&self) -> Arc<dyn CatalogStore> {
        Arc::clone(&self.store)
    }

    /// Fetch the catalog and replace the mirror. On failure the mirror is
    /// left as it was and the error goes back to the caller.
    pub async fn load_all(&mut self) -> Result<()> {
        let ticket = self.begin_load();
        let fetched = fetch_all(self.store()).await;
        self.finish_load(ticket, fetched).map(|_| ())
    }

    /// Issue a new load ticket; any earlier in-flight load becomes stale
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_load += 1;
        LoadTicket(self.latest_load)
    }

    /// Apply the outcome of a fetch started with `ticket`.
    ///
    /// Returns `Ok(false)` when the result was stale and ignored.
    pub fn finish_load(&mut self, ticket: LoadTicket, fetched: Result<Vec<CatalogItem>>) -> Result<bool> {
        if ticket.0 != self.latest_load {
            tracing::debug!(ticket = ticket.0, latest = self.latest_load, "Dropping stale catalog load");
            return Ok(false);
        }

        let items = fetched?;
        tracing::debug!(count = items.len(), "Catalog mirror refreshed");
        self.view.replace_items(items);
        Ok(true)
    }

    /// Delete `item` from the store, then reload. Items that were never
    /// persisted are ignored without touching the store.
    pub async fn delete_item(&mut self, item: &CatalogItem) -> Result<()> {
        let Some(id) = item.id.as_deref() else {
            return Ok(());
        };
        self.store.delete(id).await?;
        self.load_all().await
    }

    /// Delete every selected item that is visible right now, clear the
    /// selection and reload. Returns how many items were deleted.
    ///
    /// Eligibility is computed from the projection at call time, so an ID
    /// that was selected but has since been filtered out is left alone.
    /// The first store failure stops the batch; the selection is kept in
    /// that case so the user can retry. The mirror is reloaded whatever the
    /// outcome, since deletes before the failure have already landed.
    pub async fn delete_selected(&mut self) -> Result<usize> {
        let targets = self.selected_targets();
        let outcome = delete_batch(self.store(), targets).await;
        let outcome = self.finish_delete_selected(outcome);

        let reloaded = self.load_all().await;
        let deleted = outcome?;
        reloaded?;
        Ok(deleted)
    }

    /// Items a bulk delete would remove right now
    pub fn selected_targets(&self) -> Vec<CatalogItem> {
        self.view.deletable_selection()
    }

    /// Apply the outcome of a bulk delete run with `delete_batch`. The
    /// selection is cleared only on success. Callers reload afterwards in
    /// both cases.
    pub fn finish_delete_selected(&mut self, outcome: Result<usize>) -> Result<usize> {
        match outcome {
            Ok(deleted) => {
                self.view.clear_selection();
                tracing::info!(deleted, "🗑️  Deleted selected games");
                Ok(deleted)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Bulk delete stopped, keeping selection");
                Err(e)
            }
        }
    }
}

/// Fetch the whole catalog. Split out so a UI can run it as a detached task
/// and hand the result back through `finish_load`.
pub async fn fetch_all(store: Arc<dyn CatalogStore>) -> Result<Vec<CatalogItem>> {
    store.list().await
}

/// Delete `items` one after the other, stopping at the first failure
pub async fn delete_batch(store: Arc<dyn CatalogStore>, items: Vec<CatalogItem>) -> Result<usize> {
    let mut deleted = 0;
    for item in items {
        if let Some(id) = item.id.as_deref() {
            store.delete(id).await?;
            deleted += 1;
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::state::data::GameStatus;
    use crate::testing::{Call, CallLog, Fail, MemoryStore};

    fn setup() -> (CatalogController, MemoryStore, CallLog) {
        let log = CallLog::new();
        let store = MemoryStore::new(log.clone());
        store.seed(CatalogItem::new("Celeste", "Switch", GameStatus::Playing, 4));
        store.seed(CatalogItem::new("Hades", "PC", GameStatus::Done, 5));
        store.seed(CatalogItem::new("Celtic Saga", "PS5", GameStatus::Backlog, 0));
        let controller = CatalogController::new(Arc::new(store.clone()));
        (controller, store, log)
    }

    fn id_of(controller: &CatalogController, title: &str) -> String {
        controller
            .view()
            .items()
            .iter()
            .find(|i| i.title == title)
            .and_then(|i| i.id.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn test_load_all_replaces_mirror() {
        let (mut controller, store, _log) = setup();
        controller.load_all().await.unwrap();
        assert_eq!(controller.view().items().len(), 3);

        store.seed(CatalogItem::new("Tunic", "Switch", GameStatus::Backlog, 0));
        controller.load_all().await.unwrap();
        let titles: Vec<_> = controller.view().items().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Celeste", "Celtic Saga", "Hades", "Tunic"]);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_mirror() {
        let (mut controller, _store, log) = setup();
        controller.load_all().await.unwrap();

        log.fail(Fail::List);
        let err = controller.load_all().await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert_eq!(controller.view().items().len(), 3);
    }

    #[tokio::test]
    async fn test_stale_load_is_ignored() {
        let (mut controller, store, _log) = setup();
        let old = controller.begin_load();
        let old_result = fetch_all(controller.store()).await;

        store.seed(CatalogItem::new("Tunic", "Switch", GameStatus::Backlog, 0));
        let new = controller.begin_load();
        let new_result = fetch_all(controller.store()).await;

        assert!(controller.finish_load(new, new_result).unwrap());
        assert!(!controller.finish_load(old, old_result).unwrap());
        assert_eq!(controller.view().items().len(), 4);
    }

    #[tokio::test]
    async fn test_delete_unsaved_item_touches_nothing() {
        let (mut controller, _store, log) = setup();
        let draft = CatalogItem::new("Draft", "PC", GameStatus::Backlog, 0);

        controller.delete_item(&draft).await.unwrap();
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_item_then_reload() {
        let (mut controller, store, log) = setup();
        controller.load_all().await.unwrap();
        log.clear();

        let hades = controller
            .view()
            .items()
            .iter()
            .find(|i| i.title == "Hades")
            .cloned()
            .unwrap();
        let id = hades.id.clone().unwrap();
        controller.delete_item(&hades).await.unwrap();

        assert_eq!(log.calls(), vec![Call::Delete(id.clone()), Call::List]);
        assert!(store.doc(&id).is_none());
        assert_eq!(controller.view().items().len(), 2);
    }

    #[tokio::test]
    async fn test_select_all_visible_then_delete_selected() {
        let (mut controller, store, log) = setup();
        controller.load_all().await.unwrap();
        let hades = id_of(&controller, "Hades");

        let view = controller.view_mut();
        view.set_query("cel");
        view.enter_selection_mode();
        let visible = view.visible_ids();
        view.select_all_visible(visible);
        log.clear();

        let deleted = controller.delete_selected().await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(log.count(|c| matches!(c, Call::Delete(_))), 2);
        assert!(controller.view().selected().is_empty());
        assert!(!controller.view().selection_mode());
        assert_eq!(store.len(), 1);
        assert!(store.doc(&hades).is_some());
    }

    #[tokio::test]
    async fn test_delete_selected_skips_filtered_out_ids() {
        let (mut controller, store, _log) = setup();
        controller.load_all().await.unwrap();
        let hades = id_of(&controller, "Hades");
        let celeste = id_of(&controller, "Celeste");

        let view = controller.view_mut();
        view.enter_selection_mode();
        view.toggle_select(&hades);
        view.toggle_select(&celeste);
        // Hades scrolls out of the projection before the delete
        view.set_status_filter(Some(GameStatus::Playing));

        assert_eq!(controller.delete_selected().await.unwrap(), 1);
        assert!(store.doc(&hades).is_some());
        assert!(store.doc(&celeste).is_none());
    }

    #[tokio::test]
    async fn test_failed_bulk_delete_keeps_selection() {
        let (mut controller, _store, log) = setup();
        controller.load_all().await.unwrap();
        let celeste = id_of(&controller, "Celeste");

        controller.view_mut().enter_selection_mode();
        controller.view_mut().toggle_select(&celeste);
        log.fail(Fail::Delete);

        let err = controller.delete_selected().await.unwrap_err();
        assert!(matches!(err, Error::Write(_)));
        assert!(controller.view().is_selected(&celeste));
    }

    #[tokio::test]
    async fn test_partial_bulk_delete_resyncs_mirror() {
        let (mut controller, store, log) = setup();
        controller.load_all().await.unwrap();
        let celeste = id_of(&controller, "Celeste");

        controller.view_mut().enter_selection_mode();
        let visible = controller.view().visible_ids();
        controller.view_mut().select_all_visible(visible);
        log.clear();
        // First delete lands, the second one fails
        log.fail_after(Fail::Delete, 1);

        assert!(controller.delete_selected().await.is_err());
        assert_eq!(store.len(), 2);
        assert_eq!(controller.view().items().len(), 2);
        assert_eq!(controller.view().selected().len(), 3);

        log.heal(Fail::Delete);
        assert_eq!(controller.delete_selected().await.unwrap(), 2);
        assert_eq!(store.len(), 0);

        // Celeste went in the first attempt and is not deleted again
        assert_eq!(log.count(|c| *c == Call::Delete(celeste.clone())), 1);
        assert_eq!(log.count(|c| matches!(c, Call::Delete(_))), 4);
    }
}
