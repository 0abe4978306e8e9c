/// Create and edit flows for a single game
///
/// A save runs through an explicit state machine so the cover image and
/// the catalog document stay consistent:
///
/// - Draft: local form fields, validated before anything leaves the app
/// - Provisional: create-with-cover only; the game is written once with an
///   empty cover to obtain the ID the upload is keyed by
/// - Uploading: the picked image is uploaded under the game's ID
/// - Committed: the game is written with its final cover URL
///
/// When an existing cover is replaced, the old blob is deleted before the
/// new upload starts, so there is never more than one live cover per game.
/// If that upload then fails the game is left without a usable cover; the
/// error is reported and the flow can be re-run with the same ID.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::data::CatalogItem;
use crate::backend::{reclaim_cover, BlobStore, CatalogStore};
use crate::error::Error;

/// What to do with the cover on save
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CoverChange {
    /// Keep whatever the item already points at (nothing on create)
    #[default]
    Keep,
    /// Upload the image at this local path
    Replace(PathBuf),
    /// Drop the current cover
    Remove,
}

/// Phases of a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    Draft,
    Provisional,
    Uploading,
    Committed,
}

impl fmt::Display for WritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WritePhase::Draft => "draft",
            WritePhase::Provisional => "provisional write",
            WritePhase::Uploading => "cover upload",
            WritePhase::Committed => "final write",
        })
    }
}

/// A save that stopped before completing.
///
/// `item_id` is set once the store has assigned an ID; pass it back on the
/// item to retry without creating a duplicate.
#[derive(thiserror::Error, Debug)]
#[error("Save failed during {phase}: {source}")]
pub struct SaveError {
    pub phase: WritePhase,
    pub item_id: Option<String>,
    #[source]
    pub source: Error,
}

impl SaveError {
    fn new(phase: WritePhase, item_id: Option<&str>, source: impl Into<Error>) -> Self {
        Self {
            phase,
            item_id: item_id.map(str::to_string),
            source: source.into(),
        }
    }
}

/// Runs the create/edit/discard flows against the injected stores
#[derive(Clone)]
pub struct GameEditor {
    store: Arc<dyn CatalogStore>,
    blobs: Arc<dyn BlobStore>,
}

impl GameEditor {
    pub fn new(store: Arc<dyn CatalogStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Load a game for the edit screen
    pub async fn load(&self, id: &str) -> Result<Option<CatalogItem>, Error> {
        self.store.get(id).await
    }

    /// Save `item` and apply `cover`, returning the committed item.
    ///
    /// `item.id == None` creates a new game; otherwise the document with
    /// that ID is replaced and `item.cover_url` is taken as the current
    /// cover.
    pub async fn save(&self, item: CatalogItem, cover: CoverChange) -> Result<CatalogItem, SaveError> {
        // Draft
        item.validate()
            .map_err(|e| SaveError::new(WritePhase::Draft, item.id.as_deref(), e))?;

        let mut item = item;
        let previous_cover = std::mem::take(&mut item.cover_url);

        let local_image = match cover {
            CoverChange::Keep => {
                item.cover_url = previous_cover;
                return self.commit(item).await;
            }
            CoverChange::Remove => {
                reclaim_cover(self.blobs.as_ref(), &previous_cover).await;
                return self.commit(item).await;
            }
            CoverChange::Replace(path) => path,
        };

        // Provisional: a new game needs an ID before its cover can be keyed
        let id = match item.id.clone() {
            Some(id) => {
                // Delete-then-upload bounds storage to one blob per game
                reclaim_cover(self.blobs.as_ref(), &previous_cover).await;
                id
            }
            None => {
                let id = self
                    .store
                    .upsert(&item)
                    .await
                    .map_err(|e| SaveError::new(WritePhase::Provisional, None, e))?;
                tracing::debug!(id = %id, "Provisional write done");
                item.id = Some(id.clone());
                id
            }
        };

        // Uploading
        let url = self
            .blobs
            .upload(&id, &local_image)
            .await
            .map_err(|e| {
                tracing::warn!(id = %id, error = %e, "Cover upload failed");
                SaveError::new(WritePhase::Uploading, Some(&id), e)
            })?;

        item.cover_url = url;
        self.commit(item).await
    }

    // Committed
    async fn commit(&self, mut item: CatalogItem) -> Result<CatalogItem, SaveError> {
        let id = self
            .store
            .upsert(&item)
            .await
            .map_err(|e| SaveError::new(WritePhase::Committed, item.id.as_deref(), e))?;
        item.id = Some(id);

        tracing::info!(title = %item.title, has_cover = item.has_cover(), "💾 Game saved");
        Ok(item)
    }

    /// Delete a game and reclaim its cover.
    ///
    /// The cover goes only after the document is gone; a failed blob
    /// delete is logged and ignored. Unsaved items are a no-op.
    pub async fn discard(&self, item: &CatalogItem) -> Result<(), Error> {
        let Some(id) = item.id.as_deref() else {
            return Ok(());
        };
        self.store.delete(id).await?;
        reclaim_cover(self.blobs.as_ref(), &item.cover_url).await;
        Ok(())
    }
}
