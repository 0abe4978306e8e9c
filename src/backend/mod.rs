/// Collaborator contracts consumed by the catalog core
///
/// The catalog never talks to a concrete backend. Screens and flows receive
/// `Arc<dyn ...>` handles to these traits, which keeps the core testable
/// against in-memory fakes and lets the desktop build plug in the local
/// implementations:
/// - `Library` (state/library.rs) for the catalog documents
/// - `CoverStore` (covers.rs) for cover images
/// - `LocalIdentity` (identity.rs) for accounts and sessions

pub mod covers;
pub mod identity;

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::state::data::CatalogItem;

/// Per-user collection of catalog documents keyed by opaque string IDs
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All items of the signed-in user, ordered by title
    async fn list(&self) -> Result<Vec<CatalogItem>>;

    async fn get(&self, id: &str) -> Result<Option<CatalogItem>>;

    /// Insert when `item.id` is None (a new ID is generated), otherwise
    /// replace the whole document. Returns the document ID.
    async fn upsert(&self, item: &CatalogItem) -> Result<String>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Per-user storage for one cover image per catalog item
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the image at `local_image` under `key` and return its URL
    async fn upload(&self, key: &str, local_image: &Path) -> Result<String>;

    /// Remove the blob behind `url`. Blank URLs are a no-op.
    async fn delete_by_url(&self, url: &str) -> Result<()>;

    /// Remove every cover of the signed-in user, returning how many went
    async fn delete_all(&self) -> Result<usize>;
}

/// Email/password accounts and the current session
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;

    fn current_email(&self) -> Option<String>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<()>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<()>;

    async fn send_password_reset(&self, email: &str) -> Result<()>;

    /// Confirm the signed-in user's password before a sensitive change
    async fn reauthenticate(&self, password: &str) -> Result<()>;

    async fn change_email(&self, new_email: &str) -> Result<()>;

    async fn change_password(&self, new_password: &str) -> Result<()>;

    async fn delete_account(&self) -> Result<()>;

    fn sign_out(&self);
}

/// Delete a cover without letting a failure block the caller.
///
/// A leaked blob is preferable to failing the save or delete that triggered
/// the cleanup, so errors are logged and dropped.
pub async fn reclaim_cover(blobs: &dyn BlobStore, url: &str) {
    if url.trim().is_empty() {
        return;
    }
    if let Err(e) = blobs.delete_by_url(url).await {
        tracing::warn!(url, error = %e, "Failed to delete cover, leaving it behind");
    }
}
