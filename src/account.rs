use std::sync::Arc;

use crate::backend::{BlobStore, CatalogStore, IdentityProvider};
use crate::error::{Result, ValidationError};
use crate::state::validation::{
    check_change_email, check_change_password, check_sign_in, check_sign_up, is_email_valid,
    PASSWORD_MIN_LENGTH,
};

/// Profile flows on top of the identity provider.
///
/// Every form is validated locally before the provider is called, so a
/// `ValidationError` means nothing left the process. Sensitive changes
/// reauthenticate with the current password first.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn CatalogStore>,
    blobs: Arc<dyn BlobStore>,
    min_length: usize,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn CatalogStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            identity,
            store,
            blobs,
            min_length: PASSWORD_MIN_LENGTH,
        }
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.current_user_id().is_some()
    }

    pub fn current_email(&self) -> Option<String> {
        self.identity.current_email()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        check_sign_in(email, password, self.min_length)?;
        self.identity.sign_in(email.trim(), password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str, confirmation: &str) -> Result<()> {
        check_sign_up(email, password, confirmation, self.min_length)?;
        self.identity.sign_up(email.trim(), password).await
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<()> {
        if !is_email_valid(email.trim()) {
            return Err(ValidationError::InvalidEmail.into());
        }
        self.identity.send_password_reset(email.trim()).await
    }

    pub async fn change_email(&self, new_email: &str, current_password: &str) -> Result<()> {
        check_change_email(new_email, current_password, self.min_length)?;
        self.identity.reauthenticate(current_password).await?;
        self.identity.change_email(new_email.trim()).await
    }

    pub async fn change_password(&self, current: &str, new: &str, confirmation: &str) -> Result<()> {
        check_change_password(current, new, confirmation, self.min_length)?;
        self.identity.reauthenticate(current).await?;
        self.identity.change_password(new).await
    }

    /// Remove the account together with its catalog and covers.
    ///
    /// Catalog rows must be gone before the identity is, since the store
    /// needs the session to reach them. The cover sweep is best effort.
    pub async fn delete_account(&self, password: &str) -> Result<usize> {
        if password.trim().is_empty() {
            return Err(ValidationError::CurrentPasswordMissing.into());
        }
        self.identity.reauthenticate(password).await?;

        let items = self.store.list().await?;
        let mut removed = 0;
        for id in items.iter().filter_map(|item| item.id.as_deref()) {
            self.store.delete(id).await?;
            removed += 1;
        }

        if let Err(e) = self.blobs.delete_all().await {
            tracing::warn!(error = %e, "Could not remove covers of deleted account");
        }

        self.identity.delete_account().await?;
        tracing::info!(removed, "Account data removed");
        Ok(removed)
    }

    pub fn sign_out(&self) {
        self.identity.sign_out();
    }
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("signed_in", &self.is_signed_in())
            .field("min_length", &self.min_length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::identity::LocalIdentity;
    use crate::error::{AuthError, Error};
    use crate::state::data::{CatalogItem, GameStatus};
    use crate::testing::{Call, CallLog, Fail, MemoryBlobs, MemoryStore};

    struct Fixture {
        _dir: tempfile::TempDir,
        log: CallLog,
        store: Arc<MemoryStore>,
        blobs: Arc<MemoryBlobs>,
        account: AccountService,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let identity = Arc::new(LocalIdentity::open(&dir.path().join("games.db")).unwrap());
        let log = CallLog::new();
        let store = Arc::new(MemoryStore::new(log.clone()));
        let blobs = Arc::new(MemoryBlobs::new(log.clone()));
        let account = AccountService::new(identity, store.clone(), blobs.clone());
        Fixture {
            _dir: dir,
            log,
            store,
            blobs,
            account,
        }
    }

    #[tokio::test]
    async fn test_validation_runs_before_the_provider() {
        let fx = fixture();

        let err = fx.account.sign_up("nobody", "secret1", "secret1").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::InvalidEmail)));

        let err = fx.account.sign_up("a@b.co", "secret1", "secret2").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::PasswordMismatch)));

        let err = fx.account.sign_in("a@b.co", "short").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::PasswordTooShort { min: 6 })
        ));
        assert!(!fx.account.is_signed_in());
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let fx = fixture();
        fx.account.sign_up(" ada@games.io ", "secret1", "secret1").await.unwrap();
        assert_eq!(fx.account.current_email().as_deref(), Some("ada@games.io"));

        fx.account.sign_out();
        assert!(!fx.account.is_signed_in());

        let err = fx.account.sign_in("ada@games.io", "secret2").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
        fx.account.sign_in("ada@games.io", "secret1").await.unwrap();
        assert!(fx.account.is_signed_in());
    }

    #[tokio::test]
    async fn test_change_password_needs_current_password() {
        let fx = fixture();
        fx.account.sign_up("ada@games.io", "secret1", "secret1").await.unwrap();

        let err = fx
            .account
            .change_password("secret1", "secret1", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::PasswordUnchanged)));

        let err = fx
            .account
            .change_password("wrong-one", "better1", "better1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));

        fx.account.change_password("secret1", "better1", "better1").await.unwrap();
        fx.account.sign_out();
        fx.account.sign_in("ada@games.io", "better1").await.unwrap();
    }

    #[tokio::test]
    async fn test_change_email() {
        let fx = fixture();
        fx.account.sign_up("ada@games.io", "secret1", "secret1").await.unwrap();

        let err = fx.account.change_email("ada-at-games", "secret1").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::InvalidEmail)));

        fx.account.change_email("ada@play.io", "secret1").await.unwrap();
        assert_eq!(fx.account.current_email().as_deref(), Some("ada@play.io"));
    }

    #[tokio::test]
    async fn test_password_reset_requires_known_email() {
        let fx = fixture();
        fx.account.sign_up("ada@games.io", "secret1", "secret1").await.unwrap();
        fx.account.sign_out();

        fx.account.send_password_reset("ada@games.io").await.unwrap();
        let err = fx.account.send_password_reset("bob@games.io").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_account_removes_items_and_covers() {
        let fx = fixture();
        fx.account.sign_up("ada@games.io", "secret1", "secret1").await.unwrap();
        fx.store.seed(CatalogItem::new("Celeste", "PC", GameStatus::Done, 5));
        fx.store.seed(CatalogItem::new("Hades", "Switch", GameStatus::Playing, 4));
        fx.blobs.seed("g1");

        let err = fx.account.delete_account("wrong-one").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
        assert_eq!(fx.store.len(), 2);

        assert_eq!(fx.account.delete_account("secret1").await.unwrap(), 2);
        assert_eq!(fx.store.len(), 0);
        assert!(fx.blobs.urls().is_empty());
        assert!(!fx.account.is_signed_in());

        let err = fx.account.sign_in("ada@games.io", "secret1").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_delete_account_survives_cover_sweep_failure() {
        let fx = fixture();
        fx.account.sign_up("ada@games.io", "secret1", "secret1").await.unwrap();
        fx.store.seed(CatalogItem::new("Celeste", "PC", GameStatus::Done, 5));
        fx.log.fail(Fail::DeleteAllBlobs);

        fx.account.delete_account("secret1").await.unwrap();
        assert_eq!(fx.log.count(|c| *c == Call::DeleteAllBlobs), 1);
        assert!(!fx.account.is_signed_in());
    }

    #[tokio::test]
    async fn test_delete_account_stops_when_items_cannot_be_removed() {
        let fx = fixture();
        fx.account.sign_up("ada@games.io", "secret1", "secret1").await.unwrap();
        fx.store.seed(CatalogItem::new("Celeste", "PC", GameStatus::Done, 5));
        fx.log.fail(Fail::Delete);

        assert!(fx.account.delete_account("secret1").await.is_err());
        // Identity is kept so the user can retry
        assert!(fx.account.is_signed_in());
        assert_eq!(fx.log.count(|c| *c == Call::DeleteAllBlobs), 0);
    }
}
