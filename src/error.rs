use thiserror::Error;

/// Errors surfaced by catalog, cover and account operations.
///
/// Every variant reaches the caller; the only failures that are swallowed
/// are best-effort cover deletions (see `backend::reclaim_cover`).
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Failed to fetch catalog: {0}")]
    Fetch(String),

    #[error("Failed to write catalog: {0}")]
    Write(String),

    #[error("Cover upload failed: {0}")]
    Upload(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Identity provider failures, including the "no session" case.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No account found for {0}")]
    UserNotFound(String),

    #[error("Email {0} is already in use")]
    EmailInUse(String),

    #[error("Confirm your password again to continue")]
    RecentLoginRequired,

    #[error("Password reset link is invalid or expired")]
    InvalidResetToken,

    #[error("Identity backend error: {0}")]
    Backend(String),
}

/// Local form predicate failures. These never reach the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email must contain '@' and '.'")]
    InvalidEmail,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Enter your current password")]
    CurrentPasswordMissing,

    #[error("Enter the new password")]
    NewPasswordMissing,

    #[error("Confirm the new password")]
    ConfirmationMissing,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("New password must differ from the current one")]
    PasswordUnchanged,

    #[error("Title is required")]
    TitleMissing,

    #[error("Rating {0} is outside 0..=5")]
    RatingOutOfRange(i64),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map a SQLite failure on a read path.
    pub(crate) fn fetch(err: impl std::fmt::Display) -> Self {
        Error::Fetch(err.to_string())
    }

    /// Map a SQLite failure on a write path.
    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        Error::Write(err.to_string())
    }

    pub(crate) fn upload(err: impl std::fmt::Display) -> Self {
        Error::Upload(err.to_string())
    }
}
