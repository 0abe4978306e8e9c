use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::IdentityProvider;
use crate::error::{AuthError, Error, Result};
use crate::state::library::init_schema;

/// How long a sign-in or reauthentication counts as "recent" for
/// email/password changes and account deletion, in seconds
const RECENT_LOGIN_SECS: i64 = 5 * 60;

/// How long a password reset token stays valid, in seconds
const RESET_TOKEN_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    email: String,
    verified_at: DateTime<Utc>,
}

#[derive(Debug)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
}

/// Email/password accounts stored next to the catalog in SQLite.
///
/// Passwords are kept as argon2 PHC strings. A single session is held in
/// memory; it is not persisted across restarts.
pub struct LocalIdentity {
    conn: Mutex<Connection>,
    session: Mutex<Option<Session>>,
}

fn backend(e: impl std::fmt::Display) -> Error {
    AuthError::Backend(e.to_string()).into()
}

/// Emails are compared trimmed and lower-cased
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();
    // Spawn blocking because argon2 is deliberately slow
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(backend)
    })
    .await
    .map_err(|e| backend(format!("Task join error: {}", e)))?
}

async fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let password = password.to_string();
    let stored = stored.to_string();
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored).map_err(backend)?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| backend(format!("Task join error: {}", e)))?
}

impl LocalIdentity {
    /// Open the account tables in the database at `db_path`.
    /// A separate connection from the catalog's is used.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(backend)?;
        }
        let conn = Connection::open(db_path).map_err(backend)?;
        init_schema(&conn).map_err(backend)?;

        Ok(Self {
            conn: Mutex::new(conn),
            session: Mutex::new(None),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| backend("identity connection poisoned"))
    }

    fn session(&self) -> Option<Session> {
        self.session.lock().ok().and_then(|s| s.clone())
    }

    fn set_session(&self, session: Option<Session>) {
        if let Ok(mut current) = self.session.lock() {
            *current = session;
        }
    }

    /// Current session, refreshed as a recent login
    fn start_session(&self, user: &UserRow) {
        self.set_session(Some(Session {
            user_id: user.id.clone(),
            email: user.email.clone(),
            verified_at: Utc::now(),
        }));
    }

    /// The session, provided the password was confirmed recently
    fn recent_session(&self) -> Result<Session> {
        let session = self.session().ok_or(AuthError::NotSignedIn)?;
        if (Utc::now() - session.verified_at).num_seconds() > RECENT_LOGIN_SECS {
            return Err(AuthError::RecentLoginRequired.into());
        }
        Ok(session)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, email, password_hash FROM users WHERE email = ?1",
            [email],
            |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    password_hash: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(backend)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, email, password_hash FROM users WHERE id = ?1",
            [id],
            |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    password_hash: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(backend)
    }

    fn insert_user(&self, user: &UserRow) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.email, user.password_hash, Utc::now().timestamp()],
        )
        .map_err(backend)?;
        Ok(())
    }

    fn update_password_hash(&self, user_id: &str, password_hash: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, user_id],
        )
        .map_err(backend)?;
        conn.execute("DELETE FROM password_resets WHERE user_id = ?1", [user_id])
            .map_err(backend)?;
        Ok(())
    }

    /// Token holder, if the token exists and has not expired. The token is
    /// consumed either way.
    fn take_reset_token(&self, token: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT user_id, requested_at FROM password_resets WHERE token = ?1",
                [token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(backend)?;
        conn.execute("DELETE FROM password_resets WHERE token = ?1", [token])
            .map_err(backend)?;

        Ok(row.and_then(|(user_id, requested_at)| {
            let age = Utc::now().timestamp() - requested_at;
            (age <= RESET_TOKEN_TTL_SECS).then_some(user_id)
        }))
    }

    /// Issue a reset token for `user_id`
    fn insert_reset_token(&self, user_id: &str) -> Result<String> {
        let token = uuid::Uuid::new_v4().to_string();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO password_resets (token, user_id, requested_at) VALUES (?1, ?2, ?3)",
            params![token, user_id, Utc::now().timestamp()],
        )
        .map_err(backend)?;
        Ok(token)
    }

    /// Finish a reset started by `send_password_reset`
    pub async fn complete_password_reset(&self, token: &str, new_password: &str) -> Result<()> {
        let user_id = self
            .take_reset_token(token)?
            .ok_or(AuthError::InvalidResetToken)?;
        let hash = hash_password(new_password).await?;
        self.update_password_hash(&user_id, &hash)?;
        tracing::info!(user_id = %user_id, "🔑 Password reset completed");
        Ok(())
    }

    /// Most recent reset token issued for `email`
    pub fn pending_reset_token(&self, email: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT r.token FROM password_resets r JOIN users u ON u.id = r.user_id
             WHERE u.email = ?1 ORDER BY r.requested_at DESC, r.rowid DESC LIMIT 1",
            [normalize_email(email)],
            |row| row.get(0),
        )
        .optional()
        .map_err(backend)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.session().map(|s| s.user_id)
    }

    fn current_email(&self) -> Option<String> {
        self.session().map(|s| s.email)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        let email = normalize_email(email);
        let user = self
            .find_by_email(&email)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            tracing::warn!(email = %email, "Rejected sign-in");
            return Err(AuthError::InvalidCredentials.into());
        }

        self.start_session(&user);
        tracing::info!(user_id = %user.id, "🔓 Signed in");
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<()> {
        let email = normalize_email(email);
        if self.find_by_email(&email)?.is_some() {
            return Err(AuthError::EmailInUse(email).into());
        }

        let user = UserRow {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            password_hash: hash_password(password).await?,
        };
        self.insert_user(&user)?;

        self.start_session(&user);
        tracing::info!(user_id = %user.id, "🎮 Account created");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let user = self
            .find_by_email(&email)?
            .ok_or_else(|| AuthError::UserNotFound(email.clone()))?;

        self.insert_reset_token(&user.id)?;
        // No mail transport locally; the token is picked up through
        // `pending_reset_token`
        tracing::info!(email = %email, "✉️  Password reset requested");
        Ok(())
    }

    async fn reauthenticate(&self, password: &str) -> Result<()> {
        let session = self.session().ok_or(AuthError::NotSignedIn)?;
        let user = self
            .find_by_id(&session.user_id)?
            .ok_or(AuthError::NotSignedIn)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.start_session(&user);
        Ok(())
    }

    async fn change_email(&self, new_email: &str) -> Result<()> {
        let session = self.recent_session()?;
        let new_email = normalize_email(new_email);

        if let Some(other) = self.find_by_email(&new_email)? {
            if other.id != session.user_id {
                return Err(AuthError::EmailInUse(new_email).into());
            }
        }

        {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE users SET email = ?1 WHERE id = ?2",
                params![new_email, session.user_id],
            )
            .map_err(backend)?;
        }

        self.set_session(Some(Session {
            email: new_email,
            ..session
        }));
        tracing::info!("📧 Email changed");
        Ok(())
    }

    async fn change_password(&self, new_password: &str) -> Result<()> {
        let session = self.recent_session()?;
        let hash = hash_password(new_password).await?;
        self.update_password_hash(&session.user_id, &hash)?;
        tracing::info!(user_id = %session.user_id, "🔑 Password changed");
        Ok(())
    }

    async fn delete_account(&self) -> Result<()> {
        let session = self.recent_session()?;
        {
            let conn = self.conn()?;
            conn.execute("DELETE FROM password_resets WHERE user_id = ?1", [&session.user_id])
                .map_err(backend)?;
            conn.execute("DELETE FROM users WHERE id = ?1", [&session.user_id])
                .map_err(backend)?;
        }

        self.set_session(None);
        tracing::info!(user_id = %session.user_id, "👋 Account deleted");
        Ok(())
    }

    fn sign_out(&self) {
        self.set_session(None);
        tracing::info!("🔒 Signed out");
    }
}

impl std::fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentity")
            .field("user_id", &self.current_user_id())
            .finish()
    }
}
