//! In-memory collaborators with call recording for tests.
//!
//! Every call is appended to a shared `CallLog` so tests can assert on the
//! exact order of store and blob operations. Failures are injected per
//! operation kind.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::backend::{BlobStore, CatalogStore, IdentityProvider};
use crate::error::{AuthError, Error, Result};
use crate::state::data::CatalogItem;

/// Record of a collaborator call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Get(String),
    /// ID passed in (None for inserts) and the cover URL written
    Upsert { id: Option<String>, cover_url: String },
    Delete(String),
    Upload { key: String },
    DeleteBlob(String),
    DeleteAllBlobs,
}

/// Operation kinds that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fail {
    List,
    Upsert,
    Delete,
    Upload,
    DeleteBlob,
    DeleteAllBlobs,
}

#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
    failures: Arc<Mutex<HashSet<Fail>>>,
    /// Successful calls left before an operation starts failing
    budgets: Arc<Mutex<HashMap<Fail, usize>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("lock").clear();
    }

    pub fn fail(&self, op: Fail) {
        self.failures.lock().expect("lock").insert(op);
    }

    /// Let `op` succeed `successes` more times, then fail from then on
    pub fn fail_after(&self, op: Fail, successes: usize) {
        self.budgets.lock().expect("lock").insert(op, successes);
    }

    pub fn heal(&self, op: Fail) {
        self.failures.lock().expect("lock").remove(&op);
        self.budgets.lock().expect("lock").remove(&op);
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("lock").push(call);
    }

    fn check(&self, op: Fail) -> bool {
        if self.failures.lock().expect("lock").contains(&op) {
            return true;
        }
        match self.budgets.lock().expect("lock").get_mut(&op) {
            Some(0) => true,
            Some(left) => {
                *left -= 1;
                false
            }
            None => false,
        }
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }
}

/// Catalog store backed by a BTreeMap, with generated IDs "g1", "g2", ...
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<BTreeMap<String, CatalogItem>>>,
    next_id: Arc<Mutex<u64>>,
    log: CallLog,
}

impl MemoryStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Seed a document without recording a call
    pub fn seed(&self, item: CatalogItem) -> String {
        let id = item.id.clone().unwrap_or_else(|| self.fresh_id());
        let mut item = item;
        item.id = Some(id.clone());
        self.docs.lock().expect("lock").insert(id.clone(), item);
        id
    }

    pub fn doc(&self, id: &str) -> Option<CatalogItem> {
        self.docs.lock().expect("lock").get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().expect("lock").len()
    }

    fn fresh_id(&self) -> String {
        let mut next = self.next_id.lock().expect("lock");
        *next += 1;
        format!("g{}", *next)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list(&self) -> Result<Vec<CatalogItem>> {
        self.log.record(Call::List);
        if self.log.check(Fail::List) {
            return Err(Error::Fetch("injected list failure".to_string()));
        }
        let mut items: Vec<_> = self.docs.lock().expect("lock").values().cloned().collect();
        items.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(items)
    }

    async fn get(&self, id: &str) -> Result<Option<CatalogItem>> {
        self.log.record(Call::Get(id.to_string()));
        Ok(self.doc(id))
    }

    async fn upsert(&self, item: &CatalogItem) -> Result<String> {
        self.log.record(Call::Upsert {
            id: item.id.clone(),
            cover_url: item.cover_url.clone(),
        });
        if self.log.check(Fail::Upsert) {
            return Err(Error::Write("injected upsert failure".to_string()));
        }
        let id = item.id.clone().unwrap_or_else(|| self.fresh_id());
        let mut stored = item.clone();
        stored.id = Some(id.clone());
        self.docs.lock().expect("lock").insert(id.clone(), stored);
        Ok(id)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.log.record(Call::Delete(id.to_string()));
        if self.log.check(Fail::Delete) {
            return Err(Error::Write("injected delete failure".to_string()));
        }
        self.docs.lock().expect("lock").remove(id);
        Ok(())
    }
}

/// Blob store that hands out `mem://covers/<key>` URLs
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobs {
    blobs: Arc<Mutex<BTreeMap<String, String>>>,
    log: CallLog,
}

impl MemoryBlobs {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.blobs.lock().expect("lock").values().cloned().collect()
    }

    pub fn seed(&self, key: &str) -> String {
        let url = format!("mem://covers/{key}");
        self.blobs.lock().expect("lock").insert(key.to_string(), url.clone());
        url
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn upload(&self, key: &str, _local_image: &Path) -> Result<String> {
        self.log.record(Call::Upload { key: key.to_string() });
        if self.log.check(Fail::Upload) {
            return Err(Error::Upload("injected upload failure".to_string()));
        }
        Ok(self.seed(key))
    }

    async fn delete_by_url(&self, url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Ok(());
        }
        self.log.record(Call::DeleteBlob(url.to_string()));
        if self.log.check(Fail::DeleteBlob) {
            return Err(Error::Write("injected blob delete failure".to_string()));
        }
        self.blobs.lock().expect("lock").retain(|_, u| u != url);
        Ok(())
    }

    async fn delete_all(&self) -> Result<usize> {
        self.log.record(Call::DeleteAllBlobs);
        if self.log.check(Fail::DeleteAllBlobs) {
            return Err(Error::Write("injected blob sweep failure".to_string()));
        }
        let mut blobs = self.blobs.lock().expect("lock");
        let count = blobs.len();
        blobs.clear();
        Ok(count)
    }
}

/// Identity with a fixed session; account operations are not supported
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user: Arc<Mutex<Option<String>>>,
}

impl StaticIdentity {
    pub fn new(user: Option<&str>) -> Self {
        Self {
            user: Arc::new(Mutex::new(user.map(str::to_string))),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.user.lock().expect("lock").clone()
    }

    fn current_email(&self) -> Option<String> {
        self.current_user_id().map(|u| format!("{u}@example.com"))
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<()> {
        Err(AuthError::Backend("static identity".to_string()).into())
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<()> {
        Err(AuthError::Backend("static identity".to_string()).into())
    }

    async fn send_password_reset(&self, _email: &str) -> Result<()> {
        Ok(())
    }

    async fn reauthenticate(&self, _password: &str) -> Result<()> {
        Ok(())
    }

    async fn change_email(&self, _new_email: &str) -> Result<()> {
        Ok(())
    }

    async fn change_password(&self, _new_password: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_account(&self) -> Result<()> {
        self.sign_out();
        Ok(())
    }

    fn sign_out(&self) {
        *self.user.lock().expect("lock") = None;
    }
}
