//! User database
//!
//! The whole user list lives in one JSON file that is read and rewritten on
//! every mutation. A mutex serializes read-modify-write cycles so concurrent
//! requests cannot drop each other's updates.
//!
//! Records are kept as raw JSON between reads and writes. Only the record
//! being changed goes through [`User`], so entries this code cannot fully
//! interpret are written back untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::storage::StorageError;
use crate::types::user::User;

pub struct UserStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl UserStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every readable user
    ///
    /// A missing file is created with the seed account. An empty or unparsable
    /// file reads as an empty list. Records that do not describe a user are
    /// skipped here but kept on disk.
    pub fn load(&self) -> Result<Vec<User>, StorageError> {
        let _guard = self.guard()?;
        Ok(self
            .read_records()?
            .into_iter()
            .filter_map(|record| match serde_json::from_value(record) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!("Skipping unreadable user record: {e}");
                    None
                }
            })
            .collect())
    }

    /// Overwrite the database with `users`
    pub fn save(&self, users: &[User]) -> Result<(), StorageError> {
        let _guard = self.guard()?;
        let records = users
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.write_records(&records)
    }

    pub fn find(&self, email: &str) -> Result<Option<User>, StorageError> {
        let _guard = self.guard()?;
        let records = self.read_records()?;
        match position(&records, email) {
            Some(i) => decode(&records[i], email).map(Some),
            None => Ok(None),
        }
    }

    /// Append a new user, refusing duplicate emails
    pub fn insert(&self, user: User) -> Result<User, StorageError> {
        let _guard = self.guard()?;
        let mut records = self.read_records()?;
        if position(&records, &user.email).is_some() {
            return Err(StorageError::UserExists(user.email));
        }
        records.push(serde_json::to_value(&user)?);
        self.write_records(&records)?;
        tracing::info!("Registered user {}", user.email);
        Ok(user)
    }

    /// Apply `f` to one user and persist the result
    pub fn update<F, R>(&self, email: &str, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(&mut User) -> R,
    {
        let _guard = self.guard()?;
        let mut records = self.read_records()?;
        let i = position(&records, email)
            .ok_or_else(|| StorageError::UserNotFound(email.to_string()))?;

        let mut user = decode(&records[i], email)?;
        let out = f(&mut user);
        records[i] = serde_json::to_value(&user)?;
        self.write_records(&records)?;
        Ok(out)
    }

    /// Run a store operation on the blocking thread pool
    pub async fn run<F, R>(self: &Arc<Self>, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(&UserStore) -> Result<R, StorageError> + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    pub async fn find_async(self: &Arc<Self>, email: &str) -> Result<Option<User>, StorageError> {
        let email = email.to_string();
        self.run(move |store| store.find(&email)).await
    }

    pub async fn insert_async(self: &Arc<Self>, user: User) -> Result<User, StorageError> {
        self.run(move |store| store.insert(user)).await
    }

    pub async fn update_async<F, R>(self: &Arc<Self>, email: &str, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(&mut User) -> R + Send + 'static,
        R: Send + 'static,
    {
        let email = email.to_string();
        self.run(move |store| store.update(&email, f)).await
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.lock.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn read_records(&self) -> Result<Vec<Value>, StorageError> {
        if !self.path.exists() {
            tracing::info!(
                "User database {} not found, creating it with the seed account",
                self.path.display()
            );
            let records = vec![serde_json::to_value(User::seed())?];
            self.write_records(&records)?;
            return Ok(records);
        }

        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&raw) {
            Ok(Value::Array(records)) => Ok(records),
            // valid JSON of the wrong shape is left alone rather than overwritten
            Ok(_) => Err(StorageError::NotAList),
            Err(e) => {
                tracing::error!("Failed to parse {}: {}", self.path.display(), e);
                Ok(Vec::new())
            }
        }
    }

    fn write_records(&self, records: &[Value]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // readers never see a half-written file
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!("Saved {} users", records.len());
        Ok(())
    }
}

fn position(records: &[Value], email: &str) -> Option<usize> {
    records
        .iter()
        .position(|r| r.get("email").and_then(Value::as_str) == Some(email))
}

fn decode(record: &Value, email: &str) -> Result<User, StorageError> {
    serde_json::from_value(record.clone()).map_err(|e| StorageError::InvalidRecord {
        email: email.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::user::SIGNUP_LIMIT;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> UserStore {
        UserStore::open(dir.path().join("users.json"))
    }

    #[test]
    fn test_missing_file_is_seeded() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let users = store.load().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "deneme@deneme.com");
        assert_eq!(users[0].limit, 50);
        assert!(store.path().exists());
    }

    #[test]
    fn test_empty_and_corrupt_files_read_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        fs::write(store.path(), "   \n").unwrap();
        assert!(store.load().unwrap().is_empty());

        fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.insert(User::new("a@b.com", "pw", SIGNUP_LIMIT)).unwrap();
        let err = store
            .insert(User::new("a@b.com", "other", SIGNUP_LIMIT))
            .unwrap_err();
        assert!(matches!(err, StorageError::UserExists(_)));
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_update_persists() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let remaining = store
            .update("deneme@deneme.com", |u| {
                u.used += 3;
                u.remaining()
            })
            .unwrap();
        assert_eq!(remaining, 47);

        let reloaded = store.find("deneme@deneme.com").unwrap().unwrap();
        assert_eq!(reloaded.used, 3);

        let missing = store.update("nobody@x.com", |u| u.used += 1);
        assert!(matches!(missing, Err(StorageError::UserNotFound(_))));
    }

    #[test]
    fn test_loose_records_survive_other_writes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"[
                {"email":"eski@musteri.com","password":"1","limit":12.5,"used":0,"memory":null},
                {"email":"bozuk@musteri.com","password":"2","memory":[1,2]},
                {"note":"kayıt değil"}
            ]"#,
        )
        .unwrap();

        store.insert(User::new("yeni@x.com", "pw", SIGNUP_LIMIT)).unwrap();

        let old = store.find("eski@musteri.com").unwrap().unwrap();
        assert_eq!(old.limit, 12);
        assert!(old.memory.is_empty());

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let records = raw.as_array().unwrap();
        assert_eq!(records.len(), 4);
        // untouched records keep their original values
        assert_eq!(records[0]["limit"], 12.5);
        assert_eq!(records[2]["note"], "kayıt değil");
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn test_odd_field_types_still_decode() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let raw = r#"[{"email":"b@c.com","password":["x"],"limit":{}}]"#;
        fs::write(store.path(), raw).unwrap();

        let user = store.find("b@c.com").unwrap().unwrap();
        assert_eq!(user.limit, 0);
        assert_eq!(user.password, r#"["x"]"#);
    }

    #[test]
    fn test_unreadable_record_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let original = r#"[{"email":"a@b.com","projects":[{"id":1}],"extra":{"k":1}},{"email":2}]"#;
        fs::write(store.path(), original).unwrap();

        store.update("a@b.com", |u| u.used += 1).unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        let raw: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw[1]["email"], 2);
        assert_eq!(raw[0]["used"], 1);
        assert_eq!(raw[0]["extra"]["k"], 1);
    }

    #[test]
    fn test_non_array_database_is_refused() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"users":[]}"#).unwrap();

        let err = store.insert(User::new("a@b.com", "pw", SIGNUP_LIMIT)).unwrap_err();
        assert!(matches!(err, StorageError::NotAList));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), r#"{"users":[]}"#);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));
        store.load().unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.update("deneme@deneme.com", |u| u.used += 1).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.find("deneme@deneme.com").unwrap().unwrap().used, 16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_async_inserts_and_updates() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));

        let mut tasks = Vec::new();
        for i in 0..10 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .insert_async(User::new(format!("u{i}@x.com"), "pw", SIGNUP_LIMIT))
                    .await
                    .unwrap();
                store
                    .update_async("deneme@deneme.com", |u| u.limit += 50)
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let users = store.load().unwrap();
        assert_eq!(users.len(), 11);
        let seed = store.find_async("deneme@deneme.com").await.unwrap().unwrap();
        assert_eq!(seed.limit, 550);
    }

    #[test]
    fn test_file_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.load().unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.starts_with("[\n  {"));
    }
}
