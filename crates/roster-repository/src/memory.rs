//! In-memory user repository for tests.
//!
//! Mirrors the PostgreSQL contract: sequential ids starting at 1, a unique
//! email constraint checked atomically with the insert, and id-ordered
//! listing. Lookups are counted so tests can assert on store traffic.

use crate::UserRepository;
use async_trait::async_trait;
use parking_lot::Mutex;
use roster_core::{RosterError, RosterResult, User, UserId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct Table {
    rows: BTreeMap<UserId, User>,
    next_id: i64,
}

/// In-memory repository with call counters.
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: Mutex<Table>,
    find_by_id_calls: AtomicUsize,
    find_all_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryUserRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with `(name, email)` rows.
    #[must_use]
    pub fn with_users(users: &[(&str, &str)]) -> Self {
        let repo = Self::new();
        {
            let mut table = repo.table.lock();
            for (name, email) in users {
                table.next_id += 1;
                let id = UserId::new(table.next_id);
                table.rows.insert(id, User::new(id, *name, *email));
            }
        }
        repo
    }

    /// Makes every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `find_by_id` calls so far.
    pub fn find_by_id_calls(&self) -> usize {
        self.find_by_id_calls.load(Ordering::SeqCst)
    }

    /// Number of `find_all_ordered` calls so far.
    pub fn find_all_calls(&self) -> usize {
        self.find_all_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> RosterResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RosterError::Database("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, name: &str, email: &str) -> RosterResult<User> {
        self.check_available()?;

        let mut table = self.table.lock();
        if table.rows.values().any(|u| u.email == email) {
            return Err(RosterError::conflict(format!("Email '{}' already exists", email)));
        }
        table.next_id += 1;
        let user = User::new(UserId::new(table.next_id), name, email);
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> RosterResult<Option<User>> {
        self.find_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.table.lock().rows.get(&id).cloned())
    }

    async fn find_all_ordered(&self) -> RosterResult<Vec<User>> {
        self.find_all_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.table.lock().rows.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = InMemoryUserRepository::new();
        let a = repo.insert("Ada", "ada@example.com").await.unwrap();
        let b = repo.insert("Bob", "bob@example.com").await.unwrap();
        assert_eq!(a.id, UserId::new(1));
        assert_eq!(b.id, UserId::new(2));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = InMemoryUserRepository::with_users(&[("Ada", "ada@example.com")]);
        let result = repo.insert("Other Ada", "ada@example.com").await;
        assert!(matches!(result, Err(RosterError::Conflict(_))));
        assert_eq!(repo.find_all_ordered().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inserts_one_wins() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let (a, b) = tokio::join!(
            repo.insert("First", "same@example.com"),
            repo.insert("Second", "same@example.com"),
        );
        assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
        assert!(a.is_err_and(|e| e.is_conflict()) || b.is_err_and(|e| e.is_conflict()));
    }

    #[tokio::test]
    async fn test_find_all_is_ordered_by_id() {
        let repo = InMemoryUserRepository::with_users(&[
            ("Ada", "ada@example.com"),
            ("Bob", "bob@example.com"),
            ("Cy", "cy@example.com"),
        ]);
        let ids: Vec<i64> = repo
            .find_all_ordered()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id.into_inner())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_with_database_error() {
        let repo = InMemoryUserRepository::with_users(&[("Ada", "ada@example.com")]);
        repo.set_unavailable(true);
        let result = repo.find_by_id(UserId::new(1)).await;
        assert!(matches!(result, Err(RosterError::Database(_))));
        assert_eq!(repo.find_by_id_calls(), 1);
    }
}
