//! Scripted provider for testing.
//!
//! Each list operation pops the next queued response; once a queue is empty
//! the operation returns an empty final page. Requested cursors are recorded
//! so tests can assert on traversal order.

use super::{DirectoryProvider, ErrorKind, ListingRequest, Page, ProviderError};
use crate::models::{GroupSummary, UserSummary};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

type Scripted<T> = Mutex<VecDeque<Result<Page<T>, ProviderError>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Mock [`DirectoryProvider`] driven by queued responses.
#[derive(Default)]
pub struct ScriptedProvider {
    group_members: Scripted<UserSummary>,
    groups: Scripted<GroupSummary>,
    users: Scripted<UserSummary>,
    known_users: Mutex<HashMap<String, UserSummary>>,
    memberships: Mutex<BTreeSet<(String, String)>>,
    mutation_error: Mutex<Option<ProviderError>>,
    cursors: Mutex<Vec<Option<String>>>,
    call_count: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `list_users_in_group`.
    pub fn push_group_members(self, response: Result<Page<UserSummary>, ProviderError>) -> Self {
        lock(&self.group_members).push_back(response);
        self
    }

    /// Queue a response for `list_groups`.
    pub fn push_groups(self, response: Result<Page<GroupSummary>, ProviderError>) -> Self {
        lock(&self.groups).push_back(response);
        self
    }

    /// Queue a response for `list_users`.
    pub fn push_users(self, response: Result<Page<UserSummary>, ProviderError>) -> Self {
        lock(&self.users).push_back(response);
        self
    }

    /// Register a user returned by `get_user`.
    pub fn with_user(self, user: UserSummary) -> Self {
        lock(&self.known_users).insert(user.username.clone(), user);
        self
    }

    /// Make every membership mutation fail with `error`.
    pub fn failing_mutations(self, error: ProviderError) -> Self {
        *lock(&self.mutation_error) = Some(error);
        self
    }

    /// Cursors passed to list operations, in call order.
    pub fn requested_cursors(&self) -> Vec<Option<String>> {
        lock(&self.cursors).clone()
    }

    /// Total number of provider calls made.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Whether `username` is currently recorded as a member of `group`.
    pub fn is_member(&self, username: &str, group: &str) -> bool {
        lock(&self.memberships).contains(&(group.to_string(), username.to_string()))
    }

    fn next_page<T>(
        &self,
        queue: &Scripted<T>,
        request: &ListingRequest,
    ) -> Result<Page<T>, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.cursors).push(request.cursor.clone());
        lock(queue)
            .pop_front()
            .unwrap_or_else(|| Ok(Page::last(Vec::new())))
    }

    fn mutate(&self, operation: &'static str) -> Result<(), ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match lock(&self.mutation_error).as_ref() {
            Some(err) => Err(ProviderError {
                operation,
                ..err.clone()
            }),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl DirectoryProvider for ScriptedProvider {
    async fn list_users_in_group(
        &self,
        request: &ListingRequest,
    ) -> Result<Page<UserSummary>, ProviderError> {
        self.next_page(&self.group_members, request)
    }

    async fn list_groups(
        &self,
        request: &ListingRequest,
    ) -> Result<Page<GroupSummary>, ProviderError> {
        self.next_page(&self.groups, request)
    }

    async fn list_users(
        &self,
        request: &ListingRequest,
    ) -> Result<Page<UserSummary>, ProviderError> {
        self.next_page(&self.users, request)
    }

    async fn get_user(&self, _pool_id: &str, username: &str) -> Result<UserSummary, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.known_users).get(username).cloned().ok_or_else(|| {
            ProviderError::from_code(
                "get_user",
                Some("UserNotFoundException"),
                "User does not exist.",
            )
        })
    }

    async fn add_user_to_group(
        &self,
        _pool_id: &str,
        username: &str,
        group: &str,
    ) -> Result<(), ProviderError> {
        self.mutate("add_user_to_group")?;
        lock(&self.memberships).insert((group.to_string(), username.to_string()));
        Ok(())
    }

    async fn remove_user_from_group(
        &self,
        _pool_id: &str,
        username: &str,
        group: &str,
    ) -> Result<(), ProviderError> {
        self.mutate("remove_user_from_group")?;
        lock(&self.memberships).remove(&(group.to_string(), username.to_string()));
        Ok(())
    }
}

/// Throttling error as the user-pool API reports it.
pub fn throttled(operation: &'static str) -> ProviderError {
    ProviderError::from_code(operation, Some("TooManyRequestsException"), "Rate exceeded")
}

/// Non-retryable error of the given kind.
pub fn hard_error(operation: &'static str, kind: ErrorKind) -> ProviderError {
    ProviderError::new(operation, kind, "scripted failure")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_pages_are_returned_in_order() {
        let provider = ScriptedProvider::new()
            .push_groups(Ok(Page::new(
                vec![GroupSummary::new("a")],
                Some("c1".to_string()),
            )))
            .push_groups(Err(throttled("list_groups")));

        let request = ListingRequest::pool("pool");
        let first = provider.list_groups(&request).await.unwrap();
        assert_eq!(first.next_cursor.as_deref(), Some("c1"));

        let second = provider.list_groups(&request).await.unwrap_err();
        assert_eq!(second.kind, ErrorKind::Throttled);

        // Exhausted queue yields an empty final page
        let third = provider.list_groups(&request).await.unwrap();
        assert!(third.items.is_empty());
        assert!(third.next_cursor.is_none());

        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_get_user_unknown_is_not_found() {
        let provider = ScriptedProvider::new().with_user(UserSummary::new("alice"));

        assert!(provider.get_user("pool", "alice").await.is_ok());
        let err = provider.get_user("pool", "bob").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_membership_mutations() {
        let provider = ScriptedProvider::new();
        provider
            .add_user_to_group("pool", "alice", "admins")
            .await
            .unwrap();
        assert!(provider.is_member("alice", "admins"));

        provider
            .remove_user_from_group("pool", "alice", "admins")
            .await
            .unwrap();
        assert!(!provider.is_member("alice", "admins"));
    }

    #[tokio::test]
    async fn test_failing_mutations_report_operation() {
        let provider = ScriptedProvider::new()
            .failing_mutations(hard_error("any", ErrorKind::PermissionDenied));

        let err = provider
            .add_user_to_group("pool", "alice", "admins")
            .await
            .unwrap_err();
        assert_eq!(err.operation, "add_user_to_group");
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
        assert!(!provider.is_member("alice", "admins"));
    }
}
