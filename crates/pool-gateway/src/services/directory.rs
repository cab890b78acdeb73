//! Directory operations on the user pool.
//!
//! Collection reads go through [`list_all`] so that every page is fetched
//! and throttling is absorbed by the backoff schedule. Single-record reads
//! and membership changes are one provider call each.

use crate::listing::{list_all, BackoffSchedule, IncompleteAggregate, Sleeper, TokioSleeper};
use crate::models::{GroupSummary, UserSummary};
use crate::provider::{DirectoryProvider, ListingRequest, ProviderError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Directory service bound to one user pool.
pub struct DirectoryService {
    provider: Arc<dyn DirectoryProvider>,
    sleeper: Arc<dyn Sleeper>,
    pool_id: String,
    backoff: Vec<Duration>,
}

impl DirectoryService {
    pub fn new(provider: Arc<dyn DirectoryProvider>, pool_id: String, backoff: Vec<Duration>) -> Self {
        Self {
            provider,
            sleeper: Arc::new(TokioSleeper),
            pool_id,
            backoff,
        }
    }

    /// Replace the backoff sleeper.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    fn schedule(&self) -> BackoffSchedule {
        BackoffSchedule::new(self.backoff.iter().copied())
    }

    /// Every group in the pool.
    ///
    /// # Errors
    ///
    /// [`IncompleteAggregate`] when the traversal stops early.
    #[instrument(skip_all, name = "gw.directory.list_groups")]
    pub async fn list_groups(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<GroupSummary>, IncompleteAggregate<GroupSummary>> {
        list_all(
            "list_groups",
            ListingRequest::pool(&self.pool_id),
            self.schedule(),
            move |request| async move { self.provider.list_groups(&request).await },
            self.sleeper.as_ref(),
            cancel,
        )
        .await
    }

    /// Every member of `group`.
    ///
    /// # Errors
    ///
    /// [`IncompleteAggregate`] when the traversal stops early.
    #[instrument(skip(self, cancel), name = "gw.directory.list_group_members")]
    pub async fn list_group_members(
        &self,
        group: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<UserSummary>, IncompleteAggregate<UserSummary>> {
        list_all(
            "list_users_in_group",
            ListingRequest::group_members(&self.pool_id, group),
            self.schedule(),
            move |request| async move { self.provider.list_users_in_group(&request).await },
            self.sleeper.as_ref(),
            cancel,
        )
        .await
    }

    /// Every user in the pool.
    ///
    /// # Errors
    ///
    /// [`IncompleteAggregate`] when the traversal stops early.
    #[instrument(skip_all, name = "gw.directory.list_users")]
    pub async fn list_users(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<UserSummary>, IncompleteAggregate<UserSummary>> {
        list_all(
            "list_users",
            ListingRequest::pool(&self.pool_id),
            self.schedule(),
            move |request| async move { self.provider.list_users(&request).await },
            self.sleeper.as_ref(),
            cancel,
        )
        .await
    }

    #[instrument(skip_all, name = "gw.directory.get_user")]
    pub async fn get_user(&self, username: &str) -> Result<UserSummary, ProviderError> {
        self.provider.get_user(&self.pool_id, username).await
    }

    #[instrument(skip_all, name = "gw.directory.add_membership")]
    pub async fn add_membership(&self, group: &str, username: &str) -> Result<(), ProviderError> {
        self.provider
            .add_user_to_group(&self.pool_id, username, group)
            .await?;
        tracing::info!(target: "gw.directory", group = %group, "Membership added");
        Ok(())
    }

    #[instrument(skip_all, name = "gw.directory.remove_membership")]
    pub async fn remove_membership(&self, group: &str, username: &str) -> Result<(), ProviderError> {
        self.provider
            .remove_user_from_group(&self.pool_id, username, group)
            .await?;
        tracing::info!(target: "gw.directory", group = %group, "Membership removed");
        Ok(())
    }
}
