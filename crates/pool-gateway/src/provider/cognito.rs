//! AWS Cognito user-pool provider.
//!
//! Wraps `aws-sdk-cognitoidentityprovider`. SDK-level retries are disabled:
//! throttling is surfaced as [`ErrorKind::Throttled`](super::ErrorKind) and the
//! listing backoff decides whether to wait and try again.

use super::{DirectoryProvider, ListingRequest, Page, ProviderError};
use crate::config::Config;
use crate::models::{GroupSummary, UserSummary};
use crate::observability::metrics::record_provider_call;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cognitoidentityprovider::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cognitoidentityprovider::primitives::DateTime as SdkDateTime;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, GroupType, UserStatusType, UserType};
use aws_sdk_cognitoidentityprovider::Client;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::instrument;

/// Cognito-backed [`DirectoryProvider`].
#[derive(Debug, Clone)]
pub struct CognitoProvider {
    client: Client,
    page_size: i32,
}

impl CognitoProvider {
    /// Wrap an existing SDK client.
    pub fn new(client: Client, page_size: i32) -> Self {
        Self { client, page_size }
    }

    /// Build the SDK client from gateway configuration.
    ///
    /// Credentials come from the default AWS provider chain.
    pub async fn from_config(config: &Config) -> Self {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.provider_timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(timeouts);

        if let Some(endpoint) = &config.provider_endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let sdk_config = loader.load().await;

        tracing::info!(
            target: "gw.provider.cognito",
            region = %config.region,
            page_size = config.page_size,
            endpoint_override = config.provider_endpoint_url.is_some(),
            "Cognito provider initialized"
        );

        Self::new(Client::new(&sdk_config), config.page_size)
    }
}

/// Convert an SDK error into a [`ProviderError`], recording the call outcome.
fn map_sdk_error<E>(operation: &'static str, err: E, started: Instant) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(&err).to_string(), str::to_string);
    let mapped = ProviderError::from_code(operation, err.code(), message);

    tracing::debug!(
        target: "gw.provider.cognito",
        operation,
        kind = %mapped.kind,
        code = mapped.code.as_deref().unwrap_or("none"),
        "Cognito call failed"
    );
    record_provider_call(operation, mapped.kind.as_str(), started.elapsed());

    mapped
}

fn record_success(operation: &'static str, started: Instant) {
    record_provider_call(operation, "success", started.elapsed());
}

fn to_chrono(value: Option<&SdkDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()))
}

fn attribute_map(attributes: &[AttributeType]) -> BTreeMap<String, String> {
    attributes
        .iter()
        .filter_map(|attr| {
            attr.value()
                .map(|value| (attr.name().to_string(), value.to_string()))
        })
        .collect()
}

fn build_user(
    username: &str,
    attributes: &[AttributeType],
    enabled: bool,
    status: Option<&UserStatusType>,
    created: Option<&SdkDateTime>,
) -> UserSummary {
    let attributes = attribute_map(attributes);
    UserSummary {
        username: username.to_string(),
        status: status.map(|s| s.as_str().to_string()),
        enabled,
        email: attributes.get("email").cloned(),
        attributes,
        created_at: to_chrono(created),
    }
}

fn user_from_sdk(user: &UserType) -> UserSummary {
    build_user(
        user.username().unwrap_or_default(),
        user.attributes(),
        user.enabled(),
        user.user_status(),
        user.user_create_date(),
    )
}

fn group_from_sdk(group: &GroupType) -> GroupSummary {
    GroupSummary {
        name: group.group_name().unwrap_or_default().to_string(),
        description: group.description().map(str::to_string),
        precedence: group.precedence(),
    }
}

#[async_trait]
impl DirectoryProvider for CognitoProvider {
    #[instrument(skip_all, name = "gw.provider.list_users_in_group", fields(cursor = request.cursor.is_some()))]
    async fn list_users_in_group(
        &self,
        request: &ListingRequest,
    ) -> Result<Page<UserSummary>, ProviderError> {
        const OPERATION: &str = "list_users_in_group";
        let started = Instant::now();

        let output = self
            .client
            .list_users_in_group()
            .user_pool_id(&request.pool_id)
            .set_group_name(request.group.clone())
            .limit(self.page_size)
            .set_next_token(request.cursor.clone())
            .send()
            .await
            .map_err(|e| map_sdk_error(OPERATION, e, started))?;

        record_success(OPERATION, started);
        let items = output.users().iter().map(user_from_sdk).collect();
        Ok(Page::new(items, output.next_token().map(str::to_string)))
    }

    #[instrument(skip_all, name = "gw.provider.list_groups", fields(cursor = request.cursor.is_some()))]
    async fn list_groups(
        &self,
        request: &ListingRequest,
    ) -> Result<Page<GroupSummary>, ProviderError> {
        const OPERATION: &str = "list_groups";
        let started = Instant::now();

        let output = self
            .client
            .list_groups()
            .user_pool_id(&request.pool_id)
            .limit(self.page_size)
            .set_next_token(request.cursor.clone())
            .send()
            .await
            .map_err(|e| map_sdk_error(OPERATION, e, started))?;

        record_success(OPERATION, started);
        let items = output.groups().iter().map(group_from_sdk).collect();
        Ok(Page::new(items, output.next_token().map(str::to_string)))
    }

    #[instrument(skip_all, name = "gw.provider.list_users", fields(cursor = request.cursor.is_some()))]
    async fn list_users(
        &self,
        request: &ListingRequest,
    ) -> Result<Page<UserSummary>, ProviderError> {
        const OPERATION: &str = "list_users";
        let started = Instant::now();

        let output = self
            .client
            .list_users()
            .user_pool_id(&request.pool_id)
            .limit(self.page_size)
            .set_pagination_token(request.cursor.clone())
            .send()
            .await
            .map_err(|e| map_sdk_error(OPERATION, e, started))?;

        record_success(OPERATION, started);
        let items = output.users().iter().map(user_from_sdk).collect();
        Ok(Page::new(
            items,
            output.pagination_token().map(str::to_string),
        ))
    }

    #[instrument(skip_all, name = "gw.provider.get_user")]
    async fn get_user(&self, pool_id: &str, username: &str) -> Result<UserSummary, ProviderError> {
        const OPERATION: &str = "get_user";
        let started = Instant::now();

        let output = self
            .client
            .admin_get_user()
            .user_pool_id(pool_id)
            .username(username)
            .send()
            .await
            .map_err(|e| map_sdk_error(OPERATION, e, started))?;

        record_success(OPERATION, started);
        Ok(build_user(
            output.username(),
            output.user_attributes(),
            output.enabled(),
            output.user_status(),
            output.user_create_date(),
        ))
    }

    #[instrument(skip_all, name = "gw.provider.add_user_to_group")]
    async fn add_user_to_group(
        &self,
        pool_id: &str,
        username: &str,
        group: &str,
    ) -> Result<(), ProviderError> {
        const OPERATION: &str = "add_user_to_group";
        let started = Instant::now();

        self.client
            .admin_add_user_to_group()
            .user_pool_id(pool_id)
            .username(username)
            .group_name(group)
            .send()
            .await
            .map_err(|e| map_sdk_error(OPERATION, e, started))?;

        record_success(OPERATION, started);
        Ok(())
    }

    #[instrument(skip_all, name = "gw.provider.remove_user_from_group")]
    async fn remove_user_from_group(
        &self,
        pool_id: &str,
        username: &str,
        group: &str,
    ) -> Result<(), ProviderError> {
        const OPERATION: &str = "remove_user_from_group";
        let started = Instant::now();

        self.client
            .admin_remove_user_from_group()
            .user_pool_id(pool_id)
            .username(username)
            .group_name(group)
            .send()
            .await
            .map_err(|e| map_sdk_error(OPERATION, e, started))?;

        record_success(OPERATION, started);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_from_sdk_collects_attributes() {
        let user = UserType::builder()
            .username("alice")
            .enabled(true)
            .user_status(UserStatusType::Confirmed)
            .attributes(
                AttributeType::builder()
                    .name("email")
                    .value("alice@example.com")
                    .build()
                    .unwrap(),
            )
            .attributes(
                AttributeType::builder()
                    .name("custom:team")
                    .value("platform")
                    .build()
                    .unwrap(),
            )
            .user_create_date(SdkDateTime::from_secs(1_700_000_000))
            .build();

        let summary = user_from_sdk(&user);
        assert_eq!(summary.username, "alice");
        assert!(summary.enabled);
        assert_eq!(summary.status.as_deref(), Some("CONFIRMED"));
        assert_eq!(summary.email.as_deref(), Some("alice@example.com"));
        assert_eq!(
            summary.attributes.get("custom:team").map(String::as_str),
            Some("platform")
        );
        assert_eq!(
            summary.created_at.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_attribute_without_value_is_skipped() {
        let attrs = vec![AttributeType::builder().name("phone_number").build().unwrap()];
        assert!(attribute_map(&attrs).is_empty());
    }

    #[test]
    fn test_group_from_sdk() {
        let group = GroupType::builder()
            .group_name("admins")
            .description("Pool administrators")
            .precedence(1)
            .build();

        let summary = group_from_sdk(&group);
        assert_eq!(summary.name, "admins");
        assert_eq!(summary.description.as_deref(), Some("Pool administrators"));
        assert_eq!(summary.precedence, Some(1));
    }
}
