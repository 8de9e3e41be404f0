//! Status polling without blocking
//!
//! Waiting for an eventually-consistent resource never sleeps in process:
//! the wrappers check the status once and either complete, or return a
//! [`LifecycleError::Retry`] so the orchestrator invokes the same operation
//! again later.

use crate::error::{LifecycleError, Result};
use crate::lifecycle::{Call, Operation};
use crate::runtime::{CREATE_CALLED, CREATE_RESPONSE, DELETE_CALLED};
use async_trait::async_trait;

/// Classification of a polled status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusClass {
    Good,
    Pending,
    /// A status outside the good and pending sets
    Bad(String),
    /// The resource, or its status, could not be found
    Missing,
}

/// Which statuses mean "ready" and which mean "keep waiting"
#[derive(Debug, Clone)]
pub struct StatusPolicy {
    pub good: Vec<String>,
    pub pending: Vec<String>,
    /// Fail when the status is missing; otherwise treat it as pending
    pub fail_on_missing: bool,
}

impl StatusPolicy {
    pub fn new(good: &[&str], pending: &[&str]) -> Self {
        Self {
            good: good.iter().map(|s| s.to_string()).collect(),
            pending: pending.iter().map(|s| s.to_string()).collect(),
            fail_on_missing: true,
        }
    }

    /// Tolerate resources whose status lags behind their creation
    pub fn allow_missing(mut self) -> Self {
        self.fail_on_missing = false;
        self
    }

    pub fn classify(&self, status: Option<&str>) -> StatusClass {
        match status {
            None => StatusClass::Missing,
            Some(s) if self.good.iter().any(|g| g == s) => StatusClass::Good,
            Some(s) if self.pending.iter().any(|p| p == s) => StatusClass::Pending,
            Some(s) => StatusClass::Bad(s.to_string()),
        }
    }
}

/// Statuses observed while a resource is going away
#[derive(Debug, Clone)]
pub struct DeletePolicy {
    pub deleted: Vec<String>,
    pub pending: Vec<String>,
}

impl DeletePolicy {
    pub fn new(deleted: &[&str], pending: &[&str]) -> Self {
        Self {
            deleted: deleted.iter().map(|s| s.to_string()).collect(),
            pending: pending.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for DeletePolicy {
    fn default() -> Self {
        Self::new(&["deleted"], &["deleting"])
    }
}

/// See [`wait_for_status`]
pub struct WaitForStatus<O> {
    policy: StatusPolicy,
    inner: O,
}

/// Run `inner` once per physical attempt, then require a good status.
///
/// `inner` is skipped once it has succeeded (`__create_called`) or when the
/// invocation started from a settled identity, so retries never repeat the
/// creation call. A failed `inner` leaves no marker and runs again on retry.
pub fn wait_for_status<O: Operation>(policy: StatusPolicy, inner: O) -> WaitForStatus<O> {
    WaitForStatus { policy, inner }
}

#[async_trait]
impl<O: Operation> Operation for WaitForStatus<O> {
    async fn run(&self, call: &mut Call<'_>) -> Result<()> {
        if call.created_before || call.runtime.contains(CREATE_CALLED) {
            tracing::debug!(
                resource = call.label().as_str(),
                "Create already issued, checking status"
            );
        } else {
            self.inner.run(call).await?;
            call.runtime.set(CREATE_CALLED, true);
        }

        let properties = call
            .handle
            .properties()
            .await
            .map_err(|e| call.sdk_error(&e))?;
        let status = properties
            .as_ref()
            .and_then(|p| call.handle.status_of(p));

        tracing::debug!(
            resource = call.label().as_str(),
            status = status.as_deref().unwrap_or("<none>"),
            "Polled status"
        );

        match self.policy.classify(status.as_deref()) {
            StatusClass::Good => {
                if let Some(properties) = properties {
                    if let Some(arn) = call.handle.arn_of(&properties) {
                        call.runtime.set_arn(arn);
                    }
                    call.runtime.set(CREATE_RESPONSE, properties);
                }
                if let Some(id) = call.handle.resource_id().map(String::from) {
                    call.runtime.set_resource_id(id);
                }
                call.runtime.clear_resource_config();
                tracing::info!(resource = call.label().as_str(), "Resource is ready");
                Ok(())
            }
            StatusClass::Pending => Err(LifecycleError::retry(
                format!("{} is still in a pending state.", call.label()),
                call.retry_after,
            )),
            StatusClass::Missing if !self.policy.fail_on_missing => Err(LifecycleError::retry(
                format!("{} has no status yet.", call.label()),
                call.retry_after,
            )),
            StatusClass::Missing => Err(LifecycleError::non_recoverable(format!(
                "{} no longer exists but \"fail_on_missing\" set",
                call.label()
            ))),
            StatusClass::Bad(status) => Err(LifecycleError::non_recoverable(format!(
                "{} reported an unexpected status: \"{}\"",
                call.label(),
                status
            ))),
        }
    }
}

/// See [`wait_for_delete`]
pub struct WaitForDelete<O> {
    policy: DeletePolicy,
    inner: O,
}

/// Run `inner` once per logical deletion attempt, then wait for absence.
///
/// On completion the runtime identity is cleared and the `__deleted` marker
/// set. A resource that is already absent, or that never received an
/// identifier, completes immediately.
pub fn wait_for_delete<O: Operation>(policy: DeletePolicy, inner: O) -> WaitForDelete<O> {
    WaitForDelete { policy, inner }
}

#[async_trait]
impl<O: Operation> Operation for WaitForDelete<O> {
    async fn run(&self, call: &mut Call<'_>) -> Result<()> {
        if call.handle.resource_id().is_none() {
            tracing::info!(
                resource_type = call.handle.type_name(),
                "No resource identifier recorded, nothing to delete"
            );
            call.runtime.mark_deleted();
            return Ok(());
        }

        if call.runtime.contains(DELETE_CALLED) {
            tracing::debug!(
                resource = call.label().as_str(),
                "Delete already issued, checking status"
            );
        } else {
            self.inner.run(call).await?;
            call.runtime.set(DELETE_CALLED, true);
        }

        let status = call.handle.status().await.map_err(|e| call.sdk_error(&e))?;

        match status.as_deref() {
            None => {
                tracing::info!(resource = call.label().as_str(), "Resource deleted");
                call.runtime.mark_deleted();
                Ok(())
            }
            Some(s) if self.policy.deleted.iter().any(|d| d == s) => {
                tracing::info!(resource = call.label().as_str(), "Resource deleted");
                call.runtime.mark_deleted();
                Ok(())
            }
            Some(s) if self.policy.pending.iter().any(|p| p == s) => {
                Err(LifecycleError::retry(
                    format!("{} is being deleted (status \"{}\").", call.label(), s),
                    call.retry_after,
                ))
            }
            Some(s) => Err(LifecycleError::non_recoverable(format!(
                "{} reported an unexpected status while deleting: \"{}\"",
                call.label(),
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let policy = StatusPolicy::new(&["available"], &["pending"]);
        assert_eq!(policy.classify(Some("available")), StatusClass::Good);
        assert_eq!(policy.classify(Some("pending")), StatusClass::Pending);
        assert_eq!(
            policy.classify(Some("failed")),
            StatusClass::Bad("failed".to_string())
        );
        assert_eq!(policy.classify(None), StatusClass::Missing);
        assert!(policy.fail_on_missing);
        assert!(!policy.allow_missing().fail_on_missing);
    }

    #[test]
    fn test_default_delete_policy() {
        let policy = DeletePolicy::default();
        assert_eq!(policy.deleted, vec!["deleted".to_string()]);
        assert_eq!(policy.pending, vec!["deleting".to_string()]);
    }
}
