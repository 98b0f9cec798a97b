//! Batch Orchestrator
//!
//! Sequences multi-step workflows (context export, bulk import,
//! compatibility sweeps) on top of the gateway, tracking per-item outcomes
//! and an aggregate status. Items run strictly in order within one job;
//! separate jobs may run in parallel. Jobs are synchronous values, not
//! durable background tasks.

use crate::error::{GatewayError, Result};
use crate::gateway::{Gateway, OperationRequest, OperationResult};
use crate::policy::{OperationKind, Scope};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchStatus {
    AllSucceeded,
    Partial,
    AllFailed,
}

impl BatchStatus {
    /// Aggregate status is a pure function of item outcomes. An empty job
    /// counts as all-succeeded (nothing failed).
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        if failed == 0 {
            BatchStatus::AllSucceeded
        } else if succeeded == 0 {
            BatchStatus::AllFailed
        } else {
            BatchStatus::Partial
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchItemReport {
    pub operation: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub result: OperationResult,
}

#[derive(Debug, Serialize)]
pub struct BatchJob {
    pub status: BatchStatus,
    pub succeeded: usize,
    pub failed: usize,
    /// Items not attempted because an earlier item failed under
    /// stop-on-first-failure.
    pub skipped: usize,
    pub items: Vec<BatchItemReport>,
}

pub struct BatchOrchestrator<'a> {
    gateway: &'a Gateway,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Execute the items in order. By default every item is attempted and
    /// a failure never aborts its siblings; with stop_on_first_failure the
    /// remaining items are skipped once one fails (used for migrations
    /// where later items depend on earlier ones).
    pub async fn run(
        &self,
        items: Vec<OperationRequest>,
        scopes: &[Scope],
        stop_on_first_failure: bool,
    ) -> BatchJob {
        let total = items.len();
        let mut reports = Vec::with_capacity(total);
        let mut succeeded = 0usize;
        let mut failed = 0usize;

        for request in items {
            let subject = request
                .payload
                .get("subject")
                .and_then(Value::as_str)
                .map(str::to_string);

            let result = match self.gateway.handle(&request, scopes).await {
                Ok(result) => {
                    succeeded += 1;
                    result
                }
                Err(err) => {
                    failed += 1;
                    OperationResult::failure(request.operation, request.registry.as_deref(), &err)
                }
            };

            let stop = stop_on_first_failure && !result.is_success();
            reports.push(BatchItemReport {
                operation: request.operation,
                subject,
                result,
            });
            if stop {
                break;
            }
        }

        let status = BatchStatus::from_counts(succeeded, failed);
        info!(
            "Batch finished: {:?} ({} succeeded, {} failed, {} skipped)",
            status,
            succeeded,
            failed,
            total - reports.len()
        );

        BatchJob {
            status,
            succeeded,
            failed,
            skipped: total - reports.len(),
            items: reports,
        }
    }

    /// Export every subject of a context: enumerate subjects at job start
    /// (upstream order, no snapshot isolation), then export each one.
    /// Subjects added concurrently after enumeration are not included.
    pub async fn export_context(
        &self,
        registry: Option<&str>,
        context: Option<&str>,
        scopes: &[Scope],
    ) -> Result<BatchJob> {
        let listing = self
            .gateway
            .handle(
                &OperationRequest::new(OperationKind::ListSubjects, registry, context, json!({})),
                scopes,
            )
            .await?;

        let subjects = subject_names(&listing)?;
        info!(
            "Exporting {} subject(s) from registry '{}'",
            subjects.len(),
            listing.registry.as_deref().unwrap_or("default")
        );

        let items = subjects
            .into_iter()
            .map(|subject| {
                OperationRequest::new(
                    OperationKind::ExportSubject,
                    registry,
                    context,
                    json!({ "subject": subject }),
                )
            })
            .collect();

        Ok(self.run(items, scopes, false).await)
    }

    /// Import a set of subject payloads (schema plus optional compatibility
    /// level each) into a context, one registration per subject.
    pub async fn import_context(
        &self,
        registry: Option<&str>,
        context: Option<&str>,
        subjects: Vec<Value>,
        scopes: &[Scope],
        stop_on_first_failure: bool,
    ) -> BatchJob {
        let items = subjects
            .into_iter()
            .map(|payload| {
                OperationRequest::new(OperationKind::ImportSubject, registry, context, payload)
            })
            .collect();

        self.run(items, scopes, stop_on_first_failure).await
    }

    /// Check a set of candidate schemas against a target registry, one
    /// compatibility check per subject.
    pub async fn compatibility_sweep(
        &self,
        registry: Option<&str>,
        context: Option<&str>,
        subjects: Vec<Value>,
        scopes: &[Scope],
    ) -> BatchJob {
        let items = subjects
            .into_iter()
            .map(|payload| {
                OperationRequest::new(OperationKind::CheckCompatibility, registry, context, payload)
            })
            .collect();

        self.run(items, scopes, false).await
    }
}

/// A subject listing must be a JSON array of strings.
fn subject_names(listing: &OperationResult) -> Result<Vec<String>> {
    let registry = listing.registry.clone().unwrap_or_default();
    listing
        .payload
        .as_ref()
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .ok_or_else(|| GatewayError::UpstreamRejected {
            registry,
            reason: "unexpected subject listing shape".to_string(),
        })
}
