//! Scripted registry client for dispatcher and batch tests.

use super::{ClientError, ClientResult, RegistryClient};
use crate::policy::OperationKind;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

pub enum MockOutcome {
    Ready(ClientResult<Value>),
    /// Never completes; exercises the dispatcher timeout.
    Hang,
}

#[derive(Default)]
pub struct MockRegistryClient {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    calls: Mutex<Vec<(OperationKind, String)>>,
}

impl MockRegistryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, value: Value) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(MockOutcome::Ready(Ok(value)));
    }

    pub fn push_transport_error(&self, cause: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(MockOutcome::Ready(Err(ClientError::Transport(
                cause.to_string(),
            ))));
    }

    pub fn push_http_error(&self, status: u16, body: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(MockOutcome::Ready(Err(ClientError::Http {
                status,
                body: body.to_string(),
            })));
    }

    pub fn push_hang(&self) {
        self.outcomes.lock().unwrap().push_back(MockOutcome::Hang);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(OperationKind, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryClient for MockRegistryClient {
    async fn perform(
        &self,
        kind: OperationKind,
        context: &str,
        _payload: &Value,
    ) -> ClientResult<Value> {
        self.calls.lock().unwrap().push((kind, context.to_string()));

        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(MockOutcome::Ready(result)) => result,
            Some(MockOutcome::Hang) => std::future::pending().await,
            // Unscripted calls succeed with a recognizable payload.
            None => Ok(json!({"ok": true})),
        }
    }

    async fn ping(&self) -> ClientResult<()> {
        Ok(())
    }
}
