//! In-memory gateway for controller tests: replays queued replies in order
//! and records every call it receives.

use super::{ContentGateway, GatewayError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Read(String),
    Submit(String, Value),
}

#[derive(Default)]
pub(crate) struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<Value, GatewayError>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, value: Value) -> Self {
        self.replies.lock().unwrap().push_back(Ok(value));
        self
    }

    pub(crate) fn fail(self, error: GatewayError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn push_reply(&self, value: Value) {
        self.replies.lock().unwrap().push_back(Ok(value));
    }

    pub(crate) fn push_failure(&self, error: GatewayError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next(&self, call: Call) -> Result<Value, GatewayError> {
        self.calls.lock().unwrap().push(call.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected gateway call: {:?}", call))
    }
}

#[async_trait]
impl ContentGateway for ScriptedGateway {
    async fn read(&self, path: &str) -> Result<Value, GatewayError> {
        self.next(Call::Read(path.to_string()))
    }

    async fn submit(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        self.next(Call::Submit(path.to_string(), body.clone()))
    }
}
