//! In-memory transport and reporter for use in testing other modules.
//!
//! The transport records every request it sees and answers from a list of canned replies,
//! falling back to `200 {}` for unmatched GETs and `201 {}` for anything else unmatched.

use crate::client::{AdminRequest, AdminResponse, Transport};
use crate::error::TransportError;
use crate::orchestrator::Stage;
use crate::report::{BootstrapReport, Reporter, StepRecord};
use reqwest::Method;
use std::cell::{Cell, RefCell};

#[derive(Debug, Clone)]
enum Reply {
    Status(u16, String),
    Unreachable,
}

#[derive(Debug, Default)]
pub(crate) struct StubTransport {
    // (method, URL suffix, reply); the first match wins.
    replies: Vec<(Method, String, Reply)>,
    requests: RefCell<Vec<AdminRequest>>,
}

impl StubTransport {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn respond(mut self, method: Method, suffix: &str, status: u16, body: &str) -> Self {
        self.replies.push((
            method,
            suffix.to_string(),
            Reply::Status(status, body.to_string()),
        ));
        self
    }

    pub(crate) fn unreachable(mut self, method: Method, suffix: &str) -> Self {
        self.replies
            .push((method, suffix.to_string(), Reply::Unreachable));
        self
    }

    /// Every request seen so far, in order.
    pub(crate) fn requests(&self) -> Vec<AdminRequest> {
        self.requests.borrow().clone()
    }

    /// Every request seen so far as "METHOD /path", with scheme and authority removed.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|request| {
                let path = request.url.splitn(4, '/').nth(3).unwrap_or_default();
                format!("{} /{}", request.method, path)
            })
            .collect()
    }
}

impl Transport for StubTransport {
    fn execute(&self, request: &AdminRequest) -> Result<AdminResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());

        let reply = self
            .replies
            .iter()
            .find(|(method, suffix, _)| *method == request.method && request.url.ends_with(suffix))
            .map(|(_, _, reply)| reply.clone())
            .unwrap_or_else(|| {
                let status = if request.method == Method::GET { 200 } else { 201 };
                Reply::Status(status, "{}".to_string())
            });

        match reply {
            Reply::Status(status, body) => Ok(AdminResponse { status, body }),
            Reply::Unreachable => Err(format!("connection refused: {}", request.url).into()),
        }
    }
}

/// Keeps everything it is told.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    stages: RefCell<Vec<Stage>>,
    records: RefCell<Vec<StepRecord>>,
    finished: Cell<bool>,
}

impl RecordingReporter {
    pub(crate) fn stages(&self) -> Vec<Stage> {
        self.stages.borrow().clone()
    }

    pub(crate) fn records(&self) -> Vec<StepRecord> {
        self.records.borrow().clone()
    }

    pub(crate) fn finished(&self) -> bool {
        self.finished.get()
    }
}

impl Reporter for RecordingReporter {
    fn stage(&self, stage: Stage) {
        self.stages.borrow_mut().push(stage);
    }

    fn step(&self, record: &StepRecord) {
        self.records.borrow_mut().push(record.clone());
    }

    fn finish(&self, _report: &BootstrapReport) {
        self.finished.set(true);
    }
}
