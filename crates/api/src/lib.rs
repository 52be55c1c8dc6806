//! Topo reconciler entry point.
//!
//! A host hands one serialized `Topology` document to [`Reconciler::reconcile`]
//! and gets back either the expanded resources or a structured error. Each call
//! is synchronous and independent; no state survives between calls.

#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::{debug, warn};

use topo_core::ValidationErrors;
pub use topo_expand::{Expansion, Topology};

/// Requeue delay carried on every success; retry policy belongs to the host.
pub const REQUEUE_AFTER: Duration = Duration::from_secs(30);

const DEFAULT_MAX_INPUT_BYTES: usize = 1024 * 1024;
const DEFAULT_MAX_DOCUMENT_NODES: usize = 100_000;

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|s| s.parse::<usize>().ok())
}

/// Input budgets applied before a document is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub max_input_bytes: usize,
    pub max_document_nodes: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { max_input_bytes: DEFAULT_MAX_INPUT_BYTES, max_document_nodes: DEFAULT_MAX_DOCUMENT_NODES }
    }
}

impl ReconcileConfig {
    /// Defaults overridden by `TOPO_MAX_INPUT_BYTES` / `TOPO_MAX_DOCUMENT_NODES`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_input_bytes: env_usize("TOPO_MAX_INPUT_BYTES").unwrap_or(d.max_input_bytes),
            max_document_nodes: env_usize("TOPO_MAX_DOCUMENT_NODES").unwrap_or(d.max_document_nodes),
        }
    }
}

/// Successful reconcile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub requeue: bool,
    #[serde(with = "duration_secs")]
    pub requeue_after: Duration,
    pub result: Expansion,
}

impl ReconcileOutcome {
    pub fn done(result: Expansion) -> Self {
        Self { requeue: false, requeue_after: REQUEUE_AFTER, result }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Failed reconcile. Codes: 0 internal, 1 malformed input, 2 validation failed.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationErrors),
    #[error("internal: {0}")]
    Internal(String),
}

impl ReconcileError {
    pub fn code(&self) -> u32 {
        match self {
            ReconcileError::Internal(_) => 0,
            ReconcileError::MalformedInput(_) => 1,
            ReconcileError::ValidationFailed(_) => 2,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::Internal(_) => "internal",
            ReconcileError::MalformedInput(_) => "malformed_input",
            ReconcileError::ValidationFailed(_) => "validation_failed",
        }
    }

    /// The accumulated issue list of a validation failure.
    pub fn issues(&self) -> Option<&ValidationErrors> {
        match self {
            ReconcileError::ValidationFailed(errs) => Some(errs),
            _ => None,
        }
    }

    pub fn reply(&self) -> ErrorReply {
        ErrorReply { code: self.code(), message: self.to_string() }
    }
}

/// Error shape handed back across the host boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("reconcile error {code}: {message}")]
pub struct ErrorReply {
    pub code: u32,
    pub message: String,
}

impl From<&ReconcileError> for ErrorReply {
    fn from(e: &ReconcileError) -> Self { e.reply() }
}

pub type ReconcileResult = Result<ReconcileOutcome, ReconcileError>;

/// The single capability a host invokes.
pub trait Reconciler {
    fn reconcile(&self, input: &[u8]) -> ReconcileResult;
}

/// Reconciler for `Topology` documents.
#[derive(Debug, Clone, Default)]
pub struct TopologyReconciler {
    config: ReconcileConfig,
}

impl TopologyReconciler {
    pub fn new(config: ReconcileConfig) -> Self { Self { config } }

    pub fn config(&self) -> &ReconcileConfig { &self.config }

    /// Reconcile a document the host already decoded (e.g. from YAML).
    pub fn reconcile_value(&self, doc: Json) -> ReconcileResult {
        observe(|| {
            self.check_budget(&doc)?;
            expand_document(doc)
        })
    }

    fn check_budget(&self, doc: &Json) -> Result<(), ReconcileError> {
        if json_node_budget_exceeded(doc, self.config.max_document_nodes) {
            return Err(ReconcileError::MalformedInput(format!(
                "document too complex (>{} nodes)",
                self.config.max_document_nodes
            )));
        }
        Ok(())
    }
}

impl Reconciler for TopologyReconciler {
    fn reconcile(&self, input: &[u8]) -> ReconcileResult {
        observe(|| {
            debug!(bytes = input.len(), "reconcile invoked");
            if input.len() > self.config.max_input_bytes {
                return Err(ReconcileError::MalformedInput(format!(
                    "input too large (>{} bytes)",
                    self.config.max_input_bytes
                )));
            }
            let doc: Json = serde_json::from_slice(input).map_err(|e| ReconcileError::MalformedInput(format!("invalid JSON: {}", e)))?;
            self.check_budget(&doc)?;
            expand_document(doc)
        })
    }
}

fn expand_document(doc: Json) -> ReconcileResult {
    if !doc.is_object() {
        return Err(ReconcileError::MalformedInput("expected a JSON object at the document root".into()));
    }
    let topology: Topology = topo_expand::decode(&doc)?;
    let result = topology.expand()?;
    Ok(ReconcileOutcome::done(result))
}

fn observe(f: impl FnOnce() -> ReconcileResult) -> ReconcileResult {
    let t0 = Instant::now();
    counter!("reconcile_attempts", 1u64);
    let res = f();
    histogram!("reconcile_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
    match &res {
        Ok(out) => {
            counter!("reconcile_ok", 1u64);
            debug!(nodes = out.result.nodes.len(), links = out.result.links.len(), "reconcile succeeded");
        }
        Err(e) => {
            counter!("reconcile_err", 1u64, "kind" => e.kind());
            warn!(code = e.code(), error = %e, "reconcile failed");
        }
    }
    res
}

/// Host boundary in wire form: success is the serialized outcome, failure the `{code, message}` reply.
pub fn reconcile_wire<R: Reconciler + ?Sized>(reconciler: &R, input: &[u8]) -> Result<String, ErrorReply> {
    let outcome = reconciler.reconcile(input).map_err(|e| e.reply())?;
    serde_json::to_string(&outcome)
        .map_err(|e| ReconcileError::Internal(format!("serializing outcome: {}", e)).reply())
}

/// True when `v` holds more than `max` JSON values (objects, arrays and scalars alike).
fn json_node_budget_exceeded(v: &Json, max: usize) -> bool {
    let mut pending = vec![v];
    let mut seen = 0usize;
    while let Some(cur) = pending.pop() {
        seen += 1;
        if seen > max {
            return true;
        }
        match cur {
            Json::Object(map) => pending.extend(map.values()),
            Json::Array(arr) => pending.extend(arr.iter()),
            _ => {}
        }
    }
    false
}
