//! Batch queue and `/batches` response decoding.
//!
//! While a batch scope is open, mutating calls on [`crate::http::SodaClient`]
//! are recorded here instead of being sent. When the scope closes the queue
//! is submitted as a single `POST /batches`, and the positional response
//! array is checked against it.

use serde::Serialize;
use serde_json::Value;

use crate::error::LoaderError;
use crate::http::Method;

/// Path of the batch endpoint, relative to the API base.
pub const BATCH_PATH: &str = "/batches";

/// A request recorded during a batch scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub request_type: String,
}

impl QueuedRequest {
    pub fn new(method: Method, url: impl Into<String>, body: Option<String>) -> Self {
        Self {
            url: url.into(),
            body,
            request_type: method.as_str().to_string(),
        }
    }
}

#[derive(Serialize)]
struct BatchBody<'a> {
    requests: &'a [QueuedRequest],
}

/// Requests queued while batching, plus the batching flag.
///
/// Outside a batch scope the flag is false and the queue is empty.
#[derive(Debug, Default)]
pub struct BatchQueue {
    requests: Vec<QueuedRequest>,
    batching: bool,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_batching(&self) -> bool {
        self.batching
    }

    /// Opens a batch. Batches do not nest.
    pub fn begin(&mut self) -> Result<(), LoaderError> {
        if self.batching {
            return Err(LoaderError::NestedBatch);
        }
        self.batching = true;
        self.requests.clear();
        Ok(())
    }

    pub fn push(&mut self, request: QueuedRequest) {
        debug_assert!(self.batching, "push outside a batch scope");
        self.requests.push(request);
    }

    /// Closes the batch and hands back whatever was queued.
    pub fn finish(&mut self) -> Vec<QueuedRequest> {
        self.batching = false;
        std::mem::take(&mut self.requests)
    }
}

/// Serializes the body of a `/batches` request.
pub fn encode_batch_body(requests: &[QueuedRequest]) -> Result<String, LoaderError> {
    serde_json::to_string(&BatchBody { requests }).map_err(|source| LoaderError::InvalidJson {
        context: "batch request body".to_string(),
        source,
    })
}

/// Outcome of one operation inside a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchOutcome {
    Success(Value),
    Failed {
        error_code: String,
        error_message: String,
    },
}

impl BatchOutcome {
    fn from_value(value: Value) -> Self {
        let failed = match value.get("error") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(_) => true,
        };
        if !failed {
            return BatchOutcome::Success(value);
        }

        BatchOutcome::Failed {
            error_code: string_field(&value, "errorCode"),
            error_message: string_field(&value, "errorMessage"),
        }
    }
}

fn string_field(value: &Value, name: &str) -> String {
    match value.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Decodes a `/batches` response body into per-operation outcomes.
///
/// The result is positionally aligned with `requests`. Fails on a non-array
/// body, on a length mismatch, and on the first operation that reports an
/// error; operations before it are not reported.
pub fn decode_batch_response(
    body: &str,
    requests: &[QueuedRequest],
) -> Result<Vec<BatchOutcome>, LoaderError> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(body) else {
        return Err(LoaderError::BatchProtocol {
            message: format!("expected a JSON array, got: {}", truncate(body)),
        });
    };

    if items.len() != requests.len() {
        return Err(LoaderError::BatchProtocol {
            message: format!(
                "expected {} results, got {}",
                requests.len(),
                items.len()
            ),
        });
    }

    let mut outcomes = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let outcome = BatchOutcome::from_value(item);
        if let BatchOutcome::Failed {
            error_code,
            error_message,
        } = outcome
        {
            let request = &requests[index];
            return Err(LoaderError::BatchOperation {
                index,
                request_type: request.request_type.clone(),
                url: request.url.clone(),
                error_code,
                error_message,
            });
        }
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn truncate(body: &str) -> String {
    const LIMIT: usize = 200;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
