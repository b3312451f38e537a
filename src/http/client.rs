use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::batch::{self, BatchOutcome, BatchQueue, QueuedRequest};
use crate::config::SocrataConfig;
use crate::error::LoaderError;

use super::{
    ApiResponse, HttpRequest, Method, MultipartForm, RawResponse, Transport, UreqTransport,
};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Result of a call that may have been deferred into a batch.
#[derive(Debug)]
pub enum Reply {
    Sent(ApiResponse),
    /// The call was queued; its outcome arrives with the batch flush.
    Queued,
}

impl Reply {
    /// Returns the response of a call made outside a batch scope.
    pub fn into_response(self) -> Option<ApiResponse> {
        match self {
            Reply::Sent(response) => Some(response),
            Reply::Queued => None,
        }
    }
}

/// Authenticated client for one SODA domain.
///
/// Every response is validated: anything other than 200 or 202 is an
/// [`LoaderError::Api`]. Inside [`SodaClient::batch`], `get`, `post`, `put`
/// and `delete` are queued instead of sent.
pub struct SodaClient<T = UreqTransport> {
    transport: T,
    base_uri: String,
    headers: Vec<(String, String)>,
    queue: BatchQueue,
}

impl<T: Transport> SodaClient<T> {
    pub fn new(config: &SocrataConfig, transport: T) -> Self {
        let mut headers = vec![("X-App-Token".to_string(), config.app_token.clone())];

        // Basic auth only when both halves are present.
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            let encoded = BASE64.encode(format!("{username}:{password}"));
            headers.push(("Authorization".to_string(), format!("Basic {encoded}")));
        }

        Self {
            transport,
            base_uri: format!("https://{}/api", config.domain),
            headers,
            queue: BatchQueue::new(),
        }
    }

    pub fn is_batching(&self) -> bool {
        self.queue.is_batching()
    }

    /// Resolves an API path (with its query string) against the base URI.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_uri, path)
    }

    pub fn get(&mut self, path: &str) -> Result<Reply, LoaderError> {
        self.dispatch(Method::Get, path, None)
    }

    pub fn post(&mut self, path: &str, body: Option<String>) -> Result<Reply, LoaderError> {
        self.dispatch(Method::Post, path, body)
    }

    pub fn put(&mut self, path: &str, body: Option<String>) -> Result<Reply, LoaderError> {
        self.dispatch(Method::Put, path, body)
    }

    pub fn delete(&mut self, path: &str) -> Result<Reply, LoaderError> {
        self.dispatch(Method::Delete, path, None)
    }

    /// Like [`SodaClient::get`], but fails if the call was queued.
    pub fn get_now(&mut self, path: &str) -> Result<ApiResponse, LoaderError> {
        let reply = self.get(path)?;
        Self::require_sent(reply, Method::Get, path)
    }

    /// Like [`SodaClient::post`], but fails if the call was queued.
    pub fn post_now(
        &mut self,
        path: &str,
        body: Option<String>,
    ) -> Result<ApiResponse, LoaderError> {
        let reply = self.post(path, body)?;
        Self::require_sent(reply, Method::Post, path)
    }

    fn require_sent(
        reply: Reply,
        method: Method,
        path: &str,
    ) -> Result<ApiResponse, LoaderError> {
        reply.into_response().ok_or_else(|| LoaderError::BatchPending {
            request_type: method.to_string(),
            url: path.to_string(),
        })
    }

    fn dispatch(
        &mut self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<Reply, LoaderError> {
        if self.queue.is_batching() {
            tracing::trace!(%method, path, "Queued for batch");
            self.queue.push(QueuedRequest::new(method, path, body));
            return Ok(Reply::Queued);
        }

        self.send(method, path, body).map(Reply::Sent)
    }

    /// Sends a JSON request immediately, ignoring any open batch.
    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<ApiResponse, LoaderError> {
        let mut headers = self.headers.clone();
        headers.push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));

        let request = HttpRequest {
            method,
            url: self.url(path),
            headers,
            body: body.map(String::into_bytes),
        };
        self.execute(&request)
    }

    /// Posts a multipart form. Always immediate, even inside a batch scope.
    pub fn form_post(&self, path: &str, form: &MultipartForm) -> Result<ApiResponse, LoaderError> {
        let mut headers = self.headers.clone();
        headers.push(("Content-Type".to_string(), form.content_type()));

        let request = HttpRequest {
            method: Method::Post,
            url: self.url(path),
            headers,
            body: Some(form.encode()),
        };
        self.execute(&request)
    }

    fn execute(&self, request: &HttpRequest) -> Result<ApiResponse, LoaderError> {
        tracing::debug!(method = %request.method, url = %request.url, "Calling SODA API");
        let raw = self.transport.execute(request)?;
        check_response(raw)
    }

    /// Runs `work` in batch mode and flushes everything it queued as one
    /// `POST /batches`.
    ///
    /// The batch flag is reset and the queue emptied on every exit path. If
    /// `work` fails, nothing is sent and its error is returned. Returns one
    /// outcome per queued call, in order.
    ///
    /// # Errors
    /// [`LoaderError::NestedBatch`] if a batch is already open, any error from
    /// `work`, and the flush errors of [`batch::decode_batch_response`].
    pub fn batch<F>(&mut self, work: F) -> Result<Vec<BatchOutcome>, LoaderError>
    where
        F: FnOnce(&mut Self) -> Result<(), LoaderError>,
    {
        self.queue.begin()?;
        let (result, requests) = {
            let mut scope = BatchScope { client: self };
            let result = work(&mut *scope.client);
            (result, scope.client.queue.finish())
        };

        if let Err(err) = result {
            if !requests.is_empty() {
                tracing::warn!(
                    discarded = requests.len(),
                    "Batch aborted before flush; queued operations were not sent"
                );
            }
            return Err(err);
        }

        self.flush(&requests)
    }

    fn flush(&self, requests: &[QueuedRequest]) -> Result<Vec<BatchOutcome>, LoaderError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(operations = requests.len(), "Flushing batch");
        let body = batch::encode_batch_body(requests)?;
        let response = self.send(Method::Post, batch::BATCH_PATH, Some(body))?;
        batch::decode_batch_response(&response.body, requests)
    }
}

/// Closes the batch when dropped, so a panicking scope cannot leave the
/// client in batch mode.
struct BatchScope<'a, T: Transport> {
    client: &'a mut SodaClient<T>,
}

impl<T: Transport> Drop for BatchScope<'_, T> {
    fn drop(&mut self) {
        self.client.queue.finish();
    }
}

/// Validates a raw response: 200 and 202 pass, anything else is an API error.
pub fn check_response(raw: RawResponse) -> Result<ApiResponse, LoaderError> {
    match raw.status {
        200 | 202 => Ok(ApiResponse::from_raw(raw)),
        status => {
            tracing::debug!(status, body = %raw.body, "SODA API returned an error status");
            Err(LoaderError::Api {
                status,
                message: raw.message,
            })
        }
    }
}
