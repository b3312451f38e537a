use std::time::Duration;

use crate::error::LoaderError;

use super::{HttpRequest, Method, RawResponse, Transport};

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Builds an agent with a global timeout per request.
    ///
    /// HTTP error statuses are returned as responses, not errors, so status
    /// validation stays in [`super::SodaClient`].
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        let agent: ureq::Agent = config.into();

        Self { agent }
    }
}

fn with_headers<B>(
    mut request: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, LoaderError> {
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let result = match request.method {
            Method::Get => with_headers(self.agent.get(url), &request.headers).call(),
            Method::Delete => with_headers(self.agent.delete(url), &request.headers).call(),
            Method::Post => {
                let builder = with_headers(self.agent.post(url), &request.headers);
                match body {
                    Some(bytes) => builder.send(bytes),
                    None => builder.send_empty(),
                }
            }
            Method::Put => {
                let builder = with_headers(self.agent.put(url), &request.headers);
                match body {
                    Some(bytes) => builder.send(bytes),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|source| LoaderError::Transport {
            url: request.url.clone(),
            source,
        })?;

        let status = response.status();
        let message = status.canonical_reason().unwrap_or("Unknown").to_string();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|source| LoaderError::Transport {
                url: request.url.clone(),
                source,
            })?;

        tracing::trace!(url = %request.url, status = status.as_u16(), "Received response");

        Ok(RawResponse {
            status: status.as_u16(),
            message,
            body,
        })
    }
}
