//! Fuzz target for `/batches` response decoding.
//!
//! Feeds arbitrary text to the batch decoder against a fixed queue of
//! requests, checking for panics on malformed or misaligned responses.

#![no_main]

use libfuzzer_sys::fuzz_target;
use socrata_loader::batch::{decode_batch_response, QueuedRequest};
use socrata_loader::http::Method;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };

    let requests = [
        QueuedRequest::new(Method::Get, "/views/abcd-1234.json", None),
        QueuedRequest::new(Method::Put, "/views/abcd-1234.json", Some("{}".to_string())),
        QueuedRequest::new(Method::Delete, "/views/efgh-5678.json", None),
    ];
    let _ = decode_batch_response(body, &requests);
});
