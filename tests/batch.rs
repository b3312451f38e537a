use serde_json::Value;

use socrata_loader::batch::BatchOutcome;
use socrata_loader::http::{Method, SodaClient};
use socrata_loader::LoaderError;

mod common;

use common::{api, config, ScriptedTransport};

fn client(transport: &ScriptedTransport) -> SodaClient<&ScriptedTransport> {
    let config = config("replace", std::path::Path::new("data.csv"), "");
    SodaClient::new(&config.socrata, transport)
}

fn batch_items(transport: &ScriptedTransport, call: usize) -> Vec<Value> {
    let request = &transport.requests()[call];
    let body: Value =
        serde_json::from_slice(request.body.as_deref().expect("batch body")).expect("json body");
    body["requests"].as_array().expect("requests array").clone()
}

#[test]
fn flush_sends_one_request_with_every_queued_operation() {
    let transport = ScriptedTransport::new(vec![(200, r#"[{"id": 1}, {}, {"ok": true}]"#)]);
    let mut client = client(&transport);

    let outcomes = client
        .batch(|client| {
            client.get("/views/abcd-1234.json")?;
            client.put("/views/abcd-1234.json", Some(r#"{"name":"New"}"#.to_string()))?;
            client.delete("/views/efgh-5678.json")?;
            Ok(())
        })
        .expect("batch");

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| matches!(o, BatchOutcome::Success(_))));
    assert!(!client.is_batching());

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].url, api("/batches"));
    assert_eq!(requests[0].header("Content-Type"), Some("application/json"));

    let items = batch_items(&transport, 0);
    assert_eq!(
        items,
        vec![
            serde_json::json!({"url": "/views/abcd-1234.json", "requestType": "GET"}),
            serde_json::json!({
                "url": "/views/abcd-1234.json",
                "body": "{\"name\":\"New\"}",
                "requestType": "PUT"
            }),
            serde_json::json!({"url": "/views/efgh-5678.json", "requestType": "DELETE"}),
        ]
    );
}

#[test]
fn calls_after_a_batch_go_straight_to_the_network() {
    let transport = ScriptedTransport::new(vec![(200, "[{}]"), (200, r#"{"id": "x"}"#)]);
    let mut client = client(&transport);

    client
        .batch(|client| {
            client.post("/views/a/rows.json", None)?;
            Ok(())
        })
        .expect("batch");
    let response = client.get_now("/views/x.json").expect("direct get");

    assert_eq!(response.field("id").as_deref(), Some("x"));
    assert_eq!(
        transport.calls(),
        vec![
            format!("POST {}", api("/batches")),
            format!("GET {}", api("/views/x.json")),
        ]
    );
}

#[test]
fn short_response_array_is_a_protocol_error() {
    let transport = ScriptedTransport::new(vec![(200, "[{}]")]);
    let mut client = client(&transport);

    let err = client
        .batch(|client| {
            client.delete("/views/a.json")?;
            client.delete("/views/b.json")?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, LoaderError::BatchProtocol { .. }));
    assert!(!client.is_batching());
}

#[test]
fn object_response_is_a_protocol_error() {
    let transport = ScriptedTransport::new(vec![(200, r#"{"results": []}"#)]);
    let mut client = client(&transport);

    let err = client
        .batch(|client| {
            client.delete("/views/a.json")?;
            Ok(())
        })
        .unwrap_err();

    assert!(err.to_string().contains("Unexpected batch response shape"));
}

#[test]
fn operation_error_names_the_failing_request() {
    let transport = ScriptedTransport::new(vec![(
        200,
        r#"[{}, {}, {"error": true, "errorCode": "not_found", "errorMessage": "no such view"}]"#,
    )]);
    let mut client = client(&transport);

    let err = client
        .batch(|client| {
            client.get("/views/a.json")?;
            client.put("/views/b.json", Some("{}".to_string()))?;
            client.post("/views/c/publication.json", None)?;
            Ok(())
        })
        .unwrap_err();

    match err {
        LoaderError::BatchOperation {
            index,
            request_type,
            url,
            error_code,
            error_message,
        } => {
            assert_eq!(index, 2);
            assert_eq!(request_type, "POST");
            assert_eq!(url, "/views/c/publication.json");
            assert_eq!(error_code, "not_found");
            assert_eq!(error_message, "no such view");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_work_discards_the_queue_without_sending() {
    let transport = ScriptedTransport::new(vec![(200, r#"{"id": "direct"}"#)]);
    let mut client = client(&transport);

    let err = client
        .batch(|client| {
            client.delete("/views/a.json")?;
            Err(LoaderError::InvalidConfig("stop".to_string()))
        })
        .unwrap_err();

    assert!(matches!(err, LoaderError::InvalidConfig(_)));
    assert!(!client.is_batching());
    assert!(transport.requests().is_empty());

    client.get_now("/views/b.json").expect("direct call after failed batch");
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn nested_batches_fail_fast() {
    let transport = ScriptedTransport::default();
    let mut client = client(&transport);

    let err = client
        .batch(|client| {
            client.delete("/views/a.json")?;
            client.batch(|_| Ok(()))?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, LoaderError::NestedBatch));
    assert!(!client.is_batching());
    assert!(transport.requests().is_empty());
}

#[test]
fn empty_batch_makes_no_call() {
    let transport = ScriptedTransport::default();
    let mut client = client(&transport);

    let outcomes = client.batch(|_| Ok(())).expect("empty batch");

    assert!(outcomes.is_empty());
    assert!(transport.requests().is_empty());
}

#[test]
fn batch_endpoint_http_error_is_an_api_error() {
    let transport = ScriptedTransport::new(vec![(403, r#"{"message": "forbidden"}"#)]);
    let mut client = client(&transport);

    let err = client
        .batch(|client| {
            client.delete("/views/a.json")?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, LoaderError::Api { status: 403, .. }));
    assert!(!client.is_batching());
}

#[test]
fn panicking_work_still_closes_the_batch() {
    let transport = ScriptedTransport::new(vec![(200, r#"{"id": "after"}"#)]);
    let mut client = client(&transport);

    let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        client.batch(|client| {
            client.delete("/views/a.json")?;
            panic!("work failed mid-batch");
        })
    }));

    assert!(unwound.is_err());
    assert!(!client.is_batching());
    assert!(transport.requests().is_empty());

    let response = client.get_now("/views/b.json").expect("direct call after panic");
    assert_eq!(response.field("id").as_deref(), Some("after"));
    client.batch(|_| Ok(())).expect("a new batch can open");
}
