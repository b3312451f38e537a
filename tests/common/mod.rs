#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use socrata_loader::config::{from_yaml_str, Config};
use socrata_loader::http::{HttpRequest, RawResponse, Transport};
use socrata_loader::poll::Sleeper;
use socrata_loader::LoaderError;

/// Transport that answers requests from a fixed script, in order, and
/// records everything it was sent.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<RawResponse>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<(u16, &str)>) -> Self {
        Self {
            responses: RefCell::new(
                responses
                    .into_iter()
                    .map(|(status, body)| RawResponse::new(status, body))
                    .collect(),
            ),
            requests: RefCell::default(),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    /// `METHOD url` for every request sent, in order.
    pub fn calls(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|r| format!("{} {}", r.method, r.url))
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, LoaderError> {
        self.requests.borrow_mut().push(request.clone());
        let next = self.responses.borrow_mut().pop_front();
        Ok(next.unwrap_or_else(|| panic!("no scripted response for {}", request.url)))
    }
}

/// Sleeper that records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

pub const DOMAIN: &str = "data.example.gov";

pub fn api(path: &str) -> String {
    format!("https://{DOMAIN}/api{path}")
}

/// Builds a config pointing at `filename`, with extra top-level YAML lines.
pub fn config(method: &str, filename: &Path, extra: &str) -> Config {
    let yaml = format!(
        "socrata:\n  username: loader\n  password: secret\n  app_token: APP\n  domain: {DOMAIN}\n\
         uid: abcd-1234\nmethod: {method}\nfilename: '{}'\n{extra}",
        filename.display()
    );
    let config = from_yaml_str(&yaml).expect("parse test config");
    config.validate().expect("valid test config");
    config
}

/// Writes a small CSV and returns the temp dir holding it.
pub fn csv_file(name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(name);
    std::fs::write(&path, "name,count\nalpha,1\nbeta,2\n").expect("write csv");
    (dir, path)
}
