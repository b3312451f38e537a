//! The publishing workflow.
//!
//! Runs four steps in a fixed order, each feeding the next:
//!
//! 1. create a draft copy of the dataset (polling while the API answers 202),
//! 2. upload and scan the source file,
//! 3. kick off the replace or append, polling its ticket when the import is
//!    deferred,
//! 4. optionally publish the draft and check the published UID.
//!
//! Any failure stops the workflow at the step that produced it.

pub mod report;

pub use report::{PublishStatus, WorkflowReport};

use std::fmt;
use std::fs;
use std::path::Path;

use url::form_urlencoded;

use crate::config::Config;
use crate::error::LoaderError;
use crate::http::{ApiResponse, FormPart, MultipartForm, SodaClient, Transport};
use crate::poll::{Poller, Sleeper};

/// Workflow steps, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    CreateDraftCopy,
    UploadAndScan,
    KickoffImport,
    Publish,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::CreateDraftCopy => "create draft copy",
            Step::UploadAndScan => "upload and scan",
            Step::KickoffImport => "kick off import",
            Step::Publish => "publish",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the import endpoint answered the kickoff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The import already finished (small files).
    Completed { id: String },
    /// The import was queued; poll the ticket for completion.
    Pending { ticket: String },
}

impl ImportOutcome {
    /// Decodes a kickoff response. `id` wins over `ticket`.
    pub fn from_response(response: &ApiResponse) -> Result<Self, LoaderError> {
        if let Some(id) = response.field("id") {
            return Ok(ImportOutcome::Completed { id });
        }
        if let Some(ticket) = response.field("ticket") {
            return Ok(ImportOutcome::Pending { ticket });
        }
        Err(LoaderError::UnrecognizedImportResponse {
            response: response.body.clone(),
        })
    }
}

/// Checks that publication produced the original dataset UID.
pub fn verify_publication(expected: &str, actual: Option<&str>) -> Result<(), LoaderError> {
    match actual {
        Some(actual) if actual == expected => Ok(()),
        other => Err(LoaderError::PublishMismatch {
            expected: expected.to_string(),
            actual: other.unwrap_or_default().to_string(),
        }),
    }
}

fn require_field(
    response: &ApiResponse,
    step: Step,
    field: &'static str,
) -> Result<String, LoaderError> {
    response
        .field(field)
        .ok_or_else(|| LoaderError::MissingField {
            step: step.name(),
            field,
            response: response.body.clone(),
        })
}

/// Drives the publishing workflow for one config.
pub struct WorkflowDriver<'a, T: Transport, S: Sleeper> {
    config: &'a Config,
    client: SodaClient<T>,
    poller: Poller<S>,
}

impl<'a, T: Transport, S: Sleeper> WorkflowDriver<'a, T, S> {
    pub fn new(config: &'a Config, client: SodaClient<T>, poller: Poller<S>) -> Self {
        Self {
            config,
            client,
            poller,
        }
    }

    /// Runs every step and returns a summary.
    ///
    /// A publish UID mismatch is logged and recorded in the report but does
    /// not fail the run: the import has already been applied.
    pub fn run(&mut self) -> Result<WorkflowReport, LoaderError> {
        let draft_id = self
            .create_draft_copy()
            .map_err(|err| abort(Step::CreateDraftCopy, err))?;
        let file_id = self
            .upload_and_scan()
            .map_err(|err| abort(Step::UploadAndScan, err))?;
        let import = self
            .kickoff_import(&draft_id, &file_id)
            .map_err(|err| abort(Step::KickoffImport, err))?;

        let publication = if self.config.publish {
            self.publish(&draft_id)
                .map_err(|err| abort(Step::Publish, err))?
        } else {
            tracing::debug!("Publishing disabled; leaving draft {} unpublished", draft_id);
            PublishStatus::Skipped
        };

        Ok(WorkflowReport {
            domain: self.config.socrata.domain.clone(),
            uid: self.config.uid.clone(),
            method: self.config.method,
            draft_id,
            file_id,
            import_id: import.id,
            ticket: import.ticket,
            ticket_polls: import.polls,
            publication,
        })
    }

    /// Creates the draft copy, waiting while the API reports 202.
    pub fn create_draft_copy(&mut self) -> Result<String, LoaderError> {
        let copy_method = self.config.method.copy_method();
        let path = format!(
            "/views/{}/publication.json?method={}",
            path_segment(&self.config.uid),
            copy_method
        );

        tracing::debug!("Creating draft copy via {}...", copy_method);
        let client = &mut self.client;
        let response = self.poller.poll_with(
            || client.post_now(&path, None),
            |response| !response.is_accepted(),
            |response| {
                if response.is_accepted() {
                    tracing::debug!("Waiting for draft copy...");
                }
            },
        )?;

        let draft_id = require_field(&response, Step::CreateDraftCopy, "id")?;
        tracing::debug!(
            "Created draft copy via {} with UID {}",
            copy_method,
            draft_id
        );
        Ok(draft_id)
    }

    /// Uploads the source file to the scan endpoint and returns its file id.
    pub fn upload_and_scan(&mut self) -> Result<String, LoaderError> {
        let path = &self.config.filename;
        let data = fs::read(path).map_err(|source| LoaderError::FileRead {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(
            "Uploading and scanning {} ({} bytes)",
            path.display(),
            data.len()
        );
        let form = MultipartForm::new().part(FormPart::file("file", path, data));
        let response = self.client.form_post("/imports2?method=scan", &form)?;

        let file_id = require_field(&response, Step::UploadAndScan, "fileId")?;
        tracing::debug!("Got fileId {} for {}", file_id, path.display());
        Ok(file_id)
    }

    /// Starts the replace or append and waits for it to finish.
    pub fn kickoff_import(
        &mut self,
        draft_id: &str,
        file_id: &str,
    ) -> Result<ImportResult, LoaderError> {
        let path = import_path(self.config, draft_id, file_id);

        tracing::debug!("Kicking off {}", self.config.method.import_method());
        let response = self.client.form_post(&path, &MultipartForm::new())?;

        match ImportOutcome::from_response(&response)? {
            ImportOutcome::Completed { id } => {
                tracing::debug!("Update already complete for {}", id);
                Ok(ImportResult {
                    id,
                    ticket: None,
                    polls: 0,
                })
            }
            ImportOutcome::Pending { ticket } => {
                tracing::debug!("Waiting on ticket {}", ticket);
                let (id, polls) = self.wait_for_ticket(&ticket)?;
                tracing::debug!(
                    "{} operation complete for https://{}/d/{}",
                    self.config.method.import_method(),
                    self.config.socrata.domain,
                    draft_id
                );
                Ok(ImportResult {
                    id,
                    ticket: Some(ticket),
                    polls,
                })
            }
        }
    }

    fn wait_for_ticket(&mut self, ticket: &str) -> Result<(String, usize), LoaderError> {
        let path = format!(
            "/imports2.json?{}",
            form_urlencoded::Serializer::new(String::new())
                .append_pair("ticket", ticket)
                .finish()
        );

        let mut polls = 0;
        let client = &mut self.client;
        let response = self.poller.poll_with(
            || client.get_now(&path),
            |response| response.field("id").is_some(),
            |response| {
                polls += 1;
                if response.field("id").is_none() {
                    tracing::debug!("Still waiting on {}", ticket);
                }
            },
        )?;

        let id = require_field(&response, Step::KickoffImport, "id")?;
        Ok((id, polls))
    }

    /// Publishes the draft copy and checks the resulting UID.
    pub fn publish(&mut self, draft_id: &str) -> Result<PublishStatus, LoaderError> {
        let path = format!("/views/{}/publication.json", path_segment(draft_id));
        let response = self.client.post_now(&path, None)?;
        let published = response.field("id");

        match verify_publication(&self.config.uid, published.as_deref()) {
            Ok(()) => {
                tracing::debug!(
                    "Publication was successful for https://{}/d/{}!",
                    self.config.socrata.domain,
                    self.config.uid
                );
                Ok(PublishStatus::Published {
                    uid: self.config.uid.clone(),
                })
            }
            Err(LoaderError::PublishMismatch { expected, actual }) => {
                tracing::error!(
                    "Something went wrong in publication, UIDs don't match: {}",
                    response.body
                );
                Ok(PublishStatus::Mismatch { expected, actual })
            }
            Err(other) => Err(other),
        }
    }
}

/// The finished import: its id, plus the ticket and poll count if it was
/// deferred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportResult {
    pub id: String,
    pub ticket: Option<String>,
    pub polls: usize,
}

/// Builds the import kickoff path, omitting parameters with no value.
pub fn import_path(config: &Config, draft_id: &str, file_id: &str) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("method", config.method.import_method());

    if let Some(name) = file_basename(&config.filename) {
        query.append_pair("name", &name);
    }
    if let Some(skip) = config.skip {
        query.append_pair("skip", &skip.to_string());
    }
    if !draft_id.is_empty() {
        query.append_pair("viewUid", draft_id);
    }
    if !file_id.is_empty() {
        query.append_pair("fileId", file_id);
    }

    format!("/imports2?{}", query.finish())
}

/// Percent-encodes a view id for use as a single path segment.
fn path_segment(id: &str) -> String {
    form_urlencoded::byte_serialize(id.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn file_basename(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
}

fn abort(step: Step, err: LoaderError) -> LoaderError {
    tracing::error!(step = step.name(), "{}", err);
    err
}
