//! Summary of a finished workflow run.

use std::fmt;

use crate::config::PublishMethod;

/// What happened at the publish step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishStatus {
    /// Publishing was not requested.
    Skipped,
    Published { uid: String },
    /// Publication went through but returned a different UID.
    Mismatch { expected: String, actual: String },
}

/// The result of a completed workflow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowReport {
    pub domain: String,
    /// UID of the original dataset.
    pub uid: String,
    pub method: PublishMethod,
    pub draft_id: String,
    pub file_id: String,
    /// Id returned by the import once it finished.
    pub import_id: String,
    /// Set when the import was deferred behind a ticket.
    pub ticket: Option<String>,
    pub ticket_polls: usize,
    pub publication: PublishStatus,
}

impl fmt::Display for WorkflowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.method {
            PublishMethod::Replace => "Replace",
            PublishMethod::Append => "Append",
        };
        writeln!(
            f,
            "{} complete for https://{}/d/{}",
            verb, self.domain, self.draft_id
        )?;
        writeln!(f, "  file id:   {}", self.file_id)?;
        match &self.ticket {
            Some(ticket) => writeln!(
                f,
                "  ticket:    {} ({} poll(s))",
                ticket, self.ticket_polls
            )?,
            None => writeln!(f, "  ticket:    none (completed immediately)")?,
        }

        match &self.publication {
            PublishStatus::Skipped => writeln!(f, "  publish:   skipped"),
            PublishStatus::Published { uid } => {
                writeln!(f, "  publish:   https://{}/d/{}", self.domain, uid)
            }
            PublishStatus::Mismatch { expected, actual } => writeln!(
                f,
                "  publish:   UID MISMATCH (expected {}, got {})",
                expected,
                if actual.is_empty() { "nothing" } else { actual }
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(publication: PublishStatus, ticket: Option<&str>) -> WorkflowReport {
        WorkflowReport {
            domain: "data.example.gov".to_string(),
            uid: "abcd-1234".to_string(),
            method: PublishMethod::Replace,
            draft_id: "dddd-5678".to_string(),
            file_id: "F1".to_string(),
            import_id: "dddd-5678".to_string(),
            ticket: ticket.map(str::to_string),
            ticket_polls: 2,
            publication,
        }
    }

    #[test]
    fn display_names_draft_and_publication() {
        let text = report(
            PublishStatus::Published {
                uid: "abcd-1234".to_string(),
            },
            Some("T1"),
        )
        .to_string();
        assert!(text.starts_with("Replace complete for https://data.example.gov/d/dddd-5678"));
        assert!(text.contains("T1 (2 poll(s))"));
        assert!(text.contains("publish:   https://data.example.gov/d/abcd-1234"));
    }

    #[test]
    fn display_flags_mismatch() {
        let r = report(
            PublishStatus::Mismatch {
                expected: "abcd-1234".to_string(),
                actual: String::new(),
            },
            None,
        );
        let text = r.to_string();
        assert!(text.contains("UID MISMATCH (expected abcd-1234, got nothing)"));
        assert!(text.contains("completed immediately"));
    }
}
