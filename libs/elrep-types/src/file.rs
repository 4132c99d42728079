use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Lifecycle of an uploaded file that the server processes in the
/// background after accepting the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    ReadyToProcess,
    Processing,
    Processed,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileProcessing {
    pub status: ProcessingStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileProcessing {
    /// Derives the status from the recorded timestamps the way the
    /// server stores them: an error wins, then completion, then start.
    pub fn status_from_timestamps(
        started_at: Option<OffsetDateTime>,
        completed_at: Option<OffsetDateTime>,
        error: Option<String>,
    ) -> Self {
        let status = match (&started_at, &completed_at, &error) {
            (_, _, Some(_)) => ProcessingStatus::Errored,
            (_, Some(_), None) => ProcessingStatus::Processed,
            (Some(_), None, None) => ProcessingStatus::Processing,
            (None, None, None) => ProcessingStatus::ReadyToProcess,
        };
        Self {
            status,
            started_at,
            completed_at,
            error,
        }
    }
}

/// The current file (if any) plus its processing record (if any), as
/// returned by the jurisdictions-file endpoint and consumed by the
/// upload widget.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<UploadedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing: Option<FileProcessing>,
}

impl FileInfo {
    /// A file is mid-processing when a processing record exists but has
    /// not completed.
    pub fn is_processing(&self) -> bool {
        matches!(&self.processing, Some(processing) if processing.completed_at.is_none())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_processing_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ProcessingStatus::ReadyToProcess).unwrap(),
            r#""READY_TO_PROCESS""#
        );
        assert_eq!(
            serde_json::to_string(&ProcessingStatus::Errored).unwrap(),
            r#""ERRORED""#
        );
    }

    #[test]
    fn test_status_from_timestamps() {
        let started = Some(datetime!(2021-08-26 07:48:50 UTC));
        let completed = Some(datetime!(2021-08-26 07:48:51 UTC));

        let processing = FileProcessing::status_from_timestamps(None, None, None);
        assert_eq!(processing.status, ProcessingStatus::ReadyToProcess);

        let processing = FileProcessing::status_from_timestamps(started, None, None);
        assert_eq!(processing.status, ProcessingStatus::Processing);

        let processing = FileProcessing::status_from_timestamps(started, completed, None);
        assert_eq!(processing.status, ProcessingStatus::Processed);

        let processing = FileProcessing::status_from_timestamps(
            started,
            completed,
            Some("Invalid Jurisdiction".to_owned()),
        );
        assert_eq!(processing.status, ProcessingStatus::Errored);
    }

    #[test]
    fn test_is_processing() {
        let mut info = FileInfo::default();
        assert!(!info.is_processing());

        info.processing = Some(FileProcessing {
            status: ProcessingStatus::Processing,
            started_at: Some(datetime!(2021-08-26 07:48:50 UTC)),
            completed_at: None,
            error: None,
        });
        assert!(info.is_processing());

        info.processing.as_mut().unwrap().completed_at = Some(datetime!(2021-08-26 07:48:51 UTC));
        assert!(!info.is_processing());
    }
}
