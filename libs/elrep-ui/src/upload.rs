//! Controller for the reusable single-file upload widget.
//!
//! The widget renders in one of two modes derived from the backing
//! [`FileInfo`]: editing (file picker + submit) when there is no file
//! or the file is mid-processing, and uploaded (file name, processing
//! outcome, replace/delete actions) otherwise. The upload and delete
//! callbacks stay with the caller; the controller only tracks the
//! interactive state and resets it whenever the backing file changes.

use elrep_types::file::{FileInfo, ProcessingStatus};
use time::format_description::FormatItem;
use time::macros::format_description;

const COMPLETED_AT_FORMAT: &[FormatItem<'static>] = format_description!(
    "[month]/[day]/[year], [hour repr:12 padding:none]:[minute]:[second] [period case:upper]"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetMode {
    /// Show the file picker and submit button.
    Editing,
    /// Show the current file with replace/delete actions.
    Uploaded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadWidget {
    file_info: FileInfo,
    enabled: bool,
    selected_file: Option<String>,
    submitting: bool,
    replacing: bool,
}

impl UploadWidget {
    pub fn new(file_info: FileInfo, enabled: bool) -> Self {
        Self {
            file_info,
            enabled,
            selected_file: None,
            submitting: false,
            replacing: false,
        }
    }

    pub fn file_info(&self) -> &FileInfo {
        &self.file_info
    }

    pub fn is_processing(&self) -> bool {
        self.file_info.is_processing()
    }

    pub fn mode(&self) -> WidgetMode {
        if self.file_info.file.is_none() || self.is_processing() || self.replacing {
            WidgetMode::Editing
        } else {
            WidgetMode::Uploaded
        }
    }

    /// Whether the picker/submit controls should render disabled.
    pub fn controls_disabled(&self) -> bool {
        self.submitting || self.is_processing() || !self.enabled
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected_file.as_deref()
    }

    pub fn select_file(&mut self, name: impl Into<String>) {
        if self.mode() == WidgetMode::Editing && !self.controls_disabled() {
            self.selected_file = Some(name.into());
        }
    }

    pub fn can_submit(&self) -> bool {
        self.selected_file.is_some() && !self.controls_disabled()
    }

    pub fn begin_submit(&mut self) {
        if self.can_submit() {
            self.submitting = true;
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Switches to editing mode to pick a replacement file.
    pub fn replace(&mut self) {
        if self.mode() == WidgetMode::Uploaded && self.enabled {
            self.replacing = true;
        }
    }

    /// Clears the interactive edit/submit state.
    pub fn reset(&mut self) {
        self.selected_file = None;
        self.submitting = false;
        self.replacing = false;
    }

    /// Adopts the latest [`FileInfo`] from the server. A change of the
    /// backing file identity (for example after a successful upload
    /// swaps in a new file) fully resets the interactive state.
    pub fn sync(&mut self, file_info: FileInfo) {
        if self.file_info != file_info {
            self.file_info = file_info;
            self.reset();
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_info.file.as_ref().map(|file| file.name.as_str())
    }

    pub fn error_message(&self) -> Option<&str> {
        self.file_info
            .processing
            .as_ref()
            .and_then(|processing| processing.error.as_deref())
    }

    /// The success line shown once processing finished cleanly, with
    /// the completion timestamp formatted for display.
    pub fn success_message(&self) -> Option<String> {
        let processing = self.file_info.processing.as_ref()?;
        if processing.status != ProcessingStatus::Processed {
            return None;
        }
        let completed_at = processing.completed_at?;
        let formatted = completed_at.format(COMPLETED_AT_FORMAT).ok()?;
        Some(format!("Upload successfully completed at {formatted}."))
    }
}

#[cfg(test)]
mod tests {
    use elrep_types::file::{FileProcessing, UploadedFile};
    use pretty_assertions::assert_eq;
    use time::macros::datetime;

    use super::*;

    fn uploaded_file_info() -> FileInfo {
        FileInfo {
            file: Some(UploadedFile {
                name: "results.json".to_owned(),
                uploaded_at: datetime!(2020-11-03 21:00:00 UTC),
            }),
            processing: Some(FileProcessing {
                status: ProcessingStatus::Processed,
                started_at: Some(datetime!(2020-11-03 21:00:01 UTC)),
                completed_at: Some(datetime!(2020-11-03 21:00:05 UTC)),
                error: None,
            }),
        }
    }

    #[test]
    fn test_no_file_means_editing() {
        let widget = UploadWidget::new(FileInfo::default(), true);
        assert_eq!(widget.mode(), WidgetMode::Editing);
        assert!(!widget.controls_disabled());
    }

    #[test]
    fn test_mid_processing_means_editing_with_disabled_controls() {
        let mut info = uploaded_file_info();
        info.processing = Some(FileProcessing {
            status: ProcessingStatus::Processing,
            started_at: Some(datetime!(2020-11-03 21:00:01 UTC)),
            completed_at: None,
            error: None,
        });
        let widget = UploadWidget::new(info, true);
        assert_eq!(widget.mode(), WidgetMode::Editing);
        assert!(widget.controls_disabled());
        assert!(!widget.can_submit());
    }

    #[test]
    fn test_uploaded_mode_messages() {
        let widget = UploadWidget::new(uploaded_file_info(), true);
        assert_eq!(widget.mode(), WidgetMode::Uploaded);
        assert_eq!(widget.file_name(), Some("results.json"));
        assert_eq!(widget.error_message(), None);
        assert_eq!(
            widget.success_message(),
            Some("Upload successfully completed at 11/03/2020, 9:00:05 PM.".to_owned())
        );
    }

    #[test]
    fn test_errored_processing_shows_error() {
        let mut info = uploaded_file_info();
        info.processing = Some(FileProcessing {
            status: ProcessingStatus::Errored,
            started_at: Some(datetime!(2020-11-03 21:00:01 UTC)),
            completed_at: Some(datetime!(2020-11-03 21:00:05 UTC)),
            error: Some("Invalid Jurisdiction".to_owned()),
        });
        let widget = UploadWidget::new(info, true);
        assert_eq!(widget.mode(), WidgetMode::Uploaded);
        assert_eq!(widget.error_message(), Some("Invalid Jurisdiction"));
        assert_eq!(widget.success_message(), None);
    }

    #[test]
    fn test_disabled_by_caller() {
        let mut widget = UploadWidget::new(FileInfo::default(), false);
        assert!(widget.controls_disabled());
        widget.select_file("results.json");
        assert_eq!(widget.selected_file(), None);
    }

    #[test]
    fn test_submit_lifecycle() {
        let mut widget = UploadWidget::new(FileInfo::default(), true);
        widget.begin_submit();
        assert!(!widget.is_submitting());

        widget.select_file("results.json");
        assert!(widget.can_submit());
        widget.begin_submit();
        assert!(widget.is_submitting());
        assert!(widget.controls_disabled());
    }

    #[test]
    fn test_sync_resets_on_identity_change() {
        let mut widget = UploadWidget::new(FileInfo::default(), true);
        widget.select_file("results.json");
        widget.begin_submit();

        // same file info: no reset
        widget.sync(FileInfo::default());
        assert!(widget.is_submitting());

        // new file info swapped in after a successful upload
        widget.sync(uploaded_file_info());
        assert!(!widget.is_submitting());
        assert_eq!(widget.selected_file(), None);
        assert_eq!(widget.mode(), WidgetMode::Uploaded);
    }

    #[test]
    fn test_replace_switches_to_editing() {
        let mut widget = UploadWidget::new(uploaded_file_info(), true);
        widget.replace();
        assert_eq!(widget.mode(), WidgetMode::Editing);
        assert!(!widget.controls_disabled());

        widget.reset();
        assert_eq!(widget.mode(), WidgetMode::Uploaded);
    }
}
