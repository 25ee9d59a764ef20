//! Metrics for the registration workflow, following standard Prometheus
//! naming conventions.

use std::fmt;
use std::net::SocketAddr;

/// Enum representing all metric names used in the system
/// This eliminates magic strings and provides compile-time safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Wizard metrics
    DraftsLoaded,
    SectionsValidated,
    SectionsRejected,
    FinalizeAttempts,
    FinalizeCompleted,

    // Persistence metrics
    DraftSaves,
    DraftSavesSkipped,
    DraftSaveErrors,
    EducationRecordsWritten,
    EducationRecordFailures,
    DocumentsUploaded,
    DocumentUploadFailures,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            // Wizard metrics
            MetricName::DraftsLoaded => "registrar_drafts_loaded_total",
            MetricName::SectionsValidated => "registrar_sections_validated_total",
            MetricName::SectionsRejected => "registrar_sections_rejected_total",
            MetricName::FinalizeAttempts => "registrar_finalize_attempts_total",
            MetricName::FinalizeCompleted => "registrar_finalize_completed_total",

            // Persistence metrics
            MetricName::DraftSaves => "registrar_draft_saves_total",
            MetricName::DraftSavesSkipped => "registrar_draft_saves_skipped_total",
            MetricName::DraftSaveErrors => "registrar_draft_save_errors_total",
            MetricName::EducationRecordsWritten => "registrar_education_records_written_total",
            MetricName::EducationRecordFailures => "registrar_education_record_failures_total",
            MetricName::DocumentsUploaded => "registrar_documents_uploaded_total",
            MetricName::DocumentUploadFailures => "registrar_document_upload_failures_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Installs the Prometheus exporter when REGISTRAR_METRICS_PORT is set.
/// Without it, counters go to the no-op facade.
pub fn init_metrics() {
    let port: u16 = match std::env::var("REGISTRAR_METRICS_PORT").ok().and_then(|s| s.parse().ok()) {
        Some(port) => port,
        None => return,
    };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            tracing::info!("Prometheus exporter listening on http://{}/metrics", addr);
        }
        Err(e) => {
            tracing::warn!("Prometheus exporter install failed (possibly already installed): {}", e);
        }
    }
}

// ============================================================================
// Wizard Metrics
// ============================================================================

pub mod wizard {
    use super::MetricName;

    /// Record that a draft was loaded or resumed
    pub fn draft_loaded() {
        ::metrics::counter!(MetricName::DraftsLoaded.as_str()).increment(1);
    }

    /// Record a section validation outcome
    pub fn section_validated(section: &str, valid: bool) {
        let metric = if valid {
            MetricName::SectionsValidated
        } else {
            MetricName::SectionsRejected
        };
        ::metrics::counter!(metric.as_str(), "section" => section.to_string()).increment(1);
    }

    /// Record that a finalize pass started
    pub fn finalize_attempt() {
        ::metrics::counter!(MetricName::FinalizeAttempts.as_str()).increment(1);
    }

    /// Record that a finalize pass marked the registration complete
    pub fn finalize_completed() {
        ::metrics::counter!(MetricName::FinalizeCompleted.as_str()).increment(1);
    }
}

// ============================================================================
// Persistence Metrics
// ============================================================================

pub mod persistence {
    use super::MetricName;

    /// Record a successful draft save
    pub fn draft_saved() {
        ::metrics::counter!(MetricName::DraftSaves.as_str()).increment(1);
    }

    /// Record a save suppressed because nothing changed
    pub fn save_skipped_unchanged() {
        ::metrics::counter!(MetricName::DraftSavesSkipped.as_str()).increment(1);
    }

    /// Record a failed draft save
    pub fn save_failed() {
        ::metrics::counter!(MetricName::DraftSaveErrors.as_str()).increment(1);
    }

    /// Record an education sub-record write
    pub fn education_written(level: &str) {
        ::metrics::counter!(MetricName::EducationRecordsWritten.as_str(), "level" => level.to_string()).increment(1);
    }

    /// Record a swallowed education sub-record failure
    pub fn education_failed(level: &str) {
        ::metrics::counter!(MetricName::EducationRecordFailures.as_str(), "level" => level.to_string()).increment(1);
    }

    /// Record a document upload
    pub fn document_uploaded(kind: &str) {
        ::metrics::counter!(MetricName::DocumentsUploaded.as_str(), "kind" => kind.to_string()).increment(1);
    }

    /// Record a swallowed document upload failure
    pub fn document_upload_failed(kind: &str) {
        ::metrics::counter!(MetricName::DocumentUploadFailures.as_str(), "kind" => kind.to_string()).increment(1);
    }
}
