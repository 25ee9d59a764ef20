use crate::config::TableConfig;
use crate::constants;
use crate::draft::{JsonMap, RegistrationDraft};
use crate::error::{RegistrarError, Result};
use crate::idempotency::compute_draft_fingerprint;
use crate::observability::metrics;
use crate::sections::{SectionId, SECTION_ORDER};
use crate::storage::{ObjectStore, RecordStore};
use crate::validate::{validate_section, ValidationResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of a sequential `advance` step.
#[derive(Debug)]
pub enum AdvanceOutcome {
    /// The active section failed validation; the cursor did not move.
    Rejected(ValidationResult),
    /// The draft was saved and the cursor moved to the named section.
    Moved(SectionId),
    /// The terminal section validated and the finalize pass ran.
    Finalized(FinalizeReport),
}

/// Outcome of an explicit save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Written,
    /// Nothing changed since the last successful save; no write was issued.
    Unchanged,
}

/// What the best-effort finalize pass managed to write. Education and
/// document failures are recorded here, not raised.
#[derive(Debug, Default, Clone)]
pub struct FinalizeReport {
    pub education_written: usize,
    pub education_failed: Vec<String>,
    pub documents_uploaded: usize,
    pub documents_failed: Vec<String>,
}

impl FinalizeReport {
    pub fn fully_clean(&self) -> bool {
        self.education_failed.is_empty() && self.documents_failed.is_empty()
    }
}

/// Walks a student through the fixed section order: validates each section
/// before forward progress, saves partial progress on demand, and performs
/// the final validated commit.
pub struct Wizard {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    tables: TableConfig,
    pub draft: RegistrationDraft,
    /// Fingerprint of the last successfully saved field map.
    last_saved: Option<String>,
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("record_id", &self.draft.record_id)
            .field("cursor", &self.draft.cursor)
            .field("completed", &self.draft.completed)
            .finish()
    }
}

impl Wizard {
    /// Loads the draft for the authenticated account and positions the
    /// cursor at the first section. A missing record is `NotFound`: the
    /// caller must send the student to account provisioning, which happens
    /// outside this flow. Already-completed records load normally so the
    /// student can revise and re-submit.
    #[instrument(skip(records, objects, tables))]
    pub async fn load_draft(
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        tables: TableConfig,
        account_email: &str,
    ) -> Result<Wizard> {
        let record = records
            .fetch_by_email(&tables.students, account_email)
            .await?
            .ok_or_else(|| RegistrarError::NotFound(account_email.to_string()))?;

        let draft = RegistrationDraft::from_record(record);
        info!(
            record_id = %draft.record_id,
            completed = draft.completed,
            "Loaded registration draft"
        );
        metrics::wizard::draft_loaded();

        // The loaded state is exactly what the store has
        let fingerprint = compute_draft_fingerprint(&draft.core_fields());
        Ok(Wizard {
            records,
            objects,
            tables,
            draft,
            last_saved: Some(fingerprint),
        })
    }

    /// Applies a single field edit to the in-memory draft. Marking the
    /// current address same as permanent copies the five permanent values
    /// at toggle time; later edits to the permanent block do not propagate.
    pub fn update_field(&mut self, field: &str, value: &str) {
        self.draft.apply_field_edit(field, value);
        if field == constants::CURRENT_SAME_AS_PERMANENT && value.eq_ignore_ascii_case("true") {
            debug!("Copied permanent address into current address fields");
        }
    }

    /// Pure section check; also callable standalone through `validate`.
    pub fn validate_section(&self, section: SectionId) -> ValidationResult {
        let result = validate_section(section, &self.draft);
        metrics::wizard::section_validated(section.title(), result.is_valid());
        result
    }

    /// Validates the active section; on success saves the draft and either
    /// steps forward one section or, from the terminal section, finalizes.
    /// Persistence failures surface as errors with the draft retained.
    #[instrument(skip(self))]
    pub async fn advance(&mut self) -> Result<AdvanceOutcome> {
        let section = self.draft.current_section();
        let result = self.validate_section(section);
        if let ValidationResult::Invalid { ref field, ref message } = result {
            debug!(section = %section, field = %field, %message, "Section rejected");
            return Ok(AdvanceOutcome::Rejected(result));
        }

        self.persist().await?;

        if section.is_last() {
            let report = self.finalize().await?;
            return Ok(AdvanceOutcome::Finalized(report));
        }

        self.draft.cursor += 1;
        let next = self.draft.current_section();
        debug!(from = %section, to = %next, "Advanced to next section");
        Ok(AdvanceOutcome::Moved(next))
    }

    /// Steps back one section. Backward movement is never validated.
    pub fn retreat(&mut self) {
        if self.draft.cursor > 0 {
            self.draft.cursor -= 1;
        }
    }

    /// Moves the cursor directly to a section, in either direction, without
    /// a validation gate. Backs the tab-style section selector.
    pub fn jump_to(&mut self, section: SectionId) {
        self.draft.cursor = section.index();
    }

    /// Writes the current field values to the student record. Idempotent:
    /// when nothing changed since the last successful save, no write is
    /// issued. A failed write keeps the in-memory draft so nothing the
    /// student typed is lost; the caller offers a retry.
    #[instrument(skip(self))]
    pub async fn persist(&mut self) -> Result<PersistOutcome> {
        let fields = self.draft.core_fields();
        let fingerprint = compute_draft_fingerprint(&fields);
        if self.last_saved.as_deref() == Some(fingerprint.as_str()) {
            debug!("Draft unchanged since last save, skipping write");
            metrics::persistence::save_skipped_unchanged();
            self.draft.persisted = true;
            return Ok(PersistOutcome::Unchanged);
        }

        match self
            .records
            .update(&self.tables.students, &self.draft.record_id, &fields)
            .await
        {
            Ok(()) => {
                self.last_saved = Some(fingerprint);
                self.draft.persisted = true;
                metrics::persistence::draft_saved();
                Ok(PersistOutcome::Written)
            }
            Err(e) => {
                metrics::persistence::save_failed();
                Err(e)
            }
        }
    }

    /// The terminal commit, as a best-effort ordered sequence:
    /// core fields (fatal on failure), education sub-records and document
    /// uploads (individually non-fatal, reported), then the completed flag
    /// (fatal on failure). Completion is favored over strict atomicity, so
    /// a completed registration may carry partial sub-data.
    #[instrument(skip(self))]
    pub async fn finalize(&mut self) -> Result<FinalizeReport> {
        metrics::wizard::finalize_attempt();
        let mut report = FinalizeReport::default();

        // (a) core fields; failure aborts the attempt
        self.persist().await?;

        // (b) one education row per populated level
        for row in self.draft.education_rows() {
            let level = row
                .get(constants::EDUCATION_LEVEL)
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            match self.records.insert(&self.tables.education, &row).await {
                Ok(()) => {
                    metrics::persistence::education_written(&level);
                    report.education_written += 1;
                }
                Err(e) => {
                    warn!(level = %level, error = %e, "Education record write failed, continuing");
                    metrics::persistence::education_failed(&level);
                    report.education_failed.push(level);
                }
            }
        }

        // (c) upload attachments and link their URLs
        let mut links = JsonMap::new();
        for doc in &mut self.draft.documents {
            if doc.url.is_some() {
                continue;
            }
            let path = format!("{}/{}", self.draft.record_id, doc.kind.name());
            match self
                .objects
                .upload(&self.tables.documents_bucket, &path, doc.bytes.clone(), &doc.content_type)
                .await
            {
                Ok(url) => {
                    doc.url = Some(url.clone());
                    links.insert(doc.kind.url_column().to_string(), Value::String(url));
                    metrics::persistence::document_uploaded(doc.kind.name());
                    report.documents_uploaded += 1;
                }
                Err(e) => {
                    warn!(kind = doc.kind.name(), error = %e, "Document upload failed, continuing");
                    metrics::persistence::document_upload_failed(doc.kind.name());
                    report.documents_failed.push(doc.kind.name().to_string());
                }
            }
        }
        if !links.is_empty() {
            for (column, url) in &links {
                if let Some(url) = url.as_str() {
                    self.draft.set_field(column, url);
                }
            }
            if let Err(e) = self
                .records
                .update(&self.tables.students, &self.draft.record_id, &links)
                .await
            {
                warn!(error = %e, "Linking document URLs failed, continuing");
            }
        }

        // (d) the completed flag; failure aborts the attempt
        let mut flag = JsonMap::new();
        flag.insert(constants::COMPLETED.to_string(), Value::Bool(true));
        self.records
            .update(&self.tables.students, &self.draft.record_id, &flag)
            .await?;

        self.draft.completed = true;
        metrics::wizard::finalize_completed();
        info!(
            record_id = %self.draft.record_id,
            education_written = report.education_written,
            documents_uploaded = report.documents_uploaded,
            "Registration finalized"
        );
        Ok(report)
    }

    /// Section-by-section validation snapshot for progress displays.
    pub fn progress(&self) -> Vec<(SectionId, ValidationResult)> {
        SECTION_ORDER
            .iter()
            .map(|section| (*section, validate_section(*section, &self.draft)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{DocumentFile, DocumentKind};
    use crate::storage::InMemoryBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn tables() -> TableConfig {
        TableConfig::default()
    }

    /// Record store that counts update calls and can be switched to fail.
    struct CountingStore {
        inner: InMemoryBackend,
        updates: AtomicUsize,
        fail_updates: Mutex<bool>,
    }

    impl CountingStore {
        fn new(inner: InMemoryBackend) -> Self {
            Self {
                inner,
                updates: AtomicUsize::new(0),
                fail_updates: Mutex::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            *self.fail_updates.lock().unwrap() = failing;
        }

        fn update_count(&self) -> usize {
            self.updates.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecordStore for CountingStore {
        async fn fetch_by_email(&self, table: &str, email: &str) -> crate::error::Result<Option<crate::draft::StoredRecord>> {
            self.inner.fetch_by_email(table, email).await
        }

        async fn update(&self, table: &str, id: &str, fields: &JsonMap) -> crate::error::Result<()> {
            if *self.fail_updates.lock().unwrap() {
                return Err(RegistrarError::Persistence {
                    message: "simulated outage".to_string(),
                });
            }
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.inner.update(table, id, fields).await
        }

        async fn insert(&self, table: &str, record: &JsonMap) -> crate::error::Result<()> {
            self.inner.insert(table, record).await
        }
    }

    /// Object store whose uploads always fail.
    struct FailingObjectStore;

    #[async_trait]
    impl ObjectStore for FailingObjectStore {
        async fn upload(&self, _bucket: &str, _path: &str, _bytes: Vec<u8>, _content_type: &str) -> crate::error::Result<String> {
            Err(RegistrarError::Persistence {
                message: "storage unavailable".to_string(),
            })
        }
    }

    fn photo() -> DocumentFile {
        DocumentFile {
            kind: DocumentKind::Photo,
            file_name: "photo.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8, 0xff],
            url: None,
        }
    }

    fn fill_identity(wizard: &mut Wizard) {
        wizard.update_field(constants::FIRST_NAME, "Asha");
        wizard.update_field(constants::LAST_NAME, "Verma");
        wizard.update_field(constants::EMAIL, "s@uni.edu");
        wizard.update_field(constants::MOBILE_NUMBER, "9876543210");
        wizard.update_field(constants::AADHAR_NUMBER, "123456789012");
    }

    fn fill_all_sections(wizard: &mut Wizard) {
        fill_identity(wizard);
        wizard.update_field(constants::DATE_OF_BIRTH, "2003-04-12");
        wizard.update_field(constants::GENDER, "female");
        wizard.update_field(constants::PERMANENT_ADDRESS_LINE, "12 College Rd");
        wizard.update_field(constants::PERMANENT_CITY, "Pune");
        wizard.update_field(constants::PERMANENT_DISTRICT, "Pune");
        wizard.update_field(constants::PERMANENT_STATE, "Maharashtra");
        wizard.update_field(constants::PERMANENT_PINCODE, "411001");
        wizard.update_field(constants::CURRENT_SAME_AS_PERMANENT, "true");
        wizard.update_field(constants::FATHER_NAME, "R Verma");
        wizard.update_field(constants::MOTHER_NAME, "S Verma");
        wizard.update_field("secondary_board", "State Board");
        wizard.update_field("secondary_year", "2019");
        wizard.update_field(constants::BANK_NAME, "State Bank");
        wizard.update_field(constants::ACCOUNT_HOLDER, "Asha Verma");
        wizard.update_field(constants::ACCOUNT_NUMBER, "123456789012");
        wizard.update_field(constants::IFSC_CODE, "SBIN0001234");
        wizard.draft.attach_document(photo());
        wizard.update_field(constants::EMERGENCY_NAME, "R Verma");
        wizard.update_field(constants::EMERGENCY_RELATION, "Father");
        wizard.update_field(constants::EMERGENCY_MOBILE, "9876501234");
        wizard.update_field(constants::EMERGENCY_ADDRESS, "12 College Rd, Pune");
    }

    async fn wizard_on(backend: Arc<InMemoryBackend>) -> Wizard {
        backend.provision_student(&tables().students, "s@uni.edu");
        Wizard::load_draft(backend.clone(), backend, tables(), "s@uni.edu")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn load_draft_not_found() {
        let backend = Arc::new(InMemoryBackend::new());
        let result = Wizard::load_draft(backend.clone(), backend, tables(), "nobody@uni.edu").await;
        assert!(matches!(result, Err(RegistrarError::NotFound(_))));
    }

    #[tokio::test]
    async fn advance_rejected_leaves_cursor() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut wizard = wizard_on(backend).await;
        wizard.update_field(constants::MOBILE_NUMBER, "12345");

        match wizard.advance().await.unwrap() {
            AdvanceOutcome::Rejected(ValidationResult::Invalid { field, .. }) => {
                assert_eq!(field, constants::MOBILE_NUMBER);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(wizard.draft.cursor, 0);
        // Repeated attempts stay put
        wizard.advance().await.unwrap();
        assert_eq!(wizard.draft.cursor, 0);
    }

    #[tokio::test]
    async fn advance_valid_saves_and_moves_one() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut wizard = wizard_on(backend.clone()).await;
        fill_identity(&mut wizard);

        match wizard.advance().await.unwrap() {
            AdvanceOutcome::Moved(next) => assert_eq!(next, SectionId::Personal),
            other => panic!("expected move, got {:?}", other),
        }
        assert_eq!(wizard.draft.cursor, 1);
        assert!(wizard.draft.persisted);

        let row = backend.record(&tables().students, &wizard.draft.record_id).unwrap();
        assert_eq!(row["mobile_number"], serde_json::json!("9876543210"));
    }

    #[tokio::test]
    async fn jump_and_retreat_skip_validation() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut wizard = wizard_on(backend).await;

        // Identity is empty and invalid, yet navigation is unrestricted
        wizard.jump_to(SectionId::Bank);
        assert_eq!(wizard.draft.cursor, SectionId::Bank.index());
        wizard.retreat();
        assert_eq!(wizard.draft.cursor, SectionId::Education.index());
        wizard.jump_to(SectionId::Identity);
        wizard.retreat();
        assert_eq!(wizard.draft.cursor, 0);
    }

    #[tokio::test]
    async fn same_as_permanent_copies_once() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut wizard = wizard_on(backend).await;

        wizard.update_field(constants::PERMANENT_ADDRESS_LINE, "12 College Rd");
        wizard.update_field(constants::PERMANENT_CITY, "Pune");
        wizard.update_field(constants::PERMANENT_DISTRICT, "Pune");
        wizard.update_field(constants::PERMANENT_STATE, "Maharashtra");
        wizard.update_field(constants::PERMANENT_PINCODE, "411001");
        wizard.update_field(constants::CURRENT_SAME_AS_PERMANENT, "true");

        for (permanent, current) in constants::ADDRESS_PAIRS {
            assert_eq!(wizard.draft.field(current), wizard.draft.field(permanent));
        }

        // One-way copy: later permanent edits do not propagate
        wizard.update_field(constants::PERMANENT_CITY, "Mumbai");
        assert_eq!(wizard.draft.field(constants::CURRENT_CITY), "Pune");
    }

    #[tokio::test]
    async fn persist_skips_unchanged_saves() {
        let backend = Arc::new(InMemoryBackend::new());
        let store_backend = InMemoryBackend::new();
        store_backend.provision_student(&tables().students, "s@uni.edu");
        let store = Arc::new(CountingStore::new(store_backend));

        let mut wizard = Wizard::load_draft(store.clone(), backend, tables(), "s@uni.edu")
            .await
            .unwrap();
        fill_identity(&mut wizard);

        assert_eq!(wizard.persist().await.unwrap(), PersistOutcome::Written);
        assert_eq!(wizard.persist().await.unwrap(), PersistOutcome::Unchanged);
        assert_eq!(store.update_count(), 1);

        wizard.update_field(constants::FIRST_NAME, "Usha");
        assert_eq!(wizard.persist().await.unwrap(), PersistOutcome::Written);
        assert_eq!(store.update_count(), 2);
    }

    #[tokio::test]
    async fn persist_failure_keeps_draft() {
        let backend = Arc::new(InMemoryBackend::new());
        let store_backend = InMemoryBackend::new();
        store_backend.provision_student(&tables().students, "s@uni.edu");
        let store = Arc::new(CountingStore::new(store_backend));

        let mut wizard = Wizard::load_draft(store.clone(), backend, tables(), "s@uni.edu")
            .await
            .unwrap();
        fill_identity(&mut wizard);
        store.set_failing(true);

        assert!(wizard.persist().await.is_err());
        assert_eq!(wizard.draft.field(constants::FIRST_NAME), "Asha");
        assert!(!wizard.draft.persisted);

        // Retry succeeds once the outage clears
        store.set_failing(false);
        assert_eq!(wizard.persist().await.unwrap(), PersistOutcome::Written);
    }

    #[tokio::test]
    async fn full_walk_completes_registration() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut wizard = wizard_on(backend.clone()).await;
        fill_all_sections(&mut wizard);

        let mut moved = 0;
        loop {
            match wizard.advance().await.unwrap() {
                AdvanceOutcome::Moved(_) => moved += 1,
                AdvanceOutcome::Finalized(report) => {
                    assert_eq!(report.education_written, 1);
                    assert!(report.fully_clean());
                    break;
                }
                AdvanceOutcome::Rejected(result) => panic!("unexpected rejection: {:?}", result),
            }
        }
        assert_eq!(moved, SECTION_ORDER.len() - 1);
        assert!(wizard.draft.completed);

        let row = backend.record(&tables().students, &wizard.draft.record_id).unwrap();
        assert_eq!(row["completed"], serde_json::json!(true));
        assert!(row["photo_url"].as_str().unwrap().starts_with("memory://"));
    }

    #[tokio::test]
    async fn finalize_survives_document_upload_failure() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.provision_student(&tables().students, "s@uni.edu");
        let mut wizard = Wizard::load_draft(backend.clone(), Arc::new(FailingObjectStore), tables(), "s@uni.edu")
            .await
            .unwrap();
        fill_all_sections(&mut wizard);
        wizard.jump_to(SectionId::Emergency);

        match wizard.advance().await.unwrap() {
            AdvanceOutcome::Finalized(report) => {
                assert_eq!(report.documents_uploaded, 0);
                assert_eq!(report.documents_failed, vec!["photo".to_string()]);
                assert_eq!(report.education_written, 1);
            }
            other => panic!("expected finalize, got {:?}", other),
        }

        assert!(wizard.draft.completed);
        let row = backend.record(&tables().students, &wizard.draft.record_id).unwrap();
        assert_eq!(row["completed"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn finalize_core_write_failure_is_fatal() {
        let backend = Arc::new(InMemoryBackend::new());
        let store_backend = InMemoryBackend::new();
        store_backend.provision_student(&tables().students, "s@uni.edu");
        let store = Arc::new(CountingStore::new(store_backend));

        let mut wizard = Wizard::load_draft(store.clone(), backend, tables(), "s@uni.edu")
            .await
            .unwrap();
        fill_all_sections(&mut wizard);
        store.set_failing(true);

        assert!(wizard.finalize().await.is_err());
        assert!(!wizard.draft.completed);
    }

    #[tokio::test]
    async fn completed_draft_reloads_at_first_section() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut wizard = wizard_on(backend.clone()).await;
        fill_all_sections(&mut wizard);
        wizard.jump_to(SectionId::Emergency);
        wizard.advance().await.unwrap();
        assert!(wizard.draft.completed);

        let reloaded = Wizard::load_draft(backend.clone(), backend, tables(), "s@uni.edu")
            .await
            .unwrap();
        assert!(reloaded.draft.completed);
        assert_eq!(reloaded.draft.cursor, 0);
    }

    #[tokio::test]
    async fn refinalize_is_a_safe_noop_transition() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut wizard = wizard_on(backend.clone()).await;
        fill_all_sections(&mut wizard);
        wizard.jump_to(SectionId::Emergency);
        wizard.advance().await.unwrap();

        // Submitting again re-runs the same finalize path
        wizard.jump_to(SectionId::Emergency);
        match wizard.advance().await.unwrap() {
            AdvanceOutcome::Finalized(_) => {}
            other => panic!("expected finalize, got {:?}", other),
        }
        assert!(wizard.draft.completed);

        // Education rows merged, not duplicated
        let rows = backend.rows(&tables().education);
        assert_eq!(rows.len(), 1);
    }
}
