use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use campus_registrar::config::{Config, TableConfig};
use campus_registrar::constants;
use campus_registrar::draft::{DocumentFile, DocumentKind, RegistrationDraft};
use campus_registrar::infra::{HostedObjectStore, HostedRecordStore, HostedSessionProvider};
use campus_registrar::sections::SECTION_ORDER;
use campus_registrar::storage::{InMemoryBackend, ObjectStore, RecordStore, SessionProvider};
use campus_registrar::validate::{validate_section, ValidationResult};
use campus_registrar::wizard::{AdvanceOutcome, Wizard};
use campus_registrar::{logging, observability};

#[derive(Parser)]
#[command(name = "campus_registrar")]
#[command(about = "Student registration workflow for the campus platform")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a registration draft through every section and finalize it
    Complete {
        /// TOML file with the student's field values and document paths
        #[arg(long)]
        input: String,
        /// Backend to run against: memory or hosted
        #[arg(long, default_value = "memory")]
        backend: String,
    },
    /// Check an input file section by section without persisting anything
    Validate {
        /// TOML file with the student's field values and document paths
        #[arg(long)]
        input: String,
    },
    /// Show section progress for an existing draft
    Status {
        /// Account email; defaults to the active session
        #[arg(long)]
        email: Option<String>,
        /// Backend to run against: memory or hosted
        #[arg(long, default_value = "memory")]
        backend: String,
    },
}

/// Shape of the `complete`/`validate` input file.
#[derive(Debug, Deserialize)]
struct DraftInput {
    student: StudentInput,
    #[serde(default)]
    fields: BTreeMap<String, String>,
    /// Document kind -> path on disk
    #[serde(default)]
    documents: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StudentInput {
    email: String,
}

fn load_input(path: &str) -> anyhow::Result<DraftInput> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

fn content_type_for(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn read_documents(documents: &BTreeMap<String, String>) -> anyhow::Result<Vec<DocumentFile>> {
    let mut files = Vec::new();
    for (kind_name, path) in documents {
        let Some(kind) = DocumentKind::from_name(kind_name) else {
            warn!("Unknown document kind in input file: {}", kind_name);
            println!("⚠️  Unknown document kind: {}", kind_name);
            continue;
        };
        let bytes = std::fs::read(path)?;
        let file_name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(kind.name())
            .to_string();
        files.push(DocumentFile {
            kind,
            file_name,
            content_type: content_type_for(path).to_string(),
            bytes,
            url: None,
        });
    }
    Ok(files)
}

/// Field edits are applied in input order, except the address-copy toggle,
/// which reads the permanent block and therefore goes last.
fn apply_fields(wizard: &mut Wizard, fields: &BTreeMap<String, String>) {
    let mut fields = fields.clone();
    let toggle = fields.remove(constants::CURRENT_SAME_AS_PERMANENT);
    for (field, value) in &fields {
        wizard.update_field(field, value);
    }
    if let Some(value) = toggle {
        wizard.update_field(constants::CURRENT_SAME_AS_PERMANENT, &value);
    }
}

fn print_progress(progress: &[(campus_registrar::sections::SectionId, ValidationResult)]) {
    for (section, result) in progress {
        match result {
            ValidationResult::Valid => println!("   ✅ {}", section.title()),
            ValidationResult::Invalid { field, message } => {
                println!("   ❌ {} - {} ({})", section.title(), message, field)
            }
        }
    }
}

fn hosted_backend() -> anyhow::Result<(Arc<dyn RecordStore>, Arc<dyn ObjectStore>, TableConfig)> {
    let config = Config::load()?;
    let records: Arc<dyn RecordStore> = Arc::new(HostedRecordStore::from_config(&config.backend)?);
    let objects: Arc<dyn ObjectStore> = Arc::new(HostedObjectStore::from_config(&config.backend)?);
    Ok((records, objects, config.tables))
}

async fn resolve_email(email: Option<String>) -> anyhow::Result<String> {
    if let Some(email) = email {
        return Ok(email);
    }
    let config = Config::load()?;
    let sessions = HostedSessionProvider::from_config(&config.backend)?;
    match sessions.current_session().await? {
        Some(session) => Ok(session.email),
        None => anyhow::bail!("no active session; pass --email or sign in"),
    }
}

async fn run_complete(input_path: &str, backend: &str) -> anyhow::Result<()> {
    let input = load_input(input_path)?;
    let email = input.student.email.clone();

    let (records, objects, tables): (Arc<dyn RecordStore>, Arc<dyn ObjectStore>, TableConfig) =
        match backend {
            "memory" => {
                let memory = Arc::new(InMemoryBackend::new());
                // Account provisioning happens outside the wizard; seed it here
                let id = memory.provision_student(&TableConfig::default().students, &email);
                memory.sign_in(&id, &email);
                (memory.clone(), memory, TableConfig::default())
            }
            "hosted" => hosted_backend()?,
            other => anyhow::bail!("unknown backend: {} (expected memory or hosted)", other),
        };

    let mut wizard = Wizard::load_draft(records, objects, tables, &email).await?;
    apply_fields(&mut wizard, &input.fields);
    for document in read_documents(&input.documents)? {
        wizard.draft.attach_document(document);
    }

    println!("🔄 Completing registration for {}...", email);
    loop {
        let section = wizard.draft.current_section();
        match wizard.advance().await {
            Ok(AdvanceOutcome::Moved(next)) => {
                println!("   ✅ {} - moving to {}", section.title(), next.title());
            }
            Ok(AdvanceOutcome::Rejected(ValidationResult::Invalid { field, message })) => {
                println!("   ❌ {} - {} ({})", section.title(), message, field);
                anyhow::bail!("registration blocked at {}", section.title());
            }
            Ok(AdvanceOutcome::Rejected(ValidationResult::Valid)) => unreachable!(),
            Ok(AdvanceOutcome::Finalized(report)) => {
                println!("   ✅ {} - finalized", section.title());
                println!("\n📊 Registration complete:");
                println!("   Education records written: {}", report.education_written);
                println!("   Documents uploaded: {}", report.documents_uploaded);
                if !report.education_failed.is_empty() {
                    println!("   ⚠️  Education records failed: {}", report.education_failed.join(", "));
                }
                if !report.documents_failed.is_empty() {
                    println!("   ⚠️  Document uploads failed: {}", report.documents_failed.join(", "));
                }
                break;
            }
            Err(e) => {
                println!("   ⚠️  Save failed at {}: {} - your entries are kept, retry to continue", section.title(), e);
                return Err(e.into());
            }
        }
    }
    Ok(())
}

fn run_validate(input_path: &str) -> anyhow::Result<()> {
    let input = load_input(input_path)?;
    let mut draft = RegistrationDraft::empty(&input.student.email);

    let mut fields = input.fields.clone();
    let toggle = fields.remove(constants::CURRENT_SAME_AS_PERMANENT);
    for (field, value) in &fields {
        draft.apply_field_edit(field, value);
    }
    if let Some(value) = toggle {
        draft.apply_field_edit(constants::CURRENT_SAME_AS_PERMANENT, &value);
    }
    for document in read_documents(&input.documents)? {
        draft.attach_document(document);
    }

    println!("🔍 Validating {}...", input.student.email);
    let progress: Vec<_> = SECTION_ORDER
        .iter()
        .map(|section| (*section, validate_section(*section, &draft)))
        .collect();
    print_progress(&progress);

    let invalid = progress.iter().filter(|(_, r)| !r.is_valid()).count();
    if invalid > 0 {
        anyhow::bail!("{} section(s) need attention", invalid);
    }
    println!("✅ All sections valid");
    Ok(())
}

async fn run_status(email: Option<String>, backend: &str) -> anyhow::Result<()> {
    let (records, objects, tables, email): (Arc<dyn RecordStore>, Arc<dyn ObjectStore>, TableConfig, String) =
        match backend {
            "memory" => {
                let email = email.unwrap_or_else(|| "student@example.edu".to_string());
                let memory = Arc::new(InMemoryBackend::new());
                let id = memory.provision_student(&TableConfig::default().students, &email);
                memory.sign_in(&id, &email);
                (memory.clone(), memory, TableConfig::default(), email)
            }
            "hosted" => {
                let email = resolve_email(email).await?;
                let (records, objects, tables) = hosted_backend()?;
                (records, objects, tables, email)
            }
            other => anyhow::bail!("unknown backend: {} (expected memory or hosted)", other),
        };

    let wizard = Wizard::load_draft(records, objects, tables, &email).await?;
    println!(
        "📋 Registration for {} - {}",
        email,
        if wizard.draft.completed { "completed" } else { "in progress" }
    );
    println!("   Current section: {}", wizard.draft.current_section().title());
    print_progress(&wizard.progress());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();
    observability::init_metrics();

    let cli = Cli::parse();
    match cli.command {
        Commands::Complete { input, backend } => run_complete(&input, &backend).await,
        Commands::Validate { input } => run_validate(&input),
        Commands::Status { email, backend } => run_status(email, &backend).await,
    }
}
