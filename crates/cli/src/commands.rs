use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::Path;

use tally_core::{CategoryCatalog, DateFormat, Issue, IssueKind, LedgerRecord, RunReport, Workbook};
use tally_extract::{DirectoryDocumentSource, Extractor, PaystubPipeline};
use tally_import::{import_statements, normalize, read_sheet, write_sheet};
use tally_rollover::{PeriodState, RolloverEngine};
use tally_storage::{create_db, recent_runs, record_run, LedgerSession};

use crate::config::Settings;

pub fn parse_today(today: Option<&str>) -> Result<NaiveDate> {
    match today {
        Some(s) => DateFormat::ShortYear
            .parse(s)
            .with_context(|| format!("Invalid --today '{s}'")),
        None => Ok(Local::now().date_naive()),
    }
}

fn engine(settings: &Settings) -> Result<RolloverEngine> {
    let catalog = CategoryCatalog::load(&settings.paths.categories).with_context(|| {
        format!("Failed to load category catalog {}", settings.paths.categories.display())
    })?;
    Ok(RolloverEngine::new(settings.layout.tracking.clone(), catalog)
        .with_cadence(settings.cadence()?)
        .with_max_periods(settings.rollover.max_periods_per_run))
}

async fn open_session(settings: &Settings) -> Result<LedgerSession> {
    LedgerSession::open(&settings.paths.workbook)
        .await
        .with_context(|| format!("Failed to open ledger {}", settings.paths.workbook.display()))
}

fn paystub_pipeline(settings: &Settings) -> PaystubPipeline<DirectoryDocumentSource> {
    let source = DirectoryDocumentSource::new(&settings.paths.paystubs).with_extension(&settings.paystub.extension);
    PaystubPipeline::new(source)
        .with_offset_days(settings.paystub.offset_days)
}

/// Bring in whatever the ledger's inputs hold: new retirement statements are
/// written to the workbook, and paystub and expense-log records are returned.
fn gather(settings: &Settings, workbook: &mut Workbook, report: &mut RunReport) -> Vec<LedgerRecord> {
    let statements = &settings.paths.statements;
    if statements.is_dir() {
        match import_statements(workbook, &settings.layout.retirement, statements) {
            Ok(import) => {
                tracing::info!("Recorded {} retirement statements", import.recorded.len());
                report.extend(import.issues);
            }
            Err(e) => {
                tracing::warn!("Retirement statements not imported: {e}");
                report.push(Issue::new(IssueKind::MalformedInput, "retirement", e.to_string()));
            }
        }
    } else {
        tracing::debug!("No statement directory at {}", statements.display());
    }

    let mut records = Vec::new();
    if settings.paths.paystubs.is_dir() {
        match paystub_pipeline(settings).import_all() {
            Ok(import) => {
                tracing::info!("Imported {} paystubs", import.paystubs.len());
                records.extend(import.records);
                report.extend(import.issues);
            }
            Err(e) => {
                tracing::warn!("Paystubs not imported: {e}");
                report.push(Issue::new(IssueKind::ParseAbsence, "paystubs", e.to_string()));
            }
        }
    } else {
        tracing::debug!("No paystub directory at {}", settings.paths.paystubs.display());
    }

    let normalized = normalize(&*workbook, &settings.layout.sources);
    records.extend(normalized.records);
    report.extend(normalized.issues);
    records
}

pub async fn run(settings: &Settings, today: NaiveDate, dry_run: bool) -> Result<()> {
    let started_at = Local::now().naive_local();
    let engine = engine(settings)?;
    let mut session = open_session(settings).await?;

    let mut report = RunReport::new();
    let records = gather(settings, session.workbook_mut(), &mut report);
    tracing::info!("Collected {} ledger records", records.len());

    let rollover = engine.run(session.workbook_mut(), &records, today)?;
    report.periods_created = rollover.periods_created;
    report.extend(rollover.issues);

    print_report(&report);

    if dry_run {
        tracing::info!("Dry run: ledger left unchanged");
        return Ok(());
    }
    record_run(session.pool(), started_at, today, &report)
        .await
        .context("Failed to record run")?;
    session.commit().await.context("Failed to save ledger")?;
    Ok(())
}

fn print_report(report: &RunReport) {
    if report.periods_created.is_empty() {
        println!("No new periods.");
    }
    for range in &report.periods_created {
        println!("Created period {range}");
    }
    if !report.issues.is_empty() {
        println!("{} issues:", report.issues.len());
        for issue in &report.issues {
            println!("  {issue}");
        }
    }
}

pub async fn status(settings: &Settings, today: NaiveDate) -> Result<()> {
    let engine = engine(settings)?;
    let session = open_session(settings).await?;
    let state = engine.state(session.workbook(), today)?;
    let format = engine.layout().date_format;
    println!("Latest period ends {}", format.format(state.latest_end()));
    match state {
        PeriodState::Current { .. } => println!("CURRENT"),
        PeriodState::Behind { periods_due, .. } => println!("BEHIND: {periods_due} periods due"),
    }
    Ok(())
}

pub fn paystub_file(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let id = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("paystub");
    let paystub = Extractor::extract(id, &text);
    println!("{}", serde_json::to_string_pretty(&paystub)?);
    Ok(())
}

pub fn paystub_period(settings: &Settings, begin: NaiveDate) -> Result<()> {
    let paystub = paystub_pipeline(settings).extract_for_period(begin);
    println!("{}", serde_json::to_string_pretty(&paystub)?);
    Ok(())
}

pub async fn sheet_import(settings: &Settings, sheet: &str, csv: &Path) -> Result<()> {
    let file = std::fs::File::open(csv).with_context(|| format!("Failed to open {}", csv.display()))?;
    let contents = read_sheet(file).with_context(|| format!("Failed to read {}", csv.display()))?;
    let mut session = open_session(settings).await?;
    *session.workbook_mut().add_sheet(sheet) = contents;
    session.commit().await.context("Failed to save ledger")?;
    tracing::info!("Imported sheet {sheet} from {}", csv.display());
    Ok(())
}

pub async fn sheet_export(settings: &Settings, sheet: &str) -> Result<()> {
    let session = open_session(settings).await?;
    let contents = session
        .workbook()
        .sheet(sheet)
        .with_context(|| format!("No sheet named '{sheet}'"))?;
    write_sheet(contents, std::io::stdout().lock())?;
    Ok(())
}

pub async fn history(settings: &Settings, limit: u32) -> Result<()> {
    let pool = create_db(&settings.paths.workbook)
        .await
        .with_context(|| format!("Failed to open ledger {}", settings.paths.workbook.display()))?;
    let runs = recent_runs(&pool, limit).await?;
    if runs.is_empty() {
        println!("No runs recorded.");
    }
    for run in runs {
        println!(
            "#{} {} (today {}): {} periods, {} issues",
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M"),
            run.today,
            run.periods_created.len(),
            run.issues.len()
        );
        for range in &run.periods_created {
            println!("    {range}");
        }
    }
    Ok(())
}
