use std::error::Error;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::backend::backend::AccessibilityBackend;
use crate::cli::config::{
    AppConfig, build_backend, build_executor, build_oracle, build_orchestrator_config,
    build_snapshot_options,
};
use crate::data::loader::{load_records, save_records};
use crate::data::rules::{FieldRules, ValidationReport, record_label, sample_w2_records};
use crate::oracle::oracle::{MappingOracle, ProposalStyle};
use crate::orchestrator::artifacts::ArtifactWriter;
use crate::orchestrator::orchestrator::FillOrchestrator;
use crate::plan::builder::FormValues;
use crate::report::console::{format_console_report, format_summary};
use crate::report::json::generate_json_report;
use crate::report::report_model::{BatchReport, FormReport};
use crate::trace::logger::TraceLogger;
use crate::tree::render::{SnapshotFormat, render_snapshot};
use crate::tree::snapshot::capture_snapshot;

/// Settings shared by every subcommand that talks to an application.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub config: &'a AppConfig,
    /// Saved snapshot to replay instead of a live backend
    pub tree: Option<&'a str>,
    pub ollama_endpoint: Option<&'a str>,
    pub ollama_model: Option<&'a str>,
}

type Orchestrator = FillOrchestrator<Box<dyn AccessibilityBackend>, Box<dyn MappingOracle>>;

// ============================================================================
// fill subcommand
// ============================================================================

/// Fill one form with the first record of `data`. Returns whether it filled
/// without failures.
pub fn cmd_fill(
    ctx: CommandContext<'_>,
    data: &str,
    app: Option<&str>,
    preset: &str,
    style: Option<&str>,
    format: Option<&str>,
) -> Result<bool, Box<dyn Error>> {
    let rules: FieldRules = preset.parse()?;
    let Some(records) = prepare_records(data, &rules)? else {
        return Ok(false);
    };
    let Some(values) = records.first() else {
        error!(data, "no records to fill");
        return Ok(false);
    };
    if records.len() > 1 {
        info!(records = records.len(), "filling the first record only; use `batch` for all");
    }

    let style = style.map(str::parse::<ProposalStyle>).transpose()?;
    let format = format.map(str::parse::<SnapshotFormat>).transpose()?;
    let mut orchestrator = build_fill_orchestrator(ctx, app, style, format)?;

    let summary = orchestrator.fill_form(values);
    print!("{}", format_summary(&record_label(values), &summary));

    Ok(!summary.has_failures())
}

// ============================================================================
// batch subcommand
// ============================================================================

/// Fill one form per record and print the batch report. Returns whether every
/// form filled without failures.
#[allow(clippy::too_many_arguments)]
pub fn cmd_batch(
    ctx: CommandContext<'_>,
    data: &str,
    app: Option<&str>,
    preset: &str,
    pacing: Option<f64>,
    report_format: &str,
    output: Option<&str>,
    interrupt: &AtomicBool,
) -> Result<bool, Box<dyn Error>> {
    let rules: FieldRules = preset.parse()?;
    let Some(records) = prepare_records(data, &rules)? else {
        return Ok(false);
    };

    let pacing_secs = pacing.unwrap_or(ctx.config.batch.pacing_secs);
    let pacing = Duration::try_from_secs_f64(pacing_secs)
        .map_err(|_| format!("invalid pacing {} (expected a non-negative number of seconds)", pacing_secs))?;

    let mut orchestrator = build_fill_orchestrator(ctx, app, None, None)?;

    let start = Instant::now();
    let summaries = orchestrator.fill_batch(&records, pacing, interrupt);
    let duration = start.elapsed().as_millis() as u64;

    let forms = records
        .iter()
        .zip(summaries)
        .map(|(values, summary)| FormReport {
            label: record_label(values),
            summary,
        })
        .collect();
    let report = BatchReport::from_summaries(records.len(), forms).with_duration(duration);
    let all_succeeded = report.all_succeeded();

    let output_content = match report_format {
        "json" => generate_json_report(&report)? + "\n",
        _ => format_console_report(data, &report),
    };

    match output {
        Some(path) => std::fs::write(path, &output_content)?,
        None => print!("{}", output_content),
    }

    Ok(all_succeeded)
}

// ============================================================================
// inspect subcommand
// ============================================================================

/// Capture the target's tree and print or save it. The JSON form can be
/// replayed later with `--tree`.
pub fn cmd_inspect(
    ctx: CommandContext<'_>,
    app: Option<&str>,
    format: &str,
    depth: Option<usize>,
    output: Option<&str>,
) -> Result<bool, Box<dyn Error>> {
    let format: SnapshotFormat = format.parse()?;
    let app = app.unwrap_or(&ctx.config.target.app);
    let mut backend = build_backend(&ctx.config.backend, ctx.tree)?;

    let root = backend.root(app)?;
    let snapshot = capture_snapshot(
        &mut backend,
        &root,
        app,
        build_snapshot_options(ctx.config, depth),
    )?;
    info!(app, nodes = snapshot.node_count, "captured snapshot");

    let output_content = match format {
        SnapshotFormat::Json => snapshot.to_json_pretty()? + "\n",
        SnapshotFormat::Text => render_snapshot(&snapshot, format),
    };

    match output {
        Some(path) => {
            std::fs::write(path, &output_content)?;
            println!("Saved {} nodes to {}", snapshot.node_count, path);
        }
        None => print!("{}", output_content),
    }

    Ok(true)
}

// ============================================================================
// validate subcommand
// ============================================================================

pub fn cmd_validate(data: &str, preset: &str) -> Result<bool, Box<dyn Error>> {
    let rules: FieldRules = preset.parse()?;
    let records = load_records(data)?;
    let report = rules.validate_batch(&records);

    print!("{}", format_validation(&report));
    Ok(report.all_valid())
}

// ============================================================================
// sample subcommand
// ============================================================================

pub fn cmd_sample(output: &str) -> Result<bool, Box<dyn Error>> {
    let records = sample_w2_records();
    save_records(output, &records)?;
    println!("Wrote {} sample records to {}", records.len(), output);
    Ok(true)
}

// ============================================================================
// Helpers
// ============================================================================

/// Load, validate and clean the records in `data`.
///
/// Records missing required fields are reported but kept. Returns `None`
/// when there are records and none of them is valid.
pub fn prepare_records(data: &str, rules: &FieldRules) -> Result<Option<Vec<FormValues>>, Box<dyn Error>> {
    let records = load_records(data)?;
    let report = rules.validate_batch(&records);
    info!(valid = report.valid, invalid = report.invalid, "validated records");

    if report.total > 0 && report.valid == 0 {
        error!(data, "no valid records to process");
        return Ok(None);
    }
    if !report.all_valid() {
        warn!(invalid = report.invalid, "continuing with incomplete records");
    }

    Ok(Some(records.iter().map(|r| rules.clean(r)).collect()))
}

/// Orchestrator wired from the config file and command-line overrides.
pub fn build_fill_orchestrator(
    ctx: CommandContext<'_>,
    app: Option<&str>,
    style: Option<ProposalStyle>,
    format: Option<SnapshotFormat>,
) -> Result<Orchestrator, Box<dyn Error>> {
    let config = ctx.config;
    let backend = build_backend(&config.backend, ctx.tree)?;
    let oracle = build_oracle(&config.oracle, ctx.ollama_endpoint, ctx.ollama_model)?;

    let artifacts = match config.output.artifacts_dir.as_deref() {
        Some(dir) => ArtifactWriter::new(Path::new(dir)),
        None => ArtifactWriter::disabled(),
    };
    let tracer = match config.output.trace_file.as_deref() {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };

    Ok(FillOrchestrator::new(
        backend,
        oracle,
        build_orchestrator_config(config, app, style, format),
    )
    .with_executor(build_executor(config))
    .with_artifacts(artifacts)
    .with_trace(tracer))
}

pub fn format_validation(report: &ValidationReport) -> String {
    let mut out = format!(
        "Validation: {} valid, {} invalid ({} total)\n",
        report.valid, report.invalid, report.total
    );
    for issue in &report.errors {
        out.push_str(&format!(
            "    [INVALID] Record {} ({}): missing {}\n",
            issue.index,
            issue.label,
            issue.missing_fields.join(", ")
        ));
    }
    out
}
