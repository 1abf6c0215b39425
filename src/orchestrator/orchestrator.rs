use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::backend::backend::AccessibilityBackend;
use crate::error::FillError;
use crate::executor::executor::ActionExecutor;
use crate::executor::result::{FailureStage, FillSummary};
use crate::oracle::oracle::{MappingOracle, OracleRequest, ProposalStyle};
use crate::orchestrator::artifacts::ArtifactWriter;
use crate::orchestrator::state::{FormProgress, FormState};
use crate::plan::builder::{FormValues, build_plan};
use crate::plan::extract::parse_proposal;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;
use crate::tree::render::{SnapshotFormat, render_snapshot};
use crate::tree::snapshot::{SnapshotOptions, capture_snapshot};

pub const DEFAULT_PACING_SECS: f64 = 5.0;

/// Slice of the pacing delay between interrupt checks.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Application whose focused window is filled
    pub app: String,
    pub snapshot: SnapshotOptions,
    pub format: SnapshotFormat,
    pub style: ProposalStyle,
}

impl OrchestratorConfig {
    pub fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
            snapshot: SnapshotOptions::default(),
            format: SnapshotFormat::default(),
            style: ProposalStyle::default(),
        }
    }
}

/// Drives one form at a time through connect, snapshot, oracle, plan and
/// execute. Every call returns a summary; failures end the form, never the
/// caller.
pub struct FillOrchestrator<B, O> {
    backend: B,
    oracle: O,
    config: OrchestratorConfig,
    executor: ActionExecutor,
    artifacts: ArtifactWriter,
    tracer: TraceLogger,
    next_form: usize,
}

impl<B: AccessibilityBackend, O: MappingOracle> FillOrchestrator<B, O> {
    pub fn new(backend: B, oracle: O, config: OrchestratorConfig) -> Self {
        Self {
            backend,
            oracle,
            config,
            executor: ActionExecutor::default(),
            artifacts: ArtifactWriter::disabled(),
            tracer: TraceLogger::disabled(),
            next_form: 0,
        }
    }

    pub fn with_executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactWriter) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_trace(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Fill the form currently shown by the target application.
    pub fn fill_form(&mut self, values: &FormValues) -> FillSummary {
        let form_index = self.next_form;
        self.next_form += 1;

        let started = Instant::now();
        let summary = self.run_form(form_index, values);

        match &summary.failure {
            Some(failure) => error!(
                form = form_index + 1,
                stage = ?failure.stage,
                message = %failure.message,
                "form failed"
            ),
            None => info!(
                form = form_index + 1,
                filled = summary.filled,
                skipped = summary.skipped,
                failed = summary.failed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "form completed"
            ),
        }
        self.tracer.log(&TraceEvent::for_form(form_index, &summary));
        summary
    }

    /// Fill each record in turn, pausing `pacing` between forms.
    ///
    /// `interrupt` is only checked between forms (including during the
    /// pause); a form that has started always runs to the end. Returns one
    /// summary per form attempted.
    pub fn fill_batch(
        &mut self,
        forms: &[FormValues],
        pacing: Duration,
        interrupt: &AtomicBool,
    ) -> Vec<FillSummary> {
        let mut summaries = Vec::with_capacity(forms.len());

        for (index, values) in forms.iter().enumerate() {
            let paused = index == 0 || pause(pacing, interrupt);
            if !paused || interrupt.load(Ordering::SeqCst) {
                warn!(completed = index, total = forms.len(), "batch interrupted");
                break;
            }

            info!(form = index + 1, total = forms.len(), "filling form");
            summaries.push(self.fill_form(values));
        }

        summaries
    }

    fn run_form(&mut self, form_index: usize, values: &FormValues) -> FillSummary {
        let mut progress = FormProgress::default();

        let root = match self.backend.root(&self.config.app) {
            Ok(root) => root,
            Err(e) => {
                let err = FillError::Connection(e.to_string());
                return abort(&mut progress, FailureStage::Connection, err);
            }
        };
        progress.advance(FormState::Connected);

        let snapshot = match capture_snapshot(
            &mut self.backend,
            &root,
            &self.config.app,
            self.config.snapshot,
        ) {
            Ok(snapshot) => snapshot,
            Err(err) => return abort(&mut progress, FailureStage::Snapshot, err),
        };
        progress.advance(FormState::SnapshotCaptured);
        self.artifacts.write_snapshot(form_index, &snapshot);
        let fingerprint = snapshot.fingerprint();

        let rendered = render_snapshot(&snapshot, self.config.format);
        // The tree itself is not needed past this point
        drop(snapshot);

        let request = OracleRequest {
            tree: &rendered,
            values,
            style: self.config.style,
        };
        let reply = match self.oracle.propose(&request) {
            Ok(reply) => reply,
            Err(e) => {
                let err = FillError::Mapping(format!("oracle call failed: {}", e));
                return abort(&mut progress, FailureStage::Mapping, err)
                    .with_fingerprint(fingerprint);
            }
        };

        let proposal = match parse_proposal(&reply) {
            Ok(proposal) => proposal,
            Err(err) => {
                self.artifacts.write_mapping(form_index, &reply, None);
                return abort(&mut progress, FailureStage::Mapping, err).with_fingerprint(fingerprint);
            }
        };

        let plan = build_plan(&proposal, values);
        self.artifacts.write_mapping(form_index, &reply, Some(&plan));
        progress.advance(FormState::PlanReceived);

        if plan.is_empty() {
            let message = format!(
                "oracle proposed {} entries, none usable ({} rejected)",
                proposal.len(),
                plan.validation_failures()
            );
            let mut summary = abort(&mut progress, FailureStage::Plan, FillError::Mapping(message));
            summary.validation_failures = plan.validation_failures();
            return summary.with_fingerprint(fingerprint);
        }

        progress.advance(FormState::Executing);
        let results = self.executor.execute(&mut self.backend, &root, &plan);
        for result in &results {
            self.tracer.log(&TraceEvent::for_action(form_index, result));
        }
        progress.advance(FormState::Completed);

        let mut summary = FillSummary::from_results(results, plan.len(), plan.validation_failures());
        summary.final_state = progress.state();
        summary.with_fingerprint(fingerprint)
    }
}

fn abort(progress: &mut FormProgress, stage: FailureStage, err: FillError) -> FillSummary {
    progress.advance(FormState::Failed);
    FillSummary::aborted(stage, err)
}

/// Sleep for `pacing` in short slices. Returns `false` if interrupted.
fn pause(pacing: Duration, interrupt: &AtomicBool) -> bool {
    let deadline = Instant::now() + pacing;
    loop {
        if interrupt.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(INTERRUPT_POLL.min(deadline - now));
    }
}
