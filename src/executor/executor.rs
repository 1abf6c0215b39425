use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::backend::{AccessibilityBackend, ElementHandle, Keystroke};
use crate::error::{BackendError, FillError};
use crate::executor::result::FillResult;
use crate::executor::settle::Settle;
use crate::plan::plan_model::{Action, ActionKind, ActionPlan};
use crate::resolve::resolver::{ElementResolver, Resolution};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExecutorConfig {
    pub settle: Settle,
    /// Extra pause between consecutive actions
    pub action_delay: Duration,
}

/// Runs a plan against the live tree, one action at a time.
///
/// Targets are resolved afresh for every action. A missing target is recorded
/// as skipped and a backend failure as failed; neither stops the plan.
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    resolver: ElementResolver,
    config: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(resolver: ElementResolver, config: ExecutorConfig) -> Self {
        Self { resolver, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `plan` in order under `root`, returning one result per action.
    pub fn execute(
        &self,
        backend: &mut dyn AccessibilityBackend,
        root: &ElementHandle,
        plan: &ActionPlan,
    ) -> Vec<FillResult> {
        let mut results = Vec::with_capacity(plan.len());

        for (index, action) in plan.actions.iter().enumerate() {
            if index > 0 && !self.config.action_delay.is_zero() {
                thread::sleep(self.config.action_delay);
            }

            let result = self.execute_action(backend, root, index, action);
            info!(
                index,
                kind = %action.kind,
                target = %result.target_label,
                status = ?result.status,
                detail = result.detail.as_deref().unwrap_or(""),
                "action finished"
            );
            results.push(result);
        }

        results
    }

    fn execute_action(
        &self,
        backend: &mut dyn AccessibilityBackend,
        root: &ElementHandle,
        index: usize,
        action: &Action,
    ) -> FillResult {
        let label = action.target_label();

        match action.kind {
            ActionKind::Wait => {
                let duration = action.wait_duration();
                debug!(index, ?duration, "waiting");
                thread::sleep(duration);
                return FillResult::filled(index, action.kind, label);
            }
            ActionKind::Tab => {
                return match backend.send_key(root, &Keystroke::Tab) {
                    Ok(()) => {
                        self.config.settle.wait(backend, None);
                        FillResult::filled(index, action.kind, label)
                    }
                    Err(e) => {
                        let err = FillError::ActionExecution(e.to_string());
                        FillResult::failed(index, action.kind, label, err.to_string())
                    }
                };
            }
            _ => {}
        }

        let Resolution { handle, strategy } = match action
            .target
            .as_ref()
            .and_then(|t| self.resolver.resolve(backend, root, t, action.kind.category()))
        {
            Some(resolution) => resolution,
            None => {
                let err = FillError::ElementNotFound(describe_target(action));
                return FillResult::skipped(index, action.kind, label, err.to_string());
            }
        };

        let value = action.value.as_deref().unwrap_or("");
        let outcome = match action.kind {
            ActionKind::SetText => set_text(backend, &handle, value),
            ActionKind::Click => backend.click(&handle).map_err(|e| e.to_string()),
            ActionKind::Select => backend.select(&handle, value).map_err(|e| e.to_string()),
            ActionKind::Tab | ActionKind::Wait => Ok(()),
        };

        match outcome {
            Ok(()) => {
                self.config.settle.wait(backend, Some(&handle));
                FillResult::filled(index, action.kind, label).with_strategy(Some(strategy))
            }
            Err(reason) => {
                let err = FillError::ActionExecution(reason);
                FillResult::failed(index, action.kind, label, err.to_string())
                    .with_strategy(Some(strategy))
            }
        }
    }
}

/// Focus, clear and set. If direct assignment fails, select everything and
/// type the value instead.
fn set_text(
    backend: &mut dyn AccessibilityBackend,
    handle: &ElementHandle,
    value: &str,
) -> Result<(), String> {
    let direct_err = match assign(backend, handle, value) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    warn!(%handle, error = %direct_err, "value assignment failed, typing instead");
    type_over(backend, handle, value)
        .map_err(|e| format!("{}; keystroke fallback failed: {}", direct_err, e))
}

fn assign(
    backend: &mut dyn AccessibilityBackend,
    handle: &ElementHandle,
    value: &str,
) -> Result<(), BackendError> {
    backend.focus(handle)?;
    backend.set_value(handle, "")?;
    backend.set_value(handle, value)
}

fn type_over(
    backend: &mut dyn AccessibilityBackend,
    handle: &ElementHandle,
    value: &str,
) -> Result<(), BackendError> {
    if let Err(e) = backend.focus(handle) {
        debug!(%handle, error = %e, "refocus before typing failed");
    }
    backend.send_key(handle, &Keystroke::SelectAll)?;
    backend.send_key(handle, &Keystroke::Type(value.to_string()))
}

fn describe_target(action: &Action) -> String {
    match &action.target {
        Some(target) => format!("no element matches {}", target),
        None => "action has no target".to_string(),
    }
}
