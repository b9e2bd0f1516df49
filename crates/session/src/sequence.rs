//! Ordered action sequence execution.
//!
//! Steps run strictly in input order against one session, each under
//! its own timeout, and every run produces a full `ExecutionReport`.
//! Step-level problems are recorded outcomes, never errors.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use webpilot_core::{Error, Result};
use webpilot_driver::{CaptureOptions, DriverHandle, ElementAction, Locator};

use crate::registry::Session;

/// Extra slack on the outer step timeout so a locate that timed out
/// inside the driver reports its own, more specific message.
const STEP_TIMEOUT_GRACE: Duration = Duration::from_millis(100);

/// One step of an action sequence, as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStep {
    /// One of: navigate, click, type_text, evaluate, screenshot, wait.
    /// Anything else is a recorded step failure.
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// For reporting only.
    #[serde(default)]
    pub description: Option<String>,
}

/// What to do after a step fails.
///
/// The two flags are independently settable by callers. When they
/// conflict (both true), continuing wins: halting is only chosen when
/// `stop_on_error` is set and `continue_on_error` is not.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPolicy {
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default)]
    pub stop_on_error: bool,
}

impl ErrorPolicy {
    pub fn halts_after_failure(&self) -> bool {
        self.stop_on_error && !self.continue_on_error
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub index: usize,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub success: bool,
    pub message: String,
    pub elapsed_ms: u64,
}

/// Aggregate result of one sequence run. Outcome order always equals
/// input step order; a halted run reports only the attempted steps.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub outcomes: Vec<StepOutcome>,
    pub success_count: usize,
    pub failure_count: usize,
    pub success: bool,
}

impl ExecutionReport {
    pub fn from_outcomes(outcomes: Vec<StepOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.success).count();
        let failure_count = outcomes.len() - success_count;
        Self {
            outcomes,
            success_count,
            failure_count,
            success: failure_count == 0,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} steps succeeded",
            self.success_count,
            self.outcomes.len()
        )
    }
}

/// Run `steps` in order against `session`.
///
/// The session's driver mutex is held for the whole run, so sequences
/// submitted concurrently for the same session serialize instead of
/// interleaving primitive calls.
pub async fn run_sequence(
    session: &Session,
    steps: &[ActionStep],
    policy: ErrorPolicy,
    default_timeout: Duration,
) -> ExecutionReport {
    let mut outcomes = Vec::with_capacity(steps.len());
    let mut handle = session.driver.lock().await;

    for (index, step) in steps.iter().enumerate() {
        let started = Instant::now();
        let result = run_step(handle.as_mut(), step, default_timeout).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        session.touch().await;

        let outcome = match result {
            Ok(message) => StepOutcome {
                index,
                kind: step.kind.clone(),
                description: step.description.clone(),
                success: true,
                message,
                elapsed_ms,
            },
            Err(e) => StepOutcome {
                index,
                kind: step.kind.clone(),
                description: step.description.clone(),
                success: false,
                message: e.to_string(),
                elapsed_ms,
            },
        };

        let failed = !outcome.success;
        debug!(
            session = %session.id,
            step = index,
            kind = %step.kind,
            success = outcome.success,
            "Step finished"
        );
        outcomes.push(outcome);

        if failed && policy.halts_after_failure() {
            debug!(session = %session.id, step = index, "Halting sequence on failure");
            break;
        }
    }

    ExecutionReport::from_outcomes(outcomes)
}

async fn run_step(
    handle: &mut dyn DriverHandle,
    step: &ActionStep,
    default_timeout: Duration,
) -> Result<String> {
    let timeout = step
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(default_timeout);

    let work = execute_kind(handle, step, timeout);
    match tokio::time::timeout(timeout + STEP_TIMEOUT_GRACE, work).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(format!(
            "step '{}' exceeded {}ms",
            step.kind,
            timeout.as_millis()
        ))),
    }
}

async fn execute_kind(
    handle: &mut dyn DriverHandle,
    step: &ActionStep,
    timeout: Duration,
) -> Result<String> {
    match step.kind.as_str() {
        "navigate" => {
            let url = step
                .url
                .as_deref()
                .or(step.value.as_deref())
                .ok_or_else(|| Error::InvalidArgs("navigate requires a url".to_string()))?;
            handle.navigate(url).await?;
            Ok(format!("navigated to {}", url))
        }
        "click" => {
            let locator = step_locator(step)?;
            handle
                .locate_and_act(&locator, ElementAction::Click, None, timeout)
                .await?;
            Ok(format!("clicked {}", locator))
        }
        "type_text" | "type" => {
            let locator = step_locator(step)?;
            let text = step
                .value
                .as_deref()
                .ok_or_else(|| Error::InvalidArgs("type_text requires a value".to_string()))?;
            handle
                .locate_and_act(&locator, ElementAction::Type, Some(text), timeout)
                .await?;
            Ok(format!("typed into {}", locator))
        }
        "evaluate" | "execute_script" => {
            let code = step
                .value
                .as_deref()
                .ok_or_else(|| Error::InvalidArgs("evaluate requires script code".to_string()))?;
            handle.evaluate(code, &[]).await?;
            Ok("script evaluated".to_string())
        }
        "screenshot" => {
            let artifact = handle.capture(&CaptureOptions::default()).await?;
            Ok(format!("captured {} screenshot", artifact.format))
        }
        "wait" => {
            let ms = step
                .value
                .as_deref()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(500);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(format!("waited {}ms", ms))
        }
        other => Err(Error::UnknownAction(other.to_string())),
    }
}

fn step_locator(step: &ActionStep) -> Result<Locator> {
    let selector = step
        .selector
        .as_deref()
        .ok_or_else(|| Error::InvalidArgs(format!("{} requires a selector", step.kind)))?;
    Ok(Locator::new(step.by.as_deref(), selector))
}
