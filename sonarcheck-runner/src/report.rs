//! Per-scenario outcomes of a catalogue run.

use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use sonarcheck_core::error::HarnessError;

use crate::output::Render;
use crate::scenario::ScenarioKind;

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub kind: ScenarioKind,
    pub passed: bool,
    /// Short summary on success (`100 open issues`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the error is a failed check (as opposed to infrastructure)
    pub check_failure: bool,
    pub elapsed_ms: u64,
}

impl ScenarioOutcome {
    pub fn from_result(
        kind: ScenarioKind,
        name: &str,
        elapsed: Duration,
        result: Result<String, HarnessError>,
    ) -> Self {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok(detail) => Self {
                name: name.to_owned(),
                kind,
                passed: true,
                detail: Some(detail),
                error: None,
                check_failure: false,
                elapsed_ms,
            },
            Err(e) => Self {
                name: name.to_owned(),
                kind,
                passed: false,
                detail: None,
                check_failure: e.is_check_failure(),
                error: Some(e.to_string()),
                elapsed_ms,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteReport {
    pub fn push(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome(&self, name: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

impl Render for SuiteReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for o in &self.outcomes {
            let status = if o.passed {
                "PASS".green().bold()
            } else {
                "FAIL".red().bold()
            };
            write!(w, "{status} {:<8} {}", o.kind.as_str(), o.name)?;
            match (&o.detail, &o.error) {
                (_, Some(error)) => writeln!(w, ": {error}")?,
                (Some(detail), None) => writeln!(w, " ({detail}, {} ms)", o.elapsed_ms)?,
                (None, None) => writeln!(w)?,
            }
        }
        writeln!(
            w,
            "\n{} passed, {} failed",
            self.passed().to_string().green(),
            self.failed().to_string().red()
        )
    }
}
