//! sonarcheck runner library.
//!
//! Exposes the orchestrator and scenario catalogue for integration testing.
//! In production, `sonarcheck` is used as a binary (main.rs).

pub mod cli;
pub mod commands;
pub mod error;
pub mod fixtures;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod report;
pub mod scanner;
pub mod scenario;

pub use orchestrator::{Harness, LanguageSummary};
pub use report::{ScenarioOutcome, SuiteReport};
pub use scenario::{ImportScenario, LanguageScenario, ScenarioKind, ScenarioSuite, ToolScenario};
