//! Scenario catalogue -- the TOML file listing what to analyze and what to
//! expect.
//!
//! ```toml
//! [[language]]
//! name = "VHDL"
//! language_key = "VHDL"
//! base_dir = "tests/vhdl"
//! sensors = ["INFO: Sensor vhdlRcSensor [vhdlrc]"]
//! project_key = "demo_project_plasma"
//! expected_issues = 100
//!
//! [[tool]]
//! tool = "cppcheck"
//! args = ["cppcheck", "--xml-version=2", "tests/c_cpp/cppcheck/main.c",
//!         "--output-file=tests/c_cpp/tmp-cppcheck-results.xml"]
//! reference_file = "tests/c_cpp/reference-cppcheck-results.xml"
//! output_file = "tests/c_cpp/tmp-cppcheck-results.xml"
//! store_output = false
//!
//! [[import]]
//! project_name = "CppCheck Dummy Project"
//! project_key = "cppcheck-dummy-project"
//! quality_profile = "CNES_C_A"
//! language_key = "c++"
//! working_dir = "tests/c_cpp"
//! source_dir = "cppcheck"
//! violated_rule = "cppcheck:arrayIndexOutOfBounds"
//! expected_sensor_line = "INFO: Sensor C++ (Community) CppCheckSensor [cxx]"
//! expected_import_line = "INFO: CXX-CPPCHECK processed = 1"
//! ```

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use sonarcheck_core::error::{HarnessError, ScenarioError};

/// Analysis of a sample project in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageScenario {
    /// Display name
    pub name: String,
    /// Server-side language key
    pub language_key: String,
    /// Project directory, relative to the project root
    pub base_dir: String,
    /// Lines the scanner must print
    #[serde(default)]
    pub sensors: Vec<String>,
    pub project_key: String,
    /// Open issues expected with the default profile
    pub expected_issues: usize,
    /// Optional profile to re-analyze with
    #[serde(default)]
    pub custom_profile: Option<String>,
    /// Open issues expected with `custom_profile`
    #[serde(default)]
    pub expected_issues_custom_profile: usize,
    /// Count across every result page instead of the first one
    #[serde(default)]
    pub count_all_pages: bool,
}

/// Standalone analysis tool run compared against a reference file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolScenario {
    pub tool: String,
    /// Command run in the scanner image
    pub args: Vec<String>,
    /// Expected output, relative to the project root
    pub reference_file: String,
    /// Fresh output, relative to the project root
    pub output_file: String,
    /// Write the container's stdout to `output_file`
    #[serde(default = "default_true")]
    pub store_output: bool,
}

/// Import of externally produced analysis results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportScenario {
    pub project_name: String,
    pub project_key: String,
    pub quality_profile: String,
    pub language_key: String,
    /// Directory the scanner runs in, relative to the project root
    pub working_dir: String,
    /// Sources, relative to `working_dir`
    pub source_dir: String,
    pub violated_rule: String,
    pub expected_sensor_line: String,
    pub expected_import_line: String,
    /// Activate `violated_rule` in the profile for the duration of the run
    #[serde(default)]
    pub activate_rule: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Language,
    Tool,
    Import,
}

impl ScenarioKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::Tool => "tool",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed scenario file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSuite {
    #[serde(default, rename = "language")]
    pub languages: Vec<LanguageScenario>,
    #[serde(default, rename = "tool")]
    pub tools: Vec<ToolScenario>,
    #[serde(default, rename = "import")]
    pub imports: Vec<ImportScenario>,
}

impl ScenarioSuite {
    /// Reads, parses and validates a scenario file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ScenarioError::Load {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
        let suite = Self::parse(&content).map_err(|e| match e {
            HarnessError::Scenario(ScenarioError::Load { reason, .. }) => {
                HarnessError::Scenario(ScenarioError::Load {
                    path: path.display().to_string(),
                    reason,
                })
            }
            other => other,
        })?;
        Ok(suite)
    }

    /// Parses and validates TOML.
    pub fn parse(toml_str: &str) -> Result<Self, HarnessError> {
        let suite: Self = toml::from_str(toml_str).map_err(|e| ScenarioError::Load {
            path: "<inline>".to_owned(),
            reason: e.to_string(),
        })?;
        suite.validate()?;
        Ok(suite)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        for s in &self.languages {
            let fail = |reason: &str| invalid(&s.name, reason);
            non_empty(&s.name, || fail("name must not be empty"))?;
            non_empty(&s.language_key, || fail("language_key must not be empty"))?;
            non_empty(&s.project_key, || fail("project_key must not be empty"))?;
            relative_path(&s.base_dir, || fail("base_dir must be a relative path inside the project root"))?;
            if s.sensors.iter().any(|line| line.trim().is_empty()) {
                return Err(fail("sensor lines must not be blank"));
            }
            match &s.custom_profile {
                Some(profile) if profile.trim().is_empty() => {
                    return Err(fail("custom_profile must not be empty"));
                }
                None if s.expected_issues_custom_profile != 0 => {
                    return Err(fail(
                        "expected_issues_custom_profile is set but no custom_profile is named",
                    ));
                }
                _ => {}
            }
        }

        for s in &self.tools {
            let fail = |reason: &str| invalid(&s.tool, reason);
            non_empty(&s.tool, || fail("tool must not be empty"))?;
            if s.args.is_empty() {
                return Err(fail("args must not be empty"));
            }
            relative_path(&s.reference_file, || fail("reference_file must be a relative path inside the project root"))?;
            relative_path(&s.output_file, || fail("output_file must be a relative path inside the project root"))?;
            if s.reference_file == s.output_file {
                return Err(fail("output_file must differ from reference_file"));
            }
        }

        for s in &self.imports {
            let fail = |reason: &str| invalid(&s.project_name, reason);
            non_empty(&s.project_name, || fail("project_name must not be empty"))?;
            non_empty(&s.project_key, || fail("project_key must not be empty"))?;
            non_empty(&s.quality_profile, || fail("quality_profile must not be empty"))?;
            non_empty(&s.language_key, || fail("language_key must not be empty"))?;
            non_empty(&s.violated_rule, || fail("violated_rule must not be empty"))?;
            non_empty(&s.expected_sensor_line, || fail("expected_sensor_line must not be empty"))?;
            non_empty(&s.expected_import_line, || fail("expected_import_line must not be empty"))?;
            relative_path(&s.working_dir, || fail("working_dir must be a relative path inside the project root"))?;
            relative_path(&s.source_dir, || fail("source_dir must be a relative path"))?;
        }

        Ok(())
    }

    /// Keeps only the scenarios called `name`.
    ///
    /// Languages match on `name`, tools on `tool`, imports on
    /// `project_name` or `project_key`.
    pub fn only(self, name: &str) -> Result<Self, ScenarioError> {
        let filtered = Self {
            languages: self
                .languages
                .into_iter()
                .filter(|s| s.name == name)
                .collect(),
            tools: self.tools.into_iter().filter(|s| s.tool == name).collect(),
            imports: self
                .imports
                .into_iter()
                .filter(|s| s.project_name == name || s.project_key == name)
                .collect(),
        };
        if filtered.is_empty() {
            return Err(ScenarioError::NotFound(name.to_owned()));
        }
        Ok(filtered)
    }

    pub fn len(&self) -> usize {
        self.languages.len() + self.tools.len() + self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(kind, name)` of every scenario, in execution order.
    pub fn names(&self) -> Vec<(ScenarioKind, &str)> {
        self.languages
            .iter()
            .map(|s| (ScenarioKind::Language, s.name.as_str()))
            .chain(self.tools.iter().map(|s| (ScenarioKind::Tool, s.tool.as_str())))
            .chain(
                self.imports
                    .iter()
                    .map(|s| (ScenarioKind::Import, s.project_name.as_str())),
            )
            .collect()
    }
}

fn invalid(scenario: &str, reason: &str) -> ScenarioError {
    ScenarioError::Invalid {
        scenario: scenario.to_owned(),
        reason: reason.to_owned(),
    }
}

fn non_empty(value: &str, err: impl FnOnce() -> ScenarioError) -> Result<(), ScenarioError> {
    if value.trim().is_empty() {
        Err(err())
    } else {
        Ok(())
    }
}

/// Relative, non-empty, and never climbing out with `..`.
fn relative_path(value: &str, err: impl FnOnce() -> ScenarioError) -> Result<(), ScenarioError> {
    let path = Path::new(value);
    let ok = !value.trim().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if ok { Ok(()) } else { Err(err()) }
}
