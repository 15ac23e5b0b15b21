//! Import of externally produced results into a scoped project.

use sonarcheck_core::error::{CheckError, HarnessError};
use sonarcheck_runner::ImportScenario;

use crate::helpers::assertions::*;
use crate::helpers::config::TestConfigBuilder;
use crate::helpers::harness;
use crate::helpers::world::*;

const RULE: &str = "cppcheck:arrayIndexOutOfBounds";
const SENSOR_LINE: &str = "INFO: Sensor C++ (Community) CppCheckSensor [cxx]";
const IMPORT_LINE: &str = "INFO: CXX-CPPCHECK processed = 1";
const KEY: &str = "cppcheck-dummy-project";

fn cppcheck_import(activate_rule: bool) -> ImportScenario {
    ImportScenario {
        project_name: "CppCheck Dummy Project".to_owned(),
        project_key: KEY.to_owned(),
        quality_profile: "CNES_C_A".to_owned(),
        language_key: "c++".to_owned(),
        working_dir: "tests/c_cpp".to_owned(),
        source_dir: "cppcheck".to_owned(),
        violated_rule: RULE.to_owned(),
        expected_sensor_line: SENSOR_LINE.to_owned(),
        expected_import_line: IMPORT_LINE.to_owned(),
        activate_rule,
    }
}

fn cxx_world(output: &'static [&'static str]) -> SimWorld {
    SimWorld::new()
        .with_profile("CNES_C_A", "c++")
        .with_analyzer(import_analyzer("c++", RULE, output))
}

#[tokio::test]
async fn activated_rule_raises_exactly_one_issue() {
    let root = tempfile::tempdir().unwrap();
    let world = cxx_world(&[SENSOR_LINE, IMPORT_LINE]);
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let issues = h.import_analysis_results(&cppcheck_import(true)).await.unwrap();

    assert_eq!(issues, 1);
    {
        let state = world.state();
        let run = &state.runs[0];
        assert_eq!(
            run.args,
            [
                "-Dsonar.projectKey=cppcheck-dummy-project",
                "-Dsonar.projectName=CppCheck Dummy Project",
                "-Dsonar.projectVersion=1.0",
                "-Dsonar.sources=cppcheck",
            ]
        );
        assert_eq!(run.working_dir.as_deref(), Some("/usr/src/tests/c_cpp"));
        assert_eq!(run.network.as_deref(), Some("sonarbridge"));

        assert_in_order(
            &state.api_calls,
            &[
                "search_quality_profiles:CNES_C_A".to_owned(),
                format!("activate_rule:{RULE}"),
                format!("create_project:{KEY}"),
                format!("add_project_to_profile:{KEY}=CNES_C_A"),
                format!("search_issues:{KEY}"),
                format!("delete_project:{KEY}"),
                format!("deactivate_rule:{RULE}"),
            ],
        );
        assert!(state.projects.is_empty());
    }
    assert_no_active_rules(&world);

    let left = sonarcheck_api::count_rule_issues(&world.api(), KEY, RULE)
        .await
        .unwrap();
    assert_eq!(left, 0, "deleting the project removes its issues");
}

#[tokio::test]
async fn inactive_rule_raises_nothing() {
    let root = tempfile::tempdir().unwrap();
    let world = cxx_world(&[SENSOR_LINE, IMPORT_LINE]);
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h
        .import_analysis_results(&cppcheck_import(false))
        .await
        .unwrap_err();

    match err {
        HarnessError::Check(CheckError::RuleIssueCountMismatch {
            rule,
            expected,
            actual,
            ..
        }) => {
            assert_eq!(rule, RULE);
            assert_eq!((expected, actual), (1, 0));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let state = world.state();
    assert!(state.projects.is_empty(), "project should still be deleted");
    assert!(state.calls_starting_with("activate_rule").is_empty());
}

#[tokio::test]
async fn rule_already_active_in_profile() {
    let root = tempfile::tempdir().unwrap();
    let world = cxx_world(&[SENSOR_LINE, IMPORT_LINE]);
    {
        let mut state = world.state();
        let key = state.profile("CNES_C_A", "c++").unwrap().key.clone();
        state.active_rules.entry(key).or_default().insert(RULE.to_owned());
    }
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let issues = h
        .import_analysis_results(&cppcheck_import(false))
        .await
        .unwrap();

    assert_eq!(issues, 1);
    assert!(world.state().rule_active("CNES_C_A", "c++", RULE));
}

#[tokio::test]
async fn missing_import_line_still_cleans_up() {
    let root = tempfile::tempdir().unwrap();
    let world = cxx_world(&[SENSOR_LINE]);
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h
        .import_analysis_results(&cppcheck_import(true))
        .await
        .unwrap_err();

    match err {
        HarnessError::Check(CheckError::MissingOutputLine { line }) => {
            assert_eq!(line, IMPORT_LINE);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(world.state().projects.is_empty());
    assert_no_active_rules(&world);
}

#[tokio::test]
async fn existing_project_is_rejected_and_kept() {
    let root = tempfile::tempdir().unwrap();
    let world = cxx_world(&[SENSOR_LINE, IMPORT_LINE]);
    world.state().projects.insert(
        KEY.to_owned(),
        SimProject {
            name: "Someone else's project".to_owned(),
            ..SimProject::default()
        },
    );
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h
        .import_analysis_results(&cppcheck_import(true))
        .await
        .unwrap_err();

    match err {
        HarnessError::Check(CheckError::ProjectCreationRejected { project_key, errors }) => {
            assert_eq!(project_key, KEY);
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("key already exists"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let state = world.state();
    assert!(state.projects.contains_key(KEY));
    assert!(state.calls_starting_with("delete_project").is_empty());
    assert!(state.runs.is_empty());
    drop(state);
    assert_no_active_rules(&world);
}

#[tokio::test]
async fn unknown_profile_stops_before_creating_anything() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(import_analyzer("c++", RULE, &[]));
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h
        .import_analysis_results(&cppcheck_import(true))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Check(CheckError::ProfileNotFound(ref name)) if name == "CNES_C_A"
    ));
    let state = world.state();
    assert!(state.calls_starting_with("activate_rule").is_empty());
    assert!(state.calls_starting_with("create_project").is_empty());
}

#[tokio::test]
async fn failed_project_deletion_is_reported_after_success() {
    let root = tempfile::tempdir().unwrap();
    let world = cxx_world(&[SENSOR_LINE, IMPORT_LINE]).failing("delete_project");
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h
        .import_analysis_results(&cppcheck_import(true))
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::Server(_)));
    assert_no_active_rules(&world);
}
