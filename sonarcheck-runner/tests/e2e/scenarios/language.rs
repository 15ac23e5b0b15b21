//! Language analyses: sensors, registration, issue counts and profile
//! switching.

use sonarcheck_core::error::{CheckError, ContainerError, HarnessError};
use sonarcheck_core::types::DEFAULT_QUALITY_PROFILE;
use sonarcheck_docker::{ContainerOutput, ContainerSpec};
use sonarcheck_runner::LanguageScenario;

use crate::helpers::assertions::*;
use crate::helpers::config::TestConfigBuilder;
use crate::helpers::harness;
use crate::helpers::world::*;

const VHDL_SENSORS: &[&str] = &[
    "INFO: Sensor vhdlRcSensor [vhdlrc]",
    "INFO: Sensor VhdlRcMetricSensor [vhdlrc]",
    "INFO: Sensor GcovSensor [gcov]",
];

const JAVA_SENSORS: &[&str] = &[
    "INFO: Sensor CheckstyleSensor [checkstyle]",
    "INFO: Sensor PmdSensor [pmd]",
];

fn vhdl() -> LanguageScenario {
    LanguageScenario {
        name: "VHDL".to_owned(),
        language_key: "VHDL".to_owned(),
        base_dir: "tests/vhdl".to_owned(),
        sensors: VHDL_SENSORS.iter().map(|s| (*s).to_owned()).collect(),
        project_key: "demo_project_plasma".to_owned(),
        expected_issues: 100,
        custom_profile: None,
        expected_issues_custom_profile: 0,
        count_all_pages: false,
    }
}

fn java() -> LanguageScenario {
    LanguageScenario {
        name: "Java".to_owned(),
        language_key: "java".to_owned(),
        base_dir: "tests/java".to_owned(),
        sensors: JAVA_SENSORS.iter().map(|s| (*s).to_owned()).collect(),
        project_key: "java-dummy-project".to_owned(),
        expected_issues: 3,
        custom_profile: Some("CNES_JAVA_A".to_owned()),
        expected_issues_custom_profile: 6,
        count_all_pages: false,
    }
}

fn java_world() -> SimWorld {
    SimWorld::new()
        .with_profile("CNES_JAVA_A", "java")
        .with_analyzer(language_analyzer(
            "java",
            "java-dummy-project",
            JAVA_SENSORS,
            &[("Sonar way", 3), ("CNES_JAVA_A", 6)],
        ))
}

#[tokio::test]
async fn vhdl_project_has_expected_issues() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(language_analyzer(
        "VHDL",
        "demo_project_plasma",
        VHDL_SENSORS,
        &[("Sonar way", 100)],
    ));
    let mut h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let summary = h
        .run_suite(async |h| h.analyze_language(&vhdl()).await)
        .await
        .unwrap();

    assert_eq!(summary.issues, 100);
    assert!(summary.custom_profile.is_none());

    let state = world.state();
    assert_eq!(state.runs.len(), 1);
    let run = &state.runs[0];
    assert_eq!(run.image, "lequal/sonar-scanner");
    assert_eq!(run.args, ["-Dsonar.projectBaseDir=/usr/src/tests/vhdl"]);
    assert_eq!(run.network.as_deref(), Some("sonarbridge"));
    assert_eq!(run.mounts.len(), 2);
    assert_eq!(run.mounts[0].host, root.path());
    assert_eq!(run.mounts[0].container, "/usr/src");
    assert_eq!(run.mounts[1].host, root.path().join(".sonarcache"));
    drop(state);
    assert_released(&world);
}

#[tokio::test]
async fn analysis_can_be_repeated() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(language_analyzer(
        "VHDL",
        "demo_project_plasma",
        VHDL_SENSORS,
        &[("Sonar way", 100)],
    ));
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let first = h.analyze_language(&vhdl()).await.unwrap();
    let second = h.analyze_language(&vhdl()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(world.state().projects.len(), 1);
}

#[tokio::test]
async fn missing_sensor_line_fails_the_check() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(language_analyzer(
        "VHDL",
        "demo_project_plasma",
        &VHDL_SENSORS[..2],
        &[("Sonar way", 100)],
    ));
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h.analyze_language(&vhdl()).await.unwrap_err();

    match err {
        HarnessError::Check(CheckError::MissingOutputLine { line }) => {
            assert_eq!(line, "INFO: Sensor GcovSensor [gcov]");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(
        world.state().calls_starting_with("search_issues").is_empty(),
        "server should not be queried after a failed sensor check"
    );
}

#[tokio::test]
async fn wrong_issue_count_names_profile_and_counts() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(language_analyzer(
        "VHDL",
        "demo_project_plasma",
        VHDL_SENSORS,
        &[("Sonar way", 99)],
    ));
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h.analyze_language(&vhdl()).await.unwrap_err();

    match err {
        HarnessError::Check(CheckError::IssueCountMismatch {
            project_key,
            profile,
            expected,
            actual,
        }) => {
            assert_eq!(project_key, "demo_project_plasma");
            assert_eq!(profile, DEFAULT_QUALITY_PROFILE);
            assert_eq!((expected, actual), (100, 99));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unregistered_project_fails_the_check() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(|_, _| success(VHDL_SENSORS.join("\n")));
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h.analyze_language(&vhdl()).await.unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Check(CheckError::ProjectNotRegistered { found: None, .. })
    ));
}

#[tokio::test]
async fn failing_scanner_is_not_a_check_failure() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(|_, _| ContainerOutput {
        exit_code: 1,
        stdout: "ERROR: Error during SonarScanner execution".to_owned(),
    });
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h.analyze_language(&vhdl()).await.unwrap_err();

    assert!(!err.is_check_failure());
    match err {
        HarnessError::Container(ContainerError::NonZeroExit {
            exit_code, output, ..
        }) => {
            assert_eq!(exit_code, 1);
            assert!(output.contains("SonarScanner execution"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn custom_profile_is_checked_then_default_restored() {
    let root = tempfile::tempdir().unwrap();
    let world = java_world();
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let summary = h.analyze_language(&java()).await.unwrap();

    assert_eq!(summary.issues, 3);
    assert_eq!(summary.custom_profile, Some(("CNES_JAVA_A".to_owned(), 6)));
    assert_eq!(summary.to_string(), "3 open issues, 6 with CNES_JAVA_A");

    let state = world.state();
    assert_eq!(state.runs.len(), 2);
    assert_eq!(
        state.projects["java-dummy-project"].profile_for("java"),
        DEFAULT_QUALITY_PROFILE
    );
    assert_in_order(
        &state.api_calls,
        &[
            "add_project_to_profile:java-dummy-project=CNES_JAVA_A",
            "add_project_to_profile:java-dummy-project=Sonar way",
            "search_issues:java-dummy-project",
        ],
    );
}

#[tokio::test]
async fn default_profile_restored_when_custom_count_is_wrong() {
    let root = tempfile::tempdir().unwrap();
    let world = java_world();
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);
    let scenario = LanguageScenario {
        expected_issues_custom_profile: 7,
        ..java()
    };

    let err = h.analyze_language(&scenario).await.unwrap_err();

    match err {
        HarnessError::Check(CheckError::IssueCountMismatch { profile, actual, .. }) => {
            assert_eq!(profile, "CNES_JAVA_A");
            assert_eq!(actual, 6);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        world.state().projects["java-dummy-project"].profile_for("java"),
        DEFAULT_QUALITY_PROFILE
    );
}

#[tokio::test]
async fn default_profile_restored_when_reanalysis_fails() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new()
        .with_profile("CNES_JAVA_A", "java")
        .with_analyzer({
            let analyze = language_analyzer(
                "java",
                "java-dummy-project",
                JAVA_SENSORS,
                &[("Sonar way", 3)],
            );
            move |spec: &ContainerSpec, state: &mut SimState| {
                if state.runs.len() > 1 {
                    ContainerOutput {
                        exit_code: 3,
                        stdout: String::new(),
                    }
                } else {
                    analyze(spec, state)
                }
            }
        });
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h.analyze_language(&java()).await.unwrap_err();

    assert!(matches!(err, HarnessError::Container(_)));
    assert_eq!(
        world.state().projects["java-dummy-project"].profile_for("java"),
        DEFAULT_QUALITY_PROFILE
    );
}

#[tokio::test]
async fn first_page_only_unless_all_pages_requested() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(language_analyzer(
        "VHDL",
        "demo_project_plasma",
        VHDL_SENSORS,
        &[("Sonar way", 250)],
    ));
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let first_page = LanguageScenario {
        expected_issues: 250,
        ..vhdl()
    };
    let err = h.analyze_language(&first_page).await.unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Check(CheckError::IssueCountMismatch { actual: 100, .. })
    ));

    let all_pages = LanguageScenario {
        count_all_pages: true,
        ..first_page
    };
    let summary = h.analyze_language(&all_pages).await.unwrap();
    assert_eq!(summary.issues, 250);
}
