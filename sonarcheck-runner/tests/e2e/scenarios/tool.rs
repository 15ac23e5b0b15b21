//! Standalone analysis tools compared against reference results.

use std::path::Path;

use sonarcheck_core::error::{CheckError, HarnessError};
use sonarcheck_docker::ContainerSpec;
use sonarcheck_runner::ToolScenario;

use crate::helpers::config::TestConfigBuilder;
use crate::helpers::harness;
use crate::helpers::world::*;

const REFERENCE: &str = "tests/c_cpp/reference-cppcheck-results.xml";
const OUTPUT: &str = "tests/c_cpp/tmp-cppcheck-results.xml";
const RESULTS: &str = "<?xml version=\"1.0\"?>\n<results version=\"2\">\n  <error id=\"arrayIndexOutOfBounds\"/>\n</results>\n";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn cppcheck(store_output: bool) -> ToolScenario {
    ToolScenario {
        tool: "cppcheck".to_owned(),
        args: vec![
            "cppcheck".to_owned(),
            "--xml-version=2".to_owned(),
            "tests/c_cpp/cppcheck/main.c".to_owned(),
        ],
        reference_file: REFERENCE.to_owned(),
        output_file: OUTPUT.to_owned(),
        store_output,
    }
}

#[tokio::test]
async fn stored_stdout_matching_reference_passes() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), REFERENCE, RESULTS);
    let world = SimWorld::new().with_analyzer(|_, _| success(RESULTS));
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let detail = h.run_analysis_tool(&cppcheck(true)).await.unwrap();

    assert!(detail.contains(REFERENCE));
    assert_eq!(
        std::fs::read_to_string(root.path().join(OUTPUT)).unwrap(),
        RESULTS
    );

    let state = world.state();
    let run = &state.runs[0];
    assert_eq!(run.args[0], "cppcheck");
    assert_eq!(run.network, None);
    assert_eq!(run.working_dir.as_deref(), Some("/usr/src"));
    assert_eq!(run.env_value("SONAR_HOST_URL"), None);
    assert_eq!(run.mounts.len(), 1, "tool runs get no cache mount");
}

#[tokio::test]
async fn different_output_is_a_mismatch() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), REFERENCE, RESULTS);
    let world = SimWorld::new().with_analyzer(|_, _| success(format!("{RESULTS}<!-- extra -->\n")));
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h.run_analysis_tool(&cppcheck(true)).await.unwrap_err();

    match err {
        HarnessError::Check(CheckError::OutputMismatch { actual, reference }) => {
            assert_eq!(actual, root.path().join(OUTPUT));
            assert_eq!(reference, root.path().join(REFERENCE));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn tool_written_output_is_compared_as_is() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), REFERENCE, RESULTS);
    let host_root = root.path().to_path_buf();
    let world = SimWorld::new().with_analyzer(move |_: &ContainerSpec, _: &mut SimState| {
        // the tool writes its own --output-file and prints progress only
        write(&host_root, OUTPUT, RESULTS);
        success("Checking tests/c_cpp/cppcheck/main.c ...\n")
    });
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    h.run_analysis_tool(&cppcheck(false)).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(root.path().join(OUTPUT)).unwrap(),
        RESULTS
    );
}

#[tokio::test]
async fn missing_reference_is_an_io_error() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(|_, _| success(RESULTS));
    let h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h.run_analysis_tool(&cppcheck(true)).await.unwrap_err();

    assert!(matches!(err, HarnessError::Io(_)));
    assert!(!err.is_check_failure());
}
