//! Readiness wait on the server log.

use sonarcheck_core::error::{ContainerError, HarnessError};

use crate::helpers::assertions::*;
use crate::helpers::config::TestConfigBuilder;
use crate::helpers::harness;
use crate::helpers::world::*;

#[tokio::test(start_paused = true)]
async fn waits_until_marker_is_logged() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().ready_after(Some(3));
    let mut h = harness(
        TestConfigBuilder::new(root.path()).ready_timing(10, 60).build(),
        &world,
    );

    let started = tokio::time::Instant::now();
    h.setup().await.unwrap();

    assert_eq!(world.state().log_polls, 3);
    assert_eq!(started.elapsed().as_secs(), 20);
}

#[tokio::test(start_paused = true)]
async fn wait_ready_reports_time_waited() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new()
        .with_running_server("lequalsonarqube")
        .ready_after(Some(4));
    let h = harness(
        TestConfigBuilder::new(root.path())
            .run(false)
            .ready_timing(5, 60)
            .build(),
        &world,
    );

    let waited = h.wait_ready().await.unwrap();

    assert_eq!(waited.as_secs(), 15);
    assert_eq!(world.state().log_polls, 4);
}

#[tokio::test(start_paused = true)]
async fn timeout_fails_setup_and_releases_server() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().ready_after(None);
    let mut h = harness(
        TestConfigBuilder::new(root.path()).ready_timing(10, 60).build(),
        &world,
    );

    let err = h.run_suite(async |_| Ok(())).await.unwrap_err();

    match err {
        HarnessError::Container(ContainerError::ReadinessTimeout { container, .. }) => {
            assert_eq!(container, "lequalsonarqube");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(world.state().log_polls >= 6);
    assert_released(&world);
}

#[tokio::test]
async fn missing_server_container_is_reported() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new();
    let mut h = harness(TestConfigBuilder::new(root.path()).run(false).build(), &world);

    let err = h.setup().await.unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Container(ContainerError::NotFound(_))
    ));
    assert_eq!(world.state().log_polls, 0);
}
