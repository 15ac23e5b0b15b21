//! Server lifecycle: setup, teardown and the guarantees of `run_suite`.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use sonarcheck_core::error::{CheckError, HarnessError};

use crate::helpers::assertions::*;
use crate::helpers::config::TestConfigBuilder;
use crate::helpers::harness;
use crate::helpers::world::*;

#[tokio::test]
async fn setup_launches_server_on_bridge_network() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new();
    let mut h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    h.setup().await.unwrap();

    {
        let state = world.state();
        assert!(state.networks.contains("sonarbridge"));
        let server = state
            .containers
            .get("lequalsonarqube")
            .expect("server container should run");
        assert_eq!(server.image, "lequal/sonarqube:latest");
        assert_eq!(server.network.as_deref(), Some("sonarbridge"));
        assert_eq!(server.env_value("SONARQUBE_ADMIN_PASSWORD"), Some("adminpassword"));
        assert_eq!(server.ports.len(), 1);
        assert_eq!((server.ports[0].host, server.ports[0].container), (9000, 9000));
        assert!(server.auto_remove);
    }
    assert!(root.path().join(".sonarcache").is_dir());

    h.teardown().await.unwrap();
    assert_released(&world);
}

#[tokio::test]
async fn custom_host_port_keeps_server_listening_on_9000() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(|_, _| success("INFO: ANALYSIS SUCCESSFUL"));
    let mut h = harness(
        TestConfigBuilder::new(root.path()).host_port(9001).build(),
        &world,
    );

    h.run_suite(async |h| {
        {
            let state = world.state();
            let server = &state.containers["lequalsonarqube"];
            assert_eq!((server.ports[0].host, server.ports[0].container), (9001, 9000));
        }
        h.analyze("tests/vhdl").await.map(drop)
    })
    .await
    .unwrap();

    let state = world.state();
    assert_eq!(
        state.runs[0].env_value("SONAR_HOST_URL"),
        Some("http://lequalsonarqube:9000")
    );
}

#[tokio::test]
async fn attach_mode_leaves_running_server_alone() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_running_server("lequalsonarqube");
    let mut h = harness(TestConfigBuilder::new(root.path()).run(false).build(), &world);

    h.setup().await.unwrap();
    h.teardown().await.unwrap();

    let state = world.state();
    assert!(state.networks.is_empty(), "no network should be created");
    assert!(state.containers.contains_key("lequalsonarqube"));
}

#[tokio::test]
async fn teardown_runs_after_failed_body() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new();
    let mut h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h
        .run_suite(async |_| -> Result<(), HarnessError> {
            Err(CheckError::ProfileNotFound("CNES_JAVA_A".to_owned()).into())
        })
        .await
        .unwrap_err();

    assert!(err.is_check_failure());
    assert_released(&world);
}

#[tokio::test]
async fn teardown_runs_after_panicking_body() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new();
    let mut h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let outcome = AssertUnwindSafe(h.run_suite(async |_| -> Result<(), HarnessError> {
        panic!("scenario panicked");
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err(), "panic should be resumed");
    assert_released(&world);
}

#[tokio::test]
async fn existing_network_fails_setup_and_is_kept() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new();
    world.state().networks.insert("sonarbridge".to_owned());
    let mut h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    let err = h
        .run_suite(async |_| Ok(()))
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::Container(_)));
    let state = world.state();
    assert!(state.networks.contains("sonarbridge"));
    assert!(state.containers.is_empty());
}

#[tokio::test]
async fn basic_auth_gives_scanner_only_the_server_url() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(|_, _| success("INFO: ANALYSIS SUCCESSFUL"));
    let mut h = harness(TestConfigBuilder::new(root.path()).build(), &world);

    h.run_suite(async |h| h.analyze("tests/vhdl").await.map(drop))
        .await
        .unwrap();

    let state = world.state();
    let run = &state.runs[0];
    assert_eq!(run.env_value("SONAR_HOST_URL"), Some("http://lequalsonarqube:9000"));
    assert_eq!(run.env_value("SONAR_TOKEN"), None);
    assert!(state.calls_starting_with("generate_token").is_empty());
}

#[tokio::test]
async fn token_auth_hands_a_fresh_token_to_the_scanner_and_revokes_it() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().with_analyzer(|_, _| success("INFO: ANALYSIS SUCCESSFUL"));
    let mut h = harness(
        TestConfigBuilder::new(root.path()).token_auth().build(),
        &world,
    );

    h.run_suite(async |h| {
        assert!(h.scanner().token.is_some());
        h.analyze("tests/vhdl").await.map(drop)
    })
    .await
    .unwrap();

    let state = world.state();
    let token = state.runs[0]
        .env_value("SONAR_TOKEN")
        .expect("scanner should get a token");
    assert!(token.starts_with("squ_sonarcheck-"), "token: {token}");

    let generated = state.calls_starting_with("generate_token");
    let revoked = state.calls_starting_with("revoke_token");
    assert_eq!(generated.len(), 1);
    let name = generated[0].trim_start_matches("generate_token:");
    assert_eq!(name, revoked[0].trim_start_matches("revoke_token:"));

    // API calls between setup and teardown use the token; revocation goes
    // back to the admin account.
    assert_in_order(
        &state.api_calls,
        &[
            format!("generate_token:{name}"),
            format!("set_credentials:token:squ_{name}"),
            "set_credentials:basic:admin".to_owned(),
            format!("revoke_token:{name}"),
        ],
    );
    drop(state);

    assert!(h.scanner().token.is_none());
    assert_released(&world);
}

#[tokio::test]
async fn failed_revocation_does_not_stop_the_rest_of_teardown() {
    let root = tempfile::tempdir().unwrap();
    let world = SimWorld::new().failing("revoke_token");
    let mut h = harness(
        TestConfigBuilder::new(root.path()).token_auth().build(),
        &world,
    );

    let err = h.run_suite(async |_| Ok(())).await.unwrap_err();

    assert!(matches!(err, HarnessError::Server(_)));
    let state = world.state();
    assert!(state.networks.is_empty());
    assert!(state.containers.is_empty());
}
