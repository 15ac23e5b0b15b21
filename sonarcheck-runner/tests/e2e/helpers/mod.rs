//! Shared E2E test helpers: simulated runtime and server, config builder
//! and world assertions.

pub mod assertions;

use sonarcheck_core::config::HarnessConfig;
use sonarcheck_runner::Harness;

use world::{FakeDocker, FakeSonar, SimWorld};

pub type SimHarness = Harness<FakeDocker, FakeSonar>;

/// Harness wired to `world`.
#[allow(dead_code)]
pub fn harness(config: HarnessConfig, world: &SimWorld) -> SimHarness {
    Harness::new(config, world.docker(), world.api()).expect("harness should build")
}
