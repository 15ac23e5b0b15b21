//! Assertions over the simulated world.

use crate::helpers::world::SimWorld;

/// Everything the harness acquired on the runtime and server is released.
#[allow(dead_code)]
pub fn assert_released(world: &SimWorld) {
    let state = world.state();
    assert!(state.networks.is_empty(), "networks left: {:?}", state.networks);
    assert!(
        state.containers.is_empty(),
        "containers left: {:?}",
        state.containers.keys().collect::<Vec<_>>()
    );
    assert!(state.tokens.is_empty(), "tokens left: {:?}", state.tokens);
}

/// `expected` occurs in `calls` in this relative order.
#[allow(dead_code)]
pub fn assert_in_order<S: AsRef<str>>(calls: &[String], expected: &[S]) {
    let mut from = 0;
    for want in expected.iter().map(AsRef::as_ref) {
        match calls[from..].iter().position(|c| c == want) {
            Some(pos) => from += pos + 1,
            None => panic!("call '{want}' missing or out of order in {calls:#?}"),
        }
    }
}

/// No rule is active in any profile.
#[allow(dead_code)]
pub fn assert_no_active_rules(world: &SimWorld) {
    let state = world.state();
    assert!(
        state.active_rules.values().all(|rules| rules.is_empty()),
        "rules still active: {:?}",
        state.active_rules
    );
}
