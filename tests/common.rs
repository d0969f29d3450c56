//! Test fixtures: scripted Bluetooth worlds built on the in-memory backend.

use nusterm::ble::mock::{Behavior, MockHost, MockPeripheral};

pub const ROBOT_NAME: &str = "BBC micro:bit";
pub const ROBOT_ADDR: &str = "C0:4B:2F:11:22:33";

/// One reachable robot paired under the default name.
#[allow(dead_code)] // Not every test file uses every fixture.
pub fn world_with_robot() -> (MockHost, MockPeripheral) {
    let mut host = MockHost::new();
    let robot = host.add_device(ROBOT_NAME, ROBOT_ADDR, Behavior::Accept);
    (host, robot)
}
