//! Connection establishment: success path and the fatal failure classes.

mod common;

use std::time::Duration;

use nusterm::ble::mock::{Behavior, MockHost};
use nusterm::errors::ClientError;
use nusterm::session::{Session, SessionState};

#[tokio::test]
async fn successful_connect_reaches_connected() {
    let (host, _robot) = common::world_with_robot();
    let session = Session::connect(&host, common::ROBOT_NAME, Duration::from_secs(1))
        .await
        .expect("connect");
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(session.device_name(), common::ROBOT_NAME);
}

#[tokio::test]
async fn refused_link_surfaces_connect_refused() {
    let mut host = MockHost::new();
    host.add_device(
        common::ROBOT_NAME,
        common::ROBOT_ADDR,
        Behavior::Refuse("peripheral busy"),
    );

    let err = Session::connect(&host, common::ROBOT_NAME, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ConnectRefused { reason, .. } if reason == "peripheral busy"));
}

#[tokio::test]
async fn unreachable_link_times_out() {
    let mut host = MockHost::new();
    host.add_device(common::ROBOT_NAME, common::ROBOT_ADDR, Behavior::Hang);

    let err = Session::connect(&host, common::ROBOT_NAME, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ConnectTimeout { .. }));
}

#[tokio::test]
async fn unknown_device_fails_before_any_link_attempt() {
    let (host, robot) = common::world_with_robot();

    let err = Session::connect(&host, "maqueen", Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::DeviceNotFound(_)));
    // The robot never saw a link, let alone a release.
    assert_eq!(robot.close_count(), 0);
}
