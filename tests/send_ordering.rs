//! Write path: byte fidelity across chunking, and ordering guarantees.

mod common;

use std::time::Duration;

use nusterm::ble::mock::{Behavior, MockHost};
use nusterm::session::Session;

#[tokio::test]
async fn sent_line_arrives_byte_identical_across_chunks() {
    let mut host = MockHost::new().with_transfer_unit(4);
    let robot = host.add_device(common::ROBOT_NAME, common::ROBOT_ADDR, Behavior::Accept);
    let session = Session::connect(&host, common::ROBOT_NAME, Duration::from_secs(1))
        .await
        .expect("connect");

    session.send("TURN:LEFT:90").await.expect("send");

    let chunks = robot.written_chunks();
    assert!(chunks.len() > 1, "payload should have been split");
    assert!(chunks.iter().all(|c| c.len() <= 4));
    assert_eq!(robot.written_bytes(), b"TURN:LEFT:90\n".to_vec());
}

#[tokio::test]
async fn terminator_is_not_duplicated() {
    let (host, robot) = common::world_with_robot();
    let session = Session::connect(&host, common::ROBOT_NAME, Duration::from_secs(1))
        .await
        .expect("connect");

    session.send("PING\n").await.expect("send");
    assert_eq!(robot.written_bytes(), b"PING\n".to_vec());
}

#[tokio::test]
async fn back_to_back_sends_preserve_order() {
    let (host, robot) = common::world_with_robot();
    let session = Session::connect(&host, common::ROBOT_NAME, Duration::from_secs(1))
        .await
        .expect("connect");

    session.send("LED:ON").await.expect("first send");
    session.send("LED:OFF").await.expect("second send");

    assert_eq!(robot.written_bytes(), b"LED:ON\nLED:OFF\n".to_vec());
}

#[tokio::test]
async fn concurrent_sends_never_interleave_chunks() {
    // A small transfer unit makes interleaving observable if the writer
    // queue ever stopped serializing whole lines.
    let mut host = MockHost::new().with_transfer_unit(3);
    let robot = host.add_device(common::ROBOT_NAME, common::ROBOT_ADDR, Behavior::Accept);
    let session = Session::connect(&host, common::ROBOT_NAME, Duration::from_secs(1))
        .await
        .expect("connect");
    let (handle, _events) = session.split();

    let first = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.send("LED:ON").await })
    };
    let second = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.send("LED:OFF").await })
    };
    first.await.unwrap().expect("send");
    second.await.unwrap().expect("send");

    let bytes = robot.written_bytes();
    assert!(
        bytes == b"LED:ON\nLED:OFF\n".to_vec() || bytes == b"LED:OFF\nLED:ON\n".to_vec(),
        "lines interleaved: {:?}",
        bytes
    );
}
