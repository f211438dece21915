mod common;

use common::WireHandle;
use pretty_assertions::assert_eq;
use rkclink_core::manager::{ConnectionState, ControllerManager, ManagerConfig};
use rkclink_core::protocol::ProtocolError;

fn test_config() -> ManagerConfig {
    ManagerConfig {
        address: "01".to_string(),
        ..Default::default()
    }
}

#[test]
fn connect_verifies_link_with_test_poll() {
    let wire = WireHandle::new();
    wire.queue_frame("M1", "-0150.0");

    let manager = ControllerManager::new(test_config());
    manager
        .connect_with(wire.transport())
        .expect("liveness poll succeeds");

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(manager.is_connected());
    assert_eq!(manager.cached_status().current_temperature, Some(-150.0));

    // The test poll is a normal poll exchange: EOT then "01M1" + ENQ
    assert_eq!(wire.writes(), vec![b"\x04".to_vec(), b"01M1\x05".to_vec()]);
}

#[test]
fn failed_test_poll_leaves_manager_disconnected() {
    let wire = WireHandle::new();
    // Nothing queued: every read attempt times out

    let manager = ControllerManager::new(test_config());
    let err = manager
        .connect_with(wire.transport())
        .expect_err("liveness poll exhausts its retries");
    assert!(matches!(err, ProtocolError::RetryExhausted));

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(matches!(
        manager.get_status(),
        Err(ProtocolError::NotConnected)
    ));
}

#[test]
fn get_status_refreshes_all_three_identifiers() {
    let wire = WireHandle::new();
    wire.queue_frame("M1", "00023.4");

    let manager = ControllerManager::new(test_config());
    manager.connect_with(wire.transport()).unwrap();

    wire.queue_frame("M1", "00023.5");
    wire.queue_frame("S1", "00025.0");
    wire.queue_frame("O1", "00012.5");

    let status = manager.get_status().expect("connected");
    assert_eq!(status.current_temperature, Some(23.5));
    assert_eq!(status.target_temperature, Some(25.0));
    assert_eq!(status.output_value, Some(12.5));
    assert_eq!(manager.cached_status(), status);
}

#[test]
fn get_status_keeps_cache_on_mid_sequence_failure() {
    let wire = WireHandle::new();
    wire.queue_frame("M1", "00023.4");

    let manager = ControllerManager::new(test_config());
    manager.connect_with(wire.transport()).unwrap();

    wire.queue_frame("M1", "00023.5");
    wire.queue_frame("S1", "00025.0");
    wire.queue_frame("O1", "00012.5");
    manager.get_status().unwrap();

    // Next refresh: M1 arrives, then the controller goes quiet
    wire.queue_frame("M1", "00023.6");
    let status = manager.get_status().expect("failure collapses to cache");

    assert_eq!(status.current_temperature, Some(23.6));
    // Setpoint and output hold the last successfully observed values
    assert_eq!(status.target_temperature, Some(25.0));
    assert_eq!(status.output_value, Some(12.5));
    assert!(manager.is_connected());
}

#[test]
fn set_temperature_performs_select_exchange() {
    let wire = WireHandle::new();
    wire.queue_frame("M1", "00023.4");

    let manager = ControllerManager::new(test_config());
    manager.connect_with(wire.transport()).unwrap();

    wire.queue_bytes(&[0x06]); // ACK
    manager.set_temperature(-150.0).expect("acknowledged");

    assert_eq!(manager.cached_status().target_temperature, Some(-150.0));

    // Select writes after the connect exchange: EOT, message, EOT
    let writes = wire.writes();
    assert_eq!(writes.len(), 5);
    assert_eq!(writes[2], b"\x04".to_vec());
    assert_eq!(writes[3], b"01\x02S1-0150.0\x03V".to_vec());
    assert_eq!(writes[4], b"\x04".to_vec());
}

#[test]
fn set_temperature_rejects_invalid_input_before_io() {
    let wire = WireHandle::new();
    wire.queue_frame("M1", "00023.4");

    let manager = ControllerManager::new(test_config());
    manager.connect_with(wire.transport()).unwrap();
    let baseline = wire.write_count();

    for value in [f64::NAN, f64::INFINITY, 1_000_000.0] {
        assert!(matches!(
            manager.set_temperature(value),
            Err(ProtocolError::InvalidInput(_))
        ));
    }
    assert_eq!(wire.write_count(), baseline);
}

#[test]
fn set_temperature_failure_leaves_cached_target_untouched() {
    let wire = WireHandle::new();
    wire.queue_frame("M1", "00023.4");

    let manager = ControllerManager::new(test_config());
    manager.connect_with(wire.transport()).unwrap();

    wire.queue_bytes(b"a"); // neither ACK nor NAK
    let err = manager.set_temperature(30.0).expect_err("garbage ack");
    assert!(matches!(err, ProtocolError::UnexpectedAck(b'a')));
    assert_eq!(manager.cached_status().target_temperature, None);
}

#[test]
fn disconnect_releases_link_but_keeps_cache() {
    let wire = WireHandle::new();
    wire.queue_frame("M1", "00023.4");

    let manager = ControllerManager::new(test_config());
    manager.connect_with(wire.transport()).unwrap();
    manager.disconnect();

    assert!(!manager.is_connected());
    assert!(matches!(
        manager.get_status(),
        Err(ProtocolError::NotConnected)
    ));
    // Last-known values survive the disconnect
    assert_eq!(manager.cached_status().current_temperature, Some(23.4));
}

#[test]
fn connect_with_rejects_double_connect() {
    let wire = WireHandle::new();
    wire.queue_frame("M1", "00023.4");

    let manager = ControllerManager::new(test_config());
    manager.connect_with(wire.transport()).unwrap();

    let second = WireHandle::new();
    assert!(matches!(
        manager.connect_with(second.transport()),
        Err(ProtocolError::AlreadyConnected)
    ));
}
