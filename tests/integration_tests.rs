mod common;

use common::{endpoint, options, FakeCommandPort};
use gc100::{Command, ConnectorAddress, EndpointOptions, ErrorKind, Gc100, Gc100Error, SendIr};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn answer(reply: &str) -> Option<Vec<u8>> {
    Some(reply.as_bytes().to_vec())
}

/// Replies the way a unit with IR, relay and serial modules would
fn typical_unit(command: &str) -> Option<Vec<u8>> {
    match command {
        "getdevices" => answer("device,1,IR\rdevice,2,RELAY\rendlistdevices\r"),
        "getstate,4:1" => answer("state,4:1,0\r"),
        "setstate,3:1,1" => answer("state,3:1,1\r"),
        "setstate,3:1,0" => answer("state,3:1,0\r"),
        "get_IR,2:1" => answer("IR,2:1,IR\r"),
        "getversion,2" => answer("version,2,3.0-12\r"),
        cmd if cmd.starts_with("sendir,2:1,") => answer("completeir,2:1,7\r"),
        cmd if cmd.starts_with("blink") || cmd.starts_with("set_") || cmd.starts_with("stopir") => None,
        _ => answer("unknowncommand 14\r"),
    }
}

/// Integration tests for the command channel against a fake unit
#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_getdevices_lists_modules_in_order() {
        let device = FakeCommandPort::new(typical_unit);
        let stats = device.stats.clone();
        let gc = endpoint(device);

        let modules = gc.getdevices().await.unwrap();
        let summary: Vec<(u8, &str)> = modules.iter().map(|m| (m.module, m.kind.as_str())).collect();
        assert_eq!(summary, vec![(1, "IR"), (2, "RELAY")]);

        assert_eq!(stats.commands(), vec!["getdevices"]);
        assert_eq!(stats.open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_setstate_round_trip() {
        let device = FakeCommandPort::new(typical_unit);
        let stats = device.stats.clone();
        let gc = endpoint(device);

        let state = gc.setstate(&"3:1".into(), true).await.unwrap();
        assert_eq!(state.addr.as_str(), "3:1");
        assert!(state.is_active());
        assert_eq!(stats.commands(), vec!["setstate,3:1,1"]);
        assert_eq!(stats.ports.lock().unwrap().as_slice(), &[4998]);
    }

    #[tokio::test]
    async fn test_device_error_code_surfaces() {
        let device = FakeCommandPort::new(|_| answer("unknowncommand 12\r"));
        let gc = endpoint(device);

        let err = gc.getstate(&"4:1".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceCommand);
        assert_eq!(err.command_code(), Some(12));
        assert!(err.to_string().contains("Missing CR"));
    }

    #[tokio::test]
    async fn test_no_response_commands_complete() {
        let device = FakeCommandPort::new(typical_unit);
        let stats = device.stats.clone();
        let gc = endpoint(device);

        gc.blink(true).await.unwrap();
        gc.set_ir(&"2:1".into(), gc100::IrMode::SensorNotify).await.unwrap();
        gc.stopir(&"2:1".into()).await.unwrap();

        assert_eq!(
            stats.commands(),
            vec!["blink,1", "set_IR,2:1,SENSOR_NOTIFY", "stopir,2:1"]
        );
        assert_eq!(stats.connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_sendir_returns_completion() {
        let gc = endpoint(FakeCommandPort::new(typical_unit));
        let params = SendIr::new("2:1", 38000, "1,2,3,4").with_id(7);
        let reply = gc.sendir(&params).await.unwrap();
        assert_eq!(reply, "completeir,2:1,7");
    }

    #[tokio::test]
    async fn test_module_handles_share_the_endpoint() {
        let device = FakeCommandPort::new(typical_unit);
        let stats = device.stats.clone();
        let gc = endpoint(device);

        let relay = gc100::Relay::new(gc.clone(), "3:1");
        let ir = gc100::IrOutput::new(gc.clone(), "2:1");
        let sensor = gc100::DigitalInput::new(gc.clone(), "4:1");

        assert!(!relay.set(false).await.unwrap().is_active());
        assert_eq!(ir.get_ir().await.unwrap().mode, gc100::IrMode::Ir);
        assert_eq!(sensor.get_state().await.unwrap().state, 0);
        assert_eq!(stats.max_open.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_never_overlap() {
        let device = FakeCommandPort::new(typical_unit).with_delay(Duration::from_millis(5));
        let stats = device.stats.clone();
        let gc = endpoint(device);

        let mut handles = Vec::new();
        for i in 0..8 {
            let gc = gc.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    gc.getstate(&"4:1".into()).await.map(|_| ())
                } else {
                    gc.blink(false).await
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(stats.connects.load(Ordering::SeqCst), 8);
        assert_eq!(stats.max_open.load(Ordering::SeqCst), 1);
        assert_eq!(stats.open.load(Ordering::SeqCst), 0);

        let cooldown = options().cooldown;
        for pair in stats.connected_at().windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= cooldown);
        }
    }

    #[tokio::test]
    async fn test_cooldown_separates_connections() {
        let device = FakeCommandPort::new(typical_unit);
        let stats = device.stats.clone();
        let cooldown = Duration::from_millis(40);
        let gc = Gc100::new(
            device,
            EndpointOptions {
                cooldown,
                ..options()
            },
        );

        for _ in 0..3 {
            gc.blink(true).await.unwrap();
        }
        gc.getstate(&"4:1".into()).await.unwrap();

        let connected_at = stats.connected_at();
        assert_eq!(connected_at.len(), 4);
        for pair in connected_at.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap >= cooldown, "connections only {:?} apart", gap);
        }
    }

    #[tokio::test]
    async fn test_cancelled_caller_releases_gate() {
        let device = FakeCommandPort::new(typical_unit).with_delay(Duration::from_millis(100));
        let stats = device.stats.clone();
        let gc = endpoint(device);

        let caller = {
            let gc = gc.clone();
            tokio::spawn(async move { gc.getstate(&"4:1".into()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        // The abandoned exchange still finishes before the next one starts
        gc.blink(true).await.unwrap();
        assert_eq!(stats.commands(), vec!["getstate,4:1", "blink,1"]);
        assert_eq!(stats.max_open.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_list_closed_before_end_marker_fails() {
        let device = FakeCommandPort::new(|_| answer("device,1,3 IR\r")).hanging_up();
        let gc = endpoint(device);

        let err = gc.getdevices().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_request_closed_mid_frame_fails() {
        let device = FakeCommandPort::new(|_| answer("state,4:")).hanging_up();
        let gc = endpoint(device);

        let err = gc.getstate(&"4:1".into()).await.unwrap_err();
        assert!(matches!(err, Gc100Error::ConnectionClosedMidFrame { pending: 8 }));
    }

    #[tokio::test]
    async fn test_raw_request_passes_bytes_through() {
        let device = FakeCommandPort::new(typical_unit);
        let stats = device.stats.clone();
        let gc = endpoint(device);

        let reply = gc.raw_request(Command::raw("getstate,4:1")).await.unwrap();
        assert_eq!(reply, "state,4:1,0");
        assert_eq!(stats.commands(), vec!["getstate,4:1"]);
    }

    #[tokio::test]
    async fn test_set_net_is_refused_without_contacting_device() {
        let device = FakeCommandPort::new(typical_unit);
        let stats = device.stats.clone();
        let gc = endpoint(device);

        let err = gc.set_net().await.unwrap_err();
        assert!(matches!(err, Gc100Error::Unsupported(_)));
        assert_eq!(stats.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_getversion_over_loopback_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 64];
            while !received.ends_with(b"\r") {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending a full command");
                received.extend_from_slice(&buf[..n]);
            }
            // Split the reply across writes; the client must reassemble it
            socket.write_all(b"version,2,").await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            socket.write_all(b"3.0-12\r").await.unwrap();
            // Wait for the client to close its side
            let _ = socket.read(&mut buf).await;
            received
        });

        let gc = Gc100::connect_tcp("127.0.0.1", port);
        let version = gc.getversion(2).await.unwrap();
        assert_eq!(version.module, 2);
        assert_eq!(version.text, "3.0-12");
        assert_eq!(server.await.unwrap(), b"getversion,2\r");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let gc = Gc100::connect_tcp("127.0.0.1", port);
        let err = gc.getstate(&ConnectorAddress::new("4:1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
