//! Integration tests for discovery and the device session.
//!
//! These tests drive the public API end-to-end over the in-process fake
//! display network, with the real file-backed repositories writing into a
//! throwaway directory per test.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tvr_core::{AddressRange, CommandKind, KeyCode, ProtocolError, SessionState};
use tvr_remote::application::device_session::{
    CommandError, ConnectError, DeviceSession, SessionTimeouts,
};
use tvr_remote::application::scan_subnet::{ScanOptions, SubnetScanner};
use tvr_remote::application::session_store::{ConfigRepository, SessionStore, TokenRepository};
use tvr_remote::infrastructure::device_control::mock::{FakeCall, FakeDeviceNetwork};
use tvr_remote::infrastructure::storage::config::{ConfigPaths, FileConfigRepository};
use tvr_remote::infrastructure::storage::tokens::FileTokenRepository;
use uuid::Uuid;

fn tv() -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, 5)
}

fn temp_paths() -> ConfigPaths {
    let dir: PathBuf = std::env::temp_dir().join(format!("tvr_it_{}", Uuid::new_v4()));
    ConfigPaths::new(dir)
}

/// Builds a session over `network` whose state lives in `paths`, the same way
/// a restarted process would.
fn session_in(network: &Arc<FakeDeviceNetwork>, paths: &ConfigPaths) -> DeviceSession {
    let store = SessionStore::new(
        Arc::new(FileConfigRepository::in_dir(paths)),
        Arc::new(FileTokenRepository::in_dir(paths)),
    );
    DeviceSession::new(network.clone(), Arc::new(store), SessionTimeouts::default())
}

// ── Discovery ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scan_finds_single_display_on_subnet() {
    // Arrange
    let network = Arc::new(FakeDeviceNetwork::new());
    network.add_device(tv(), "LivingRoomTV");
    let scanner = SubnetScanner::new(network.clone());

    // Act
    let result = scanner
        .scan_cidr("10.0.0.0/24", &ScanOptions::default())
        .await
        .expect("valid range");

    // Assert
    assert_eq!(result.len(), 1);
    let found = result.find(tv()).expect("display must be found");
    assert_eq!(found.display_name(), "LivingRoomTV");
    assert!(!result.timed_out());
}

#[tokio::test(start_paused = true)]
async fn test_scan_of_silent_subnet_stops_at_deadline() {
    // Arrange: every host hangs until its per-host timeout.
    let network = Arc::new(FakeDeviceNetwork::new());
    network.set_silent_hosts(true);
    let scanner = SubnetScanner::new(network.clone());
    let options = ScanOptions {
        concurrency: 10,
        per_host_timeout: Duration::from_secs(1),
        overall_deadline: Duration::from_secs(3),
    };
    let range = AddressRange::containing(Ipv4Addr::new(10, 0, 0, 0));

    // Act
    let started = tokio::time::Instant::now();
    let result = scanner.scan(range, &options).await;

    // Assert
    assert!(result.is_empty());
    assert!(result.timed_out());
    assert!(started.elapsed() <= Duration::from_secs(4));
}

// ── Connect ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_connects_yield_one_winner() {
    // Arrange
    let network = Arc::new(FakeDeviceNetwork::new());
    network.add_device(tv(), "LivingRoomTV");
    network.set_open_latency(Duration::from_millis(50));
    let paths = temp_paths();
    let session = session_in(&network, &paths);

    // Act
    let (first, second) = tokio::join!(session.connect(tv()), session.connect(tv()));

    // Assert
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(ConnectError::AlreadyConnecting))));
    assert_eq!(network.open_session_count(), 1);
    assert!(session.status().is_connected());

    std::fs::remove_dir_all(paths.dir()).ok();
}

#[tokio::test]
async fn test_token_survives_restart_and_is_presented() {
    // Arrange: first run pairs and persists the issued token.
    let network = Arc::new(FakeDeviceNetwork::new());
    network.add_device(tv(), "LivingRoomTV");
    let paths = temp_paths();
    session_in(&network, &paths)
        .connect(tv())
        .await
        .expect("first connect");

    // Act: a fresh session over the same directory reconnects.
    let restarted = session_in(&network, &paths);
    let identity = restarted.reconnect().await.expect("reconnect");

    // Assert
    assert_eq!(identity.display_name(), "LivingRoomTV");
    let opens: Vec<_> = network
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            FakeCall::Open { token, .. } => Some(token),
            _ => None,
        })
        .collect();
    assert_eq!(opens, vec![None, Some("token-1".to_string())]);

    std::fs::remove_dir_all(paths.dir()).ok();
}

#[tokio::test]
async fn test_revoked_token_is_replaced_after_pairing_again() {
    // Arrange
    let network = Arc::new(FakeDeviceNetwork::new());
    network.add_device(tv(), "LivingRoomTV");
    let paths = temp_paths();
    let session = session_in(&network, &paths);
    session.connect(tv()).await.expect("first connect");
    session.disconnect().await;
    network.revoke_tokens(tv());

    // Act
    session.connect(tv()).await.expect("connect after revocation");

    // Assert
    let stored = FileTokenRepository::in_dir(&paths)
        .load(tv())
        .expect("readable tokens")
        .expect("token stored");
    assert_eq!(stored.as_str(), "token-2");

    std::fs::remove_dir_all(paths.dir()).ok();
}

#[tokio::test]
async fn test_failed_connect_keeps_previous_remembered_device() {
    // Arrange
    let network = Arc::new(FakeDeviceNetwork::new());
    network.add_device(tv(), "LivingRoomTV");
    let paths = temp_paths();
    let session = session_in(&network, &paths);
    session.connect(tv()).await.expect("first connect");

    // Act
    let result = session.connect(Ipv4Addr::new(10, 0, 0, 77)).await;

    // Assert
    assert!(matches!(result, Err(ConnectError::Unreachable { .. })));
    let remembered = FileConfigRepository::in_dir(&paths)
        .load()
        .expect("readable device file");
    assert_eq!(remembered.address, Some(tv()));
    assert_eq!(remembered.display_name.as_deref(), Some("LivingRoomTV"));

    std::fs::remove_dir_all(paths.dir()).ok();
}

// ── Commands ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transport_failure_ends_session_with_reason() {
    // Arrange
    let network = Arc::new(FakeDeviceNetwork::new());
    network.add_device(tv(), "LivingRoomTV");
    let paths = temp_paths();
    let session = session_in(&network, &paths);
    session.connect(tv()).await.expect("connect");
    network.fail_next_call(ProtocolError::Transport("broken pipe".to_string()));

    // Act
    let key = CommandKind::Key(KeyCode::parse("KEY_VOLUP").expect("valid key"));
    let result = session.send_command(&key).await;

    // Assert
    assert!(matches!(result, Err(CommandError::TransportFailure(_))));
    match session.status() {
        SessionState::Disconnected { reason } => assert!(reason.is_some()),
        other => panic!("expected Disconnected, got {other:?}"),
    }
    assert_eq!(
        session.send_command(&key).await,
        Err(CommandError::NotConnected)
    );

    std::fs::remove_dir_all(paths.dir()).ok();
}

#[tokio::test]
async fn test_launch_by_name_falls_back_to_catalogue() {
    // Arrange: nothing listed, but the device accepts the catalogue id.
    let network = Arc::new(FakeDeviceNetwork::new());
    network.add_device(tv(), "LivingRoomTV");
    network.accept_launch(tv(), "3201907018807");
    let paths = temp_paths();
    let session = session_in(&network, &paths);
    session.connect(tv()).await.expect("connect");

    // Act
    let launched = session.launch_app_by_name("netflix").await;

    // Assert
    assert_eq!(launched.expect("launch").as_str(), "3201907018807");

    std::fs::remove_dir_all(paths.dir()).ok();
}
