//! Integration tests for ftss-net.
//!
//! These tests run client and server connections over real loopback TCP.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::time::Duration;

use ftss_net::{
    Connection, ConnectionConfig, ConnectionError, ConnectionState, ConnectionWaiter, MaxWait,
    Packet, RequestType, TcpConnection,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Start a waiter on an ephemeral loopback port.
async fn waiter() -> (ConnectionWaiter, mpsc::Receiver<Box<dyn Connection>>, u16) {
    let (tx, rx) = mpsc::channel();
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let waiter = ConnectionWaiter::bind_addr(addr, move |conn| {
        tx.send(conn).unwrap();
    })
    .await
    .unwrap();
    let port = waiter.local_addr().unwrap().port();
    (waiter, rx, port)
}

/// Test a login exchange with a notification arriving before the reply.
#[tokio::test]
async fn test_login_roundtrip() {
    let (mut waiter, rx, port) = waiter().await;

    let server = tokio::spawn(async move {
        assert!(waiter.wait_for_then_do_connection(MaxWait::default()).await);
        let mut conn = rx.recv().unwrap();

        let mut request = conn
            .wait_for_then_get_packet_with_type(RequestType::LOGIN)
            .await
            .unwrap();
        let user = request.get_string();
        let password = request.get_string();

        let mut notification = Packet::new(RequestType::CHAT_MOTTO_CHANGED);
        notification.append_str("welcome").unwrap();
        conn.send(&notification).await.unwrap();

        let mut reply = Packet::new(RequestType::LOGIN);
        let result: i8 = if user == "alice" && password == "secret" { 0 } else { -1 };
        reply.append(result).unwrap();
        conn.send(&reply).await.unwrap();
        conn
    });

    let mut client = TcpConnection::connect("127.0.0.1", port, ConnectionConfig::default())
        .await
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    let mut packet = Packet::new(RequestType::LOGIN);
    packet.append_str("alice").unwrap().append_str("secret").unwrap();
    client.mreq(&mut packet).await.unwrap();

    assert_eq!(packet.request_type(), RequestType::LOGIN);
    assert_eq!(packet.get::<i8>(), 0);

    let mut notification = client.get_received_packet_if_any().await.unwrap();
    assert_eq!(notification.request_type(), RequestType::CHAT_MOTTO_CHANGED);
    assert_eq!(notification.get_string(), "welcome");

    let server_conn = server.await.unwrap();
    assert_eq!(server_conn.stats().total_sent(), 2);
    assert_eq!(client.stats().total_received(), 2);
}

/// Test that a nested list survives the wire.
#[tokio::test]
async fn test_nested_game_list() {
    let (mut waiter, rx, port) = waiter().await;

    let server = tokio::spawn(async move {
        waiter.wait_for_then_do_connection(MaxWait::default()).await;
        let mut conn = rx.recv().unwrap();
        conn.wait_for_then_get_packet(true).await.unwrap();

        let mut list = Packet::new(RequestType::GAME_LST);
        list.append(2u16).unwrap();
        for (name, players) in [("first", 2u8), ("second", 4u8)] {
            let mut game = Packet::new(RequestType::GAME_INFO);
            game.append_str(name).unwrap().append(players).unwrap();
            game.write_to_packet(&mut list).unwrap();
        }
        conn.send(&list).await.unwrap();
        conn
    });

    let mut client = TcpConnection::connect("127.0.0.1", port, ConnectionConfig::default())
        .await
        .unwrap();
    let mut packet = Packet::new(RequestType::GAME_LST);
    // Frames with an empty payload are dropped by the receiver.
    packet.append(0u8).unwrap();
    client.mreq(&mut packet).await.unwrap();

    let count = packet.get::<u16>();
    let mut games = Vec::new();
    for _ in 0..count {
        let mut game = Packet::new(RequestType::NULL);
        game.read_from_packet(&mut packet).unwrap();
        assert_eq!(game.request_type(), RequestType::GAME_INFO);
        games.push((game.get_string(), game.get::<u8>()));
    }

    assert_eq!(games, vec![("first".to_string(), 2), ("second".to_string(), 4)]);
    server.await.unwrap();
}

/// Test resynchronization when garbage precedes a frame on a real socket.
#[tokio::test]
async fn test_garbage_before_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let frame = Packet::from_parts(RequestType::FEEDBACK, b"thanks\0").unwrap();
        socket.write_all(b"FTS\x00noise").await.unwrap();
        socket.write_all(frame.as_bytes()).await.unwrap();
        socket
    });

    let mut client = TcpConnection::connect("127.0.0.1", port, ConnectionConfig::default())
        .await
        .unwrap();
    let mut packet = client.wait_for_then_get_packet(false).await.unwrap();

    assert_eq!(packet.request_type(), RequestType::FEEDBACK);
    assert_eq!(packet.get_string(), "thanks");
    let _socket = server.await.unwrap();
}

/// Test that a closed counterpart is noticed by the next receive.
#[tokio::test]
async fn test_counterpart_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);
    });

    let mut client = TcpConnection::connect("127.0.0.1", port, ConnectionConfig::default())
        .await
        .unwrap();
    server.await.unwrap();

    assert!(client.wait_for_then_get_packet(false).await.is_none());
    assert!(!client.is_connected());

    let err = client.send(&Packet::new(RequestType::LOGIN)).await.unwrap_err();
    assert!(matches!(err, ConnectionError::NotConnected));
}

/// Test reconnecting after an explicit disconnect.
#[tokio::test]
async fn test_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let first = listener.accept().await.unwrap();
        let second = listener.accept().await.unwrap();
        (first, second)
    });

    let mut client = TcpConnection::connect("127.0.0.1", port, ConnectionConfig::default())
        .await
        .unwrap();
    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);

    client.reconnect("127.0.0.1", port).await.unwrap();
    assert!(client.is_connected());
    server.await.unwrap();
}

/// Test that a silent server makes `mreq` fail within the max wait.
#[tokio::test]
async fn test_mreq_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move { listener.accept().await.unwrap() });

    let config =
        ConnectionConfig::default().with_max_wait(MaxWait::Bounded(Duration::from_millis(100)));
    let mut client = TcpConnection::connect("127.0.0.1", port, config).await.unwrap();

    let started = std::time::Instant::now();
    let mut packet = Packet::new(RequestType::PLAYER_GET);
    let err = client.mreq(&mut packet).await.unwrap_err();

    assert!(matches!(err, ConnectionError::Receive(_)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(client.is_connected());
    let _socket = server.await.unwrap();
}

/// Test that an unknown host is reported as a host name error.
#[tokio::test]
async fn test_unknown_host() {
    let err = TcpConnection::connect("no-such-host.invalid", 80, ConnectionConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectionError::HostName { .. }));
}

/// Test that statistics can be dumped as JSON after traffic.
#[tokio::test]
async fn test_stats_json_after_traffic() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move { listener.accept().await.unwrap() });

    let mut client = TcpConnection::connect("127.0.0.1", port, ConnectionConfig::default())
        .await
        .unwrap();
    let mut packet = Packet::new(RequestType::CHAT_SENDMSG);
    packet.append_str("hi").unwrap();
    client.send(&packet).await.unwrap();
    client.send(&packet).await.unwrap();

    let json: serde_json::Value = serde_json::from_str(&client.stats().to_json().unwrap()).unwrap();
    assert_eq!(json["by_type"]["48"]["sent"], 2);
    let _socket = server.await.unwrap();
}
