//! Integration tests for the live path over a real WebSocket: connect with
//! the token in the URI, receive single and batch frames, send, reconnect.
//! Uses a minimal in-process WebSocket server (no mocks).

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use homie_chat::{ChatSession, ConnectionState, Message, NoHistory, SessionOptions, WsConnector};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

fn options(port: u16) -> SessionOptions {
    SessionOptions::new(Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap())
        .with_reconnect_delay(Duration::from_millis(50))
}

fn json(m: &Message) -> WsMessage {
    WsMessage::Text(serde_json::to_string(m).unwrap())
}

async fn wait_feed_len(session: &ChatSession, len: usize) {
    tokio::time::timeout(WAIT, session.status().wait_for(|s| s.feed_len >= len))
        .await
        .expect("feed did not grow in time")
        .unwrap();
}

#[tokio::test]
async fn live_session_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (uri_tx, uri_rx) = std::sync::mpsc::channel::<String>();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let record_uri = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = uri_tx.send(req.uri().to_string());
            Ok(resp)
        };
        let ws = tokio_tungstenite::accept_hdr_async(tcp, record_uri)
            .await
            .unwrap();
        let (mut write, mut read) = ws.split();

        // Replay on connect, then a batch overlapping it.
        let hi = Message::new("hi", "u1", "Ana", "t1");
        let yo = Message::new("yo", "u2", "Bo", "t2");
        write.send(json(&hi)).await.unwrap();
        let batch = serde_json::to_string(&vec![hi.clone(), yo]).unwrap();
        write.send(WsMessage::Text(batch)).await.unwrap();

        // Echo whatever the client sends, then answer as the assistant.
        while let Some(Ok(WsMessage::Text(text))) = read.next().await {
            let sent: serde_json::Value = serde_json::from_str(&text).unwrap();
            let content = sent["content"].as_str().unwrap().to_string();
            assert_eq!(sent.as_object().unwrap().len(), 1, "only content is sent");
            write
                .send(json(&Message::new(content, "u1", "Ana", "t3")))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            write
                .send(json(&Message::new("On it!", "bot", "Homie 🤖", "t4")))
                .await
                .unwrap();
        }
    });

    let session = ChatSession::open(
        &options(port),
        "group-7",
        "tok en",
        Arc::new(WsConnector::new()),
        NoHistory,
    )
    .unwrap();

    tokio::time::timeout(WAIT, session.status().wait_for(|s| s.is_live()))
        .await
        .expect("should go live")
        .unwrap();
    assert_eq!(
        uri_rx.recv_timeout(WAIT).unwrap(),
        "/api/v1/chat/group-7?token=tok+en"
    );

    wait_feed_len(&session, 2).await;
    assert!(session.send("@Homie remind me"));
    assert!(session.peer_is_active());

    wait_feed_len(&session, 3).await;
    assert!(session.peer_is_active());
    wait_feed_len(&session, 4).await;
    assert!(!session.peer_is_active());

    let contents: Vec<_> = session.feed().into_iter().map(|m| m.content).collect();
    assert_eq!(contents, ["hi", "yo", "@Homie remind me", "On it!"]);
}

#[tokio::test]
async fn reconnects_after_server_drops_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let first = Message::new("first", "u1", "Ana", "t1");

        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        ws.send(json(&first)).await.unwrap();
        let _ = ws.close(None).await;
        drop(ws);

        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        ws.send(json(&first)).await.unwrap();
        ws.send(json(&Message::new("second", "u2", "Bo", "t2")))
            .await
            .unwrap();
        // Hold the connection open.
        while ws.next().await.is_some() {}
    });

    let session =
        ChatSession::open(&options(port), "g1", "t", Arc::new(WsConnector::new()), NoHistory).unwrap();

    wait_feed_len(&session, 2).await;
    let status = *session.status().borrow();
    assert!(status.attempts >= 2);
    let contents: Vec<_> = session.feed().into_iter().map(|m| m.content).collect();
    assert_eq!(contents, ["first", "second"]);
}

#[tokio::test]
async fn unreachable_server_keeps_retrying() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };

    let session =
        ChatSession::open(&options(port), "g1", "t", Arc::new(WsConnector::new()), NoHistory).unwrap();

    tokio::time::timeout(WAIT, session.status().wait_for(|s| s.attempts >= 3))
        .await
        .expect("should keep retrying")
        .unwrap();
    assert!(!session.is_live());
    assert!(!session.send("hello?"));

    session.close();
    assert_eq!(session.state(), ConnectionState::Closed);
    let attempts = session.status().borrow().attempts;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(session.status().borrow().attempts, attempts);
}

#[tokio::test]
async fn stalled_handshake_times_out_and_retries() {
    // Accepts TCP but never answers the upgrade request.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((tcp, _)) = listener.accept().await {
            held.push(tcp);
        }
    });

    let connector = WsConnector::new().with_handshake_timeout(Duration::from_millis(100));
    let session =
        ChatSession::open(&options(port), "g1", "t", Arc::new(connector), NoHistory).unwrap();

    tokio::time::timeout(WAIT, session.status().wait_for(|s| s.attempts >= 3))
        .await
        .expect("stalled handshake should be retried")
        .unwrap();
    assert!(!session.is_live());
}
