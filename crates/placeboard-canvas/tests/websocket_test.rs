//! WebSocket transport tests
//!
//! Serve the canvas endpoint on a loopback port and talk to it with a real
//! client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use futures::{SinkExt, StreamExt};
use placeboard_canvas::store::BLANK_MAP;
use placeboard_canvas::{
    canvas_ws_handler, AggregateState, CanvasState, CanvasValidator, MessageHandler,
    ReplacePipeline, ServerMessage, SessionRegistry, StateStore,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(dir: &TempDir) -> (SocketAddr, Arc<CanvasState>) {
    let registry = Arc::new(SessionRegistry::new());
    let store = Arc::new(StateStore::new(
        dir.path().join("data.json"),
        AggregateState::bootstrap(),
    ));
    let validator = CanvasValidator::default();
    let handler = MessageHandler::new(store.clone(), validator.size());
    let replace = Arc::new(ReplacePipeline::new(
        validator,
        registry.clone(),
        store.clone(),
        dir.path().join("maps"),
    ));
    let state = Arc::new(CanvasState::new(registry, store, handler, replace));

    let app = Router::new()
        .route("/api/ws", get(canvas_ws_handler))
        .with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(format!("ws://{}/api/ws", addr))
        .await
        .unwrap();
    client
}

async fn send(client: &mut Client, frame: &str) {
    client.send(Message::text(frame.to_owned())).await.unwrap();
}

async fn recv_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_for_count(state: &CanvasState, expected: usize) {
    for _ in 0..100 {
        if state.registry.count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "expected {} sessions, found {}",
        expected,
        state.registry.count().await
    );
}

#[tokio::test]
async fn test_bad_frames_keep_the_connection_serving() {
    let dir = TempDir::new().unwrap();
    let (addr, state) = serve(&dir).await;
    let mut client = connect(addr).await;

    send(&mut client, "{ not json").await;
    assert_eq!(
        recv_json(&mut client).await,
        json!({"type": "error", "data": "parse error"})
    );

    send(&mut client, r#"{"type":"ping"}"#).await;
    assert_eq!(recv_json(&mut client).await, json!({"type": "pong"}));

    send(&mut client, r#"{"x":1}"#).await;
    assert_eq!(
        recv_json(&mut client).await,
        json!({"type": "error", "data": "missing type"})
    );

    send(&mut client, r#"{"type":"placepixel","x":1999,"y":1999,"color":0}"#).await;
    send(&mut client, r#"{"type":"placepixel","x":2000,"y":0,"color":0}"#).await;
    send(&mut client, r#"{"type":"GetMap"}"#).await;
    assert_eq!(
        recv_json(&mut client).await,
        json!({"type": "map", "data": BLANK_MAP, "reason": null})
    );
    assert_eq!(state.store.pixels_placed().await, 1);
}

#[tokio::test]
async fn test_closed_connection_leaves_the_broadcast_set() {
    let dir = TempDir::new().unwrap();
    let (addr, state) = serve(&dir).await;

    let mut first = connect(addr).await;
    let mut second = connect(addr).await;
    wait_for_count(&state, 2).await;

    first.close(None).await.unwrap();
    wait_for_count(&state, 1).await;

    let delivered = state
        .registry
        .broadcast(&ServerMessage::map("next.png", Some("Nouvelle carte".into())))
        .await
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(
        recv_json(&mut second).await,
        json!({"type": "map", "data": "next.png", "reason": "Nouvelle carte"})
    );
}
