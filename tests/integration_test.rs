//! Integration tests for Placeboard
//!
//! These tests drive placeboard-canvas the way the server wires it:
//! - Session registry and broadcast fan-out
//! - Message handler and aggregate counters
//! - Replace pipeline with validator, store and registry together
//! - Snapshot persistence across restarts

use std::io::{Cursor, Write};
use std::sync::Arc;

use placeboard_canvas::{
    AggregateState, CanvasSize, CanvasValidator, MessageHandler, ReplacePipeline, ReplaceRequest,
    ServerMessage, SessionRegistry, StateStore, UploadedImage, PALETTE, PNG_CONTENT_TYPE,
};
use secrecy::SecretString;
use tempfile::{NamedTempFile, TempDir};

const SIZE: CanvasSize = CanvasSize::new(8, 8);
const SECRET: &str = "integration-secret";

struct Server {
    dir: TempDir,
    registry: Arc<SessionRegistry>,
    store: Arc<StateStore>,
    handler: MessageHandler,
    pipeline: Arc<ReplacePipeline>,
}

fn server() -> Server {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(SessionRegistry::new());
    let store = Arc::new(StateStore::new(
        dir.path().join("data.json"),
        AggregateState::bootstrap(),
    ));
    let validator = CanvasValidator::new(SIZE);
    let handler = MessageHandler::new(store.clone(), validator.size());
    let pipeline = ReplacePipeline::new(
        validator,
        registry.clone(),
        store.clone(),
        dir.path().join("maps"),
    )
    .with_secret(SecretString::from(SECRET.to_string()));

    Server {
        dir,
        registry,
        store,
        handler,
        pipeline: Arc::new(pipeline),
    }
}

fn png_with(rgb_at: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_fn(SIZE.width, SIZE.height, |x, y| image::Rgb(rgb_at(x, y)));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn upload(server: &Server, bytes: &[u8], reason: &str) -> ReplaceRequest {
    let mut file = NamedTempFile::new_in(server.dir.path()).unwrap();
    file.write_all(bytes).unwrap();
    ReplaceRequest {
        image: Some(UploadedImage::new(file, Some(PNG_CONTENT_TYPE.to_string()))),
        reason: Some(reason.to_string()),
        password: Some(SecretString::from(SECRET.to_string())),
    }
}

// ============================================================================
// Session Registry Integration Tests
// ============================================================================

#[tokio::test]
async fn test_broadcast_reaches_every_open_session() {
    let server = server();
    let mut receivers = Vec::new();
    for _ in 0..3 {
        receivers.push(server.registry.open().await);
    }

    let delivered = server
        .registry
        .broadcast(&ServerMessage::map("a.png", None))
        .await
        .unwrap();
    assert_eq!(delivered, 3);

    let (gone, _) = receivers.remove(0);
    assert!(server.registry.unregister(gone).await);

    let delivered = server
        .registry
        .broadcast(&ServerMessage::map("b.png", None))
        .await
        .unwrap();
    assert_eq!(delivered, 2);

    for (_, rx) in receivers.iter_mut() {
        assert!(rx.recv().await.unwrap().contains("a.png"));
        assert!(rx.recv().await.unwrap().contains("b.png"));
    }
}

// ============================================================================
// Message Handler Integration Tests
// ============================================================================

#[tokio::test]
async fn test_frames_update_counters_and_errors_do_not_stop_the_stream() {
    let server = server();

    let frames = [
        r#"{"type":"placepixel","x":7,"y":7,"color":0}"#,
        r#"{"type":"placepixel","x":8,"y":0,"color":0}"#,
        "{ not json",
        r#"{"type":"getmap"}"#,
        r#"{"type":"PING"}"#,
        r#"{"x":1}"#,
    ];

    let mut replies = Vec::new();
    for frame in frames {
        replies.push(server.handler.handle_text(frame).await);
    }

    assert!(replies[0].is_none());
    assert!(replies[1].is_none());
    assert_eq!(replies[2], Some(ServerMessage::error("parse error")));
    assert_eq!(
        replies[3],
        Some(ServerMessage::map(placeboard_canvas::store::BLANK_MAP, None))
    );
    assert_eq!(replies[4], Some(ServerMessage::Pong));
    assert_eq!(replies[5], Some(ServerMessage::error("missing type")));

    assert_eq!(server.store.pixels_placed().await, 1);
}

// ============================================================================
// Replace Pipeline Integration Tests
// ============================================================================

#[tokio::test]
async fn test_replace_updates_state_and_notifies_sessions() {
    let server = server();
    let (_id, mut rx) = server.registry.open().await;

    let bytes = png_with(|x, y| PALETTE[((x + y) as usize) % PALETTE.len()].0);
    let entry = server
        .pipeline
        .submit(upload(&server, &bytes, "Diagonales"))
        .await
        .unwrap();

    let state = server.store.snapshot().await;
    assert_eq!(state.current_map, entry.file);
    assert_eq!(state.map_history.last(), Some(&entry));
    assert!(state.is_consistent());

    let stored = std::fs::read(server.dir.path().join("maps").join(&entry.file)).unwrap();
    assert_eq!(stored, bytes);

    let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(frame["type"], "map");
    assert_eq!(frame["data"], entry.file.as_str());
    assert_eq!(frame["reason"], "Diagonales");
}

#[tokio::test]
async fn test_off_palette_pixel_is_located() {
    let server = server();
    let bytes = png_with(|x, y| {
        if (x, y) == (5, 2) {
            [0x12, 0x34, 0x56]
        } else {
            PALETTE[0].0
        }
    });

    let err = server
        .pipeline
        .submit(upload(&server, &bytes, "bad"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        placeboard_canvas::Error::InvalidColor { x: 5, y: 2 }
    ));
    assert_eq!(server.store.snapshot().await, AggregateState::bootstrap());
}

#[tokio::test]
async fn test_concurrent_replacements_stay_consistent() {
    let server = server();
    let bytes = png_with(|_, _| PALETTE[7].0);

    let mut handles = Vec::new();
    for i in 0..6 {
        let request = upload(&server, &bytes, &format!("run {}", i));
        let pipeline = server.pipeline.clone();
        handles.push(tokio::spawn(async move { pipeline.submit(request).await }));
    }
    let results = futures::future::join_all(handles).await;
    assert!(results.into_iter().all(|r| r.unwrap().is_ok()));

    let state = server.store.snapshot().await;
    assert_eq!(state.map_history.len(), 7);
    assert!(state.is_consistent());

    let mut files: Vec<_> = state.map_history.iter().map(|e| e.file.clone()).collect();
    files.dedup();
    assert_eq!(files.len(), 7);
}

// ============================================================================
// Persistence Integration Tests
// ============================================================================

#[tokio::test]
async fn test_state_survives_restart() {
    let server = server();
    server
        .handler
        .handle_text(r#"{"type":"placepixel","x":0,"y":0,"color":3}"#)
        .await;
    let entry = server
        .pipeline
        .submit(upload(&server, &png_with(|_, _| PALETTE[1].0), "Reprise"))
        .await
        .unwrap();
    server.store.persist().await.unwrap();

    let reloaded = StateStore::load_or_bootstrap(server.store.path())
        .await
        .unwrap();
    assert_eq!(reloaded.snapshot().await, server.store.snapshot().await);
    assert_eq!(reloaded.current_map().await, entry.file);
    assert_eq!(reloaded.pixels_placed().await, 1);
}

#[tokio::test]
async fn test_corrupt_snapshot_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, b"{ truncated").unwrap();

    assert!(StateStore::load_or_bootstrap(&path).await.is_err());
    assert_eq!(std::fs::read(&path).unwrap(), b"{ truncated");
}
