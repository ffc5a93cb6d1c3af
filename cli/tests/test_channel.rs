//! Event channel integration tests against an in-process WebSocket server.

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use url::Url;

use dock_cli::deploy::channel::{build_channel, open_channel, ChannelEvent};

async fn bind_server() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = Url::parse(&format!("ws://{addr}/ws?token=test-token")).unwrap();
    (listener, url)
}

async fn accept_subscriber(listener: &TcpListener) -> (WebSocketStream<TcpStream>, String) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = accept_async(stream).await.unwrap();

    // the client's first frame is always the subscribe request
    let first = ws.next().await.unwrap().unwrap();
    let frame: serde_json::Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
    assert_eq!(frame["data"], "subscribe");
    let channel = frame["channel"].as_str().unwrap().to_string();
    (ws, channel)
}

fn event_frame(channel: &str, data: &str) -> Message {
    Message::Text(
        serde_json::json!({ "channel": channel, "data": data })
            .to_string()
            .into(),
    )
}

#[tokio::test]
async fn test_streams_lines_then_sentinel() {
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        let (mut ws, channel) = accept_subscriber(&listener).await;
        assert_eq!(channel, "project:P1:build");

        ws.send(event_frame(&channel, "Building image..."))
            .await
            .unwrap();
        // traffic on other channels is not ours
        ws.send(event_frame("project:P2:build", "other project"))
            .await
            .unwrap();
        // server-internal control messages are dropped silently
        ws.send(event_frame(&channel, "__container_ready"))
            .await
            .unwrap();
        ws.send(event_frame(&channel, "__DEPLOY_END__:success"))
            .await
            .unwrap();

        // client closes once the sentinel lands
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    });

    let (mut rx, handle) = open_channel(url, build_channel("P1"));

    assert_eq!(rx.recv().await, Some(ChannelEvent::Subscribed));
    assert_eq!(
        rx.recv().await,
        Some(ChannelEvent::Line("Building image...".into()))
    );
    assert_eq!(rx.recv().await, Some(ChannelEvent::Ended { success: true }));
    // the sentinel is the final event
    assert_eq!(rx.recv().await, None);

    handle.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_failure_sentinel_reports_failed_build() {
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        let (mut ws, channel) = accept_subscriber(&listener).await;
        ws.send(event_frame(&channel, "__DEPLOY_END__:failed"))
            .await
            .unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    });

    let (mut rx, handle) = open_channel(url, build_channel("P9"));

    assert_eq!(rx.recv().await, Some(ChannelEvent::Subscribed));
    assert_eq!(rx.recv().await, Some(ChannelEvent::Ended { success: false }));
    assert_eq!(rx.recv().await, None);

    handle.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_server_close_without_sentinel() {
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        let (mut ws, channel) = accept_subscriber(&listener).await;
        ws.send(event_frame(&channel, "starting up")).await.unwrap();
        ws.close(None).await.unwrap();
    });

    let (mut rx, handle) = open_channel(url, build_channel("P1"));

    assert_eq!(rx.recv().await, Some(ChannelEvent::Subscribed));
    assert_eq!(
        rx.recv().await,
        Some(ChannelEvent::Line("starting up".into()))
    );
    assert_eq!(rx.recv().await, Some(ChannelEvent::Closed));
    assert_eq!(rx.recv().await, None);

    handle.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_refused_reports_failed() {
    // bind then drop so the port is free but unreachable
    let (listener, url) = bind_server().await;
    drop(listener);

    let (mut rx, handle) = open_channel(url, build_channel("P1"));

    match rx.recv().await {
        Some(ChannelEvent::Failed(_)) => {}
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(rx.recv().await, None);

    handle.close().await;
}

#[tokio::test]
async fn test_close_handle_tears_down_stream() {
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        let (mut ws, _channel) = accept_subscriber(&listener).await;
        // hold the connection open until the client goes away
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    });

    let (mut rx, handle) = open_channel(url, build_channel("P1"));
    assert_eq!(rx.recv().await, Some(ChannelEvent::Subscribed));

    handle.close().await;
    assert_eq!(rx.recv().await, None);
    server.await.unwrap();
}
