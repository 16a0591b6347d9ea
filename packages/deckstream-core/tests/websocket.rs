//! The `/events` websocket served over a real socket.

use std::sync::Arc;
use std::time::Duration;

use deckstream_core::api::{self, AppState};
use deckstream_core::feed::{DetachedNetwork, TrackCatalog};
use deckstream_core::prolink::DeviceId;
use deckstream_core::{bootstrap_services, kinds, BootstrappedServices, Config, Event, EventData};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bootstraps the engine and serves it on an ephemeral port.
async fn serve() -> (BootstrappedServices, String) {
    let services = bootstrap_services(
        &Config::default(),
        Arc::new(DetachedNetwork::new()),
        Arc::new(TrackCatalog::new()),
    )
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let state = AppState::new(&services);
    tokio::spawn(async move {
        api::serve(state, listener).await.unwrap();
    });

    (services, format!("ws://127.0.0.1:{}/events", port))
}

/// Next text frame from the server, parsed as JSON.
async fn next_json(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("read failed");
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().unwrap()).unwrap();
        }
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

fn stopped(player: u8) -> Event {
    Event::new(kinds::STOPPED, Some(DeviceId(player)), EventData::None)
}

#[tokio::test]
async fn client_gets_history_then_subscribed_events() {
    let (services, url) = serve().await;
    services
        .bus
        .publish(Event::new(kinds::SET_STARTED, None, EventData::None));

    let (mut client, _) = connect_async(&url).await.unwrap();

    let backfill = next_json(&mut client).await;
    let entries = backfill.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["event"], kinds::SET_STARTED);

    let bus = Arc::clone(&services.bus);
    wait_until(|| bus.connection_count() == 1).await;

    // Not subscribed yet.
    services.bus.publish(stopped(1));

    client
        .send(WsMessage::text(r#"{"subscriptions":["stopped"]}"#))
        .await
        .unwrap();
    wait_until(|| bus.subscriber_count(kinds::STOPPED) == 1).await;

    services
        .bus
        .publish(Event::new(kinds::SET_STARTED, None, EventData::None));
    services.bus.publish(stopped(2));

    let frame = next_json(&mut client).await;
    assert_eq!(frame["event"], kinds::STOPPED);
    assert_eq!(frame["player_id"], 2);

    client.close(None).await.unwrap();
    wait_until(|| bus.connection_count() == 0).await;
    services.shutdown();
}

#[tokio::test]
async fn dropped_client_is_removed_from_bus() {
    let (services, url) = serve().await;

    let (mut client, _) = connect_async(&url).await.unwrap();
    // Empty history still arrives as an array.
    assert_eq!(next_json(&mut client).await, Value::Array(Vec::new()));

    let bus = Arc::clone(&services.bus);
    wait_until(|| bus.connection_count() == 1).await;

    drop(client);
    wait_until(|| bus.connection_count() == 0).await;
    services.shutdown();
}

#[tokio::test]
async fn shutdown_closes_open_sockets() {
    let (services, url) = serve().await;

    let (mut client, _) = connect_async(&url).await.unwrap();
    next_json(&mut client).await;
    let bus = Arc::clone(&services.bus);
    wait_until(|| bus.connection_count() == 1).await;

    services.shutdown();

    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok());
    assert_eq!(bus.connection_count(), 0);
}
