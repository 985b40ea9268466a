use axum::{
    extract::{
        ws::{Message, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;

/// Frames sent by push clients.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    SubscribeVehicle {
        #[serde(rename = "vehicleId")]
        vehicle_id: Uuid,
    },
    UnsubscribeVehicle {
        #[serde(rename = "vehicleId")]
        vehicle_id: Uuid,
    },
}

pub async fn upgrade(ws: WebSocketUpgrade, Extension(api): Extension<DynAPI>) -> Response {
    ws.on_upgrade(move |socket| session(socket, api))
}

async fn session(socket: WebSocket, api: DynAPI) {
    let (connection, events) = api.connect().await;
    let (mut sink, mut stream) = socket.split();

    let forward = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!("skipping unserializable event: {}", err);
                    continue;
                }
            };

            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(ClientFrame::SubscribeVehicle { vehicle_id }) => {
                    api.subscribe(connection, vehicle_id).await
                }
                Ok(ClientFrame::UnsubscribeVehicle { vehicle_id }) => {
                    api.unsubscribe(connection, vehicle_id).await
                }
                Err(err) => tracing::warn!("ignoring client frame: {}", err),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    api.disconnect(connection).await;
    forward.abort();

    tracing::info!("connection {} closed", connection);
}

#[test]
fn client_frames_parse() {
    let id = Uuid::new_v4();

    let frame: ClientFrame = serde_json::from_str(&format!(
        r#"{{"type":"subscribe-vehicle","vehicleId":"{}"}}"#,
        id
    ))
    .unwrap();
    assert_eq!(frame, ClientFrame::SubscribeVehicle { vehicle_id: id });

    let frame: ClientFrame = serde_json::from_str(&format!(
        r#"{{"type":"unsubscribe-vehicle","vehicleId":"{}"}}"#,
        id
    ))
    .unwrap();
    assert_eq!(frame, ClientFrame::UnsubscribeVehicle { vehicle_id: id });

    assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"join","vehicleId":"x"}"#).is_err());
}
