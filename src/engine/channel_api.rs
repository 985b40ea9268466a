use super::Engine;

use async_channel::Receiver;
use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::ChannelAPI,
    channel::{ConnectionId, Event},
};

#[async_trait]
impl ChannelAPI for Engine {
    async fn connect(&self) -> (ConnectionId, Receiver<Event>) {
        self.hub.connect().await
    }

    async fn disconnect(&self, connection: ConnectionId) {
        self.hub.disconnect(connection).await
    }

    async fn subscribe(&self, connection: ConnectionId, vehicle_id: Uuid) {
        if self.hub.subscribe(connection, vehicle_id).await {
            tracing::debug!("{} joined vehicle-{}", connection, vehicle_id);
        }
    }

    async fn unsubscribe(&self, connection: ConnectionId, vehicle_id: Uuid) {
        self.hub.unsubscribe(connection, vehicle_id).await;
        tracing::debug!("{} left vehicle-{}", connection, vehicle_id);
    }
}
