//! Per-vehicle broadcast rooms.
//!
//! A connection joins the room `vehicle-{id}` and from then on receives
//! every event published to that room. Nothing is buffered for rooms
//! without members, so a late subscriber only sees what comes after it
//! joined.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entities::{Booking, Coordinates};

/// Events queued per connection before new ones are dropped.
const CONNECTION_BUFFER: usize = 256;

pub type ConnectionId = Uuid;

/// One server frame: `{"event": ..., "data": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    pub data: Value,
}

impl Event {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

pub fn room_name(vehicle_id: Uuid) -> String {
    format!("vehicle-{}", vehicle_id)
}

#[derive(Debug, Default)]
struct Registry {
    connections: HashMap<ConnectionId, Sender<Event>>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

#[derive(Debug, Clone, Default)]
pub struct Hub {
    registry: Arc<RwLock<Registry>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the queue its events arrive on.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self) -> (ConnectionId, Receiver<Event>) {
        let id = Uuid::new_v4();
        let (tx, rx) = async_channel::bounded(CONNECTION_BUFFER);

        self.registry.write().await.connections.insert(id, tx);

        tracing::info!("connection {} registered", id);

        (id, rx)
    }

    /// Forgets the connection and removes it from every room.
    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&self, connection: ConnectionId) {
        let mut registry = self.registry.write().await;

        if let Some(tx) = registry.connections.remove(&connection) {
            tx.close();
        }

        registry.rooms.retain(|_, members| {
            members.remove(&connection);
            !members.is_empty()
        });
    }

    #[tracing::instrument(skip(self))]
    pub async fn subscribe(&self, connection: ConnectionId, vehicle_id: Uuid) -> bool {
        let mut registry = self.registry.write().await;

        if !registry.connections.contains_key(&connection) {
            tracing::info!("unknown connection, ignoring subscribe");
            return false;
        }

        registry
            .rooms
            .entry(room_name(vehicle_id))
            .or_default()
            .insert(connection);

        true
    }

    #[tracing::instrument(skip(self))]
    pub async fn unsubscribe(&self, connection: ConnectionId, vehicle_id: Uuid) {
        let mut registry = self.registry.write().await;
        let room = room_name(vehicle_id);

        let now_empty = match registry.rooms.get_mut(&room) {
            Some(members) => {
                members.remove(&connection);
                members.is_empty()
            }
            None => false,
        };

        if now_empty {
            registry.rooms.remove(&room);
        }
    }

    /// Fans `event` out to the room and returns how many connections took it.
    ///
    /// Never waits on a slow connection: a full queue drops the event for
    /// that connection only.
    #[tracing::instrument(skip(self, event), fields(event = %event.event))]
    pub async fn publish(&self, room: &str, event: Event) -> usize {
        let registry = self.registry.read().await;

        let members = match registry.rooms.get(room) {
            Some(members) => members,
            None => return 0,
        };

        let mut delivered = 0;

        for connection in members {
            let tx = match registry.connections.get(connection) {
                Some(tx) => tx,
                None => continue,
            };

            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => tracing::warn!("dropping event for {}: {}", connection, err),
            }
        }

        delivered
    }

    /// Location update under both the vehicle-specific and the generic event name.
    pub async fn publish_location(&self, vehicle_id: Uuid, coordinates: Coordinates) -> usize {
        let room = room_name(vehicle_id);
        let data = json!({ "lat": coordinates.lat, "lng": coordinates.lng });

        let specific = Event::new(format!("vehicle-{}-location", vehicle_id), data.clone());
        let generic = Event::new("location-update", data);

        self.publish(&room, specific).await + self.publish(&room, generic).await
    }

    pub async fn publish_new_booking(&self, booking: &Booking) -> usize {
        let data = json!({
            "id": booking.id,
            "bookingId": booking.booking_id,
            "passengerName": booking.passenger_name,
            "pickupStop": booking.pickup_stop,
            "dropoffStop": booking.dropoff_stop,
        });

        self.publish(&room_name(booking.vehicle_id), Event::new("new-booking", data))
            .await
    }

    pub async fn subscriber_count(&self, vehicle_id: Uuid) -> usize {
        self.registry
            .read()
            .await
            .rooms
            .get(&room_name(vehicle_id))
            .map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::booking::pending_booking;

    #[tokio::test]
    async fn events_reach_subscribers_only() {
        let hub = Hub::new();
        let vehicle_id = Uuid::new_v4();

        let (watcher, watcher_rx) = hub.connect().await;
        let (_, bystander_rx) = hub.connect().await;

        assert!(hub.subscribe(watcher, vehicle_id).await);

        let delivered = hub
            .publish_location(vehicle_id, Coordinates { lat: 5.6, lng: -0.18 })
            .await;
        assert_eq!(delivered, 2);

        let first = watcher_rx.try_recv().unwrap();
        assert_eq!(first.event, format!("vehicle-{}-location", vehicle_id));
        assert_eq!(first.data, json!({ "lat": 5.6, "lng": -0.18 }));
        assert_eq!(watcher_rx.try_recv().unwrap().event, "location-update");

        assert!(bystander_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn late_subscribers_get_no_backlog() {
        let hub = Hub::new();
        let vehicle_id = Uuid::new_v4();

        assert_eq!(hub.publish_location(vehicle_id, Coordinates::DEFAULT).await, 0);

        let (connection, rx) = hub.connect().await;
        hub.subscribe(connection, vehicle_id).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_and_disconnect_leave_the_room() {
        let hub = Hub::new();
        let mut booking = pending_booking();
        let vehicle_id = Uuid::new_v4();
        booking.vehicle_id = vehicle_id;

        let (first, first_rx) = hub.connect().await;
        let (second, _second_rx) = hub.connect().await;
        hub.subscribe(first, vehicle_id).await;
        hub.subscribe(second, vehicle_id).await;
        assert_eq!(hub.subscriber_count(vehicle_id).await, 2);

        hub.unsubscribe(first, vehicle_id).await;
        assert_eq!(hub.publish_new_booking(&booking).await, 1);
        assert!(first_rx.try_recv().is_err());

        hub.disconnect(second).await;
        assert_eq!(hub.subscriber_count(vehicle_id).await, 0);
        assert_eq!(hub.publish_new_booking(&booking).await, 0);
    }

    #[tokio::test]
    async fn unknown_connections_cannot_subscribe() {
        let hub = Hub::new();

        assert!(!hub.subscribe(Uuid::new_v4(), Uuid::new_v4()).await);
    }
}
