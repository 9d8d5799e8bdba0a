//! Hot update events.

use crate::manifest::RouteManifestEntry;
use serde::{Serialize, Serializer};
use tokio::sync::broadcast;

/// Custom event name clients listen for.
pub const HMR_EVENT: &str = "remix:hmr";

/// Route metadata pushed to connected clients after a file change.
///
/// `route` is `None` when the changed file is not a route module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmrEvent {
    pub route: Option<RouteManifestEntry>,
}

#[derive(Serialize)]
struct HmrPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    event: &'static str,
    data: HmrData<'a>,
}

#[derive(Serialize)]
struct HmrData<'a> {
    route: Option<&'a RouteManifestEntry>,
}

impl Serialize for HmrEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        HmrPayload {
            kind: "custom",
            event: HMR_EVENT,
            data: HmrData {
                route: self.route.as_ref(),
            },
        }
        .serialize(serializer)
    }
}

/// Delivers hot update events to connected clients.
pub trait HmrChannel: Send + Sync {
    fn send(&self, event: HmrEvent);
}

/// Fans events out to every subscriber, e.g. one per websocket connection.
#[derive(Debug, Clone)]
pub struct BroadcastHmrChannel {
    sender: broadcast::Sender<HmrEvent>,
}

impl BroadcastHmrChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HmrEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastHmrChannel {
    fn default() -> Self {
        Self::new(64)
    }
}

impl HmrChannel for BroadcastHmrChannel {
    fn send(&self, event: HmrEvent) {
        // No subscribers just means no browser is connected.
        if self.sender.send(event).is_err() {
            tracing::debug!("no clients connected for hot update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::BuildAssets;
    use crate::route::Route;

    #[test]
    fn test_wire_format_without_route() {
        let json = serde_json::to_value(HmrEvent { route: None }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "custom", "event": "remix:hmr", "data": { "route": null } })
        );
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let channel = BroadcastHmrChannel::default();
        let mut rx = channel.subscribe();

        let route = Route::new("routes/about", "routes/about.tsx").with_parent("root");
        let entry = RouteManifestEntry::new(&route, &["loader".to_string()], BuildAssets::default());
        channel.send(HmrEvent {
            route: Some(entry.clone()),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.route, Some(entry));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["route"]["hasLoader"], true);
    }

    #[test]
    fn test_send_without_subscribers_is_fine() {
        BroadcastHmrChannel::new(4).send(HmrEvent { route: None });
    }
}
