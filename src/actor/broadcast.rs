//! Events pushed to every interested observer.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{Receiver, Sender, channel};
use crate::model::WindowIdentity;
use crate::workspace::Workspace;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BroadcastEvent {
    WorkspaceGenerated {
        workspace: Workspace,
    },
    #[serde(rename_all = "camelCase")]
    TabAdded {
        identity: WindowIdentity,
        tab_group: Vec<WindowIdentity>,
        index: usize,
    },
    #[serde(rename_all = "camelCase")]
    TabRemoved {
        identity: WindowIdentity,
        tab_group: Vec<WindowIdentity>,
    },
    TabActivated {
        identity: WindowIdentity,
    },
}

impl BroadcastEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BroadcastEvent::WorkspaceGenerated { .. } => "workspace-generated",
            BroadcastEvent::TabAdded { .. } => "tab-added",
            BroadcastEvent::TabRemoved { .. } => "tab-removed",
            BroadcastEvent::TabActivated { .. } => "tab-activated",
        }
    }
}

/// Fan-out of [`BroadcastEvent`]s. Subscribers whose receiver was dropped are
/// pruned on the next publish.
#[derive(Debug, Default)]
pub struct Broadcaster {
    subscribers: Mutex<Vec<Sender<BroadcastEvent>>>,
}

impl Broadcaster {
    pub fn new() -> Self { Self::default() }

    pub fn subscribe(&self) -> Receiver<BroadcastEvent> {
        let (tx, rx) = channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize { self.subscribers.lock().len() }

    pub fn publish(&self, event: BroadcastEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| !s.is_closed());
        trace!(event = event.name(), subscribers = subscribers.len(), "publishing");
        for subscriber in subscribers.iter() {
            if subscriber.try_send(event.clone()).is_err() {
                debug!(event = event.name(), "subscriber went away");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let broadcaster = Broadcaster::new();
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();

        let identity = WindowIdentity::new("app", "w");
        broadcaster.publish(BroadcastEvent::TabActivated { identity: identity.clone() });

        for rx in [&mut rx1, &mut rx2] {
            let (_, event) = rx.try_recv().expect("event delivered");
            assert_eq!(event, BroadcastEvent::TabActivated { identity: identity.clone() });
        }
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let broadcaster = Broadcaster::new();
        let rx = broadcaster.subscribe();
        let _kept = broadcaster.subscribe();
        drop(rx);

        broadcaster.publish(BroadcastEvent::TabActivated {
            identity: WindowIdentity::new("app", "w"),
        });
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_event_wire_format() {
        let event = BroadcastEvent::TabRemoved {
            identity: WindowIdentity::new("app", "w"),
            tab_group: vec![WindowIdentity::new("app", "x")],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tab-removed");
        assert_eq!(json["tabGroup"][0]["name"], "x");
        assert_eq!(event.name(), "tab-removed");
    }
}
