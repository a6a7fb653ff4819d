use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Change notifications published after every committed store mutation.
///
/// Subscribers get told *what* changed and re-read the store themselves;
/// payloads stay small so a lagging receiver only misses redundant hints.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    UserChanged { user_id: Uuid },
    ListingChanged { listing_id: Uuid },
    OfferChanged { listing_id: Uuid, offer_id: Uuid },
    OrderChanged { order_id: Uuid },
    DisputeChanged { dispute_id: Uuid },
    WalletChanged { user_id: Uuid },
    WithdrawalChanged { request_id: Uuid },
    NotificationAdded { user_id: Uuid },
    SettingsChanged,
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    /// Publishing with no subscribers is fine; nobody is required to listen.
    pub fn publish(&self, event: StoreEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
