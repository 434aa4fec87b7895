//! Domain events published after a change commits
//!
//! Events travel over a `tokio::sync::broadcast` channel. Publishing with no
//! subscribers is not an error; slow subscribers see `Lagged` and resync.

use crate::types::{CardId, CardKind, ColumnId, Rank, TeamId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BoardEvent {
    CardAdded {
        card_id: CardId,
        kind: CardKind,
        column: ColumnId,
        rank: Rank,
    },
    CardMoved {
        card_id: CardId,
        kind: CardKind,
        from_column: ColumnId,
        column: ColumnId,
        rank: Rank,
        renormalized: bool,
    },
    CardDeleted {
        card_id: CardId,
        kind: CardKind,
    },
    ColumnRebalanced {
        team_id: TeamId,
        kind: CardKind,
        column: ColumnId,
        count: usize,
    },
}

pub struct EventBus {
    sender: broadcast::Sender<BoardEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers received the event
    pub fn publish(&self, event: BoardEvent) -> usize {
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(delivered, "published board event");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        let event = BoardEvent::CardDeleted {
            card_id: CardId::from_string("c1"),
            kind: CardKind::Lead,
        };
        assert_eq!(bus.publish(event.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(8);
        let delivered = bus.publish(BoardEvent::CardDeleted {
            card_id: CardId::from_string("c1"),
            kind: CardKind::Opportunity,
        });
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_event_json_shape() {
        let event = BoardEvent::CardMoved {
            card_id: CardId::from_string("c1"),
            kind: CardKind::Lead,
            from_column: ColumnId::from_string("new"),
            column: ColumnId::from_string("qualified"),
            rank: Rank::initial(),
            renormalized: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "card_moved");
        assert_eq!(json["column"], "qualified");
        assert_eq!(json["rank"], "V");
    }
}
