//! Collision detection over a post-move snapshot of the entity store.
//!
//! Detection never mutates anything. Each session is judged independently:
//! a head that lands on another snake (any segment, heads included) yields
//! [`Verdict::OtherSnake`]; otherwise a head that lands on its own body yields
//! [`Verdict::OwnBody`]. Hitting another snake wins when both apply.
//!
//! Cost is O(sessions² × body length) per tick, which is fine for a handful
//! of players.

use crate::store::EntityStore;
use shared::{CollisionKind, SessionId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    OwnBody,
    /// Distinct sessions whose bodies contain the colliding head, ascending.
    OtherSnake { victims: Vec<SessionId> },
}

impl Verdict {
    pub fn kind(&self) -> CollisionKind {
        match self {
            Verdict::OwnBody => CollisionKind::OwnBody,
            Verdict::OtherSnake { .. } => CollisionKind::OtherSnake,
        }
    }
}

pub fn detect_collisions(store: &EntityStore) -> BTreeMap<SessionId, Verdict> {
    let mut verdicts = BTreeMap::new();

    for (&session_id, snake) in store.iter() {
        let head = snake.head();

        let hit_own_body = snake.body.iter().skip(1).any(|segment| *segment == head);

        let victims: BTreeSet<SessionId> = store
            .iter()
            .filter(|(other_id, _)| **other_id != session_id)
            .filter(|(_, other)| other.body.contains(&head))
            .map(|(other_id, _)| *other_id)
            .collect();

        if !victims.is_empty() {
            verdicts.insert(
                session_id,
                Verdict::OtherSnake {
                    victims: victims.into_iter().collect(),
                },
            );
        } else if hit_own_body {
            verdicts.insert(session_id, Verdict::OwnBody);
        }
    }

    verdicts
}
