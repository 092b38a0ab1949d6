//! In-memory entity store: one snake per connected session.

use crate::grid::Grid;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{Color, Direction, SessionId, Snake, DEFAULT_PLAYER_NAME, MAX_NAME_CHARS};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Spawns a fresh single-segment snake at a random cell with a random
/// heading and color.
///
/// Blank names fall back to the default player name; long ones are cut to
/// `MAX_NAME_CHARS` characters.
pub fn create_snake<R: Rng + ?Sized>(rng: &mut R, grid: &Grid, name: &str) -> Snake {
    let head = grid.random_position(rng);
    let direction = *Direction::ALL
        .choose(rng)
        .unwrap_or(&Direction::Right);
    let color = Color::new(rng.gen(), rng.gen(), rng.gen());

    Snake::new(head, direction, display_name(name), color)
}

fn display_name(requested: &str) -> String {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        DEFAULT_PLAYER_NAME.to_string()
    } else {
        trimmed.chars().take(MAX_NAME_CHARS).collect()
    }
}

/// Snakes keyed by session. Iteration follows session id order.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    snakes: BTreeMap<SessionId, Snake>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session_id: SessionId, snake: Snake) {
        self.snakes.insert(session_id, snake);
    }

    /// Removes the session's snake. Absent sessions are a no-op.
    pub fn remove(&mut self, session_id: &SessionId) -> Option<Snake> {
        self.snakes.remove(session_id)
    }

    /// Turns a snake unless the request is a reversal on a multi-segment body.
    ///
    /// Returns false when nothing changed: the session has no snake or the
    /// turn was refused.
    pub fn set_direction(&mut self, session_id: SessionId, requested: Direction) -> bool {
        let Some(snake) = self.snakes.get_mut(&session_id) else {
            return false;
        };

        if requested == snake.direction.opposite() && snake.len() > 1 {
            debug!(
                "Ignoring reversal {} -> {} for session {}",
                snake.direction, requested, session_id
            );
            return false;
        }

        snake.direction = requested;
        true
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&Snake> {
        self.snakes.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &SessionId) -> Option<&mut Snake> {
        self.snakes.get_mut(session_id)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.snakes.contains_key(session_id)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, SessionId, Snake> {
        self.snakes.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, SessionId, Snake> {
        self.snakes.iter_mut()
    }

    /// Copy of every snake, as sent in `gameState` broadcasts.
    pub fn snapshot(&self) -> BTreeMap<SessionId, Snake> {
        self.snakes.clone()
    }

    pub fn len(&self) -> usize {
        self.snakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snakes.is_empty()
    }
}
