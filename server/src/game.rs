//! Authoritative simulation state and the per-tick step.
//!
//! [`GameState`] owns every snake, the single food cell and the random
//! source. Inbound handlers (`connect`, `change_direction`, `disconnect`)
//! and [`GameState::step`] all take `&mut self`, so they can never
//! interleave; the caller decides when each runs.

use crate::collision::detect_collisions;
use crate::events::Outbound;
use crate::grid::Grid;
use crate::resolution::resolve_collisions;
use crate::store::{create_snake, EntityStore};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Direction, Packet, Position, SessionId, DEFAULT_CELL_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSettings {
    pub grid: Grid,
    /// Display size of a cell; the simulation only forwards it to clients.
    pub cell_size: u32,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
}

impl SimulationSettings {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            grid: Grid::new(width, height),
            cell_size: DEFAULT_CELL_SIZE,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    Advancing,
}

#[derive(Debug)]
pub struct GameState {
    pub tick: u64,
    store: EntityStore,
    food: Position,
    grid: Grid,
    cell_size: u32,
    phase: TickPhase,
    rng: StdRng,
}

impl GameState {
    pub fn new(settings: SimulationSettings) -> Self {
        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let food = settings.grid.random_position(&mut rng);

        Self {
            tick: 0,
            store: EntityStore::new(),
            food,
            grid: settings.grid,
            cell_size: settings.cell_size,
            phase: TickPhase::Idle,
            rng,
        }
    }

    /// Spawns a snake for a newly connected session.
    ///
    /// The new session gets the full state; everyone else is told about the
    /// new player.
    pub fn connect(&mut self, session_id: SessionId, name: &str) -> Vec<Outbound> {
        let snake = create_snake(&mut self.rng, &self.grid, name);
        info!(
            "Session {} joined as '{}' at ({}, {}) heading {}",
            session_id,
            snake.name,
            snake.head().x,
            snake.head().y,
            snake.direction
        );
        self.store.insert(session_id, snake.clone());

        vec![
            Outbound::to_session(session_id, self.snapshot()),
            Outbound::to_all_except(
                session_id,
                Packet::PlayerJoined {
                    id: session_id,
                    player: snake,
                },
            ),
        ]
    }

    /// Requests a turn. Unknown sessions and illegal reversals are ignored.
    pub fn change_direction(&mut self, session_id: SessionId, direction: Direction) -> bool {
        self.store.set_direction(session_id, direction)
    }

    /// Drops the session's snake, if it still has one, and announces the leave.
    pub fn disconnect(&mut self, session_id: SessionId) -> Vec<Outbound> {
        if self.store.remove(&session_id).is_some() {
            info!("Session {} left", session_id);
        }
        vec![Outbound::to_all(Packet::PlayerLeft { id: session_id })]
    }

    /// Advances the simulation by one tick.
    ///
    /// Every snake moves first; collisions are judged only against the
    /// fully moved state. The returned notifications end with the
    /// `gameState` broadcast.
    pub fn step(&mut self) -> Vec<Outbound> {
        debug_assert_eq!(self.phase, TickPhase::Idle);
        self.phase = TickPhase::Advancing;

        let mut outbound = Vec::new();

        for (&session_id, snake) in self.store.iter_mut() {
            let next_head = self.grid.step(snake.head(), snake.direction);

            if next_head == self.food {
                snake.score += 1;
                self.food = self.grid.random_position(&mut self.rng);
                debug!(
                    "Session {} ate food, score {}, food moved to ({}, {})",
                    session_id, snake.score, self.food.x, self.food.y
                );
                outbound.push(Outbound::to_all(Packet::FoodEaten {
                    food: self.food,
                    player_id: session_id,
                }));
                // Keeping the tail and pushing the new head grows the body by
                // exactly one cell. Appending a tail copy as well would add two.
            } else {
                snake.body.pop_back();
            }

            snake.body.push_front(next_head);
        }

        let verdicts = detect_collisions(&self.store);
        outbound.extend(resolve_collisions(&mut self.store, verdicts));

        outbound.push(Outbound::to_all(self.snapshot()));

        self.tick += 1;
        self.phase = TickPhase::Idle;
        outbound
    }

    /// The `gameState` packet describing the current world.
    pub fn snapshot(&self) -> Packet {
        Packet::GameState {
            players: self.store.snapshot(),
            food: self.food,
            grid_size: self.cell_size,
            grid_width: self.grid.width,
            grid_height: self.grid.height,
        }
    }

    pub fn food(&self) -> Position {
        self.food
    }

    /// Moves the food to a fixed cell, e.g. to set up a scenario.
    pub fn place_food(&mut self, position: Position) {
        self.food = position;
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn player_count(&self) -> usize {
        self.store.len()
    }
}
