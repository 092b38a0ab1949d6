//! Applies collision verdicts to the entity store.
//!
//! Verdicts are processed in session order. Removals take effect
//! immediately, so a victim that was already eliminated earlier in the same
//! pass is skipped instead of being damaged.

use crate::collision::Verdict;
use crate::events::Outbound;
use crate::store::EntityStore;
use log::info;
use shared::{
    DamageKind, Packet, SessionId, Snake, COLLISION_SCORE_PENALTY, COLLISION_TAIL_LOSS,
    MIN_LENGTH_FOR_TAIL_LOSS, OTHER_COLLISION_REASON, SELF_COLLISION_REASON,
};
use std::collections::BTreeMap;

pub fn resolve_collisions(
    store: &mut EntityStore,
    verdicts: BTreeMap<SessionId, Verdict>,
) -> Vec<Outbound> {
    let mut outbound = Vec::new();

    for (session_id, verdict) in verdicts {
        let kind = verdict.kind();

        match verdict {
            Verdict::OwnBody => {
                info!("Session {} eliminated: {}", session_id, SELF_COLLISION_REASON);
                outbound.push(Outbound::to_session(
                    session_id,
                    Packet::GameOver {
                        reason: SELF_COLLISION_REASON.to_string(),
                        kind,
                        victims: None,
                    },
                ));
                store.remove(&session_id);
            }

            Verdict::OtherSnake { victims } => {
                info!(
                    "Session {} eliminated: {} {:?}",
                    session_id, OTHER_COLLISION_REASON, victims
                );
                outbound.push(Outbound::to_session(
                    session_id,
                    Packet::GameOver {
                        reason: OTHER_COLLISION_REASON.to_string(),
                        kind,
                        victims: Some(victims.clone()),
                    },
                ));
                store.remove(&session_id);

                for victim_id in victims {
                    let Some(victim) = store.get_mut(&victim_id) else {
                        continue;
                    };

                    let remaining_score = apply_collision_damage(victim);
                    outbound.push(Outbound::to_session(
                        victim_id,
                        Packet::SnakeDamaged {
                            damage: DamageKind::Collision,
                            remaining_score,
                        },
                    ));
                }
            }
        }
    }

    outbound
}

/// Takes the score penalty and, for long enough snakes, the tail loss.
/// Returns the score left afterwards.
fn apply_collision_damage(snake: &mut Snake) -> u32 {
    snake.score = snake.score.saturating_sub(COLLISION_SCORE_PENALTY);

    if snake.len() > MIN_LENGTH_FOR_TAIL_LOSS {
        snake.body.truncate(snake.len() - COLLISION_TAIL_LOSS);
    }

    snake.score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::detect_collisions;
    use crate::events::Recipient;
    use shared::{CollisionKind, Color, Direction, Position};

    fn snake(cells: &[(i32, i32)], score: u32) -> Snake {
        let mut snake = Snake::new(
            Position::new(cells[0].0, cells[0].1),
            Direction::Up,
            "s".to_string(),
            Color::new(0, 0, 0),
        );
        for &(x, y) in &cells[1..] {
            snake.body.push_back(Position::new(x, y));
        }
        snake.score = score;
        snake
    }

    fn packets_for(outbound: &[Outbound], session_id: SessionId) -> Vec<&Packet> {
        outbound
            .iter()
            .filter(|o| o.recipient == Recipient::Session(session_id))
            .map(|o| &o.packet)
            .collect()
    }

    #[test]
    fn test_self_collision_eliminates() {
        let mut store = EntityStore::new();
        store.insert(1, snake(&[(5, 5), (5, 6), (5, 5)], 3));

        let verdicts = detect_collisions(&store);
        let outbound = resolve_collisions(&mut store, verdicts);

        assert!(!store.contains(&1));
        assert_eq!(outbound.len(), 1);
        assert_eq!(
            outbound[0].packet,
            Packet::GameOver {
                reason: "Hit own body".to_string(),
                kind: CollisionKind::OwnBody,
                victims: None,
            }
        );
    }

    #[test]
    fn test_damage_shortens_long_victim() {
        let mut store = EntityStore::new();
        store.insert(1, snake(&[(1, 1)], 0));
        store.insert(2, snake(&[(1, 4), (1, 3), (1, 2), (1, 1), (1, 0)], 3));

        let verdicts = detect_collisions(&store);
        let outbound = resolve_collisions(&mut store, verdicts);

        assert!(!store.contains(&1));
        let victim = store.get(&2).unwrap();
        assert_eq!(victim.score, 1);
        assert_eq!(victim.len(), 3);
        assert_eq!(victim.head(), Position::new(1, 4));

        assert_eq!(
            packets_for(&outbound, 1),
            vec![&Packet::GameOver {
                reason: "Collision with other snake".to_string(),
                kind: CollisionKind::OtherSnake,
                victims: Some(vec![2]),
            }]
        );
        assert_eq!(
            packets_for(&outbound, 2),
            vec![&Packet::SnakeDamaged {
                damage: DamageKind::Collision,
                remaining_score: 1,
            }]
        );
    }

    #[test]
    fn test_length_four_victim_loses_two_segments() {
        let mut store = EntityStore::new();
        store.insert(1, snake(&[(1, 1)], 0));
        store.insert(2, snake(&[(1, 3), (1, 2), (1, 1), (1, 0)], 2));

        let verdicts = detect_collisions(&store);
        resolve_collisions(&mut store, verdicts);

        let victim = store.get(&2).unwrap();
        assert_eq!(victim.score, 0);
        assert_eq!(
            victim.body.iter().copied().collect::<Vec<_>>(),
            vec![Position::new(1, 3), Position::new(1, 2)]
        );
    }

    #[test]
    fn test_short_victim_keeps_length_and_score_floors() {
        let mut store = EntityStore::new();
        store.insert(1, snake(&[(1, 1)], 5));
        store.insert(2, snake(&[(1, 3), (1, 2), (1, 1)], 1));

        let verdicts = detect_collisions(&store);
        resolve_collisions(&mut store, verdicts);

        let victim = store.get(&2).unwrap();
        assert_eq!(victim.score, 0);
        assert_eq!(victim.len(), 3);
    }

    #[test]
    fn test_mutual_collision_eliminates_both() {
        let mut store = EntityStore::new();
        store.insert(1, snake(&[(4, 5)], 0));
        store.insert(2, snake(&[(4, 5)], 0));

        let verdicts = detect_collisions(&store);
        let outbound = resolve_collisions(&mut store, verdicts);

        assert!(store.is_empty());
        for id in [1, 2] {
            let game_over = packets_for(&outbound, id)
                .into_iter()
                .filter(|p| matches!(p, Packet::GameOver { .. }))
                .count();
            assert_eq!(game_over, 1);
        }
    }

    #[test]
    fn test_eliminated_victim_is_not_damaged() {
        let mut store = EntityStore::new();
        store.insert(1, snake(&[(4, 5), (3, 5), (2, 5), (1, 5)], 6));
        store.insert(2, snake(&[(4, 5), (5, 5), (6, 5), (7, 5)], 6));

        let verdicts = detect_collisions(&store);
        let outbound = resolve_collisions(&mut store, verdicts);

        // Session 1 goes first: it dies and damages 2, then 2 dies and
        // finds 1 already gone.
        assert!(store.is_empty());
        let damaged: Vec<SessionId> = outbound
            .iter()
            .filter(|o| matches!(o.packet, Packet::SnakeDamaged { .. }))
            .filter_map(|o| match o.recipient {
                Recipient::Session(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(damaged, vec![2]);
    }

    #[test]
    fn test_empty_verdicts_do_nothing() {
        let mut store = EntityStore::new();
        store.insert(1, snake(&[(0, 0)], 2));

        let outbound = resolve_collisions(&mut store, BTreeMap::new());

        assert!(outbound.is_empty());
        assert_eq!(store.get(&1).unwrap().score, 2);
    }
}
