//! Toroidal grid arithmetic. Everything here is pure and total.

use rand::Rng;
use shared::{Direction, Position};

/// Maps any integer into `[0, dimension)`, negatives included.
pub fn wrap(coordinate: i32, dimension: u32) -> i32 {
    debug_assert!(dimension > 0, "grid dimension must be non-zero");
    debug_assert!(dimension <= i32::MAX as u32, "grid dimension must fit in i32");
    coordinate.rem_euclid(dimension as i32)
}

/// Uniformly random cell within `[0, width) x [0, height)`.
pub fn random_position<R: Rng + ?Sized>(rng: &mut R, width: u32, height: u32) -> Position {
    Position {
        x: rng.gen_range(0..width) as i32,
        y: rng.gen_range(0..height) as i32,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub width: u32,
    pub height: u32,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The cell one step from `from` in `direction`, wrapped on both axes.
    pub fn step(&self, from: Position, direction: Direction) -> Position {
        let (dx, dy) = direction.delta();
        Position {
            x: wrap(from.x + dx, self.width),
            y: wrap(from.y + dy, self.height),
        }
    }

    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        random_position(rng, self.width, self.height)
    }

    pub fn contains(&self, position: Position) -> bool {
        (0..self.width as i32).contains(&position.x) && (0..self.height as i32).contains(&position.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_wrap_stays_in_range() {
        for dimension in [1u32, 2, 7, 30] {
            for k in -100..100 {
                let wrapped = wrap(k, dimension);
                assert!((0..dimension as i32).contains(&wrapped));
                assert_eq!(wrapped, wrap(k + dimension as i32, dimension));
            }
        }
    }

    #[test]
    fn test_wrap_negative_and_overflowing_inputs() {
        assert_eq!(wrap(-1, 30), 29);
        assert_eq!(wrap(30, 30), 0);
        assert_eq!(wrap(-31, 30), 29);
        assert_eq!(wrap(65, 30), 5);
        assert_eq!(wrap(i32::MIN, 30), i32::MIN.rem_euclid(30));
    }

    #[test]
    fn test_step_wraps_around_edges() {
        let grid = Grid::new(10, 8);

        assert_eq!(
            grid.step(Position::new(0, 3), Direction::Left),
            Position::new(9, 3)
        );
        assert_eq!(
            grid.step(Position::new(9, 3), Direction::Right),
            Position::new(0, 3)
        );
        assert_eq!(
            grid.step(Position::new(4, 0), Direction::Up),
            Position::new(4, 7)
        );
        assert_eq!(
            grid.step(Position::new(4, 7), Direction::Down),
            Position::new(4, 0)
        );
        assert_eq!(
            grid.step(Position::new(4, 4), Direction::Down),
            Position::new(4, 5)
        );
    }

    #[test]
    fn test_random_position_within_bounds() {
        let grid = Grid::new(5, 3);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..500 {
            assert!(grid.contains(grid.random_position(&mut rng)));
        }
    }

    #[test]
    fn test_random_position_is_reproducible() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            assert_eq!(
                random_position(&mut a, 30, 30),
                random_position(&mut b, 30, 30)
            );
        }
    }
}
