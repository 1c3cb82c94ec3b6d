use glam::IVec2;

use crate::scene::{CollisionFlags, Scene};

const CENTER: i32 = 2;

const SE: CollisionFlags = CollisionFlags::SOUTH_EAST;
const S: CollisionFlags = CollisionFlags::SOUTH;
const SW: CollisionFlags = CollisionFlags::SOUTH_WEST;
const E: CollisionFlags = CollisionFlags::EAST;
const W: CollisionFlags = CollisionFlags::WEST;
const NE: CollisionFlags = CollisionFlags::NORTH_EAST;
const N: CollisionFlags = CollisionFlags::NORTH;
const NW: CollisionFlags = CollisionFlags::NORTH_WEST;
const NONE: CollisionFlags = CollisionFlags::empty();

/// Flag that blocks entering a tile from each neighbouring offset, indexed
/// `[2 - dy][2 + dx]`.
pub const BLOCKING_DIRECTIONS: [[CollisionFlags; 5]; 5] = [
    [SE, SE, S, SW, SW],
    [SE, SE, S, SW, SW],
    [E, E, NONE, W, W],
    [NE, NE, N, NW, NW],
    [NE, NE, N, NW, NW],
];

/// Facing in jau for a step of `(dx, dy)`, indexed `[2 - dy][2 + dx]`.
pub const JAU_DIRECTIONS: [[u16; 5]; 5] = [
    [768, 768, 1024, 1280, 1280],
    [768, 768, 1024, 1280, 1280],
    [512, 512, 0, 1536, 1536],
    [256, 256, 0, 1792, 1792],
    [256, 256, 0, 1792, 1792],
];

fn index(dx: i32, dy: i32) -> (usize, usize) {
    ((CENTER - dy).clamp(0, 4) as usize, (CENTER + dx).clamp(0, 4) as usize)
}

pub fn blocking(dx: i32, dy: i32) -> CollisionFlags {
    let (row, col) = index(dx, dy);
    BLOCKING_DIRECTIONS[row][col]
}

pub fn facing(step: IVec2) -> u16 {
    let (row, col) = index(step.x, step.y);
    JAU_DIRECTIONS[row][col]
}

/// Chebyshev tile distance.
pub fn tile_distance(delta: IVec2) -> i32 {
    delta.x.abs().max(delta.y.abs())
}

/// Outcome of routing a one or two tile move around walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Offset from the previous tile to an inserted waypoint.
    pub midpoint: Option<IVec2>,
    pub distance: i32,
}

/// Decides whether a short move needs an L-shaped waypoint.
///
/// `destination` is the scene tile being moved to and `delta` the offset
/// from the previous target. Diagonal steps detour only when blocked,
/// preferring the east-west leg. Knight moves always get a waypoint, taking
/// the straight leg first when it is clear.
pub fn route<S: Scene + ?Sized>(scene: &S, plane: u8, destination: IVec2, delta: IVec2) -> Route {
    let distance = tile_distance(delta);
    let (dx, dy) = (delta.x, delta.y);

    let diagonal_test = blocking(dx, dy);
    let axis_x_test = blocking(dx, 0) | blocking(0, -dy) | CollisionFlags::FULL;
    let axis_y_test = blocking(0, dy) | blocking(-dx, 0) | CollisionFlags::FULL;

    if distance == 1 && dx != 0 && dy != 0 {
        let diagonal_flags = scene.flags_at(plane, destination);
        let axis_x_flags = scene.flags_at(plane, destination - IVec2::new(0, dy));
        let axis_y_flags = scene.flags_at(plane, destination - IVec2::new(dx, 0));

        let axis_x_clear = !axis_x_flags.intersects(axis_x_test);
        let axis_y_clear = !axis_y_flags.intersects(axis_y_test);
        let diagonal_clear = !diagonal_flags.intersects(diagonal_test);

        if axis_x_clear && axis_y_clear && diagonal_clear {
            return Route {
                midpoint: None,
                distance,
            };
        }

        let step = if axis_x_clear {
            IVec2::new(dx, 0)
        } else {
            IVec2::new(0, dy)
        };
        return Route {
            midpoint: Some(step),
            distance: 2,
        };
    }

    if distance == 2 && (dx.abs() - dy.abs()).abs() == 1 {
        let sign = delta.signum();
        let diagonal_flags = scene.flags_at(plane, destination);
        let axis_x_flags = scene.flags_at(plane, destination - IVec2::new(0, sign.y));
        let axis_y_flags = scene.flags_at(plane, destination - IVec2::new(sign.x, 0));

        let all_clear = !axis_x_flags.intersects(axis_x_test)
            && !axis_y_flags.intersects(axis_y_test)
            && !diagonal_flags.intersects(diagonal_test);

        let step = match (all_clear, dx.abs() == 2) {
            (true, true) => IVec2::new(sign.x, 0),
            (true, false) => IVec2::new(0, sign.y),
            (false, true) => IVec2::new(sign.x, dy),
            (false, false) => IVec2::new(dx, sign.y),
        };
        return Route {
            midpoint: Some(step),
            distance,
        };
    }

    Route {
        midpoint: None,
        distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Grid {
        flags: HashMap<(i32, i32), CollisionFlags>,
    }

    impl Grid {
        fn block(mut self, x: i32, y: i32, flags: CollisionFlags) -> Self {
            self.flags.insert((x, y), flags);
            self
        }
    }

    impl Scene for Grid {
        fn plane(&self) -> u8 {
            0
        }

        fn base(&self) -> IVec2 {
            IVec2::ZERO
        }

        fn collision_flags(&self, _plane: u8, tile: IVec2) -> CollisionFlags {
            self.flags.get(&(tile.x, tile.y)).copied().unwrap_or_default()
        }
    }

    #[test]
    fn tables_are_centred() {
        assert_eq!(blocking(0, 0), CollisionFlags::empty());
        assert_eq!(blocking(1, 1), CollisionFlags::SOUTH_WEST);
        assert_eq!(blocking(-1, 0), CollisionFlags::EAST);
        assert_eq!(facing(IVec2::new(0, -1)), 0);
        assert_eq!(facing(IVec2::new(1, 0)), 1536);
        assert_eq!(facing(IVec2::new(-1, 1)), 768);
        assert_eq!(facing(IVec2::new(0, 1)), 1024);
    }

    #[test]
    fn open_diagonal_goes_straight() {
        let scene = Grid::default();
        let route = route(&scene, 0, IVec2::new(51, 51), IVec2::new(1, 1));
        assert_eq!(route, Route { midpoint: None, distance: 1 });
    }

    #[test]
    fn blocked_diagonal_takes_clear_axis() {
        // The tile north of the start cannot be entered from the south.
        let scene = Grid::default().block(50, 51, CollisionFlags::SOUTH);
        let route = route(&scene, 0, IVec2::new(51, 51), IVec2::new(1, 1));
        assert_eq!(
            route,
            Route {
                midpoint: Some(IVec2::new(1, 0)),
                distance: 2
            }
        );
    }

    #[test]
    fn blocked_x_axis_takes_y_leg() {
        let scene = Grid::default().block(51, 50, CollisionFlags::FULL);
        let route = route(&scene, 0, IVec2::new(51, 51), IVec2::new(1, 1));
        assert_eq!(route.midpoint, Some(IVec2::new(0, 1)));
    }

    #[test]
    fn knight_move_always_gets_waypoint() {
        let scene = Grid::default();
        let route = route(&scene, 0, IVec2::new(52, 51), IVec2::new(2, 1));
        assert_eq!(
            route,
            Route {
                midpoint: Some(IVec2::new(1, 0)),
                distance: 2
            }
        );

        let blocked = Grid::default().block(52, 51, CollisionFlags::SOUTH_WEST);
        let route = super::route(&blocked, 0, IVec2::new(52, 51), IVec2::new(2, 1));
        assert_eq!(route.midpoint, Some(IVec2::new(1, 1)));
    }

    #[test]
    fn straight_moves_need_no_waypoint() {
        let scene = Grid::default();
        assert_eq!(route(&scene, 0, IVec2::new(52, 50), IVec2::new(2, 0)).midpoint, None);
        assert_eq!(route(&scene, 0, IVec2::new(50, 50), IVec2::ZERO).distance, 0);
    }
}
