/// Bresenham circle of radius 3, clockwise from 12 o'clock
pub(crate) const FAST_OFFSETS: [(i32, i32); 16] = [
    (0, -3), (1, -3), (2, -2), (3, -1),
    (3, 0), (3, 1), (2, 2), (1, 3),
    (0, 3), (-1, 3), (-2, 2), (-3, 1),
    (-3, 0), (-3, -1), (-2, -2), (-1, -3),
];

/// Radius of the FAST circle
pub(crate) const FAST_RADIUS: usize = 3;
