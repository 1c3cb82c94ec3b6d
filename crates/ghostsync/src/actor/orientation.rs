pub const JAU_FULL_ROTATION: i32 = 2048;
pub const JAU_HALF_ROTATION: i32 = 1024;
pub const TURN_RATE: i32 = 32;

/// Signed shortest turn from `current` to `target`. A half turn is always
/// taken in the positive (clockwise) direction.
pub fn shortest_turn(current: u16, target: u16) -> i32 {
    let diff = (target as i32 - current as i32).rem_euclid(JAU_FULL_ROTATION);
    if diff > JAU_HALF_ROTATION {
        diff - JAU_FULL_ROTATION
    } else {
        diff
    }
}

/// One render step of turning, at most `TURN_RATE` jau.
pub fn turn_toward(current: u16, target: u16) -> u16 {
    let turn = shortest_turn(current, target).clamp(-TURN_RATE, TURN_RATE);
    (current as i32 + turn).rem_euclid(JAU_FULL_ROTATION) as u16
}
