//! Bearing normalization
//!
//! Converts a subject bearing into the angle sent to the motor, honouring the
//! configured direction convention.

/// Apply the direction convention to a raw bearing
///
/// Returns `-bearing` when `flip` is set, otherwise `bearing` unchanged.
pub fn normalize(bearing: f64, flip: bool) -> f64 {
    if flip {
        -bearing
    } else {
        bearing
    }
}

/// Angle actually transmitted for a subject bearing
///
/// The command is the negation of the normalized bearing, so `flip = true`
/// preserves the bearing sign and `flip = false` inverts it. The motor
/// direction on the installed hardware depends on this exact composition.
pub fn command_angle(bearing: f64, flip: bool) -> f64 {
    -normalize(bearing, flip)
}

/// Linearly map `value` from the `from` range onto the `to` range
pub fn remap(value: f64, from: (f64, f64), to: (f64, f64)) -> f64 {
    let (from_lo, from_hi) = from;
    let (to_lo, to_hi) = to;
    to_lo + (value - from_lo) * (to_hi - to_lo) / (from_hi - from_lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        for b in [-180.0, -33.3, 0.0, 12.5, 179.9] {
            assert_eq!(normalize(b, false), b);
            assert_eq!(normalize(b, true), -b);
        }
    }

    #[test]
    fn test_command_angle_double_negation() {
        assert_eq!(command_angle(30.0, true), 30.0);
        assert_eq!(command_angle(30.0, false), -30.0);
        assert_eq!(command_angle(-45.0, true), -45.0);
    }

    #[test]
    fn test_remap() {
        let range = ((0.0, 1.0), (-180.0, 180.0));
        assert_eq!(remap(0.0, range.0, range.1), -180.0);
        assert_eq!(remap(0.5, range.0, range.1), 0.0);
        assert_eq!(remap(1.0, range.0, range.1), 180.0);
    }
}
