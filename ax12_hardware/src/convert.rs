//! Conversions between register values and engineering units.
//!
//! The coefficients are the servo's: 0..=0x3FF position ticks span 300°
//! centered on tick 0x1FF, ten-bit magnitudes with a sign bit at 0x0400
//! encode percentages, and voltage comes back in tenths of a volt.

/// Full-scale ten-bit magnitude.
const FULL_SCALE: f64 = 1023.0;
/// Direction/sign bit of speed and load words.
const SIGN_BIT: u16 = 0x0400;

/// Present-position ticks to degrees in [-150, 150], rounded to
/// centidegrees like the readings the original firmware tooling reported.
#[must_use]
pub fn degrees_from_ticks(ticks: u16) -> f64 {
    let degrees = (f64::from(ticks) - f64::from(0x1FFu16)) * 0.293255 - 0.146695;
    (degrees * 100.0).round() / 100.0
}

/// Goal degrees to position ticks. Callers validate the [-150, 150] range;
/// the tick value still saturates at full scale as a backstop.
#[must_use]
pub fn ticks_from_degrees(degrees: f64) -> u16 {
    let ticks = (degrees + 150.0) * 3.41;
    if ticks <= 0.0 {
        0
    } else if ticks >= FULL_SCALE {
        0x3FF
    } else {
        ticks as u16
    }
}

/// Signed percentage from a speed/load word: ten-bit magnitude scaled to
/// [0, 100] with two decimals, negated when the sign bit is set.
#[must_use]
pub fn percent_from_raw(raw: u16) -> f64 {
    let magnitude = (f64::from(raw & 0x03FF) * 10000.0 / FULL_SCALE).round() / 100.0;
    if raw & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Signed percentage to a speed word: saturated ten-bit magnitude plus the
/// sign bit for negative values.
#[must_use]
pub fn raw_from_percent(percent: f64) -> u16 {
    let mut raw = raw_magnitude(percent);
    if percent < 0.0 {
        raw |= SIGN_BIT;
    }
    raw
}

/// Unsigned ten-bit magnitude of a percentage, saturated at full scale.
#[must_use]
pub fn raw_magnitude(percent: f64) -> u16 {
    if percent.abs() > 100.0 {
        0x3FF
    } else {
        (percent.abs() * FULL_SCALE / 100.0) as u16
    }
}

/// Tenths of a volt to volts.
#[must_use]
pub fn volts_from_raw(raw: u8) -> f64 {
    f64::from(raw) / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x000, -150.0)]
    #[case(0x3FF, 150.0)]
    #[case(0x1FF, -0.15)]
    #[case(0x200, 0.15)]
    fn position_ticks_to_degrees(#[case] ticks: u16, #[case] expected: f64) {
        assert_eq!(degrees_from_ticks(ticks), expected);
    }

    #[rstest]
    #[case(-150.0, 0)]
    #[case(0.0, 511)]
    #[case(150.0, 1023)]
    #[case(90.0, 818)]
    fn degrees_to_goal_ticks(#[case] degrees: f64, #[case] expected: u16) {
        assert_eq!(ticks_from_degrees(degrees), expected);
    }

    #[test]
    fn goal_ticks_saturate_outside_the_range() {
        assert_eq!(ticks_from_degrees(-151.0), 0);
        assert_eq!(ticks_from_degrees(400.0), 0x3FF);
    }

    #[rstest]
    #[case(0x0000, 0.0)]
    #[case(0x03FF, 100.0)]
    #[case(0x01FF, 49.95)]
    #[case(0x0400, 0.0)]
    #[case(0x07FF, -100.0)]
    fn speed_word_to_percent(#[case] raw: u16, #[case] expected: f64) {
        assert_eq!(percent_from_raw(raw), expected);
    }

    #[rstest]
    #[case(100.0, 0x03FF)]
    #[case(50.0, 511)]
    #[case(-50.0, 511 | 0x0400)]
    #[case(0.0, 0)]
    #[case(130.0, 0x03FF)]
    #[case(-130.0, 0x03FF | 0x0400)]
    fn percent_to_speed_word(#[case] percent: f64, #[case] expected: u16) {
        assert_eq!(raw_from_percent(percent), expected);
    }

    #[test]
    fn torque_magnitude_carries_no_sign_bit() {
        assert_eq!(raw_magnitude(-50.0), 511);
        assert_eq!(raw_magnitude(100.0), 0x3FF);
    }

    #[test]
    fn voltage_is_tenths() {
        assert_eq!(volts_from_raw(121), 12.1);
        assert_eq!(volts_from_raw(0), 0.0);
    }
}
