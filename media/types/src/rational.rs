/*!
    Rational number type for time bases.
*/

use std::fmt;

/**
    A rational number represented as a numerator and denominator.

    Used for stream time bases (e.g., 1/90000 for MPEG-TS, 1/48000 for
    audio sample clocks) when translating decoder timestamps into the
    microsecond scale used by the presentation scheduler.
*/
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// One microsecond per tick, the scheduler's native time base.
    pub const MICROS: Rational = Rational {
        num: 1,
        den: 1_000_000,
    };

    /**
        Create a new rational number.

        # Panics

        Panics if `den` is zero.
    */
    #[inline]
    pub const fn new(num: i32, den: i32) -> Self {
        assert!(den != 0, "denominator cannot be zero");
        Self { num, den }
    }

    /**
        Convert to f64.
    */
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /**
        Rescale `value` expressed in `self` units into `target` units.

        Uses 128-bit intermediates, rounds toward zero and saturates at
        the `i64` bounds instead of overflowing.
    */
    pub fn rescale(self, value: i64, target: Rational) -> i64 {
        let numerator = value as i128 * self.num as i128 * target.den as i128;
        let denominator = self.den as i128 * target.num as i128;
        if denominator == 0 {
            return 0;
        }
        (numerator / denominator).clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self::new(num, den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "denominator cannot be zero")]
    fn zero_denominator_panics() {
        Rational::new(1, 0);
    }

    #[test]
    fn rescale_mpeg_ts_to_micros() {
        let tb = Rational::new(1, 90000);
        assert_eq!(tb.rescale(90000, Rational::MICROS), 1_000_000);
        assert_eq!(tb.rescale(3003, Rational::MICROS), 33_366);
    }

    #[test]
    fn rescale_sample_clock_to_micros() {
        let tb = Rational::new(1, 48000);
        assert_eq!(tb.rescale(24000, Rational::MICROS), 500_000);
    }

    #[test]
    fn rescale_negative_truncates_toward_zero() {
        let tb = Rational::new(1, 3);
        assert_eq!(tb.rescale(-1, Rational::new(1, 1000)), -333);
    }

    #[test]
    fn rescale_saturates() {
        let tb = Rational::new(1000, 1);
        assert_eq!(tb.rescale(i64::MAX, Rational::MICROS), i64::MAX);
        assert_eq!(tb.rescale(i64::MIN, Rational::MICROS), i64::MIN);
    }

    #[test]
    fn from_tuple() {
        let r: Rational = (30000, 1001).into();
        assert_eq!(r.num, 30000);
        assert_eq!(r.den, 1001);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Rational::new(1, 90000)), "1/90000");
    }
}
