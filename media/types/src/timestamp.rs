/*!
    Timestamp types for media timing.
*/

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Rational;

/**
    Presentation timestamp in time_base units.

    This is the raw timestamp value from the media stream. To schedule
    it, rescale it into microseconds with the stream's time base.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pts(pub i64);

impl Pts {
    /**
        Convert this PTS to microseconds using the given time base.
    */
    #[inline]
    pub fn to_micros(self, time_base: Rational) -> i64 {
        time_base.rescale(self.0, Rational::MICROS)
    }

    /**
        Convert this PTS to a Duration using the given time base.

        Negative PTS values are clamped to zero.
    */
    #[inline]
    pub fn to_duration(self, time_base: Rational) -> Duration {
        micros_to_duration(self.to_micros(time_base))
    }
}

impl From<i64> for Pts {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/**
    Unit of a raw timestamp or duration handed to the scheduler.

    The scheduler works in microseconds internally; everything offered to
    it is converted with [`TimeUnit::to_micros`].
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanoseconds,
    #[default]
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    /**
        The time base equivalent of one tick in this unit.
    */
    pub const fn time_base(self) -> Rational {
        match self {
            Self::Nanoseconds => Rational {
                num: 1,
                den: 1_000_000_000,
            },
            Self::Microseconds => Rational::MICROS,
            Self::Milliseconds => Rational { num: 1, den: 1000 },
            Self::Seconds => Rational { num: 1, den: 1 },
        }
    }

    /**
        Convert `value` given in `from` units into this unit.

        Truncates toward zero and saturates on overflow.
    */
    pub fn convert(self, value: i64, from: TimeUnit) -> i64 {
        if self == from {
            return value;
        }
        from.time_base().rescale(value, self.time_base())
    }

    /**
        Convert `value` in this unit into microseconds.
    */
    #[inline]
    pub fn to_micros(self, value: i64) -> i64 {
        TimeUnit::Microseconds.convert(value, self)
    }
}

/**
    Convert a microsecond count to a Duration, clamping negatives to zero.
*/
#[inline]
pub fn micros_to_duration(micros: i64) -> Duration {
    Duration::from_micros(micros.max(0) as u64)
}

/**
    Convert a Duration to microseconds, saturating at `i64::MAX`.
*/
#[inline]
pub fn duration_to_micros(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TB_1_1000: Rational = Rational { num: 1, den: 1000 };
    const TB_1_90000: Rational = Rational { num: 1, den: 90000 };

    #[test]
    fn pts_to_micros() {
        assert_eq!(Pts(1500).to_micros(TB_1_1000), 1_500_000);
        assert_eq!(Pts(90000).to_micros(TB_1_90000), 1_000_000);
    }

    #[test]
    fn pts_negative_keeps_sign_in_micros() {
        assert_eq!(Pts(-100).to_micros(TB_1_1000), -100_000);
        assert_eq!(Pts(-100).to_duration(TB_1_1000), Duration::ZERO);
    }

    #[test]
    fn unit_conversion() {
        assert_eq!(TimeUnit::Milliseconds.to_micros(50), 50_000);
        assert_eq!(TimeUnit::Nanoseconds.to_micros(1_999), 1);
        assert_eq!(TimeUnit::Seconds.to_micros(3), 3_000_000);
        assert_eq!(TimeUnit::Milliseconds.convert(2_500_000, TimeUnit::Microseconds), 2500);
    }

    #[test]
    fn unit_conversion_saturates() {
        assert_eq!(TimeUnit::Milliseconds.to_micros(i64::MAX), i64::MAX);
    }

    #[test]
    fn duration_helpers() {
        assert_eq!(micros_to_duration(-5), Duration::ZERO);
        assert_eq!(micros_to_duration(1500), Duration::from_micros(1500));
        assert_eq!(duration_to_micros(Duration::from_millis(3)), 3000);
        assert_eq!(duration_to_micros(Duration::MAX), i64::MAX);
    }
}
