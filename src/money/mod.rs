use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Exact monetary value counted in integer minor units (cents).
///
/// All arithmetic stays in integers, so repeated summation is reproducible
/// to the cent. Rounding happens only in the explicit division helpers;
/// conversion to display strings belongs to the presentation boundary.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    pub fn minor_units(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn checked_mul(self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    /// Euclidean division: returns `(quotient, remainder)` with
    /// `quotient * divisor + remainder == self` and
    /// `0 <= remainder < |divisor|`. `None` when `divisor` is zero.
    pub fn checked_div_rem(self, divisor: i64) -> Option<(Money, Money)> {
        let quotient = self.0.checked_div_euclid(divisor)?;
        let remainder = self.0.checked_rem_euclid(divisor)?;
        Some((Money(quotient), Money(remainder)))
    }

    /// Division with round-half-even (banker's rounding): exact halves go
    /// to the nearest even quotient, so long-run rate splits carry no
    /// directional bias. `None` when `divisor` is zero.
    pub fn checked_div_round_half_even(self, divisor: i64) -> Option<Money> {
        if divisor == 0 {
            return None;
        }
        let (mut numerator, mut divisor) = (self.0, divisor);
        if divisor < 0 {
            numerator = numerator.checked_neg()?;
            divisor = divisor.checked_neg()?;
        }
        let quotient = numerator.div_euclid(divisor);
        let remainder = numerator.rem_euclid(divisor);
        let twice = remainder.checked_mul(2)?;
        if twice > divisor || (twice == divisor && quotient % 2 != 0) {
            quotient.checked_add(1).map(Money)
        } else {
            Some(Money(quotient))
        }
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, units / 100, units % 100)
    }
}
