use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Rounding slack permitted when comparing a declared order total against the sum of its line
/// items. Amounts are integer cents, so 0.01 currency units is exactly one.
pub const ROUNDING_TOLERANCE_CENTS: i64 = 1;

//--------------------------------------       Money       -----------------------------------------------------------
/// A currency amount in integer cents.
///
/// All monetary values in the system are carried in minor units to keep arithmetic exact; the
/// display form is only assembled at the presentation edge.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a cent amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// True if the two amounts differ by no more than [`ROUNDING_TOLERANCE_CENTS`].
    pub fn is_within_tolerance_of(&self, other: Money) -> bool {
        (self.0 - other.0).abs() <= ROUNDING_TOLERANCE_CENTS
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Money::from_cents(1250);
        let b = Money::from_cents(250);
        assert_eq!(a + b, Money::from_cents(1500));
        assert_eq!(a - b, Money::from_cents(1000));
        assert_eq!(b * 3, Money::from_cents(750));
        assert_eq!(-b, Money::from_cents(-250));
        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Money::from_cents(1750));
    }

    #[test]
    fn display_renders_major_units() {
        assert_eq!(format!("{}", Money::from_cents(50000)), "500.00");
        assert_eq!(format!("{}", Money::from_cents(7)), "0.07");
        assert_eq!(format!("{}", Money::from_cents(-1999)), "-19.99");
    }

    #[test]
    fn rounding_tolerance() {
        let declared = Money::from_cents(50000);
        assert!(declared.is_within_tolerance_of(Money::from_cents(50001)));
        assert!(declared.is_within_tolerance_of(Money::from_cents(49999)));
        assert!(!declared.is_within_tolerance_of(Money::from_cents(50002)));
    }

    #[test]
    fn u64_conversion_guards_overflow() {
        assert!(Money::try_from(u64::MAX).is_err());
        assert_eq!(Money::try_from(100u64).unwrap(), Money::from_cents(100));
    }
}
