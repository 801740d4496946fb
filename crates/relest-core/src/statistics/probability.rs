//! Exact probability mass.
//!
//! Belief propagation multiplies bucket frequencies many times over; doing
//! that in floating point drifts visibly on deep trees. [`Probability`]
//! wraps an arbitrary-precision rational so every product and quotient is
//! exact, and only converts to `f64` at the very end.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign};
use std::str::FromStr;

use num::{BigInt, BigRational, One, ToPrimitive, Zero};
use relest_common::utils::error::Error;
use serde::{Deserialize, Serialize};

/// A non-negative, exact probability mass.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Probability(BigRational);

impl Probability {
    /// Zero mass.
    #[must_use]
    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    /// Unit mass.
    #[must_use]
    pub fn one() -> Self {
        Self(BigRational::one())
    }

    /// Creates `numer / denom`.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    #[must_use]
    pub fn from_ratio(numer: u64, denom: u64) -> Self {
        Self(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    /// Creates a whole number of observations (a count before normalization).
    #[must_use]
    pub fn from_count(count: u64) -> Self {
        Self(BigRational::from_integer(BigInt::from(count)))
    }

    /// Returns true if there is no mass.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Converts to the nearest `f64`.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_else(|| {
            let numer = self.0.numer().to_f64().unwrap_or(f64::MAX);
            let denom = self.0.denom().to_f64().unwrap_or(f64::MAX);
            numer / denom
        })
    }
}

impl Default for Probability {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Probability {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Add<&Probability> for &Probability {
    type Output = Probability;

    fn add(self, rhs: &Probability) -> Probability {
        Probability(&self.0 + &rhs.0)
    }
}

impl AddAssign<&Probability> for Probability {
    fn add_assign(&mut self, rhs: &Probability) {
        self.0 += &rhs.0;
    }
}

impl Mul for Probability {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Mul<&Probability> for &Probability {
    type Output = Probability;

    fn mul(self, rhs: &Probability) -> Probability {
        Probability(&self.0 * &rhs.0)
    }
}

impl MulAssign<&Probability> for Probability {
    fn mul_assign(&mut self, rhs: &Probability) {
        self.0 *= &rhs.0;
    }
}

/// Division by a count, e.g. spreading a bucket's mass over its distinct values.
///
/// # Panics
///
/// Panics if `rhs` is zero.
impl Div<u64> for &Probability {
    type Output = Probability;

    fn div(self, rhs: u64) -> Probability {
        Probability(&self.0 / BigInt::from(rhs))
    }
}

impl Div<u64> for Probability {
    type Output = Probability;

    fn div(self, rhs: u64) -> Probability {
        &self / rhs
    }
}

impl Sum for Probability {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Probability> for Probability {
    fn sum<I: Iterator<Item = &'a Probability>>(iter: I) -> Self {
        iter.fold(Self::zero(), |mut acc, p| {
            acc += p;
            acc
        })
    }
}

/// Parses a decimal (`"0.015"`) or a fraction (`"3/7"`).
impl FromStr for Probability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidValue(format!("not a probability: '{s}'"));
        let s = s.trim();

        if let Some((numer, denom)) = s.split_once('/') {
            let numer: BigInt = numer.trim().parse().map_err(|_| invalid())?;
            let denom: BigInt = denom.trim().parse().map_err(|_| invalid())?;
            if denom.is_zero() || numer < BigInt::zero() || denom < BigInt::zero() {
                return Err(invalid());
            }
            return Ok(Self(BigRational::new(numer, denom)));
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.starts_with('-') || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let digits: BigInt = format!("{whole}{frac}").parse().map_err(|_| invalid())?;
        let scale = num::pow(BigInt::from(10u32), frac.len());
        Ok(Self(BigRational::new(digits, scale)))
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(precision) => write!(f, "{:.*}", precision, self.to_f64()),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Probability {
        s.parse().unwrap()
    }

    #[test]
    fn test_decimal_products_are_exact() {
        // 0.1 * 0.2 is not 0.02 in binary floating point
        assert_eq!(p("0.1") * p("0.2"), p("0.02"));
        assert_eq!(&p("0.3") * &(&p("0.1") / 2), p("0.015"));
    }

    #[test]
    fn test_parse_fraction() {
        assert_eq!(p("3/7"), Probability::from_ratio(3, 7));
        assert_eq!(p("6/14"), Probability::from_ratio(3, 7));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("abc".parse::<Probability>().is_err());
        assert!("-0.5".parse::<Probability>().is_err());
        assert!("1/0".parse::<Probability>().is_err());
    }

    #[test]
    fn test_sum() {
        let parts = [p("0.25"), p("0.25"), p("0.5")];
        assert_eq!(parts.iter().sum::<Probability>(), Probability::one());
        assert_eq!(parts.into_iter().sum::<Probability>(), Probability::one());
    }

    #[test]
    fn test_display_precision() {
        assert_eq!(format!("{:.5}", Probability::from_ratio(3, 7)), "0.42857");
        assert_eq!(format!("{}", Probability::from_ratio(3, 7)), "3/7");
    }

    #[test]
    fn test_to_f64() {
        assert!((Probability::from_ratio(1, 4).to_f64() - 0.25).abs() < f64::EPSILON);
    }
}
