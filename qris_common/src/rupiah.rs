use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// ISO 4217 alphabetic code for the Indonesian Rupiah.
pub const IDR_CURRENCY_CODE: &str = "IDR";
/// ISO 4217 numeric code, as it appears in tag 53 of a QRIS payload.
pub const IDR_NUMERIC_CODE: &str = "360";

//--------------------------------------       Rupiah        ---------------------------------------------------------
/// An amount of money in the smallest Rupiah unit. QRIS transaction amounts are whole Rupiah.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Rupiah(i64);

op!(binary Rupiah, Add, add);
op!(binary Rupiah, Sub, sub);
op!(inplace Rupiah, AddAssign, add_assign);
op!(inplace Rupiah, SubAssign, sub_assign);
op!(unary Rupiah, Neg, neg);

impl Sum for Rupiah {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in Rupiah: {0}")]
pub struct RupiahConversionError(String);

impl From<i64> for Rupiah {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Rupiah {
    type Error = RupiahConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| RupiahConversionError(format!("Value {value} is too large to convert to Rupiah")))
    }
}

/// Parses the decimal digit string used in the transaction amount field. Fractional amounts (`"15000.00"`) are
/// accepted as long as the fraction is zero.
impl FromStr for Rupiah {
    type Err = RupiahConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let whole = match s.split_once('.') {
            Some((whole, frac)) if frac.chars().all(|c| c == '0') => whole,
            Some(_) => return Err(RupiahConversionError(format!("{s} has a non-zero fractional part"))),
            None => s,
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(RupiahConversionError(format!("{s} is not a decimal amount")));
        }
        whole.parse::<i64>().map(Self).map_err(|e| RupiahConversionError(format!("{s}: {e}")))
    }
}

/// Formats as `Rp 1.234.567`, using a dot as the thousands separator.
impl Display for Rupiah {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}Rp {grouped}")
    }
}

impl Rupiah {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// `self * quantity`, or `None` if the result does not fit.
    pub fn checked_mul(self, quantity: i64) -> Option<Self> {
        self.0.checked_mul(quantity).map(Self)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// The bare decimal string, as embedded in a QRIS transaction amount field.
    pub fn to_decimal_string(&self) -> String {
        self.0.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Rupiah::from(0).to_string(), "Rp 0");
        assert_eq!(Rupiah::from(999).to_string(), "Rp 999");
        assert_eq!(Rupiah::from(15_000).to_string(), "Rp 15.000");
        assert_eq!(Rupiah::from(1_234_567).to_string(), "Rp 1.234.567");
        assert_eq!(Rupiah::from(-50_000).to_string(), "-Rp 50.000");
    }

    #[test]
    fn parse_amount_field() {
        assert_eq!("30000".parse::<Rupiah>().unwrap(), Rupiah::from(30_000));
        assert_eq!("30000.00".parse::<Rupiah>().unwrap(), Rupiah::from(30_000));
        assert!("300.50".parse::<Rupiah>().is_err());
        assert!("-5".parse::<Rupiah>().is_err());
        assert!("".parse::<Rupiah>().is_err());
    }

    #[test]
    fn arithmetic() {
        let unit = Rupiah::from(25_000);
        let total: Rupiah = vec![unit.checked_mul(2).unwrap(), Rupiah::from(10_000)].into_iter().sum();
        assert_eq!(total, Rupiah::from(60_000));
        assert_eq!(serde_json::to_string(&total).unwrap(), "60000");
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let huge = Rupiah::from(i64::MAX / 2 + 1);
        assert_eq!(huge.checked_mul(1), Some(huge));
        assert_eq!(huge.checked_mul(2), None);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(Rupiah::from(1_000).checked_add(Rupiah::from(500)), Some(Rupiah::from(1_500)));
    }
}
