use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_traits::{Float, Signed, ToPrimitive, Zero};

use super::*;

/// Largest scale a [`Decimal`] can carry.
const MAX_DECIMAL_SCALE: u32 = 28;

/// Unbounded decimal `mantissa × 10^-scale`.
///
/// Addition and multiplication never round or saturate, so running sums of
/// these values are associative and commutative at any magnitude. Rounding
/// to a bounded output type happens once, in [`quotient_into_value`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactDecimal {
    mantissa: BigInt,
    scale: u32,
}

impl ExactDecimal {
    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Exact value of a finite float, `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value == 0.0 {
            return Some(Self::default());
        }
        let (bits, exponent, sign) = Float::integer_decode(value);
        let zeros = bits.trailing_zeros();
        let mantissa = BigInt::from(bits >> zeros) * sign;
        let exponent = i32::from(exponent) + zeros as i32;
        Some(if exponent >= 0 {
            Self {
                mantissa: mantissa << exponent as usize,
                scale: 0,
            }
        } else {
            // m × 2^-k = m × 5^k × 10^-k
            let k = exponent.unsigned_abs();
            Self {
                mantissa: mantissa * BigInt::from(5u32).pow(k),
                scale: k,
            }
        })
    }

    /// Render as a value of the declared output type, see [`quotient_into_value`].
    pub fn to_value(&self, target: FieldType) -> Value {
        quotient_into_value(self, &ExactDecimal::from(1i64), target)
    }

    fn mantissa_at(&self, scale: u32) -> BigInt {
        if scale == self.scale {
            self.mantissa.clone()
        } else {
            &self.mantissa * pow10(scale - self.scale)
        }
    }
}

impl From<i64> for ExactDecimal {
    fn from(value: i64) -> Self {
        Self {
            mantissa: BigInt::from(value),
            scale: 0,
        }
    }
}

impl From<Decimal> for ExactDecimal {
    fn from(value: Decimal) -> Self {
        Self {
            mantissa: BigInt::from(value.mantissa()),
            scale: value.scale(),
        }
    }
}

impl Add<&ExactDecimal> for &ExactDecimal {
    type Output = ExactDecimal;

    fn add(self, other: &ExactDecimal) -> ExactDecimal {
        let scale = self.scale.max(other.scale);
        ExactDecimal {
            mantissa: self.mantissa_at(scale) + other.mantissa_at(scale),
            scale,
        }
    }
}

impl Neg for &ExactDecimal {
    type Output = ExactDecimal;

    fn neg(self) -> ExactDecimal {
        ExactDecimal {
            mantissa: -&self.mantissa,
            scale: self.scale,
        }
    }
}

impl Sub<&ExactDecimal> for &ExactDecimal {
    type Output = ExactDecimal;

    fn sub(self, other: &ExactDecimal) -> ExactDecimal {
        self + &-other
    }
}

impl Mul<&ExactDecimal> for &ExactDecimal {
    type Output = ExactDecimal;

    fn mul(self, other: &ExactDecimal) -> ExactDecimal {
        ExactDecimal {
            mantissa: &self.mantissa * &other.mantissa,
            scale: self.scale + other.scale,
        }
    }
}

/// Render `numerator / denominator` as a value of the declared output type.
///
/// Integer targets truncate toward zero. Float targets round to nearest.
/// Decimal (and non-numeric) targets round half away from zero at the
/// largest scale that fits. A zero denominator or a result outside the
/// target's range yields `Null`.
pub fn quotient_into_value(
    numerator: &ExactDecimal,
    denominator: &ExactDecimal,
    target: FieldType,
) -> Value {
    if denominator.is_zero() {
        return Value::Null;
    }
    // (a × 10^-s) / (b × 10^-t) = (a × 10^t) / (b × 10^s)
    let mut num = &numerator.mantissa * pow10(denominator.scale);
    let mut den = &denominator.mantissa * pow10(numerator.scale);
    if den.is_negative() {
        num = -num;
        den = -den;
    }
    match target {
        FieldType::Int32 => (&num / &den).to_i32().map_or(Value::Null, Value::Int32),
        FieldType::Int64 => (&num / &den).to_i64().map_or(Value::Null, Value::Int64),
        FieldType::Float64 => ratio_to_f64(&num, &den).map_or(Value::Null, Value::Float64),
        _ => ratio_to_decimal(&num, &den).map_or(Value::Null, |d| Value::Decimal(d.normalize())),
    }
}

fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u32).pow(exp)
}

/// `num / den` rounded half away from zero. `den` must be positive.
fn rounded_div(num: &BigInt, den: &BigInt) -> BigInt {
    let quotient = num / den;
    let remainder = num - &quotient * den;
    if remainder.abs() * 2u32 >= *den {
        quotient + num.signum()
    } else {
        quotient
    }
}

fn ratio_to_decimal(num: &BigInt, den: &BigInt) -> Option<Decimal> {
    (0..=MAX_DECIMAL_SCALE).rev().find_map(|scale| {
        let mantissa = rounded_div(&(num * pow10(scale)), den);
        mantissa
            .to_i128()
            .and_then(|m| Decimal::try_from_i128_with_scale(m, scale).ok())
    })
}

/// Nearest `f64` to `num / den`, `None` past the float range. `den` must be
/// positive.
fn ratio_to_f64(num: &BigInt, den: &BigInt) -> Option<f64> {
    if num.is_zero() {
        return Some(0.0);
    }
    let negative = num.is_negative();
    let num = num.abs();
    // Scale so the integer quotient carries at least 64 significant bits.
    let shift = i64::try_from(den.bits()).ok()? - i64::try_from(num.bits()).ok()? + 64;
    let (num, den) = if shift >= 0 {
        (num << shift as usize, den.clone())
    } else {
        (num, den << shift.unsigned_abs() as usize)
    };
    let mut quotient = &num / &den;
    // Sticky bit: a discarded remainder must still break rounding ties.
    if !(&num - &quotient * &den).is_zero() {
        quotient.set_bit(0, true);
    }
    let shift = i32::try_from(shift).ok()?;
    let half = shift / 2;
    let value = quotient.to_f64()? * 2f64.powi(-half) * 2f64.powi(half - shift);
    let value = if negative { -value } else { value };
    value.is_finite().then_some(value)
}
