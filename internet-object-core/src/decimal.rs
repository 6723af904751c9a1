//! Fixed-precision decimal arithmetic on an arbitrary-precision integer
//! coefficient plus a non-negative scale: a value is `coefficient × 10⁻ˢᶜᵃˡᵉ`.
//!
//! The free functions operate on bare coefficients and are what the
//! `decimal` type definition and the serializer build on. All of them are
//! pure; the only fallible ones are [`fit_to_precision`] (the reduction can
//! encroach on the integer part) and [`Decimal::parse`].

use std::cmp::Ordering;
use std::fmt::Display;

use num_bigint::{BigInt, Sign};

use crate::error::{ErrorCode, ErrorInfo};

/// How to resolve digits lost when a coefficient is brought to a smaller
/// scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    /// Round half away from zero (`1.25 → 1.3`, `-1.25 → -1.3`).
    HalfUp,
    /// Round toward positive infinity.
    Ceil,
    /// Round toward negative infinity.
    Floor,
}

fn ten_pow(n: u32) -> BigInt {
    let mut value = BigInt::from(1);
    for _ in 0..n {
        value *= 10;
    }
    value
}

fn digit_count(coefficient: &BigInt) -> u32 {
    coefficient.magnitude().to_string().len() as u32
}

/// Multiplies a coefficient by `10ⁿ`, lowering its scale by `n`.
pub fn scale_up(coefficient: &BigInt, n: u32) -> BigInt {
    coefficient * ten_pow(n)
}

/// Integer-divides a coefficient by `10ⁿ`, truncating toward zero.
pub fn scale_down(coefficient: &BigInt, n: u32) -> BigInt {
    coefficient / ten_pow(n)
}

/// Rounds a coefficient from scale `current` to scale `target`, half away
/// from zero. Scaling up when `target > current`.
pub fn round_half_up(coefficient: &BigInt, current: u32, target: u32) -> BigInt {
    if target >= current {
        return scale_up(coefficient, target - current);
    }
    let divisor = ten_pow(current - target);
    let quotient = coefficient / &divisor;
    let remainder = coefficient % &divisor;
    if remainder.magnitude() * 2u32 >= *divisor.magnitude() {
        match coefficient.sign() {
            Sign::Minus => quotient - 1,
            _ => quotient + 1,
        }
    } else {
        quotient
    }
}

/// Rounds a coefficient from scale `current` to scale `target`, toward
/// positive infinity. For negative values this rounds toward zero.
pub fn ceil_round(coefficient: &BigInt, current: u32, target: u32) -> BigInt {
    if target >= current {
        return scale_up(coefficient, target - current);
    }
    let divisor = ten_pow(current - target);
    let quotient = coefficient / &divisor;
    let remainder = coefficient % &divisor;
    if remainder.sign() == Sign::Plus {
        quotient + 1
    } else {
        quotient
    }
}

/// Rounds a coefficient from scale `current` to scale `target`, toward
/// negative infinity. For negative values this rounds away from zero.
pub fn floor_round(coefficient: &BigInt, current: u32, target: u32) -> BigInt {
    if target >= current {
        return scale_up(coefficient, target - current);
    }
    let divisor = ten_pow(current - target);
    let quotient = coefficient / &divisor;
    let remainder = coefficient % &divisor;
    if remainder.sign() == Sign::Minus {
        quotient - 1
    } else {
        quotient
    }
}

fn round_to(coefficient: &BigInt, current: u32, target: u32, mode: RoundingMode) -> BigInt {
    match mode {
        RoundingMode::HalfUp => round_half_up(coefficient, current, target),
        RoundingMode::Ceil => ceil_round(coefficient, current, target),
        RoundingMode::Floor => floor_round(coefficient, current, target),
    }
}

/// Renders a coefficient at the given scale as its canonical decimal
/// string: exactly `scale` fractional digits, a leading `0.` for values
/// below one, the sign preserved. Scale 0 yields a plain integer.
pub fn format_bigint_as_decimal(coefficient: &BigInt, scale: u32) -> String {
    let digits = coefficient.magnitude().to_string();
    let sign = if coefficient.sign() == Sign::Minus {
        "-"
    } else {
        ""
    };
    if scale == 0 {
        return format!("{sign}{digits}");
    }
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };
    let split = padded.len() - scale;
    format!("{sign}{}.{}", &padded[..split], &padded[split..])
}

/// The outcome of [`validate_precision_scale`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecisionCheck {
    /// Whether the coefficient fits the precision/scale pair.
    pub valid: bool,
    /// Why it does not, when `valid` is false.
    pub reason: Option<String>,
}

/// Checks that a coefficient can be represented with the given number of
/// significant digits and fractional digits.
pub fn validate_precision_scale(
    coefficient: &BigInt,
    precision: u32,
    scale: u32,
) -> PrecisionCheck {
    if precision == 0 {
        return PrecisionCheck {
            valid: false,
            reason: Some("precision must be at least 1".into()),
        };
    }
    if scale > precision {
        return PrecisionCheck {
            valid: false,
            reason: Some(format!("scale {scale} exceeds precision {precision}")),
        };
    }
    let digits = digit_count(coefficient);
    if digits > precision {
        return PrecisionCheck {
            valid: false,
            reason: Some(format!(
                "coefficient has {digits} digits but precision allows {precision}"
            )),
        };
    }
    PrecisionCheck {
        valid: true,
        reason: None,
    }
}

/// Reduces a coefficient to at most `precision` significant digits by
/// rounding fractional digits away. Fails when the reduction would have to
/// drop integer digits.
pub fn fit_to_precision(
    coefficient: &BigInt,
    precision: u32,
    scale: u32,
    mode: RoundingMode,
) -> Result<(BigInt, u32), ErrorInfo> {
    if precision == 0 {
        return Err(ErrorInfo::new(
            ErrorCode::InvalidRange,
            "precision must be at least 1",
        ));
    }
    let mut coefficient = coefficient.clone();
    let mut scale = scale;
    loop {
        let digits = digit_count(&coefficient);
        if digits <= precision {
            return Ok((coefficient, scale));
        }
        let excess = digits - precision;
        if excess > scale {
            return Err(ErrorInfo::new(
                ErrorCode::InvalidRange,
                format!(
                    "value needs {} integer digits but precision {precision} with scale {scale} leaves {}",
                    digits - scale,
                    precision.saturating_sub(scale),
                ),
            ));
        }
        // Rounding may carry into a new leading digit, so go round again.
        coefficient = round_to(&coefficient, scale, scale - excess, mode);
        scale -= excess;
    }
}

/// Two coefficients brought to a common scale by [`align_operands`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aligned {
    /// The left coefficient at `target_scale`.
    pub a: BigInt,
    /// The right coefficient at `target_scale`.
    pub b: BigInt,
    /// The scale both coefficients now share.
    pub target_scale: u32,
}

/// Brings two coefficients to the common scale
/// `min(max(scale_a, scale_b), max_scale)`, scaling up the smaller-scale
/// operand and rounding whichever operand exceeds the cap.
pub fn align_operands(
    a: &BigInt,
    scale_a: u32,
    b: &BigInt,
    scale_b: u32,
    max_scale: Option<u32>,
    mode: RoundingMode,
) -> Aligned {
    let natural = scale_a.max(scale_b);
    let target_scale = match max_scale {
        Some(max) => natural.min(max),
        None => natural,
    };
    Aligned {
        a: round_to(a, scale_a, target_scale, mode),
        b: round_to(b, scale_b, target_scale, mode),
        target_scale,
    }
}

/// An exact decimal number: `coefficient × 10⁻ˢᶜᵃˡᵉ`.
#[derive(Debug, Clone)]
pub struct Decimal {
    coefficient: BigInt,
    scale: u32,
}

impl Decimal {
    /// Constructs a decimal from its raw parts.
    pub fn new(coefficient: BigInt, scale: u32) -> Self {
        Decimal { coefficient, scale }
    }

    /// Parses the textual form: optional sign, digits, optional fraction,
    /// optional exponent (`12.5`, `-0.04`, `1.5e3`).
    pub fn parse(text: &str) -> Result<Self, ErrorInfo> {
        let fail = || {
            ErrorInfo::new(
                ErrorCode::NotADecimal,
                format!("\"{text}\" is not a decimal number"),
            )
        };
        let rest = text.trim();
        let (sign, rest) = match rest.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, rest.strip_prefix('+').unwrap_or(rest)),
        };
        let (mantissa, exponent) = match rest.find(['e', 'E']) {
            Some(at) => {
                let exponent: i64 = rest[at + 1..].parse().map_err(|_| fail())?;
                (&rest[..at], exponent)
            }
            None => (rest, 0),
        };
        let (whole, fraction) = match mantissa.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (mantissa, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(fail());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(fail());
        }
        let digits = format!("{whole}{fraction}");
        let coefficient: BigInt = if digits.is_empty() {
            BigInt::from(0)
        } else {
            digits.parse().map_err(|_| fail())?
        };
        let coefficient = coefficient * sign;
        // The exponent shifts the scale; a negative resulting scale folds
        // back into the coefficient.
        let scale = fraction.len() as i64 - exponent;
        if scale >= 0 {
            Ok(Decimal::new(coefficient, scale as u32))
        } else {
            Ok(Decimal::new(scale_up(&coefficient, (-scale) as u32), 0))
        }
    }

    /// The integer coefficient.
    pub fn coefficient(&self) -> &BigInt {
        &self.coefficient
    }

    /// The number of fractional digits.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Returns this value rescaled, rounding with the given mode when the
    /// new scale drops digits.
    pub fn with_scale(&self, scale: u32, mode: RoundingMode) -> Decimal {
        Decimal::new(round_to(&self.coefficient, self.scale, scale, mode), scale)
    }

    /// A lossy conversion for JSON rendering and numeric comparisons.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Whether the value is negative.
    pub fn is_negative(&self) -> bool {
        self.coefficient.sign() == Sign::Minus
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_bigint_as_decimal(&self.coefficient, self.scale))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let aligned = align_operands(
            &self.coefficient,
            self.scale,
            &other.coefficient,
            other.scale,
            None,
            RoundingMode::HalfUp,
        );
        aligned.a.cmp(&aligned.b)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal::new(BigInt::from(value), 0)
    }
}
