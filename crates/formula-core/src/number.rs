//! Numeric literals that keep their exact decimal text.
//!
//! A literal such as `0.50` is stored with its source text and an exact rational value
//! (`1/2`). Arithmetic stays exact as long as the `i128` numerator and denominator do not
//! overflow; after that, or when a non-integer power is taken, values degrade to `f64`.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// A reduced fraction with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    pub const ONE: Rational = Rational { num: 1, den: 1 };
    pub const MINUS_ONE: Rational = Rational { num: -1, den: 1 };

    /// Returns `None` if `den` is zero or the normalization overflows.
    pub fn new(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs());
        let (mut num, mut den) = (num / g as i128, den / g as i128);
        if den < 0 {
            num = num.checked_neg()?;
            den = den.checked_neg()?;
        }
        Some(Rational { num, den })
    }

    #[inline]
    pub const fn integer(n: i128) -> Self {
        Rational { num: n, den: 1 }
    }

    #[inline]
    pub const fn numer(&self) -> i128 {
        self.num
    }

    #[inline]
    pub const fn denom(&self) -> i128 {
        self.den
    }

    #[inline]
    pub const fn is_integer(&self) -> bool {
        self.den == 1
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.num < 0
    }

    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    pub fn checked_neg(self) -> Option<Self> {
        Some(Rational {
            num: self.num.checked_neg()?,
            den: self.den,
        })
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        let num = self
            .num
            .checked_mul(other.den)?
            .checked_add(other.num.checked_mul(self.den)?)?;
        Rational::new(num, self.den.checked_mul(other.den)?)
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        Rational::new(
            self.num.checked_mul(other.num)?,
            self.den.checked_mul(other.den)?,
        )
    }

    /// `None` for division by zero as well as for overflow.
    pub fn checked_recip(self) -> Option<Self> {
        Rational::new(self.den, self.num)
    }

    /// Integer powers only; negative exponents take the reciprocal.
    pub fn checked_pow(self, exp: i128) -> Option<Self> {
        let base = if exp < 0 { self.checked_recip()? } else { self };
        let exp = u32::try_from(exp.unsigned_abs()).ok()?;
        Rational::new(base.num.checked_pow(exp)?, base.den.checked_pow(exp)?)
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    if a == 0 { 1 } else { a }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        // Cross-multiplication can overflow for huge operands; compare as floats then.
        match (
            self.num.checked_mul(other.den),
            other.num.checked_mul(self.den),
        ) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.to_f64().total_cmp(&other.to_f64()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Exact(Rational),
    Float(f64),
}

impl Value {
    pub fn to_f64(self) -> f64 {
        match self {
            Value::Exact(r) => r.to_f64(),
            Value::Float(x) => x,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Value::Exact(r) => r == Rational::ZERO,
            Value::Float(x) => x == 0.0,
        }
    }

    pub fn is_one(self) -> bool {
        match self {
            Value::Exact(r) => r == Rational::ONE,
            Value::Float(x) => x == 1.0,
        }
    }

    pub fn is_negative(self) -> bool {
        match self {
            Value::Exact(r) => r.is_negative(),
            Value::Float(x) => x < 0.0,
        }
    }

    pub fn neg(self) -> Value {
        match self {
            Value::Exact(r) => r
                .checked_neg()
                .map_or(Value::Float(-r.to_f64()), Value::Exact),
            Value::Float(x) => Value::Float(-x),
        }
    }

    pub fn add(self, other: Value) -> Value {
        if let (Value::Exact(a), Value::Exact(b)) = (self, other)
            && let Some(sum) = a.checked_add(b)
        {
            return Value::Exact(sum);
        }
        Value::Float(self.to_f64() + other.to_f64())
    }

    pub fn mul(self, other: Value) -> Value {
        if let (Value::Exact(a), Value::Exact(b)) = (self, other)
            && let Some(product) = a.checked_mul(b)
        {
            return Value::Exact(product);
        }
        Value::Float(self.to_f64() * other.to_f64())
    }

    /// Returns `None` for an exact division by zero.
    pub fn recip(self) -> Option<Value> {
        match self {
            Value::Exact(r) if r == Rational::ZERO => None,
            Value::Exact(r) => Some(
                r.checked_recip()
                    .map_or(Value::Float(1.0 / r.to_f64()), Value::Exact),
            ),
            Value::Float(x) => Some(Value::Float(1.0 / x)),
        }
    }

    /// `None` when the result is not a real number or is an exact division by zero.
    pub fn pow(self, exp: Value) -> Option<Value> {
        if let (Value::Exact(base), Value::Exact(e)) = (self, exp)
            && e.is_integer()
        {
            if base == Rational::ZERO && e.is_negative() {
                return None;
            }
            if let Some(result) = base.checked_pow(e.numer()) {
                return Some(Value::Exact(result));
            }
        }
        let result = self.to_f64().powf(exp.to_f64());
        result.is_finite().then_some(Value::Float(result))
    }
}

/// A numeric atom of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    /// The literal text as written, if this number came from markup.
    literal: Option<Box<str>>,
    value: Value,
}

impl Number {
    /// Parse a decimal literal like `42` or `3.14`, optionally with a leading `-`.
    ///
    /// The value is exact whenever it fits into an `i128` fraction.
    pub fn parse(text: &str) -> Option<Number> {
        let (digits, negative) = match text.strip_prefix('-') {
            Some(digits) => (digits, true),
            None => (text, false),
        };
        let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if integer.is_empty()
            || !integer.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
            || (digits.contains('.') && fraction.is_empty())
        {
            return None;
        }
        let exact = (|| {
            let mut num: i128 = 0;
            for b in integer.bytes().chain(fraction.bytes()) {
                num = num.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
            }
            let den = 10i128.checked_pow(u32::try_from(fraction.len()).ok()?)?;
            Rational::new(if negative { -num } else { num }, den)
        })();
        let value = match exact {
            Some(r) => Value::Exact(r),
            None => Value::Float(text.parse::<f64>().ok()?),
        };
        Some(Number {
            literal: Some(text.into()),
            value,
        })
    }

    pub fn from_value(value: Value) -> Number {
        Number {
            literal: None,
            value,
        }
    }

    #[inline]
    pub fn integer(n: i128) -> Number {
        Number::from_value(Value::Exact(Rational::integer(n)))
    }

    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_negative()
    }

    pub fn is_one(&self) -> bool {
        self.value.is_one()
    }

    pub fn is_minus_one(&self) -> bool {
        self.value == Value::Exact(Rational::MINUS_ONE)
    }

    /// The negated number. Literal text is kept with its sign flipped.
    pub fn neg(&self) -> Number {
        let literal = self.literal.as_deref().map(|text| match text.strip_prefix('-') {
            Some(positive) => positive.into(),
            None => format!("-{text}").into_boxed_str(),
        });
        Number {
            literal,
            value: self.value.neg(),
        }
    }

    /// The decimal text of this number, if it has one.
    ///
    /// Literals return their source text. Computed integers and floats are formatted;
    /// computed non-integer fractions have no decimal text and return `None`.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        if let Some(literal) = &self.literal {
            return Some(Cow::Borrowed(literal));
        }
        match self.value {
            Value::Exact(r) if r.is_integer() => Some(Cow::Owned(r.numer().to_string())),
            Value::Exact(_) => None,
            Value::Float(x) => Some(Cow::Owned(format_float(x))),
        }
    }
}

/// Formats a float without an exponent and without a trailing `.0`.
pub(crate) fn format_float(x: f64) -> String {
    let mut text = format!("{x}");
    if let Some(stripped) = text.strip_suffix(".0") {
        text.truncate(stripped.len());
    }
    text
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::integer(i128::from(n))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(text) => f.write_str(&text),
            None => match self.value {
                Value::Exact(r) => write!(f, "{r}"),
                Value::Float(x) => f.write_str(&format_float(x)),
            },
        }
    }
}
