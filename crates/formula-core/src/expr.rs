//! The expression tree handed to and returned from the symbolic engine.

use std::fmt;

use strum_macros::{EnumIter, IntoStaticStr};

use crate::number::{Number, Rational, Value};

/// Functions with a dedicated LaTeX command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum BuiltinFunction {
    Sin,
    Cos,
    Tan,
    Cot,
    Sec,
    Csc,
    Arcsin,
    Arccos,
    Arctan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Log,
    Ln,
    Sqrt,
}

impl BuiltinFunction {
    /// The function name, which is also its LaTeX command without the backslash.
    #[inline]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Number of arguments the function takes.
    #[inline]
    pub fn arity(self) -> usize {
        1
    }

    /// The inverse written as a power of `-1`, as in `\sin^{-1} x`.
    pub fn inverse(self) -> Option<BuiltinFunction> {
        match self {
            BuiltinFunction::Sin => Some(BuiltinFunction::Arcsin),
            BuiltinFunction::Cos => Some(BuiltinFunction::Arccos),
            BuiltinFunction::Tan => Some(BuiltinFunction::Arctan),
            _ => None,
        }
    }

    pub(crate) fn apply(self, x: f64) -> f64 {
        match self {
            BuiltinFunction::Sin => x.sin(),
            BuiltinFunction::Cos => x.cos(),
            BuiltinFunction::Tan => x.tan(),
            BuiltinFunction::Cot => x.tan().recip(),
            BuiltinFunction::Sec => x.cos().recip(),
            BuiltinFunction::Csc => x.sin().recip(),
            BuiltinFunction::Arcsin => x.asin(),
            BuiltinFunction::Arccos => x.acos(),
            BuiltinFunction::Arctan => x.atan(),
            BuiltinFunction::Sinh => x.sinh(),
            BuiltinFunction::Cosh => x.cosh(),
            BuiltinFunction::Tanh => x.tanh(),
            BuiltinFunction::Exp => x.exp(),
            BuiltinFunction::Log | BuiltinFunction::Ln => x.ln(),
            BuiltinFunction::Sqrt => x.sqrt(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    Builtin(BuiltinFunction),
    /// An applied undefined function, e.g. `w_nm` in `w_{nm}(E, E_0)`.
    Undefined(String),
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Builtin(f) => f.name(),
            Function::Undefined(name) => name,
        }
    }
}

/// A symbolic expression.
///
/// `Add` and `Mul` are n-ary and kept flat. Subtraction is represented as addition of a
/// term multiplied by `-1`, division as multiplication by a power with exponent `-1`; in both
/// cases operand order is kept as written.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Symbol(String),
    Number(Number),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
    Eq(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn symbol(name: impl Into<String>) -> Expr {
        Expr::Symbol(name.into())
    }

    pub fn integer(n: i64) -> Expr {
        Expr::Number(Number::from(n))
    }

    pub fn value(value: Value) -> Expr {
        Expr::Number(Number::from_value(value))
    }

    pub fn minus_one() -> Expr {
        Expr::value(Value::Exact(Rational::MINUS_ONE))
    }

    /// Sum of `terms`, flattening nested sums. A single term is returned as is.
    pub fn add(terms: impl IntoIterator<Item = Expr>) -> Expr {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                Expr::Add(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or_else(|| Expr::integer(0))
        } else {
            Expr::Add(flat)
        }
    }

    /// Product of `factors`, flattening nested products. A single factor is returned as is.
    pub fn mul(factors: impl IntoIterator<Item = Expr>) -> Expr {
        let mut flat = Vec::new();
        for factor in factors {
            match factor {
                Expr::Mul(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or_else(|| Expr::integer(1))
        } else {
            Expr::Mul(flat)
        }
    }

    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        Expr::Pow(Box::new(base), Box::new(exponent))
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Eq(Box::new(lhs), Box::new(rhs))
    }

    /// `-1 * self`, folding the sign into numbers and leading coefficients.
    pub fn negate(self) -> Expr {
        match self {
            Expr::Number(n) => Expr::Number(n.neg()),
            Expr::Mul(mut factors) => {
                match factors.first_mut() {
                    Some(Expr::Number(n)) if n.is_minus_one() => {
                        factors.remove(0);
                        return Expr::mul(factors);
                    }
                    Some(Expr::Number(n)) => *n = n.neg(),
                    _ => factors.insert(0, Expr::minus_one()),
                }
                Expr::Mul(factors)
            }
            other => Expr::mul([Expr::minus_one(), other]),
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Expr::Number(n) => Some(n),
            _ => None,
        }
    }

    /// The right-hand side of an equation, or the expression itself.
    pub fn rhs(&self) -> &Expr {
        match self {
            Expr::Eq(_, rhs) => rhs,
            other => other,
        }
    }

    /// The left-hand side of an equation.
    pub fn lhs(&self) -> Option<&Expr> {
        match self {
            Expr::Eq(lhs, _) => Some(lhs),
            _ => None,
        }
    }

    /// Visit every node, parents before children.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Symbol(_) | Expr::Number(_) => {}
            Expr::Add(items) | Expr::Mul(items) | Expr::Call(_, items) => {
                for item in items {
                    item.walk(f);
                }
            }
            Expr::Pow(a, b) | Expr::Eq(a, b) => {
                a.walk(f);
                b.walk(f);
            }
        }
    }

    /// All distinct symbol names in order of first appearance.
    pub fn symbols(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        self.walk(&mut |expr| {
            if let Expr::Symbol(name) = expr
                && !names.contains(&name.as_str())
            {
                names.push(name);
            }
        });
        names
    }
}

impl From<Number> for Expr {
    fn from(n: Number) -> Self {
        Expr::Number(n)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::integer(n)
    }
}

impl From<f64> for Expr {
    fn from(x: f64) -> Self {
        Expr::value(Value::Float(x))
    }
}

/// S-expression form, used for debugging and the `tree` subcommand of the CLI.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, head: &str, items: &[Expr]) -> fmt::Result {
            write!(f, "({head}")?;
            for item in items {
                write!(f, " {item}")?;
            }
            f.write_str(")")
        }
        match self {
            Expr::Symbol(name) => f.write_str(name),
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Add(terms) => list(f, "+", terms),
            Expr::Mul(factors) => list(f, "*", factors),
            Expr::Pow(base, exp) => write!(f, "(^ {base} {exp})"),
            Expr::Call(func, args) => list(f, func.name(), args),
            Expr::Eq(lhs, rhs) => write!(f, "(= {lhs} {rhs})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn constructors_flatten() {
        let e = Expr::mul([
            Expr::symbol("a"),
            Expr::mul([Expr::symbol("b"), Expr::symbol("c")]),
        ]);
        assert_snapshot!(e.to_string(), @"(* a b c)");
        let single = Expr::add([Expr::symbol("x")]);
        assert_eq!(single, Expr::symbol("x"));
    }

    #[test]
    fn negate_folds_coefficients() {
        assert_snapshot!(Expr::symbol("x").negate().to_string(), @"(* -1 x)");
        assert_snapshot!(Expr::symbol("x").negate().negate().to_string(), @"x");
        assert_snapshot!(Expr::integer(3).negate().to_string(), @"-3");
        let two_x = Expr::mul([Expr::integer(2), Expr::symbol("x")]);
        assert_snapshot!(two_x.negate().to_string(), @"(* -2 x)");
    }

    #[test]
    fn symbols_in_order_of_appearance() {
        let e = Expr::eq(
            Expr::symbol("E"),
            Expr::mul([
                Expr::symbol("m"),
                Expr::pow(Expr::symbol("c"), Expr::integer(2)),
                Expr::symbol("m"),
            ]),
        );
        assert_eq!(e.symbols(), ["E", "m", "c"]);
    }
}
