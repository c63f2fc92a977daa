//! The seam to the symbolic-computation engine, and a small default engine.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::expr::{Expr, Function};
use crate::number::{Number, Value};
use crate::render::LatexEmitter;
use crate::symbols::SymbolMap;

/// Values to substitute for symbols, keyed by symbol name (e.g. `E_0`).
pub type Bindings = FxHashMap<String, Expr>;

/// The operations a formula needs from a symbolic-computation engine.
///
/// Engines are shared between threads together with the [`Notation`](crate::Notation) that
/// owns them.
pub trait SymbolicEngine: Send + Sync {
    /// Replace every bound symbol at once; a replacement is never substituted into again.
    fn substitute(&self, expr: &Expr, bindings: &Bindings) -> Result<Expr, EngineError>;

    /// Render an expression as LaTeX, before encapsulation.
    fn render(&self, expr: &Expr, symbols: &SymbolMap) -> Result<String, EngineError>;

    /// Evaluate an expression numerically. For an equation, the right-hand side is evaluated.
    fn evaluate(&self, expr: &Expr, bindings: &Bindings) -> Result<f64, EngineError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    UnboundSymbol(String),
    DivisionByZero,
    NonFinite,
    Unsupported(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnboundSymbol(name) => write!(f, "symbol \"{name}\" has no value"),
            EngineError::DivisionByZero => f.write_str("division by zero"),
            EngineError::NonFinite => f.write_str("the result is not a finite number"),
            EngineError::Unsupported(what) => write!(f, "cannot evaluate {what}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// The built-in engine.
///
/// It folds numeric subexpressions exactly where possible but performs no other
/// simplification, and renders in the style of SymPy's `latex()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEngine;

impl SymbolicEngine for DefaultEngine {
    fn substitute(&self, expr: &Expr, bindings: &Bindings) -> Result<Expr, EngineError> {
        Ok(fold(replace(expr, bindings)))
    }

    fn render(&self, expr: &Expr, symbols: &SymbolMap) -> Result<String, EngineError> {
        let folded = fold(expr.clone());
        let mut emitter = LatexEmitter::new(symbols);
        emitter.emit(&folded)?;
        Ok(emitter.into_inner())
    }

    fn evaluate(&self, expr: &Expr, bindings: &Bindings) -> Result<f64, EngineError> {
        let value = eval(&replace(expr.rhs(), bindings))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EngineError::NonFinite)
        }
    }
}

/// Simultaneous substitution.
fn replace(expr: &Expr, bindings: &Bindings) -> Expr {
    match expr {
        Expr::Symbol(name) => match bindings.get(name) {
            Some(value) => value.clone(),
            None => expr.clone(),
        },
        Expr::Number(_) => expr.clone(),
        Expr::Add(terms) => Expr::add(terms.iter().map(|term| replace(term, bindings))),
        Expr::Mul(factors) => Expr::mul(factors.iter().map(|factor| replace(factor, bindings))),
        Expr::Pow(base, exp) => Expr::pow(replace(base, bindings), replace(exp, bindings)),
        Expr::Call(function, args) => Expr::Call(
            function.clone(),
            args.iter().map(|arg| replace(arg, bindings)).collect(),
        ),
        Expr::Eq(lhs, rhs) => Expr::eq(replace(lhs, bindings), replace(rhs, bindings)),
    }
}

/// Fold numeric subexpressions.
///
/// In a sum the numeric terms are added and placed last; in a product the numeric factors are
/// multiplied into a leading coefficient, which is dropped if it is one. A lone number keeps its
/// literal text. Function calls are never evaluated.
pub(crate) fn fold(expr: Expr) -> Expr {
    match expr {
        Expr::Symbol(_) | Expr::Number(_) => expr,
        Expr::Add(terms) => {
            let mut rest = Vec::with_capacity(terms.len());
            let mut numbers = Vec::new();
            for term in terms.into_iter().map(fold) {
                match term {
                    Expr::Number(n) => numbers.push(n),
                    other => rest.extend(flatten_add(other)),
                }
            }
            let constant = combine(numbers, Value::add);
            match constant {
                Some(n) if !n.value().is_zero() || rest.is_empty() => rest.push(Expr::Number(n)),
                _ => {}
            }
            if rest.is_empty() {
                Expr::integer(0)
            } else {
                Expr::add(rest)
            }
        }
        Expr::Mul(factors) => {
            let mut rest = Vec::with_capacity(factors.len());
            let mut numbers = Vec::new();
            for factor in factors.into_iter().map(fold) {
                match factor {
                    Expr::Number(n) => numbers.push(n),
                    Expr::Mul(inner) => {
                        for f in inner {
                            match f {
                                Expr::Number(n) => numbers.push(n),
                                other => rest.push(other),
                            }
                        }
                    }
                    other => rest.push(other),
                }
            }
            match combine(numbers, Value::mul) {
                Some(n) if n.value().is_zero() => Expr::Number(n),
                Some(n) if n.is_one() && !rest.is_empty() => Expr::mul(rest),
                Some(n) => {
                    rest.insert(0, Expr::Number(n));
                    Expr::mul(rest)
                }
                None if rest.is_empty() => Expr::integer(1),
                None => Expr::mul(rest),
            }
        }
        Expr::Pow(base, exp) => {
            let (base, exp) = (fold(*base), fold(*exp));
            if exp.as_number().is_some_and(Number::is_one) {
                return base;
            }
            if let Some(n) = exp.as_number().filter(|n| is_exact_integer(n)) {
                // Integer powers are distributed over products and merged with inner powers.
                match base {
                    Expr::Mul(factors) => {
                        let powers = factors
                            .into_iter()
                            .map(|factor| Expr::pow(factor, exp.clone()))
                            .collect();
                        return fold(Expr::Mul(powers));
                    }
                    Expr::Pow(inner, inner_exp) => {
                        if let Some(m) = inner_exp.as_number() {
                            let merged = Expr::value(m.value().mul(n.value()));
                            return fold(Expr::pow(*inner, merged));
                        }
                        return Expr::pow(Expr::Pow(inner, inner_exp), exp);
                    }
                    _ => {}
                }
            }
            if let (Expr::Number(b), Expr::Number(e)) = (&base, &exp) {
                let foldable = match (b.value(), e.value()) {
                    (Value::Exact(_), Value::Exact(e)) => e.is_integer(),
                    _ => true,
                };
                if foldable && let Some(value) = b.value().pow(e.value()) {
                    return Expr::value(value);
                }
            }
            Expr::pow(base, exp)
        }
        Expr::Call(function, args) => Expr::Call(function, args.into_iter().map(fold).collect()),
        Expr::Eq(lhs, rhs) => Expr::eq(fold(*lhs), fold(*rhs)),
    }
}

fn is_exact_integer(n: &Number) -> bool {
    matches!(n.value(), Value::Exact(r) if r.is_integer())
}

fn flatten_add(expr: Expr) -> Vec<Expr> {
    match expr {
        Expr::Add(inner) => inner,
        other => vec![other],
    }
}

/// Combine numbers with `op`. A single number is returned unchanged, literal text included.
fn combine(numbers: Vec<Number>, op: fn(Value, Value) -> Value) -> Option<Number> {
    let mut iter = numbers.into_iter();
    let first = iter.next()?;
    let mut acc: Option<Value> = None;
    for n in iter {
        acc = Some(op(acc.unwrap_or(first.value()), n.value()));
    }
    Some(match acc {
        Some(value) => Number::from_value(value),
        None => first,
    })
}

fn eval(expr: &Expr) -> Result<f64, EngineError> {
    match expr {
        Expr::Symbol(name) => match name.as_str() {
            "pi" => Ok(std::f64::consts::PI),
            "e" => Ok(std::f64::consts::E),
            _ => Err(EngineError::UnboundSymbol(name.clone())),
        },
        Expr::Number(n) => Ok(n.value().to_f64()),
        Expr::Add(terms) => terms.iter().try_fold(0.0, |acc, term| Ok(acc + eval(term)?)),
        Expr::Mul(factors) => factors
            .iter()
            .try_fold(1.0, |acc, factor| Ok(acc * eval(factor)?)),
        Expr::Pow(base, exp) => {
            let (base, exp) = (eval(base)?, eval(exp)?);
            if base == 0.0 && exp < 0.0 {
                return Err(EngineError::DivisionByZero);
            }
            Ok(base.powf(exp))
        }
        Expr::Call(Function::Builtin(function), args) => match args.as_slice() {
            [arg] => Ok(function.apply(eval(arg)?)),
            _ => Err(EngineError::Unsupported(format!(
                "\"{}\" with {} arguments",
                function.name(),
                args.len()
            ))),
        },
        Expr::Call(Function::Undefined(name), _) => Err(EngineError::Unsupported(format!(
            "the undefined function \"{name}\""
        ))),
        Expr::Eq(_, rhs) => eval(rhs),
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::expr::BuiltinFunction;
    use crate::number::Rational;

    fn bindings(pairs: &[(&str, i64)]) -> Bindings {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), Expr::integer(*value)))
            .collect()
    }

    fn kinetic_energy() -> Expr {
        // KE = 1/2 m v^2
        Expr::eq(
            Expr::symbol("KE"),
            Expr::mul([
                Expr::integer(1),
                Expr::pow(Expr::integer(2), Expr::minus_one()),
                Expr::symbol("m"),
                Expr::pow(Expr::symbol("v"), Expr::integer(2)),
            ]),
        )
    }

    #[test]
    fn substitution_folds_numbers() {
        let engine = DefaultEngine;
        let result = engine
            .substitute(&kinetic_energy(), &bindings(&[("m", 2), ("v", 10)]))
            .unwrap();
        assert_snapshot!(result.to_string(), @"(= KE 100)");
        let partial = engine
            .substitute(&kinetic_energy(), &bindings(&[("v", 10)]))
            .unwrap();
        assert_snapshot!(partial.to_string(), @"(= KE (* 50 m))");
    }

    #[test]
    fn substitution_is_simultaneous() {
        let swap: Bindings = [
            ("x".to_string(), Expr::symbol("y")),
            ("y".to_string(), Expr::symbol("x")),
        ]
        .into_iter()
        .collect();
        let expr = Expr::add([Expr::symbol("x"), Expr::negate(Expr::symbol("y"))]);
        let result = DefaultEngine.substitute(&expr, &swap).unwrap();
        assert_snapshot!(result.to_string(), @"(+ y (* -1 x))");
    }

    #[test]
    fn folding_keeps_literals_and_irrational_powers() {
        let half = Value::Exact(Rational::new(1, 2).unwrap());
        let expr = Expr::add([
            Expr::Number(Number::parse("3.50").unwrap()),
            Expr::symbol("x"),
            Expr::pow(Expr::integer(2), Expr::value(half)),
        ]);
        assert_snapshot!(fold(expr).to_string(), @"(+ x (^ 2 1/2) 3.50)");
        let sum = Expr::add([Expr::symbol("x"), Expr::integer(2), Expr::integer(3)]);
        assert_snapshot!(fold(sum).to_string(), @"(+ x 5)");
        let zero = Expr::add([
            Expr::symbol("x"),
            Expr::mul([Expr::integer(0), Expr::symbol("y")]),
        ]);
        assert_snapshot!(fold(zero).to_string(), @"x");
    }

    #[test]
    fn integer_powers_distribute() {
        let (a, b) = (Expr::symbol("a"), Expr::symbol("b"));
        // (2 a)^2 / b^2 / 2
        let expr = Expr::mul([
            Expr::pow(Expr::mul([Expr::integer(2), a.clone()]), Expr::integer(2)),
            Expr::pow(Expr::pow(b.clone(), Expr::integer(2)), Expr::minus_one()),
            Expr::pow(Expr::integer(2), Expr::minus_one()),
        ]);
        assert_snapshot!(fold(expr).to_string(), @"(* 2 (^ a 2) (^ b -2))");
        let half = Value::Exact(Rational::new(1, 2).unwrap());
        let root = Expr::pow(Expr::pow(a, Expr::value(half)), Expr::integer(2));
        assert_snapshot!(fold(root).to_string(), @"a");
        let symbolic = Expr::pow(Expr::pow(b, Expr::symbol("n")), Expr::integer(2));
        assert_snapshot!(fold(symbolic).to_string(), @"(^ (^ b n) 2)");
    }

    #[test]
    fn evaluation() {
        let engine = DefaultEngine;
        let value = engine
            .evaluate(&kinetic_energy(), &bindings(&[("m", 2), ("v", 3)]))
            .unwrap();
        assert_eq!(value, 9.0);
        let err = engine.evaluate(&kinetic_energy(), &bindings(&[("m", 2)]));
        assert_eq!(err, Err(EngineError::UnboundSymbol("v".to_string())));
        let circle = Expr::mul([Expr::symbol("pi"), Expr::pow(Expr::symbol("r"), Expr::integer(2))]);
        let area = engine.evaluate(&circle, &bindings(&[("r", 1)])).unwrap();
        assert!((area - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn evaluation_errors() {
        let engine = DefaultEngine;
        let inverse = Expr::pow(Expr::symbol("x"), Expr::minus_one());
        assert_eq!(
            engine.evaluate(&inverse, &bindings(&[("x", 0)])),
            Err(EngineError::DivisionByZero)
        );
        let undefined = Expr::Call(Function::Undefined("f".into()), vec![Expr::integer(1)]);
        assert!(matches!(
            engine.evaluate(&undefined, &Bindings::default()),
            Err(EngineError::Unsupported(_))
        ));
        let log_zero = Expr::Call(
            Function::Builtin(BuiltinFunction::Ln),
            vec![Expr::integer(0)],
        );
        assert_eq!(
            engine.evaluate(&log_zero, &Bindings::default()),
            Err(EngineError::NonFinite)
        );
    }
}
