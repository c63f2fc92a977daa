//! Translation of the concrete parse tree into an expression tree.

use crate::commands::builtin_function;
use crate::error::{BuildErrKind, BuildError};
use crate::expr::{BuiltinFunction, Expr, Function};
use crate::number::{Number, Rational, Value};
use crate::syntax::{Callee, IdentName, MulOp, Node, NodeKind, Sign, Subscript, SubscriptPart};
use crate::token::Span;

type BuildResult = Result<Expr, BuildError>;

/// Build the expression tree of a whole formula. `=` is only accepted at the root.
pub(crate) fn build_formula(root: &Node) -> BuildResult {
    match &root.kind {
        NodeKind::Relation { lhs, rhs } => Ok(Expr::eq(build(lhs)?, build(rhs)?)),
        _ => build(root),
    }
}

fn build(node: &Node) -> BuildResult {
    match &node.kind {
        NodeKind::Number(text) => Number::parse(text)
            .map(Expr::Number)
            .ok_or_else(|| error(node.span, BuildErrKind::InvalidNumber)),
        NodeKind::Identifier { name, subscript } => {
            Ok(Expr::Symbol(symbol_name(*name, subscript.as_ref())?))
        }
        NodeKind::Scripts {
            base,
            subscript,
            superscript,
        } => {
            let base = match subscript {
                Some(subscript) => match &base.kind {
                    NodeKind::Identifier {
                        name,
                        subscript: None,
                    } => Expr::Symbol(symbol_name(*name, Some(subscript))?),
                    _ => return Err(error(base.span, BuildErrKind::SubscriptOnNonIdentifier)),
                },
                None => build(base)?,
            };
            match superscript {
                Some(exponent) => Ok(Expr::pow(base, build(exponent)?)),
                None => Ok(base),
            }
        }
        NodeKind::Call { callee, args } => build_call(node.span, callee, args),
        NodeKind::Frac {
            numerator,
            denominator,
        } => Ok(Expr::mul([
            build(numerator)?,
            Expr::pow(build(denominator)?, Expr::minus_one()),
        ])),
        NodeKind::Sqrt { index, radicand } => {
            let radicand = build(radicand)?;
            let Some(index) = index else {
                return Ok(Expr::Call(
                    Function::Builtin(BuiltinFunction::Sqrt),
                    vec![radicand],
                ));
            };
            let n = match build(index)? {
                Expr::Number(n) => match n.value() {
                    Value::Exact(r) if r.is_integer() && r.numer() > 0 => r.numer(),
                    _ => return Err(error(index.span, BuildErrKind::InvalidRootIndex)),
                },
                _ => return Err(error(index.span, BuildErrKind::InvalidRootIndex)),
            };
            let exponent = Rational::new(1, n)
                .ok_or_else(|| error(index.span, BuildErrKind::InvalidRootIndex))?;
            Ok(Expr::pow(
                radicand,
                Expr::Number(Number::from_value(Value::Exact(exponent))),
            ))
        }
        NodeKind::Group(inner) => build(inner),
        NodeKind::Tuple(_) => Err(error(node.span, BuildErrKind::ArgumentListOutsideCall)),
        NodeKind::Unary { sign, operand } => {
            let operand = build(operand)?;
            Ok(match sign {
                Sign::Plus => operand,
                Sign::Minus => operand.negate(),
            })
        }
        NodeKind::Sum(terms) => {
            let terms = terms
                .iter()
                .map(|(sign, term)| {
                    let term = build(term)?;
                    Ok(match sign {
                        Sign::Plus => term,
                        Sign::Minus => term.negate(),
                    })
                })
                .collect::<Result<Vec<_>, BuildError>>()?;
            Ok(Expr::add(terms))
        }
        NodeKind::Product(factors) => {
            let factors = factors
                .iter()
                .map(|(op, factor)| {
                    let factor = build(factor)?;
                    Ok(match op {
                        MulOp::Times => factor,
                        MulOp::Divide => Expr::pow(factor, Expr::minus_one()),
                    })
                })
                .collect::<Result<Vec<_>, BuildError>>()?;
            Ok(Expr::mul(factors))
        }
        NodeKind::Relation { .. } => Err(error(node.span, BuildErrKind::NestedRelation)),
    }
}

fn build_call(span: Span, callee: &Callee, args: &[Node]) -> BuildResult {
    let args = args.iter().map(build).collect::<Result<Vec<_>, _>>()?;
    match callee {
        Callee::Builtin { function, power } => {
            let Some(power) = power else {
                return builtin_call(span, *function, args);
            };
            let power = build(power)?;
            match function.inverse() {
                Some(inverse) if power.as_number().is_some_and(Number::is_minus_one) => {
                    builtin_call(span, inverse, args)
                }
                _ => Ok(Expr::pow(builtin_call(span, *function, args)?, power)),
            }
        }
        Callee::Named(ident) => match &ident.kind {
            NodeKind::Identifier { name, subscript } => Ok(Expr::Call(
                Function::Undefined(symbol_name(*name, subscript.as_ref())?),
                args,
            )),
            _ => Err(error(ident.span, BuildErrKind::SubscriptOnNonIdentifier)),
        },
        Callee::OperatorName { name, subscript } => {
            if subscript.is_none()
                && let Some(function) = builtin_function(name)
            {
                return builtin_call(span, function, args);
            }
            Ok(Expr::Call(
                Function::Undefined(symbol_name(IdentName::Styled(name), subscript.as_ref())?),
                args,
            ))
        }
    }
}

fn builtin_call(span: Span, function: BuiltinFunction, args: Vec<Expr>) -> BuildResult {
    if args.len() != function.arity() {
        return Err(error(
            span,
            BuildErrKind::Arity {
                function: function.name(),
                expected: function.arity(),
                got: args.len(),
            },
        ));
    }
    Ok(Expr::Call(Function::Builtin(function), args))
}

/// The symbol name of an identifier: its base name, followed by `_` and the subscript if there
/// is one. Separators in the subscript are dropped.
fn symbol_name(name: IdentName, subscript: Option<&Subscript>) -> Result<String, BuildError> {
    let mut symbol = name.as_str().to_string();
    let Some(subscript) = subscript else {
        return Ok(symbol);
    };
    symbol.push('_');
    let base_len = symbol.len();
    for (span, part) in &subscript.parts {
        match part {
            SubscriptPart::Text(text) if text.bytes().all(|b| b.is_ascii_alphanumeric()) => {
                symbol.push_str(text);
            }
            SubscriptPart::Symbol(name) => symbol.push_str(name),
            SubscriptPart::Separator => {}
            SubscriptPart::Text(_) | SubscriptPart::Invalid => {
                return Err(error(*span, BuildErrKind::InvalidSubscript));
            }
        }
    }
    if symbol.len() == base_len {
        return Err(error(subscript.span, BuildErrKind::InvalidSubscript));
    }
    Ok(symbol)
}

#[inline]
fn error(span: Span, kind: BuildErrKind) -> BuildError {
    BuildError(span.into(), kind)
}
