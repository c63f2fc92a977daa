//! A single formula: raw markup, its expression tree and where it is in its life cycle.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use strum_macros::IntoStaticStr;

use crate::Notation;
use crate::engine::{Bindings, EngineError};
use crate::error::{BuildError, EncapsulationError, SyntaxError};
use crate::expr::{Expr, Function};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum FormulaState {
    /// No markup has been read yet.
    Empty,
    /// The tree was built from the stored markup.
    Parsed,
    /// The tree was changed by `subs` or `combine`; the stored markup is stale.
    Modified,
}

/// The pipeline stage that produced a [`FormulaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Normalize,
    Parse,
    Build,
    Substitute,
    Render,
    Encapsulate,
    Evaluate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// `markup` is the raw input the error range refers to.
    Normalize {
        markup: String,
        error: Box<SyntaxError>,
    },
    /// `markup` is the normalized text the error range refers to.
    Parse {
        markup: String,
        error: Box<SyntaxError>,
    },
    Build {
        markup: String,
        error: BuildError,
    },
    Substitute(EngineError),
    Render(EngineError),
    Encapsulate(EncapsulationError),
    Evaluate(EngineError),
    /// The operation needs an expression tree, but the formula is empty.
    NotParsed,
}

impl FormulaError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            FormulaError::Normalize { .. } => Some(Stage::Normalize),
            FormulaError::Parse { .. } => Some(Stage::Parse),
            FormulaError::Build { .. } => Some(Stage::Build),
            FormulaError::Substitute(_) => Some(Stage::Substitute),
            FormulaError::Render(_) => Some(Stage::Render),
            FormulaError::Encapsulate(_) => Some(Stage::Encapsulate),
            FormulaError::Evaluate(_) => Some(Stage::Evaluate),
            FormulaError::NotParsed => None,
        }
    }

    /// The text that the error's byte range points into, for errors that have one.
    pub fn markup(&self) -> Option<&str> {
        match self {
            FormulaError::Normalize { markup, .. }
            | FormulaError::Parse { markup, .. }
            | FormulaError::Build { markup, .. } => Some(markup),
            _ => None,
        }
    }
}

#[cfg(feature = "ariadne")]
impl FormulaError {
    /// Convert this error into an [`ariadne::Report`], if it points into markup.
    ///
    /// The report's source is [`FormulaError::markup`].
    pub fn to_report<'name>(
        &self,
        source_name: &'name str,
        with_color: bool,
    ) -> Option<ariadne::Report<'static, (&'name str, std::ops::Range<usize>)>> {
        match self {
            FormulaError::Normalize { error, .. } | FormulaError::Parse { error, .. } => {
                Some(error.to_report(source_name, with_color))
            }
            FormulaError::Build { error, .. } => Some(error.to_report(source_name, with_color)),
            _ => None,
        }
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::Normalize { error, .. } | FormulaError::Parse { error, .. } => {
                write!(f, "{error}")
            }
            FormulaError::Build { error, .. } => write!(f, "{error}"),
            FormulaError::Substitute(error) => write!(f, "substitution failed: {error}"),
            FormulaError::Render(error) => write!(f, "rendering failed: {error}"),
            FormulaError::Encapsulate(error) => write!(f, "{error}"),
            FormulaError::Evaluate(error) => write!(f, "evaluation failed: {error}"),
            FormulaError::NotParsed => f.write_str("the formula is empty"),
        }
    }
}

impl std::error::Error for FormulaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FormulaError::Normalize { error, .. } | FormulaError::Parse { error, .. } => {
                Some(error.as_ref())
            }
            FormulaError::Build { error, .. } => Some(error),
            FormulaError::Substitute(error)
            | FormulaError::Render(error)
            | FormulaError::Evaluate(error) => Some(error),
            FormulaError::Encapsulate(error) => Some(error),
            FormulaError::NotParsed => None,
        }
    }
}

/// Markup and expression tree of one formula.
///
/// After every successful mutating operation the tree describes the formula; the markup is
/// updated only by [`Formula::from_latex`]. Use [`Formula::to_latex`] to get markup for the
/// current tree.
#[derive(Debug, Clone)]
pub struct Formula {
    notation: Arc<Notation>,
    state: FormulaState,
    latex: String,
    expr: Option<Expr>,
}

impl Formula {
    pub fn new(notation: Arc<Notation>) -> Self {
        Formula {
            notation,
            state: FormulaState::Empty,
            latex: String::new(),
            expr: None,
        }
    }

    /// Read raw markup from the editor.
    ///
    /// On failure, the formula is left exactly as it was.
    pub fn from_latex(&mut self, markup: &str) -> Result<(), FormulaError> {
        let expr = self.notation.latex_symbol(markup)?;
        tracing::debug!(markup, expr = %expr, "built expression tree");
        self.latex = markup.to_string();
        self.expr = Some(expr);
        self.state = FormulaState::Parsed;
        Ok(())
    }

    /// Canonical markup of the current expression tree.
    pub fn to_latex(&self) -> Result<String, FormulaError> {
        let expr = self.to_expr()?;
        let rendered = self.notation.render(expr)?;
        tracing::debug!(expr = %expr, rendered = %rendered, "rendered expression tree");
        Ok(rendered)
    }

    pub fn to_expr(&self) -> Result<&Expr, FormulaError> {
        self.expr.as_ref().ok_or(FormulaError::NotParsed)
    }

    /// Replace symbols by expressions, all at once.
    pub fn subs(&mut self, bindings: &Bindings) -> Result<(), FormulaError> {
        let expr = self.to_expr()?;
        let substituted = self
            .notation
            .engine()
            .substitute(expr, bindings)
            .map_err(FormulaError::Substitute)?;
        tracing::debug!(before = %expr, after = %substituted, "substituted");
        self.expr = Some(substituted);
        self.state = FormulaState::Modified;
        Ok(())
    }

    /// Evaluate the formula numerically; for an equation, its right-hand side.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<f64, FormulaError> {
        self.notation
            .engine()
            .evaluate(self.to_expr()?, bindings)
            .map_err(FormulaError::Evaluate)
    }

    /// Expand applied undefined functions with the definitions found in `others`.
    ///
    /// A formula `f(x, y) = rhs` whose parameters are all symbols defines `f`. Every call of `f`
    /// with two arguments is replaced by `rhs` with the parameters bound to the arguments, and
    /// the result is expanded again. A call that would expand into itself is kept.
    ///
    /// For an equation, only the right-hand side is expanded.
    pub fn combine(&mut self, others: &[&Formula]) -> Result<(), FormulaError> {
        let expr = self.to_expr()?;
        let mut definitions: FxHashMap<&str, Definition> = FxHashMap::default();
        for other in others {
            if let Some((name, definition)) = other.expr.as_ref().and_then(Definition::of) {
                definitions.entry(name).or_insert(definition);
            }
        }
        let mut expander = Expander {
            notation: &self.notation,
            definitions,
            active: Vec::new(),
        };
        let combined = match expr {
            Expr::Eq(lhs, rhs) => Expr::eq((**lhs).clone(), expander.expand(rhs)?),
            other => expander.expand(other)?,
        };
        tracing::debug!(before = %expr, after = %combined, "combined");
        self.expr = Some(combined);
        self.state = FormulaState::Modified;
        Ok(())
    }

    /// The markup last read by [`Formula::from_latex`].
    #[inline]
    pub fn latex(&self) -> &str {
        &self.latex
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state == FormulaState::Empty
    }

    #[inline]
    pub fn state(&self) -> FormulaState {
        self.state
    }

    pub fn notation(&self) -> &Arc<Notation> {
        &self.notation
    }
}

#[derive(Clone, Copy)]
struct Definition<'a> {
    parameters: &'a [Expr],
    body: &'a Expr,
}

impl<'a> Definition<'a> {
    fn of(expr: &'a Expr) -> Option<(&'a str, Self)> {
        let Expr::Eq(lhs, body) = expr else {
            return None;
        };
        let Expr::Call(Function::Undefined(name), parameters) = lhs.as_ref() else {
            return None;
        };
        if !parameters.iter().all(|p| matches!(p, Expr::Symbol(_))) {
            return None;
        }
        Some((name, Definition { parameters, body }))
    }
}

struct Expander<'a> {
    notation: &'a Notation,
    definitions: FxHashMap<&'a str, Definition<'a>>,
    /// Definitions currently being expanded, innermost last.
    active: Vec<&'a str>,
}

impl<'a> Expander<'a> {
    fn expand(&mut self, expr: &Expr) -> Result<Expr, FormulaError> {
        Ok(match expr {
            Expr::Symbol(_) | Expr::Number(_) => expr.clone(),
            Expr::Add(terms) => Expr::Add(self.expand_all(terms)?),
            Expr::Mul(factors) => Expr::Mul(self.expand_all(factors)?),
            Expr::Pow(base, exponent) => Expr::pow(self.expand(base)?, self.expand(exponent)?),
            Expr::Eq(lhs, rhs) => Expr::eq(self.expand(lhs)?, self.expand(rhs)?),
            Expr::Call(function, args) => {
                let args = self.expand_all(args)?;
                match function {
                    Function::Undefined(name) => self.expand_call(name, args)?,
                    Function::Builtin(_) => Expr::Call(function.clone(), args),
                }
            }
        })
    }

    fn expand_all(&mut self, items: &[Expr]) -> Result<Vec<Expr>, FormulaError> {
        items.iter().map(|item| self.expand(item)).collect()
    }

    fn expand_call(&mut self, name: &str, args: Vec<Expr>) -> Result<Expr, FormulaError> {
        let Some((&key, &definition)) = self.definitions.get_key_value(name) else {
            return Ok(Expr::Call(Function::Undefined(name.to_string()), args));
        };
        if definition.parameters.len() != args.len() {
            return Ok(Expr::Call(Function::Undefined(name.to_string()), args));
        }
        if self.active.contains(&key) {
            tracing::warn!(function = name, "recursive definition, not expanded");
            return Ok(Expr::Call(Function::Undefined(name.to_string()), args));
        }
        let bindings: Bindings = definition
            .parameters
            .iter()
            .filter_map(|parameter| match parameter {
                Expr::Symbol(symbol) => Some(symbol.clone()),
                _ => None,
            })
            .zip(args)
            .collect();
        let body = self
            .notation
            .engine()
            .substitute(definition.body, &bindings)
            .map_err(FormulaError::Substitute)?;
        self.active.push(key);
        let expanded = self.expand(&body);
        self.active.pop();
        expanded
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::FormulaConfig;

    fn notation() -> Arc<Notation> {
        Arc::new(Notation::new(FormulaConfig::default()).unwrap())
    }

    fn parsed(notation: &Arc<Notation>, markup: &str) -> Formula {
        let mut formula = Formula::new(Arc::clone(notation));
        formula.from_latex(markup).unwrap();
        formula
    }

    fn bindings(pairs: &[(&str, i64)]) -> Bindings {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), Expr::integer(*value)))
            .collect()
    }

    #[test]
    fn einstein() {
        let formula = parsed(&notation(), "E = m c^2");
        assert_eq!(formula.state(), FormulaState::Parsed);
        assert_snapshot!(formula.to_expr().unwrap(), @"(= E (* m (^ c 2)))");
        assert_snapshot!(formula.to_latex().unwrap(), @"E = m c^{2}");
        assert_eq!(formula.latex(), "E = m c^2");
    }

    #[test]
    fn kinetic_energy() {
        let mut formula = parsed(&notation(), r"KE = \frac{1}{2} m v^2");
        assert_snapshot!(formula.to_latex().unwrap(), @r"KE = \frac{m v^{2}}{2}");
        formula.subs(&bindings(&[("m", 2), ("v", 10)])).unwrap();
        assert_eq!(formula.state(), FormulaState::Modified);
        assert_snapshot!(formula.to_latex().unwrap(), @"KE = 100");
        // The stored markup is what the editor sent.
        assert_eq!(formula.latex(), r"KE = \frac{1}{2} m v^2");
    }

    #[test]
    fn empty_formula() {
        let mut formula = Formula::new(notation());
        assert!(formula.is_empty());
        assert_eq!(formula.to_expr(), Err(FormulaError::NotParsed));
        assert_eq!(formula.to_latex(), Err(FormulaError::NotParsed));
        assert_eq!(
            formula.subs(&Bindings::default()),
            Err(FormulaError::NotParsed)
        );
        assert_eq!(formula.state(), FormulaState::Empty);
    }

    #[test]
    fn failed_read_keeps_state() {
        let mut formula = parsed(&notation(), "E = m c^2");
        let err = formula.from_latex("x_{a+b}").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Build));
        assert_eq!(err.markup(), Some("x_{a+b}"));
        assert_eq!(formula.latex(), "E = m c^2");
        assert_eq!(formula.state(), FormulaState::Parsed);
        assert_snapshot!(formula.to_latex().unwrap(), @"E = m c^{2}");

        let mut empty = Formula::new(notation());
        let err = empty.from_latex("").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Parse));
        assert!(empty.is_empty());
    }

    #[test]
    fn stage_names() {
        let formula = parsed(&notation(), "y = x");
        let err = formula.evaluate(&Bindings::default()).unwrap_err();
        assert_eq!(err.stage().map(<&str>::from), Some("evaluate"));
        assert_snapshot!(err, @r#"evaluation failed: symbol "x" has no value"#);
        let mut formula = Formula::new(notation());
        let err = formula.from_latex("{x").unwrap_err();
        assert_eq!(err.stage().map(<&str>::from), Some("normalize"));
        assert_eq!(<&str>::from(FormulaState::Modified), "modified");
    }

    #[test]
    fn evaluate() {
        let formula = parsed(&notation(), r"KE = \frac{1}{2} m v^2");
        assert_eq!(formula.evaluate(&bindings(&[("m", 2), ("v", 3)])), Ok(9.0));
    }

    #[test]
    fn combine_expands_definitions() {
        let notation = notation();
        let definition = parsed(&notation, "w_{nm}(E, E_0) = E - E_0");
        let mut formula = parsed(&notation, "P = 2 w_{nm}(a, b)");
        formula.combine(&[&definition]).unwrap();
        assert_eq!(formula.state(), FormulaState::Modified);
        assert_snapshot!(formula.to_expr().unwrap(), @"(= P (* 2 (+ a (* -1 b))))");
        assert_snapshot!(formula.to_latex().unwrap(), @r"P = 2 \left(a - b\right)");
    }

    #[test]
    fn combine_is_recursive() {
        let notation = notation();
        let f = parsed(&notation, "f(x) = g(x) + 1");
        let g = parsed(&notation, "g(y) = y^2");
        let mut formula = parsed(&notation, "z = f(3)");
        formula.combine(&[&f, &g]).unwrap();
        assert_snapshot!(formula.to_latex().unwrap(), @"z = 10");
    }

    #[test]
    fn combine_keeps_cycles_and_unknown_calls() {
        let notation = notation();
        let f = parsed(&notation, "f(x) = g(x)");
        let g = parsed(&notation, "g(x) = f(x)");
        let mut formula = parsed(&notation, "y = f(a) + h(a) + g(a, b)");
        formula.combine(&[&f, &g]).unwrap();
        assert_snapshot!(formula.to_expr().unwrap(), @"(= y (+ (f a) (h a) (g a b)))");
    }
}
