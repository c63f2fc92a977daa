//! Convert between editor LaTeX and symbolic expression trees.
//!
//! Formulas are typed in a visual math editor, which produces LaTeX like `E = m c^2`. This
//! library turns such markup into an expression tree that can be substituted into, evaluated and
//! combined with other formulas, and renders trees back into markup the editor understands.
//!
//! # Usage
//!
//! Everything starts with a [`Notation`], which holds the configuration, the symbol name map and
//! the symbolic engine. Formulas share it through an [`Arc`](std::sync::Arc):
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use formula_core::{Bindings, Expr, Formula, FormulaConfig, Notation};
//!
//! let notation = Arc::new(Notation::new(FormulaConfig::default()).unwrap());
//! let mut formula = Formula::new(Arc::clone(&notation));
//! formula.from_latex(r"KE = \frac{1}{2} m v^2").unwrap();
//! assert_eq!(formula.to_latex().unwrap(), r"KE = \frac{m v^{2}}{2}");
//!
//! let bindings: Bindings = [
//!     ("m".to_string(), Expr::integer(2)),
//!     ("v".to_string(), Expr::integer(10)),
//! ]
//! .into_iter()
//! .collect();
//! formula.subs(&bindings).unwrap();
//! assert_eq!(formula.to_latex().unwrap(), "KE = 100");
//! ```
//!
//! # Pipeline
//!
//! Markup goes through the normalizer ([`Notation::normalize`]), the parser
//! ([`Notation::parse`]) and the tree builder ([`Notation::build`]). On the way back, the engine
//! renders the tree and the result is passed through [`encapsulate`].
//!
//! # Features
//!
//! - `serde`: With this feature, `FormulaConfig` implements serde's `Deserialize` and `Serialize`.
//! - `ariadne`: Error types get a `to_report` method that returns an [`ariadne::Report`].
//!
mod builder;
mod collection;
mod commands;
mod encapsulate;
mod engine;
mod error;
mod expr;
mod formula;
mod lexer;
mod normalize;
mod number;
mod parser;
mod render;
mod symbols;
mod syntax;
mod token;
mod token_queue;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use self::collection::{CollectionError, FormulaCollection, LoadReport};
pub use self::encapsulate::encapsulate;
pub use self::engine::{Bindings, DefaultEngine, EngineError, SymbolicEngine};
pub use self::error::{
    BuildErrKind, BuildError, DelimiterModifier, EncapsulationErrKind, EncapsulationError,
    Expected, SyntaxErrKind, SyntaxError,
};
pub use self::expr::{BuiltinFunction, Expr, Function};
pub use self::formula::{Formula, FormulaError, FormulaState, Stage};
pub use self::number::{Number, Rational, Value};
pub use self::parser::MAX_NESTING;
pub use self::symbols::{SymbolMap, SymbolMapError};
pub use self::syntax::{
    Callee, IdentName, MulOp, Node, NodeKind, Sign, Subscript, SubscriptPart, SyntaxTree,
};
pub use self::token::{EndToken, Span};

/// Version of the accepted markup dialect. Changes whenever the grammar changes.
pub const GRAMMAR_VERSION: &str = "1.0";

/// Configuration of a [`Notation`].
///
/// # Example usage
///
/// ```rust
/// use formula_core::FormulaConfig;
///
/// // Default values
/// let config = FormulaConfig::default();
///
/// // An additional symbol, written `\degC` in markup and called `degC` in expression trees
/// let config = FormulaConfig {
///     symbols: vec![("degC".to_string(), r"\degC".to_string())],
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct FormulaConfig {
    /// Extra symbols; each tuple contains (internal name, display command).
    #[cfg_attr(feature = "serde", serde(with = "tuple_vec_map"))]
    pub symbols: Vec<(String, String)>,
    /// If `true`, single-character superscripts are braced in rendered markup (`x^{2}`).
    /// Single-character subscripts are never braced.
    pub brace_superscripts: bool,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            brace_superscripts: true,
        }
    }
}

/// The shared context of all formulas: symbol name map, rendering flags and symbolic engine.
///
/// A `Notation` is immutable after construction and can be shared between threads.
pub struct Notation {
    symbols: SymbolMap,
    brace_superscripts: bool,
    engine: Box<dyn SymbolicEngine>,
}

static_assertions::assert_impl_all!(Notation: Send, Sync);

impl Notation {
    /// Create a notation with the [`DefaultEngine`].
    ///
    /// This function returns an error if the configured symbols do not extend the default
    /// symbol name map to a bijection.
    pub fn new(config: FormulaConfig) -> Result<Self, SymbolMapError> {
        Self::with_engine(config, Box::new(DefaultEngine))
    }

    pub fn with_engine(
        config: FormulaConfig,
        engine: Box<dyn SymbolicEngine>,
    ) -> Result<Self, SymbolMapError> {
        let symbols = SymbolMap::new(
            config
                .symbols
                .iter()
                .map(|(name, display)| (name.as_str(), display.as_str())),
        )?;
        Ok(Self {
            symbols,
            brace_superscripts: config.brace_superscripts,
            engine,
        })
    }

    #[inline]
    pub fn symbols(&self) -> &SymbolMap {
        &self.symbols
    }

    #[inline]
    pub fn engine(&self) -> &dyn SymbolicEngine {
        self.engine.as_ref()
    }

    /// Make implicit multiplication explicit and replace alias commands.
    ///
    /// ```rust
    /// use formula_core::{FormulaConfig, Notation};
    ///
    /// let notation = Notation::new(FormulaConfig::default()).unwrap();
    /// assert_eq!(notation.normalize("E = m c^2").unwrap(), r"E = m \cdot c^2");
    /// ```
    pub fn normalize(&self, raw: &str) -> Result<String, Box<SyntaxError>> {
        normalize::normalize(raw, &self.symbols)
    }

    /// Parse normalized markup into a concrete parse tree.
    pub fn parse<'a>(&'a self, text: &'a str) -> Result<SyntaxTree<'a>, Box<SyntaxError>> {
        parser::parse(text, &self.symbols)
    }

    /// Build the expression tree of a parse tree.
    pub fn build(&self, tree: &SyntaxTree) -> Result<Expr, BuildError> {
        builder::build_formula(tree.root())
    }

    /// [`encapsulate`] with the configured treatment of superscripts.
    pub fn encapsulate(&self, text: &str) -> Result<String, EncapsulationError> {
        encapsulate::encapsulate(text, self.brace_superscripts)
    }

    /// Run the whole input pipeline on raw markup and return the expression tree.
    pub fn latex_symbol(&self, markup: &str) -> Result<Expr, FormulaError> {
        let normalized = self
            .normalize(markup)
            .map_err(|error| FormulaError::Normalize {
                markup: markup.to_string(),
                error,
            })?;
        tracing::debug!(raw = markup, normalized = %normalized, "normalized markup");
        let built = self
            .parse(&normalized)
            .map(|tree| self.build(&tree));
        match built {
            Ok(Ok(expr)) => Ok(expr),
            Ok(Err(error)) => Err(FormulaError::Build {
                markup: normalized,
                error,
            }),
            Err(error) => Err(FormulaError::Parse {
                markup: normalized,
                error,
            }),
        }
    }

    /// Render an expression tree as canonical markup.
    pub fn render(&self, expr: &Expr) -> Result<String, FormulaError> {
        let rendered = self
            .engine
            .render(expr, &self.symbols)
            .map_err(FormulaError::Render)?;
        self.encapsulate(&rendered)
            .map_err(FormulaError::Encapsulate)
    }
}

impl fmt::Debug for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notation")
            .field("symbols", &self.symbols.len())
            .field("brace_superscripts", &self.brace_superscripts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn canon(notation: &Notation, markup: &str) -> String {
        match notation
            .latex_symbol(markup)
            .and_then(|expr| notation.render(&expr))
        {
            Ok(out) => out,
            Err(err) => format!("{} error: {err}", err.stage().map_or("", <&str>::from)),
        }
    }

    #[test]
    fn pipeline() {
        let notation = Notation::new(FormulaConfig::default()).unwrap();
        assert_snapshot!(canon(&notation, "E = m c^2"), @"E = m c^{2}");
        assert_snapshot!(canon(&notation, "w_{nm}(E, E_0)"), @r"w_{nm}{\left(E,E_{0} \right)}");
        assert_snapshot!(canon(&notation, r"2\alpha_1 x_{\beta}"), @r"2 \alpha_{1} x_{\beta}");
        assert_snapshot!(canon(&notation, r"x_{a+b}"), @"build error: 4: Subscripts may only contain letters, digits and Greek letters.");
        assert_snapshot!(canon(&notation, r"x^{"), @r#"normalize error: 2: Expected token "}", but not found."#);
    }

    #[test]
    fn superscripts_can_stay_bare() {
        let config = FormulaConfig {
            brace_superscripts: false,
            ..Default::default()
        };
        let notation = Notation::new(config).unwrap();
        assert_snapshot!(canon(&notation, "E = m c^2"), @"E = m c^2");
    }

    #[test]
    fn configured_symbols() {
        let config = FormulaConfig {
            symbols: vec![("degC".to_string(), r"\degC".to_string())],
            ..Default::default()
        };
        let notation = Notation::new(config).unwrap();
        assert_snapshot!(canon(&notation, r"T = 20\degC"), @r"T = 20 \degC");
        let bad = FormulaConfig {
            symbols: vec![("frac".to_string(), r"\frac".to_string())],
            ..Default::default()
        };
        assert_eq!(
            Notation::new(bad).map(|_| ()),
            Err(SymbolMapError::InvalidDisplay(r"\frac".to_string()))
        );
    }
}
