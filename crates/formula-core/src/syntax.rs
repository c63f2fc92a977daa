//! The concrete parse tree produced by the parser.
//!
//! The tree stays close to the markup: groups, `\left`/`\right` pairs and explicit signs are
//! kept as nodes, and every node carries its span in the parsed text. Turning it into an
//! [`Expr`](crate::Expr) is the job of the tree builder.

use std::fmt;

use strum_macros::IntoStaticStr;

use crate::expr::BuiltinFunction;
use crate::token::Span;

/// The result of [`Notation::parse`](crate::Notation::parse).
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree<'source> {
    pub(crate) root: Node<'source>,
    pub(crate) source: &'source str,
}

impl<'source> SyntaxTree<'source> {
    #[inline]
    pub fn root(&self) -> &Node<'source> {
        &self.root
    }

    /// The text that was parsed.
    #[inline]
    pub fn source(&self) -> &'source str {
        self.source
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node<'source> {
    pub span: Span,
    pub kind: NodeKind<'source>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind<'source> {
    Number(&'source str),
    Identifier {
        name: IdentName<'source>,
        subscript: Option<Subscript<'source>>,
    },
    /// Scripts attached to something other than a bare identifier name.
    Scripts {
        base: Box<Node<'source>>,
        subscript: Option<Subscript<'source>>,
        superscript: Option<Box<Node<'source>>>,
    },
    Call {
        callee: Callee<'source>,
        args: Vec<Node<'source>>,
    },
    Frac {
        numerator: Box<Node<'source>>,
        denominator: Box<Node<'source>>,
    },
    Sqrt {
        index: Option<Box<Node<'source>>>,
        radicand: Box<Node<'source>>,
    },
    /// Anything in `(...)`, `[...]`, `{...}` or `\left...\right`.
    Group(Box<Node<'source>>),
    /// A comma-separated list outside of an argument list.
    Tuple(Vec<Node<'source>>),
    Unary {
        sign: Sign,
        operand: Box<Node<'source>>,
    },
    /// A sum of at least two terms. The sign of the first term is always `Sign::Plus`; a leading
    /// minus is a `Unary` node.
    Sum(Vec<(Sign, Node<'source>)>),
    /// A product of at least two factors. The operator of the first factor is always
    /// `MulOp::Times`.
    Product(Vec<(MulOp, Node<'source>)>),
    Relation {
        lhs: Box<Node<'source>>,
        rhs: Box<Node<'source>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdentName<'source> {
    /// A run of ASCII letters like `KE`.
    Letters(&'source str),
    /// The internal name of a symbol command, e.g. `alpha` for `\alpha`.
    Symbol(&'source str),
    /// Letters wrapped in a style command, e.g. `rear` in `\mathit{rear}`.
    Styled(&'source str),
}

impl<'source> IdentName<'source> {
    #[inline]
    pub fn as_str(&self) -> &'source str {
        match self {
            IdentName::Letters(s) | IdentName::Symbol(s) | IdentName::Styled(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscript<'source> {
    pub span: Span,
    pub parts: Vec<(Span, SubscriptPart<'source>)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubscriptPart<'source> {
    /// Letters or digits.
    Text(&'source str),
    /// The internal name of a symbol command.
    Symbol(&'source str),
    /// A comma, which does not become part of the name.
    Separator,
    /// Something that cannot be part of a name, like an operator.
    Invalid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee<'source> {
    /// `\sin`, `\sin^2`, ...
    Builtin {
        function: BuiltinFunction,
        power: Option<Box<Node<'source>>>,
    },
    /// An identifier directly followed by an argument list. Always an `Identifier` node.
    Named(Box<Node<'source>>),
    /// `\operatorname{name}`, optionally with a subscript.
    OperatorName {
        name: &'source str,
        subscript: Option<Subscript<'source>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum Sign {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum MulOp {
    #[strum(serialize = "*")]
    Times,
    #[strum(serialize = "/")]
    Divide,
}

fn write_subscript(f: &mut fmt::Formatter<'_>, subscript: &Subscript) -> fmt::Result {
    f.write_str("_")?;
    for (_, part) in &subscript.parts {
        match part {
            SubscriptPart::Text(text) => f.write_str(text)?,
            SubscriptPart::Symbol(name) => write!(f, "[{name}]")?,
            SubscriptPart::Separator => f.write_str(",")?,
            SubscriptPart::Invalid => f.write_str("?")?,
        }
    }
    Ok(())
}

/// Compact s-expression form for tests and debugging.
impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Number(text) => f.write_str(text),
            NodeKind::Identifier { name, subscript } => {
                match name {
                    IdentName::Letters(s) => f.write_str(s)?,
                    IdentName::Symbol(s) => write!(f, "[{s}]")?,
                    IdentName::Styled(s) => write!(f, "'{s}'")?,
                }
                if let Some(subscript) = subscript {
                    write_subscript(f, subscript)?;
                }
                Ok(())
            }
            NodeKind::Scripts {
                base,
                subscript,
                superscript,
            } => {
                write!(f, "(scripts {base}")?;
                if let Some(subscript) = subscript {
                    f.write_str(" ")?;
                    write_subscript(f, subscript)?;
                }
                if let Some(superscript) = superscript {
                    write!(f, " ^{superscript}")?;
                }
                f.write_str(")")
            }
            NodeKind::Call { callee, args } => {
                f.write_str("(call ")?;
                match callee {
                    Callee::Builtin { function, power } => {
                        write!(f, "\\{}", function.name())?;
                        if let Some(power) = power {
                            write!(f, "^{power}")?;
                        }
                    }
                    Callee::Named(ident) => write!(f, "{ident}")?,
                    Callee::OperatorName { name, subscript } => {
                        write!(f, "op:{name}")?;
                        if let Some(subscript) = subscript {
                            write_subscript(f, subscript)?;
                        }
                    }
                }
                for arg in args {
                    write!(f, " {arg}")?;
                }
                f.write_str(")")
            }
            NodeKind::Frac {
                numerator,
                denominator,
            } => write!(f, "(frac {numerator} {denominator})"),
            NodeKind::Sqrt { index, radicand } => match index {
                Some(index) => write!(f, "(sqrt[{index}] {radicand})"),
                None => write!(f, "(sqrt {radicand})"),
            },
            NodeKind::Group(inner) => write!(f, "(group {inner})"),
            NodeKind::Tuple(items) => {
                f.write_str("(tuple")?;
                for item in items {
                    write!(f, " {item}")?;
                }
                f.write_str(")")
            }
            NodeKind::Unary { sign, operand } => {
                write!(f, "({} {operand})", <&str>::from(*sign))
            }
            NodeKind::Sum(terms) => {
                f.write_str("(sum")?;
                for (sign, term) in terms {
                    write!(f, " {}{term}", <&str>::from(*sign))?;
                }
                f.write_str(")")
            }
            NodeKind::Product(factors) => {
                f.write_str("(product")?;
                for (op, factor) in factors {
                    write!(f, " {}{factor}", <&str>::from(*op))?;
                }
                f.write_str(")")
            }
            NodeKind::Relation { lhs, rhs } => write!(f, "(= {lhs} {rhs})"),
        }
    }
}
