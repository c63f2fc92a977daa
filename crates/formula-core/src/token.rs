use std::ops::Range;

use strum_macros::IntoStaticStr;

use crate::expr::BuiltinFunction;

#[derive(Debug, Clone, Copy, PartialEq, IntoStaticStr)]
pub enum Token<'source> {
    /// End of input.
    #[strum(serialize = "end of input")]
    Eoi,
    /// A whitespace character, e.g. ` `.
    #[strum(serialize = "whitespace")]
    Whitespace,
    /// A decimal literal like `3` or `3.14`.
    #[strum(serialize = "a number")]
    Number(&'source str),
    /// A maximal run of ASCII letters, e.g. `x` or `KE`. One identifier.
    #[strum(serialize = "letters")]
    Letters(&'source str),
    /// A command from the symbol name map, e.g. `\alpha`. Holds the internal name.
    #[strum(serialize = "a symbol")]
    Symbol(&'source str),
    /// A built-in function command like `\sin` or `\exp`.
    #[strum(serialize = "a function")]
    Function(BuiltinFunction),
    /// `\operatorname`
    #[strum(serialize = r"\operatorname")]
    OperatorName,
    /// `\mathit`, `\mathrm` and `\text`; wrap a multi-letter name.
    #[strum(serialize = "a style command")]
    Style,
    /// `\frac`, `\dfrac` and `\tfrac`.
    #[strum(serialize = r"\frac")]
    Frac,
    /// `\sqrt` and `\sqrt[n]{...}`
    #[strum(serialize = r"\sqrt")]
    Sqrt,
    /// `\left` together with its delimiter, e.g. `\left(`.
    #[strum(serialize = r"\left")]
    Left(char),
    /// `\right` together with its delimiter, e.g. `\right)`.
    #[strum(serialize = r"\right")]
    Right(char),
    /// `(` or `[`.
    #[strum(serialize = "an opening delimiter")]
    Open(char),
    /// `)` or `]`.
    #[strum(serialize = "a closing delimiter")]
    Close(char),
    /// The character `{`.
    #[strum(serialize = "\"{\"")]
    GroupBegin,
    /// The character `}`.
    #[strum(serialize = "\"}\"")]
    GroupEnd,
    /// The character `_` for subscripts.
    #[strum(serialize = "\"_\"")]
    Underscore,
    /// The character `^` for superscripts.
    #[strum(serialize = "\"^\"")]
    Circumflex,
    #[strum(serialize = "\"+\"")]
    Plus,
    #[strum(serialize = "\"-\"")]
    Minus,
    /// `*`, `\cdot` and `\times`.
    #[strum(serialize = "a multiplication sign")]
    Times,
    /// `/` and `\div`.
    #[strum(serialize = "a division sign")]
    Divide,
    #[strum(serialize = "\"=\"")]
    Equals,
    #[strum(serialize = "\",\"")]
    Comma,
    /// A command that is neither built in nor a display command of the symbol map.
    ///
    /// Only produced when the lexer is lenient about unknown commands.
    #[strum(serialize = "an unknown command")]
    UnknownCommand(&'source str),
}

impl Token<'_> {
    /// Returns `true` if this token may begin an operand.
    pub(crate) fn starts_operand(&self) -> bool {
        matches!(
            self,
            Token::Number(_)
                | Token::Letters(_)
                | Token::Symbol(_)
                | Token::Function(_)
                | Token::OperatorName
                | Token::Style
                | Token::Frac
                | Token::Sqrt
                | Token::Left(_)
                | Token::Open(_)
                | Token::GroupBegin
                | Token::UnknownCommand(_)
        )
    }

    /// Returns `true` for `(` and `\left(`, the tokens that open an argument list.
    pub(crate) fn opens_call(&self) -> bool {
        matches!(self, Token::Open('(') | Token::Left('('))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    #[inline]
    pub const fn zero_width(at: usize) -> Self {
        Span { start: at, end: at }
    }

    #[inline]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Returns a new `Span` with the same start position as `self`, but with the end position set
    /// to `self.start + length`.
    #[inline]
    pub const fn with_length(self, length: usize) -> Self {
        Span {
            start: self.start,
            end: self.start + length,
        }
    }

    /// The smallest span covering both `self` and `other`.
    #[inline]
    pub fn to(self, other: Span) -> Self {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<Span> for Range<usize> {
    #[inline]
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// A token together with its span in the input string.
#[derive(Debug, Clone, Copy)]
pub struct TokSpan<'source>(Token<'source>, Span);

impl<'source> TokSpan<'source> {
    #[inline]
    pub const fn new(token: Token<'source>, span: Span) -> Self {
        TokSpan(token, span)
    }

    #[inline]
    pub fn token(&self) -> &Token<'source> {
        &self.0
    }

    #[inline]
    pub fn into_parts(self) -> (Token<'source>, Span) {
        (self.0, self.1)
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, IntoStaticStr)]
pub enum EndToken {
    #[strum(serialize = r"}")]
    GroupClose,
    #[strum(serialize = r")")]
    Paren,
    #[strum(serialize = r"]")]
    SquareBracketClose,
    #[strum(serialize = r"\right")]
    Right,
    #[strum(serialize = r"end of input")]
    Eoi,
}

impl EndToken {
    pub fn matches(&self, other: &Token) -> bool {
        matches!(
            (self, other),
            (EndToken::GroupClose, Token::GroupEnd)
                | (EndToken::Paren, Token::Close(')'))
                | (EndToken::SquareBracketClose, Token::Close(']'))
                | (EndToken::Right, Token::Right(_))
                | (EndToken::Eoi, Token::Eoi)
        )
    }
}
