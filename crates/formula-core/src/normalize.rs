//! Rewriting of editor markup before it is parsed.
//!
//! The editor produces juxtaposed operands (`m c^2`, `2x`, `\frac{1}{2}m`) and a few commands
//! of its own (`\exponentialE`). The normalizer scans the markup once, with the same notion of
//! an operand as the parser, and records edits: an explicit `\cdot ` in front of every operand
//! that directly follows another one, and replacements for alias commands. Everything else is
//! copied from the input unchanged.

use std::borrow::Cow;

use crate::commands::get_editor_alias;
use crate::error::{GetUnwrap, SyntaxErrKind, SyntaxError};
use crate::lexer::Lexer;
use crate::parser::MAX_NESTING;
use crate::symbols::SymbolMap;
use crate::token::{EndToken, Span, TokSpan, Token};
use crate::token_queue::TokenQueue;

type NormResult<T> = Result<T, Box<SyntaxError>>;

pub(crate) fn normalize(raw: &str, symbols: &SymbolMap) -> NormResult<String> {
    let lexer = Lexer::new(raw, symbols, true);
    let mut normalizer = Normalizer {
        tokens: TokenQueue::new(lexer)?,
        symbols,
        edits: Vec::new(),
        depth: 0,
    };
    normalizer.sequence()?;
    let end = *normalizer.tokens.peek();
    let unmatched = match end.token() {
        Token::Eoi => return Ok(apply(raw, &normalizer.edits)),
        Token::Close(']') => EndToken::SquareBracketClose,
        Token::Close(_) => EndToken::Paren,
        Token::Right(_) => EndToken::Right,
        _ => EndToken::GroupClose,
    };
    Err(Box::new(SyntaxError(
        end.span().into(),
        SyntaxErrKind::UnmatchedClose(unmatched),
    )))
}

/// Replace the byte range of the span with the text. Insertions have an empty span.
type Edit = (Span, Cow<'static, str>);

fn apply(raw: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(raw.len() + 6 * edits.len());
    let mut pos = 0;
    for (span, text) in edits {
        out.push_str(raw.get_unwrap(pos..span.start()));
        out.push_str(text);
        pos = span.end();
    }
    out.push_str(raw.get_unwrap(pos..raw.len()));
    out
}

struct Normalizer<'config, 'source> {
    tokens: TokenQueue<'config, 'source>,
    symbols: &'config SymbolMap,
    /// Sorted by position, because the input is scanned from left to right.
    edits: Vec<Edit>,
    depth: usize,
}

impl Normalizer<'_, '_> {
    /// A sequence of operands and operators, up to but excluding the token that ends it.
    fn sequence(&mut self) -> NormResult<()> {
        let mut after_operand = false;
        loop {
            let tokloc = *self.tokens.peek();
            match tokloc.token() {
                Token::Eoi | Token::GroupEnd | Token::Close(_) | Token::Right(_) => {
                    return Ok(());
                }
                tok if tok.starts_operand() => {
                    if after_operand {
                        let at = tokloc.span().start();
                        self.edits
                            .push((Span::zero_width(at), Cow::Borrowed(r"\cdot ")));
                    }
                    self.operand()?;
                    after_operand = true;
                }
                _ => {
                    self.tokens.next()?;
                    after_operand = false;
                }
            }
        }
    }

    /// One operand, including its scripts and, for functions, its argument.
    fn operand(&mut self) -> NormResult<()> {
        let tokloc = self.tokens.next()?;
        let (tok, span) = tokloc.into_parts();
        match tok {
            Token::Letters(_) | Token::Symbol(_) => self.identifier_tail()?,
            Token::UnknownCommand(command) => {
                self.resolve_alias(command, span);
                self.identifier_tail()?;
            }
            Token::Style => {
                self.opaque_group()?;
                self.identifier_tail()?;
            }
            Token::Function(_) => {
                if matches!(self.tokens.peek().token(), Token::Circumflex) {
                    self.tokens.next()?;
                    self.argument()?;
                }
                if self.call_follows()? {
                    self.call()?;
                } else if self.tokens.peek().token().starts_operand() {
                    self.nested(span, Self::operand)?;
                }
            }
            Token::OperatorName => {
                self.opaque_group()?;
                if matches!(self.tokens.peek().token(), Token::Underscore) {
                    self.tokens.next()?;
                    self.subscript()?;
                }
                if self.call_follows()? {
                    self.call()?;
                }
            }
            Token::Frac => {
                self.argument()?;
                self.argument()?;
            }
            Token::Sqrt => {
                if matches!(self.tokens.peek().token(), Token::Open('[')) {
                    let open = self.tokens.next()?;
                    self.group(open)?;
                }
                self.argument()?;
            }
            Token::Open(_) | Token::Left(_) | Token::GroupBegin => self.group(tokloc)?,
            _ => {}
        }
        self.scripts()
    }

    /// Subscript and argument list of an identifier name.
    fn identifier_tail(&mut self) -> NormResult<()> {
        if matches!(self.tokens.peek().token(), Token::Underscore) {
            self.tokens.next()?;
            self.subscript()?;
        }
        if self.tokens.is_adjacent() && self.call_follows()? {
            self.call()?;
        }
        Ok(())
    }

    fn scripts(&mut self) -> NormResult<()> {
        loop {
            match self.tokens.peek().token() {
                Token::Underscore => {
                    self.tokens.next()?;
                    self.subscript()?;
                }
                Token::Circumflex => {
                    self.tokens.next()?;
                    self.argument()?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Subscripts are names; nothing inside them is rewritten.
    fn subscript(&mut self) -> NormResult<()> {
        match self.tokens.peek().token() {
            Token::GroupBegin => self.opaque_group(),
            Token::Letters(_) | Token::Number(_) | Token::Symbol(_) => {
                self.tokens.next_char()?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// A superscript or an argument of `\frac` and `\sqrt`: a group, which is normalized on
    /// its own, or a single character.
    fn argument(&mut self) -> NormResult<()> {
        let tokloc = *self.tokens.peek();
        match tokloc.token() {
            Token::GroupBegin => {
                let open = self.tokens.next()?;
                self.group(open)
            }
            Token::Letters(_) | Token::Number(_) | Token::Symbol(_) => {
                self.tokens.next_char()?;
                Ok(())
            }
            Token::UnknownCommand(command) => {
                self.tokens.next()?;
                self.resolve_alias(command, tokloc.span());
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Returns `true` if the next tokens are `(`, `\left(`, or `{` followed by one of those.
    fn call_follows(&mut self) -> NormResult<bool> {
        let next = *self.tokens.peek().token();
        Ok(next.opens_call()
            || (matches!(next, Token::GroupBegin)
                && self.tokens.peek_second()?.token().opens_call()))
    }

    fn call(&mut self) -> NormResult<()> {
        let open = self.tokens.next()?;
        self.group(open)
    }

    /// The rest of a group whose opening token has been consumed, including the closing token.
    fn group(&mut self, open: TokSpan) -> NormResult<()> {
        let (open_tok, open_span) = open.into_parts();
        self.nested(open_span, Self::sequence)?;
        let close = self.tokens.next()?;
        let (open_char, end_token) = match open_tok {
            Token::Left(c) => (c, EndToken::Right),
            Token::Open('[') => ('[', EndToken::SquareBracketClose),
            Token::Open(c) => (c, EndToken::Paren),
            _ => ('{', EndToken::GroupClose),
        };
        let close_char = match close.token() {
            Token::GroupEnd if end_token == EndToken::GroupClose => return Ok(()),
            Token::Right(_) if end_token == EndToken::Right => return Ok(()),
            Token::Close(_) if matches!(open_tok, Token::Open(_)) => return Ok(()),
            Token::GroupEnd => '}',
            Token::Close(c) | Token::Right(c) => *c,
            _ => {
                return Err(Box::new(SyntaxError(
                    open_span.into(),
                    SyntaxErrKind::UnclosedGroup(end_token),
                )));
            }
        };
        Err(Box::new(SyntaxError(
            close.span().into(),
            SyntaxErrKind::MismatchedDelimiter {
                open: open_char,
                close: close_char,
            },
        )))
    }

    /// Skip a `{...}` group that is copied verbatim, like the name of `\operatorname`.
    fn opaque_group(&mut self) -> NormResult<()> {
        if matches!(self.tokens.peek().token(), Token::GroupBegin) {
            self.tokens.next()?;
            self.tokens.skip_group()?;
        }
        Ok(())
    }

    /// Rewrite editor aliases and commands that differ from a known symbol in letter case only.
    fn resolve_alias(&mut self, command: &str, span: Span) {
        let replacement = if let Some(alias) = get_editor_alias(command) {
            Cow::Borrowed(alias)
        } else if let Some(resolved) = self.symbols.resolve_case_insensitive(command) {
            Cow::Owned(format!("\\{resolved}"))
        } else {
            return;
        };
        self.edits.push((span, replacement));
    }

    fn nested<T>(&mut self, at: Span, f: impl FnOnce(&mut Self) -> NormResult<T>) -> NormResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(Box::new(SyntaxError(
                at.into(),
                SyntaxErrKind::HardLimitExceeded,
            )));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn norm(raw: &str) -> String {
        let symbols = SymbolMap::new([("degC", r"\degC")]).unwrap();
        match normalize(raw, &symbols) {
            Ok(text) => text,
            Err(err) => format!("Error at {}..{}: {}", err.0.start, err.0.end, err.1.string()),
        }
    }

    #[test]
    fn implicit_multiplication() {
        assert_snapshot!(norm("E = m c^2"), @r"E = m \cdot c^2");
        assert_snapshot!(norm(r"KE = \frac{1}{2} m v^2"), @r"KE = \frac{1}{2} \cdot m \cdot v^2");
        assert_snapshot!(norm(r"2x + x2 + x\alpha + 2\pi"), @r"2\cdot x + x\cdot 2 + x\cdot \alpha + 2\cdot \pi");
        assert_snapshot!(norm(r"(a)(b) + \left(a\right) \left(b\right)"), @r"(a)\cdot (b) + \left(a\right) \cdot \left(b\right)");
        assert_snapshot!(norm(r"\beta E_0 + \frac{1}{2}m"), @r"\beta \cdot E_0 + \frac{1}{2}\cdot m");
    }

    #[test]
    fn calls_and_function_arguments() {
        assert_snapshot!(
            norm(r"w_{nm}(E, E_0) + f (x) + \sin x + \sin(x) y"),
            @r"w_{nm}(E, E_0) + f \cdot (x) + \sin x + \sin(x) \cdot y"
        );
        assert_snapshot!(norm(r"\operatorname{foo}_a(x)z"), @r"\operatorname{foo}_a(x)\cdot z");
        assert_snapshot!(norm(r"\sin^2 x y"), @r"\sin^2 x \cdot y");
    }

    #[test]
    fn scripts() {
        assert_snapshot!(norm("x^{2y} + x_{ab c}"), @r"x^{2\cdot y} + x_{ab c}");
        assert_snapshot!(norm("x_12"), @r"x_1\cdot 2");
    }

    #[test]
    fn aliases() {
        assert_snapshot!(norm(r"2\exponentialE^{\imaginaryI x}"), @r"2\cdot e^{i \cdot x}");
        assert_snapshot!(norm(r"20\DEGc"), @r"20\cdot \degC");
        assert_snapshot!(norm(r"\ALPHA"), @r"\ALPHA");
    }

    #[test]
    fn untouched_markup_is_returned_as_is() {
        for raw in [r"a + b \cdot c", r"w_{nm}{\left(E,E_{0} \right)}", r"\frac{m}{2}", ""] {
            assert_eq!(norm(raw), raw);
        }
    }

    #[test]
    fn imbalance_is_an_error() {
        assert_snapshot!(norm("{x"), @r#"Error at 0..1: Expected token "}", but not found."#);
        assert_snapshot!(norm("x)"), @r#"Error at 1..2: Unmatched closing token: ")"."#);
        assert_snapshot!(norm(r"\left( x"), @r#"Error at 0..6: Expected token "\right", but not found."#);
        assert_snapshot!(norm(r"\left( x )"), @"Error at 9..10: Delimiter '(' is closed by ')'.");
        assert_snapshot!(norm("x}"), @r#"Error at 1..2: Unmatched closing token: "}"."#);
    }
}
