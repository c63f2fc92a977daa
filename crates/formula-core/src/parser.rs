use crate::error::{Expected, SyntaxErrKind, SyntaxError};
use crate::lexer::Lexer;
use crate::symbols::SymbolMap;
use crate::syntax::{
    Callee, IdentName, MulOp, Node, NodeKind, Sign, Subscript, SubscriptPart, SyntaxTree,
};
use crate::token::{EndToken, Span, TokSpan, Token};
use crate::token_queue::TokenQueue;

/// Maximum depth of nested groups, signs and function arguments.
pub const MAX_NESTING: usize = 64;

pub(crate) fn parse<'source>(
    text: &'source str,
    symbols: &'source SymbolMap,
) -> Result<SyntaxTree<'source>, Box<SyntaxError>> {
    let lexer = Lexer::new(text, symbols, false);
    let mut parser = Parser {
        tokens: TokenQueue::new(lexer)?,
        depth: 0,
    };
    let root = parser.parse_formula()?;
    Ok(SyntaxTree { root, source: text })
}

struct Parser<'config, 'source> {
    tokens: TokenQueue<'config, 'source>,
    depth: usize,
}

type ParseResult<T> = Result<T, Box<SyntaxError>>;

impl<'source> Parser<'_, 'source> {
    fn parse_formula(&mut self) -> ParseResult<Node<'source>> {
        if matches!(self.tokens.peek().token(), Token::Eoi) {
            let span = self.tokens.peek().span();
            return Err(Box::new(SyntaxError(span.into(), SyntaxErrKind::EmptyInput)));
        }
        let lhs = self.parse_expr()?;
        let root = if matches!(self.tokens.peek().token(), Token::Equals) {
            self.tokens.next()?;
            let rhs = self.parse_expr()?;
            relation(lhs, rhs)
        } else {
            lhs
        };
        let next = self.tokens.peek();
        if matches!(next.token(), Token::Eoi) {
            Ok(root)
        } else {
            let expected = if matches!(root.kind, NodeKind::Relation { .. }) {
                Expected::OPERATOR | Expected::EOI
            } else {
                Expected::OPERATOR | Expected::RELATION | Expected::EOI
            };
            Err(unexpected(next, expected))
        }
    }

    /// Parse an expression, an equation or a comma-separated list. Used inside delimiters,
    /// where the tree builder decides what is allowed.
    fn parse_sequence(&mut self) -> ParseResult<Node<'source>> {
        let first = self.parse_relation()?;
        if !matches!(self.tokens.peek().token(), Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while matches!(self.tokens.peek().token(), Token::Comma) {
            self.tokens.next()?;
            items.push(self.parse_relation()?);
        }
        Ok(list_node(items, NodeKind::Tuple))
    }

    fn parse_relation(&mut self) -> ParseResult<Node<'source>> {
        let lhs = self.parse_expr()?;
        if matches!(self.tokens.peek().token(), Token::Equals) {
            self.tokens.next()?;
            let rhs = self.parse_expr()?;
            Ok(relation(lhs, rhs))
        } else {
            Ok(lhs)
        }
    }

    fn parse_expr(&mut self) -> ParseResult<Node<'source>> {
        let first = self.parse_term()?;
        let mut terms = Vec::new();
        loop {
            let sign = match self.tokens.peek().token() {
                Token::Plus => Sign::Plus,
                Token::Minus => Sign::Minus,
                _ => break,
            };
            self.tokens.next()?;
            terms.push((sign, self.parse_term()?));
        }
        if terms.is_empty() {
            return Ok(first);
        }
        terms.insert(0, (Sign::Plus, first));
        let span = terms[0].1.span.to(terms[terms.len() - 1].1.span);
        Ok(Node {
            span,
            kind: NodeKind::Sum(terms),
        })
    }

    fn parse_term(&mut self) -> ParseResult<Node<'source>> {
        let first = self.parse_unary()?;
        let mut factors = Vec::new();
        loop {
            let op = match self.tokens.peek().token() {
                Token::Times => MulOp::Times,
                Token::Divide => MulOp::Divide,
                _ => break,
            };
            self.tokens.next()?;
            factors.push((op, self.parse_unary()?));
        }
        if factors.is_empty() {
            return Ok(first);
        }
        factors.insert(0, (MulOp::Times, first));
        let span = factors[0].1.span.to(factors[factors.len() - 1].1.span);
        Ok(Node {
            span,
            kind: NodeKind::Product(factors),
        })
    }

    fn parse_unary(&mut self) -> ParseResult<Node<'source>> {
        let sign = match self.tokens.peek().token() {
            Token::Plus => Sign::Plus,
            Token::Minus => Sign::Minus,
            _ => return self.parse_postfix(),
        };
        let start = self.tokens.next()?.span();
        let operand = self.nested(start, Self::parse_unary)?;
        Ok(Node {
            span: start.to(operand.span),
            kind: NodeKind::Unary {
                sign,
                operand: Box::new(operand),
            },
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Node<'source>> {
        let base = self.parse_primary()?;
        let mut subscript = None;
        let mut superscript = None;
        let has_subscript = matches!(
            base.kind,
            NodeKind::Identifier {
                subscript: Some(_),
                ..
            }
        );
        loop {
            let marker = *self.tokens.peek();
            match marker.token() {
                Token::Underscore => {
                    if has_subscript || subscript.is_some() {
                        return Err(Box::new(SyntaxError(
                            marker.span().into(),
                            SyntaxErrKind::DuplicateSubOrSup,
                        )));
                    }
                    self.tokens.next()?;
                    self.check_bound_after_bound()?;
                    subscript = Some(self.parse_subscript()?);
                }
                Token::Circumflex => {
                    if superscript.is_some() {
                        return Err(Box::new(SyntaxError(
                            marker.span().into(),
                            SyntaxErrKind::DuplicateSubOrSup,
                        )));
                    }
                    self.tokens.next()?;
                    self.check_bound_after_bound()?;
                    superscript = Some(Box::new(self.parse_superscript()?));
                }
                _ => break,
            }
        }
        if subscript.is_none() && superscript.is_none() {
            return Ok(base);
        }
        let mut span = base.span;
        if let Some(sub) = &subscript {
            span = span.to(sub.span);
        }
        if let Some(sup) = &superscript {
            span = span.to(sup.span);
        }
        Ok(Node {
            span,
            kind: NodeKind::Scripts {
                base: Box::new(base),
                subscript,
                superscript,
            },
        })
    }

    fn check_bound_after_bound(&self) -> ParseResult<()> {
        let next = self.tokens.peek();
        if matches!(next.token(), Token::Underscore | Token::Circumflex) {
            Err(Box::new(SyntaxError(
                next.span().into(),
                SyntaxErrKind::BoundFollowedByBound,
            )))
        } else {
            Ok(())
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Node<'source>> {
        let tokloc = *self.tokens.peek();
        let (tok, span) = tokloc.into_parts();
        match tok {
            Token::Number(text) => {
                self.tokens.next()?;
                Ok(Node {
                    span,
                    kind: NodeKind::Number(text),
                })
            }
            Token::Letters(letters) => {
                self.tokens.next()?;
                self.parse_identifier(IdentName::Letters(letters), span)
            }
            Token::Symbol(name) => {
                self.tokens.next()?;
                self.parse_identifier(IdentName::Symbol(name), span)
            }
            Token::Style => {
                self.tokens.next()?;
                let (letters, end) = self.parse_braced_letters()?;
                self.parse_identifier(IdentName::Styled(letters), Span::new(span.start(), end))
            }
            Token::Function(function) => {
                self.tokens.next()?;
                let power = if matches!(self.tokens.peek().token(), Token::Circumflex) {
                    self.tokens.next()?;
                    self.check_bound_after_bound()?;
                    Some(Box::new(self.parse_superscript()?))
                } else {
                    None
                };
                let (args, end) = if self.call_follows()? {
                    self.parse_call_args()?
                } else {
                    let arg = self.nested(span, Self::parse_postfix)?;
                    let end = arg.span.end();
                    (vec![arg], end)
                };
                Ok(Node {
                    span: Span::new(span.start(), end),
                    kind: NodeKind::Call {
                        callee: Callee::Builtin { function, power },
                        args,
                    },
                })
            }
            Token::OperatorName => {
                self.tokens.next()?;
                let (name, _) = self.parse_braced_letters()?;
                let subscript = if matches!(self.tokens.peek().token(), Token::Underscore) {
                    self.tokens.next()?;
                    self.check_bound_after_bound()?;
                    Some(self.parse_subscript()?)
                } else {
                    None
                };
                if !self.call_follows()? {
                    return Err(unexpected(self.tokens.peek(), Expected::CALL));
                }
                let (args, end) = self.parse_call_args()?;
                Ok(Node {
                    span: Span::new(span.start(), end),
                    kind: NodeKind::Call {
                        callee: Callee::OperatorName { name, subscript },
                        args,
                    },
                })
            }
            Token::Frac => {
                self.tokens.next()?;
                let numerator = self.parse_argument()?;
                let denominator = self.parse_argument()?;
                Ok(Node {
                    span: span.to(denominator.span),
                    kind: NodeKind::Frac {
                        numerator: Box::new(numerator),
                        denominator: Box::new(denominator),
                    },
                })
            }
            Token::Sqrt => {
                self.tokens.next()?;
                let index = if matches!(self.tokens.peek().token(), Token::Open('[')) {
                    let open = self.tokens.next()?.span();
                    let index = self.nested(open, Self::parse_relation)?;
                    self.expect_close(EndToken::SquareBracketClose, '[', open)?;
                    Some(Box::new(index))
                } else {
                    None
                };
                let radicand = self.parse_argument()?;
                Ok(Node {
                    span: span.to(radicand.span),
                    kind: NodeKind::Sqrt {
                        index,
                        radicand: Box::new(radicand),
                    },
                })
            }
            Token::Open(open) => {
                self.tokens.next()?;
                let inner = self.nested(span, Self::parse_sequence)?;
                let end_token = if open == '(' {
                    EndToken::Paren
                } else {
                    EndToken::SquareBracketClose
                };
                let end = self.expect_close(end_token, open, span)?;
                Ok(group(inner, Span::new(span.start(), end)))
            }
            Token::Left(open) => {
                self.tokens.next()?;
                let inner = self.nested(span, Self::parse_sequence)?;
                let end = self.expect_close(EndToken::Right, open, span)?;
                Ok(group(inner, Span::new(span.start(), end)))
            }
            Token::GroupBegin => {
                self.tokens.next()?;
                let inner = self.nested(span, Self::parse_sequence)?;
                let end = self.expect_close(EndToken::GroupClose, '{', span)?;
                Ok(group(inner, Span::new(span.start(), end)))
            }
            _ => Err(unexpected(&tokloc, Expected::OPERAND)),
        }
    }

    /// Optional subscript and argument list after an identifier name.
    fn parse_identifier(
        &mut self,
        name: IdentName<'source>,
        span: Span,
    ) -> ParseResult<Node<'source>> {
        let subscript = if matches!(self.tokens.peek().token(), Token::Underscore) {
            self.tokens.next()?;
            self.check_bound_after_bound()?;
            Some(self.parse_subscript()?)
        } else {
            None
        };
        let ident_span = match &subscript {
            Some(sub) => span.to(sub.span),
            None => span,
        };
        let ident = Node {
            span: ident_span,
            kind: NodeKind::Identifier { name, subscript },
        };
        if !(self.tokens.is_adjacent() && self.call_follows()?) {
            return Ok(ident);
        }
        let (args, end) = self.parse_call_args()?;
        Ok(Node {
            span: Span::new(ident_span.start(), end),
            kind: NodeKind::Call {
                callee: Callee::Named(Box::new(ident)),
                args,
            },
        })
    }

    /// `{letters}` after `\operatorname` or a style command.
    fn parse_braced_letters(&mut self) -> ParseResult<(&'source str, usize)> {
        let open = self.tokens.next()?;
        if !matches!(open.token(), Token::GroupBegin) {
            return Err(unexpected(&open, Expected::GROUP_BEGIN));
        }
        let letters = self.tokens.next()?;
        let Token::Letters(text) = *letters.token() else {
            return Err(unexpected(&letters, Expected::LETTERS));
        };
        let end = self.expect_close(EndToken::GroupClose, '{', open.span())?;
        Ok((text, end))
    }

    /// Returns `true` if the next tokens are `(`, `\left(`, or `{` followed by one of those.
    fn call_follows(&mut self) -> ParseResult<bool> {
        let next = *self.tokens.peek().token();
        Ok(next.opens_call()
            || (matches!(next, Token::GroupBegin)
                && self.tokens.peek_second()?.token().opens_call()))
    }

    /// Parse `(args)`, `\left(args\right)` or `{` one of those `}`.
    ///
    /// Returns the arguments and the end of the argument list.
    fn parse_call_args(&mut self) -> ParseResult<(Vec<Node<'source>>, usize)> {
        let open = self.tokens.next()?;
        let (end_token, open_char) = match open.token() {
            Token::GroupBegin => {
                let (args, _) = self.nested(open.span(), Self::parse_call_args)?;
                let end = self.expect_close(EndToken::GroupClose, '{', open.span())?;
                return Ok((args, end));
            }
            Token::Open('(') => (EndToken::Paren, '('),
            Token::Left('(') => (EndToken::Right, '('),
            _ => return Err(unexpected(&open, Expected::CALL)),
        };
        let mut args = Vec::new();
        if !end_token.matches(self.tokens.peek().token()) {
            args.push(self.nested(open.span(), Self::parse_relation)?);
            while matches!(self.tokens.peek().token(), Token::Comma) {
                self.tokens.next()?;
                args.push(self.nested(open.span(), Self::parse_relation)?);
            }
        }
        let end = self.expect_close(end_token, open_char, open.span())?;
        Ok((args, end))
    }

    /// The argument of `\frac` or `\sqrt`: a group or a single character or symbol.
    fn parse_argument(&mut self) -> ParseResult<Node<'source>> {
        let tokloc = *self.tokens.peek();
        match tokloc.token() {
            Token::GroupBegin => {
                let open = self.tokens.next()?.span();
                let inner = self.nested(open, Self::parse_sequence)?;
                let end = self.expect_close(EndToken::GroupClose, '{', open)?;
                Ok(group(inner, Span::new(open.start(), end)))
            }
            Token::Letters(_) | Token::Number(_) | Token::Symbol(_) => self.parse_single(),
            _ => Err(unexpected(
                &tokloc,
                Expected::GROUP_BEGIN | Expected::LETTERS | Expected::NUMBER,
            )),
        }
    }

    /// A single letter, digit or symbol command.
    fn parse_single(&mut self) -> ParseResult<Node<'source>> {
        let (tok, span) = self.tokens.next_char()?.into_parts();
        let kind = match tok {
            Token::Number(text) => NodeKind::Number(text),
            Token::Letters(text) => NodeKind::Identifier {
                name: IdentName::Letters(text),
                subscript: None,
            },
            Token::Symbol(name) => NodeKind::Identifier {
                name: IdentName::Symbol(name),
                subscript: None,
            },
            _ => {
                return Err(unexpected(
                    &TokSpan::new(tok, span),
                    Expected::LETTERS | Expected::NUMBER,
                ));
            }
        };
        Ok(Node { span, kind })
    }

    fn parse_superscript(&mut self) -> ParseResult<Node<'source>> {
        let tokloc = *self.tokens.peek();
        match tokloc.token() {
            Token::GroupBegin => {
                let open = self.tokens.next()?.span();
                let inner = self.nested(open, Self::parse_relation)?;
                let end = self.expect_close(EndToken::GroupClose, '{', open)?;
                Ok(group(inner, Span::new(open.start(), end)))
            }
            Token::Letters(_) | Token::Number(_) | Token::Symbol(_) => self.parse_single(),
            _ => Err(unexpected(
                &tokloc,
                Expected::GROUP_BEGIN | Expected::LETTERS | Expected::NUMBER,
            )),
        }
    }

    /// A subscript is kept as a list of name parts; anything else inside is marked invalid
    /// and rejected by the tree builder.
    fn parse_subscript(&mut self) -> ParseResult<Subscript<'source>> {
        let tokloc = *self.tokens.peek();
        match tokloc.token() {
            Token::GroupBegin => {}
            Token::Letters(_) | Token::Number(_) | Token::Symbol(_) => {
                let (tok, span) = self.tokens.next_char()?.into_parts();
                let part = match tok {
                    Token::Symbol(name) => SubscriptPart::Symbol(name),
                    Token::Letters(text) | Token::Number(text) => SubscriptPart::Text(text),
                    _ => SubscriptPart::Invalid,
                };
                return Ok(Subscript {
                    span,
                    parts: vec![(span, part)],
                });
            }
            _ => {
                return Err(unexpected(
                    &tokloc,
                    Expected::GROUP_BEGIN | Expected::LETTERS | Expected::NUMBER,
                ));
            }
        }
        let open = self.tokens.next()?.span();
        let mut parts = Vec::new();
        let mut nesting_level = 0usize;
        let end = loop {
            let (tok, span) = self.tokens.next()?.into_parts();
            let part = match tok {
                Token::Letters(text) | Token::Number(text) => SubscriptPart::Text(text),
                Token::Symbol(name) => SubscriptPart::Symbol(name),
                Token::Comma => SubscriptPart::Separator,
                Token::Style => {
                    let (letters, end) = self.parse_braced_letters()?;
                    parts.push((Span::new(span.start(), end), SubscriptPart::Text(letters)));
                    continue;
                }
                Token::GroupBegin => {
                    nesting_level += 1;
                    SubscriptPart::Invalid
                }
                Token::GroupEnd => {
                    let Some(new_level) = nesting_level.checked_sub(1) else {
                        break span.end();
                    };
                    nesting_level = new_level;
                    SubscriptPart::Invalid
                }
                Token::Eoi => {
                    return Err(Box::new(SyntaxError(
                        open.into(),
                        SyntaxErrKind::UnclosedGroup(EndToken::GroupClose),
                    )));
                }
                _ => SubscriptPart::Invalid,
            };
            parts.push((span, part));
        };
        Ok(Subscript {
            span: Span::new(open.start(), end),
            parts,
        })
    }

    /// Consume the token that closes a group opened by `open_char` at `open`.
    ///
    /// Returns the end of the closing token.
    fn expect_close(
        &mut self,
        end_token: EndToken,
        open_char: char,
        open: Span,
    ) -> ParseResult<usize> {
        let tokloc = *self.tokens.peek();
        let tok = tokloc.token();
        if end_token.matches(tok) {
            if let (Token::Right(close), EndToken::Right) = (tok, end_token) {
                let matching = matches!(
                    (open_char, close),
                    ('(', ')') | ('[', ']') | ('.', _) | (_, '.')
                );
                if !matching {
                    return Err(Box::new(SyntaxError(
                        tokloc.span().into(),
                        SyntaxErrKind::MismatchedDelimiter {
                            open: open_char,
                            close: *close,
                        },
                    )));
                }
            }
            self.tokens.next()?;
            return Ok(tokloc.span().end());
        }
        match tok {
            Token::Eoi => Err(Box::new(SyntaxError(
                open.into(),
                SyntaxErrKind::UnclosedGroup(end_token),
            ))),
            Token::Close(close) | Token::Right(close) => Err(Box::new(SyntaxError(
                tokloc.span().into(),
                SyntaxErrKind::MismatchedDelimiter {
                    open: open_char,
                    close: *close,
                },
            ))),
            Token::GroupEnd => Err(Box::new(SyntaxError(
                tokloc.span().into(),
                SyntaxErrKind::MismatchedDelimiter {
                    open: open_char,
                    close: '}',
                },
            ))),
            _ => Err(unexpected(
                &tokloc,
                Expected::OPERATOR | Expected::COMMA | Expected::CLOSE,
            )),
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, at: Span, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
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

fn unexpected(tokloc: &TokSpan, expected: Expected) -> Box<SyntaxError> {
    Box::new(SyntaxError(
        tokloc.span().into(),
        SyntaxErrKind::UnexpectedToken {
            got: tokloc.token().into(),
            expected,
        },
    ))
}

fn relation<'source>(lhs: Node<'source>, rhs: Node<'source>) -> Node<'source> {
    Node {
        span: lhs.span.to(rhs.span),
        kind: NodeKind::Relation {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    }
}

fn group(inner: Node<'_>, span: Span) -> Node<'_> {
    Node {
        span,
        kind: NodeKind::Group(Box::new(inner)),
    }
}

fn list_node<'source>(
    items: Vec<Node<'source>>,
    make: impl FnOnce(Vec<Node<'source>>) -> NodeKind<'source>,
) -> Node<'source> {
    let span = match (items.first(), items.last()) {
        (Some(first), Some(last)) => first.span.to(last.span),
        _ => Span::default(),
    };
    Node {
        span,
        kind: make(items),
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn tree(problem: &str) -> String {
        let symbols = SymbolMap::default();
        match parse(problem, &symbols) {
            Ok(tree) => tree.root().to_string(),
            Err(err) => format!("Error at {}..{}: {}", err.0.start, err.0.end, err.1.string()),
        }
    }

    #[test]
    fn equation_with_powers() {
        assert_snapshot!(tree(r"E = m \cdot c^2"), @"(= E (product *m *(scripts c ^2)))");
    }

    #[test]
    fn identifiers_take_their_subscript() {
        assert_snapshot!(tree(r"E_0 + x_{\alpha} + r_{sum,j}"), @"(sum +E_0 +x_[alpha] +r_sum,j)");
        assert_snapshot!(tree(r"x_1^2"), @"(scripts x_1 ^2)");
        assert_snapshot!(tree(r"x^2_1"), @"(scripts x _1 ^2)");
    }

    #[test]
    fn calls_need_adjacency() {
        assert_snapshot!(tree(r"w_{nm}(E, E_0)"), @"(call w_nm E E_0)");
        assert_snapshot!(tree(r"w_{nm}{\left(E,E_{0} \right)}"), @"(call w_nm E E_0)");
        assert_snapshot!(
            tree(r"f (x)"),
            @r#"Error at 2..3: Expected an operator, "=" or end of input, but got an opening delimiter."#
        );
    }

    #[test]
    fn builtin_functions() {
        assert_snapshot!(tree(r"\sin x + \cos^2{\left(y \right)}"), @r"(sum +(call \sin x) +(call \cos^2 y))");
        assert_snapshot!(tree(r"\operatorname{foo}_a(x, y)"), @"(call op:foo_a x y)");
        assert_snapshot!(tree(r"\sqrt[3]{x}"), @"(sqrt[3] (group x))");
    }

    #[test]
    fn unbraced_arguments_take_one_character() {
        assert_snapshot!(tree(r"\frac12"), @"(frac 1 2)");
        assert_snapshot!(tree(r"x^23"), @r#"Error at 3..4: Expected an operator, "=" or end of input, but got a number."#);
    }

    #[test]
    fn signs_and_groups() {
        assert_snapshot!(tree(r"-a - (b + c) / 2"), @"(sum +(- a) -(product *(group (sum +b +c)) /2))");
        assert_snapshot!(tree(r"(a, b)"), @"(group (tuple a b))");
    }

    #[test]
    fn errors() {
        assert_snapshot!(tree(""), @"Error at 0..0: The formula is empty.");
        assert_snapshot!(tree("x_1_2"), @"Error at 3..4: Duplicate subscript or superscript.");
        assert_snapshot!(tree("x^_2"), @"Error at 2..3: '^' or '_' directly followed by '^' or '_'.");
        assert_snapshot!(tree("(x]"), @"Error at 2..3: Delimiter '(' is closed by ']'.");
        assert_snapshot!(tree(r"\left(x"), @r#"Error at 0..6: Expected token "\right", but not found."#);
        assert_snapshot!(tree(r"\foo"), @r#"Error at 0..4: Unknown command "\foo"."#);
        assert_snapshot!(tree("a = b = c"), @r#"Error at 6..7: Expected an operator or end of input, but got "="."#);
    }

    #[test]
    fn nesting_is_limited() {
        let deep = "(".repeat(MAX_NESTING + 1) + &")".repeat(MAX_NESTING + 1);
        assert_snapshot!(tree(&deep), @"Error at 64..65: Hard limit exceeded. Please simplify your formula.");
        let ok = "(".repeat(MAX_NESTING) + "x" + &")".repeat(MAX_NESTING);
        assert!(parse(&ok, &SymbolMap::default()).is_ok());
    }
}
