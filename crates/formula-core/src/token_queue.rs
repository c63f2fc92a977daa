use std::collections::VecDeque;

use crate::{
    error::{SyntaxErrKind, SyntaxError},
    lexer::Lexer,
    token::{EndToken, Span, TokSpan, Token},
};

/// A token queue that allows peeking at the next two non-whitespace tokens.
///
/// Whitespace is dropped, but the span of every token is kept, so [`TokenQueue::is_adjacent`]
/// can tell whether the next token directly follows the previous one.
pub(crate) struct TokenQueue<'config, 'source> {
    lexer: Lexer<'config, 'source>,
    queue: VecDeque<TokSpan<'source>>,
    lexer_is_eoi: bool,
    eoi: TokSpan<'source>,
    /// End of the last token returned by `next`.
    prev_end: usize,
}

impl<'config, 'source> TokenQueue<'config, 'source> {
    pub(crate) fn new(lexer: Lexer<'config, 'source>) -> Result<Self, Box<SyntaxError>> {
        let eoi = TokSpan::new(Token::Eoi, Span::zero_width(lexer.input_length()));
        let mut tq = TokenQueue {
            lexer,
            queue: VecDeque::with_capacity(2),
            lexer_is_eoi: false,
            eoi,
            prev_end: 0,
        };
        // Ensure that we have at least one token in the buffer for peeking.
        tq.load_token()?;
        Ok(tq)
    }

    /// Load the next non-whitespace token from the lexer into the buffer.
    ///
    /// The end-of-input token is never buffered; it is kept in `self.eoi` instead.
    fn load_token(&mut self) -> Result<(), Box<SyntaxError>> {
        while !self.lexer_is_eoi {
            let tok = self.lexer.next_token()?;
            match tok.token() {
                Token::Whitespace => {}
                Token::Eoi => {
                    self.eoi = tok;
                    self.lexer_is_eoi = true;
                }
                _ => {
                    self.queue.push_back(tok);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Peek at the next non-whitespace token without consuming it.
    #[inline]
    pub(crate) fn peek(&self) -> &TokSpan<'source> {
        self.queue.front().unwrap_or(&self.eoi)
    }

    pub(crate) fn peek_second(&mut self) -> Result<&TokSpan<'source>, Box<SyntaxError>> {
        if self.queue.len() < 2 {
            self.load_token()?;
        }
        Ok(self.queue.get(1).unwrap_or(&self.eoi))
    }

    /// Get the next non-whitespace token.
    ///
    /// This method also ensures that there is always a peekable token after this one.
    pub(crate) fn next(&mut self) -> Result<TokSpan<'source>, Box<SyntaxError>> {
        let ret = self.queue.pop_front().unwrap_or(self.eoi);
        if self.queue.is_empty() {
            self.load_token()?;
        }
        self.prev_end = ret.span().end();
        Ok(ret)
    }

    /// Get the next token, but if it is a run of several letters or digits, only take its first
    /// character and leave the rest in the queue.
    ///
    /// This implements the TeX rule that an unbraced argument is a single character, so that
    /// `x^23` has the exponent `2` and `\frac12` is one half.
    pub(crate) fn next_char(&mut self) -> Result<TokSpan<'source>, Box<SyntaxError>> {
        let (tok, span) = self.next()?.into_parts();
        let (Token::Letters(run) | Token::Number(run)) = tok else {
            return Ok(TokSpan::new(tok, span));
        };
        if run.len() < 2 {
            return Ok(TokSpan::new(tok, span));
        }
        // Runs are ASCII, so splitting after one byte is a char boundary.
        let (head, tail) = run.split_at(1);
        let head_span = span.with_length(1);
        let tail_span = Span::new(head_span.end(), span.end());
        let (head, tail) = match tok {
            Token::Letters(_) => (Token::Letters(head), Token::Letters(tail)),
            _ if tail.starts_with('.') => {
                return Err(Box::new(SyntaxError(
                    tail_span.start()..tail_span.start() + 1,
                    SyntaxErrKind::DisallowedChar('.'),
                )));
            }
            _ => (Token::Number(head), Token::Number(tail)),
        };
        self.queue.push_front(TokSpan::new(tail, tail_span));
        self.prev_end = head_span.end();
        Ok(TokSpan::new(head, head_span))
    }

    /// Returns `true` if the next token starts exactly where the previous one ended.
    #[inline]
    pub(crate) fn is_adjacent(&self) -> bool {
        self.peek().span().start() == self.prev_end
    }

    /// Skip a group of tokens, ending with (an unopened) `}`.
    ///
    /// The initial `{` must have already been consumed. Returns the end of the closing `}`.
    pub(crate) fn skip_group(&mut self) -> Result<usize, Box<SyntaxError>> {
        let mut nesting_level = 0usize;
        loop {
            let tokloc = self.next()?;
            match tokloc.token() {
                Token::GroupBegin => {
                    nesting_level += 1;
                }
                Token::GroupEnd => {
                    // If the nesting level reaches one below where we started, we
                    // stop reading.
                    let Some(new_level) = nesting_level.checked_sub(1) else {
                        break Ok(tokloc.span().end());
                    };
                    nesting_level = new_level;
                }
                Token::Eoi => {
                    break Err(Box::new(SyntaxError(
                        tokloc.span().into(),
                        SyntaxErrKind::UnclosedGroup(EndToken::GroupClose),
                    )));
                }
                _ => {}
            }
        }
    }
}
