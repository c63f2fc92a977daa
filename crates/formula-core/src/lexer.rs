use std::mem;
use std::str::CharIndices;

use crate::commands::get_command;
use crate::error::{DelimiterModifier, GetUnwrap, SyntaxErrKind, SyntaxError};
use crate::symbols::SymbolMap;
use crate::token::{EndToken, Span, TokSpan, Token};

/// Lexer
pub(crate) struct Lexer<'config, 'source>
where
    'config: 'source,
{
    input: CharIndices<'source>,
    peek: (usize, Option<char>),
    input_string: &'source str,
    input_length: usize,
    brace_nesting_level: usize,
    symbols: &'config SymbolMap,
    /// If `true`, unknown commands become `Token::UnknownCommand` instead of an error.
    lenient: bool,
}

impl<'config, 'source> Lexer<'config, 'source> {
    pub(crate) fn new(input: &'source str, symbols: &'config SymbolMap, lenient: bool) -> Self {
        let mut lexer = Lexer {
            input: input.char_indices(),
            peek: (0, None),
            input_string: input,
            input_length: input.len(),
            brace_nesting_level: 0,
            symbols,
            lenient,
        };
        lexer.read_char(); // Initialize `peek`.
        lexer
    }

    #[inline]
    pub(crate) fn input_length(&self) -> usize {
        self.input_length
    }

    /// One character progresses.
    fn read_char(&mut self) -> (usize, Option<char>) {
        mem::replace(
            &mut self.peek,
            self.input
                .next()
                .map(|(idx, ch)| (idx, Some(ch)))
                .unwrap_or((self.input_length, None)),
        )
    }

    /// Skip whitespace characters.
    ///
    /// Returns the span of all skipped whitespace characters, or `None` if there are no
    /// whitespace characters to skip.
    fn skip_whitespace(&mut self) -> Option<Span> {
        let start = self.peek.0;
        while self.peek.1.is_some_and(|ch| ch.is_ascii_whitespace()) {
            self.read_char();
        }
        (self.peek.0 != start).then(|| Span::new(start, self.peek.0))
    }

    /// Read one command.
    #[inline]
    fn read_command(&mut self) -> (&'source str, usize) {
        let start = self.peek.0;

        // Read in all ASCII alphabetic characters.
        while self.peek.1.is_some_and(|ch| ch.is_ascii_alphabetic()) {
            self.read_char();
        }

        if start == self.peek.0 {
            // Always read at least one character.
            self.read_char();
        }

        // To get the end of the command, we take the index of the next character.
        let end = self.peek.0;
        // SAFETY: we got `start` and `end` from `CharIndices`, so they are valid bounds.
        (self.input_string.get_unwrap(start..end), end)
    }

    /// Read a maximal run of characters matching `pred`, starting with the already consumed
    /// character at `start`.
    fn read_run(&mut self, start: usize, pred: impl Fn(char) -> bool) -> &'source str {
        while self.peek.1.is_some_and(&pred) {
            self.read_char();
        }
        // SAFETY: we got `start` and `end` from `CharIndices`, so they are valid bounds.
        self.input_string.get_unwrap(start..self.peek.0)
    }

    /// Read a decimal literal. The first digit has already been consumed.
    ///
    /// A dot belongs to the number only if it is followed by a digit.
    fn read_number(&mut self, start: usize) -> &'source str {
        self.read_run(start, |ch| ch.is_ascii_digit());
        if self.peek.1 == Some('.')
            && self
                .input_string
                .as_bytes()
                .get(self.peek.0 + 1)
                .is_some_and(u8::is_ascii_digit)
        {
            self.read_char(); // Consume the dot.
            self.read_run(start, |ch| ch.is_ascii_digit())
        } else {
            self.input_string.get_unwrap(start..self.peek.0)
        }
    }

    pub(crate) fn next_token(&mut self) -> Result<TokSpan<'source>, Box<SyntaxError>> {
        match self.next_token_internal() {
            LexerResult::Tok(tok) => Ok(tok),
            LexerResult::UnknownCommand(cmd, span) => {
                if self.lenient {
                    Ok(TokSpan::new(Token::UnknownCommand(cmd), span))
                } else {
                    Err(Box::new(SyntaxError(
                        span.into(),
                        SyntaxErrKind::UnknownCommand(cmd.into()),
                    )))
                }
            }
            LexerResult::Err(err) => Err(err),
        }
    }

    fn next_token_internal(&mut self) -> LexerResult<'source> {
        if let Some(span) = self.skip_whitespace() {
            return LexerResult::Tok(TokSpan::new(Token::Whitespace, span));
        }

        let (loc, ch) = self.read_char();
        let ascii_span = Span::new(loc, loc + 1); // An ASCII character always has length 1.
        let Some(ch) = ch else {
            return LexerResult::Tok(TokSpan::new(Token::Eoi, Span::zero_width(loc)));
        };
        let tok = match ch {
            '(' | '[' => Token::Open(ch),
            ')' | ']' => Token::Close(ch),
            '*' => Token::Times,
            '/' => Token::Divide,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '=' => Token::Equals,
            ',' => Token::Comma,
            '^' => Token::Circumflex,
            '_' => Token::Underscore,
            '{' => {
                self.brace_nesting_level += 1;
                Token::GroupBegin
            }
            '}' => {
                let Some(new_level) = self.brace_nesting_level.checked_sub(1) else {
                    return LexerResult::Err(Box::new(SyntaxError(
                        loc..(loc + 1),
                        SyntaxErrKind::UnmatchedClose(EndToken::GroupClose),
                    )));
                };
                self.brace_nesting_level = new_level;
                Token::GroupEnd
            }
            '\\' => {
                let (cmd_string, end) = self.read_command();
                return self.parse_command(Span::new(loc, end), cmd_string);
            }
            c if c.is_ascii_digit() => {
                let number = self.read_number(loc);
                return LexerResult::Tok(TokSpan::new(
                    Token::Number(number),
                    Span::new(loc, loc + number.len()),
                ));
            }
            c if c.is_ascii_alphabetic() => {
                let letters = self.read_run(loc, |ch| ch.is_ascii_alphabetic());
                return LexerResult::Tok(TokSpan::new(
                    Token::Letters(letters),
                    Span::new(loc, loc + letters.len()),
                ));
            }
            c => {
                return LexerResult::Err(Box::new(SyntaxError(
                    loc..(loc + c.len_utf8()),
                    SyntaxErrKind::DisallowedChar(c),
                )));
            }
        };
        LexerResult::Tok(TokSpan::new(tok, ascii_span))
    }

    fn parse_command(&mut self, span: Span, cmd_string: &'source str) -> LexerResult<'source> {
        let modifier = match cmd_string {
            "left" => DelimiterModifier::Left,
            "right" => DelimiterModifier::Right,
            _ => {
                return if let Some(tok) = get_command(cmd_string) {
                    LexerResult::Tok(TokSpan::new(tok, span))
                } else if let Some(name) = self.symbols.internal(cmd_string) {
                    LexerResult::Tok(TokSpan::new(Token::Symbol(name), span))
                } else {
                    LexerResult::UnknownCommand(cmd_string, span)
                };
            }
        };
        self.skip_whitespace();
        let (loc, delim) = self.read_char();
        let tok = match (modifier, delim) {
            (DelimiterModifier::Left, Some(delim @ ('(' | '[' | '.'))) => Token::Left(delim),
            (DelimiterModifier::Right, Some(delim @ (')' | ']' | '.'))) => Token::Right(delim),
            (_, delim) => {
                let len = delim.map_or(0, char::len_utf8);
                return LexerResult::Err(Box::new(SyntaxError(
                    loc..(loc + len),
                    SyntaxErrKind::ExpectedDelimiter(modifier),
                )));
            }
        };
        LexerResult::Tok(TokSpan::new(tok, Span::new(span.start(), loc + 1)))
    }
}

enum LexerResult<'source> {
    Tok(TokSpan<'source>),
    UnknownCommand(&'source str, Span),
    Err(Box<SyntaxError>),
}
