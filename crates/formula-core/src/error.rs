use std::fmt;
use std::ops::Range;

use bitflags::bitflags;
use strum_macros::IntoStaticStr;

use crate::token::EndToken;

/// Represents an error that occurred while normalizing or parsing markup.
///
/// The range is a byte range into the text that was being read. For errors raised by the
/// normalizer this is the raw input; for parser errors it is the normalized text.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError(pub Range<usize>, pub SyntaxErrKind);

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxErrKind {
    UnexpectedToken {
        got: &'static str,
        expected: Expected,
    },
    UnclosedGroup(EndToken),
    UnmatchedClose(EndToken),
    UnknownCommand(Box<str>),
    DisallowedChar(char),
    ExpectedDelimiter(DelimiterModifier),
    MismatchedDelimiter {
        open: char,
        close: char,
    },
    BoundFollowedByBound,
    DuplicateSubOrSup,
    EmptyInput,
    HardLimitExceeded,
}

bitflags! {
    /// The set of token classes the parser would have accepted at the point of an error.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Expected: u16 {
        const OPERAND = 1;
        const OPERATOR = 1 << 1;
        const RELATION = 1 << 2;
        const COMMA = 1 << 3;
        const CLOSE = 1 << 4;
        const GROUP_BEGIN = 1 << 5;
        const GROUP_END = 1 << 6;
        const LETTERS = 1 << 7;
        const NUMBER = 1 << 8;
        const CALL = 1 << 9;
        const EOI = 1 << 10;
    }
}

static EXPECTED_NAMES: [(Expected, &str); 11] = [
    (Expected::OPERAND, "an operand"),
    (Expected::OPERATOR, "an operator"),
    (Expected::RELATION, "\"=\""),
    (Expected::COMMA, "\",\""),
    (Expected::CLOSE, "a closing delimiter"),
    (Expected::GROUP_BEGIN, "\"{\""),
    (Expected::GROUP_END, "\"}\""),
    (Expected::LETTERS, "letters"),
    (Expected::NUMBER, "a number"),
    (Expected::CALL, "an argument list"),
    (Expected::EOI, "end of input"),
];

impl Expected {
    /// Human-readable list of the expected token classes, e.g. `an operand or "="`.
    pub fn describe(self) -> String {
        let names: Vec<&str> = EXPECTED_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        match names.as_slice() {
            [] => "nothing".to_string(),
            [one] => (*one).to_string(),
            [init @ .., last] => init.join(", ") + " or " + *last,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, IntoStaticStr)]
pub enum DelimiterModifier {
    #[strum(serialize = r"\left")]
    Left,
    #[strum(serialize = r"\right")]
    Right,
}

impl SyntaxErrKind {
    /// Returns the error message as a string.
    pub fn string(&self) -> String {
        match self {
            SyntaxErrKind::UnexpectedToken { got, expected } => {
                "Expected ".to_string() + &expected.describe() + ", but got " + got + "."
            }
            SyntaxErrKind::UnclosedGroup(expected) => {
                "Expected token \"".to_string() + <&str>::from(expected) + "\", but not found."
            }
            SyntaxErrKind::UnmatchedClose(got) => {
                "Unmatched closing token: \"".to_string() + <&str>::from(got) + "\"."
            }
            SyntaxErrKind::UnknownCommand(cmd) => "Unknown command \"\\".to_string() + cmd + "\".",
            SyntaxErrKind::DisallowedChar(got) => {
                let mut text = "Disallowed character: '".to_string();
                text.push(*got);
                text += "'.";
                text
            }
            SyntaxErrKind::ExpectedDelimiter(location) => {
                "There must be a parenthesis after \"".to_string()
                    + <&str>::from(*location)
                    + "\", but not found."
            }
            SyntaxErrKind::MismatchedDelimiter { open, close } => {
                let mut text = "Delimiter '".to_string();
                text.push(*open);
                text += "' is closed by '";
                text.push(*close);
                text += "'.";
                text
            }
            SyntaxErrKind::BoundFollowedByBound => {
                "'^' or '_' directly followed by '^' or '_'.".to_string()
            }
            SyntaxErrKind::DuplicateSubOrSup => "Duplicate subscript or superscript.".to_string(),
            SyntaxErrKind::EmptyInput => "The formula is empty.".to_string(),
            SyntaxErrKind::HardLimitExceeded => {
                "Hard limit exceeded. Please simplify your formula.".to_string()
            }
        }
    }

    #[cfg(feature = "ariadne")]
    fn label(&self) -> String {
        match self {
            SyntaxErrKind::UnexpectedToken { expected, .. } => {
                format!("expected {} here", expected.describe())
            }
            SyntaxErrKind::UnclosedGroup(expected) => {
                format!(
                    "expected \"{}\" to close this group",
                    <&str>::from(expected)
                )
            }
            SyntaxErrKind::UnmatchedClose(got) => format!("unmatched \"{}\"", <&str>::from(got)),
            SyntaxErrKind::UnknownCommand(_) => "unknown command".into(),
            SyntaxErrKind::DisallowedChar(_) => "disallowed character".into(),
            SyntaxErrKind::ExpectedDelimiter(modifier) => {
                format!("expected a delimiter after \"{}\"", <&str>::from(*modifier))
            }
            SyntaxErrKind::MismatchedDelimiter { .. } => "mismatched delimiter".into(),
            SyntaxErrKind::BoundFollowedByBound => "unexpected bound".into(),
            SyntaxErrKind::DuplicateSubOrSup => "duplicate".into(),
            SyntaxErrKind::EmptyInput => "empty formula".into(),
            SyntaxErrKind::HardLimitExceeded => "limit exceeded".into(),
        }
    }
}

#[cfg(feature = "ariadne")]
impl SyntaxError {
    /// Convert this error into an [`ariadne::Report`] for pretty-printing.
    pub fn to_report<'name>(
        &self,
        source_name: &'name str,
        with_color: bool,
    ) -> ariadne::Report<'static, (&'name str, Range<usize>)> {
        build_report(source_name, with_color, &self.0, self.1.string(), self.1.label())
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0.start, self.1.string())
    }
}

impl std::error::Error for SyntaxError {}

/// A concrete parse tree that the tree builder cannot translate.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildError(pub Range<usize>, pub BuildErrKind);

#[derive(Debug, Clone, PartialEq)]
pub enum BuildErrKind {
    Arity {
        function: &'static str,
        expected: usize,
        got: usize,
    },
    InvalidSubscript,
    SubscriptOnNonIdentifier,
    NestedRelation,
    ArgumentListOutsideCall,
    InvalidRootIndex,
    InvalidNumber,
}

impl BuildErrKind {
    pub fn string(&self) -> String {
        match self {
            BuildErrKind::Arity {
                function,
                expected,
                got,
            } => format!(
                "Function \"{function}\" takes {expected} argument{}, but got {got}.",
                if *expected == 1 { "" } else { "s" }
            ),
            BuildErrKind::InvalidSubscript => {
                "Subscripts may only contain letters, digits and Greek letters.".to_string()
            }
            BuildErrKind::SubscriptOnNonIdentifier => {
                "Only identifiers can carry a subscript.".to_string()
            }
            BuildErrKind::NestedRelation => {
                "\"=\" may only appear once, at the top level of a formula.".to_string()
            }
            BuildErrKind::ArgumentListOutsideCall => {
                "Comma-separated lists are only allowed as function arguments.".to_string()
            }
            BuildErrKind::InvalidRootIndex => {
                "The index of a root must be a positive integer.".to_string()
            }
            BuildErrKind::InvalidNumber => "Invalid number.".to_string(),
        }
    }

    #[cfg(feature = "ariadne")]
    fn label(&self) -> String {
        match self {
            BuildErrKind::Arity { expected, .. } => format!("expected {expected} argument(s)"),
            BuildErrKind::InvalidSubscript => "invalid subscript".into(),
            BuildErrKind::SubscriptOnNonIdentifier => "subscript not allowed here".into(),
            BuildErrKind::NestedRelation => "unexpected relation".into(),
            BuildErrKind::ArgumentListOutsideCall => "not a function call".into(),
            BuildErrKind::InvalidRootIndex => "invalid index".into(),
            BuildErrKind::InvalidNumber => "invalid number".into(),
        }
    }
}

#[cfg(feature = "ariadne")]
impl BuildError {
    /// Convert this error into an [`ariadne::Report`] for pretty-printing.
    pub fn to_report<'name>(
        &self,
        source_name: &'name str,
        with_color: bool,
    ) -> ariadne::Report<'static, (&'name str, Range<usize>)> {
        build_report(source_name, with_color, &self.0, self.1.string(), self.1.label())
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0.start, self.1.string())
    }
}

impl std::error::Error for BuildError {}

/// Unbalanced braces found while encapsulating rendered markup.
///
/// On output of the default renderer this indicates a bug, not a user error.
#[derive(Debug, Clone, PartialEq)]
pub struct EncapsulationError(pub usize, pub EncapsulationErrKind);

#[derive(Debug, Clone, Copy, PartialEq, IntoStaticStr)]
pub enum EncapsulationErrKind {
    #[strum(serialize = "unmatched \"}\"")]
    UnmatchedClose,
    #[strum(serialize = "unclosed \"{\"")]
    UnclosedGroup,
}

impl fmt::Display for EncapsulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: cannot encapsulate scripts, {}",
            self.0,
            <&str>::from(self.1)
        )
    }
}

impl std::error::Error for EncapsulationError {}

#[cfg(feature = "ariadne")]
fn build_report<'name>(
    source_name: &'name str,
    with_color: bool,
    range: &Range<usize>,
    message: String,
    label: String,
) -> ariadne::Report<'static, (&'name str, Range<usize>)> {
    use ariadne::{Label, Report, ReportKind};

    let mut config = ariadne::Config::default().with_index_type(ariadne::IndexType::Byte);
    if !with_color {
        config = config.with_color(false);
    }
    Report::build(ReportKind::Error, (source_name, range.start..range.start))
        .with_config(config)
        .with_message(message)
        .with_label(Label::new((source_name, range.clone())).with_message(label))
        .finish()
}

pub trait GetUnwrap {
    /// `str::get` with `Option::unwrap`.
    fn get_unwrap(&self, range: std::ops::Range<usize>) -> &str;
}

impl GetUnwrap for str {
    #[inline]
    fn get_unwrap(&self, range: std::ops::Range<usize>) -> &str {
        self.get(range).expect("valid range")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_set_reads_naturally() {
        assert_eq!(Expected::OPERAND.describe(), "an operand");
        assert_eq!(
            (Expected::OPERATOR | Expected::RELATION | Expected::EOI).describe(),
            "an operator, \"=\" or end of input"
        );
    }

    #[test]
    fn syntax_error_display_has_position() {
        let err = SyntaxError(4..5, SyntaxErrKind::UnmatchedClose(EndToken::GroupClose));
        assert_eq!(err.to_string(), "4: Unmatched closing token: \"}\".");
    }

    #[test]
    fn arity_message_pluralizes() {
        let one = BuildErrKind::Arity {
            function: "sin",
            expected: 1,
            got: 2,
        };
        assert_eq!(one.string(), "Function \"sin\" takes 1 argument, but got 2.");
    }
}
