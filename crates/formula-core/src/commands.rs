use crate::expr::BuiltinFunction;
use crate::token::Token;

static COMMANDS: phf::Map<&'static str, Token<'static>> = phf::phf_map! {
    "frac" => Token::Frac,
    "dfrac" => Token::Frac,
    "tfrac" => Token::Frac,
    "sqrt" => Token::Sqrt,
    "cdot" => Token::Times,
    "times" => Token::Times,
    "div" => Token::Divide,
    "operatorname" => Token::OperatorName,
    "mathit" => Token::Style,
    "mathrm" => Token::Style,
    "text" => Token::Style,
    "," => Token::Whitespace,
    ":" => Token::Whitespace,
    ";" => Token::Whitespace,
    "!" => Token::Whitespace,
    " " => Token::Whitespace,
    "quad" => Token::Whitespace,
    "qquad" => Token::Whitespace,
    "sin" => Token::Function(BuiltinFunction::Sin),
    "cos" => Token::Function(BuiltinFunction::Cos),
    "tan" => Token::Function(BuiltinFunction::Tan),
    "cot" => Token::Function(BuiltinFunction::Cot),
    "sec" => Token::Function(BuiltinFunction::Sec),
    "csc" => Token::Function(BuiltinFunction::Csc),
    "arcsin" => Token::Function(BuiltinFunction::Arcsin),
    "arccos" => Token::Function(BuiltinFunction::Arccos),
    "arctan" => Token::Function(BuiltinFunction::Arctan),
    "sinh" => Token::Function(BuiltinFunction::Sinh),
    "cosh" => Token::Function(BuiltinFunction::Cosh),
    "tanh" => Token::Function(BuiltinFunction::Tanh),
    "exp" => Token::Function(BuiltinFunction::Exp),
    "log" => Token::Function(BuiltinFunction::Log),
    "ln" => Token::Function(BuiltinFunction::Ln),
};

/// Commands the math editor emits for characters that are plain letters in formulas.
static EDITOR_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "exponentialE" => "e",
    "differentialD" => "d",
    "imaginaryI" => "i",
};

/// Look up a built-in command by its name (without the backslash).
///
/// `\left` and `\right` are not in this table because they need to read their delimiter.
#[inline]
pub(crate) fn get_command(command: &str) -> Option<Token<'static>> {
    COMMANDS.get(command).copied()
}

/// The replacement text for an editor alias like `\exponentialE`.
#[inline]
pub(crate) fn get_editor_alias(command: &str) -> Option<&'static str> {
    EDITOR_ALIASES.get(command).copied()
}

/// Returns `true` if `name` is reserved for a built-in command and therefore cannot be used as
/// the display command of a symbol.
pub(crate) fn is_reserved(name: &str) -> bool {
    COMMANDS.contains_key(name)
        || EDITOR_ALIASES.contains_key(name)
        || matches!(name, "left" | "right")
}

/// Look up a built-in function by name, as used after `\operatorname`.
pub(crate) fn builtin_function(name: &str) -> Option<BuiltinFunction> {
    match COMMANDS.get(name) {
        Some(Token::Function(f)) => Some(*f),
        _ if name == "sqrt" => Some(BuiltinFunction::Sqrt),
        _ => None,
    }
}
