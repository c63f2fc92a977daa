//! Bracing of scripts in rendered markup.

use memchr::{memchr2, memchr3};

use crate::error::{EncapsulationErrKind, EncapsulationError, GetUnwrap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Subscript,
    Superscript,
    Other,
}

/// Brace the arguments of `_` and `^` so that the editor reads them as intended.
///
/// * A single alphanumeric character after `_` is left alone; after `^` it is braced if
///   `brace_superscripts` is set.
/// * A run of several alphanumeric characters is braced: `x_nm` becomes `x_{nm}`.
/// * Alphanumeric characters directly after a braced subscript are moved into it:
///   `x_{n}m` becomes `x_{nm}`. If several subscripts close at that point, the innermost one
///   receives them.
///
/// Command names, including escaped characters like `\_`, are copied unchanged, as is
/// everything else. Applying the function to its own output does not change it.
pub fn encapsulate(input: &str, brace_superscripts: bool) -> Result<String, EncapsulationError> {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len() + 8);
    let mut groups: Vec<(Group, usize)> = Vec::new();
    let mut specials = Specials::new(bytes);
    let mut pos = 0;
    // Number of subscript groups whose `}` ends the output, innermost first.
    let mut closed_subscripts = 0;

    while let Some(at) = specials.next_from(pos) {
        // Copy everything before the special character.
        if at > pos {
            out.push_str(input.get_unwrap(pos..at));
            closed_subscripts = 0;
        }
        pos = at + 1;
        match bytes[at] {
            b'\\' => {
                let end = command_end(input, pos);
                out.push_str(input.get_unwrap(at..end));
                pos = end;
                closed_subscripts = 0;
            }
            b'{' => {
                groups.push((Group::Other, at));
                out.push('{');
                closed_subscripts = 0;
            }
            b'}' => {
                let Some((group, _)) = groups.pop() else {
                    return Err(EncapsulationError(at, EncapsulationErrKind::UnmatchedClose));
                };
                if group != Group::Subscript {
                    out.push('}');
                    closed_subscripts = 0;
                    continue;
                }
                let run = alphanumeric_run(bytes, pos);
                let mut nested_subscript = false;
                if run > 0 {
                    // The characters go into the innermost subscript ending here.
                    let insert_at = out.len() - closed_subscripts;
                    let text = input.get_unwrap(pos..pos + run);
                    let head = out.get_unwrap(0..insert_at);
                    let tail = head
                        .bytes()
                        .rev()
                        .take_while(u8::is_ascii_alphanumeric)
                        .count();
                    let argument_start = insert_at - tail;
                    let after_command = ends_with_command_word(head);
                    match trailing_marker(out.get_unwrap(0..argument_start)) {
                        // They extend the bare argument of a script marker, which then follows
                        // the bracing rule again.
                        Some(marker)
                            if tail + run > 1 || (marker == b'^' && brace_superscripts) =>
                        {
                            out.insert(insert_at, '}');
                            out.insert_str(insert_at, text);
                            out.insert(argument_start, '{');
                            nested_subscript = marker == b'_';
                        }
                        Some(_) => out.insert_str(insert_at, text),
                        None => {
                            out.insert_str(insert_at, text);
                            if after_command {
                                out.insert(insert_at, ' ');
                            }
                        }
                    }
                    pos += run;
                }
                out.push('}');
                closed_subscripts += 1 + usize::from(nested_subscript);
            }
            marker => {
                // `_` or `^`
                out.push(char::from(marker));
                closed_subscripts = 0;
                if bytes.get(pos) == Some(&b'{') {
                    let group = if marker == b'_' {
                        Group::Subscript
                    } else {
                        Group::Superscript
                    };
                    groups.push((group, pos));
                    out.push('{');
                    pos += 1;
                    continue;
                }
                let run = alphanumeric_run(bytes, pos);
                let argument = input.get_unwrap(pos..pos + run);
                let bare = run == 0 || (run == 1 && (marker == b'_' || !brace_superscripts));
                if bare {
                    out.push_str(argument);
                } else {
                    out.push('{');
                    out.push_str(argument);
                    out.push('}');
                    if marker == b'_' {
                        closed_subscripts = 1;
                    }
                }
                pos += run;
            }
        }
    }

    // Copy any remaining bytes after the last special character.
    out.push_str(input.get_unwrap(pos..input.len()));
    match groups.last() {
        Some((_, at)) => Err(EncapsulationError(*at, EncapsulationErrKind::UnclosedGroup)),
        None => Ok(out),
    }
}

/// Finds the special characters with `memchr`, remembering the next hit of each class so
/// that the input is scanned only once.
struct Specials<'a> {
    bytes: &'a [u8],
    /// Next `_`, `^` or `\`.
    script: Option<usize>,
    /// Next `{` or `}`.
    brace: Option<usize>,
}

impl<'a> Specials<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Specials {
            bytes,
            script: memchr3(b'_', b'^', b'\\', bytes),
            brace: memchr2(b'{', b'}', bytes),
        }
    }

    fn next_from(&mut self, pos: usize) -> Option<usize> {
        let rest = self.bytes.get(pos..).unwrap_or_default();
        if self.script.is_some_and(|at| at < pos) {
            self.script = memchr3(b'_', b'^', b'\\', rest).map(|i| i + pos);
        }
        if self.brace.is_some_and(|at| at < pos) {
            self.brace = memchr2(b'{', b'}', rest).map(|i| i + pos);
        }
        match (self.script, self.brace) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// End of a command whose backslash ends right before `start`: a run of letters, or a single
/// character.
fn command_end(input: &str, start: usize) -> usize {
    let letters = input
        .get(start..)
        .unwrap_or_default()
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .count();
    if letters > 0 {
        return start + letters;
    }
    start
        + input
            .get(start..)
            .and_then(|rest| rest.chars().next())
            .map_or(0, char::len_utf8)
}

#[inline]
fn alphanumeric_run(bytes: &[u8], start: usize) -> usize {
    bytes
        .get(start..)
        .unwrap_or_default()
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count()
}

/// The script marker that `out` ends with, unless it is escaped like `\_`.
fn trailing_marker(out: &str) -> Option<u8> {
    let (&last, rest) = out.as_bytes().split_last()?;
    if last != b'_' && last != b'^' {
        return None;
    }
    let backslashes = rest.iter().rev().take_while(|&&b| b == b'\\').count();
    (backslashes % 2 == 0).then_some(last)
}

/// Returns `true` if `out` ends with a command name like `\alpha`, which must be separated from
/// following letters.
fn ends_with_command_word(out: &str) -> bool {
    let trimmed = out.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    trimmed.len() < out.len() && trimmed.ends_with('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(input: &str) -> String {
        match encapsulate(input, true) {
            Ok(out) => out,
            Err(err) => format!("Error: {err}"),
        }
    }

    #[test]
    fn single_characters() {
        assert_eq!(enc("x_1 + x^2"), "x_1 + x^{2}");
        assert_eq!(encapsulate("x^2", false).unwrap(), "x^2");
    }

    #[test]
    fn runs_are_braced() {
        assert_eq!(enc("x_nm + 2^10"), "x_{nm} + 2^{10}");
        assert_eq!(enc(r"E = m c^2"), r"E = m c^{2}");
    }

    #[test]
    fn trailing_characters_are_merged_into_subscripts() {
        assert_eq!(enc("x_{n}m"), "x_{nm}");
        assert_eq!(enc(r"x_{\alpha}m"), r"x_{\alpha m}");
        assert_eq!(enc("x^{n}m"), "x^{n}m");
    }

    #[test]
    fn merging_targets_the_innermost_subscript() {
        assert_eq!(enc("y_{x_ab}c"), "y_{x_{abc}}");
        assert_eq!(enc("y_{x_{a}}b"), "y_{x_{ab}}");
        assert_eq!(enc("y_{x_{a}b}c"), "y_{x_{abc}}");
        assert_eq!(enc("y_{x^{a}}b"), "y_{x^{a}b}");
        assert_eq!(enc("y_{x_}ab"), "y_{x_{ab}}");
        assert_eq!(enc("y_{x_}a"), "y_{x_a}");
        assert_eq!(enc("y_{x_a}b"), "y_{x_{ab}}");
        assert_eq!(enc(r"y_{x\_}ab"), r"y_{x\_ab}");
    }

    #[test]
    fn commands_and_other_groups_are_copied() {
        let rendered = r"w_{nm}{\left(E,E_{0} \right)} + \frac{m v^{2}}{2} + a\_b + \sin^{2}{\left(x \right)}";
        assert_eq!(enc(rendered), rendered);
        assert_eq!(enc(r"\operatorname{foo}_{a}"), r"\operatorname{foo}_{a}");
    }

    #[test]
    fn idempotent() {
        for input in ["x_nm^ab", r"x_{\beta}1 + y^z", "a_{b}c_{d}e", "p_1q_r", "y_{x_ab}c", "z_{y_{x_}ab}c", "y_{x_a}b"] {
            let once = enc(input);
            assert_eq!(enc(&once), once, "{input}");
        }
    }

    #[test]
    fn unbalanced_braces() {
        assert_eq!(enc("x_{n"), "Error: 2: cannot encapsulate scripts, unclosed \"{\"");
        assert_eq!(enc("x}"), "Error: 1: cannot encapsulate scripts, unmatched \"}\"");
    }
}
