//! LaTeX output of the default engine.
//!
//! The output follows the conventions of SymPy's `latex()` printer, which is what the math editor
//! is used to receiving: products are juxtaposed, quotients become `\frac`, function arguments are
//! wrapped in `{\left(...\right)}`. Scripts are not braced consistently here; that is left to the
//! encapsulator.

use crate::engine::EngineError;
use crate::expr::{BuiltinFunction, Expr, Function};
use crate::number::{Number, Rational, Value};
use crate::symbols::SymbolMap;

pub(crate) struct LatexEmitter<'config> {
    s: String,
    symbols: &'config SymbolMap,
}

type EmitResult = Result<(), EngineError>;

impl<'config> LatexEmitter<'config> {
    #[inline]
    pub(crate) fn new(symbols: &'config SymbolMap) -> Self {
        Self {
            s: String::new(),
            symbols,
        }
    }

    #[inline]
    pub(crate) fn into_inner(self) -> String {
        self.s
    }

    pub(crate) fn emit(&mut self, expr: &Expr) -> EmitResult {
        match expr {
            Expr::Symbol(name) => {
                self.emit_name(name);
                Ok(())
            }
            Expr::Number(n) => self.emit_number(n),
            Expr::Add(terms) => self.emit_sum(terms),
            Expr::Mul(factors) => self.emit_product(factors),
            Expr::Pow(base, exp) => {
                if exp.as_number().is_some_and(Number::is_negative) {
                    // A lone reciprocal is a quotient.
                    self.emit_product(std::slice::from_ref(expr))
                } else {
                    self.emit_power(base, exp)
                }
            }
            Expr::Call(function, args) => self.emit_call(function, None, args),
            Expr::Eq(lhs, rhs) => {
                self.emit(lhs)?;
                self.s.push_str(" = ");
                self.emit(rhs)
            }
        }
    }

    /// A symbol name, split into base and subscript at the first `_`.
    fn emit_name(&mut self, name: &str) {
        let (base, sub) = match name.split_once('_') {
            Some((base, sub)) => (base, Some(sub)),
            None => (name, None),
        };
        let base = self.symbols.display(base).unwrap_or(base);
        self.s.push_str(base);
        if let Some(sub) = sub {
            self.emit_subscript(sub);
        }
    }

    /// `_{...}` with the known symbol names in the subscript shown by their commands, e.g.
    /// `_{\alpha \beta 2}` for `alphabeta2`. Subscripts with any other text stay as they are.
    fn emit_subscript(&mut self, sub: &str) {
        self.s.push_str("_{");
        match subscript_pieces(self.symbols, sub) {
            Some(pieces) => {
                for (idx, piece) in pieces.into_iter().enumerate() {
                    if idx > 0 {
                        self.s.push(' ');
                    }
                    self.s.push_str(self.symbols.display(piece).unwrap_or(piece));
                }
            }
            None => self.s.push_str(sub),
        }
        self.s.push('}');
    }

    fn emit_number(&mut self, n: &Number) -> EmitResult {
        match (n.text(), n.value()) {
            (_, Value::Float(x)) if !x.is_finite() => return Err(EngineError::NonFinite),
            (Some(text), _) => self.s.push_str(&text),
            (None, Value::Exact(r)) => {
                if r.is_negative() {
                    self.s.push_str("- ");
                }
                self.s.push_str("\\frac{");
                self.s.push_str(&r.numer().unsigned_abs().to_string());
                self.s.push_str("}{");
                self.s.push_str(&r.denom().to_string());
                self.s.push('}');
            }
            // Floats always have decimal text.
            (None, Value::Float(_)) => return Err(EngineError::NonFinite),
        }
        Ok(())
    }

    fn emit_sum(&mut self, terms: &[Expr]) -> EmitResult {
        for (idx, term) in terms.iter().enumerate() {
            let negative = is_negative_term(term);
            if idx > 0 {
                self.s.push_str(if negative { " - " } else { " + " });
            }
            if negative && idx > 0 {
                let positive = term.clone().negate();
                if matches!(positive, Expr::Add(_)) {
                    self.emit_wrapped(&positive)?;
                } else {
                    self.emit(&positive)?;
                }
            } else if matches!(term, Expr::Eq(..)) {
                self.emit_wrapped(term)?;
            } else {
                self.emit(term)?;
            }
        }
        Ok(())
    }

    fn emit_product(&mut self, factors: &[Expr]) -> EmitResult {
        let mut numerator: Vec<Expr> = Vec::new();
        let mut denominator: Vec<Expr> = Vec::new();
        let mut negative = false;
        for (idx, factor) in factors.iter().enumerate() {
            match factor {
                Expr::Number(n) if idx == 0 && n.is_negative() => {
                    negative = true;
                    let abs = n.neg();
                    if !abs.is_one() {
                        split_number(abs, &mut numerator, &mut denominator);
                    }
                }
                Expr::Number(n) if n.is_one() => {}
                Expr::Number(n) if !n.is_negative() => {
                    split_number(n.clone(), &mut numerator, &mut denominator);
                }
                Expr::Pow(base, exp) if exp.as_number().is_some_and(Number::is_negative) => {
                    let exp = exp.as_ref().clone().negate();
                    if exp.as_number().is_some_and(Number::is_one) {
                        denominator.push(base.as_ref().clone());
                    } else {
                        denominator.push(Expr::pow(base.as_ref().clone(), exp));
                    }
                }
                other => numerator.push(other.clone()),
            }
        }
        if negative {
            self.s.push_str("- ");
        }
        if denominator.is_empty() {
            if numerator.is_empty() {
                self.s.push('1');
                return Ok(());
            }
            // A sign in front of a lone sum applies to all of its terms.
            if negative && let [sum @ Expr::Add(_)] = numerator.as_slice() {
                return self.emit_wrapped(sum);
            }
            return self.emit_factors(&numerator);
        }
        self.s.push_str("\\frac{");
        if numerator.is_empty() {
            self.s.push('1');
        } else {
            self.emit_factors(&numerator)?;
        }
        self.s.push_str("}{");
        self.emit_factors(&denominator)?;
        self.s.push('}');
        Ok(())
    }

    /// Juxtaposed factors. Sums are parenthesized if there is more than one factor.
    fn emit_factors(&mut self, factors: &[Expr]) -> EmitResult {
        let single = factors.len() == 1;
        for (idx, factor) in factors.iter().enumerate() {
            let sep = self.s.len();
            if idx > 0 {
                self.s.push(' ');
            }
            let start = self.s.len();
            let wrap = match factor {
                Expr::Add(_) | Expr::Mul(_) | Expr::Eq(..) => !single,
                Expr::Number(n) => idx > 0 && n.is_negative(),
                _ => false,
            };
            if wrap {
                self.emit_wrapped(factor)?;
            } else {
                self.emit(factor)?;
            }
            if idx > 0 && self.s[start..].starts_with(|c: char| c.is_ascii_digit()) {
                self.s.replace_range(sep..start, " \\cdot ");
            }
        }
        Ok(())
    }

    fn emit_power(&mut self, base: &Expr, exp: &Expr) -> EmitResult {
        if let Some(n) = root_index(exp) {
            self.s.push_str("\\sqrt");
            if n != 2 {
                self.s.push('[');
                self.s.push_str(&n.to_string());
                self.s.push(']');
            }
            self.s.push('{');
            self.emit(base)?;
            self.s.push('}');
            return Ok(());
        }
        if let Expr::Call(function @ Function::Builtin(f), args) = base
            && *f != BuiltinFunction::Sqrt
        {
            return self.emit_call(function, Some(exp), args);
        }
        let wrap = match base {
            Expr::Symbol(_) => false,
            Expr::Number(n) => n.is_negative() || n.text().is_none(),
            _ => true,
        };
        if wrap {
            self.emit_wrapped(base)?;
        } else {
            self.emit(base)?;
        }
        self.emit_exponent(exp)
    }

    /// `^` followed by the exponent. A single character is left bare.
    fn emit_exponent(&mut self, exp: &Expr) -> EmitResult {
        self.s.push('^');
        let start = self.s.len();
        self.emit(exp)?;
        let rendered = &self.s[start..];
        let bare = rendered.len() == 1 && rendered.bytes().all(|b| b.is_ascii_alphanumeric());
        if !bare {
            self.s.insert(start, '{');
            self.s.push('}');
        }
        Ok(())
    }

    fn emit_call(&mut self, function: &Function, power: Option<&Expr>, args: &[Expr]) -> EmitResult {
        match function {
            Function::Builtin(BuiltinFunction::Sqrt) if power.is_none() && args.len() == 1 => {
                self.s.push_str("\\sqrt{");
                self.emit(&args[0])?;
                self.s.push('}');
                return Ok(());
            }
            Function::Builtin(f) => {
                self.s.push('\\');
                self.s.push_str(f.name());
            }
            Function::Undefined(name) => {
                let base = name.split_once('_').map_or(name.as_str(), |(base, _)| base);
                if base.len() > 1 && self.symbols.display(base).is_none() {
                    self.s.push_str("\\operatorname{");
                    self.s.push_str(base);
                    self.s.push('}');
                    if let Some((_, sub)) = name.split_once('_') {
                        self.emit_subscript(sub);
                    }
                } else {
                    self.emit_name(name);
                }
            }
        }
        if let Some(power) = power {
            self.emit_exponent(power)?;
        }
        self.s.push_str("{\\left(");
        for (idx, arg) in args.iter().enumerate() {
            if idx > 0 {
                self.s.push(',');
            }
            self.emit(arg)?;
        }
        self.s.push_str(" \\right)}");
        Ok(())
    }

    fn emit_wrapped(&mut self, expr: &Expr) -> EmitResult {
        self.s.push_str("\\left(");
        self.emit(expr)?;
        self.s.push_str("\\right)");
        Ok(())
    }
}

/// Computed fractions go into numerator and denominator separately.
fn split_number(n: Number, numerator: &mut Vec<Expr>, denominator: &mut Vec<Expr>) {
    match n.value() {
        Value::Exact(r) if n.text().is_none() => {
            if r.numer() != 1 {
                numerator.push(Expr::value(Value::Exact(Rational::integer(r.numer()))));
            }
            denominator.push(Expr::value(Value::Exact(Rational::integer(r.denom()))));
        }
        _ => numerator.push(Expr::Number(n)),
    }
}

/// Split a subscript into known symbol names and runs of digits, preferring longer names.
fn subscript_pieces<'a>(symbols: &SymbolMap, sub: &'a str) -> Option<Vec<&'a str>> {
    let len = sub.len();
    // ends[i] is where the first piece of a complete split of `sub[i..]` ends.
    let mut ends: Vec<Option<usize>> = vec![None; len];
    for start in (0..len).rev() {
        let completes = |end: usize| end == len || ends[end].is_some();
        let digits = sub.as_bytes()[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let end = if digits > 0 {
            Some(start + digits).filter(|&end| completes(end))
        } else {
            (start + 1..=len).rev().find(|&end| {
                completes(end)
                    && sub
                        .get(start..end)
                        .is_some_and(|piece| symbols.display(piece).is_some())
            })
        };
        ends[start] = end;
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < len {
        let end = ends[start]?;
        pieces.push(sub.get(start..end)?);
        start = end;
    }
    (!pieces.is_empty()).then_some(pieces)
}

/// `n` if the exponent is the exact fraction `1/n`.
fn root_index(exp: &Expr) -> Option<i128> {
    match exp.as_number()?.value() {
        Value::Exact(r) if r.numer() == 1 && r.denom() > 1 => Some(r.denom()),
        _ => None,
    }
}

fn is_negative_term(term: &Expr) -> bool {
    match term {
        Expr::Number(n) => n.is_negative(),
        Expr::Mul(factors) => factors
            .first()
            .and_then(Expr::as_number)
            .is_some_and(Number::is_negative),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::engine::fold;

    fn render(expr: Expr) -> String {
        let symbols = SymbolMap::default();
        let mut emitter = LatexEmitter::new(&symbols);
        match emitter.emit(&fold(expr)) {
            Ok(()) => emitter.into_inner(),
            Err(err) => format!("Error: {err}"),
        }
    }

    fn sym(name: &str) -> Expr {
        Expr::symbol(name)
    }

    fn int(n: i64) -> Expr {
        Expr::integer(n)
    }

    #[test]
    fn products_and_quotients() {
        let e = Expr::eq(sym("E"), Expr::mul([sym("m"), Expr::pow(sym("c"), int(2))]));
        assert_snapshot!(render(e), @"E = m c^2");
        let ke = Expr::mul([
            int(1),
            Expr::pow(int(2), Expr::minus_one()),
            sym("m"),
            Expr::pow(sym("v"), int(2)),
        ]);
        assert_snapshot!(render(ke), @r"\frac{m v^2}{2}");
        assert_snapshot!(render(Expr::pow(sym("x"), Expr::minus_one())), @r"\frac{1}{x}");
        assert_snapshot!(render(Expr::mul([int(2), int(3)])), @"6");
        let two_x_three = Expr::Mul(vec![int(2), Expr::pow(int(3), sym("x"))]);
        assert_snapshot!(render(two_x_three), @r"2 \cdot 3^x");
    }

    #[test]
    fn sums_and_signs() {
        let e = Expr::add([sym("a"), sym("b").negate(), int(2).negate()]);
        assert_snapshot!(render(e), @"a - b - 2");
        let e = Expr::mul([
            Expr::add([sym("a"), sym("b")]),
            Expr::add([sym("a"), sym("b").negate()]),
        ]);
        assert_snapshot!(render(e), @r"\left(a + b\right) \left(a - b\right)");
        assert_snapshot!(render(sym("x").negate()), @"- x");
    }

    #[test]
    fn negated_sums_keep_their_parentheses() {
        let (a, b, c) = (sym("a"), sym("b"), sym("c"));
        let e = Expr::add([a.clone(), Expr::add([b.clone(), c.clone()]).negate()]);
        assert_snapshot!(render(e), @r"a - \left(b + c\right)");
        let e = Expr::add([a.clone(), b.clone()]).negate();
        assert_snapshot!(render(e), @r"- \left(a + b\right)");
        let e = Expr::mul([int(-2), Expr::add([a, b])]);
        assert_snapshot!(render(e), @r"- 2 \left(a + b\right)");
    }

    #[test]
    fn names_and_greek_letters() {
        let e = Expr::add([sym("E_0"), sym("x_alpha"), sym("beta"), sym("KE")]);
        assert_snapshot!(render(e), @r"E_{0} + x_{\alpha} + \beta + KE");
    }

    #[test]
    fn greek_letters_inside_subscripts() {
        assert_snapshot!(render(sym("x_alphabeta")), @r"x_{\alpha \beta}");
        assert_snapshot!(render(sym("x_beta2")), @r"x_{\beta 2}");
        assert_snapshot!(render(sym("r_12")), @"r_{12}");
        // Only subscripts made up entirely of known names are resolved.
        assert_snapshot!(render(sym("v_maxi")), @"v_{maxi}");
        assert_snapshot!(render(sym("x_betaa")), @"x_{betaa}");
        let f = Expr::Call(Function::Undefined("foo_alphabeta".into()), vec![sym("x")]);
        assert_snapshot!(render(f), @r"\operatorname{foo}_{\alpha \beta}{\left(x \right)}");
    }

    #[test]
    fn calls_and_roots() {
        let w = Expr::Call(
            Function::Undefined("w_nm".into()),
            vec![sym("E"), sym("E_0")],
        );
        assert_snapshot!(render(w), @r"w_{nm}{\left(E,E_{0} \right)}");
        let foo = Expr::Call(Function::Undefined("foo_a".into()), vec![sym("x")]);
        assert_snapshot!(render(foo), @r"\operatorname{foo}_{a}{\left(x \right)}");
        let sin2 = Expr::pow(
            Expr::Call(Function::Builtin(BuiltinFunction::Sin), vec![sym("x")]),
            int(2),
        );
        assert_snapshot!(render(sin2), @r"\sin^2{\left(x \right)}");
        let half = Expr::value(Value::Exact(Rational::new(1, 2).unwrap()));
        let third = Expr::value(Value::Exact(Rational::new(1, 3).unwrap()));
        let roots = Expr::add([Expr::pow(sym("x"), half), Expr::pow(sym("y"), third)]);
        assert_snapshot!(render(roots), @r"\sqrt{x} + \sqrt[3]{y}");
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        assert_snapshot!(render(Expr::from(f64::INFINITY)), @"Error: the result is not a finite number");
    }
}
