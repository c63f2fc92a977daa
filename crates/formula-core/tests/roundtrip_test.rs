use std::sync::Arc;

use insta::assert_snapshot;
use proptest::prelude::*;

use formula_core::{Bindings, Expr, Formula, FormulaConfig, MAX_NESTING, Notation, encapsulate};

fn notation() -> Arc<Notation> {
    Arc::new(Notation::new(FormulaConfig::default()).unwrap())
}

fn canon(notation: &Arc<Notation>, markup: &str) -> String {
    let mut formula = Formula::new(Arc::clone(notation));
    match formula.from_latex(markup).and_then(|()| formula.to_latex()) {
        Ok(canonical) => canonical,
        Err(err) => format!("Error ({markup}): {err}"),
    }
}

#[test]
fn einstein() {
    let mut formula = Formula::new(notation());
    formula.from_latex("E = m c^2").unwrap();
    assert_snapshot!(formula.to_expr().unwrap(), @"(= E (* m (^ c 2)))");
    assert_snapshot!(formula.to_latex().unwrap(), @"E = m c^{2}");
}

#[test]
fn applied_undefined_function() {
    let notation = notation();
    assert_snapshot!(canon(&notation, "w_{nm}(E, E_0)"), @r"w_{nm}{\left(E,E_{0} \right)}");
    // The canonical form reads back as the same call.
    assert_snapshot!(
        canon(&notation, r"w_{nm}{\left(E,E_{0} \right)}"),
        @r"w_{nm}{\left(E,E_{0} \right)}"
    );
}

#[test]
fn substitution() {
    let mut formula = Formula::new(notation());
    formula.from_latex(r"KE = \frac{1}{2} m v^2").unwrap();
    let bindings: Bindings = [
        ("m".to_string(), Expr::integer(2)),
        ("v".to_string(), Expr::integer(10)),
    ]
    .into_iter()
    .collect();
    formula.subs(&bindings).unwrap();
    assert_snapshot!(formula.to_expr().unwrap().rhs(), @"100");
    assert_snapshot!(formula.to_latex().unwrap(), @"KE = 100");
}

#[test]
fn editor_markup() {
    let notation = notation();
    let cases = [
        (r"F = G \frac{m_1 m_2}{r^2}", r"F = \frac{G m_{1} m_{2}}{r^{2}}"),
        (r"y = \sin^2 x + \cos(x)^2", r"y = \sin^{2}{\left(x \right)} + \cos^{2}{\left(x \right)}"),
        (r"A = \pi r^2", r"A = \pi r^{2}"),
        (r"U_{ab} = R I", r"U_{ab} = R I"),
        (r"c = \sqrt{a^2 + b^2}", r"c = \sqrt{a^{2} + b^{2}}"),
        (r"x = 2\exponentialE^{3}", r"x = 2 e^{3}"),
        (r"z = \frac{a - b}{2}", r"z = \frac{a - b}{2}"),
        (r"E_{\alpha} = \alpha_1 x", r"E_{\alpha} = \alpha_{1} x"),
        (r"\theta = \sin^{-1} x", r"\theta = \arcsin{\left(x \right)}"),
        (r"E_{\alpha\beta} = x_{\beta 2}", r"E_{\alpha \beta} = x_{\beta 2}"),
    ];
    for (markup, expected) in cases {
        assert_eq!(canon(&notation, markup), expected, "{markup}");
    }
}

#[test]
fn canonical_markup_is_stable() {
    let notation = notation();
    let formulas = [
        "E = m c^2",
        r"KE = \frac{1}{2} m v^2",
        r"w_{nm}(E, E_0) = E - E_0",
        r"\operatorname{foo}_a(x) + \sin(x)",
        r"F = -\frac{k q_1 q_2}{r^2}",
        r"y = \sqrt[3]{x} + 2^x",
        r"p = 3.50 + x_{\beta}",
        r"(a + b)(a - b)",
        r"y = -(a + b) + x_{\alpha\beta}",
    ];
    for markup in formulas {
        let once = canon(&notation, markup);
        assert!(!once.starts_with("Error"), "{once}");
        assert_eq!(canon(&notation, &once), once, "{markup}");
    }
}

fn bindings(values: &[(&str, i64)]) -> Bindings {
    values
        .iter()
        .map(|&(name, value)| (name.to_string(), Expr::integer(value)))
        .collect()
}

fn value_of(notation: &Arc<Notation>, markup: &str, bindings: &Bindings) -> Option<f64> {
    let mut formula = Formula::new(Arc::clone(notation));
    formula.from_latex(markup).ok()?;
    formula.evaluate(bindings).ok()
}

#[test]
fn negated_sums() {
    let notation = notation();
    let values = bindings(&[("a", 1), ("b", 2), ("c", 3)]);
    let cases = [
        ("y = -(a + b)", r"y = - \left(a + b\right)"),
        ("y = a - (b + c)", r"y = a - \left(b + c\right)"),
        ("y = a - 2(b - c)", r"y = a - 2 \left(b - c\right)"),
    ];
    for (markup, expected) in cases {
        let canonical = canon(&notation, markup);
        assert_eq!(canonical, expected, "{markup}");
        let before = value_of(&notation, markup, &values).unwrap();
        assert_eq!(value_of(&notation, &canonical, &values), Some(before), "{markup}");
    }
}

fn nest(depth: usize, open: &str, close: &str) -> String {
    format!("y = {}x{}", open.repeat(depth), close.repeat(depth))
}

#[test]
fn deep_nesting_on_the_default_stack() {
    let notation = notation();
    let shapes = [("(", ")"), (r"\frac{", "}{2}"), ("x^{", "}")];
    for (open, close) in shapes {
        let ok = nest(MAX_NESTING, open, close);
        let canonical = canon(&notation, &ok);
        assert!(!canonical.starts_with("Error"), "{canonical}");
        let deep = nest(MAX_NESTING + 1, open, close);
        assert!(canon(&notation, &deep).contains("Hard limit exceeded"), "{open}");
    }
}

fn arithmetic() -> impl Strategy<Value = String> {
    let leaf = prop_oneof!["[a-e]", (1u8..10).prop_map(|n| n.to_string())];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} + {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} - {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!(r"\frac{{{a}}}{{{b}}}")),
            inner.clone().prop_map(|a| format!("({a})^{{2}}")),
            inner.clone().prop_map(|a| format!("({a})")),
            inner.prop_map(|a| format!("-({a})")),
        ]
    })
}

proptest! {
    #[test]
    fn encapsulation_is_idempotent(input in r"[a-c1-2_^{}\\ ]{0,16}") {
        for brace_superscripts in [true, false] {
            if let Ok(once) = encapsulate(&input, brace_superscripts) {
                prop_assert_eq!(encapsulate(&once, brace_superscripts), Ok(once.clone()));
            }
        }
    }

    #[test]
    fn canonical_markup_is_a_fixed_point(markup in arithmetic()) {
        let notation = notation();
        let once = canon(&notation, &format!("y = {markup}"));
        prop_assert!(!once.starts_with("Error"), "{}", once);
        prop_assert_eq!(canon(&notation, &once), once);
    }

    #[test]
    fn canonical_markup_keeps_its_value(markup in arithmetic(), negated in any::<bool>()) {
        let notation = notation();
        let values = bindings(&[("a", 2), ("b", 3), ("c", 5), ("d", 7), ("e", 11)]);
        let markup = if negated { format!("y = -({markup})") } else { format!("y = {markup}") };
        // Quotients by zero have no value to compare.
        let Some(before) = value_of(&notation, &markup, &values) else {
            return Ok(());
        };
        let canonical = canon(&notation, &markup);
        let after = value_of(&notation, &canonical, &values);
        prop_assert!(
            after.is_some_and(|after| (after - before).abs() <= 1e-9 * before.abs().max(1.0)),
            "{} => {}: {} vs {:?}", markup, canonical, before, after
        );
    }
}
