use std::fmt::Write;
use std::sync::Arc;

use insta::assert_snapshot;
use formula_core::{Formula, FormulaConfig, Notation};

#[test]
fn main() {
    let problems = [
        ("empty", ""),
        ("unclosed_brace", r"{x"),
        ("unmatched_paren", r"x)"),
        ("unclosed_left", r"\left( x"),
        ("left_closed_by_paren", r"\left( x )"),
        ("double_sub", r"x_1_2"),
        ("sup_then_sub", r"x^_2"),
        ("unknown_command", r"\foo"),
        ("two_relations", r"a = b = c"),
        ("operator_in_subscript", r"x_{a+b}"),
        ("subscript_on_group", r"(a+b)_1"),
        ("nested_relation", r"(a = b) + c"),
        ("tuple_outside_call", r"(a, b)"),
        ("symbolic_root_index", r"\sqrt[x]{2}"),
        ("sin_with_two_arguments", r"\sin(x, y)"),
    ];

    let notation = Arc::new(Notation::new(FormulaConfig::default()).unwrap());
    let mut output = String::new();
    for (name, problem) in problems {
        let mut formula = Formula::new(Arc::clone(&notation));
        let Err(error) = formula.from_latex(problem) else {
            panic!("problem `{problem}` did not return an error");
        };
        assert!(formula.is_empty(), "{name}");
        let stage: &str = error.stage().map_or("none", <&str>::from);
        writeln!(output, "{name} [{stage}] {error}").unwrap();

        // Every markup error can be shown as a report on the text it points into.
        let source = error.markup().expect("markup errors carry their source");
        let report = error.to_report("<input>", false).expect("markup errors have a report");
        let mut buf = Vec::new();
        report
            .write(("<input>", ariadne::Source::from(source)), &mut buf)
            .expect("failed to write report");
        let report = String::from_utf8(buf).expect("report should be valid UTF-8");
        assert!(report.contains("<input>"), "{name}: {report}");
    }
    assert_snapshot!(output, @r#"
    empty [parse] 0: The formula is empty.
    unclosed_brace [normalize] 0: Expected token "}", but not found.
    unmatched_paren [normalize] 1: Unmatched closing token: ")".
    unclosed_left [normalize] 0: Expected token "\right", but not found.
    left_closed_by_paren [normalize] 9: Delimiter '(' is closed by ')'.
    double_sub [parse] 3: Duplicate subscript or superscript.
    sup_then_sub [parse] 2: '^' or '_' directly followed by '^' or '_'.
    unknown_command [parse] 0: Unknown command "\foo".
    two_relations [parse] 6: Expected an operator or end of input, but got "=".
    operator_in_subscript [build] 4: Subscripts may only contain letters, digits and Greek letters.
    subscript_on_group [build] 0: Only identifiers can carry a subscript.
    nested_relation [build] 1: "=" may only appear once, at the top level of a formula.
    tuple_outside_call [build] 1: Comma-separated lists are only allowed as function arguments.
    symbolic_root_index [build] 6: The index of a root must be a positive integer.
    sin_with_two_arguments [build] 0: Function "sin" takes 1 argument, but got 2.
    "#);
}

#[test]
fn errors_keep_the_previous_formula() {
    let notation = Arc::new(Notation::new(FormulaConfig::default()).unwrap());
    let mut formula = Formula::new(notation);
    formula.from_latex("E = m c^2").unwrap();
    for problem in [r"{x", r"x_1_2", r"(a, b)"] {
        assert!(formula.from_latex(problem).is_err());
        assert_eq!(formula.latex(), "E = m c^2");
        assert_eq!(formula.to_latex().unwrap(), "E = m c^{2}");
    }
}
