use std::{
    fmt,
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use formula_core::{
    Bindings, CollectionError, Expr, Formula, FormulaCollection, FormulaError, Notation,
};

mod config_file;

use config_file::{Config, load_config_file};

/// Reads formulas written in editor markup and prints them back in canonical form
#[derive(Parser, Debug)]
#[command(version, about = "Normalizes, evaluates and re-renders LaTeX formulas", long_about = None)]
struct Args {
    /// TOML file with additional symbols and rendering flags
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print debug events of the conversion pipeline to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical markup of a formula
    Canon {
        /// The formula; read from stdin if omitted
        formula: Option<String>,
    },
    /// Print the expression tree of a formula
    Tree {
        /// The formula; read from stdin if omitted
        formula: Option<String>,
    },
    /// Substitute symbols and print the canonical markup of the result
    Subs {
        formula: String,
        /// Substitutions of the form `name=markup`, e.g. `v=10` or `\alpha=\frac{\pi}{2}`
        #[arg(value_name = "NAME=VALUE")]
        bindings: Vec<String>,
    },
    /// Evaluate a formula numerically; for an equation, its right-hand side
    Eval {
        formula: String,
        /// Values of the form `name=markup`
        #[arg(value_name = "NAME=VALUE")]
        bindings: Vec<String>,
    },
    /// Print all formulas of a saved collection
    Show {
        /// The JSON document of the collection
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the markup as stored instead of the canonical markup
        #[arg(long)]
        raw: bool,
    },
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match args.config {
        Some(ref path) => load_config_file(path).unwrap_or_else(|e| {
            eprintln!("Failed to load '{}': {}", path.display(), e);
            std::process::exit(1);
        }),
        None => Config::default(),
    };
    tracing::debug!(
        symbols = config.formula.symbols.len(),
        brace_superscripts = config.formula.brace_superscripts,
        "configured notation"
    );
    let notation = match Notation::new(config.formula) {
        Ok(notation) => Arc::new(notation),
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    match args.command {
        Command::Canon { formula } => {
            let formula = read_formula(&notation, formula);
            println!("{}", formula.to_latex().unwrap_or_else(|e| exit_formula_error(&e)));
        }
        Command::Tree { formula } => {
            let formula = read_formula(&notation, formula);
            println!("{}", formula.to_expr().unwrap_or_else(|e| exit_formula_error(&e)));
        }
        Command::Subs { formula, bindings } => {
            let mut formula = read_formula(&notation, Some(formula));
            let bindings = parse_bindings(&notation, &bindings);
            let canonical = formula
                .subs(&bindings)
                .and_then(|()| formula.to_latex())
                .unwrap_or_else(|e| exit_formula_error(&e));
            println!("{}", canonical);
        }
        Command::Eval { formula, bindings } => {
            let formula = read_formula(&notation, Some(formula));
            let bindings = parse_bindings(&notation, &bindings);
            let value = formula
                .evaluate(&bindings)
                .unwrap_or_else(|e| exit_formula_error(&e));
            println!("{}", value);
        }
        Command::Show { file, raw } => show_collection(&notation, &file, raw),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_formula(notation: &Arc<Notation>, markup: Option<String>) -> Formula {
    let markup = markup.unwrap_or_else(read_stdin);
    let mut formula = Formula::new(Arc::clone(notation));
    if let Err(e) = formula.from_latex(markup.trim_end()) {
        exit_formula_error(&e);
    }
    formula
}

fn read_stdin() -> String {
    let mut buffer = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut buffer) {
        exit_io_error(e);
    }
    buffer
}

fn parse_bindings(notation: &Notation, bindings: &[String]) -> Bindings {
    bindings
        .iter()
        .map(|binding| {
            parse_binding(notation, binding).unwrap_or_else(|e| match e {
                BindingError::Markup(e) => exit_formula_error(&e),
                other => {
                    eprintln!("Invalid binding '{}': {}", binding, other);
                    std::process::exit(2);
                }
            })
        })
        .collect()
}

#[derive(Debug)]
enum BindingError {
    MissingEquals,
    NotASymbol(Expr),
    Markup(FormulaError),
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::MissingEquals => f.write_str("expected NAME=VALUE"),
            BindingError::NotASymbol(expr) => write!(f, "{} is not a symbol", expr),
            BindingError::Markup(e) => write!(f, "{}", e),
        }
    }
}

/// Split `name=value` and read both sides as markup, so that `\alpha_1=2` binds `alpha_1`.
fn parse_binding(notation: &Notation, binding: &str) -> Result<(String, Expr), BindingError> {
    let (name, value) = binding
        .split_once('=')
        .ok_or(BindingError::MissingEquals)?;
    let name = match notation.latex_symbol(name.trim()) {
        Ok(Expr::Symbol(name)) => name,
        Ok(other) => return Err(BindingError::NotASymbol(other)),
        Err(e) => return Err(BindingError::Markup(e)),
    };
    let value = notation
        .latex_symbol(value.trim())
        .map_err(BindingError::Markup)?;
    Ok((name, value))
}

fn show_collection(notation: &Arc<Notation>, file: &Path, raw: bool) {
    let mut collection = FormulaCollection::new(Arc::clone(notation));
    let report = match collection.load(file) {
        Ok(report) => report,
        Err(CollectionError::Io(e)) => exit_io_error(e),
        Err(e) => {
            eprintln!("Conversion error in '{}': {}", file.display(), e);
            std::process::exit(2);
        }
    };
    for (name, error) in &report.failed {
        print_formula_error(error, name);
    }
    for name in collection.names() {
        let Ok(formula) = collection.get(name) else {
            continue;
        };
        if formula.is_empty() {
            println!("{}:", name);
        } else if raw {
            println!("{}: {}", name, formula.latex());
        } else {
            match formula.to_latex() {
                Ok(canonical) => println!("{}: {}", name, canonical),
                Err(e) => print_formula_error(&e, name),
            }
        }
    }
    if !report.failed.is_empty() {
        std::process::exit(2);
    }
}

fn print_formula_error(e: &FormulaError, source_name: &str) {
    match (e.to_report(source_name, true), e.markup()) {
        (Some(report), Some(markup)) => {
            if let Err(io_err) = report.eprint((source_name, ariadne::Source::from(markup))) {
                exit_io_error(io_err);
            }
        }
        _ => eprintln!("Conversion error in {}: {}", source_name, e),
    }
}

fn exit_formula_error(e: &FormulaError) -> ! {
    print_formula_error(e, "<input>");
    std::process::exit(2);
}

fn exit_io_error(e: std::io::Error) -> ! {
    eprintln!("IO Error: {}", e);
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use formula_core::FormulaConfig;

    use super::*;

    fn notation() -> Notation {
        Notation::new(FormulaConfig::default()).unwrap()
    }

    #[test]
    fn bindings_are_markup() {
        let notation = notation();
        let (name, value) = parse_binding(&notation, r"\alpha_1 = \frac{1}{2}").unwrap();
        assert_eq!(name, "alpha_1");
        assert_eq!(value.to_string(), "(* 1 (^ 2 -1))");
        let (name, value) = parse_binding(&notation, "v=10").unwrap();
        assert_eq!(name, "v");
        assert_eq!(value, Expr::integer(10));
    }

    #[test]
    fn invalid_bindings() {
        let notation = notation();
        assert!(matches!(
            parse_binding(&notation, "v"),
            Err(BindingError::MissingEquals)
        ));
        assert!(matches!(
            parse_binding(&notation, "a+b=1"),
            Err(BindingError::NotASymbol(_))
        ));
        assert!(matches!(
            parse_binding(&notation, "v={1"),
            Err(BindingError::Markup(_))
        ));
    }

    #[test]
    fn args() {
        let args = Args::try_parse_from(["formula", "-v", "subs", "E = m c^2", "m=2"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(
            args.command,
            Command::Subs { ref formula, ref bindings } if formula == "E = m c^2" && bindings == &["m=2"]
        ));
        let args = Args::try_parse_from(["formula", "show", "f.json", "--config", "f.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("f.toml")));
    }
}
