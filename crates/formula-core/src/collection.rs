//! Named formulas and their JSON document.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::Notation;
use crate::formula::{Formula, FormulaError, FormulaState};

#[derive(Debug)]
pub enum CollectionError {
    DuplicateName(String),
    NotFound(String),
    Io(std::io::Error),
    /// The document is not a JSON object whose values are all strings.
    Document(String),
    /// A modified formula could not be rendered for saving.
    Formula { name: String, error: FormulaError },
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::DuplicateName(name) => write!(f, "formula \"{name}\" already exists"),
            CollectionError::NotFound(name) => write!(f, "no formula named \"{name}\""),
            CollectionError::Io(err) => write!(f, "I/O error: {err}"),
            CollectionError::Document(msg) => write!(f, "invalid document: {msg}"),
            CollectionError::Formula { name, error } => write!(f, "formula \"{name}\": {error}"),
        }
    }
}

impl std::error::Error for CollectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectionError::Io(err) => Some(err),
            CollectionError::Formula { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CollectionError {
    fn from(err: std::io::Error) -> Self {
        CollectionError::Io(err)
    }
}

/// Outcome of [`FormulaCollection::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Number of formulas in the collection after loading.
    pub loaded: usize,
    /// Entries whose markup could not be read, sorted by name. They are not in the collection.
    pub failed: Vec<(String, FormulaError)>,
}

/// A map from unique names to formulas sharing one [`Notation`].
#[derive(Debug)]
pub struct FormulaCollection {
    notation: Arc<Notation>,
    formulas: FxHashMap<String, Formula>,
}

impl FormulaCollection {
    pub fn new(notation: Arc<Notation>) -> Self {
        FormulaCollection {
            notation,
            formulas: FxHashMap::default(),
        }
    }

    /// Add an empty formula.
    pub fn add(&mut self, name: &str) -> Result<&mut Formula, CollectionError> {
        if self.formulas.contains_key(name) {
            return Err(CollectionError::DuplicateName(name.to_string()));
        }
        Ok(self
            .formulas
            .entry(name.to_string())
            .or_insert_with(|| Formula::new(Arc::clone(&self.notation))))
    }

    pub fn get(&self, name: &str) -> Result<&Formula, CollectionError> {
        self.formulas
            .get(name)
            .ok_or_else(|| CollectionError::NotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Formula, CollectionError> {
        self.formulas
            .get_mut(name)
            .ok_or_else(|| CollectionError::NotFound(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<Formula, CollectionError> {
        self.formulas
            .remove(name)
            .ok_or_else(|| CollectionError::NotFound(name.to_string()))
    }

    /// Remove all empty formulas and return how many there were.
    pub fn clean_empty(&mut self) -> usize {
        let before = self.formulas.len();
        self.formulas.retain(|_, formula| !formula.is_empty());
        before - self.formulas.len()
    }

    /// All names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formulas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// Iterate over the formulas in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Formula)> {
        self.formulas
            .iter()
            .map(|(name, formula)| (name.as_str(), formula))
    }

    /// The JSON document of this collection, with keys sorted.
    ///
    /// Parsed formulas are saved with the markup they were read from, modified formulas with
    /// the canonical markup of their tree, and empty formulas as `""`.
    pub fn to_json(&self) -> Result<String, CollectionError> {
        let mut document: BTreeMap<&str, String> = BTreeMap::new();
        for (name, formula) in &self.formulas {
            let markup = match formula.state() {
                FormulaState::Empty => String::new(),
                FormulaState::Parsed => formula.latex().to_string(),
                FormulaState::Modified => {
                    formula
                        .to_latex()
                        .map_err(|error| CollectionError::Formula {
                            name: name.clone(),
                            error,
                        })?
                }
            };
            document.insert(name, markup);
        }
        serde_json::to_string_pretty(&document)
            .map_err(|err| CollectionError::Document(err.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CollectionError> {
        let mut json = self.to_json()?;
        json.push('\n');
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Replace the contents of this collection with the formulas of a JSON document.
    ///
    /// The whole document is checked before anything is replaced. Keys starting with `$` are
    /// metadata and are skipped. Entries whose markup fails to parse are left out and listed in
    /// the returned report.
    pub fn load_json(&mut self, json: &str) -> Result<LoadReport, CollectionError> {
        let document: Value =
            serde_json::from_str(json).map_err(|err| CollectionError::Document(err.to_string()))?;
        let Value::Object(entries) = document else {
            return Err(CollectionError::Document(
                "expected an object of formulas".to_string(),
            ));
        };
        let mut markups: Vec<(String, String)> = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            if name.starts_with('$') {
                tracing::debug!(key = %name, "skipping metadata key");
                continue;
            }
            let Value::String(markup) = value else {
                return Err(CollectionError::Document(format!(
                    "the value of \"{name}\" is not a string"
                )));
            };
            markups.push((name, markup));
        }

        self.formulas.clear();
        let mut report = LoadReport::default();
        for (name, markup) in markups {
            let mut formula = Formula::new(Arc::clone(&self.notation));
            if !markup.is_empty()
                && let Err(error) = formula.from_latex(&markup)
            {
                tracing::warn!(name = %name, %error, "skipping formula that failed to load");
                report.failed.push((name, error));
                continue;
            }
            self.formulas.insert(name, formula);
        }
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));
        report.loaded = self.formulas.len();
        Ok(report)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, CollectionError> {
        let json = std::fs::read_to_string(path)?;
        self.load_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::engine::Bindings;
    use crate::expr::Expr;
    use crate::FormulaConfig;

    fn collection() -> FormulaCollection {
        FormulaCollection::new(Arc::new(Notation::new(FormulaConfig::default()).unwrap()))
    }

    #[test]
    fn names_are_unique() {
        let mut formulas = collection();
        formulas.add("energy").unwrap().from_latex("E = m c^2").unwrap();
        assert!(matches!(
            formulas.add("energy"),
            Err(CollectionError::DuplicateName(name)) if name == "energy"
        ));
        assert!(matches!(
            formulas.get("momentum"),
            Err(CollectionError::NotFound(name)) if name == "momentum"
        ));
        assert!(formulas.remove("momentum").is_err());
        assert_eq!(formulas.get("energy").unwrap().latex(), "E = m c^2");
    }

    #[test]
    fn housekeeping() {
        let mut formulas = collection();
        formulas.add("b").unwrap();
        formulas.add("a").unwrap().from_latex("y = x").unwrap();
        formulas.add("c").unwrap();
        assert_eq!(formulas.names(), ["a", "b", "c"]);
        assert_eq!(formulas.clean_empty(), 2);
        assert_eq!(formulas.names(), ["a"]);
        assert_eq!(formulas.len(), 1);
        let removed = formulas.remove("a").unwrap();
        assert_eq!(removed.latex(), "y = x");
        assert!(formulas.is_empty());
    }

    #[test]
    fn document() {
        let mut formulas = collection();
        formulas.add("einstein").unwrap().from_latex("E = m c^2").unwrap();
        formulas.add("blank").unwrap();
        let kinetic = formulas.add("kinetic").unwrap();
        kinetic.from_latex(r"KE = \frac{1}{2} m v^2").unwrap();
        let bindings: Bindings = [("m".to_string(), Expr::integer(2))].into_iter().collect();
        kinetic.subs(&bindings).unwrap();
        assert_snapshot!(formulas.to_json().unwrap(), @r#"
        {
          "blank": "",
          "einstein": "E = m c^2",
          "kinetic": "KE = v^{2}"
        }
        "#);
    }

    #[test]
    fn loading_skips_invalid_entries() {
        let mut formulas = collection();
        formulas.add("stale").unwrap();
        let report = formulas
            .load_json(
                r#"{
                    "$comment": "exported from the editor",
                    "einstein": "E = m c^2",
                    "broken": "x_{a+b}",
                    "blank": ""
                }"#,
            )
            .unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "broken");
        assert_eq!(formulas.names(), ["blank", "einstein"]);
        assert!(formulas.get("blank").unwrap().is_empty());
    }

    #[test]
    fn invalid_documents_change_nothing() {
        let mut formulas = collection();
        formulas.add("kept").unwrap();
        for json in [r#"["E = m c^2"]"#, r#"{"a": "x", "b": 1}"#, "{"] {
            assert!(
                matches!(formulas.load_json(json), Err(CollectionError::Document(_))),
                "{json}"
            );
        }
        assert_eq!(formulas.names(), ["kept"]);
    }
}
