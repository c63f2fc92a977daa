//! The bidirectional map between internal symbol names and their display commands.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::commands::is_reserved;

static GREEK_LOWERCASE: [&str; 24] = [
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "omicron", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi",
    "psi", "omega",
];

static GREEK_UPPERCASE: [&str; 24] = [
    "Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta", "Theta", "Iota", "Kappa",
    "Lambda", "Mu", "Nu", "Xi", "Omicron", "Pi", "Rho", "Sigma", "Tau", "Upsilon", "Phi", "Chi",
    "Psi", "Omega",
];

/// Maps internal symbol names like `alpha` to display commands like `\alpha` and back.
///
/// The map is a bijection; [`SymbolMap::new`] refuses entries that would break this.
#[derive(Debug, Clone)]
pub struct SymbolMap {
    /// internal name -> display command (with backslash)
    to_display: FxHashMap<Box<str>, Box<str>>,
    /// display command (without backslash) -> internal name
    to_internal: FxHashMap<Box<str>, Box<str>>,
    /// lowercased command name -> command name, `None` if several commands fold together
    folded: FxHashMap<Box<str>, Option<Box<str>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolMapError {
    /// Internal names must be non-empty runs of ASCII letters.
    InvalidName(String),
    /// Display commands must be a backslash followed by ASCII letters, and must not shadow a
    /// built-in command.
    InvalidDisplay(String),
    /// The internal name is already mapped to a different display command.
    DuplicateName(String),
    /// The display command is already used by a different internal name.
    DuplicateDisplay(String),
}

impl fmt::Display for SymbolMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolMapError::InvalidName(name) => write!(f, "invalid symbol name \"{name}\""),
            SymbolMapError::InvalidDisplay(display) => {
                write!(f, "invalid display command \"{display}\"")
            }
            SymbolMapError::DuplicateName(name) => {
                write!(f, "symbol \"{name}\" is mapped more than once")
            }
            SymbolMapError::DuplicateDisplay(display) => {
                write!(f, "display command \"{display}\" is used by two symbols")
            }
        }
    }
}

impl std::error::Error for SymbolMapError {}

impl SymbolMap {
    /// Build the default map extended by `extra` (internal name, display command) pairs.
    ///
    /// An extra entry may repeat a default entry exactly; anything else that maps a name or a
    /// display command twice is an error.
    pub fn new<'a>(
        extra: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, SymbolMapError> {
        let mut map = SymbolMap {
            to_display: FxHashMap::default(),
            to_internal: FxHashMap::default(),
            folded: FxHashMap::default(),
        };
        for name in GREEK_LOWERCASE.iter().chain(GREEK_UPPERCASE.iter()) {
            map.insert(name, &format!("\\{name}"))?;
        }
        for (name, display) in extra {
            map.insert(name, display)?;
        }
        for command in map.to_internal.keys() {
            map.folded
                .entry(command.to_ascii_lowercase().into_boxed_str())
                .and_modify(|entry| *entry = None)
                .or_insert_with(|| Some(command.clone()));
        }
        Ok(map)
    }

    fn insert(&mut self, name: &str, display: &str) -> Result<(), SymbolMapError> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(SymbolMapError::InvalidName(name.to_string()));
        }
        let Some(command) = display.strip_prefix('\\') else {
            return Err(SymbolMapError::InvalidDisplay(display.to_string()));
        };
        if command.is_empty()
            || !command.bytes().all(|b| b.is_ascii_alphabetic())
            || is_reserved(command)
        {
            return Err(SymbolMapError::InvalidDisplay(display.to_string()));
        }
        match (self.to_display.get(name), self.to_internal.get(command)) {
            (Some(existing), Some(_)) if &**existing == display => return Ok(()),
            (Some(_), _) => return Err(SymbolMapError::DuplicateName(name.to_string())),
            (None, Some(_)) => return Err(SymbolMapError::DuplicateDisplay(display.to_string())),
            (None, None) => {}
        }
        self.to_display.insert(name.into(), display.into());
        self.to_internal.insert(command.into(), name.into());
        Ok(())
    }

    /// The display command of an internal name, e.g. `\alpha` for `alpha`.
    #[inline]
    pub fn display(&self, name: &str) -> Option<&str> {
        self.to_display.get(name).map(|display| &**display)
    }

    /// The internal name of a display command given without its backslash, e.g. `alpha`.
    #[inline]
    pub fn internal(&self, command: &str) -> Option<&str> {
        self.to_internal.get(command).map(|name| &**name)
    }

    /// Resolve a command name that differs from exactly one known display command in letter case
    /// only. Returns the correctly spelled command name (without backslash).
    pub fn resolve_case_insensitive(&self, command: &str) -> Option<&str> {
        self.folded
            .get(command.to_ascii_lowercase().as_str())?
            .as_deref()
    }

    pub fn len(&self) -> usize {
        self.to_display.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_display.is_empty()
    }

    /// All (internal name, display command) pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.to_display
            .iter()
            .map(|(name, display)| (&**name, &**display))
    }
}

impl Default for SymbolMap {
    fn default() -> Self {
        // The defaults on their own always form a bijection.
        Self::new([]).unwrap_or_else(|_| unreachable!())
    }
}
