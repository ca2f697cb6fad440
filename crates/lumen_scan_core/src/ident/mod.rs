//! Identifier classification.
//!
//! Grammars register word lists per kind (keywords, types, builtin
//! functions, literal values). A word maps to exactly one kind: registering
//! it again replaces the earlier mapping, so a derived grammar can re-map
//! single words of its base without rebuilding the table.

use rustc_hash::FxHashMap;

use crate::Kind;

/// Word to kind table.
#[derive(Clone, Debug)]
pub struct IdentifierMap {
    words: FxHashMap<String, Kind>,
    case_sensitive: bool,
}

impl Default for IdentifierMap {
    fn default() -> Self {
        IdentifierMap::new(true)
    }
}

impl IdentifierMap {
    pub fn new(case_sensitive: bool) -> Self {
        IdentifierMap {
            words: FxHashMap::default(),
            case_sensitive,
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Switch case sensitivity, re-folding existing entries.
    ///
    /// Going from sensitive to insensitive merges entries that differ only in
    /// case; the one seen last during iteration wins.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        if self.case_sensitive == case_sensitive {
            return;
        }
        self.case_sensitive = case_sensitive;
        if !case_sensitive {
            let words = std::mem::take(&mut self.words);
            self.words = words
                .into_iter()
                .map(|(w, k)| (w.to_lowercase(), k))
                .collect();
        }
    }

    /// Map every word in `words` to `kind`, replacing earlier mappings.
    pub fn add_mapping<I, S>(&mut self, kind: Kind, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            let key = self.fold(word.as_ref());
            self.words.insert(key, kind);
        }
    }

    /// Remove a word, returning the kind it mapped to.
    pub fn remove(&mut self, word: &str) -> Option<Kind> {
        let key = self.fold(word);
        self.words.remove(&key)
    }

    /// Kind registered for `word`, if any.
    pub fn get(&self, word: &str) -> Option<Kind> {
        if self.case_sensitive {
            self.words.get(word).copied()
        } else {
            self.words.get(&word.to_lowercase()).copied()
        }
    }

    /// Kind for `word`, falling back to [`Kind::IDENT`].
    pub fn classify(&self, word: &str) -> Kind {
        self.get(word).unwrap_or(Kind::IDENT)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn fold(&self, word: &str) -> String {
        if self.case_sensitive {
            word.to_owned()
        } else {
            word.to_lowercase()
        }
    }
}
