//! URL substring matching for simulator registrations

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// How a registration's URL part is compared against request URLs
///
/// The default is a plain, case-sensitive substring test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub ignore_case: bool,
    /// Strip accents before comparing, so `café` matches `cafe`
    pub ignore_diacritics: bool,
}

impl MatchOptions {
    /// Case-sensitive, diacritic-sensitive matching
    #[must_use]
    pub fn exact() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ignore_case(mut self, ignore: bool) -> Self {
        self.ignore_case = ignore;
        self
    }

    #[must_use]
    pub fn with_ignore_diacritics(mut self, ignore: bool) -> Self {
        self.ignore_diacritics = ignore;
        self
    }

    /// Whether `text` contains `pattern` under these options
    ///
    /// An empty pattern is contained in every text.
    #[must_use]
    pub fn contains(&self, text: &str, pattern: &str) -> bool {
        if !self.ignore_case && !self.ignore_diacritics {
            return text.contains(pattern);
        }
        self.fold(text).contains(&self.fold(pattern))
    }

    fn fold(&self, s: &str) -> String {
        let folded: String = if self.ignore_diacritics {
            s.nfd().filter(|c| !is_combining_mark(*c)).collect()
        } else {
            s.to_owned()
        };

        if self.ignore_case {
            folded.to_lowercase()
        } else {
            folded
        }
    }
}
