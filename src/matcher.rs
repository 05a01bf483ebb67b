use regex::{Regex, RegexBuilder};

use crate::error::ReportError;

/// Decides whether a cell value is selected by a list of filter terms.
pub trait TermMatcher {
    fn matches(&self, value: &str) -> bool;
}

/// Case-insensitive "contains any term" matching. Terms are literal text,
/// so a term may match inside an unrelated word.
#[derive(Debug, Clone)]
pub struct SubstringMatcher {
    pattern: Regex,
}

impl SubstringMatcher {
    /// `None` when no term survives trimming.
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Option<Self>, ReportError> {
        let alternatives = terms
            .iter()
            .map(|term| term.as_ref().trim())
            .filter(|term| !term.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>();
        if alternatives.is_empty() {
            return Ok(None);
        }
        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|err| ReportError::InvalidTerms(err.to_string()))?;
        Ok(Some(Self { pattern }))
    }
}

impl TermMatcher for SubstringMatcher {
    fn matches(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }
}
