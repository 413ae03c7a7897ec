use tracing::debug;

use crate::model::Catalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    #[default]
    Sensitive,
    /// ASCII case folding, as `strncasecmp` does in the C locale.
    Insensitive,
}

/// Relevance tier. Declaration order is chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Band {
    Exact,
    Prefix,
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refilter {
    /// Scan the whole pool.
    Full,
    /// Scan only the current chain. Only valid when the new query extends the old one.
    Narrow,
}

pub fn classify(candidate: &str, query: &str, case: CaseMode) -> Option<Band> {
    let (candidate, query) = (candidate.as_bytes(), query.as_bytes());
    let eq = |a: &[u8], b: &[u8]| match case {
        CaseMode::Sensitive => a == b,
        CaseMode::Insensitive => a.eq_ignore_ascii_case(b),
    };

    if eq(candidate, query) {
        return Some(Band::Exact);
    }
    if candidate.len() >= query.len() && eq(&candidate[..query.len()], query) {
        return Some(Band::Prefix);
    }
    if candidate
        .windows(query.len().max(1))
        .any(|window| eq(window, query))
    {
        return Some(Band::Substring);
    }
    None
}

/// Produces the match chain: pool indices ordered exact, then prefix, then
/// substring, each band in pool order.
#[derive(Debug, Clone, Default)]
pub struct MatchEngine {
    case: CaseMode,
    chain: Vec<usize>,
}

impl MatchEngine {
    pub fn new(case: CaseMode) -> Self {
        Self {
            case,
            chain: Vec::new(),
        }
    }

    pub fn chain(&self) -> &[usize] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn refilter(&mut self, catalog: &Catalog, query: &str, mode: Refilter) -> &[usize] {
        let candidates: Vec<usize> = match mode {
            Refilter::Full => (0..catalog.len()).collect(),
            Refilter::Narrow => {
                // Earlier bands may have reordered the chain; restore pool order so the
                // result equals a full scan.
                let mut previous = std::mem::take(&mut self.chain);
                previous.sort_unstable();
                previous
            }
        };
        let scanned = candidates.len();

        let mut exact = Vec::new();
        let mut prefix = Vec::new();
        let mut substring = Vec::new();
        for index in candidates {
            match classify(catalog.text(index), query, self.case) {
                Some(Band::Exact) => exact.push(index),
                Some(Band::Prefix) => prefix.push(index),
                Some(Band::Substring) => substring.push(index),
                None => {}
            }
        }

        debug!(
            ?mode,
            scanned,
            exact = exact.len(),
            prefix = prefix.len(),
            substring = substring.len(),
            "refiltered matches"
        );

        exact.append(&mut prefix);
        exact.append(&mut substring);
        self.chain = exact;
        &self.chain
    }
}
