use std::io::BufRead;

use anyhow::{Context, Result};

use crate::viewport::text_width;

/// Narrowest query field the horizontal layout reserves, in columns.
const MIN_INPUT_WIDTH: usize = 10;

/// One candidate line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub text: String,
}

/// The candidate pool. Built once before the session and never reordered; every
/// match chain refers into it by index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    widest: usize,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::empty();
        for line in lines {
            catalog.push(line.into());
        }
        catalog
    }

    /// Reads one candidate per line. Invalid UTF-8 is replaced, never rejected.
    pub fn read_from<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut catalog = Self::empty();
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .context("failed to read candidate list")?;
            if read == 0 {
                break;
            }
            if line.last() == Some(&b'\n') {
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
            }
            catalog.push(String::from_utf8_lossy(&line).into_owned());
        }
        Ok(catalog)
    }

    fn push(&mut self, text: String) {
        self.widest = self.widest.max(text_width(&text));
        self.items.push(Item { text });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn text(&self, index: usize) -> &str {
        &self.items[index].text
    }

    /// Query field width for the horizontal layout: the widest item, but at least
    /// [`MIN_INPUT_WIDTH`] and at most a sixth of the terminal.
    pub fn input_width(&self, columns: usize) -> usize {
        self.widest.max(MIN_INPUT_WIDTH).min(columns / 6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_one_item_per_line() {
        let catalog = Catalog::read_from(Cursor::new("alpha\nbeta\r\n\ngamma")).unwrap();
        let texts: Vec<&str> = (0..catalog.len()).map(|index| catalog.text(index)).collect();
        assert_eq!(texts, vec!["alpha", "beta", "", "gamma"]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let catalog = Catalog::read_from(Cursor::new(b"ok\n\xffbad\n".to_vec())).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.text(1), "\u{fffd}bad");
    }

    #[test]
    fn empty_source_gives_empty_pool() {
        let catalog = Catalog::read_from(Cursor::new("")).unwrap();
        assert_eq!(catalog.len(), 0);
    }

    #[test]
    fn input_width_is_bounded_by_terminal_and_floor() {
        let catalog = Catalog::from_lines(["a-rather-long-candidate-name"]);
        assert_eq!(catalog.input_width(600), 30);
        assert_eq!(catalog.input_width(60), 10);

        let short = Catalog::from_lines(["ab"]);
        assert_eq!(short.input_width(600), MIN_INPUT_WIDTH);
    }
}
