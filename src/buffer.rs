use thiserror::Error;

/// Default byte capacity of the query field.
pub const DEFAULT_CAPACITY: usize = 8191;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("query would exceed {capacity} bytes")]
pub struct CapacityExceeded {
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Bounded query text with a byte cursor that always sits on a code-point boundary.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    text: String,
    cursor: usize,
    capacity: usize,
}

impl EditBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            capacity,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn at_end(&self) -> bool {
        self.cursor == self.text.len()
    }

    /// Number of code points left of the cursor.
    pub fn cursor_column(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }

    /// Splices `input` in at the cursor and moves the cursor past it.
    pub fn insert(&mut self, input: &str) -> Result<(), CapacityExceeded> {
        if self.text.len() + input.len() > self.capacity {
            return Err(CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.text.insert_str(self.cursor, input);
        self.cursor += input.len();
        Ok(())
    }

    /// Removes `count` bytes after the cursor, or `-count` bytes before it.
    ///
    /// The span is clamped to the text and widened to code-point boundaries.
    /// The cursor ends at the lower edge of the removed span. Returns whether
    /// any text was removed.
    pub fn delete(&mut self, count: isize) -> bool {
        let (start, end) = if count < 0 {
            let start = self.cursor.saturating_sub(count.unsigned_abs());
            (self.floor_boundary(start), self.cursor)
        } else {
            let end = self.cursor.saturating_add(count as usize).min(self.text.len());
            (self.cursor, self.ceil_boundary(end))
        };
        self.cursor = start;
        if start == end {
            return false;
        }
        self.text.replace_range(start..end, "");
        true
    }

    /// Moves the cursor one code point. Returns whether it moved.
    pub fn seek(&mut self, direction: Direction) -> bool {
        let target = self.next_rune(direction);
        let moved = target != self.cursor;
        self.cursor = target;
        moved
    }

    /// Offset of the neighbouring code point in `direction`, skipping `10xxxxxx` bytes.
    pub fn next_rune(&self, direction: Direction) -> usize {
        let bytes = self.text.as_bytes();
        match direction {
            Direction::Left => {
                if self.cursor == 0 {
                    return 0;
                }
                let mut n = self.cursor - 1;
                while n > 0 && is_continuation(bytes[n]) {
                    n -= 1;
                }
                n
            }
            Direction::Right => {
                if self.cursor >= bytes.len() {
                    return bytes.len();
                }
                let mut n = self.cursor + 1;
                while n < bytes.len() && is_continuation(bytes[n]) {
                    n += 1;
                }
                n
            }
        }
    }

    pub fn move_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Offset reached by skipping spaces and then one space-delimited word in `direction`.
    pub fn word_boundary(&self, direction: Direction) -> usize {
        let bytes = self.text.as_bytes();
        let mut n = self.cursor;
        match direction {
            Direction::Left => {
                while n > 0 && bytes[n - 1] == b' ' {
                    n -= 1;
                }
                while n > 0 && bytes[n - 1] != b' ' {
                    n -= 1;
                }
            }
            Direction::Right => {
                while n < bytes.len() && bytes[n] == b' ' {
                    n += 1;
                }
                while n < bytes.len() && bytes[n] != b' ' {
                    n += 1;
                }
            }
        }
        n
    }

    pub fn seek_word(&mut self, direction: Direction) -> bool {
        let target = self.word_boundary(direction);
        let moved = target != self.cursor;
        self.cursor = target;
        moved
    }

    /// Drops everything from the cursor to the end. Returns whether text changed.
    pub fn truncate(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        self.text.truncate(self.cursor);
        true
    }

    /// Replaces the whole text, placing the cursor at the end. Oversized input is cut at
    /// the last code point that fits.
    pub fn replace(&mut self, text: &str) {
        let mut end = text.len().min(self.capacity);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.text.clear();
        self.text.push_str(&text[..end]);
        self.cursor = self.text.len();
    }

    fn floor_boundary(&self, mut offset: usize) -> usize {
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    fn ceil_boundary(&self, mut offset: usize) -> usize {
        while !self.text.is_char_boundary(offset) {
            offset += 1;
        }
        offset
    }
}

impl Default for EditBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xc0 == 0x80
}
