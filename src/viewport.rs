use tracing::trace;

/// Columns of padding every drawn label carries after its text.
pub const PADDING: usize = 2;

/// Scroll markers reserve a label each in horizontal mode.
pub const MORE_BEFORE: &str = "<";
pub const MORE_AFTER: &str = ">";

/// Display width of a label: printable code points plus padding.
pub fn text_width(text: &str) -> usize {
    text.chars().count() + PADDING
}

/// Terminal-derived layout inputs. `lines == 0` is the single-row horizontal layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub columns: usize,
    pub lines: usize,
    pub prompt_width: usize,
    pub input_width: usize,
}

impl Geometry {
    pub fn is_vertical(&self) -> bool {
        self.lines > 0
    }

    /// Columns left for items in the horizontal row.
    pub fn item_span(&self) -> usize {
        let reserved = self.prompt_width
            + self.input_width
            + text_width(MORE_BEFORE)
            + text_width(MORE_AFTER);
        self.columns.saturating_sub(reserved).max(1)
    }
}

/// Visible window over the match chain, in chain positions.
///
/// `start` is the first visible position, `next` the first position past the
/// window, and `prev` the start of the page that ends just before `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    start: usize,
    prev: Option<usize>,
    next: Option<usize>,
}

impl Viewport {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn prev(&self) -> Option<usize> {
        self.prev
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }

    /// One past the last visible position.
    pub fn end(&self, len: usize) -> usize {
        self.next.unwrap_or(len)
    }

    /// Anchors the window at `start` and recomputes both boundaries.
    pub fn scroll_to<F>(&mut self, start: usize, len: usize, geometry: &Geometry, width_of: &F)
    where
        F: Fn(usize) -> usize,
    {
        self.start = start.min(len.saturating_sub(1));
        self.recompute(len, geometry, width_of);
    }

    /// Pans forward until the end of the chain is visible, packing as many
    /// trailing items into the window as fit.
    pub fn scroll_to_end<F>(&mut self, len: usize, geometry: &Geometry, width_of: &F)
    where
        F: Fn(usize) -> usize,
    {
        if self.next.is_none() {
            return;
        }
        self.scroll_to(len - 1, len, geometry, width_of);
        if let Some(prev) = self.prev {
            self.scroll_to(prev, len, geometry, width_of);
        }
        while self.next.is_some() && self.start + 1 < len {
            self.start += 1;
            self.recompute(len, geometry, width_of);
        }
    }

    pub fn recompute<F>(&mut self, len: usize, geometry: &Geometry, width_of: &F)
    where
        F: Fn(usize) -> usize,
    {
        if len == 0 {
            *self = Self::default();
            return;
        }

        if geometry.is_vertical() {
            let lines = geometry.lines;
            self.next = (self.start + lines < len).then_some(self.start + lines);
            self.prev = (self.start > 0).then(|| self.start.saturating_sub(lines));
        } else {
            let span = geometry.item_span();

            let mut used = 0;
            let mut next = self.start;
            while next < len {
                used += width_of(next).min(span);
                if used > span {
                    break;
                }
                next += 1;
            }
            self.next = (next < len).then_some(next);

            let mut used = 0;
            let mut prev = self.start;
            while prev > 0 {
                used += width_of(prev - 1).min(span);
                if used > span {
                    break;
                }
                prev -= 1;
            }
            self.prev = (self.start > 0).then_some(prev);
        }

        trace!(
            start = self.start,
            prev = ?self.prev,
            next = ?self.next,
            len,
            "viewport recomputed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal(columns: usize) -> Geometry {
        Geometry {
            columns,
            lines: 0,
            prompt_width: 0,
            input_width: 10,
        }
    }

    fn shows(viewport: &Viewport, position: usize, len: usize) -> bool {
        position >= viewport.start() && position < viewport.end(len)
    }

    fn vertical(lines: usize) -> Geometry {
        Geometry {
            columns: 80,
            lines,
            prompt_width: 0,
            input_width: 10,
        }
    }

    #[test]
    fn label_width_counts_code_points_plus_padding() {
        assert_eq!(text_width(""), 2);
        assert_eq!(text_width("abc"), 5);
        assert_eq!(text_width("日本"), 4);
    }

    #[test]
    fn item_span_reserves_prompt_input_and_markers() {
        let geometry = Geometry {
            columns: 80,
            lines: 0,
            prompt_width: 7,
            input_width: 13,
        };
        assert_eq!(geometry.item_span(), 80 - 7 - 13 - 3 - 3);
        assert_eq!(horizontal(4).item_span(), 1);
    }

    #[test]
    fn horizontal_window_packs_items_until_width_runs_out() {
        // span = 80 - 10 - 6 = 64; ten-column items fit six at a time.
        let geometry = horizontal(80);
        let width = |_: usize| 10;
        let mut viewport = Viewport::default();
        viewport.scroll_to(0, 20, &geometry, &width);
        assert_eq!(viewport.next(), Some(6));
        assert_eq!(viewport.prev(), None);

        viewport.scroll_to(6, 20, &geometry, &width);
        assert_eq!(viewport.next(), Some(12));
        assert_eq!(viewport.prev(), Some(0));
    }

    #[test]
    fn wide_items_still_get_a_page_of_their_own() {
        let geometry = horizontal(40);
        let width = |_: usize| 500;
        let mut viewport = Viewport::default();
        viewport.scroll_to(3, 5, &geometry, &width);
        assert_eq!(viewport.next(), Some(4));
        assert_eq!(viewport.prev(), Some(2));
        assert!(shows(&viewport, 3, 5));
    }

    #[test]
    fn whole_chain_visible_has_no_boundaries() {
        let mut viewport = Viewport::default();
        viewport.scroll_to(0, 3, &horizontal(80), &|_| 5);
        assert_eq!(viewport.next(), None);
        assert_eq!(viewport.prev(), None);
        assert_eq!(viewport.end(3), 3);
    }

    #[test]
    fn vertical_window_is_exactly_the_line_count() {
        let geometry = vertical(4);
        let width = |_: usize| 1000;
        let mut viewport = Viewport::default();
        viewport.scroll_to(0, 10, &geometry, &width);
        assert_eq!(viewport.next(), Some(4));
        viewport.scroll_to(4, 10, &geometry, &width);
        assert_eq!(viewport.prev(), Some(0));
        assert_eq!(viewport.next(), Some(8));
        viewport.scroll_to(8, 10, &geometry, &width);
        assert_eq!(viewport.next(), None);
        assert_eq!(viewport.end(10), 10);
    }

    #[test]
    fn vertical_prev_clamps_to_chain_start() {
        let mut viewport = Viewport::default();
        viewport.scroll_to(2, 10, &vertical(4), &|_| 1);
        assert_eq!(viewport.prev(), Some(0));
    }

    #[test]
    fn scroll_to_end_shows_last_full_page() {
        let geometry = vertical(4);
        let mut viewport = Viewport::default();
        viewport.scroll_to(0, 10, &geometry, &|_| 1);
        viewport.scroll_to_end(10, &geometry, &|_| 1);
        assert_eq!(viewport.start(), 6);
        assert_eq!(viewport.next(), None);
        assert!(shows(&viewport, 9, 10));
    }

    #[test]
    fn scroll_to_end_with_mixed_widths() {
        let geometry = horizontal(80);
        let widths = [10, 10, 30, 10, 20, 30, 10];
        let width = |position: usize| widths[position];
        let mut viewport = Viewport::default();
        viewport.scroll_to(0, widths.len(), &geometry, &width);
        assert_eq!(viewport.next(), Some(4));

        viewport.scroll_to_end(widths.len(), &geometry, &width);
        assert_eq!(viewport.start(), 4);
        assert_eq!(viewport.next(), None);
    }

    #[test]
    fn empty_chain_resets_window() {
        let mut viewport = Viewport::default();
        viewport.scroll_to(5, 0, &horizontal(80), &|_| 3);
        assert_eq!(viewport, Viewport::default());
    }
}
