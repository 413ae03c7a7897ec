use std::io::Read;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::buffer::{DEFAULT_CAPACITY, Direction, EditBuffer};
use crate::input::{Command, InputDecoder};
use crate::matcher::{CaseMode, MatchEngine, Refilter};
use crate::model::Catalog;
use crate::viewport::{Geometry, Viewport, text_width};

/// Typing this at the end of the query cancels, for terminals that swallow Ctrl-C.
const CANCEL_SUFFIX: &str = "qq";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub case: CaseMode,
    pub prompt: Option<String>,
    /// Vertical list height; 0 selects the horizontal layout.
    pub lines: usize,
    pub capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            case: CaseMode::Sensitive,
            prompt: None,
            lines: 0,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub columns: u16,
    pub rows: u16,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            columns: 80,
            rows: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted(String),
    Cancelled,
}

/// Everything a renderer needs for one paint.
#[derive(Debug, Clone)]
pub struct View<'a> {
    pub prompt: Option<&'a str>,
    pub query: &'a str,
    /// Code points left of the edit cursor.
    pub cursor_column: usize,
    pub geometry: Geometry,
    pub items: Vec<&'a str>,
    /// Index into `items` of the highlighted entry.
    pub selected: Option<usize>,
    pub more_before: bool,
    pub more_after: bool,
}

pub trait Renderer {
    fn paint(&mut self, view: &View<'_>) -> Result<()>;
}

/// Owns all per-session state and applies decoded commands to it.
pub struct Session {
    catalog: Catalog,
    buffer: EditBuffer,
    engine: MatchEngine,
    viewport: Viewport,
    geometry: Geometry,
    prompt: Option<String>,
    /// Chain position of the highlighted item.
    selected: Option<usize>,
}

impl Session {
    pub fn new(catalog: Catalog, options: SessionOptions, screen: ScreenSize) -> Self {
        let columns = usize::from(screen.columns);
        let rows = usize::from(screen.rows);
        let geometry = Geometry {
            columns,
            lines: options.lines.min(rows.saturating_sub(1)),
            prompt_width: options.prompt.as_deref().map_or(0, text_width),
            input_width: catalog.input_width(columns),
        };

        let mut session = Self {
            catalog,
            buffer: EditBuffer::with_capacity(options.capacity),
            engine: MatchEngine::new(options.case),
            viewport: Viewport::default(),
            geometry,
            prompt: options.prompt,
            selected: None,
        };
        session.refilter(Refilter::Full);
        session
    }

    /// Paints, then decodes and applies commands until the session ends.
    /// Exhausted input counts as a cancel.
    pub fn run<R: Read, D: Renderer>(&mut self, input: &mut R, renderer: &mut D) -> Result<Outcome> {
        info!(
            items = self.catalog.len(),
            lines = self.geometry.lines,
            columns = self.geometry.columns,
            "session started"
        );
        let mut decoder = InputDecoder::new();
        renderer.paint(&self.view())?;

        loop {
            let Some(command) = decoder
                .read_command(input)
                .context("failed to read terminal input")?
            else {
                info!("terminal input closed");
                return Ok(Outcome::Cancelled);
            };

            debug!(?command, "applying command");
            if let Some(outcome) = self.apply(command) {
                info!(accepted = matches!(outcome, Outcome::Accepted(_)), "session finished");
                return Ok(outcome);
            }
            renderer.paint(&self.view())?;
        }
    }

    pub fn apply(&mut self, command: Command) -> Option<Outcome> {
        match command {
            Command::InsertChar(ch) => {
                let mut encoded = [0u8; 4];
                match self.buffer.insert(ch.encode_utf8(&mut encoded)) {
                    Ok(()) => {
                        let mode = if self.buffer.at_end() {
                            Refilter::Narrow
                        } else {
                            Refilter::Full
                        };
                        self.refilter(mode);
                    }
                    Err(err) => debug!(%err, "insert rejected"),
                }
                if self.buffer.text().ends_with(CANCEL_SUFFIX) {
                    return Some(Outcome::Cancelled);
                }
            }
            Command::MoveToStart => match self.selected {
                Some(position) if position > 0 => {
                    self.selected = Some(0);
                    self.scroll_to(0);
                }
                _ => self.buffer.move_to_start(),
            },
            Command::MoveToEnd => {
                if !self.buffer.at_end() {
                    self.buffer.move_to_end();
                } else {
                    self.scroll_to_end();
                    self.selected = self.engine.len().checked_sub(1);
                }
            }
            Command::MoveLeft => {
                let at_first = self.selected.is_none_or(|position| position == 0);
                if self.buffer.cursor() > 0 && (at_first || self.geometry.is_vertical()) {
                    self.buffer.seek(Direction::Left);
                } else {
                    self.select_previous();
                }
            }
            Command::MoveRight => {
                if !self.buffer.at_end() {
                    self.buffer.seek(Direction::Right);
                } else {
                    self.select_next();
                }
            }
            Command::MoveWordBackward => {
                self.buffer.seek_word(Direction::Left);
            }
            Command::MoveWordForward => {
                self.buffer.seek_word(Direction::Right);
            }
            Command::SelectPrevious => self.select_previous(),
            Command::SelectNext => self.select_next(),
            Command::DeleteForward => {
                let span = self.buffer.next_rune(Direction::Right) - self.buffer.cursor();
                self.delete(span as isize);
            }
            Command::DeleteBackward => {
                let span = self.buffer.cursor() - self.buffer.next_rune(Direction::Left);
                self.delete(-(span as isize));
            }
            Command::DeleteToEnd => {
                if self.buffer.truncate() {
                    self.refilter(Refilter::Full);
                }
            }
            Command::DeleteToStart => {
                self.delete(-(self.buffer.cursor() as isize));
            }
            Command::DeleteWordBackward => {
                let span = self.buffer.cursor() - self.buffer.word_boundary(Direction::Left);
                self.delete(-(span as isize));
            }
            Command::DeleteWordForward => {
                let span = self.buffer.word_boundary(Direction::Right) - self.buffer.cursor();
                self.delete(span as isize);
            }
            Command::PageBackward => {
                if let Some(prev) = self.viewport.prev() {
                    self.selected = Some(prev);
                    self.scroll_to(prev);
                }
            }
            Command::PageForward => {
                if let Some(next) = self.viewport.next() {
                    self.selected = Some(next);
                    self.scroll_to(next);
                }
            }
            Command::Accept => {
                let text = match self.selected_text() {
                    Some(text) => text.to_string(),
                    None => self.buffer.text().to_string(),
                };
                self.buffer.replace(&text);
                return Some(Outcome::Accepted(text));
            }
            Command::Cancel => return Some(Outcome::Cancelled),
            Command::Noop => {}
        }
        None
    }

    pub fn view(&self) -> View<'_> {
        let chain = self.engine.chain();
        let start = self.viewport.start().min(chain.len());
        let end = self.viewport.end(chain.len());
        View {
            prompt: self.prompt.as_deref(),
            query: self.buffer.text(),
            cursor_column: self.buffer.cursor_column(),
            geometry: self.geometry,
            items: chain[start..end]
                .iter()
                .map(|&index| self.catalog.text(index))
                .collect(),
            selected: self.selected.map(|position| position - start),
            more_before: start > 0,
            more_after: end < chain.len(),
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn selected_text(&self) -> Option<&str> {
        self.selected
            .map(|position| self.catalog.text(self.engine.chain()[position]))
    }

    fn select_previous(&mut self) {
        let Some(position) = self.selected.filter(|&position| position > 0) else {
            return;
        };
        self.selected = Some(position - 1);
        if position == self.viewport.start() {
            let prev = self.viewport.prev().unwrap_or(0);
            debug!(from = position, to = prev, "panning back");
            self.scroll_to(prev);
        }
    }

    fn select_next(&mut self) {
        let Some(position) = self
            .selected
            .filter(|&position| position + 1 < self.engine.len())
        else {
            return;
        };
        self.selected = Some(position + 1);
        if self.viewport.next() == Some(position + 1) {
            debug!(to = position + 1, "panning forward");
            self.scroll_to(position + 1);
        }
    }

    fn delete(&mut self, count: isize) {
        if count != 0 && self.buffer.delete(count) {
            self.refilter(Refilter::Full);
        }
    }

    fn refilter(&mut self, mode: Refilter) {
        self.engine.refilter(&self.catalog, self.buffer.text(), mode);
        self.selected = (!self.engine.is_empty()).then_some(0);
        self.scroll_to(0);
    }

    fn scroll_to(&mut self, start: usize) {
        let Self {
            catalog,
            engine,
            viewport,
            geometry,
            ..
        } = self;
        let chain = engine.chain();
        let width_of = |position: usize| text_width(catalog.text(chain[position]));
        viewport.scroll_to(start, chain.len(), geometry, &width_of);
    }

    fn scroll_to_end(&mut self) {
        let Self {
            catalog,
            engine,
            viewport,
            geometry,
            ..
        } = self;
        let chain = engine.chain();
        let width_of = |position: usize| text_width(catalog.text(chain[position]));
        viewport.scroll_to_end(chain.len(), geometry, &width_of);
    }
}
