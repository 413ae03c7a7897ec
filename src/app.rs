use std::fs::File;
use std::io::{self, Stderr};

use anyhow::{Context, Result};
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};
use ratatui::{Terminal, TerminalOptions, Viewport as TerminalViewport};
use tracing::{debug, warn};

use crate::config::BarPosition;
use crate::model::Catalog;
use crate::session::{Outcome, Renderer, ScreenSize, Session, SessionOptions, View};
use crate::viewport::{MORE_BEFORE, PADDING, text_width};

/// Keystrokes come from the controlling terminal; stdin carries the candidates.
const TTY_PATH: &str = "/dev/tty";

/// One visible code point plus padding.
const MIN_LABEL_WIDTH: usize = PADDING + 1;

/// Right-edge marker in the horizontal row when matches follow the window.
const MORE_AFTER_LABEL: &str = "  >";

type TuiTerminal = Terminal<CrosstermBackend<Stderr>>;

pub fn run_tui(catalog: Catalog, options: SessionOptions, bar: BarPosition) -> Result<Outcome> {
    let screen = screen_size();
    let mut session = Session::new(catalog, options, screen);
    let mut tty = File::open(TTY_PATH).with_context(|| format!("failed to open {TTY_PATH}"))?;

    let height = u16::try_from(session.geometry().lines + 1).unwrap_or(screen.rows);
    let mut renderer = TerminalRenderer {
        terminal: init_terminal(bar, height, screen)?,
    };

    match session.run(&mut tty, &mut renderer) {
        Ok(outcome) => {
            restore_terminal(&mut renderer.terminal)?;
            Ok(outcome)
        }
        Err(err) => {
            let _ = restore_terminal(&mut renderer.terminal);
            Err(err)
        }
    }
}

fn screen_size() -> ScreenSize {
    match terminal::size() {
        Ok((columns, rows)) if columns > 0 && rows > 0 => ScreenSize { columns, rows },
        Ok(_) => ScreenSize::default(),
        Err(err) => {
            warn!(%err, "terminal size unavailable, assuming 80x24");
            ScreenSize::default()
        }
    }
}

fn init_terminal(bar: BarPosition, height: u16, screen: ScreenSize) -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let viewport = terminal_viewport(bar, height, screen);
    debug!(?viewport, "placing picker");

    let backend = CrosstermBackend::new(io::stderr());
    match Terminal::with_options(backend, TerminalOptions { viewport }) {
        Ok(terminal) => Ok(terminal),
        Err(err) => {
            let _ = disable_raw_mode();
            Err(err).context("failed to create terminal")
        }
    }
}

fn terminal_viewport(bar: BarPosition, height: u16, screen: ScreenSize) -> TerminalViewport {
    let height = height.min(screen.rows);
    match bar {
        BarPosition::Inline => TerminalViewport::Inline(height),
        BarPosition::Top => TerminalViewport::Fixed(Rect::new(0, 0, screen.columns, height)),
        BarPosition::Bottom => TerminalViewport::Fixed(Rect::new(
            0,
            screen.rows - height,
            screen.columns,
            height,
        )),
    }
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    terminal.clear().context("failed to clear picker")?;
    disable_raw_mode().context("failed to disable raw mode")?;
    terminal.show_cursor().context("failed to show cursor")
}

struct TerminalRenderer {
    terminal: TuiTerminal,
}

impl Renderer for TerminalRenderer {
    fn paint(&mut self, view: &View<'_>) -> Result<()> {
        self.terminal
            .draw(|frame| {
                let area = frame.area();
                render_view(view, area, frame.buffer_mut());
                frame.set_cursor_position(cursor_position(view, area));
            })
            .context("failed to draw picker")?;
        Ok(())
    }
}

fn render_view(view: &View<'_>, area: Rect, buf: &mut Buffer) {
    if view.geometry.is_vertical() {
        Paragraph::new(vertical_rows(view)).render(area, buf);
        if let Some(markers) = scroll_markers(view) {
            render_at_right_edge(&markers, area, buf);
        }
    } else {
        Paragraph::new(horizontal_line(view)).render(area, buf);
        if view.more_after && !view.items.is_empty() {
            render_at_right_edge(MORE_AFTER_LABEL, area, buf);
        }
    }
}

/// Draws a label over whatever already occupies the last columns of the first row.
fn render_at_right_edge(text: &str, area: Rect, buf: &mut Buffer) {
    let width = u16::try_from(text_width(text)).unwrap_or(area.width).min(area.width);
    let mut spans = Vec::new();
    push_label(&mut spans, text, usize::from(width), marker_style());
    let rect = Rect::new(area.x + area.width - width, area.y, width, 1.min(area.height));
    Paragraph::new(Line::from(spans)).render(rect, buf);
}

fn cursor_position(view: &View<'_>, area: Rect) -> Position {
    let column = view.geometry.prompt_width + view.cursor_column;
    let x = u16::try_from(column)
        .unwrap_or(u16::MAX)
        .min(area.width.saturating_sub(1));
    Position::new(area.x + x, area.y)
}

fn horizontal_line(view: &View<'_>) -> Line<'static> {
    let geometry = &view.geometry;
    let mut spans = Vec::new();

    if let Some(prompt) = view.prompt {
        push_label(&mut spans, prompt, geometry.prompt_width, prompt_style());
    }

    if view.items.is_empty() {
        let width = geometry.columns.saturating_sub(geometry.prompt_width);
        push_label(&mut spans, view.query, width, Style::default());
        return Line::from(spans);
    }
    push_label(&mut spans, view.query, geometry.input_width, Style::default());

    if view.more_before {
        push_label(&mut spans, MORE_BEFORE, text_width(MORE_BEFORE), marker_style());
    }

    let mut remaining = geometry.item_span();
    for (index, item) in view.items.iter().enumerate() {
        let width = text_width(item);
        push_label(
            &mut spans,
            item,
            width.min(remaining),
            item_style(view.selected == Some(index)),
        );
        remaining = remaining.saturating_sub(width);
        if remaining == 0 {
            break;
        }
    }

    Line::from(spans)
}

fn vertical_rows(view: &View<'_>) -> Vec<Line<'static>> {
    let geometry = &view.geometry;
    let mut rows = Vec::with_capacity(geometry.lines + 1);

    let mut spans = Vec::new();
    if let Some(prompt) = view.prompt {
        push_label(&mut spans, prompt, geometry.prompt_width, prompt_style());
    }
    let width = geometry.columns.saturating_sub(geometry.prompt_width);
    push_label(&mut spans, view.query, width, Style::default());
    rows.push(Line::from(spans));

    for (index, item) in view.items.iter().take(geometry.lines).enumerate() {
        let mut spans = Vec::new();
        push_label(
            &mut spans,
            item,
            geometry.columns,
            item_style(view.selected == Some(index)),
        );
        rows.push(Line::from(spans));
    }

    rows
}

fn scroll_markers(view: &View<'_>) -> Option<String> {
    if !view.more_before && !view.more_after {
        return None;
    }
    let before = if view.more_before { '^' } else { ' ' };
    let after = if view.more_after { 'v' } else { ' ' };
    Some(format!("{before}{after}"))
}

/// Appends `text` as a `width`-column label: the styled body followed by plain padding.
fn push_label(spans: &mut Vec<Span<'static>>, text: &str, width: usize, style: Style) {
    if let Some(body) = label(text, width) {
        spans.push(Span::styled(body, style));
        spans.push(Span::raw(" ".repeat(PADDING)));
    }
}

/// Body of a label `width` columns wide: the text cut or space-padded to
/// `width - 2` columns, ending in `..` when it did not fit.
fn label(text: &str, width: usize) -> Option<String> {
    if width < MIN_LABEL_WIDTH {
        return None;
    }
    let body_width = width - PADDING;
    let mut body: Vec<char> = text.chars().take(body_width).collect();
    body.resize(body_width, ' ');
    if text_width(text) > width {
        for ch in body.iter_mut().skip(body_width.saturating_sub(2)) {
            *ch = '.';
        }
    }
    Some(body.into_iter().collect())
}

fn prompt_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn marker_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn item_style(selected: bool) -> Style {
    if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    }
}
