use std::sync::Mutex;

use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph};

use crate::error::{Error, Result};
use crate::executor::OutputSink;
use crate::sanitize::sanitize_text;

pub const TITLE: &str = "Nomispaz linux manager";
pub const MENU_WIDTH: u16 = 40;
const HEADER_ROWS: u16 = 2;
const FOOTER_ROWS: u16 = 2;

const FOCUSED: Color = Color::Blue;
const UNFOCUSED: Color = Color::DarkGray;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Menu,
    Contents,
    Modes,
    Input,
}

impl Pane {
    // Tab order. The folder input is only reachable through F2.
    pub fn next(self) -> Self {
        match self {
            Pane::Menu => Pane::Contents,
            Pane::Contents => Pane::Modes,
            Pane::Modes | Pane::Input => Pane::Menu,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Pane::Contents | Pane::Input => Pane::Menu,
            Pane::Menu => Pane::Modes,
            Pane::Modes => Pane::Contents,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    GitOnline,
    GitOffline,
    FileBrowser,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::GitOnline, Mode::GitOffline, Mode::FileBrowser];

    pub fn label(self) -> &'static str {
        match self {
            Mode::GitOnline => "Git repos online",
            Mode::GitOffline => "Git repos offline",
            Mode::FileBrowser => "File browser",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRow {
    pub label: String,
    pub hint: Option<String>,
}

/// Everything the frame is drawn from.
#[derive(Debug, Clone, Default)]
pub struct View {
    pub menu: Vec<MenuRow>,
    pub menu_selected: usize,
    pub content: String,
    pub content_scroll: usize,
    pub follow_tail: bool,
    pub footer: String,
    pub focus: Pane,
    pub mode_cursor: usize,
    pub input: String,
    pub input_placeholder: String,
    pub busy: Option<String>,
    /// Text rows inside the content pane as of the last redraw.
    pub content_height: usize,
}

impl View {
    pub fn menu_labels(&self) -> Vec<String> {
        self.menu.iter().map(|r| r.label.clone()).collect()
    }

    /// Number of lines the content pane renders.
    pub fn content_lines(&self) -> usize {
        self.content.lines().count()
    }

    /// First content line currently on screen.
    pub fn content_start(&self) -> usize {
        visible_start(
            self.content_lines(),
            self.content_height,
            self.content_scroll,
            self.follow_tail,
        )
    }

    /// Move the content window by `delta` lines and stop following the
    /// tail. The window never starts past the last full page.
    pub fn scroll_content(&mut self, delta: isize) {
        let max = self.content_lines().saturating_sub(self.content_height);
        let start = self.content_start();
        self.follow_tail = false;
        self.content_scroll = add_signed_saturating(start, delta).min(max);
    }
}

/// Display surface shared by the key handler and the command output reader.
/// Every write through [`OutputSink`] redraws the whole frame.
pub struct Screen<B: Backend> {
    view: Mutex<View>,
    terminal: Mutex<Terminal<B>>,
}

impl<B: Backend> Screen<B> {
    pub fn new(terminal: Terminal<B>) -> Self {
        Self {
            view: Mutex::new(View::default()),
            terminal: Mutex::new(terminal),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut View)) {
        if let Ok(mut v) = self.view.lock() {
            f(&mut v);
        }
    }

    pub fn view(&self) -> View {
        self.view.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn redraw(&self) -> Result<()> {
        let mut term = self
            .terminal
            .lock()
            .map_err(|_| Error::msg("terminal lock poisoned"))?;
        let size = term
            .size()
            .map_err(|e| Error::msg(format!("terminal size unavailable: {e}")))?;
        self.update(|v| v.content_height = content_rows(size.height));
        let view = self.view();
        term.draw(|f| draw(f, &view))
            .map_err(|e| Error::msg(format!("draw failed: {e}")))?;
        Ok(())
    }

    pub fn with_terminal<T>(&self, f: impl FnOnce(&mut Terminal<B>) -> T) -> Result<T> {
        let mut term = self
            .terminal
            .lock()
            .map_err(|_| Error::msg("terminal lock poisoned"))?;
        Ok(f(&mut term))
    }

    /// Replace the content pane from the top (file contents, help, errors).
    pub fn show(&self, text: &str) {
        self.update(|v| {
            v.content = text.to_string();
            v.content_scroll = 0;
            v.follow_tail = false;
        });
        let _ = self.redraw();
    }
}

impl<B: Backend + Send> OutputSink for Screen<B> {
    fn append(&self, line: &str) {
        self.update(|v| {
            if !v.content.is_empty() {
                v.content.push('\n');
            }
            v.content.push_str(line);
        });
        let _ = self.redraw();
    }

    fn replace(&self, text: &str) {
        self.update(|v| {
            v.content = text.to_string();
            if !v.follow_tail {
                v.content_scroll = 0;
            }
        });
        let _ = self.redraw();
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused { FOCUSED } else { UNFOCUSED }))
}

pub fn draw(f: &mut ratatui::Frame, view: &View) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_ROWS),
            Constraint::Min(0),
            Constraint::Length(FOOTER_ROWS),
        ])
        .split(f.area());
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(MENU_WIDTH), Constraint::Min(0)])
        .split(rows[1]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(cols[0]);

    draw_header(f, rows[0], view);
    draw_modes(f, left[0], view);
    draw_input(f, left[1], view);
    draw_menu(f, left[2], view);
    draw_content(f, cols[1], view);
    draw_footer(f, rows[2], view);
}

fn draw_header(f: &mut ratatui::Frame, area: Rect, view: &View) {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut spans = vec![
        Span::styled(TITLE, Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled(now, Style::default().fg(Color::Yellow)),
    ];
    if let Some(busy) = view.busy.as_ref() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            busy.clone(),
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(p, area);
}

// Drawn like a drop-down: only the option under the cursor is visible.
fn draw_modes(f: &mut ratatui::Frame, area: Rect, view: &View) {
    let focused = view.focus == Pane::Modes;
    let idx = view.mode_cursor.min(Mode::ALL.len() - 1);
    let arrow = Style::default().fg(if focused { FOCUSED } else { UNFOCUSED });
    let line = Line::from(vec![
        Span::styled("< ", arrow),
        Span::styled(
            Mode::ALL[idx].label(),
            Style::default().fg(Color::Black).bg(Color::LightYellow),
        ),
        Span::styled(" >", arrow),
    ]);
    f.render_widget(Paragraph::new(line).block(pane_block("Mode", focused)), area);
}

fn draw_input(f: &mut ratatui::Frame, area: Rect, view: &View) {
    let focused = view.focus == Pane::Input;
    let text = if view.input.is_empty() && !focused {
        Span::styled(
            view.input_placeholder.clone(),
            Style::default().fg(UNFOCUSED),
        )
    } else if focused {
        Span::raw(format!("{}_", view.input))
    } else {
        Span::raw(view.input.clone())
    };
    let p = Paragraph::new(Line::from(text)).block(pane_block("Select folder", focused));
    f.render_widget(p, area);
}

fn draw_menu(f: &mut ratatui::Frame, area: Rect, view: &View) {
    let focused = view.focus == Pane::Menu;
    let items: Vec<ListItem> = view
        .menu
        .iter()
        .map(|row| {
            let mut spans = vec![Span::raw(row.label.clone())];
            if let Some(hint) = row.hint.as_ref() {
                spans.push(Span::styled(
                    format!("  {hint}"),
                    Style::default().fg(UNFOCUSED),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let fg = if focused { FOCUSED } else { UNFOCUSED };
    let list = List::new(items)
        .style(Style::default().fg(fg))
        .block(pane_block("Menu", focused))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::LightYellow))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if !view.menu.is_empty() {
        state.select(Some(view.menu_selected.min(view.menu.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_content(f: &mut ratatui::Frame, area: Rect, view: &View) {
    let focused = view.focus == Pane::Contents;
    let lines = sanitize_text(&view.content);
    let height = area.height.saturating_sub(2) as usize;
    let start = visible_start(lines.len(), height, view.content_scroll, view.follow_tail);
    let shown: Vec<Line> = lines
        .into_iter()
        .skip(start)
        .take(height)
        .map(Line::from)
        .collect();
    let fg = if focused { FOCUSED } else { UNFOCUSED };
    let p = Paragraph::new(Text::from(shown))
        .style(Style::default().fg(fg))
        .block(pane_block("Contents", focused));
    f.render_widget(p, area);
}

fn draw_footer(f: &mut ratatui::Frame, area: Rect, view: &View) {
    let hint = match view.focus {
        Pane::Menu => "[j/k] Move  [Enter] Open  [b] Back  [q] Quit",
        Pane::Contents => "[j/k PgUp/PgDn] Scroll  [e] Execute  [c] Clone",
        Pane::Modes => "[h/l] Choose  [Enter] Switch mode",
        Pane::Input => "[Enter] Open folder",
    };
    let line = Line::from(vec![
        Span::raw(view.footer.clone()),
        Span::raw("  "),
        Span::styled(
            format!("{hint}  [Tab] Focus  [F1] Help  [Esc] Quit"),
            Style::default().fg(Color::Gray),
        ),
    ]);
    let p = Paragraph::new(line).block(Block::default().borders(Borders::TOP));
    f.render_widget(p, area);
}

// Rows left for text in the content pane of a terminal `height` rows tall:
// header, footer and the pane's own border.
fn content_rows(height: u16) -> usize {
    height.saturating_sub(HEADER_ROWS + FOOTER_ROWS + 2) as usize
}

pub(super) fn add_signed_saturating(base: usize, delta: isize) -> usize {
    if delta >= 0 {
        base.saturating_add(delta as usize)
    } else {
        base.saturating_sub(delta.unsigned_abs())
    }
}

/// First visible line. Following the tail pins the last line to the bottom;
/// otherwise `scroll` counts lines from the top.
pub fn visible_start(total: usize, height: usize, scroll: usize, follow_tail: bool) -> usize {
    let max = total.saturating_sub(height);
    if follow_tail { max } else { scroll.min(max) }
}
