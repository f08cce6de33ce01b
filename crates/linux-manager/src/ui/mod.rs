use std::io::{self, Stdout};
use std::panic;
use std::sync::Arc;
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use tracing::{info, warn};

use crate::actions;
use crate::config::{Config, expand_tilde};
use crate::error::{Error, Result};
use crate::executor::{CommandList, Executor, OutputSink};
use crate::navigator::{Activation, EntryKind, MenuEntry, Navigator, classify};
use crate::repos;

mod screen;

use screen::add_signed_saturating;

pub use screen::{MenuRow, Mode, Pane, Screen, View, draw, visible_start};

pub type RepoLister = fn(&Config, &str) -> Result<Vec<String>>;

const HELP: &str = "Help
c: Clone selected repo into destination
e: Execute selected script
ESC: Quit program
F1: Open Help
F2: Switch to input field
Tab/Shift+Tab: Switch focus between menu, contents and mode";

const CLONE_HINT: &str = "To clone the repository, enter c.";

/// Session state around the navigator and the executor. Key handling is
/// single threaded; running commands blocks it until the run is over.
pub struct App<B: Backend + Send + 'static> {
    config: Config,
    screen: Arc<Screen<B>>,
    navigator: Navigator,
    executor: Executor,
    list_repos: RepoLister,
    mode: Mode,
    repos: Vec<String>,
    selected_repo: Option<String>,
    clone_dest: String,
    quit: bool,
}

impl<B: Backend + Send + 'static> App<B> {
    pub fn new(config: Config, screen: Arc<Screen<B>>) -> Self {
        let sink: Arc<dyn OutputSink> = screen.clone();
        let executor = Executor::new(config.settings.shell.clone(), sink);
        let navigator = Navigator::new(config.settings.sort_entries);
        let clone_dest = config.start_folder();
        Self {
            config,
            screen,
            navigator,
            executor,
            list_repos: repos::list,
            mode: Mode::FileBrowser,
            repos: Vec::new(),
            selected_repo: None,
            clone_dest,
            quit: false,
        }
    }

    pub fn with_repo_lister(mut self, lister: RepoLister) -> Self {
        self.list_repos = lister;
        self
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn screen(&self) -> &Screen<B> {
        &self.screen
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn start(&mut self, folder: &str) {
        let mode_cursor = mode_index(Mode::FileBrowser);
        self.screen.update(|v| {
            v.input_placeholder = folder.to_string();
            v.footer = folder.to_string();
            v.mode_cursor = mode_cursor;
            v.focus = Pane::Menu;
        });
        self.open_folder(Mode::FileBrowser, folder);
        if self.screen.view().content.is_empty() {
            self.show_help();
        }
    }

    pub fn handle_key(&mut self, code: KeyCode, mods: KeyModifiers) {
        if let Err(e) = self.dispatch_key(code, mods) {
            warn!(error = %e, "key action failed");
            self.screen.show(&e.to_string());
        }
        let _ = self.screen.redraw();
    }

    fn dispatch_key(&mut self, code: KeyCode, mods: KeyModifiers) -> Result<()> {
        if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
            self.quit = true;
            return Ok(());
        }
        match code {
            KeyCode::Esc => {
                self.quit = true;
                return Ok(());
            }
            KeyCode::F(1) => {
                self.show_help();
                return Ok(());
            }
            KeyCode::F(2) => {
                self.focus(Pane::Input);
                return Ok(());
            }
            KeyCode::Tab => {
                let next = self.screen.view().focus.next();
                self.focus(next);
                return Ok(());
            }
            KeyCode::BackTab => {
                let prev = self.screen.view().focus.prev();
                self.focus(prev);
                return Ok(());
            }
            _ => {}
        }

        match self.screen.view().focus {
            Pane::Input => match code {
                KeyCode::Enter => self.submit_folder(),
                KeyCode::Backspace => self.screen.update(|v| {
                    v.input.pop();
                }),
                KeyCode::Char(c) => self.screen.update(|v| v.input.push(c)),
                _ => {}
            },
            Pane::Menu => match code {
                KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
                KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
                KeyCode::Enter => self.activate_selected(),
                KeyCode::Char(c @ ('b' | 'q')) => self.activate_shortcut(c),
                _ => {}
            },
            Pane::Contents => match code {
                KeyCode::Down | KeyCode::Char('j') => self.scroll(1),
                KeyCode::Up | KeyCode::Char('k') => self.scroll(-1),
                KeyCode::PageDown => self.scroll(10),
                KeyCode::PageUp => self.scroll(-10),
                KeyCode::Home => self.screen.update(|v| {
                    v.follow_tail = false;
                    v.content_scroll = 0;
                }),
                KeyCode::End => self.screen.update(|v| v.follow_tail = true),
                KeyCode::Char('e') => self.execute_selected()?,
                KeyCode::Char('c') => self.clone_selected()?,
                _ => {}
            },
            Pane::Modes => match code {
                KeyCode::Right | KeyCode::Char('l') => self.move_mode_cursor(1),
                KeyCode::Left | KeyCode::Char('h') => self.move_mode_cursor(-1),
                KeyCode::Enter => {
                    let idx = self.screen.view().mode_cursor;
                    self.select_mode(Mode::ALL[idx.min(Mode::ALL.len() - 1)]);
                }
                _ => {}
            },
        }
        Ok(())
    }

    fn focus(&self, pane: Pane) {
        self.screen.update(|v| v.focus = pane);
    }

    fn show_help(&self) {
        self.screen.show(HELP);
    }

    fn sync_menu(&self) {
        let rows: Vec<MenuRow> = match self.mode {
            Mode::GitOnline => self
                .repos
                .iter()
                .map(|name| MenuRow {
                    label: name.clone(),
                    hint: None,
                })
                .collect(),
            Mode::GitOffline | Mode::FileBrowser => self
                .navigator
                .entries()
                .iter()
                .map(|e| MenuRow {
                    label: e.label().to_string(),
                    hint: e.hint().map(ToOwned::to_owned),
                })
                .collect(),
        };
        self.screen.update(|v| {
            v.menu = rows;
            v.menu_selected = 0;
        });
    }

    fn move_selection(&self, delta: isize) {
        self.screen.update(|v| {
            let last = v.menu.len().saturating_sub(1);
            v.menu_selected = add_signed_saturating(v.menu_selected, delta).min(last);
        });
    }

    fn move_mode_cursor(&self, delta: isize) {
        self.screen.update(|v| {
            v.mode_cursor =
                add_signed_saturating(v.mode_cursor, delta).min(Mode::ALL.len() - 1);
        });
    }

    fn scroll(&self, delta: isize) {
        self.screen.update(|v| v.scroll_content(delta));
    }

    fn activate_shortcut(&mut self, c: char) {
        if self.mode == Mode::GitOnline {
            return;
        }
        let target = self.navigator.entries().iter().position(|e| {
            matches!((c, e), ('b', MenuEntry::Back) | ('q', MenuEntry::Quit))
        });
        if let Some(idx) = target {
            self.screen.update(|v| v.menu_selected = idx);
            self.activate_selected();
        }
    }

    fn activate_selected(&mut self) {
        let idx = self.screen.view().menu_selected;
        if self.mode == Mode::GitOnline {
            self.select_repo(idx);
            return;
        }

        let res = self.navigator.activate(idx, self.screen.as_ref());
        match res {
            Ok(Activation::Quit) => self.quit = true,
            Ok(act) => {
                let footer = act.footer().unwrap_or_default().to_string();
                let opened = matches!(act, Activation::Opened { .. });
                if !opened {
                    self.sync_menu();
                }
                self.screen.update(|v| {
                    v.footer = footer;
                    if opened {
                        v.focus = Pane::Contents;
                        v.follow_tail = false;
                        v.content_scroll = 0;
                    }
                });
            }
            Err(e) => {
                // A failed populate still rebuilt the menu down to Back/Quit.
                self.sync_menu();
                self.screen.show(&e.to_string());
            }
        }
    }

    fn select_repo(&mut self, idx: usize) {
        let Some(name) = self.repos.get(idx).cloned() else {
            return;
        };
        self.selected_repo = Some(name.clone());
        self.screen.update(|v| {
            v.footer = name;
            v.focus = Pane::Contents;
        });
        self.screen.show(CLONE_HINT);
    }

    fn submit_folder(&mut self) {
        let view = self.screen.view();
        let raw = if view.input.trim().is_empty() {
            view.input_placeholder
        } else {
            view.input.trim().to_string()
        };
        let folder = expand_tilde(&raw, &self.config.home);
        info!(%folder, "folder entered");
        match classify(&folder) {
            Ok(EntryKind::Directory) => {
                let mode = if self.mode == Mode::GitOnline {
                    Mode::FileBrowser
                } else {
                    self.mode
                };
                self.open_folder(mode, &folder);
                self.focus(Pane::Menu);
            }
            _ => self.screen.show("No valid folder entered"),
        }
    }

    fn open_folder(&mut self, mode: Mode, folder: &str) {
        self.mode = mode;
        self.selected_repo = None;
        let res = self.navigator.populate(folder);
        self.sync_menu();
        self.screen.update(|v| {
            v.input = folder.to_string();
            v.footer = folder.to_string();
        });
        if let Err(e) = res {
            self.screen.show(&e.to_string());
        }
    }

    fn select_mode(&mut self, mode: Mode) {
        let cursor = mode_index(mode);
        self.screen.update(|v| {
            v.mode_cursor = cursor;
            v.focus = Pane::Menu;
        });
        match mode {
            Mode::GitOnline => self.load_remote_repos(),
            Mode::GitOffline => {
                let folder = self
                    .config
                    .git_folder()
                    .unwrap_or_else(|| self.config.start_folder());
                self.open_folder(Mode::GitOffline, &folder);
            }
            Mode::FileBrowser => {
                let folder = self.config.start_folder();
                self.open_folder(Mode::FileBrowser, &folder);
            }
        }
    }

    fn load_remote_repos(&mut self) {
        self.mode = Mode::GitOnline;
        self.selected_repo = None;
        self.clone_dest = match self.config.git_folder() {
            Some(folder) => folder,
            None if !self.navigator.current_path().is_empty() => {
                self.navigator.current_path().to_string()
            }
            None => self.config.start_folder(),
        };
        let dest = self.clone_dest.clone();
        self.screen.update(|v| v.input = dest);

        let Some(user) = self.config.git_user().map(ToOwned::to_owned) else {
            self.repos.clear();
            self.sync_menu();
            self.screen.show("No gituser specified in configs");
            return;
        };
        self.screen.update(|v| v.busy = Some(format!("fetching repositories of {user}")));
        let _ = self.screen.redraw();
        let res = (self.list_repos)(&self.config, &user);
        self.screen.update(|v| v.busy = None);
        match res {
            Ok(names) => {
                info!(user = %user, count = names.len(), "repository list loaded");
                self.repos = names;
                self.sync_menu();
            }
            Err(e) => {
                self.repos.clear();
                self.sync_menu();
                self.screen.show(&e.to_string());
            }
        }
    }

    fn execute_selected(&mut self) -> Result<()> {
        // The selection belongs to the browser; the repo list has none.
        if self.mode == Mode::GitOnline {
            return Ok(());
        }
        let Some(path) = self.navigator.selected_path().map(ToOwned::to_owned) else {
            return Err(Error::msg("No file selected"));
        };
        if classify(&path)? != EntryKind::File {
            return Err(Error::msg(format!("{path} is not a file")));
        }
        let commands = actions::execute_script(&path)?;
        self.run_commands(&commands);
        Ok(())
    }

    fn clone_selected(&mut self) -> Result<()> {
        if self.mode != Mode::GitOnline {
            return Ok(());
        }
        let Some(name) = self.selected_repo.clone() else {
            return Err(Error::msg("No repository selected"));
        };
        let commands = actions::clone_repo(&self.config, &name, &self.clone_dest)?;
        self.run_commands(&commands);
        Ok(())
    }

    fn run_commands(&mut self, commands: &CommandList) {
        let count = commands.len();
        self.screen.update(|v| {
            v.follow_tail = true;
            v.busy = Some(format!("running {count} command(s)"));
        });
        let report = self.executor.run(commands);
        let summary = format!(
            "{} command(s), {} failed",
            report.outcomes.len(),
            report.failed()
        );
        info!(%summary, "run finished");
        self.screen.update(|v| {
            v.busy = None;
            v.footer = summary;
        });
    }
}

fn mode_index(mode: Mode) -> usize {
    Mode::ALL.iter().position(|m| *m == mode).unwrap_or(0)
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
}

fn install_panic_hook() {
    let original = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        restore_terminal();
        original(info);
    }));
}

pub fn run_tui(config: Config, start: Option<String>) -> Result<()> {
    let folder = start
        .map(|s| expand_tilde(&s, &config.home))
        .unwrap_or_else(|| config.start_folder());

    install_panic_hook();
    let mut stdout = io::stdout();
    enable_raw_mode().map_err(|e| Error::msg(e.to_string()))?;
    if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
        restore_terminal();
        return Err(Error::msg(e.to_string()));
    }
    let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(t) => t,
        Err(e) => {
            restore_terminal();
            return Err(Error::msg(e.to_string()));
        }
    };

    let screen = Arc::new(Screen::new(terminal));
    let mut app = App::new(config, screen);
    app.start(&folder);
    let result = run_loop(&mut app);

    restore_terminal();
    result
}

fn run_loop(app: &mut App<CrosstermBackend<Stdout>>) -> Result<()> {
    let tick = Duration::from_millis(250);
    app.screen().with_terminal(|t| t.clear())?.map_err(|e| Error::msg(e.to_string()))?;
    loop {
        app.screen().redraw()?;
        if app.should_quit() {
            return Ok(());
        }
        // Poll with a timeout so the header clock keeps ticking.
        if !event::poll(tick).map_err(|e| Error::msg(e.to_string()))? {
            continue;
        }
        match event::read().map_err(|e| Error::msg(e.to_string()))? {
            Event::Key(k) if k.kind == KeyEventKind::Press => app.handle_key(k.code, k.modifiers),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests;
