use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use ratatui::Terminal;
use ratatui::backend::TestBackend;

use super::*;
use crate::config::Settings;

fn project() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    fs::write(root.join("a.sh"), "#!/bin/sh\necho hi\n").expect("write a.sh");
    fs::write(root.join("b.txt"), "notes\n").expect("write b.txt");
    fs::create_dir(root.join("sub")).expect("mkdir sub");
    fs::write(root.join("sub/inner.txt"), "inner\n").expect("write inner");
    tmp
}

fn settings() -> Settings {
    Settings {
        shell: "sh".into(),
        sort_entries: true,
        ..Settings::default()
    }
}

fn app_with(settings: Settings) -> App<TestBackend> {
    let terminal = Terminal::new(TestBackend::new(120, 30)).expect("terminal");
    let screen = Arc::new(Screen::new(terminal));
    let cfg = Config::new(PathBuf::from("config"), "/home/u", settings);
    App::new(cfg, screen)
}

fn started(dir: &Path) -> App<TestBackend> {
    let mut app = app_with(settings());
    app.start(dir.to_str().expect("utf8 path"));
    app
}

fn press(app: &mut App<TestBackend>, code: KeyCode) {
    app.handle_key(code, KeyModifiers::NONE);
}

fn type_text(app: &mut App<TestBackend>, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c));
    }
}

fn rendered(app: &App<TestBackend>) -> String {
    app.screen()
        .with_terminal(|t| {
            let buf = t.backend().buffer();
            let width = buf.area.width as usize;
            let cells: Vec<&str> = buf.content().iter().map(|c| c.symbol()).collect();
            cells
                .chunks(width)
                .map(|row| row.concat())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .expect("terminal")
}

fn fake_repos(_: &Config, user: &str) -> Result<Vec<String>> {
    assert_eq!(user, "someone");
    Ok(vec!["alpha".into(), "beta".into()])
}

#[test]
fn startup_shows_folder_menu_and_help() {
    let tmp = project();
    let app = started(tmp.path());
    let view = app.screen().view();
    assert_eq!(view.menu_labels(), vec!["a.sh", "b.txt", "sub", "Back", "Quit"]);
    assert_eq!(view.content, HELP);
    assert_eq!(view.focus, Pane::Menu);
    assert_eq!(app.mode(), Mode::FileBrowser);
}

#[test]
fn enter_directory_then_back() {
    let tmp = project();
    let root = tmp.path().to_str().expect("utf8").to_string();
    let mut app = started(tmp.path());

    press(&mut app, KeyCode::Char('j'));
    press(&mut app, KeyCode::Char('j'));
    press(&mut app, KeyCode::Enter);
    let view = app.screen().view();
    assert_eq!(view.menu_labels(), vec!["inner.txt", "Back", "Quit"]);
    assert_eq!(view.content, "");
    assert_eq!(view.footer, format!("{root}/sub"));
    assert_eq!(app.navigator().current_path(), format!("{root}/sub"));

    press(&mut app, KeyCode::Char('b'));
    let view = app.screen().view();
    assert_eq!(view.menu_labels(), vec!["a.sh", "b.txt", "sub", "Back", "Quit"]);
    assert_eq!(view.footer, root);
}

#[test]
fn execute_script_streams_into_content_pane() {
    let tmp = project();
    let script = format!("{}/a.sh", tmp.path().to_str().expect("utf8"));
    let mut app = started(tmp.path());

    press(&mut app, KeyCode::Enter);
    let view = app.screen().view();
    assert_eq!(view.content, "#!/bin/sh\necho hi\n");
    assert_eq!(view.focus, Pane::Contents);
    assert_eq!(app.navigator().selected_path(), Some(script.as_str()));

    press(&mut app, KeyCode::Char('e'));
    let view = app.screen().view();
    assert_eq!(
        view.content,
        format!("Command: chmod +x {script}\nCommand: {script}\nhi")
    );
    assert_eq!(view.footer, "2 command(s), 0 failed");
    assert_eq!(view.busy, None);
}

#[test]
fn execute_without_selection_reports() {
    let tmp = project();
    let mut app = started(tmp.path());
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Char('e'));
    assert_eq!(app.screen().view().content, "No file selected");
}

#[test]
fn folder_input_accepts_directories_only() {
    let tmp = project();
    let root = tmp.path().to_str().expect("utf8").to_string();
    let mut app = started(tmp.path());

    press(&mut app, KeyCode::F(2));
    assert_eq!(app.screen().view().focus, Pane::Input);
    // The input starts out holding the current folder.
    type_text(&mut app, "/b.txt");
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.screen().view().content, "No valid folder entered");

    for _ in 0.."/b.txt".len() {
        press(&mut app, KeyCode::Backspace);
    }
    type_text(&mut app, "/sub");
    press(&mut app, KeyCode::Enter);
    let view = app.screen().view();
    assert_eq!(view.menu_labels(), vec!["inner.txt", "Back", "Quit"]);
    assert_eq!(view.focus, Pane::Menu);
    assert_eq!(app.navigator().current_path(), format!("{root}/sub"));
}

#[test]
fn online_mode_lists_remote_repositories() {
    let tmp = project();
    let mut app = app_with(Settings {
        git_user: Some("someone".into()),
        git_folder: Some(tmp.path().to_str().expect("utf8").into()),
        ..settings()
    })
    .with_repo_lister(fake_repos);
    app.start(tmp.path().to_str().expect("utf8"));

    press(&mut app, KeyCode::BackTab);
    assert_eq!(app.screen().view().focus, Pane::Modes);
    press(&mut app, KeyCode::Char('h'));
    press(&mut app, KeyCode::Char('h'));
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.mode(), Mode::GitOnline);
    assert_eq!(app.screen().view().menu_labels(), vec!["alpha", "beta"]);

    press(&mut app, KeyCode::Char('j'));
    press(&mut app, KeyCode::Enter);
    let view = app.screen().view();
    assert_eq!(view.content, CLONE_HINT);
    assert_eq!(view.footer, "beta");
    assert_eq!(view.focus, Pane::Contents);
}

#[test]
fn online_mode_without_user_reports() {
    let tmp = project();
    let mut app = started(tmp.path()).with_repo_lister(fake_repos);
    press(&mut app, KeyCode::BackTab);
    press(&mut app, KeyCode::Char('h'));
    press(&mut app, KeyCode::Char('h'));
    press(&mut app, KeyCode::Enter);
    let view = app.screen().view();
    assert!(view.menu.is_empty());
    assert_eq!(view.content, "No gituser specified in configs");
}

#[test]
fn quit_entry_and_escape_stop_the_app() {
    let tmp = project();
    let mut app = started(tmp.path());
    press(&mut app, KeyCode::Char('q'));
    assert!(app.should_quit());

    let mut app = started(tmp.path());
    press(&mut app, KeyCode::Esc);
    assert!(app.should_quit());
}

#[test]
fn frame_shows_menu_and_title() {
    let tmp = project();
    let app = started(tmp.path());
    app.screen().redraw().expect("redraw");
    let text = rendered(&app);
    assert!(text.contains(screen::TITLE), "{text}");
    assert!(text.contains("b.txt"), "{text}");
    assert!(text.contains("Back  One level up"), "{text}");
    assert!(text.contains("< File browser >"), "{text}");
}

fn switch_to_online(app: &mut App<TestBackend>) {
    for _ in 0..3 {
        if app.screen().view().focus == Pane::Modes {
            break;
        }
        press(app, KeyCode::Tab);
    }
    assert_eq!(app.screen().view().focus, Pane::Modes);
    press(app, KeyCode::Char('h'));
    press(app, KeyCode::Char('h'));
    press(app, KeyCode::Enter);
    assert_eq!(app.mode(), Mode::GitOnline);
}

// `echo -c <command>` prints the command instead of running it.
fn echo_shell_user() -> Settings {
    Settings {
        git_user: Some("someone".into()),
        shell: "echo".into(),
        ..settings()
    }
}

#[test]
fn clone_key_is_ignored_outside_online_mode() {
    let tmp = project();
    let mut app = started(tmp.path());
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Char('c'));
    let view = app.screen().view();
    assert_eq!(view.content, HELP);
    assert_eq!(view.footer, tmp.path().to_str().expect("utf8"));
}

#[test]
fn clone_without_selected_repo_reports() {
    let tmp = project();
    let mut app = app_with(echo_shell_user()).with_repo_lister(fake_repos);
    app.start(tmp.path().to_str().expect("utf8"));
    switch_to_online(&mut app);
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Char('c'));
    assert_eq!(app.screen().view().content, "No repository selected");
}

#[test]
fn clone_targets_the_browsed_folder() {
    let tmp = project();
    let sub = format!("{}/sub", tmp.path().to_str().expect("utf8"));
    let mut app = app_with(echo_shell_user()).with_repo_lister(fake_repos);
    app.start(tmp.path().to_str().expect("utf8"));

    press(&mut app, KeyCode::Char('j'));
    press(&mut app, KeyCode::Char('j'));
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.navigator().current_path(), sub);

    switch_to_online(&mut app);
    assert_eq!(app.screen().view().input, sub);
    press(&mut app, KeyCode::Char('j'));
    press(&mut app, KeyCode::Enter);
    press(&mut app, KeyCode::Char('c'));

    let clone = format!("git clone https://github.com/someone/beta {sub}/beta");
    let view = app.screen().view();
    assert_eq!(view.content, format!("Command: {clone}\n-c {clone}"));
    assert_eq!(view.footer, "1 command(s), 0 failed");
}

#[test]
fn clone_prefers_the_configured_git_folder() {
    let tmp = project();
    let git = tempfile::tempdir().expect("git dir");
    let git = git.path().to_str().expect("utf8").to_string();
    let mut app = app_with(Settings {
        git_folder: Some(git.clone()),
        ..echo_shell_user()
    })
    .with_repo_lister(fake_repos);
    app.start(tmp.path().to_str().expect("utf8"));

    switch_to_online(&mut app);
    press(&mut app, KeyCode::Enter);
    press(&mut app, KeyCode::Char('c'));
    let clone = format!("git clone https://github.com/someone/alpha {git}/alpha");
    assert_eq!(
        app.screen().view().content,
        format!("Command: {clone}\n-c {clone}")
    );
}

#[test]
fn execute_is_ignored_in_online_mode() {
    let tmp = project();
    let mut app = app_with(echo_shell_user()).with_repo_lister(fake_repos);
    app.start(tmp.path().to_str().expect("utf8"));
    press(&mut app, KeyCode::Enter);
    assert!(app.navigator().selected_path().is_some());

    switch_to_online(&mut app);
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Char('e'));
    let view = app.screen().view();
    assert_eq!(view.content, "#!/bin/sh\necho hi\n");
    assert!(!view.footer.contains("command(s)"), "{}", view.footer);
}

#[test]
fn content_scroll_is_clamped_to_the_last_page() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let text: String = (0..60).map(|i| format!("line {i}\n")).collect();
    fs::write(tmp.path().join("long.txt"), text).expect("write long.txt");
    let mut app = started(tmp.path());

    press(&mut app, KeyCode::Enter);
    assert_eq!(app.screen().view().focus, Pane::Contents);
    // 30 rows minus header, footer and the pane border.
    assert_eq!(app.screen().view().content_height, 24);
    for _ in 0..100 {
        press(&mut app, KeyCode::Char('j'));
    }
    assert_eq!(app.screen().view().content_scroll, 36);
    press(&mut app, KeyCode::Char('k'));
    assert_eq!(app.screen().view().content_scroll, 35);
}
