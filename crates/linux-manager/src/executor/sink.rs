use std::io::{self, Write};
use std::sync::Mutex;

/// Text surface the executor and the navigator write into. Implementations
/// redraw (or print) on every call.
pub trait OutputSink: Send + Sync {
    fn append(&self, line: &str);
    fn replace(&self, text: &str);
}

/// Headless sink: prints each line once even though the executor keeps
/// republishing the whole transcript.
#[derive(Default)]
pub struct StdoutSink {
    shown: Mutex<Vec<String>>,
}

impl StdoutSink {
    fn print_lines<'a>(lines: impl Iterator<Item = &'a str>) {
        let mut out = io::stdout().lock();
        for line in lines {
            let _ = writeln!(out, "{line}");
        }
        let _ = out.flush();
    }
}

impl OutputSink for StdoutSink {
    fn append(&self, line: &str) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(line.to_string());
        }
        Self::print_lines(std::iter::once(line));
    }

    fn replace(&self, text: &str) {
        let next = split_lines(text);
        let Ok(mut shown) = self.shown.lock() else {
            return;
        };
        let keep = already_shown(&shown, &next);
        Self::print_lines(next[keep..].iter().map(String::as_str));
        *shown = next;
    }
}

#[derive(Default)]
struct MemoryState {
    text: String,
    writes: Vec<String>,
}

/// Keeps the current text plus every state it went through.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn text(&self) -> String {
        self.state
            .lock()
            .map(|s| s.text.clone())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        split_lines(&self.text())
    }

    /// Every text the sink has displayed, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.writes.clone())
            .unwrap_or_default()
    }
}

impl OutputSink for MemorySink {
    fn append(&self, line: &str) {
        if let Ok(mut s) = self.state.lock() {
            if !s.text.is_empty() {
                s.text.push('\n');
            }
            s.text.push_str(line);
            let snapshot = s.text.clone();
            s.writes.push(snapshot);
        }
    }

    fn replace(&self, text: &str) {
        if let Ok(mut s) = self.state.lock() {
            s.text = text.to_string();
            s.writes.push(text.to_string());
        }
    }
}

// Lines of `next` that were printed before: all of `shown` when it is a
// prefix of `next`, none when the text was replaced.
fn already_shown(shown: &[String], next: &[String]) -> usize {
    if next.starts_with(shown) { shown.len() } else { 0 }
}

// Inverse of joining a transcript with '\n': a trailing empty line survives.
fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(ToOwned::to_owned).collect()
}
