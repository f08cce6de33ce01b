//! Display-side cleanup of text coming from files and child processes.
//!
//! Escape sequences would otherwise be interpreted by the real terminal
//! underneath ratatui and corrupt the layout.

const MAX_LINE_CHARS: usize = 4096;

#[derive(Clone, Copy)]
enum Escape {
    Start,
    Csi,
    Osc,
    OscEsc,
    String,
    StringEsc,
}

impl Escape {
    // Next state after `c`, `None` once the sequence has ended.
    fn step(self, c: char) -> Option<Escape> {
        match self {
            Escape::Start => match c {
                '[' => Some(Escape::Csi),
                ']' => Some(Escape::Osc),
                'P' | 'X' | '^' | '_' => Some(Escape::String),
                _ => None,
            },
            Escape::Csi => (!('@'..='~').contains(&c)).then_some(Escape::Csi),
            Escape::Osc => match c {
                '\x07' => None,
                '\x1b' => Some(Escape::OscEsc),
                _ => Some(Escape::Osc),
            },
            Escape::OscEsc => match c {
                '\\' => None,
                '\x1b' => Some(Escape::OscEsc),
                _ => Some(Escape::Osc),
            },
            Escape::String => match c {
                '\x1b' => Some(Escape::StringEsc),
                _ => Some(Escape::String),
            },
            Escape::StringEsc => match c {
                '\\' => None,
                '\x1b' => Some(Escape::StringEsc),
                _ => Some(Escape::String),
            },
        }
    }
}

/// Strip escape sequences and control characters from one line. Tabs turn
/// into a space and overlong lines are cut with a marker.
pub fn sanitize_line(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_LINE_CHARS));
    let mut escape: Option<Escape> = None;
    let mut kept = 0usize;

    for c in input.chars() {
        if let Some(state) = escape {
            escape = state.step(c);
            continue;
        }
        match c {
            '\x1b' => {
                escape = Some(Escape::Start);
                continue;
            }
            '\t' => out.push(' '),
            c if c.is_control() || is_format_control(c) => continue,
            c => out.push(c),
        }
        kept += 1;
        if kept >= MAX_LINE_CHARS {
            out.push_str(" ...[truncated]");
            break;
        }
    }
    out
}

/// Line-wise [`sanitize_line`] that keeps the line structure, including
/// empty lines.
pub fn sanitize_text(input: &str) -> Vec<String> {
    input.lines().map(sanitize_line).collect()
}

fn is_format_control(c: char) -> bool {
    matches!(c, '\u{061C}' | '\u{200E}' | '\u{200F}')
        || ('\u{202A}'..='\u{202E}').contains(&c)
        || ('\u{2066}'..='\u{2069}').contains(&c)
}
