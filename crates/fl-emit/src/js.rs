//! Inline JavaScript embedding.

use fl_process::CommandRunner;

/// Maximum length of one embedded JavaScript line after wrapping.
const WRAP_WIDTH: usize = 500;

/// Indent applied to embedded payload lines (under `script: |`).
const PAYLOAD_INDENT: usize = 12;

/// Strip `//` and `/* */` comments, respecting string and template
/// literals and escape sequences.
pub fn strip_js_comments(source: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str(char),
    }
    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        state = State::LineComment;
                    }
                    Some('*') => {
                        chars.next();
                        state = State::BlockComment;
                    }
                    _ => out.push(c),
                },
                '"' | '\'' | '`' => {
                    state = State::Str(c);
                    out.push(c);
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                }
            }
            State::Str(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == quote {
                    state = State::Code;
                }
            }
        }
    }
    out
}

/// Wrap long lines at safe JavaScript boundaries (`;`, `,`, `{`, `}`) so
/// no line exceeds [`WRAP_WIDTH`] bytes.
pub fn wrap_js_lines(source: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in source.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.len() <= WRAP_WIDTH {
            out.push(line.to_string());
            continue;
        }
        let mut rest = line;
        while rest.len() > WRAP_WIDTH {
            // A multi-byte character may straddle the wrap width; back
            // the window up to the previous char boundary.
            let limit = floor_char_boundary(rest, WRAP_WIDTH);
            let window = &rest[..limit];
            let split = window
                .rfind([';', ',', '{', '}'])
                .map(|i| i + 1)
                .unwrap_or(limit);
            out.push(rest[..split].to_string());
            rest = &rest[split..];
        }
        if !rest.is_empty() {
            out.push(rest.to_string());
        }
    }
    out
}

/// Largest char-boundary index not exceeding `index`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut boundary = index;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

/// Prepare a JS payload for embedding under a `script: |` key: strip
/// comments, optionally minify through terser, wrap, and indent.
///
/// `runner` of `None` (or a failed terser invocation) embeds the
/// comment-stripped source unminified.
pub fn embed_js(source: &str, runner: Option<&dyn CommandRunner>) -> String {
    let stripped = strip_js_comments(source);
    let minified = runner
        .and_then(|r| fl_process::terser_minify(r, &stripped))
        .unwrap_or(stripped);
    let pad = " ".repeat(PAYLOAD_INDENT);
    wrap_js_lines(&minified)
        .into_iter()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
