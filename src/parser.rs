//! Turning one raw input line into a structured request.
//!
//! The grammar is deliberately tiny: an optional trailing `&`
//! marks a background command, the first `<` and the first `>` each name a
//! redirection target, and everything before the first redirection marker
//! is the text that actually runs. Parsing is pure: the caller's line is
//! never mutated and the result owns its substrings.

/// A single parsed user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command text with the background marker and any redirection suffix
    /// removed. This is what runs, what `jobs` lists, and what termination
    /// reports quote.
    pub text: String,
    /// Whether the line ended with the background marker.
    pub background: bool,
    /// Input redirection target following `<`, if any.
    pub stdin_file: Option<String>,
    /// Output redirection target following `>`, if any.
    pub stdout_file: Option<String>,
}

/// Parse `line` into a [`Request`].
///
/// The background marker is honored only as the final character of the
/// line; after dropping it, at most one preceding space is dropped too.
/// Both redirection scans see the whole background-stripped text, so a
/// pipe appearing after a redirection marker is literal text that never
/// reaches the pipeline splitter.
pub fn parse(line: &str) -> Request {
    let (body, background) = strip_background(line);
    let stdin_file = redirect_target(body, '<');
    let stdout_file = redirect_target(body, '>');
    let text = match body.find(['<', '>']) {
        Some(marker) => &body[..marker],
        None => body,
    };
    Request {
        text: text.to_string(),
        background,
        stdin_file,
        stdout_file,
    }
}

/// Space-separated fields of `text`, consecutive separators collapsed.
/// Only spaces split fields; a tab is an ordinary character.
pub fn fields(text: &str) -> impl Iterator<Item = &str> {
    text.split(' ').filter(|f| !f.is_empty())
}

fn strip_background(line: &str) -> (&str, bool) {
    match line.strip_suffix('&') {
        Some(stripped) => (stripped.strip_suffix(' ').unwrap_or(stripped), true),
        None => (line, false),
    }
}

/// Target of the first `marker` redirection: the text after the marker,
/// skipping at most one adjacent space, up to the next space or the end of
/// the line.
fn redirect_target(body: &str, marker: char) -> Option<String> {
    let after = &body[body.find(marker)? + marker.len_utf8()..];
    let after = after.strip_prefix(' ').unwrap_or(after);
    let target = after.split(' ').next().unwrap_or(after);
    Some(target.to_string())
}
