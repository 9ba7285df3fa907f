//! `${key}` token scanning.
//!
//! A token is `${`, a non-empty key, and the next `}`. Keys never span a
//! line break. `${}`, an unterminated `${key` and a `${` whose key would
//! cross a line break are plain text.

const OPEN: &str = "${";
const CLOSE: char = '}';

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// Iterator over the referenced keys of every token in a value, left to
/// right, duplicates included.
#[derive(Debug, Clone)]
pub struct Placeholders<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Placeholders<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            let open = self.rest.find(OPEN)?;
            let after_open = &self.rest[open + OPEN.len()..];
            let Some(close) = after_open.find(CLOSE) else {
                self.rest = "";
                return None;
            };
            let key = &after_open[..close];
            if key.is_empty() || key.contains(is_line_break) {
                // not a token: resume right after the `${`
                self.rest = after_open;
                continue;
            }
            self.rest = &after_open[close + CLOSE.len_utf8()..];
            return Some(key);
        }
    }
}

/// Scan `value` for tokens.
pub fn placeholders(value: &str) -> Placeholders<'_> {
    Placeholders { rest: value }
}

/// True when `value` holds at least one well-formed token.
pub fn contains_placeholder(value: &str) -> bool {
    placeholders(value).next().is_some()
}

/// Distinct referenced keys in order of first appearance.
pub fn referenced_keys(value: &str) -> Vec<&str> {
    let mut keys: Vec<&str> = Vec::new();
    for key in placeholders(value) {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// The literal token text for `key`, e.g. `${db.url}`.
pub fn token(key: &str) -> String {
    format!("{OPEN}{key}{CLOSE}")
}
