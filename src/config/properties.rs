//! Java-style `.properties` parsing.
//!
//! Supported: `#`/`!` comment lines, `=`/`:`/whitespace separators,
//! backslash line continuation, and the `\t \n \r \f \uXXXX` escapes.

use std::str::Chars;

use thiserror::Error;

const WHITESPACE: [char; 3] = [' ', '\t', '\x0c'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line where the offending logical line starts.
    pub line: usize,
    pub message: String,
}

/// Parse `text` into `(key, value)` pairs in file order. Later duplicates
/// are kept; the store's last-write-wins insert settles them.
pub fn parse(text: &str) -> Result<Vec<(String, String)>, ParseError> {
    let mut entries = Vec::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let trimmed = line.trim_start_matches(WHITESPACE);
        if trimmed.is_empty() || trimmed.starts_with(['#', '!']) {
            continue;
        }

        let mut logical = trimmed.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start_matches(WHITESPACE)),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let err = |message: String| ParseError { line: index + 1, message };
        entries.push((unescape(key).map_err(err)?, unescape(value).map_err(err)?));
    }

    Ok(entries)
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split a logical line at the first unescaped separator.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' {
            return (&line[..i], line[i + 1..].trim_start_matches(WHITESPACE));
        } else if WHITESPACE.contains(&c) {
            let rest = line[i..].trim_start_matches(WHITESPACE);
            let rest = rest
                .strip_prefix(['=', ':'])
                .map_or(rest, |r| r.trim_start_matches(WHITESPACE));
            return (&line[..i], rest);
        }
    }
    (line, "")
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => out.push(unicode_escape(&mut chars, raw)?),
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

/// Decode the digits after `\u`, joining a UTF-16 surrogate pair when the
/// high half is directly followed by `\uDCxx`.
fn unicode_escape(chars: &mut Chars<'_>, raw: &str) -> Result<char, String> {
    let malformed = || format!("malformed \\uxxxx encoding in '{raw}'");

    let unit = hex4(chars).ok_or_else(malformed)?;
    if !(0xD800..0xDC00).contains(&unit) {
        return char::from_u32(unit).ok_or_else(malformed);
    }

    let low = match (chars.next(), chars.next()) {
        (Some('\\'), Some('u')) => hex4(chars).ok_or_else(malformed)?,
        _ => return Err(malformed()),
    };
    if !(0xDC00..0xE000).contains(&low) {
        return Err(malformed());
    }
    char::from_u32(0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)).ok_or_else(malformed)
}

fn hex4(chars: &mut Chars<'_>) -> Option<u32> {
    let mut unit = 0;
    for _ in 0..4 {
        unit = unit * 16 + chars.next()?.to_digit(16)?;
    }
    Some(unit)
}
