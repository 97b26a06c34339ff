// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

fn is_splitter(b: u8) -> bool {
    matches!(
        b,
        b',' | b'(' | b')' | b'|' | b' ' | b'\t' | b'\n' | b'\r' |
        0xB | // vertical tab 
        0xC // form feed
    )
}

fn is_numeric_litteral_prefix(bytes: &[u8], start: usize) -> bool {
    matches!(
        bytes[start],
        b'0' | b'1' | b'2' | b'3' | b'4' | b'5' | b'6' | b'7' | b'8' | b'9' | b'-' | b'+' | b'.'
    ) && !(start + 1 < bytes.len() && bytes[start] == b'-' && bytes[start + 1] == b'-')
}

fn is_hex_litteral_prefix(bytes: &[u8], start: usize, end: usize) -> bool {
    (bytes[start] | b' ') == b'x' && start + 1 < end && bytes[start + 1] == b'\''
}

fn is_quoted(bytes: &[u8], start: usize, end: usize) -> bool {
    bytes[start] == b'\'' && bytes[end - 1] == b'\''
}

/// Obfuscates an sql string by replacing litterals with '?' chars.
///
/// The algorithm works by finding the places where a litteral could start (so called splitters)
/// and then identifies them by looking at their first few characters.
///
/// It does not attempt at rigorous parsing of the SQL syntax, and does not take any context
/// sensitive decision, contrary to the more exhaustive datadog-agent implementation.
///
/// based off
/// <https://github.com/DataDog/dd-trace-java/blob/36e924eaa/internal-api/src/main/java/datadog/trace/api/normalize/SQLNormalizer.java>
pub fn obfuscate_sql_string(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut obfuscated = String::new();
    if s.is_empty() {
        return obfuscated;
    }
    let mut start = 0;
    loop {
        if start >= s.len() {
            break;
        }
        let end = next_splitter(bytes, start).unwrap_or(s.len());
        #[allow(clippy::comparison_chain)]
        if start + 1 == end {
            // if the gap is 1 character it can only be a number
            if bytes[start].is_ascii_digit() {
                obfuscated.push('?');
            } else {
                obfuscated.push_str(&s[start..end]);
            }
        } else if start + 1 < end {
            if is_numeric_litteral_prefix(bytes, start)
                || is_quoted(bytes, start, end)
                || is_hex_litteral_prefix(bytes, start, end)
            {
                obfuscated.push('?');
            } else {
                obfuscated.push_str(&s[start..end]);
            }
        }
        if end < s.len() {
            obfuscated.push(bytes[end] as char);
        }
        start = end + 1;
    }
    obfuscated
}

fn next_splitter(s: &[u8], at: usize) -> Option<usize> {
    let mut quoted = false;
    let mut escaped = false;
    for (pos, b) in s.iter().copied().enumerate().skip(at) {
        if b == b'\'' && !escaped {
            quoted = !quoted;
            continue;
        }
        escaped = (b == b'\\') && !escaped;
        if !quoted && is_splitter(b) {
            return Some(pos);
        }
    }
    None
}
