use std::borrow::Cow;

/// Normalises an untrusted title for the subscription list and the terminal.
///
/// - Drops ASCII/Unicode control characters and ANSI CSI sequences (`\x1b[...m`)
/// - Turns every whitespace run (including newlines and tabs) into one space
/// - Trims both ends
///
/// Returns `Cow::Borrowed` when the input is already clean (common case).
pub fn sanitize_title(s: &str) -> Cow<'_, str> {
    let clean = s.trim() == s
        && !s.contains("  ")
        && !s.chars().any(|c| c.is_control() || (c.is_whitespace() && c != ' '));
    if clean {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.next_if_eq(&'[').is_some() {
                // CSI: parameter bytes up to and including a final byte in '@'..='~'
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            continue;
        }

        if c.is_whitespace() {
            out.push(' ');
        } else if !c.is_control() {
            out.push(c);
        }
    }

    Cow::Owned(out.split_whitespace().collect::<Vec<_>>().join(" "))
}
