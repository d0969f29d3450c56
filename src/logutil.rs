//! Sanitization for device-supplied strings headed into the log.
//! The robot controls the bytes it sends; escaping keeps a hostile or
//! merely chatty peripheral from breaking log lines.

/// Escape a string for single-line logging:
/// - `\n` => `\\n`, `\r` => `\\r`, `\t` => `\\t`
/// - backslash => `\\\\`
/// - other control characters => `\xNN`
///
/// Input longer than the preview cap is truncated with an ellipsis.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 256;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_log;

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_log("STATUS:OK\r\n"), "STATUS:OK\\r\\n");
        assert_eq!(escape_log("a\x1bb"), "a\\x1Bb");
    }

    #[test]
    fn long_input_is_truncated() {
        let long = "x".repeat(400);
        let out = escape_log(&long);
        assert!(out.ends_with('…'));
        assert!(out.chars().count() < 300);
    }
}
