//! Post-processing for grammars that derive indentation-significant text.
//!
//! BNF cannot express indentation directly, so such grammars emit `{:` / `:}`
//! as block open/close markers and the literal two-character token `\n` as a
//! line break. A single left-to-right scan rewrites those markers into real
//! newlines with two spaces of indentation per nesting level. A close marker
//! dedents the line it terminates.

const INDENT_IN: &str = "{:";
const INDENT_OUT: &str = ":}";
const NEWLINE: &str = "\\n";
const INDENT: &str = "  ";

/// Escape sequences usable in rule bodies where the raw character would
/// collide with grammar syntax (`<`, `>`, `|`). Longest matches first.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("\\le", "<="),
    ("\\ge", ">="),
    ("\\l", "<"),
    ("\\g", ">"),
    ("\\eb", "|"),
];

/// Applies substitutions and the indentation pass, dropping blank lines.
pub fn apply(raw: &str) -> String {
    let mut text = raw.to_string();
    for (from, to) in SUBSTITUTIONS {
        text = text.replace(from, to);
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut marker_started = false;
    let mut level = 0usize;

    let mut i = 0;
    while i < text.len() {
        match text.get(i..i + 2) {
            Some(INDENT_IN) => {
                flush(&mut lines, &mut current, marker_started, level, false);
                level += 1;
                marker_started = true;
                i += 2;
            }
            Some(INDENT_OUT) => {
                level = level.saturating_sub(1);
                flush(&mut lines, &mut current, marker_started, level, true);
                marker_started = true;
                i += 2;
            }
            Some(NEWLINE) => {
                flush(&mut lines, &mut current, marker_started, level, false);
                marker_started = true;
                i += 2;
            }
            _ => {
                // UTF-8 safe single-character step.
                let ch = text[i..].chars().next().unwrap_or('\0');
                current.push(ch);
                i += ch.len_utf8().max(1);
            }
        }
    }
    flush(&mut lines, &mut current, marker_started, level, false);

    lines.join("\n")
}

/// Emits the pending line. Lines opened by a marker get their incidental
/// leading whitespace replaced by the indentation for `level`; lines closed
/// by `:}` are right-trimmed; blank lines are dropped.
fn flush(
    lines: &mut Vec<String>,
    current: &mut String,
    marker_started: bool,
    level: usize,
    trim_end: bool,
) {
    let mut line = std::mem::take(current);
    if trim_end {
        line.truncate(line.trim_end().len());
    }
    if marker_started {
        let body = line.trim_start();
        if body.is_empty() {
            return;
        }
        line = format!("{}{}", INDENT.repeat(level), body);
    } else if line.trim().is_empty() {
        return;
    }
    lines.push(line);
}

#[cfg(test)]
mod tests {
    use super::apply;

    #[test]
    fn reference_block_is_reproduced_byte_for_byte() {
        assert_eq!(apply("if x {: return 1\\nend :}"), "if x \n  return 1\nend");
    }

    #[test]
    fn comparison_escapes_are_substituted() {
        assert_eq!(apply("a \\le b"), "a <= b");
        assert_eq!(apply("a \\ge b"), "a >= b");
        assert_eq!(apply("a \\l b \\g c"), "a < b > c");
        assert_eq!(apply("x \\eb y"), "x | y");
    }

    #[test]
    fn nested_blocks_indent_two_spaces_per_level() {
        let out = apply("while a:{:\\nif b:{:\\nstop()\\n:}\\ndone()\\n:}");
        assert_eq!(out, "while a:\n  if b:\n    stop()\n  done()");
    }

    #[test]
    fn blank_lines_are_stripped() {
        assert_eq!(apply("a\\n\\n\\nb"), "a\nb");
        assert_eq!(apply("\\na"), "a");
    }

    #[test]
    fn text_without_markers_is_unchanged() {
        assert_eq!(apply("x + y * 2"), "x + y * 2");
    }

    #[test]
    fn unbalanced_close_markers_saturate_at_column_zero() {
        assert_eq!(apply("a:}b:}c"), "a\nb\nc");
    }
}
