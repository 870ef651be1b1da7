#![forbid(unsafe_code)]

//! ANSI-aware visible width and truncation.
//!
//! Frame lines mix printable text with SGR runs and OSC 8 hyperlinks.
//! Escape runs contribute zero columns, and truncation must cut on a
//! visible-column boundary while leaving every escape run intact — a
//! dropped `SGR 0` or unclosed OSC 8 would bleed state into the rest of
//! the screen.
//!
//! # Usage
//!
//! ```
//! use weft_render::text::{truncate, visible_width};
//!
//! let line = "\x1b[1mwide text\x1b[0m";
//! assert_eq!(visible_width(line), 9);
//! assert_eq!(truncate(line, 4).as_ref(), "\x1b[1mwide\x1b[0m");
//! ```

use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

/// Escape recognizer states. CSI runs end at a final byte in
/// `0x40..=0x7E`; OSC runs end at BEL or ST (`ESC \`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum EscapeState {
    #[default]
    Ground,
    Escape,
    Csi,
    Osc,
    OscEscape,
}

impl EscapeState {
    /// Advance the recognizer by one character.
    ///
    /// Returns the next state; the character is visible text only when
    /// both the current and next state are `Ground`.
    fn advance(self, c: char) -> EscapeState {
        match self {
            EscapeState::Ground => {
                if c == '\x1b' {
                    EscapeState::Escape
                } else {
                    EscapeState::Ground
                }
            }
            EscapeState::Escape => match c {
                '[' => EscapeState::Csi,
                ']' => EscapeState::Osc,
                // Two-character escape (ESC 7, ESC 8, ESC \ ...).
                _ => EscapeState::Ground,
            },
            EscapeState::Csi => {
                if ('\x40'..='\x7e').contains(&c) {
                    EscapeState::Ground
                } else {
                    EscapeState::Csi
                }
            }
            EscapeState::Osc => match c {
                '\x07' => EscapeState::Ground,
                '\x1b' => EscapeState::OscEscape,
                _ => EscapeState::Osc,
            },
            EscapeState::OscEscape => {
                if c == '\\' {
                    EscapeState::Ground
                } else {
                    EscapeState::Osc
                }
            }
        }
    }
}

/// Width of one visible character in terminal columns.
///
/// East-Asian wide characters count 2, control and combining characters 0.
#[inline]
pub fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Visible column width of a line, treating escape runs as zero-width.
pub fn visible_width(s: &str) -> usize {
    let mut state = EscapeState::Ground;
    let mut width = 0;
    for c in s.chars() {
        let next = state.advance(c);
        if state == EscapeState::Ground && next == EscapeState::Ground {
            width += char_width(c);
        }
        state = next;
    }
    width
}

/// Truncate a line to at most `max_width` visible columns.
///
/// Escape runs are always copied through — including runs after the cut
/// point — so SGR resets and OSC 8 closers survive truncation. A wide
/// character that would cross the boundary is dropped, and once the
/// budget is exhausted no further visible characters are emitted.
///
/// Returns the input unchanged (borrowed) when it already fits.
pub fn truncate(s: &str, max_width: usize) -> Cow<'_, str> {
    if visible_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut state = EscapeState::Ground;
    let mut width = 0;
    let mut exhausted = false;

    for c in s.chars() {
        let next = state.advance(c);
        let visible = state == EscapeState::Ground && next == EscapeState::Ground;
        if visible {
            let w = char_width(c);
            if exhausted || width + w > max_width {
                exhausted = true;
            } else {
                width += w;
                out.push(c);
            }
        } else {
            out.push(c);
        }
        state = next;
    }

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_width() {
        assert_eq!(visible_width("that is multiple"), 16);
        assert_eq!(visible_width(""), 0);
    }

    #[test]
    fn sgr_runs_are_zero_width() {
        assert_eq!(visible_width("\x1b[91mred\x1b[0m"), 3);
        assert_eq!(visible_width("\x1b[38;2;10;20;30mrgb\x1b[0m"), 3);
    }

    #[test]
    fn osc8_runs_are_zero_width() {
        let link = crate::ansi::hyperlink("http://www.contoso.com", "click");
        assert_eq!(visible_width(&link), 5);
    }

    #[test]
    fn wide_chars_count_double() {
        assert_eq!(visible_width("日本語"), 6);
        assert_eq!(visible_width("a日b"), 4);
    }

    #[test]
    fn fits_returns_borrowed() {
        let s = "short";
        assert!(matches!(truncate(s, 20), Cow::Borrowed(_)));
    }

    #[test]
    fn plain_truncation_is_prefix() {
        assert_eq!(
            truncate("that overflows the renderer width", 20).as_ref(),
            "that overflows the r"
        );
    }

    #[test]
    fn sgr_close_survives_truncation() {
        let line = "\x1b[91mthat overflows the renderer width\x1b[0m";
        assert_eq!(
            truncate(line, 20).as_ref(),
            "\x1b[91mthat overflows the r\x1b[0m"
        );
    }

    #[test]
    fn hyperlink_close_survives_truncation() {
        let line = crate::ansi::hyperlink(
            "http://www.contoso.com",
            "this overflows the renderer width",
        );
        let want = format!(
            "\x1b]8;;http://www.contoso.com\x07{}\x1b]8;;\x07",
            "this overflows the r"
        );
        assert_eq!(truncate(&line, 20).as_ref(), want);
    }

    #[test]
    fn wide_char_never_splits() {
        assert_eq!(truncate("日本語", 5).as_ref(), "日本");
        assert_eq!(truncate("日本語", 4).as_ref(), "日本");
    }

    #[test]
    fn no_visible_output_after_budget() {
        assert_eq!(truncate("ab日cd", 3).as_ref(), "ab");
    }

    #[test]
    fn zero_budget_keeps_escapes_only() {
        assert_eq!(truncate("\x1b[1mhidden\x1b[0m", 0).as_ref(), "\x1b[1m\x1b[0m");
    }

    #[test]
    fn st_terminated_osc_is_recognized() {
        assert_eq!(visible_width("\x1b]8;;http://x\x1b\\text\x1b]8;;\x1b\\"), 4);
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Truncation never exceeds the budget.
            #[test]
            fn truncated_width_within_budget(s in "[ -~]{0,64}", max in 0usize..32) {
                prop_assert!(visible_width(&truncate(&s, max)) <= max);
            }

            /// For plain ASCII, truncation is literal prefixing.
            #[test]
            fn ascii_truncation_is_prefix(s in "[ -~]{0,64}", max in 0usize..32) {
                let t = truncate(&s, max);
                prop_assert!(s.starts_with(t.as_ref()));
            }

            /// Anything that fits is returned untouched.
            #[test]
            fn fitting_input_unchanged(s in "[ -~]{0,32}") {
                let t = truncate(&s, s.len());
                prop_assert_eq!(t.as_ref(), s.as_str());
            }
        }
    }
}
