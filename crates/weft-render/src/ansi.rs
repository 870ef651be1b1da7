#![forbid(unsafe_code)]

//! ANSI escape sequence generation helpers.
//!
//! Pure byte-generation functions for the VT/xterm control sequences the
//! renderer emits. No state tracking lives here; the [`crate::output`]
//! adapter composes these into the device surface.
//!
//! # Sequence Reference
//!
//! | Category | Sequence | Description |
//! |----------|----------|-------------|
//! | CSI | `ESC [ n A/B/D` | CUU / CUD / CUB (relative cursor motion) |
//! | CSI | `ESC [ row ; col H` | CUP (absolute cursor position, 1-indexed) |
//! | CSI | `ESC [ 2 K` | EL (erase entire line) |
//! | CSI | `ESC [ 2 J` | ED (erase entire display) |
//! | CSI | `ESC [ n L` | IL (insert blank lines) |
//! | CSI | `ESC [ top ; bottom r` | DECSTBM (set scrolling region) |
//! | CSI | `ESC [ ? Pm h/l` | DEC private mode set / reset |
//! | OSC | `ESC ] 8 ; ; url BEL` | Hyperlink open/close (OSC 8) |

use std::io::{self, Write};

/// Erase entire line: `CSI 2 K`.
pub const ERASE_LINE: &[u8] = b"\x1b[2K";

/// Erase entire display: `CSI 2 J`.
pub const ERASE_DISPLAY: &[u8] = b"\x1b[2J";

// =============================================================================
// Cursor motion
// =============================================================================

/// Move cursor up: `CSI n A`. Emits nothing for `n == 0`.
pub fn cuu<W: Write>(w: &mut W, n: usize) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    if n == 1 {
        w.write_all(b"\x1b[A")
    } else {
        write!(w, "\x1b[{n}A")
    }
}

/// Move cursor down: `CSI n B`. Emits nothing for `n == 0`.
pub fn cud<W: Write>(w: &mut W, n: usize) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    if n == 1 {
        w.write_all(b"\x1b[B")
    } else {
        write!(w, "\x1b[{n}B")
    }
}

/// Move cursor back (left): `CSI n D`. Emits nothing for `n == 0`.
pub fn cub<W: Write>(w: &mut W, n: usize) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    if n == 1 {
        w.write_all(b"\x1b[D")
    } else {
        write!(w, "\x1b[{n}D")
    }
}

/// Absolute cursor position: `CSI row ; col H`.
///
/// Row and col are passed through verbatim; the terminal contract is
/// 1-indexed, and terminals treat 0 as 1.
pub fn cup<W: Write>(w: &mut W, row: usize, col: usize) -> io::Result<()> {
    write!(w, "\x1b[{row};{col}H")
}

// =============================================================================
// Erasing and line editing
// =============================================================================

/// Erase the current line: `CSI 2 K`.
pub fn el2<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(ERASE_LINE)
}

/// Erase the entire display: `CSI 2 J`.
pub fn ed2<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(ERASE_DISPLAY)
}

/// Insert blank lines at the cursor: `CSI n L`.
pub fn il<W: Write>(w: &mut W, n: usize) -> io::Result<()> {
    write!(w, "\x1b[{n}L")
}

/// Set the scrolling region: `CSI top ; bottom r` (DECSTBM).
///
/// Boundaries are passed through verbatim, matching the device contract.
pub fn decstbm<W: Write>(w: &mut W, top: usize, bottom: usize) -> io::Result<()> {
    write!(w, "\x1b[{top};{bottom}r")
}

// =============================================================================
// DEC private modes
// =============================================================================

/// Set a DEC private mode: `CSI ? Pm h`.
pub fn decset<W: Write>(w: &mut W, mode: u16) -> io::Result<()> {
    write!(w, "\x1b[?{mode}h")
}

/// Reset a DEC private mode: `CSI ? Pm l`.
pub fn decrst<W: Write>(w: &mut W, mode: u16) -> io::Result<()> {
    write!(w, "\x1b[?{mode}l")
}

/// Alternate screen buffer (DEC 1049).
pub const MODE_ALT_SCREEN: u16 = 1049;
/// Cursor visibility (DEC 25).
pub const MODE_CURSOR_VISIBLE: u16 = 25;
/// Mouse cell-motion tracking (DEC 1002).
pub const MODE_MOUSE_CELL_MOTION: u16 = 1002;
/// Mouse all-motion tracking (DEC 1003).
pub const MODE_MOUSE_ALL_MOTION: u16 = 1003;
/// SGR extended mouse reporting (DEC 1006).
pub const MODE_MOUSE_EXTENDED: u16 = 1006;
/// Bracketed paste (DEC 2004).
pub const MODE_BRACKETED_PASTE: u16 = 2004;

// =============================================================================
// OSC 8 hyperlinks
// =============================================================================

/// Wrap `text` in an OSC 8 hyperlink to `url`.
///
/// `OSC 8 ; ; url BEL text OSC 8 ; ; BEL` — the open and close runs are
/// zero-width for layout purposes.
pub fn hyperlink(url: &str, text: &str) -> String {
    format!("\x1b]8;;{url}\x07{text}\x1b]8;;\x07")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> Vec<u8> {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        buf
    }

    #[test]
    fn motion_zero_is_silent() {
        assert!(capture(|w| cuu(w, 0)).is_empty());
        assert!(capture(|w| cud(w, 0)).is_empty());
        assert!(capture(|w| cub(w, 0)).is_empty());
    }

    #[test]
    fn motion_one_uses_short_form() {
        assert_eq!(capture(|w| cuu(w, 1)), b"\x1b[A");
        assert_eq!(capture(|w| cud(w, 1)), b"\x1b[B");
        assert_eq!(capture(|w| cub(w, 1)), b"\x1b[D");
    }

    #[test]
    fn motion_counts() {
        assert_eq!(capture(|w| cuu(w, 3)), b"\x1b[3A");
        assert_eq!(capture(|w| cud(w, 12)), b"\x1b[12B");
        assert_eq!(capture(|w| cub(w, 20)), b"\x1b[20D");
    }

    #[test]
    fn cup_passes_coordinates_verbatim() {
        assert_eq!(capture(|w| cup(w, 1, 1)), b"\x1b[1;1H");
        assert_eq!(capture(|w| cup(w, 4, 0)), b"\x1b[4;0H");
    }

    #[test]
    fn erase_and_insert() {
        assert_eq!(capture(el2), b"\x1b[2K");
        assert_eq!(capture(ed2), b"\x1b[2J");
        assert_eq!(capture(|w| il(w, 2)), b"\x1b[2L");
        assert_eq!(capture(|w| decstbm(w, 3, 10)), b"\x1b[3;10r");
    }

    #[test]
    fn private_modes() {
        assert_eq!(capture(|w| decset(w, MODE_ALT_SCREEN)), b"\x1b[?1049h");
        assert_eq!(capture(|w| decrst(w, MODE_BRACKETED_PASTE)), b"\x1b[?2004l");
    }

    #[test]
    fn hyperlink_wraps_osc8() {
        assert_eq!(
            hyperlink("http://www.contoso.com", "docs"),
            "\x1b]8;;http://www.contoso.com\x07docs\x1b]8;;\x07"
        );
    }
}
