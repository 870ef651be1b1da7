#![forbid(unsafe_code)]

//! Output device adapter.
//!
//! [`Output`] owns the terminal sink and exposes the cursor, line, and
//! mode primitives the renderer drives. It is a thin capability layer:
//! every method maps to exactly one escape sequence from [`crate::ansi`],
//! and the adapter never tracks terminal state of its own.
//!
//! Owning the sink enforces the one-writer rule: all bytes bound for the
//! terminal funnel through a single `Output`.
//!
//! # Usage
//!
//! ```
//! use weft_render::output::Output;
//!
//! let mut out = Output::new(Vec::new());
//! out.clear_line().unwrap();
//! out.cursor_up(2).unwrap();
//! assert_eq!(out.into_inner(), b"\x1b[2K\x1b[2A");
//! ```

use std::io::{self, Write};

use crate::ansi;

/// Terminal output device.
///
/// Wraps any `Write` sink with the primitive surface the renderer needs.
#[derive(Debug)]
pub struct Output<W> {
    w: W,
}

impl<W: Write> Output<W> {
    /// Create an adapter owning the given sink.
    pub fn new(w: W) -> Self {
        Self { w }
    }

    /// Borrow the underlying sink.
    #[inline]
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.w
    }

    /// Consume the adapter and return the sink.
    #[inline]
    pub fn into_inner(self) -> W {
        self.w
    }

    /// Write a string verbatim.
    #[inline]
    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.w.write_all(s.as_bytes())
    }

    /// Erase the current line (`EL 2`).
    pub fn clear_line(&mut self) -> io::Result<()> {
        ansi::el2(&mut self.w)
    }

    /// Erase the entire display (`ED 2`).
    pub fn clear_screen(&mut self) -> io::Result<()> {
        ansi::ed2(&mut self.w)
    }

    /// Move the cursor to an absolute position (1-indexed, verbatim).
    pub fn move_cursor(&mut self, row: usize, col: usize) -> io::Result<()> {
        ansi::cup(&mut self.w, row, col)
    }

    /// Move the cursor up `n` rows.
    pub fn cursor_up(&mut self, n: usize) -> io::Result<()> {
        ansi::cuu(&mut self.w, n)
    }

    /// Move the cursor down `n` rows.
    pub fn cursor_down(&mut self, n: usize) -> io::Result<()> {
        ansi::cud(&mut self.w, n)
    }

    /// Move the cursor back `n` columns.
    pub fn cursor_back(&mut self, n: usize) -> io::Result<()> {
        ansi::cub(&mut self.w, n)
    }

    /// Insert `n` blank lines at the cursor (`IL`).
    pub fn insert_lines(&mut self, n: usize) -> io::Result<()> {
        ansi::il(&mut self.w, n)
    }

    /// Set the scrolling region (`DECSTBM`), boundaries verbatim.
    pub fn change_scrolling_region(&mut self, top: usize, bottom: usize) -> io::Result<()> {
        ansi::decstbm(&mut self.w, top, bottom)
    }

    /// Switch to the alternate screen buffer.
    pub fn alt_screen(&mut self) -> io::Result<()> {
        ansi::decset(&mut self.w, ansi::MODE_ALT_SCREEN)
    }

    /// Return to the main screen buffer.
    pub fn exit_alt_screen(&mut self) -> io::Result<()> {
        ansi::decrst(&mut self.w, ansi::MODE_ALT_SCREEN)
    }

    /// Make the cursor visible.
    pub fn show_cursor(&mut self) -> io::Result<()> {
        ansi::decset(&mut self.w, ansi::MODE_CURSOR_VISIBLE)
    }

    /// Hide the cursor.
    pub fn hide_cursor(&mut self) -> io::Result<()> {
        ansi::decrst(&mut self.w, ansi::MODE_CURSOR_VISIBLE)
    }

    /// Enable mouse cell-motion tracking.
    pub fn enable_mouse_cell_motion(&mut self) -> io::Result<()> {
        ansi::decset(&mut self.w, ansi::MODE_MOUSE_CELL_MOTION)
    }

    /// Disable mouse cell-motion tracking.
    pub fn disable_mouse_cell_motion(&mut self) -> io::Result<()> {
        ansi::decrst(&mut self.w, ansi::MODE_MOUSE_CELL_MOTION)
    }

    /// Enable mouse all-motion tracking.
    pub fn enable_mouse_all_motion(&mut self) -> io::Result<()> {
        ansi::decset(&mut self.w, ansi::MODE_MOUSE_ALL_MOTION)
    }

    /// Disable mouse all-motion tracking.
    pub fn disable_mouse_all_motion(&mut self) -> io::Result<()> {
        ansi::decrst(&mut self.w, ansi::MODE_MOUSE_ALL_MOTION)
    }

    /// Enable SGR extended mouse reporting.
    pub fn enable_mouse_extended_mode(&mut self) -> io::Result<()> {
        ansi::decset(&mut self.w, ansi::MODE_MOUSE_EXTENDED)
    }

    /// Disable SGR extended mouse reporting.
    pub fn disable_mouse_extended_mode(&mut self) -> io::Result<()> {
        ansi::decrst(&mut self.w, ansi::MODE_MOUSE_EXTENDED)
    }

    /// Enable bracketed paste.
    pub fn enable_bracketed_paste(&mut self) -> io::Result<()> {
        ansi::decset(&mut self.w, ansi::MODE_BRACKETED_PASTE)
    }

    /// Disable bracketed paste.
    pub fn disable_bracketed_paste(&mut self) -> io::Result<()> {
        ansi::decrst(&mut self.w, ansi::MODE_BRACKETED_PASTE)
    }
}

impl<W: Write> Write for Output<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.w.write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.w.flush()
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.w.write_all(buf)
    }
}
