#![forbid(unsafe_code)]

//! The renderer contract and the messages it consumes.
//!
//! The program runtime drives a renderer through this trait and routes
//! renderer-addressed messages to [`RendererMsg`]. The renderer owns the
//! terminal's visible state; the program owns everything else.

/// The program-facing renderer surface.
pub trait Renderer {
    /// Start the render loop.
    fn start(&mut self);

    /// Stop the renderer, rendering the final frame in the buffer, if any.
    fn stop(&mut self);

    /// Stop the renderer without any final rendering.
    fn kill(&mut self);

    /// Replace the pending frame. It is written to the terminal at the
    /// renderer's discretion, on the next tick.
    fn submit(&self, frame: &str);

    /// Request a full re-render on the next tick.
    fn repaint(&self);

    /// Whether the alternate screen buffer is active.
    fn alt_screen(&self) -> bool;

    /// Switch to the alternate screen buffer.
    fn enter_alt_screen(&self);

    /// Return to the main screen buffer.
    fn exit_alt_screen(&self);
}

/// Messages the renderer consumes from the program dispatcher.
///
/// Scroll-area messages exist for high-performance scroll-based
/// rendering only; they bypass the pending-frame buffer and are only
/// meaningful for full-window (alt-screen) applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererMsg {
    /// Force a full repaint on the next tick.
    Repaint,
    /// The terminal was resized.
    WindowSize {
        /// New width in columns.
        width: usize,
        /// New height in rows.
        height: usize,
    },
    /// Release the scroll area's rows back to the renderer.
    ClearScrollArea,
    /// (Re-)initialize the scroll area: paint `lines` into the region
    /// and mark its rows ignored.
    SyncScrollArea {
        /// Full content of the scroll region.
        lines: Vec<String>,
        /// First row of the region (1-based).
        top: usize,
        /// Last row of the region (1-based).
        bottom: usize,
    },
    /// Insert lines at the top of the scroll region, pushing the rest down.
    ScrollUp {
        /// Lines to insert.
        lines: Vec<String>,
        /// First row of the region (1-based).
        top: usize,
        /// Last row of the region (1-based).
        bottom: usize,
    },
    /// Insert lines at the bottom of the scroll region, pushing the rest up.
    ScrollDown {
        /// Lines to insert.
        lines: Vec<String>,
        /// First row of the region (1-based).
        top: usize,
        /// Last row of the region (1-based).
        bottom: usize,
    },
    /// Print a line into scrollback, above the next frame, on the main
    /// buffer. Ignored while the alternate screen is active.
    PrintLine {
        /// Message body; embedded newlines queue multiple lines.
        body: String,
    },
}
