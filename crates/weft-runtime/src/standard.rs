#![forbid(unsafe_code)]

//! The standard framerate-based renderer.
//!
//! Frames are submitted whole and drained to the terminal on a periodic
//! tick. Each flush diffs the pending frame against the last one line by
//! line and emits only the cursor motion and line rewrites the change
//! needs, tracking the cursor row (the rendering head) across flushes so
//! every move is a small relative delta. Unnecessary cursor movement
//! reads as flicker at interactive framerates; minimum-erase painting
//! plus newline-preferring motion is what keeps refreshes invisible.
//!
//! For very high-performance regions the renderer can be told to keep
//! its hands off a range of rows ([`StandardRenderer::set_ignored_lines`])
//! while [`StandardRenderer::insert_top`] / [`StandardRenderer::insert_bottom`]
//! write into them directly through DEC scrolling regions.

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, trace};

use weft_render::output::Output;
use weft_render::text::truncate;

use crate::renderer::{Renderer, RendererMsg};
use crate::ticker::Ticker;

/// Maximum interval between view updates when no rate is given.
const DEFAULT_FPS: u32 = 60;
const MAX_FPS: u32 = 120;

/// A framerate-based terminal renderer.
///
/// All state lives behind one mutex shared with the tick thread; every
/// public operation locks it for its whole duration.
pub struct StandardRenderer<W: Write + Send + 'static> {
    state: Arc<Mutex<RenderState<W>>>,
    framerate: Duration,
    ticker: Option<Ticker>,
}

struct RenderState<W: Write> {
    out: Output<W>,

    /// Next frame to present. Replaced, never appended, by submit.
    pending: String,
    /// The most recently flushed frame, byte for byte.
    last_render: String,
    /// The height-clipped lines actually painted by the last flush.
    last_render_lines: Vec<String>,
    /// Lines physically on screen from the last flush.
    lines_rendered: usize,
    /// Cursor row within the render area, carried across flushes.
    rendering_head: usize,

    /// Terminal size; 0 disables truncation / height clipping.
    width: usize,
    height: usize,

    /// Rows owned by the scroll-region bypass; never touched by the diff.
    ignore_lines: HashSet<usize>,
    /// Scratch skip mask, reused between flushes.
    skip_lines: Vec<bool>,

    /// Lines to place in scrollback above the next frame (main buffer only).
    queued_message_lines: Vec<String>,
    /// The whole frame must be redrawn on the next flush.
    force_repaint: bool,

    alt_screen_active: bool,
    cursor_hidden: bool,
    bp_active: bool,
}

impl<W: Write + Send + 'static> StandardRenderer<W> {
    /// Create a renderer writing to `out`, ticking `fps` times a second.
    ///
    /// An `fps` outside `1..=120` (zero included) falls back to 60.
    pub fn new(out: W, fps: u32) -> Self {
        let fps = if (1..=MAX_FPS).contains(&fps) {
            fps
        } else {
            DEFAULT_FPS
        };
        Self {
            state: Arc::new(Mutex::new(RenderState {
                out: Output::new(out),
                pending: String::new(),
                last_render: String::new(),
                last_render_lines: Vec::new(),
                lines_rendered: 0,
                rendering_head: 0,
                width: 0,
                height: 0,
                ignore_lines: HashSet::new(),
                skip_lines: Vec::new(),
                queued_message_lines: Vec::new(),
                force_repaint: false,
                alt_screen_active: false,
                cursor_hidden: false,
                bp_active: false,
            })),
            framerate: Duration::from_secs(1) / fps,
            ticker: None,
        }
    }

    /// Start the tick loop. Restarting after a stop spawns a fresh timer.
    pub fn start(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        debug!(framerate = ?self.framerate, "renderer start");
        let state = Arc::clone(&self.state);
        self.ticker = Some(Ticker::spawn(self.framerate, move || {
            let mut st = state.lock().unwrap();
            let _ = flush_locked(&mut st);
        }));
    }

    /// Halt the renderer, rendering the final pending frame first.
    ///
    /// The tick thread is signaled and joined before any lock is taken,
    /// so an in-flight flush cannot deadlock against us.
    pub fn stop(&mut self) {
        debug!("renderer stop");
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
        self.flush();

        let mut st = self.state.lock().unwrap();
        let _ = st.out.clear_line();
        let _ = st.out.flush();
    }

    /// Halt the renderer without rendering the final frame.
    pub fn kill(&mut self) {
        debug!("renderer kill");
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }

        let mut st = self.state.lock().unwrap();
        let _ = st.out.clear_line();
        let _ = st.out.flush();
    }

    /// Replace the pending frame.
    ///
    /// An empty frame renders as a single space: clearing existing
    /// output entirely would otherwise need extra state to express.
    pub fn submit(&self, frame: &str) {
        let mut st = self.state.lock().unwrap();
        st.pending.clear();
        st.pending.push_str(if frame.is_empty() { " " } else { frame });
    }

    /// Reconcile the terminal with the pending frame now.
    pub fn flush(&self) {
        let mut st = self.state.lock().unwrap();
        let _ = flush_locked(&mut st);
    }

    /// Request a full re-render on the next flush.
    pub fn repaint(&self) {
        let mut st = self.state.lock().unwrap();
        st.force_repaint = true;
    }

    /// Clear the screen and force a repaint.
    pub fn clear_screen(&self) {
        let mut st = self.state.lock().unwrap();
        let _ = st.out.clear_screen();
        let _ = st.out.move_cursor(1, 1);
        let _ = st.out.flush();
        st.force_repaint = true;
    }

    /// Whether the alternate screen buffer is active.
    pub fn alt_screen(&self) -> bool {
        self.state.lock().unwrap().alt_screen_active
    }

    /// Switch to the alternate screen buffer and force a repaint.
    pub fn enter_alt_screen(&self) {
        let mut st = self.state.lock().unwrap();
        if st.alt_screen_active {
            return;
        }
        st.alt_screen_active = true;
        let _ = st.out.alt_screen();

        // Clear explicitly for terminals without alt-screen support
        // (GNU screen by default), which otherwise keep stale content.
        let _ = st.out.clear_screen();
        let _ = st.out.move_cursor(1, 1);

        // Some terminals keep separate cursor state per buffer; reassert
        // visibility on every switch.
        let _ = if st.cursor_hidden {
            st.out.hide_cursor()
        } else {
            st.out.show_cursor()
        };
        let _ = st.out.flush();
        st.force_repaint = true;
    }

    /// Return to the main screen buffer and force a repaint.
    pub fn exit_alt_screen(&self) {
        let mut st = self.state.lock().unwrap();
        if !st.alt_screen_active {
            return;
        }
        st.alt_screen_active = false;
        let _ = st.out.exit_alt_screen();

        let _ = if st.cursor_hidden {
            st.out.hide_cursor()
        } else {
            st.out.show_cursor()
        };
        let _ = st.out.flush();
        st.force_repaint = true;
    }

    /// Make the cursor visible.
    pub fn show_cursor(&self) {
        let mut st = self.state.lock().unwrap();
        st.cursor_hidden = false;
        let _ = st.out.show_cursor();
        let _ = st.out.flush();
    }

    /// Hide the cursor.
    pub fn hide_cursor(&self) {
        let mut st = self.state.lock().unwrap();
        st.cursor_hidden = true;
        let _ = st.out.hide_cursor();
        let _ = st.out.flush();
    }

    /// Enable mouse cell-motion tracking.
    pub fn enable_mouse_cell_motion(&self) {
        let mut st = self.state.lock().unwrap();
        let _ = st.out.enable_mouse_cell_motion();
        let _ = st.out.flush();
    }

    /// Disable mouse cell-motion tracking.
    pub fn disable_mouse_cell_motion(&self) {
        let mut st = self.state.lock().unwrap();
        let _ = st.out.disable_mouse_cell_motion();
        let _ = st.out.flush();
    }

    /// Enable mouse all-motion tracking.
    pub fn enable_mouse_all_motion(&self) {
        let mut st = self.state.lock().unwrap();
        let _ = st.out.enable_mouse_all_motion();
        let _ = st.out.flush();
    }

    /// Disable mouse all-motion tracking.
    pub fn disable_mouse_all_motion(&self) {
        let mut st = self.state.lock().unwrap();
        let _ = st.out.disable_mouse_all_motion();
        let _ = st.out.flush();
    }

    /// Enable SGR extended mouse reporting.
    pub fn enable_mouse_sgr_mode(&self) {
        let mut st = self.state.lock().unwrap();
        let _ = st.out.enable_mouse_extended_mode();
        let _ = st.out.flush();
    }

    /// Disable SGR extended mouse reporting.
    pub fn disable_mouse_sgr_mode(&self) {
        let mut st = self.state.lock().unwrap();
        let _ = st.out.disable_mouse_extended_mode();
        let _ = st.out.flush();
    }

    /// Enable bracketed paste.
    pub fn enable_bracketed_paste(&self) {
        let mut st = self.state.lock().unwrap();
        let _ = st.out.enable_bracketed_paste();
        let _ = st.out.flush();
        st.bp_active = true;
    }

    /// Disable bracketed paste.
    pub fn disable_bracketed_paste(&self) {
        let mut st = self.state.lock().unwrap();
        let _ = st.out.disable_bracketed_paste();
        let _ = st.out.flush();
        st.bp_active = false;
    }

    /// Whether bracketed paste is currently active.
    pub fn bracketed_paste_active(&self) -> bool {
        self.state.lock().unwrap().bp_active
    }

    /// Mark rows `from..to` as owned by the scroll-region bypass.
    ///
    /// Ignored rows are never cleared or overwritten by the diff engine.
    /// Rows already on screen are erased here, once, so stale renderer
    /// content does not linger under the scroll region.
    pub fn set_ignored_lines(&self, from: usize, to: usize) {
        let mut st = self.state.lock().unwrap();
        let _ = set_ignored_lines_locked(&mut st, from, to);
    }

    /// Return all ignored rows to renderer control.
    pub fn clear_ignored_lines(&self) {
        let mut st = self.state.lock().unwrap();
        st.ignore_lines.clear();
    }

    /// Insert lines at the top of the scrolling region `[top, bottom]`,
    /// pushing the rest of the region down.
    ///
    /// Writes directly to the output, bypassing the pending frame; the
    /// region's rows must be ignored via
    /// [`StandardRenderer::set_ignored_lines`] or the diff engine will
    /// fight the bypass. Only meaningful for full-window applications.
    pub fn insert_top(&self, lines: &[String], top: usize, bottom: usize) {
        let mut st = self.state.lock().unwrap();
        let _ = insert_top_locked(&mut st, lines, top, bottom);
    }

    /// Insert lines at the bottom of the scrolling region `[top, bottom]`,
    /// pushing the rest of the region up.
    ///
    /// See [`StandardRenderer::insert_top`] for the contract.
    pub fn insert_bottom(&self, lines: &[String], top: usize, bottom: usize) {
        let mut st = self.state.lock().unwrap();
        let _ = insert_bottom_locked(&mut st, lines, top, bottom);
    }

    /// Handle a renderer-addressed message from the dispatcher.
    pub fn handle_message(&self, msg: RendererMsg) {
        let mut st = self.state.lock().unwrap();
        match msg {
            RendererMsg::Repaint => st.force_repaint = true,

            RendererMsg::WindowSize { width, height } => {
                st.width = width;
                st.height = height;
                st.force_repaint = true;
            }

            RendererMsg::ClearScrollArea => {
                st.ignore_lines.clear();
                st.force_repaint = true;
            }

            RendererMsg::SyncScrollArea { lines, top, bottom } => {
                st.ignore_lines.clear();
                let _ = set_ignored_lines_locked(&mut st, top, bottom);
                let _ = insert_top_locked(&mut st, &lines, top, bottom);
                st.force_repaint = true;
            }

            RendererMsg::ScrollUp { lines, top, bottom } => {
                let _ = insert_top_locked(&mut st, &lines, top, bottom);
            }

            RendererMsg::ScrollDown { lines, top, bottom } => {
                let _ = insert_bottom_locked(&mut st, &lines, top, bottom);
            }

            RendererMsg::PrintLine { body } => {
                if !st.alt_screen_active {
                    st.queued_message_lines
                        .extend(body.split('\n').map(str::to_owned));
                    st.force_repaint = true;
                }
            }
        }
    }
}

impl<W: Write + Send + 'static> Drop for StandardRenderer<W> {
    /// Dropping a running renderer kills it: the ticker thread is
    /// joined and the trailing cursor line cleared, without a final
    /// frame. `kill` already guards against a ticker that was never
    /// started or was stopped explicitly.
    fn drop(&mut self) {
        self.kill();
    }
}

impl<W: Write + Send + 'static> Renderer for StandardRenderer<W> {
    fn start(&mut self) {
        StandardRenderer::start(self);
    }

    fn stop(&mut self) {
        StandardRenderer::stop(self);
    }

    fn kill(&mut self) {
        StandardRenderer::kill(self);
    }

    fn submit(&self, frame: &str) {
        StandardRenderer::submit(self, frame);
    }

    fn repaint(&self) {
        StandardRenderer::repaint(self);
    }

    fn alt_screen(&self) -> bool {
        StandardRenderer::alt_screen(self)
    }

    fn enter_alt_screen(&self) {
        StandardRenderer::enter_alt_screen(self);
    }

    fn exit_alt_screen(&self) {
        StandardRenderer::exit_alt_screen(self);
    }
}

/// Reconcile the terminal with the pending frame.
///
/// No-op when nothing is pending and no force condition holds. The whole
/// edit script is staged into one buffer and written with a single call,
/// so the flush is atomic from the output's perspective.
fn flush_locked<W: Write>(st: &mut RenderState<W>) -> io::Result<()> {
    // Force conditions must be evaluated before the equality early-exit,
    // or queued scrollback lines strand behind an unchanged frame.
    let force_full =
        st.force_repaint || (!st.queued_message_lines.is_empty() && !st.alt_screen_active);
    if !force_full && (st.pending.is_empty() || st.pending == st.last_render) {
        return Ok(());
    }

    // A force condition firing between submits repaints what is already
    // on screen.
    let frame = if st.pending.is_empty() {
        st.last_render.clone()
    } else {
        st.pending.clone()
    };

    let mut new_lines: Vec<String> = frame.split('\n').map(str::to_owned).collect();

    // The cursor cannot be navigated into the terminal's scrollback, so
    // an overflowing frame drops lines from the top; the bottom stays.
    if st.height > 0 && new_lines.len() > st.height {
        new_lines.drain(..new_lines.len() - st.height);
    }
    let num_lines = new_lines.len();

    let mut seq = Output::new(Vec::new());

    if force_full {
        trace!(
            num_lines,
            queued = st.queued_message_lines.len(),
            "full flush"
        );

        move_head_to_top(st, &mut seq)?;

        // Queued messages paint first; the frame below pushes them off
        // the top into permanent scrollback.
        for line in std::mem::take(&mut st.queued_message_lines) {
            seq.clear_line()?;
            seq.write_str(&line)?;
            seq.write_str("\r\n")?;
        }

        for (i, line) in new_lines.iter().enumerate() {
            if !st.ignore_lines.contains(&i) {
                seq.clear_line()?;
                write_line(&mut seq, line, st.width)?;
            }
            if i + 1 < num_lines {
                seq.write_str("\r\n")?;
            }
        }
        st.rendering_head = num_lines.saturating_sub(1);
    } else {
        trace!(num_lines, lines_rendered = st.lines_rendered, "diff flush");

        let span = st.lines_rendered.max(num_lines);
        st.skip_lines.clear();
        st.skip_lines.resize(span, false);
        for i in 0..span {
            st.skip_lines[i] = st.ignore_lines.contains(&i)
                || (i < st.last_render_lines.len()
                    && i < num_lines
                    && new_lines[i] == st.last_render_lines[i]);
        }

        for i in 0..num_lines {
            if st.skip_lines[i] {
                continue;
            }
            move_head(st, &mut seq, i)?;
            if i < st.lines_rendered {
                // Prior content sits on this row; erase before overwriting.
                seq.clear_line()?;
            }
            write_line(&mut seq, &new_lines[i], st.width)?;
            if i + 1 < num_lines {
                seq.write_str("\r")?;
            }
        }

        // The old render was taller: clear the leftover rows and park the
        // head back inside the live area.
        if num_lines < st.lines_rendered {
            seq.write_str("\r")?;
            for i in num_lines..st.lines_rendered {
                if !st.skip_lines[i] {
                    move_head(st, &mut seq, i)?;
                    seq.clear_line()?;
                }
            }
            move_head(st, &mut seq, num_lines.saturating_sub(1))?;
        }
    }

    if st.alt_screen_active {
        // Absolute positioning here works around a macOS Terminal quirk;
        // plain column-return suffices everywhere else.
        seq.move_cursor(st.rendering_head + 1, 0)?;
    } else {
        seq.cursor_back(st.width)?;
    }

    let bytes = seq.into_inner();
    st.out.write_all(&bytes)?;
    st.out.flush()?;

    if !st.pending.is_empty() {
        st.last_render = std::mem::take(&mut st.pending);
    }
    st.last_render_lines = new_lines;
    st.lines_rendered = num_lines;
    st.force_repaint = false;
    Ok(())
}

/// Move the rendering head to `target`, cheapest motion first.
fn move_head<W: Write>(
    st: &mut RenderState<W>,
    seq: &mut Output<Vec<u8>>,
    target: usize,
) -> io::Result<()> {
    let head = st.rendering_head;
    if target == head {
        return Ok(());
    }
    if target > head {
        let delta = target - head;
        if delta == 1 {
            // A newline is cheaper than CUD(1) and, unlike it, scrolls
            // when the cursor sits on the terminal's last row.
            seq.write_str("\n")?;
        } else if target > st.lines_rendered {
            // Rows past the rendered area must come from terminal
            // scroll, not from navigating into space that does not
            // exist yet.
            let through = st.lines_rendered.saturating_sub(head);
            seq.cursor_down(through)?;
            for _ in 0..delta - through {
                seq.write_str("\n")?;
            }
        } else {
            seq.cursor_down(delta)?;
        }
    } else {
        seq.cursor_up(head - target)?;
    }
    st.rendering_head = target;
    Ok(())
}

fn move_head_to_top<W: Write>(
    st: &mut RenderState<W>,
    seq: &mut Output<Vec<u8>>,
) -> io::Result<()> {
    seq.cursor_up(st.rendering_head)?;
    st.rendering_head = 0;
    Ok(())
}

/// Write one line, truncated to the window width when it is known.
///
/// Truncation avoids wrapping, which would desync the head tracking.
fn write_line(seq: &mut Output<Vec<u8>>, line: &str, width: usize) -> io::Result<()> {
    if width > 0 {
        seq.write_str(truncate(line, width).as_ref())
    } else {
        seq.write_str(line)
    }
}

fn set_ignored_lines_locked<W: Write>(
    st: &mut RenderState<W>,
    from: usize,
    to: usize,
) -> io::Result<()> {
    for i in from..to {
        st.ignore_lines.insert(i);
    }
    if st.lines_rendered == 0 {
        return Ok(());
    }

    // Erase the newly ignored rows in place, walking up from the bottom
    // of the render area, then put the cursor back where the diff engine
    // expects it.
    let mut seq = Output::new(Vec::new());
    for i in (0..st.lines_rendered).rev() {
        if st.ignore_lines.contains(&i) {
            seq.clear_line()?;
        }
        seq.cursor_up(1)?;
    }
    seq.move_cursor(st.lines_rendered, 0)?;

    st.out.write_all(&seq.into_inner())?;
    st.out.flush()
}

fn insert_top_locked<W: Write>(
    st: &mut RenderState<W>,
    lines: &[String],
    top: usize,
    bottom: usize,
) -> io::Result<()> {
    let mut seq = Output::new(Vec::new());
    seq.change_scrolling_region(top, bottom)?;
    seq.move_cursor(top, 0)?;
    seq.insert_lines(lines.len())?;
    seq.write_str(&lines.join("\r\n"))?;
    seq.change_scrolling_region(0, st.height)?;

    // Back to where the main rendering routine expects the cursor.
    seq.move_cursor(st.lines_rendered, 0)?;

    st.out.write_all(&seq.into_inner())?;
    st.out.flush()
}

fn insert_bottom_locked<W: Write>(
    st: &mut RenderState<W>,
    lines: &[String],
    top: usize,
    bottom: usize,
) -> io::Result<()> {
    let mut seq = Output::new(Vec::new());
    seq.change_scrolling_region(top, bottom)?;
    seq.move_cursor(bottom, 0)?;
    // Writing past the region bottom scrolls; no explicit IL needed.
    seq.write_str("\r\n")?;
    seq.write_str(&lines.join("\r\n"))?;
    seq.change_scrolling_region(0, st.height)?;
    seq.move_cursor(st.lines_rendered, 0)?;

    st.out.write_all(&seq.into_inner())?;
    st.out.flush()
}
