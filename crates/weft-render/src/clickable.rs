#![forbid(unsafe_code)]

//! Clickable region registry.
//!
//! Applications mark substrings of a frame as clickable by wrapping them
//! in Unicode interlinear annotation characters (U+FFF9..U+FFFB, see
//! UTR #20 §3.2). The registry strips the markers before the frame is
//! displayed, recording the visual bounding span of each wrapped
//! substring, and later maps a mouse position back to the payload that
//! was registered for it.
//!
//! The id of a region is encoded as the run length of U+FFFA between the
//! wrapped text and the terminator, so the annotation stays entirely
//! non-printing and can be embedded anywhere in a frame without
//! disturbing layout.
//!
//! Registered regions are double-buffered: [`ClickableRegistry::get_clicked`]
//! answers against the frame currently on screen while the next frame's
//! regions are being parsed, and [`ClickableRegistry::swap_buffers`]
//! makes the new frame active. Stale entries are evicted by generation,
//! never by per-frame reallocation.
//!
//! # Usage
//!
//! ```
//! use weft_render::clickable::ClickableRegistry;
//!
//! let mut registry: ClickableRegistry<&str> = ClickableRegistry::new();
//! let frame = format!("pick {}", registry.register_and_wrap("me", "pick-key", "payload"));
//! assert_eq!(registry.strip_annotations(&frame).as_ref(), "pick me");
//! registry.swap_buffers();
//! assert_eq!(registry.get_clicked(5, 0), Some(&"payload"));
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

use crate::text::char_width;

/// Opens an annotated (clickable) span.
pub const ANNOTATION_START: char = '\u{FFF9}';
/// One id unit; the region id is the run length of this character.
pub const ANNOTATION_ID: char = '\u{FFFA}';
/// Terminates an annotated span.
pub const ANNOTATION_END: char = '\u{FFFB}';

/// A visible position in the frame: column `x`, row `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    /// Column, in visible terminal columns.
    pub x: usize,
    /// Row.
    pub y: usize,
}

/// The visual span covered by one clickable region.
///
/// A span flows like text: it covers everything from `start` to `end`
/// in reading order, not the rectangle between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClickableBounds {
    /// Cell of the first wrapped character.
    pub start: Cell,
    /// Cell of the last wrapped character.
    pub end: Cell,
    /// Byte offset of the opening marker in the unstripped frame.
    ///
    /// Disambiguates overlapping regions (nesting, `\r` overdraw): the
    /// later opener wins.
    pub sequence_position: usize,
}

impl ClickableBounds {
    /// Inclusive containment in reading order.
    fn contains(&self, p: Cell) -> bool {
        (self.start.y < p.y || (self.start.y == p.y && self.start.x <= p.x))
            && (self.end.y > p.y || (self.end.y == p.y && self.end.x >= p.x))
    }
}

#[derive(Debug, Clone)]
struct Clickable<T> {
    data: T,
    bounds: ClickableBounds,
    // Entries are overwritten in place across frames rather than
    // reallocated; the generation stamp is what evicts stale ones.
    generation: u64,
}

/// Double-buffered registry of clickable regions.
///
/// Payloads are application-opaque and handed back by reference from
/// [`ClickableRegistry::get_clicked`].
#[derive(Debug, Clone, Default)]
pub struct ClickableRegistry<T> {
    current_generation: u64,
    id_counter: usize,
    /// Stable application key to dense id.
    stable_keys: HashMap<String, usize>,
    /// Regions for the frame on screen; queried for hits.
    current: HashMap<usize, Clickable<T>>,
    /// Regions accumulating for the frame being built.
    next: HashMap<usize, Clickable<T>>,
}

impl<T> ClickableRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            current_generation: 0,
            id_counter: 0,
            stable_keys: HashMap::new(),
            current: HashMap::new(),
            next: HashMap::new(),
        }
    }

    /// Register `data` under `key` and wrap `wrapped` in annotation
    /// markers carrying the key's dense id.
    ///
    /// The returned string renders identically to `wrapped` once the
    /// frame passes through [`ClickableRegistry::strip_annotations`].
    pub fn register_and_wrap(&mut self, wrapped: &str, key: &str, data: T) -> String {
        let id = self.stable_id(key);
        self.next.insert(
            id,
            Clickable {
                data,
                bounds: ClickableBounds::default(),
                generation: self.current_generation + 1,
            },
        );

        let mut s = String::with_capacity(wrapped.len() + 3 * (id + 2));
        s.push(ANNOTATION_START);
        s.push_str(wrapped);
        for _ in 0..id {
            s.push(ANNOTATION_ID);
        }
        s.push(ANNOTATION_END);
        s
    }

    /// Strip annotation markers from a frame, recording the bounds of
    /// each annotated span against the next generation.
    ///
    /// On any malformed sequence the in-progress registrations are
    /// discarded and the frame is returned unchanged; it is still
    /// printable, just without clickable regions. The active frame's
    /// regions are never touched by a parse failure.
    pub fn strip_annotations<'a>(&mut self, frame: &'a str) -> Cow<'a, str> {
        let mut prev = Cell::default();
        let mut current = Cell::default();
        let mut stack: Vec<ClickableBounds> = Vec::new();
        let mut parsing_id: Option<usize> = None;
        let mut out = String::with_capacity(frame.len());

        for (i, c) in frame.char_indices() {
            match c {
                ANNOTATION_START => {
                    parsing_id = Some(0);
                    stack.push(ClickableBounds {
                        start: current,
                        end: Cell::default(),
                        sequence_position: i,
                    });
                }
                ANNOTATION_ID => match parsing_id.as_mut() {
                    Some(id) => *id += 1,
                    // Id unit with no opener.
                    None => return self.abort(frame),
                },
                ANNOTATION_END => {
                    let (Some(bounds), Some(id)) = (stack.pop(), parsing_id) else {
                        // Terminator with no span in progress.
                        return self.abort(frame);
                    };
                    let committed = match self.next.get_mut(&id) {
                        Some(entry) if entry.generation == self.current_generation + 1 => {
                            entry.bounds = ClickableBounds { end: prev, ..bounds };
                            true
                        }
                        // The id was not registered for this frame.
                        _ => false,
                    };
                    if !committed {
                        return self.abort(frame);
                    }
                    parsing_id = if stack.is_empty() { None } else { Some(0) };
                }
                _ => {
                    if parsing_id.is_some_and(|id| id > 0) {
                        // Text interrupting an id run before its terminator.
                        return self.abort(frame);
                    }
                    prev = current;
                    match c {
                        '\r' => current.x = 0,
                        '\n' => {
                            current.x = 0;
                            current.y += 1;
                        }
                        _ => current.x += char_width(c),
                    }
                    out.push(c);
                }
            }
        }

        if parsing_id.is_some() {
            // Unterminated span at end of frame.
            return self.abort(frame);
        }

        Cow::Owned(out)
    }

    /// Make the just-parsed frame the active one.
    ///
    /// Call after the frame has been flushed to the display. Entries of
    /// the displaced frame are overwritten by id on the next parse and
    /// filtered out of hit testing by their generation stamp.
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
        self.current_generation += 1;
    }

    /// Map a mouse position to the payload registered for it.
    ///
    /// When regions overlap, the one whose opening marker appeared
    /// latest in the frame wins: a span overdrawn via `\r` loses to the
    /// overdrawing one, and a nested inner span beats its enclosure.
    pub fn get_clicked(&self, x: usize, y: usize) -> Option<&T> {
        self.current
            .values()
            .filter(|c| c.generation == self.current_generation && c.bounds.contains(Cell { x, y }))
            .max_by_key(|c| c.bounds.sequence_position)
            .map(|c| &c.data)
    }

    fn abort<'a>(&mut self, frame: &'a str) -> Cow<'a, str> {
        self.next.clear();
        Cow::Borrowed(frame)
    }

    fn stable_id(&mut self, key: &str) -> usize {
        if let Some(&id) = self.stable_keys.get(key) {
            return id;
        }
        let id = self.id_counter;
        self.id_counter += 1;
        self.stable_keys.insert(key.to_owned(), id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_clickable_single_line() {
        let mut cs: ClickableRegistry<&str> = ClickableRegistry::new();
        let frame = format!(
            "Click me {} please",
            cs.register_and_wrap("here", "link-1", "DATA-1")
        );
        assert_eq!(cs.strip_annotations(&frame).as_ref(), "Click me here please");

        cs.swap_buffers();

        assert_eq!(cs.get_clicked(8, 0), None, "before the clickable");
        assert_eq!(cs.get_clicked(9, 0), Some(&"DATA-1"), "leftmost bound");
        assert_eq!(cs.get_clicked(12, 0), Some(&"DATA-1"), "rightmost bound");
        assert_eq!(cs.get_clicked(13, 0), None, "after the clickable");
    }

    #[test]
    fn single_clickable_multi_line() {
        let mut cs: ClickableRegistry<&str> = ClickableRegistry::new();
        let frame = format!(
            "Click me\nRight {}\n please",
            cs.register_and_wrap("here", "link-1", "DATA-1")
        );
        assert_eq!(
            cs.strip_annotations(&frame).as_ref(),
            "Click me\nRight here\n please"
        );

        cs.swap_buffers();

        assert_eq!(cs.get_clicked(5, 1), None);
        assert_eq!(cs.get_clicked(6, 1), Some(&"DATA-1"));
        assert_eq!(cs.get_clicked(9, 1), Some(&"DATA-1"));
        assert_eq!(cs.get_clicked(0, 2), None);
    }

    #[test]
    fn single_clickable_crlf_multi_line() {
        let mut cs: ClickableRegistry<&str> = ClickableRegistry::new();
        let frame = format!(
            "Click me\r\nRight {}\r\n please",
            cs.register_and_wrap("here", "link-1", "DATA-1")
        );
        assert_eq!(
            cs.strip_annotations(&frame).as_ref(),
            "Click me\r\nRight here\r\n please"
        );

        cs.swap_buffers();

        assert_eq!(cs.get_clicked(5, 1), None);
        assert_eq!(cs.get_clicked(6, 1), Some(&"DATA-1"));
        assert_eq!(cs.get_clicked(9, 1), Some(&"DATA-1"));
        assert_eq!(cs.get_clicked(0, 2), None);
    }

    #[test]
    fn carriage_return_overdraw_later_wins() {
        let mut cs: ClickableRegistry<&str> = ClickableRegistry::new();
        let frame = format!(
            "{}\r{}",
            cs.register_and_wrap("First Clickable goes here", "link-1", "DATA-1"),
            cs.register_and_wrap("Second-Clickable", "link-2", "DATA-2")
        );
        assert_eq!(
            cs.strip_annotations(&frame).as_ref(),
            "First Clickable goes here\rSecond-Clickable"
        );

        cs.swap_buffers();

        assert_eq!(cs.get_clicked(0, 0), Some(&"DATA-2"));
    }

    #[test]
    fn clicks_resolve_against_previous_frame_until_swap() {
        let mut cs: ClickableRegistry<&str> = ClickableRegistry::new();
        let frame = format!(
            "{}\n not here",
            cs.register_and_wrap("Click here", "link-1", "DATA-1")
        );
        cs.strip_annotations(&frame);
        cs.swap_buffers();

        let frame = format!(
            "not here\n{}",
            cs.register_and_wrap("Click here", "link-1", "DATA-2")
        );
        cs.strip_annotations(&frame);

        // The second frame has not been swapped in yet.
        assert_eq!(cs.get_clicked(0, 0), Some(&"DATA-1"));
        assert_eq!(cs.get_clicked(0, 1), None);

        cs.swap_buffers();

        assert_eq!(cs.get_clicked(0, 0), None);
        assert_eq!(cs.get_clicked(0, 1), Some(&"DATA-2"));
    }

    #[test]
    fn multiline_clickable_span() {
        let mut cs: ClickableRegistry<&str> = ClickableRegistry::new();
        let frame = format!(
            "Don't click here, but {}\n not here",
            cs.register_and_wrap("click\nhere", "link-1", "DATA-1")
        );
        cs.strip_annotations(&frame);
        cs.swap_buffers();

        assert_eq!(cs.get_clicked(0, 0), None);
        assert_eq!(cs.get_clicked(22, 0), Some(&"DATA-1"));
        assert_eq!(cs.get_clicked(0, 1), Some(&"DATA-1"));
        assert_eq!(cs.get_clicked(0, 2), None);
    }

    #[test]
    fn nested_clickables_inner_wins() {
        let mut cs: ClickableRegistry<&str> = ClickableRegistry::new();
        let inner = cs.register_and_wrap("here", "inner", "inner-data");
        let frame = format!(
            "Click me {} please",
            cs.register_and_wrap(&format!("here or {inner}"), "outer", "outer-data")
        );
        assert_eq!(
            cs.strip_annotations(&frame).as_ref(),
            "Click me here or here please"
        );

        cs.swap_buffers();

        assert_eq!(cs.get_clicked(8, 0), None);
        assert_eq!(cs.get_clicked(10, 0), Some(&"outer-data"));
        assert_eq!(cs.get_clicked(17, 0), Some(&"inner-data"));
        assert_eq!(cs.get_clicked(20, 0), Some(&"inner-data"));
    }

    #[test]
    fn wide_characters_advance_two_columns() {
        let mut cs: ClickableRegistry<&str> = ClickableRegistry::new();
        let frame = format!("日本{}", cs.register_and_wrap("語", "cjk", "DATA"));
        assert_eq!(cs.strip_annotations(&frame).as_ref(), "日本語");
        cs.swap_buffers();

        assert_eq!(cs.get_clicked(3, 0), None);
        assert_eq!(cs.get_clicked(4, 0), Some(&"DATA"));
    }

    // --- Malformed sequences: pass through unchanged, next map cleared ---

    fn assert_invalid(frame: &str) {
        let mut cs: ClickableRegistry<&str> = ClickableRegistry::new();
        let stripped = cs.strip_annotations(frame);
        assert_eq!(stripped.as_ref(), frame, "invalid sequences pass through");
        assert!(cs.next.is_empty(), "next map cleared on invalid sequence");
    }

    #[test]
    fn invalid_missing_terminator_then_eof() {
        assert_invalid("Hello!\u{FFF9}sequence\u{FFFA}");
    }

    #[test]
    fn invalid_missing_terminator_followed_by_text() {
        assert_invalid("Hello!\u{FFF9}sequence\u{FFFA}abc");
    }

    #[test]
    fn invalid_missing_terminator_and_count() {
        assert_invalid("Hello!\u{FFF9}sequence");
    }

    #[test]
    fn invalid_missing_start() {
        assert_invalid("Hello!sequence\u{FFFA}\u{FFFB}");
    }

    #[test]
    fn invalid_unregistered_reference() {
        assert_invalid("Hello!\u{FFF9}sequence\u{FFFA}\u{FFFA}\u{FFFA}\u{FFFA}\u{FFFB}");
    }

    #[test]
    fn invalid_missing_start_and_count() {
        assert_invalid("Hello!sequence\u{FFFB}");
    }

    #[test]
    fn parse_failure_preserves_active_frame() {
        let mut cs: ClickableRegistry<&str> = ClickableRegistry::new();
        let frame = cs.register_and_wrap("ok", "key", "DATA");
        cs.strip_annotations(&frame);
        cs.swap_buffers();

        cs.register_and_wrap("next", "key2", "DATA-2");
        cs.strip_annotations("broken\u{FFFB}");

        // The on-screen frame still answers; the broken one is gone.
        assert_eq!(cs.get_clicked(0, 0), Some(&"DATA"));
        assert!(cs.next.is_empty());
    }

    #[test]
    fn stable_keys_reuse_dense_ids() {
        let mut cs: ClickableRegistry<u32> = ClickableRegistry::new();
        cs.register_and_wrap("a", "k1", 1);
        cs.register_and_wrap("b", "k2", 2);
        let again = cs.register_and_wrap("c", "k1", 3);
        // "k1" keeps id 0: no id units between the text and terminator.
        assert_eq!(again, format!("{ANNOTATION_START}c{ANNOTATION_END}"));
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Strip of wrap restores the original text.
            #[test]
            fn wrap_strip_round_trip(s in "[ -~]{0,40}", key in "[a-z]{1,8}") {
                let mut cs: ClickableRegistry<u8> = ClickableRegistry::new();
                let frame = cs.register_and_wrap(&s, &key, 7);
                let stripped = cs.strip_annotations(&frame);
                prop_assert_eq!(stripped.as_ref(), s.as_str());
            }

            /// Every column of a single-line span hits; neighbors miss.
            #[test]
            fn containment_matches_span(prefix in "[ -~]{0,20}", body in "[!-~]{1,20}") {
                let mut cs: ClickableRegistry<u8> = ClickableRegistry::new();
                let frame = format!("{prefix}{}", cs.register_and_wrap(&body, "k", 1));
                cs.strip_annotations(&frame);
                cs.swap_buffers();

                let start = prefix.len();
                let end = start + body.len() - 1;
                for x in start..=end {
                    prop_assert_eq!(cs.get_clicked(x, 0), Some(&1));
                }
                if start > 0 {
                    prop_assert_eq!(cs.get_clicked(start - 1, 0), None);
                }
                prop_assert_eq!(cs.get_clicked(end + 1, 0), None);
                prop_assert_eq!(cs.get_clicked(0, 1), None);
            }

            /// Entries not re-registered after a swap stop answering.
            #[test]
            fn generation_evicts_stale_entries(s in "[!-~]{1,10}") {
                let mut cs: ClickableRegistry<u8> = ClickableRegistry::new();
                let frame = cs.register_and_wrap(&s, "k", 1);
                cs.strip_annotations(&frame);
                cs.swap_buffers();
                prop_assert!(cs.get_clicked(0, 0).is_some());

                // Next frame registers nothing.
                cs.strip_annotations(&s);
                cs.swap_buffers();
                prop_assert_eq!(cs.get_clicked(0, 0), None);
            }
        }
    }
}
