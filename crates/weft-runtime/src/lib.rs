#![forbid(unsafe_code)]

//! Renderer runtime: the standard frame-differencing renderer, its tick
//! scheduler, and the scroll-region bypass.

pub mod renderer;
pub mod standard;

mod ticker;

pub use renderer::{Renderer, RendererMsg};
pub use standard::StandardRenderer;
