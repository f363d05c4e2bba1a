pub mod glyph;
pub mod render;

pub use render::{FrameStats, GridRenderer, Layout, Scene};
