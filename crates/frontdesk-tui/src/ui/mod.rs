//! Terminal UI module using ratatui.
//!
//! - `render`: Main frame rendering, layout and overlays
//! - `input`: Keyboard and mouse event handling
//! - `styles`: Color schemes and text styling

pub mod input;
pub mod render;
pub mod styles;
