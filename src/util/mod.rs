//! Small helpers shared across modules.

mod text;

pub use text::sanitize_title;
