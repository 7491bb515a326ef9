//! ShadCN-style reusable UI components.
//!
//! - [`Button`]: Clickable button with variants
//! - [`icons`]: SVG icon components

mod button;
mod icons;

pub use button::{Button, ButtonSize, ButtonVariant};
pub use icons::*;
