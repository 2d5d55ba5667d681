pub mod overlay;

pub use overlay::{OverlayController, OverlayState};
