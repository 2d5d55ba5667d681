pub mod context;
pub mod history;
pub mod settings;

pub use context::DetectionContext;
pub use history::{CacheEntry, HistoryEntry};
pub use settings::{AiProvider, OverlayPosition, Settings};
