pub mod dom_inspector;

pub use dom_inspector::{DomBridge, DomInspector};
