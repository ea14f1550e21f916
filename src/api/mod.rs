// Serializable views of the global trace for external renderers.

pub mod dto;

pub use dto::{EdgeDto, GraphDto, NodeDto};
