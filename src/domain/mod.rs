// Core engine: records in, layered global trace out. No I/O in here.

pub mod dependency;
pub mod entity;
pub mod error;
pub mod extract;
pub mod global_trace;
pub mod level;
pub mod record;
pub mod reference;

pub use error::{Diagnostic, TraceGraphError, TraceGraphResult};
pub use global_trace::{EdgeKind, GlobalTrace, GraphEdge, GraphNode, GraphOptions, NodeDetails};
pub use record::{Element, RecordStore, TypeTag};
pub use reference::RecordId;
