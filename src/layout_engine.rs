pub(crate) mod graph;
pub mod resize;

pub use graph::{Edge, Orientation};
pub use resize::{ResizeCascade, ResizeMember};
