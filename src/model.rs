pub mod desktop;
mod error;
pub mod groups;
pub mod identity;
pub mod registry;

pub use desktop::Desktop;
pub use error::ModelError;
pub use groups::{SnapGroupId, TabGroup, TabGroupDimensions, TabGroupId, TabGroupInfo};
pub use identity::WindowIdentity;
pub use registry::{DesktopWindow, DisplayState, WindowRegistry, WindowState};
