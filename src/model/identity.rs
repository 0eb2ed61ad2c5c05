use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a window by its owning application (`uuid`) and its own name.
///
/// An application's main window carries the application's uuid as its name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowIdentity {
    pub uuid: String,
    pub name: String,
}

impl WindowIdentity {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self { uuid: uuid.into(), name: name.into() }
    }

    /// Identity of the main window of the application with the given uuid.
    pub fn main_window_of(uuid: impl Into<String>) -> Self {
        let uuid = uuid.into();
        Self { name: uuid.clone(), uuid }
    }

    /// Identity of the main window of the application owning this window.
    pub fn main_window(&self) -> Self { Self::main_window_of(self.uuid.clone()) }

    pub fn is_main_window(&self) -> bool { self.uuid == self.name }
}

impl fmt::Display for WindowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.uuid, self.name)
    }
}
