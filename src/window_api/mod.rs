//! Contains logic for reading the foreground window from different environments.
//! [GenericWindowManager] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::{path::Path, sync::Arc};

use anyhow::Result;
#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWindowData {
    /// Title of the window. For example 'bash in hello' or 'Vibing in YouTube - Chrome'.
    /// Windows without a title report an empty string.
    pub window_title: Arc<str>,
    /// Name of the application owning the window, for example 'firefox' or 'Code.exe'.
    pub app_name: Arc<str>,
}

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, automock)]
pub trait WindowManager {
    /// Returns the window currently holding focus. `Ok(None)` means nothing has focus right
    /// now (a locked screen, an empty desktop), which is not an error.
    fn get_active_window_data(&mut self) -> Result<Option<ActiveWindowData>>;
}

/// Serves as a cross-compatible WindowManager implementation.
pub struct GenericWindowManager {
    inner: Box<dyn WindowManager>,
}

impl GenericWindowManager {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowManager;
                Ok(Self {
                    inner: Box::new(WindowsWindowManager::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxWindowManager;
                Ok(Self {
                    inner: Box::new(LinuxWindowManager::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No window manager was compiled in, enable the `win` or `x11` feature"
                ))
            }
        }
    }
}

impl WindowManager for GenericWindowManager {
    fn get_active_window_data(&mut self) -> Result<Option<ActiveWindowData>> {
        self.inner.get_active_window_data()
    }
}

/// Turns an executable path into the application name stored with events.
pub fn app_name_from_executable(executable: &str) -> String {
    Path::new(executable)
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| executable.to_string())
}

#[cfg(test)]
mod tests {
    use super::app_name_from_executable;

    #[test]
    fn test_app_name_strips_directories() {
        assert_eq!(app_name_from_executable("/usr/lib/firefox/firefox"), "firefox");
        assert_eq!(app_name_from_executable("slack"), "slack");
    }
}
