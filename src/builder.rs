//! Builder-style configuration for connecting to the X server.
//!
//! For a default configuration, `Builder::new().build(&window)` is all you need!

use crate::Manager;

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    /// The X server doesn't speak XInput 2.
    #[error("XInput 2 is not supported by the server")]
    Unsupported,
    /// The given window handle doesn't use a supported connection type.
    /// This includes cases where the platform is otherwise supported but the feature was disabled at compile-time.
    #[error("handle doesn't contain a supported window type")]
    UnsupportedPlatform,
    /// Failed to acquire a window handle
    #[error("{:?}", .0)]
    HandleError(raw_window_handle::HandleError),
    #[cfg(xinput2)]
    #[error(transparent)]
    X11(#[from] crate::platform::xinput2::Error),
}
// #[from] thiserror attribute breaks horribly D:
impl From<raw_window_handle::HandleError> for BuildError {
    fn from(value: raw_window_handle::HandleError) -> Self {
        Self::HandleError(value)
    }
}

/// Pre-construction configuration for a [`Manager`].
#[derive(Default, Clone, Debug)]
pub struct Builder {
    display_name: Option<String>,
    unaccelerated: bool,
}

/// # Configuration
impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// The X display to connect to, such as `":1"`. Defaults to the `DISPLAY` environment variable.
    ///
    /// This must be the same display the window handed to [`Builder::build`] lives on.
    #[must_use]
    pub fn display_name(self, name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..self
        }
    }
    /// Report motion as the device sent it, before the server applies pointer acceleration.
    /// Default `false`.
    #[must_use]
    pub fn unaccelerated(self, unaccelerated: bool) -> Self {
        Self {
            unaccelerated,
            ..self
        }
    }
}
/// # Finishing
impl Builder {
    /// Build from a window handle carrier, such as a reference to a `winit` window.
    ///
    /// Raw events are delivered regardless of which window has focus, so the window only has to
    /// exist during construction.
    // Silly clippy, it's a self-describing err type!
    #[allow(clippy::missing_errors_doc)]
    pub fn build(
        self,
        rwh: &impl raw_window_handle::HasWindowHandle,
    ) -> Result<Manager, BuildError> {
        self.build_raw(rwh.window_handle()?.as_raw())
    }
    /// Build from a raw window handle, which must be an Xlib or Xcb window.
    #[allow(clippy::missing_errors_doc)]
    pub fn build_raw(
        self,
        rwh: raw_window_handle::RawWindowHandle,
    ) -> Result<Manager, BuildError> {
        match rwh {
            #[cfg(xinput2)]
            raw_window_handle::RawWindowHandle::Xlib(xlib) => {
                // XIDs are 29 bits, a wider one can't be real.
                let window =
                    u32::try_from(xlib.window).map_err(|_| BuildError::UnsupportedPlatform)?;
                self.build_x11(Some(window))
            }
            #[cfg(xinput2)]
            raw_window_handle::RawWindowHandle::Xcb(xcb) => self.build_x11(Some(xcb.window.get())),
            _ => Err(BuildError::UnsupportedPlatform),
        }
    }
    /// Build without a window, listening on the root window only.
    #[allow(clippy::missing_errors_doc)]
    pub fn build_root(self) -> Result<Manager, BuildError> {
        #[cfg(xinput2)]
        {
            self.build_x11(None)
        }
        #[cfg(not(xinput2))]
        {
            Err(BuildError::UnsupportedPlatform)
        }
    }
    /// Whether the configured display supports raw mouse input, without building anything.
    /// Failing to connect counts as unsupported.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        #[cfg(xinput2)]
        {
            use crate::platform::xinput2::X11Connection;
            match X11Connection::connect(self.display_name.as_deref(), self.unaccelerated) {
                Ok(conn) => crate::driver::Driver::is_supported(&parking_lot::Mutex::new(conn)),
                Err(err) => {
                    log::debug!("couldn't connect to probe for XInput: {err}");
                    false
                }
            }
        }
        #[cfg(not(xinput2))]
        {
            false
        }
    }
    #[cfg(xinput2)]
    fn build_x11(self, window: Option<u32>) -> Result<Manager, BuildError> {
        use crate::driver::{Driver, InitError};
        use crate::platform::xinput2::X11Connection;

        let conn = X11Connection::connect(self.display_name.as_deref(), self.unaccelerated)?;
        let display = std::sync::Arc::new(parking_lot::Mutex::new(conn));
        let driver = Driver::new(display, window).map_err(|err| match err {
            InitError::Unsupported => BuildError::Unsupported,
            InitError::Connection(err) => BuildError::X11(err),
        })?;
        Ok(Manager {
            internal: crate::platform::PlatformManager::XInput2(driver),
        })
    }
}
