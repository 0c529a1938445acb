//! Game window capture

mod desktop;

pub use desktop::XcapWindows;

use image::RgbaImage;
use tracing::{debug, warn};

/// OS window lookup and pixel capture.
///
/// Implementations report failure as `None`; the caller decides what a
/// missing frame means.
pub trait WindowSystem: Send + Sync {
    type Handle;

    /// Locate the primary window of the named application.
    fn find_window(&self, name: &str) -> Option<Self::Handle>;

    /// Copy the window's current contents.
    fn capture_window(&self, handle: &Self::Handle) -> Option<RgbaImage>;
}

/// Captures the target window once per scan pass
pub struct FrameAcquirer<W> {
    windows: W,
    window_name: String,
}

impl<W: WindowSystem> FrameAcquirer<W> {
    pub fn new(windows: W, window_name: impl Into<String>) -> Self {
        Self {
            windows,
            window_name: window_name.into(),
        }
    }

    /// Current window pixels, or `None` when the window is missing, empty or
    /// could not be captured.
    pub fn acquire(&self) -> Option<RgbaImage> {
        let Some(handle) = self.windows.find_window(&self.window_name) else {
            warn!("{} window not found", self.window_name);
            return None;
        };

        let Some(frame) = self.windows.capture_window(&handle) else {
            warn!("Failed to capture {} window", self.window_name);
            return None;
        };

        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            warn!("{} window has an empty area", self.window_name);
            return None;
        }

        debug!(width, height, "frame captured");
        Some(frame)
    }
}
