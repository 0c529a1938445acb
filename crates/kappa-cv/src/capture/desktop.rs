use image::RgbaImage;
use tracing::{debug, warn};
use xcap::Window;

use super::WindowSystem;

/// Desktop windows through `xcap`.
///
/// A window matches when its application name or its title equals the
/// requested name, ignoring ASCII case.
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapWindows;

impl WindowSystem for XcapWindows {
    type Handle = Window;

    fn find_window(&self, name: &str) -> Option<Window> {
        let windows = match Window::all() {
            Ok(windows) => windows,
            Err(e) => {
                warn!("Failed to enumerate windows: {e}");
                return None;
            }
        };

        windows.into_iter().find(|window| {
            window.app_name().eq_ignore_ascii_case(name) || window.title().eq_ignore_ascii_case(name)
        })
    }

    fn capture_window(&self, window: &Window) -> Option<RgbaImage> {
        if window.is_minimized() {
            debug!("{} is minimized", window.title());
            return None;
        }
        if window.width() == 0 || window.height() == 0 {
            debug!("{} has a zero-size rectangle", window.title());
            return None;
        }

        match window.capture_image() {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Window capture failed: {e}");
                None
            }
        }
    }
}
