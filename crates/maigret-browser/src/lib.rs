//! Headless browser screenshots of found profiles.
//!
//! Provides a shared chromiumoxide browser for page captures and the local
//! forwarding proxy HTTPS pages are loaded through.

pub mod error;
pub mod proxy;
pub mod screenshot;

pub use error::{BrowserError, Result};
pub use proxy::ForwardingProxy;
pub use screenshot::{screenshot_path, CaptureSettings, ScreenshotCapture};
