//! Kappa Computer Vision Library
//!
//! Window capture, template lookup and correlation matching that feed the
//! collector checklist.

pub mod capture;
pub mod detection;
pub mod error;
pub mod template;
pub mod utils;

// Re-export commonly used types
pub use capture::{FrameAcquirer, WindowSystem, XcapWindows};
pub use detection::{DetectionConfig, ScanOutcome, ScanReport, Scanner};
pub use error::CvError;
pub use template::{MatchResult, Template, TemplateLoader, TemplateMatcher, TemplateStore};

// Error handling
pub type Result<T> = anyhow::Result<T>;
