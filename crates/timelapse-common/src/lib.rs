//! Timelapse-Common: shared error type and path rules.
//!
//! - **Error Handling**: one error enum used by every timelapse crate
//! - **Path Utilities**: naming rules for staged uploads and converted outputs
//!
//! # Examples
//!
//! ```
//! use timelapse_common::paths::output_file_name;
//! use timelapse_common::{Error, Result};
//!
//! assert_eq!(output_file_name("clip.mp4", 10), "clip_10x.mp4");
//!
//! fn needs_upload(staged: bool) -> Result<()> {
//!     if staged { Ok(()) } else { Err(Error::NoUpload) }
//! }
//! assert!(needs_upload(false).is_err());
//! ```

pub mod error;
pub mod paths;

pub use error::{Error, Result};
