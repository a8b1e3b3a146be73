//! Naming rules for staged uploads, previews and converted outputs.
//!
//! Client-supplied file names only ever contribute their final path
//! component, so they cannot steer where a file is written.

use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Reserved file name of the preview artifact inside the staging directory.
pub const PREVIEW_FILE_NAME: &str = "preview.mp4";

/// Name of the staging subdirectory created under the system temp directory.
pub const STAGING_DIR_NAME: &str = "timelapse";

/// Fallback used when a client sends no usable file name.
const FALLBACK_NAME: &str = "upload";

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[^.]+$").expect("invalid extension regex"));

/// Return the final path component of a client-supplied name.
///
/// Both `/` and `\` count as separators because browsers on Windows may send
/// full paths.
fn last_component(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name)
}

/// Reduce a client-supplied upload name to something safe to embed in a
/// staged file name.
///
/// # Examples
///
/// ```
/// use timelapse_common::paths::sanitize_upload_name;
///
/// assert_eq!(sanitize_upload_name("holiday.mp4"), "holiday.mp4");
/// assert_eq!(sanitize_upload_name("../../etc/passwd"), "passwd");
/// assert_eq!(sanitize_upload_name(".."), "upload");
/// ```
pub fn sanitize_upload_name(name: &str) -> String {
    let cleaned: String = last_component(name)
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Strip the final extension (`\.[^.]+$`) from the last component of `filename`.
///
/// # Examples
///
/// ```
/// use timelapse_common::paths::base_name;
///
/// assert_eq!(base_name("clip.mp4"), "clip");
/// assert_eq!(base_name("archive.tar.gz"), "archive.tar");
/// assert_eq!(base_name("noext"), "noext");
/// ```
pub fn base_name(filename: &str) -> String {
    EXTENSION_RE
        .replace(last_component(filename), "")
        .into_owned()
}

/// File name of a converted output: `{baseName}_{speed}x.mp4`.
///
/// # Examples
///
/// ```
/// use timelapse_common::paths::output_file_name;
///
/// assert_eq!(output_file_name("clip.mp4", 10), "clip_10x.mp4");
/// ```
pub fn output_file_name(filename: &str, speed: u32) -> String {
    format!("{}_{}x.mp4", base_name(filename), speed)
}

/// Default directory for finished conversions.
pub fn default_output_dir() -> String {
    if cfg!(windows) {
        "C:/timelapse-output".to_string()
    } else {
        shellexpand::tilde("~/timelapse-output").into_owned()
    }
}

/// Default staging directory: `{temp}/timelapse`.
pub fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join(STAGING_DIR_NAME)
}
