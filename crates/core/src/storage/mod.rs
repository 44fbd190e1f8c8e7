//! Disk I/O and file lifecycle.
//!
//! Preallocates temp files (fallocate on Linux when available, else set_len),
//! supports concurrent offset writes (pwrite), fsync policy, and atomic
//! finalize (rename from `.par` to the final name).

mod builder;
mod writer;

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".par";

/// Path for the temp file: appends `.par` to the final path (e.g. `file.iso` → `file.iso.par`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}

/// Path for the plan file: appends `.parts` to the temp path.
pub fn plan_path(temp_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = temp_path.as_os_str().to_owned();
    o.push(".parts");
    std::path::PathBuf::from(o)
}
