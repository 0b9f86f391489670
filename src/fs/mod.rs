//! Filesystem module.
//!
//! Provides:
//! - Creator directory layout
//! - Filename and directory name sanitization
//! - Atomic (write-new-then-rename) file replacement

pub mod atomic;
pub mod naming;
pub mod paths;

pub use atomic::write_atomic;
pub use naming::{
    sanitize_dir_name, sanitize_file_component, sanitize_filename_lossy, sanitize_path_component,
};
pub use paths::{part_path, write_text_document, CreatorPaths};
