//! URL helpers: file-name/extension derivation and probe sanitization

mod parts;
mod sanitize;

pub use parts::{url_extension, url_filename_no_ext};
pub use sanitize::sanitize_url;
