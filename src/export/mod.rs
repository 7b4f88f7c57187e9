//! Document export

pub mod pdf;

pub use pdf::{render_project_pdf, safe_file_name, PdfError};
