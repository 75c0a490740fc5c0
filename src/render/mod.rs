//! Result presentation: summary markup and the full document view

pub mod document;
pub mod markup;

pub use document::{render_document, DocumentView};
