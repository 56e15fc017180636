pub mod header;

pub use header::{extract, ExtractedContent};
