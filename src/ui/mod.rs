pub(crate) mod highlight;
pub mod output;

pub use output::{render_error, render_result, OutputStyle};
