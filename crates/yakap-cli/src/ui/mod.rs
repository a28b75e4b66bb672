//! Terminal output helpers.

mod output;

pub use output::{error, header, info, success};
