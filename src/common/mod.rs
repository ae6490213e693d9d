pub mod config;
pub mod diagnostics;
pub mod output;
pub mod value;
