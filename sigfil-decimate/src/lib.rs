pub mod config;
pub mod error;
pub mod pipeline;

pub use config::*;
pub use error::*;
pub use pipeline::*;
