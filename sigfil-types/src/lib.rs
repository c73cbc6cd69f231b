pub mod axis;
pub mod bit_depth;
pub mod error;
pub mod header;
pub mod telescope;

pub use axis::*;
pub use bit_depth::*;
pub use error::*;
pub use header::*;
pub use telescope::*;
