//! Zero-copy table views over container bytes.

mod named;
mod record;

pub use named::*;
pub use record::*;
