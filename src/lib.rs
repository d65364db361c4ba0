//! Fixed-capacity circular byte buffer for staging byte streams, plus a
//! small async pump that moves a stream through one.

pub mod circular_buffer;
pub mod config;
pub mod error;
pub mod pump;
pub mod sources;

pub use circular_buffer::CircularBuffer;
pub use error::Error;
