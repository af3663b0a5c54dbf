// Starling Actor Runtime
//
// An in-process actor runtime built on plain OS threads: a blocking queue,
// a fixed worker pool, chainable promises, and actors that handle one
// message per scheduling turn.

pub mod logging;
pub mod thread;

// Re-export commonly used types
pub use thread::*;
