//! Rate limiting infrastructure

mod sliding_window;

pub use sliding_window::{RateLimiter, GLOBAL_IDENTIFIER};
