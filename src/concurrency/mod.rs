//! Concurrent digest checking
//!
//! [`check_all`] spreads manifest lookups over a fixed set of tokio tasks
//! and hands the caller a [`TagCheckStream`]. A failing tag only affects
//! its own [`TagCheckResult`]; siblings keep going.

pub mod pool;
pub mod stream;

pub use pool::check_all;
pub use stream::{TagCheckResult, TagCheckStream};
