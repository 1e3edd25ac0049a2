pub mod backoff;
pub mod cache_padded;
pub mod counter;
pub(crate) mod thread;

pub use backoff::Backoff;
pub use cache_padded::CachePadded;
pub use counter::Counter;
