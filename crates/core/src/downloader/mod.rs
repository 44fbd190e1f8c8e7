//! Fetchers: single-stream and segmented-range downloads over a shared
//! curl transport, driven by OS threads rather than an async runtime.

mod segmented;
mod single;
mod transport;

pub use segmented::{download_segmented, SegmentedOutcome};
pub use single::download_single;
pub use transport::CHUNK_SIZE;

pub(crate) use segmented::fetch_range_interruptible;
