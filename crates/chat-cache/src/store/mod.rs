//! Cache store implementations

mod caches;
mod grouped_cache;

pub use caches::{CacheFlags, Caches};
pub use grouped_cache::{CacheStore, GroupedCache};
