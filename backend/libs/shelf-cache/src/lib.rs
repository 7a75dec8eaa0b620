//! Shelf caching layer
//!
//! - [`KeyValueCache`]: fail-open key-value store over Redis or an in-process map
//! - [`ResultCache`]: memoizes async producers in the key-value store
//! - [`PairCache`]: in-process cache for unordered user pairs with in-flight
//!   de-duplication, used for mutual friend lookups
//! - [`CacheProvider`]: builds the configured client once and tears it down
//!
//! Cache faults never reach callers; producer errors always do.

mod config;
mod error;
mod keys;
mod metrics;
mod pattern;
mod provider;

pub mod mutual;
pub mod pair;
pub mod result_cache;
pub mod store;

pub use config::{BackendKind, CacheConfig};
pub use error::{CacheError, CacheResult};
pub use keys::CacheKey;
pub use metrics::CacheMetrics;
pub use mutual::{mutual_friends_cache, FriendPreview, MutualFriends, MutualFriendsCache};
pub use pair::{PairCache, PairKey};
pub use pattern::glob_match;
pub use provider::CacheProvider;
pub use result_cache::{CachedFn, ResultCache};
pub use store::{CacheBackend, KeyValueCache, MemoryBackend, RedisBackend, SharedRedis};

/// Default TTL values (seconds)
pub mod ttl {
    pub const DEFAULT: u64 = 300; // 5 minutes
    pub const PAIR: u64 = 300; // 5 minutes
    pub const FRIENDS: u64 = 600; // 10 minutes
}
