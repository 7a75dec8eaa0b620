//! Cache key schema
//!
//! Key format: `{namespace}:{identifier}[:sub_key...]`. The namespace comes
//! first so that `namespace:*` patterns and per-namespace metrics work.

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Generic key: the prefix followed by each argument, `:` separated.
    ///
    /// Arguments are used verbatim, so callers must pass them in a stable order.
    pub fn generate<S: AsRef<str>>(prefix: &str, parts: &[S]) -> String {
        let mut key = String::from(prefix);
        for part in parts {
            key.push(':');
            key.push_str(part.as_ref());
        }
        key
    }

    // ============= Friendship Keys =============

    /// Format: friends:{user_id}:page:{page}
    pub fn friends_page(user_id: &str, page: u32) -> String {
        format!("friends:{}:page:{}", user_id, page)
    }

    /// Every cached friends page of a user.
    /// Format: friends:{user_id}:*
    pub fn friends_pattern(user_id: &str) -> String {
        format!("friends:{}:*", user_id)
    }

    /// Format: requests:pending:{user_id}
    pub fn pending_requests(user_id: &str) -> String {
        format!("requests:pending:{}", user_id)
    }

    /// Format: requests:sent:{user_id}
    pub fn sent_requests(user_id: &str) -> String {
        format!("requests:sent:{}", user_id)
    }

    // ============= Profile / Content Keys =============

    /// Format: profile:{user_id}
    pub fn profile(user_id: &str) -> String {
        format!("profile:{}", user_id)
    }

    /// Format: posts:{user_id}:page:{page}
    pub fn user_posts(user_id: &str, page: u32) -> String {
        format!("posts:{}:page:{}", user_id, page)
    }

    /// Format: notifications:{user_id}:unread
    pub fn unread_notifications(user_id: &str) -> String {
        format!("notifications:{}:unread", user_id)
    }
}
