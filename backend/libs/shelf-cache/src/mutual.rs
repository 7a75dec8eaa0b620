//! Mutual friends payload cached per user pair.

use crate::PairCache;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Preview entries kept alongside the mutual friend count
pub const DEFAULT_PREVIEW_LIMIT: usize = 3;

/// Minimal profile card shown in a mutual friends preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendPreview {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Mutual friend count with a bounded preview list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutualFriends {
    pub count: usize,
    pub preview: Vec<FriendPreview>,
}

impl MutualFriends {
    /// Friends of the first user that also appear in `friend_ids_b`.
    ///
    /// The preview keeps the order of `friends_a` and stops at `limit`; the
    /// count covers every mutual friend. Duplicate ids are counted once.
    pub fn between<S: AsRef<str>>(
        friends_a: &[FriendPreview],
        friend_ids_b: &[S],
        limit: usize,
    ) -> Self {
        let others: HashSet<&str> = friend_ids_b.iter().map(AsRef::as_ref).collect();
        let mut seen = HashSet::new();
        let mut result = Self::default();

        for friend in friends_a {
            let id = friend.user_id.as_str();
            if !others.contains(id) || !seen.insert(id) {
                continue;
            }
            result.count += 1;
            if result.preview.len() < limit {
                result.preview.push(friend.clone());
            }
        }

        result
    }
}

pub type MutualFriendsCache<E> = PairCache<MutualFriends, E>;

/// Pair cache for mutual friend lookups with the default TTL
pub fn mutual_friends_cache<E>() -> MutualFriendsCache<E>
where
    E: Clone + Send + Sync + 'static,
{
    PairCache::new(MUTUAL_FRIENDS_CACHE)
}

pub(crate) const MUTUAL_FRIENDS_CACHE: &str = "mutual_friends";

#[cfg(test)]
mod tests {
    use super::*;

    fn friend(id: &str) -> FriendPreview {
        FriendPreview {
            user_id: id.to_string(),
            display_name: format!("Reader {}", id),
            avatar_url: None,
        }
    }

    #[test]
    fn test_between_counts_all_and_bounds_preview() {
        let a: Vec<_> = ["u1", "u2", "u3", "u4", "u5"].iter().map(|id| friend(id)).collect();
        let b = ["u5", "u4", "u2", "u1", "u9"];

        let mutual = MutualFriends::between(&a, &b, DEFAULT_PREVIEW_LIMIT);
        assert_eq!(mutual.count, 4);
        let ids: Vec<_> = mutual.preview.iter().map(|f| f.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2", "u4"]);
    }

    #[test]
    fn test_between_no_overlap() {
        let a = vec![friend("u1")];
        let b: [&str; 0] = [];
        assert_eq!(MutualFriends::between(&a, &b, 3), MutualFriends::default());
    }

    #[test]
    fn test_between_ignores_duplicates() {
        let a = vec![friend("u1"), friend("u1")];
        let mutual = MutualFriends::between(&a, &["u1"], 3);
        assert_eq!(mutual.count, 1);
        assert_eq!(mutual.preview.len(), 1);
    }
}
