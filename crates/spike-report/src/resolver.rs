//! User display-name resolution with a per-run cache.
//!
//! Notes and comments reference their author either inline or by id. Ids are
//! looked up once through a [`UserDirectory`] and the resulting name is kept
//! for the rest of the run. Lookups never fail the caller: an unreachable
//! user is shown by its raw id.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::UserDirectory;
use crate::config::TeamContext;
use crate::models::UserRef;

/// Memoized id → display name mapping. Entries are never evicted.
#[derive(Debug, Default, Clone)]
pub struct UserCache {
    names: HashMap<String, String>,
}

impl UserCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached name for `user_id`.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<&str> {
        self.names.get(user_id).map(String::as_str)
    }

    /// Record the name for `user_id`.
    pub fn insert(&mut self, user_id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(user_id.into(), name.into());
    }

    /// Number of cached ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolves [`UserRef`]s to display names, calling the directory at most once per id.
pub struct UserResolver<'a, D: UserDirectory + ?Sized> {
    directory: &'a D,
    cache: UserCache,
    pause: Duration,
    lookups: usize,
}

impl<'a, D: UserDirectory + ?Sized> UserResolver<'a, D> {
    /// Create a resolver with an empty cache.
    ///
    /// `pause` is slept after every live lookup to stay under the API rate limit.
    pub fn new(directory: &'a D, pause: Duration) -> Self {
        Self::with_cache(directory, UserCache::new(), pause)
    }

    /// Create a resolver seeded with an existing cache.
    pub fn with_cache(directory: &'a D, cache: UserCache, pause: Duration) -> Self {
        Self {
            directory,
            cache,
            pause,
            lookups: 0,
        }
    }

    /// The cache built so far.
    #[must_use]
    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    /// Number of live directory calls made.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    /// Display name for `user`.
    ///
    /// - absent or empty reference: `""`
    /// - inline user: `"{first} {last}"`, else email, else `""`
    /// - id: cached name, else one lookup with the same fallbacks ending in the raw id
    pub async fn resolve(&mut self, user: Option<&UserRef>, team: &TeamContext) -> String {
        match user {
            None => String::new(),
            Some(user) if user.is_empty() => String::new(),
            Some(UserRef::Inline(inline)) => inline.display_name().unwrap_or_default(),
            Some(UserRef::Id(user_id)) => self.resolve_id(user_id, team).await,
        }
    }

    async fn resolve_id(&mut self, user_id: &str, team: &TeamContext) -> String {
        if let Some(name) = self.cache.get(user_id) {
            return name.to_string();
        }

        self.lookups += 1;
        let name = match self.directory.fetch_user(user_id, team).await {
            Ok(user) => user
                .profile
                .display_name()
                .unwrap_or_else(|| user_id.to_string()),
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    team = %team.name,
                    error = %e,
                    "User lookup failed, using raw id"
                );
                user_id.to_string()
            }
        };

        debug!(user_id = %user_id, name = %name, "Resolved user");
        self.cache.insert(user_id, name.clone());

        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
        name
    }
}
