//! crates/identity_core/src/profile.rs
//!
//! Read-only social-graph queries: channel profiles and watch history.
//!
//! Each query is a short sequence of plain store lookups (resolve the user,
//! count edges by foreign key, project the owner fields) joined in memory.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::domain::{ChannelProfile, WatchHistoryEntry};
use crate::error::{IdentityError, IdentityResult};
use crate::ports::{DatabaseService, PortError};
use crate::session::{non_blank, normalize_username};

pub struct ProfileAggregator {
    db: Arc<dyn DatabaseService>,
}

impl ProfileAggregator {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Resolves a channel by username and attaches its subscription counters.
    ///
    /// `is_subscribed` is always `false` for an anonymous viewer.
    pub async fn channel_profile(
        &self,
        viewer_id: Option<Uuid>,
        channel_username: &str,
    ) -> IdentityResult<ChannelProfile> {
        let username = non_blank(channel_username)
            .map(normalize_username)
            .ok_or_else(|| IdentityError::validation("Username is missing"))?;

        let channel = match self.db.find_user_by_username(&username).await {
            Ok(channel) => channel,
            Err(PortError::NotFound(_)) => {
                return Err(IdentityError::NotFound("Channel does not exist".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let subscriber_count = self.db.count_subscribers(channel.id).await?;
        let channels_subscribed_to_count = self.db.count_subscriptions(channel.id).await?;
        let is_subscribed = match viewer_id {
            Some(viewer) => self.db.is_subscribed(viewer, channel.id).await?,
            None => false,
        };

        debug!(channel_id = %channel.id, subscriber_count, "Channel profile computed");
        Ok(ChannelProfile {
            id: channel.id,
            username: channel.username,
            full_name: channel.full_name,
            email: channel.email,
            avatar_url: channel.avatar_url,
            cover_image_url: channel.cover_image_url,
            subscriber_count,
            channels_subscribed_to_count,
            is_subscribed,
        })
    }

    /// The user's watch history in stored order, each video with its owner summary.
    ///
    /// History entries whose video no longer exists are skipped.
    pub async fn watch_history(&self, user_id: Uuid) -> IdentityResult<Vec<WatchHistoryEntry>> {
        let history = self.db.get_watch_history(user_id).await?;
        if history.is_empty() {
            return Ok(Vec::new());
        }

        let videos: HashMap<Uuid, _> = self
            .db
            .get_videos_by_ids(&history)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let owner_ids: Vec<Uuid> = videos
            .values()
            .map(|v| v.owner_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let owners: HashMap<Uuid, _> = self
            .db
            .get_owner_summaries(&owner_ids)
            .await?
            .into_iter()
            .map(|o| (o.id, o))
            .collect();

        let entries = history
            .iter()
            .filter_map(|video_id| {
                // Repeated views of one video each keep their own entry.
                let video = videos.get(video_id)?.clone();
                let owner = owners.get(&video.owner_id).cloned();
                Some(WatchHistoryEntry { video, owner })
            })
            .collect();

        Ok(entries)
    }
}
