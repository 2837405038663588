//! Channel and render-profile lookups.

use factory_models::{Channel, RenderProfile};

use crate::error::{StoreError, StoreResult};
use crate::Store;

impl Store {
    pub async fn get_channel(&self, channel_id: i64) -> StoreResult<Channel> {
        sqlx::query_as("SELECT * FROM channels WHERE id = ?")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::ChannelNotFound(channel_id.to_string()))
    }

    pub async fn get_channel_by_slug(&self, slug: &str) -> StoreResult<Channel> {
        sqlx::query_as("SELECT * FROM channels WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::ChannelNotFound(slug.to_string()))
    }

    pub async fn list_channels(&self) -> StoreResult<Vec<Channel>> {
        sqlx::query_as("SELECT * FROM channels ORDER BY slug")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn get_render_profile(&self, id: i64) -> StoreResult<Option<RenderProfile>> {
        sqlx::query_as("SELECT * FROM render_profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn render_profile_for_channel(&self, channel: &Channel) -> StoreResult<RenderProfile> {
        self.get_render_profile(channel.render_profile_id)
            .await?
            .ok_or_else(|| StoreError::ChannelNotFound(channel.slug.clone()))
    }
}
