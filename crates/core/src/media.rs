//! Media catalog records supplied by the media library.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::EntityId;

/// Duration used when a media item or playlist entry has no usable duration.
pub const DEFAULT_MEDIA_DURATION_SECS: u32 = 5;

/// Kind of content a media item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    App,
}

/// A leaf content unit. Playlists reference media items by id and never own
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MediaItem {
    pub id: EntityId,
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// Natural play time in seconds.
    pub duration: u32,
    #[serde(default)]
    pub category: String,
}

impl MediaItem {
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        media_type: MediaType,
        duration: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            media_type,
            duration,
            category: String::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Duration to use when this item is dropped into a playlist.
    pub fn effective_duration(&self) -> u32 {
        if self.duration >= 1 {
            self.duration
        } else {
            DEFAULT_MEDIA_DURATION_SECS
        }
    }
}

/// A physical display known to the device directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
    pub id: EntityId,
    pub name: String,
    pub status: ScreenStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenStatus {
    Online,
    Offline,
}
