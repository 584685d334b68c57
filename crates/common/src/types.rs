use serde::{Deserialize, Serialize};

/// Login platform tag sent to the backend for Microsoft identities.
pub const PLATFORM_MICROSOFT: &str = "ms";

/// Where an item came from (e.g. a Wikipedia article).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSource {
    pub url: String,
    pub name: String,
}

/// A browsable piece of content, rendered as a card.
///
/// The backend has produced two shapes over time: a nested `source` object and
/// flat `source_url` / `source_name` fields. Both deserialize into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_ext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_mime: Option<String>,
    /// Thumbnail height in pixels, clamped server-side to 0..=135.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ItemSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default)]
    pub saved: bool,
}

impl Item {
    /// Resolve the item's source from whichever shape the backend sent.
    #[must_use]
    pub fn resolved_source(&self) -> Option<ItemSource> {
        if let Some(source) = &self.source {
            return Some(source.clone());
        }
        match (&self.source_url, &self.source_name) {
            (Some(url), Some(name)) => Some(ItemSource {
                url: url.clone(),
                name: name.clone(),
            }),
            (Some(url), None) => Some(ItemSource {
                url: url.clone(),
                name: String::new(),
            }),
            _ => None,
        }
    }

    /// Thumbnail location: an absolute URL, or the cached path keyed by id and extension.
    #[must_use]
    pub fn thumbnail(&self) -> Option<String> {
        if let Some(url) = self.thumb_url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }
        self.thumb_ext
            .as_deref()
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!("/static/cache/{}/thumb.{ext}", self.id))
    }
}

/// Identifies the user within the identity platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformId {
    pub oid: String,
    pub tid: String,
}

/// Session bootstrap request sent to `POST /api/users/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub platform: String,
    pub platform_id: PlatformId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Backend reply to a session bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<Vec<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recently_viewed: Option<Vec<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recently_searched: Option<Vec<Item>>,
}

impl SessionResult {
    /// The item lists present in this result, tagged with where they belong.
    pub fn lists(&self) -> impl Iterator<Item = (ItemList, &[Item])> {
        [
            (ItemList::Saved, self.saved.as_deref()),
            (ItemList::RecentlyViewed, self.recently_viewed.as_deref()),
            (ItemList::RecentlySearched, self.recently_searched.as_deref()),
        ]
        .into_iter()
        .filter_map(|(list, items)| items.map(|items| (list, items)))
    }
}

/// Named item lists the rendering layer hydrates after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemList {
    Saved,
    RecentlyViewed,
    RecentlySearched,
    SearchResults,
}

impl ItemList {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::RecentlyViewed => "recently_viewed",
            Self::RecentlySearched => "recently_searched",
            Self::SearchResults => "search_results",
        }
    }
}

/// Generic `{status, error?}` reply used by the item endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: bool,
    #[serde(default)]
    pub error: Option<String>,
}
