//! Bookmark Matcher.
//!
//! A bookmark is a tile carrying its own navigation target instead of a catalog visualization.
//! Matching compares normalized keys: intents compare by semantic object, action, the
//! order-independent parameter multimap and the app-specific route; plain urls compare by exact
//! string equality, so `?a=1&b=2` and `?b=2&a=1` are different bookmarks.

use serde::{Deserialize, Serialize};

use crate::{
    error::SiteError,
    hash::Intent,
    site::{Group, Site, Tile, TileKind, TileTarget},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BookmarkKey {
    Intent(Intent),
    Url(String),
}

impl BookmarkKey {
    pub fn from_url(url: &str) -> BookmarkKey {
        if url.starts_with('#') {
            if let Ok(intent) = Intent::parse(url) {
                return BookmarkKey::Intent(intent);
            }
        }
        BookmarkKey::Url(url.to_string())
    }

    pub fn of_target(target: &TileTarget) -> BookmarkKey {
        match target {
            TileTarget::Intent(t) => BookmarkKey::Intent(Intent::from(t)),
            TileTarget::Url { url } => BookmarkKey::from_url(url),
        }
    }
}

/// Which bookmarks an operation applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkQuery {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viz_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_provider_id: Option<String>,
}

impl BookmarkQuery {
    pub fn new<U: Into<String>>(url: U) -> Self {
        BookmarkQuery {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_viz_type<V: Into<String>>(mut self, viz_type: V) -> Self {
        self.viz_type = Some(viz_type.into());
        self
    }

    pub fn with_content_provider<C: Into<String>>(mut self, content_provider_id: C) -> Self {
        self.content_provider_id = Some(content_provider_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), SiteError> {
        if self.url.trim().is_empty() {
            Err(SiteError::invalid("bookmark url must not be empty"))
        } else {
            Ok(())
        }
    }

    pub fn matcher(&self) -> BookmarkMatcher<'_> {
        BookmarkMatcher {
            key: BookmarkKey::from_url(&self.url),
            query: self,
        }
    }
}

pub struct BookmarkMatcher<'a> {
    key: BookmarkKey,
    query: &'a BookmarkQuery,
}

impl BookmarkMatcher<'_> {
    pub fn matches(&self, tile: &Tile) -> bool {
        let Some(target) = tile.target.as_ref() else {
            return false;
        };
        if let Some(viz_type) = &self.query.viz_type {
            if tile.viz_type.as_ref() != Some(viz_type) {
                return false;
            }
        }
        if let Some(provider) = &self.query.content_provider_id {
            if tile.content_provider.as_ref() != Some(provider) {
                return false;
            }
        }
        BookmarkKey::of_target(target) == self.key
    }
}

/// Fields a bookmark update overwrites. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_refresh_interval: Option<u32>,
}

impl BookmarkState {
    pub fn apply(&self, tile: &mut Tile) {
        if let Some(url) = &self.url {
            tile.target = Some(TileTarget::from_url(url));
        }
        if let Some(title) = &self.title {
            tile.title = Some(title.clone());
        }
        if let Some(subtitle) = &self.subtitle {
            tile.subtitle = Some(subtitle.clone());
        }
        if let Some(icon) = &self.icon {
            tile.icon = Some(icon.clone());
        }
        if let Some(info) = &self.info {
            tile.info = Some(info.clone());
        }
        if let Some(service_url) = &self.service_url {
            tile.service_url = Some(service_url.clone());
        }
        if let Some(interval) = self.service_refresh_interval {
            tile.service_refresh_interval = Some(interval);
        }
    }
}

/// Everything needed to create a bookmark tile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkParameters {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_refresh_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viz_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_provider_id: Option<String>,
}

impl BookmarkParameters {
    pub fn validate(&self) -> Result<(), SiteError> {
        if self.title.trim().is_empty() {
            return Err(SiteError::invalid("bookmark title must not be empty"));
        }
        if self.url.trim().is_empty() {
            return Err(SiteError::invalid("bookmark url must not be empty"));
        }
        Ok(())
    }

    /// Builds the bookmark tile; `default_viz_type` applies when no type was requested.
    pub fn into_tile(self, id: String, default_viz_type: &str) -> Tile {
        let mut tile = Tile::bookmark(id, TileTarget::from_url(&self.url));
        tile.title = Some(self.title);
        tile.subtitle = self.subtitle;
        tile.icon = self.icon;
        tile.info = self.info;
        tile.service_url = self.service_url;
        tile.service_refresh_interval = self.service_refresh_interval;
        tile.viz_type = Some(self.viz_type.unwrap_or_else(|| default_viz_type.to_string()));
        tile.content_provider = self.content_provider_id;
        tile
    }
}

/// Calls `visitor` for every matching tile and link in every group, each exactly once.
pub fn visit_bookmarks<F>(site: &Site, query: &BookmarkQuery, mut visitor: F) -> usize
where
    F: FnMut(&Tile, &Group),
{
    let matcher = query.matcher();
    let mut count = 0;
    for group in site.all_groups() {
        for (_, tile) in group.payload.entries() {
            if matcher.matches(tile) {
                visitor(tile, group);
                count += 1;
            }
        }
    }
    count
}

pub fn count_bookmarks(site: &Site, query: &BookmarkQuery) -> usize {
    visit_bookmarks(site, query, |_, _| {})
}

/// Applies `state` to every match and returns the updated tiles' ids.
pub fn update_bookmarks(site: &mut Site, query: &BookmarkQuery, state: &BookmarkState) -> Vec<String> {
    let matcher = query.matcher();
    let mut updated = Vec::new();
    for group in site.groups.values_mut() {
        for kind in [TileKind::Tile, TileKind::Link] {
            for tile in group.payload.list_mut(kind).iter_mut() {
                if matcher.matches(tile) {
                    state.apply(tile);
                    updated.push(tile.id.clone());
                }
            }
        }
    }
    updated
}

/// Removes every match, keeping the remaining tiles in order, and returns the removed ids.
pub fn delete_bookmarks(site: &mut Site, query: &BookmarkQuery) -> Vec<String> {
    let matcher = query.matcher();
    let mut removed = Vec::new();
    for group in site.groups.values_mut() {
        for kind in [TileKind::Tile, TileKind::Link] {
            group.payload.list_mut(kind).retain(|tile| {
                if matcher.matches(tile) {
                    removed.push(tile.id.clone());
                    false
                } else {
                    true
                }
            });
        }
    }
    removed
}
