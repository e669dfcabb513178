//! The site document: groups of tiles and links plus the reference tables used to resolve them.
//!
//! The serialized form follows the "Common Data Model" layout used by launchpad backends:
//!
//! ```json
//! {
//!   "_version": "3.0.0",
//!   "payload": { "groupsOrder": ["HOME", "ONE"] },
//!   "groups": {
//!     "HOME": {
//!       "identification": { "id": "HOME", "title": "Home", "isDefaultGroup": true },
//!       "payload": { "tiles": [{ "id": "t1", "vizId": "viz1" }], "links": [] }
//!     }
//!   },
//!   "visualizations": { "viz1": { "vizType": "sap.ushell.StaticAppLauncher", "vizConfig": {} } },
//!   "vizTypes": { "sap.ushell.StaticAppLauncher": {} },
//!   "applications": {},
//!   "catalogs": {}
//! }
//! ```
//!
//! Order is significant in `groupsOrder` and in each group's `tiles`/`links` lists; everything
//! keyed by id lives in ordered maps so that serialization is deterministic.

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::{error::SiteError, hash::Intent};

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification: Option<SiteIdentification>,
    #[serde(default)]
    pub payload: SitePayload,
    #[serde(default)]
    pub groups: BTreeMap<String, Group>,
    #[serde(default)]
    pub catalogs: BTreeMap<String, Catalog>,
    #[serde(default)]
    pub visualizations: BTreeMap<String, Visualization>,
    #[serde(default)]
    pub viz_types: BTreeMap<String, VizType>,
    #[serde(default)]
    pub applications: BTreeMap<String, Application>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteIdentification {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitePayload {
    /// `None` when the backend delivered a site without any ordering information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_order: Option<Vec<String>>,
}

impl Site {
    pub fn from_json(json: &str) -> Result<Site, SiteError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SiteError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn groups_order(&self) -> &[String] {
        self.payload.groups_order.as_deref().unwrap_or(&[])
    }

    /// A site without `groupsOrder` gets one listing every existing group in id order, so no
    /// group is orphaned by the first ordered insert.
    pub fn groups_order_mut(&mut self) -> &mut Vec<String> {
        let groups = &self.groups;
        self.payload
            .groups_order
            .get_or_insert_with(|| groups.keys().cloned().collect())
    }

    pub fn group(&self, group_id: &str) -> Option<&Group> {
        self.groups.get(group_id)
    }

    pub fn group_mut(&mut self, group_id: &str) -> Option<&mut Group> {
        self.groups.get_mut(group_id)
    }

    /// Groups in display order. Ids in `groupsOrder` without a group entry are skipped.
    pub fn ordered_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups_order()
            .iter()
            .filter_map(|id| self.groups.get(id))
    }

    /// Every group exactly once: first in display order, then any group `groupsOrder` misses.
    pub fn all_groups(&self) -> Vec<&Group> {
        let mut seen = BTreeSet::new();
        let mut groups = Vec::with_capacity(self.groups.len());
        for group in self.ordered_groups() {
            if seen.insert(group.id()) {
                groups.push(group);
            }
        }
        for (id, group) in self.groups.iter() {
            if !seen.contains(id.as_str()) {
                groups.push(group);
            }
        }
        groups
    }

    /// Groups as a host shows them: `groupsOrder` order, or every group when the site has no
    /// ordering information at all.
    pub fn display_groups(&self) -> Vec<&Group> {
        match self.payload.groups_order {
            Some(_) => self.ordered_groups().collect(),
            None => self.all_groups(),
        }
    }

    pub fn default_group(&self) -> Option<&Group> {
        self.ordered_groups()
            .find(|g| g.identification.is_default_group)
            .or_else(|| {
                self.groups
                    .values()
                    .find(|g| g.identification.is_default_group)
            })
    }

    /// Locates a tile or link by id across all groups.
    pub fn find_tile(&self, tile_id: &str) -> Option<TileLocation> {
        self.all_groups().into_iter().find_map(|group| {
            group.position_of(tile_id).map(|(kind, index)| TileLocation {
                group_id: group.id().to_string(),
                kind,
                index,
            })
        })
    }

    pub fn tile(&self, location: &TileLocation) -> Option<&Tile> {
        self.groups
            .get(&location.group_id)
            .and_then(|g| g.list(location.kind).get(location.index))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.groups.contains_key(id)
            || self
                .groups
                .values()
                .any(|g| g.payload.entries().any(|(_, t)| t.id == id))
    }

    /// Checks that `groupsOrder` and `groups` reference each other exactly once. A site without
    /// `groupsOrder` only has its group keys checked.
    pub fn check_invariants(&self) -> Result<(), SiteError> {
        let mut problems = Vec::new();
        if let Some(order) = self.payload.groups_order.as_ref() {
            let mut seen = BTreeSet::new();
            for id in order {
                if !seen.insert(id.as_str()) {
                    problems.push(format!("'{id}' appears more than once in groupsOrder"));
                }
                if !self.groups.contains_key(id) {
                    problems.push(format!("'{id}' is in groupsOrder but has no group entry"));
                }
            }
            for id in self.groups.keys() {
                if !seen.contains(id.as_str()) {
                    problems.push(format!("group '{id}' is missing from groupsOrder"));
                }
            }
        }
        for (key, group) in self.groups.iter() {
            if key != group.id() {
                problems.push(format!(
                    "group stored under '{key}' identifies itself as '{}'",
                    group.id()
                ));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(SiteError::InvalidInput(problems.join("; ")))
        }
    }
}

/// Where a tile currently lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLocation {
    pub group_id: String,
    pub kind: TileKind,
    /// Index within the tile or link list named by `kind`.
    pub index: usize,
}

/// Which of a group's two lists an entry belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    #[default]
    Tile,
    Link,
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileKind::Tile => write!(f, "tile"),
            TileKind::Link => write!(f, "link"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub identification: GroupIdentification,
    #[serde(default)]
    pub payload: GroupPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupIdentification {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Absent means visible. Only ever written as `Some(false)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_visible: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_group_locked: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_preset: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_default_group: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub links: Vec<Tile>,
}

impl GroupPayload {
    pub fn list(&self, kind: TileKind) -> &Vec<Tile> {
        match kind {
            TileKind::Tile => &self.tiles,
            TileKind::Link => &self.links,
        }
    }

    pub fn list_mut(&mut self, kind: TileKind) -> &mut Vec<Tile> {
        match kind {
            TileKind::Tile => &mut self.tiles,
            TileKind::Link => &mut self.links,
        }
    }

    /// Tiles followed by links, tagged with their list.
    pub fn entries(&self) -> impl Iterator<Item = (TileKind, &Tile)> {
        self.tiles
            .iter()
            .map(|t| (TileKind::Tile, t))
            .chain(self.links.iter().map(|l| (TileKind::Link, l)))
    }
}

impl Group {
    pub fn new<I: Into<String>, T: Into<String>>(id: I, title: T) -> Group {
        Group {
            identification: GroupIdentification {
                id: id.into(),
                title: title.into(),
                ..Default::default()
            },
            payload: GroupPayload::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.identification.id
    }

    pub fn title(&self) -> &str {
        &self.identification.title
    }

    pub fn is_visible(&self) -> bool {
        self.identification.is_visible.unwrap_or(true)
    }

    pub fn is_locked(&self) -> bool {
        self.identification.is_group_locked
    }

    pub fn is_preset(&self) -> bool {
        self.identification.is_preset
    }

    /// User-created groups can be removed; preset groups can only be reset.
    pub fn is_removable(&self) -> bool {
        !self.identification.is_preset
    }

    pub fn is_default(&self) -> bool {
        self.identification.is_default_group
    }

    /// Featured groups are not part of this document model.
    pub fn is_featured(&self) -> bool {
        false
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.payload.tiles
    }

    pub fn links(&self) -> &[Tile] {
        &self.payload.links
    }

    pub fn list(&self, kind: TileKind) -> &Vec<Tile> {
        self.payload.list(kind)
    }

    pub fn position_of(&self, tile_id: &str) -> Option<(TileKind, usize)> {
        if let Some(idx) = self.payload.tiles.iter().position(|t| t.id == tile_id) {
            return Some((TileKind::Tile, idx));
        }
        self.payload
            .links
            .iter()
            .position(|t| t.id == tile_id)
            .map(|idx| (TileKind::Link, idx))
    }

    /// Maps an index in the combined `tiles ++ links` addressing onto a concrete list.
    pub fn split_index(&self, combined: usize) -> (TileKind, usize) {
        let tile_count = self.payload.tiles.len();
        if combined < tile_count {
            (TileKind::Tile, combined)
        } else {
            (TileKind::Link, combined - tile_count)
        }
    }
}

/// A tile or link. Both share the same shape; list membership decides how it is shown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viz_id: Option<String>,
    /// Stored on bookmarks; catalog tiles take their type from the visualization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viz_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TileTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_refresh_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_bookmark: bool,
}

impl Tile {
    pub fn from_viz<I: Into<String>, V: Into<String>>(id: I, viz_id: V) -> Tile {
        Tile {
            id: id.into(),
            viz_id: Some(viz_id.into()),
            ..Default::default()
        }
    }

    pub fn bookmark<I: Into<String>>(id: I, target: TileTarget) -> Tile {
        Tile {
            id: id.into(),
            target: Some(target),
            is_bookmark: true,
            ..Default::default()
        }
    }
}

/// An inline navigation target stored on a bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileTarget {
    Intent(IntentTarget),
    Url { url: String },
}

impl TileTarget {
    /// `#SO-action?...` urls become intent targets, anything else stays a raw url.
    pub fn from_url(url: &str) -> TileTarget {
        match Intent::parse(url) {
            Ok(intent) if url.starts_with('#') => TileTarget::Intent(IntentTarget::from(&intent)),
            _ => TileTarget::Url {
                url: url.to_string(),
            },
        }
    }

    /// The navigation string: a `#`-hash for intents, the raw url otherwise.
    pub fn to_url(&self) -> String {
        match self {
            TileTarget::Intent(target) => Intent::from(target).to_hash(),
            TileTarget::Url { url } => url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentTarget {
    pub semantic_object: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<TargetParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_specific_route: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetParameter {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub identification: CatalogIdentification,
    #[serde(default)]
    pub payload: CatalogPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogIdentification {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPayload {
    #[serde(default)]
    pub viz: Vec<String>,
}

/// Reference data describing how a catalog tile looks and where it navigates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visualization {
    pub viz_type: String,
    #[serde(default)]
    pub viz_config: VizConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VizConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<VizTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator_data_source: Option<IndicatorDataSource>,
}

/// Either an application inbound reference or a plain url.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VizTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbound_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<TargetParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_specific_route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorDataSource {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<u32>,
}

/// Descriptor for a visualization type: which component renders it and how large it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VizType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub inbounds: BTreeMap<String, Inbound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inbound {
    pub semantic_object: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Default parameter values the inbound contributes to the target hash.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}
