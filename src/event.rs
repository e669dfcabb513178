use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::site::TileKind;

/// Patch describing a change the adapter applied (and persisted) to the site document.
///
/// Presentation layers apply these to their own view state instead of observing a shared model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteEvent {
    /// Group id, position in groupsOrder
    GroupAdded(String, usize),
    /// Group id, position it occupied in groupsOrder
    GroupRemoved(String, Option<usize>),
    /// Group id, old title, new title
    GroupRenamed(String, String, String),
    /// Group id, old position, new position
    GroupMoved(String, usize, usize),
    /// Ids of the groups now hidden; every other group is visible
    GroupsHidden(Vec<String>),
    /// Group id restored from the original site
    GroupReset(String),
    /// A default group was generated because the site had none
    DefaultGroupCreated(String),
    /// Group id, tile id, list, index within the list
    TileAdded(String, String, TileKind, usize),
    /// Group id, tile id, list, index within the list
    TileRemoved(String, String, TileKind, usize),
    TileMoved(TileMove),
    /// Group id, tile id
    BookmarkAdded(String, String),
    BookmarksUpdated(Vec<String>),
    BookmarksDeleted(Vec<String>),
}

/// Source and destination of a moved tile, both as (group, list, index within list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMove {
    pub tile_id: String,
    pub from_group: String,
    pub from_kind: TileKind,
    pub from_index: usize,
    pub to_group: String,
    pub to_kind: TileKind,
    pub to_index: usize,
}

impl TileMove {
    pub fn is_noop(&self) -> bool {
        self.from_group == self.to_group
            && self.from_kind == self.to_kind
            && self.from_index == self.to_index
    }
}

impl SiteEvent {
    /// False for events describing an operation that left the document as it was.
    pub fn changes_site(&self) -> bool {
        match self {
            SiteEvent::TileMoved(m) => !m.is_noop(),
            SiteEvent::BookmarksUpdated(ids) | SiteEvent::BookmarksDeleted(ids) => !ids.is_empty(),
            _ => true,
        }
    }
}

impl Display for SiteEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SiteEvent::GroupAdded(id, idx) => write!(f, "GroupAdded({id}@{idx})"),
            SiteEvent::GroupRemoved(id, _) => write!(f, "GroupRemoved({id})"),
            SiteEvent::GroupRenamed(id, _, new) => write!(f, "GroupRenamed({id} -> '{new}')"),
            SiteEvent::GroupMoved(id, from, to) => write!(f, "GroupMoved({id}: {from} -> {to})"),
            SiteEvent::GroupsHidden(ids) => write!(f, "GroupsHidden({})", ids.join(", ")),
            SiteEvent::GroupReset(id) => write!(f, "GroupReset({id})"),
            SiteEvent::DefaultGroupCreated(id) => write!(f, "DefaultGroupCreated({id})"),
            SiteEvent::TileAdded(group, tile, kind, idx) => {
                write!(f, "TileAdded({group}/{kind}/{idx}: {tile})")
            }
            SiteEvent::TileRemoved(group, tile, kind, idx) => {
                write!(f, "TileRemoved({group}/{kind}/{idx}: {tile})")
            }
            SiteEvent::TileMoved(m) => write!(
                f,
                "TileMoved({}: {}/{}/{} -> {}/{}/{})",
                m.tile_id, m.from_group, m.from_kind, m.from_index, m.to_group, m.to_kind, m.to_index
            ),
            SiteEvent::BookmarkAdded(group, tile) => write!(f, "BookmarkAdded({group}: {tile})"),
            SiteEvent::BookmarksUpdated(ids) => write!(f, "BookmarksUpdated({})", ids.len()),
            SiteEvent::BookmarksDeleted(ids) => write!(f, "BookmarksDeleted({})", ids.len()),
        }
    }
}
