use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    adapter::SiteAdapter,
    bookmarks::{BookmarkParameters, BookmarkQuery, BookmarkState},
    error::{Rejection, RejectionPayload, SiteError},
    event::TileMove,
    mutators::MoveTileRequest,
    resolver::ResolvedTile,
    service::{ResolutionService, SiteService},
    site::{Group, Tile, TileKind},
};

/// Drag and drop payload of a tile move. Indices use combined `tiles ++ links` addressing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTileOp {
    pub tile_id: String,
    pub source_index: i64,
    pub target_index: i64,
    pub source_group: String,
    pub target_group: String,
    pub target_type: TileKind,
}

/// Command interface between a launchpad host and the [`SiteAdapter`].
///
/// Indices arrive as signed integers from the host and are checked before anything is touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Load the site (joining a load in flight) and return its groups.
    LoadSite,
    GetGroups,
    GetDefaultGroup,
    /// Title of the new group
    AddGroup(String),
    RemoveGroup(String),
    /// Group id, new title
    SetGroupTitle(String, String),
    /// Group id, new position
    MoveGroup(String, i64),
    HideGroups(Vec<String>),
    ResetGroup(String),
    /// Visualization id, target group (default group when absent)
    AddTile(String, Option<String>),
    /// Group id, tile id, combined index
    RemoveTile(String, String, i64),
    MoveTile(MoveTileOp),
    GetGroupTiles(String),
    GetLinks(String),
    ResolveTile(String),
    SetTileVisible(String, bool),
    RefreshTile(String),
    /// Bookmark definition, target group (default group when absent)
    AddBookmark(BookmarkParameters, Option<String>),
    CountBookmarks(BookmarkQuery),
    GetBookmarks(BookmarkQuery),
    UpdateBookmarks(BookmarkQuery, BookmarkState),
    DeleteBookmarks(BookmarkQuery),
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Op::LoadSite => write!(f, "LoadSite"),
            Op::GetGroups => write!(f, "GetGroups"),
            Op::GetDefaultGroup => write!(f, "GetDefaultGroup"),
            Op::AddGroup(title) => write!(f, "AddGroup('{title}')"),
            Op::RemoveGroup(id) => write!(f, "RemoveGroup({id})"),
            Op::SetGroupTitle(id, title) => write!(f, "SetGroupTitle({id}, '{title}')"),
            Op::MoveGroup(id, idx) => write!(f, "MoveGroup({id} -> {idx})"),
            Op::HideGroups(ids) => write!(f, "HideGroups({})", ids.join(", ")),
            Op::ResetGroup(id) => write!(f, "ResetGroup({id})"),
            Op::AddTile(viz, group) => write!(
                f,
                "AddTile({viz} -> {})",
                group.as_deref().unwrap_or("<default>")
            ),
            Op::RemoveTile(group, tile, idx) => write!(f, "RemoveTile({group}/{idx}: {tile})"),
            Op::MoveTile(m) => write!(
                f,
                "MoveTile({}: {}/{} -> {}/{} as {})",
                m.tile_id, m.source_group, m.source_index, m.target_group, m.target_index, m.target_type
            ),
            Op::GetGroupTiles(id) => write!(f, "GetGroupTiles({id})"),
            Op::GetLinks(id) => write!(f, "GetLinks({id})"),
            Op::ResolveTile(id) => write!(f, "ResolveTile({id})"),
            Op::SetTileVisible(id, visible) => write!(f, "SetTileVisible({id}, {visible})"),
            Op::RefreshTile(id) => write!(f, "RefreshTile({id})"),
            Op::AddBookmark(params, _) => write!(f, "AddBookmark({})", params.url),
            Op::CountBookmarks(q) => write!(f, "CountBookmarks({})", q.url),
            Op::GetBookmarks(q) => write!(f, "GetBookmarks({})", q.url),
            Op::UpdateBookmarks(q, _) => write!(f, "UpdateBookmarks({})", q.url),
            Op::DeleteBookmarks(q) => write!(f, "DeleteBookmarks({})", q.url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpResult {
    Ok,
    Groups(Vec<Group>),
    Group(Group),
    Tile(Tile),
    TileMoved(TileMove),
    Resolved(ResolvedTile),
    ResolvedTiles(Vec<ResolvedTile>),
    /// Whether a live component received the signal
    Delivered(bool),
    BookmarkId(String),
    Count(usize),
    /// (group id, bookmark tile) pairs
    Bookmarks(Vec<(String, Tile)>),
}

impl Display for OpResult {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            OpResult::Ok => write!(f, "Ok"),
            OpResult::Groups(groups) => write!(f, "Groups({})", groups.len()),
            OpResult::Group(group) => write!(f, "Group({})", group.id()),
            OpResult::Tile(tile) => write!(f, "Tile({})", tile.id),
            OpResult::TileMoved(m) => write!(f, "TileMoved({})", m.tile_id),
            OpResult::Resolved(tile) => write!(f, "Resolved({}: {})", tile.tile_id, tile.tile_intent),
            OpResult::ResolvedTiles(tiles) => write!(f, "ResolvedTiles({})", tiles.len()),
            OpResult::Delivered(delivered) => write!(f, "Delivered({delivered})"),
            OpResult::BookmarkId(id) => write!(f, "BookmarkId({id})"),
            OpResult::Count(n) => write!(f, "Count({n})"),
            OpResult::Bookmarks(found) => write!(f, "Bookmarks({})", found.len()),
        }
    }
}

fn index(what: &str, value: i64) -> Result<usize, SiteError> {
    usize::try_from(value).map_err(|_| {
        SiteError::invalid(format!("{what} must be a non-negative integer, got {value}"))
    })
}

impl<S: SiteService, R: ResolutionService> SiteAdapter<S, R> {
    /// Dispatches a host request.
    pub async fn execute(&self, op: Op) -> Result<OpResult, Rejection> {
        tracing::debug!("[SiteAdapter.execute] {}", op);
        let result = match op {
            Op::LoadSite => OpResult::Groups(self.ensure_loaded().await.as_ref().clone()),
            Op::GetGroups => OpResult::Groups(self.get_groups().await),
            Op::GetDefaultGroup => OpResult::Group(self.get_default_group().await?),
            Op::AddGroup(title) => OpResult::Group(self.add_group(&title).await?),
            Op::RemoveGroup(id) => {
                self.remove_group(&id).await?;
                OpResult::Ok
            }
            Op::SetGroupTitle(id, title) => {
                self.set_group_title(&id, &title).await?;
                OpResult::Ok
            }
            Op::MoveGroup(id, new_index) => {
                let new_index = index("group index", new_index)
                    .map_err(|e| Rejection::new(e, RejectionPayload::Groups(self.group_ids())))?;
                self.move_group(&id, new_index).await?;
                OpResult::Ok
            }
            Op::HideGroups(ids) => {
                self.hide_groups(&ids).await?;
                OpResult::Ok
            }
            Op::ResetGroup(id) => OpResult::Group(self.reset_group(&id).await?),
            Op::AddTile(viz_id, group) => {
                OpResult::Tile(self.add_tile(&viz_id, group.as_deref()).await?)
            }
            Op::RemoveTile(group, tile, idx) => {
                let idx = index("tile index", idx)?;
                self.remove_tile(&group, &tile, idx).await?;
                OpResult::Ok
            }
            Op::MoveTile(m) => {
                let request = MoveTileRequest {
                    tile_id: &m.tile_id,
                    source_index: index("source index", m.source_index)?,
                    target_index: index("target index", m.target_index)?,
                    source_group: &m.source_group,
                    target_group: &m.target_group,
                    target_type: m.target_type,
                };
                OpResult::TileMoved(self.move_tile(&request).await?)
            }
            Op::GetGroupTiles(id) => OpResult::ResolvedTiles(
                self.get_group_tiles(&id)
                    .await?
                    .iter()
                    .map(|t| t.as_ref().clone())
                    .collect(),
            ),
            Op::GetLinks(id) => OpResult::ResolvedTiles(
                self.get_links(&id)
                    .await?
                    .iter()
                    .map(|t| t.as_ref().clone())
                    .collect(),
            ),
            Op::ResolveTile(id) => {
                OpResult::Resolved(self.resolve_tile(&id).await?.as_ref().clone())
            }
            Op::SetTileVisible(id, visible) => {
                OpResult::Delivered(self.set_tile_visible(&id, visible))
            }
            Op::RefreshTile(id) => OpResult::Delivered(self.refresh_tile(&id)),
            Op::AddBookmark(params, group) => {
                OpResult::BookmarkId(self.add_bookmark(params, group.as_deref()).await?)
            }
            Op::CountBookmarks(query) => OpResult::Count(self.count_bookmarks(&query).await?),
            Op::GetBookmarks(query) => OpResult::Bookmarks(self.get_bookmarks(&query).await?),
            Op::UpdateBookmarks(query, state) => {
                OpResult::Count(self.update_bookmarks(&query, &state).await?)
            }
            Op::DeleteBookmarks(query) => OpResult::Count(self.delete_bookmarks(&query).await?),
        };
        tracing::debug!("[SiteAdapter.execute] -> {}", result);
        Ok(result)
    }
}
