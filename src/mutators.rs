//! Structural edits to a loaded [`Site`].
//!
//! Every mutator validates all of its inputs before touching the document and returns the
//! [`SiteEvent`] describing the change. A mutator that returns `Err` has not modified the site.
//! Persisting is the caller's job (see [`crate::adapter::SiteAdapter`]).

use std::collections::BTreeSet;

use crate::{
    error::SiteError,
    event::{SiteEvent, TileMove},
    site::{Group, Site, Tile, TileKind},
};

fn require_id<'a>(what: &str, id: &'a str) -> Result<&'a str, SiteError> {
    if id.trim().is_empty() {
        Err(SiteError::invalid(format!("{what} id must not be empty")))
    } else {
        Ok(id)
    }
}

fn require_group<'a>(site: &'a Site, group_id: &str) -> Result<&'a Group, SiteError> {
    require_id("group", group_id)?;
    site.group(group_id)
        .ok_or_else(|| SiteError::NotFound(format!("group '{group_id}'")))
}

fn require_title(title: &str) -> Result<(), SiteError> {
    if title.trim().is_empty() {
        Err(SiteError::invalid("group title must be a non-empty string"))
    } else {
        Ok(())
    }
}

/// Appends a new, empty group with the given id.
pub fn add_group(site: &mut Site, group_id: &str, title: &str) -> Result<SiteEvent, SiteError> {
    require_title(title)?;
    require_id("group", group_id)?;
    if site.groups.contains_key(group_id) {
        return Err(SiteError::invalid(format!(
            "group '{group_id}' already exists"
        )));
    }

    let order = site.groups_order_mut();
    order.push(group_id.to_string());
    let index = order.len() - 1;
    site.groups
        .insert(group_id.to_string(), Group::new(group_id, title));
    Ok(SiteEvent::GroupAdded(group_id.to_string(), index))
}

pub fn remove_group(site: &mut Site, group_id: &str) -> Result<SiteEvent, SiteError> {
    require_group(site, group_id)?;
    let position = site.groups_order().iter().position(|id| id == group_id);
    site.groups.remove(group_id);
    if let Some(order) = site.payload.groups_order.as_mut() {
        order.retain(|id| id != group_id);
    }
    Ok(SiteEvent::GroupRemoved(group_id.to_string(), position))
}

/// Renames a group, returning the previous title with the event.
pub fn set_group_title(
    site: &mut Site,
    group_id: &str,
    new_title: &str,
) -> Result<(String, SiteEvent), SiteError> {
    require_group(site, group_id)?;
    require_title(new_title)?;
    let group = site
        .group_mut(group_id)
        .ok_or_else(|| SiteError::NotFound(format!("group '{group_id}'")))?;
    let old_title = std::mem::replace(&mut group.identification.title, new_title.to_string());
    let event = SiteEvent::GroupRenamed(group_id.to_string(), old_title.clone(), new_title.to_string());
    Ok((old_title, event))
}

pub fn move_group(site: &mut Site, group_id: &str, new_index: usize) -> Result<SiteEvent, SiteError> {
    require_group(site, group_id)?;
    let order = site.payload.groups_order.as_mut().ok_or_else(|| {
        SiteError::NotFound("site has no groupsOrder; refusing to reorder groups".to_string())
    })?;
    let from = order
        .iter()
        .position(|id| id == group_id)
        .ok_or_else(|| SiteError::NotFound(format!("group '{group_id}' in groupsOrder")))?;
    if new_index >= order.len() {
        return Err(SiteError::invalid(format!(
            "group index {new_index} is out of range for {} groups",
            order.len()
        )));
    }
    let id = order.remove(from);
    order.insert(new_index, id);
    Ok(SiteEvent::GroupMoved(group_id.to_string(), from, new_index))
}

/// Hides exactly the given groups. All others lose the visibility flag, which means visible.
pub fn hide_groups(site: &mut Site, ids_to_hide: &[String]) -> SiteEvent {
    let hide: BTreeSet<&str> = ids_to_hide.iter().map(String::as_str).collect();
    let mut hidden = Vec::new();
    for (id, group) in site.groups.iter_mut() {
        if hide.contains(id.as_str()) {
            group.identification.is_visible = Some(false);
            hidden.push(id.clone());
        } else {
            group.identification.is_visible = None;
        }
    }
    SiteEvent::GroupsHidden(hidden)
}

/// Fails for user-created groups, which have no original to return to.
pub fn check_resettable(site: &Site, group_id: &str) -> Result<(), SiteError> {
    let group = require_group(site, group_id)?;
    if group.is_removable() {
        return Err(SiteError::invalid(format!(
            "group '{group_id}' was created by the user and cannot be reset"
        )));
    }
    Ok(())
}

/// Replaces title, lock state and content of a preset group with its original definition.
pub fn reset_group(site: &mut Site, group_id: &str, original: Group) -> Result<SiteEvent, SiteError> {
    check_resettable(site, group_id)?;
    if original.id() != group_id {
        return Err(SiteError::invalid(format!(
            "original group '{}' does not match '{group_id}'",
            original.id()
        )));
    }
    let group = site
        .group_mut(group_id)
        .ok_or_else(|| SiteError::NotFound(format!("group '{group_id}'")))?;
    group.identification.title = original.identification.title;
    group.identification.is_group_locked = original.identification.is_group_locked;
    group.payload = original.payload;
    Ok(SiteEvent::GroupReset(group_id.to_string()))
}

/// Appends `tile` to the tile or link list of a group.
pub fn add_tile(
    site: &mut Site,
    group_id: &str,
    tile: Tile,
    kind: TileKind,
) -> Result<SiteEvent, SiteError> {
    require_group(site, group_id)?;
    require_id("tile", &tile.id)?;
    if site.contains_id(&tile.id) {
        return Err(SiteError::invalid(format!("tile id '{}' is already in use", tile.id)));
    }
    match (&tile.viz_id, &tile.target) {
        (None, None) => {
            return Err(SiteError::invalid(format!(
                "tile '{}' has neither a vizId nor a target",
                tile.id
            )))
        }
        (Some(viz_id), _) if !site.visualizations.contains_key(viz_id) => {
            return Err(SiteError::NotFound(format!("visualization '{viz_id}'")))
        }
        _ => {}
    }

    let tile_id = tile.id.clone();
    let group = site
        .group_mut(group_id)
        .ok_or_else(|| SiteError::NotFound(format!("group '{group_id}'")))?;
    let list = group.payload.list_mut(kind);
    list.push(tile);
    let index = list.len() - 1;
    Ok(SiteEvent::TileAdded(group_id.to_string(), tile_id, kind, index))
}

/// Removes a tile addressed by its combined (`tiles ++ links`) index.
///
/// When the index does not point at `tile_id` the tile is looked up by id instead.
pub fn remove_tile(
    site: &mut Site,
    group_id: &str,
    tile_id: &str,
    index: usize,
) -> Result<SiteEvent, SiteError> {
    let group = require_group(site, group_id)?;
    require_id("tile", tile_id)?;
    let (kind, idx) = group.split_index(index);
    let (kind, idx) = match group.list(kind).get(idx) {
        Some(t) if t.id == tile_id => (kind, idx),
        _ => group.position_of(tile_id).ok_or_else(|| {
            SiteError::NotFound(format!("tile '{tile_id}' in group '{group_id}'"))
        })?,
    };
    let group = site
        .group_mut(group_id)
        .ok_or_else(|| SiteError::NotFound(format!("group '{group_id}'")))?;
    group.payload.list_mut(kind).remove(idx);
    Ok(SiteEvent::TileRemoved(
        group_id.to_string(),
        tile_id.to_string(),
        kind,
        idx,
    ))
}

/// Arguments of [`move_tile`]. Indices use combined `tiles ++ links` addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTileRequest<'a> {
    pub tile_id: &'a str,
    pub source_index: usize,
    pub target_index: usize,
    pub source_group: &'a str,
    pub target_group: &'a str,
    pub target_type: TileKind,
}

/// Removes a tile from its source position and inserts it into the target group's tile or
/// link list. Link positions are offset by the source group's tile count.
pub fn move_tile(site: &mut Site, req: &MoveTileRequest<'_>) -> Result<SiteEvent, SiteError> {
    require_id("tile", req.tile_id)?;
    let source = require_group(site, req.source_group)?;
    require_group(site, req.target_group)?;

    let (from_kind, from_index) = source.split_index(req.source_index);
    match source.list(from_kind).get(from_index) {
        Some(t) if t.id == req.tile_id => {}
        Some(t) => {
            return Err(SiteError::invalid(format!(
                "index {} of group '{}' holds '{}', not '{}'",
                req.source_index, req.source_group, t.id, req.tile_id
            )))
        }
        None => {
            return Err(SiteError::invalid(format!(
                "index {} is out of range for group '{}'",
                req.source_index, req.source_group
            )))
        }
    }
    let link_offset = source.tiles().len();
    let to_kind = req.target_type;
    let requested = match to_kind {
        TileKind::Tile => req.target_index,
        TileKind::Link => req.target_index.saturating_sub(link_offset),
    };

    let same_list = req.source_group == req.target_group && from_kind == to_kind;
    if same_list && from_index == requested {
        return Ok(SiteEvent::TileMoved(TileMove {
            tile_id: req.tile_id.to_string(),
            from_group: req.source_group.to_string(),
            from_kind,
            from_index,
            to_group: req.target_group.to_string(),
            to_kind,
            to_index: requested,
        }));
    }

    let tile = site
        .group_mut(req.source_group)
        .ok_or_else(|| SiteError::NotFound(format!("group '{}'", req.source_group)))?
        .payload
        .list_mut(from_kind)
        .remove(from_index);
    let target = site
        .group_mut(req.target_group)
        .ok_or_else(|| SiteError::NotFound(format!("group '{}'", req.target_group)))?
        .payload
        .list_mut(to_kind);
    let to_index = requested.min(target.len());
    target.insert(to_index, tile);

    Ok(SiteEvent::TileMoved(TileMove {
        tile_id: req.tile_id.to_string(),
        from_group: req.source_group.to_string(),
        from_kind,
        from_index,
        to_group: req.target_group.to_string(),
        to_kind,
        to_index,
    }))
}
