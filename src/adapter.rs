//! [`SiteAdapter`]: the personalization surface a launchpad host talks to.
//!
//! The adapter owns one [`SiteStore`] and one [`IntentResolverCache`]. Structural edits run the
//! pure mutators from [`crate::mutators`] against the loaded document, persist through
//! [`SiteService::save`], and emit a [`SiteEvent`] patch once the save succeeded. When a save fails
//! the document is put back to its state before the edit, so memory and backend never diverge.
//! Edits from concurrent callers are applied and saved one at a time.
//!
//! Callers are expected to let the initial load settle before issuing structural edits; every
//! method loads the site on demand but does not guard against a load replacing the document
//! while an edit is in flight.

use futures::future::{join_all, BoxFuture};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    bookmarks::{self, BookmarkParameters, BookmarkQuery, BookmarkState},
    config::AdapterConfig,
    error::{Rejection, RejectionPayload, SiteError},
    event::{SiteEvent, TileMove},
    mutators::{self, MoveTileRequest},
    resolver::{IntentResolverCache, ResolvedTile},
    service::{
        IdGenerator, ResolutionService, SiteService, TileComponent, UuidIdGenerator,
        VisualProperties,
    },
    site::{Group, Site, Tile, TileKind},
    store::{LoadHandle, SiteStore},
};

type Resolution = BoxFuture<'static, Result<Arc<ResolvedTile>, SiteError>>;

fn require_non_empty(what: &str, value: &str) -> Result<(), SiteError> {
    if value.trim().is_empty() {
        Err(SiteError::invalid(format!("{what} must not be empty")))
    } else {
        Ok(())
    }
}

pub struct SiteAdapter<S: SiteService, R: ResolutionService> {
    store: SiteStore<S>,
    resolver: IntentResolverCache<R>,
    config: Arc<AdapterConfig>,
    events: Option<UnboundedSender<SiteEvent>>,
}

impl<S: SiteService, R: ResolutionService> SiteAdapter<S, R> {
    pub fn new(site_service: Arc<S>, resolution_service: Arc<R>, config: AdapterConfig) -> Self {
        Self::with_id_generator(
            site_service,
            resolution_service,
            config,
            Arc::new(UuidIdGenerator),
        )
    }

    pub fn with_id_generator(
        site_service: Arc<S>,
        resolution_service: Arc<R>,
        config: AdapterConfig,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let config = Arc::new(config);
        SiteAdapter {
            store: SiteStore::new(site_service, Arc::clone(&config), ids),
            resolver: IntentResolverCache::new(resolution_service, Arc::clone(&config)),
            config,
            events: None,
        }
    }

    /// Every successful edit is also sent on `tx`.
    pub fn with_event_sender(mut self, tx: UnboundedSender<SiteEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn store(&self) -> &SiteStore<S> {
        &self.store
    }

    pub fn resolver(&self) -> &IntentResolverCache<R> {
        &self.resolver
    }

    fn emit(&self, event: SiteEvent) {
        tracing::debug!("[SiteAdapter] {}", event);
        if let Some(tx) = self.events.as_ref() {
            if let Err(e) = tx.send(event) {
                let err = SiteError::from(e);
                tracing::warn!("[SiteAdapter] Event receiver is gone: {}", err);
            }
        }
    }

    /// Applies `edit` to the loaded site, saves, and emits the resulting event.
    async fn commit<T, F>(&self, edit: F) -> Result<T, SiteError>
    where
        F: FnOnce(&mut Site) -> Result<(T, SiteEvent), SiteError>,
    {
        self.store.loaded().await?;
        let _writer = self.store.lock_writer().await;
        let before = self.store.snapshot()?;
        let (value, event) = self.store.mutate(edit)?;
        if !event.changes_site() {
            return Ok(value);
        }
        if let Err(e) = self.store.save().await {
            self.store.restore(before);
            return Err(e);
        }
        self.emit(event);
        Ok(value)
    }

    /// Group ids in display order; empty before the site is loaded.
    pub(crate) fn group_ids(&self) -> Vec<String> {
        self.store
            .read(|site| site.all_groups().iter().map(|g| g.id().to_string()).collect())
            .unwrap_or_default()
    }

    fn current_title(&self, group_id: &str) -> String {
        self.store
            .read(|site| site.group(group_id).map(|g| g.title().to_string()))
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    // Groups

    /// Starts (or joins) a site load. See [`SiteStore::ensure_loaded`].
    pub fn ensure_loaded(&self) -> LoadHandle {
        self.store.ensure_loaded()
    }

    /// Groups in display order. Fail-soft: an unloadable site yields no groups.
    pub async fn get_groups(&self) -> Vec<Group> {
        if !self.store.is_loaded() {
            self.store.ensure_loaded().await;
        }
        self.store
            .read(|site| {
                for id in site.groups_order() {
                    if !site.groups.contains_key(id) {
                        tracing::warn!(
                            "[SiteAdapter.get_groups] groupsOrder names '{}' which has no group",
                            id
                        );
                    }
                }
                site.display_groups().into_iter().cloned().collect()
            })
            .unwrap_or_default()
    }

    pub async fn get_group(&self, group_id: &str) -> Result<Group, SiteError> {
        self.store.loaded().await?;
        self.store
            .read(|site| site.group(group_id).cloned())?
            .ok_or_else(|| SiteError::NotFound(format!("group '{group_id}'")))
    }

    pub async fn get_default_group(&self) -> Result<Group, SiteError> {
        let (group, event) = self.store.get_default_group().await?;
        if let Some(event) = event {
            self.emit(event);
        }
        Ok(group)
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_group(&self, title: &str) -> Result<Group, SiteError> {
        require_non_empty("group title", title)?;
        self.commit(|site| {
            let id = self.store.fresh_id(site, &self.config.group_id_prefix);
            let event = mutators::add_group(site, &id, title)?;
            let group = site
                .group(&id)
                .cloned()
                .ok_or_else(|| SiteError::NotFound(format!("group '{id}'")))?;
            Ok((group, event))
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_group(&self, group_id: &str) -> Result<(), SiteError> {
        require_non_empty("group id", group_id)?;
        self.commit(|site| Ok(((), mutators::remove_group(site, group_id)?)))
            .await
    }

    /// On failure the rejection carries the title the group had before the call.
    #[tracing::instrument(skip(self))]
    pub async fn set_group_title(&self, group_id: &str, new_title: &str) -> Result<(), Rejection> {
        let reject = |adapter: &Self, error: SiteError| {
            Rejection::new(
                error,
                RejectionPayload::PreviousTitle(adapter.current_title(group_id)),
            )
        };
        if let Err(e) =
            require_non_empty("group id", group_id).and(require_non_empty("group title", new_title))
        {
            return Err(reject(self, e));
        }
        self.commit(|site| {
            let (_, event) = mutators::set_group_title(site, group_id, new_title)?;
            Ok(((), event))
        })
        .await
        .map_err(|e| reject(self, e))
    }

    /// On failure the rejection carries the group ids in their (unchanged) display order.
    #[tracing::instrument(skip(self))]
    pub async fn move_group(&self, group_id: &str, new_index: usize) -> Result<(), Rejection> {
        let result = match require_non_empty("group id", group_id) {
            Ok(()) => {
                self.commit(|site| Ok(((), mutators::move_group(site, group_id, new_index)?)))
                    .await
            }
            Err(e) => Err(e),
        };
        result.map_err(|e| Rejection::new(e, RejectionPayload::Groups(self.group_ids())))
    }

    #[tracing::instrument(skip(self))]
    pub async fn hide_groups(&self, ids_to_hide: &[String]) -> Result<(), SiteError> {
        self.commit(|site| Ok(((), mutators::hide_groups(site, ids_to_hide))))
            .await
    }

    /// Restores a preset group from the original site. User-created groups cannot be reset.
    #[tracing::instrument(skip(self))]
    pub async fn reset_group(&self, group_id: &str) -> Result<Group, SiteError> {
        require_non_empty("group id", group_id)?;
        self.store.loaded().await?;
        self.store
            .read(|site| mutators::check_resettable(site, group_id))??;
        let original = self.store.original_group(group_id).await?;
        let group = self
            .commit(|site| {
                let event = mutators::reset_group(site, group_id, original)?;
                let group = site
                    .group(group_id)
                    .cloned()
                    .ok_or_else(|| SiteError::NotFound(format!("group '{group_id}'")))?;
                Ok((group, event))
            })
            .await?;
        for (_, tile) in group.payload.entries() {
            self.resolver.invalidate(&tile.id);
        }
        Ok(group)
    }

    pub async fn is_group_removable(&self, group_id: &str) -> Result<bool, SiteError> {
        Ok(self.get_group(group_id).await?.is_removable())
    }

    pub async fn is_group_locked(&self, group_id: &str) -> Result<bool, SiteError> {
        Ok(self.get_group(group_id).await?.is_locked())
    }

    pub async fn is_group_visible(&self, group_id: &str) -> Result<bool, SiteError> {
        Ok(self.get_group(group_id).await?.is_visible())
    }

    pub async fn is_group_featured(&self, group_id: &str) -> Result<bool, SiteError> {
        Ok(self.get_group(group_id).await?.is_featured())
    }

    // Tiles

    /// Appends a catalog tile for `viz_id` to the group, or to the default group.
    #[tracing::instrument(skip(self))]
    pub async fn add_tile(&self, viz_id: &str, group_id: Option<&str>) -> Result<Tile, SiteError> {
        require_non_empty("visualization id", viz_id)?;
        let group_id = match group_id {
            Some(id) => {
                require_non_empty("group id", id)?;
                id.to_string()
            }
            None => self.get_default_group().await?.id().to_string(),
        };
        self.commit(|site| {
            let tile = Tile::from_viz(
                self.store.fresh_id(site, &self.config.tile_id_prefix),
                viz_id,
            );
            let event = mutators::add_tile(site, &group_id, tile.clone(), TileKind::Tile)?;
            Ok((tile, event))
        })
        .await
    }

    /// Removes a tile addressed by its combined (`tiles ++ links`) index.
    #[tracing::instrument(skip(self))]
    pub async fn remove_tile(&self, group_id: &str, tile_id: &str, index: usize) -> Result<(), SiteError> {
        require_non_empty("group id", group_id)?;
        require_non_empty("tile id", tile_id)?;
        self.commit(|site| Ok(((), mutators::remove_tile(site, group_id, tile_id, index)?)))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn move_tile(&self, request: &MoveTileRequest<'_>) -> Result<TileMove, SiteError> {
        require_non_empty("tile id", request.tile_id)?;
        require_non_empty("source group id", request.source_group)?;
        require_non_empty("target group id", request.target_group)?;
        self.commit(|site| match mutators::move_tile(site, request)? {
            SiteEvent::TileMoved(moved) => Ok((moved.clone(), SiteEvent::TileMoved(moved))),
            other => Err(SiteError::invalid(format!("unexpected move outcome {other}"))),
        })
        .await
    }

    /// Plans a resolution while the site is read-locked; the returned future runs unlocked.
    fn plan_resolution(&self, tile_id: &str) -> Result<Resolution, SiteError> {
        self.store.read(|site| {
            let location = site
                .find_tile(tile_id)
                .ok_or_else(|| SiteError::NotFound(format!("tile '{tile_id}'")))?;
            let tile = site
                .tile(&location)
                .ok_or_else(|| SiteError::NotFound(format!("tile '{tile_id}'")))?;
            Ok::<_, SiteError>(self.resolver.resolve(tile, location.kind, site))
        })?
    }

    pub async fn resolve_tile(&self, tile_id: &str) -> Result<Arc<ResolvedTile>, SiteError> {
        require_non_empty("tile id", tile_id)?;
        self.store.loaded().await?;
        self.plan_resolution(tile_id)?.await
    }

    async fn resolve_list(&self, group_id: &str, kind: TileKind) -> Result<Vec<Arc<ResolvedTile>>, SiteError> {
        require_non_empty("group id", group_id)?;
        self.store.loaded().await?;
        let pending: Vec<Resolution> = self.store.read(|site| {
            let group = site
                .group(group_id)
                .ok_or_else(|| SiteError::NotFound(format!("group '{group_id}'")))?;
            Ok::<_, SiteError>(
                group
                    .list(kind)
                    .iter()
                    .map(|tile| self.resolver.resolve(tile, kind, site))
                    .collect(),
            )
        })??;

        let mut resolved = Vec::with_capacity(pending.len());
        for result in join_all(pending).await {
            match result {
                Ok(tile) => resolved.push(tile),
                Err(e) if e.is_soft() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }

    /// Resolved tiles of a group in display order. Soft-filtered tiles are left out.
    pub async fn get_group_tiles(&self, group_id: &str) -> Result<Vec<Arc<ResolvedTile>>, SiteError> {
        self.resolve_list(group_id, TileKind::Tile).await
    }

    pub async fn get_links(&self, group_id: &str) -> Result<Vec<Arc<ResolvedTile>>, SiteError> {
        self.resolve_list(group_id, TileKind::Link).await
    }

    pub async fn get_tile_type(&self, tile_id: &str) -> Result<TileKind, SiteError> {
        self.store.loaded().await?;
        self.store
            .read(|site| site.find_tile(tile_id).map(|loc| loc.kind))?
            .ok_or_else(|| SiteError::NotFound(format!("tile '{tile_id}'")))
    }

    pub async fn get_tile_title(&self, tile_id: &str) -> Result<String, SiteError> {
        Ok(self.resolve_tile(tile_id).await?.title.clone())
    }

    pub async fn get_tile_subtitle(&self, tile_id: &str) -> Result<Option<String>, SiteError> {
        Ok(self.resolve_tile(tile_id).await?.subtitle.clone())
    }

    pub async fn get_tile_icon(&self, tile_id: &str) -> Result<Option<String>, SiteError> {
        Ok(self.resolve_tile(tile_id).await?.icon.clone())
    }

    pub async fn get_tile_info(&self, tile_id: &str) -> Result<Option<String>, SiteError> {
        Ok(self.resolve_tile(tile_id).await?.info.clone())
    }

    /// The hash or url the tile navigates to.
    pub async fn get_tile_target(&self, tile_id: &str) -> Result<String, SiteError> {
        Ok(self.resolve_tile(tile_id).await?.tile_intent.clone())
    }

    pub async fn get_tile_size(&self, tile_id: &str) -> Result<String, SiteError> {
        Ok(self.resolve_tile(tile_id).await?.size.clone())
    }

    pub async fn is_tile_intent_supported(&self, tile_id: &str) -> bool {
        self.resolve_tile(tile_id).await.is_ok()
    }

    /// Forwards visibility to the tile's live component, if one is attached.
    pub fn set_tile_visible(&self, tile_id: &str, visible: bool) -> bool {
        self.resolver.set_tile_visible(tile_id, visible)
    }

    pub fn refresh_tile(&self, tile_id: &str) -> bool {
        self.resolver.refresh_tile(tile_id)
    }

    pub fn attach_tile_component(&self, tile_id: &str, component: Arc<dyn TileComponent>) {
        self.resolver.attach_component(tile_id, component)
    }

    // Bookmarks

    /// Creates a bookmark tile in `group_id` (or the default group) and returns its id.
    #[tracing::instrument(skip(self))]
    pub async fn add_bookmark(
        &self,
        params: BookmarkParameters,
        group_id: Option<&str>,
    ) -> Result<String, SiteError> {
        params.validate()?;
        let group_id = match group_id {
            Some(id) => {
                require_non_empty("group id", id)?;
                id.to_string()
            }
            None => self.get_default_group().await?.id().to_string(),
        };
        self.commit(|site| {
            let id = self.store.fresh_id(site, &self.config.tile_id_prefix);
            let tile = params.into_tile(id.clone(), &self.config.bookmark_viz_type);
            mutators::add_tile(site, &group_id, tile, TileKind::Tile)?;
            Ok((id.clone(), SiteEvent::BookmarkAdded(group_id.clone(), id)))
        })
        .await
    }

    pub async fn count_bookmarks(&self, query: &BookmarkQuery) -> Result<usize, SiteError> {
        query.validate()?;
        self.store.loaded().await?;
        self.store.read(|site| bookmarks::count_bookmarks(site, query))
    }

    /// Calls `visitor` for every matching bookmark and returns the number of matches.
    pub async fn visit_bookmarks<F>(&self, query: &BookmarkQuery, visitor: F) -> Result<usize, SiteError>
    where
        F: FnMut(&Tile, &Group),
    {
        query.validate()?;
        self.store.loaded().await?;
        self.store
            .read(|site| bookmarks::visit_bookmarks(site, query, visitor))
    }

    /// Matching bookmarks as `(group id, tile)` pairs.
    pub async fn get_bookmarks(&self, query: &BookmarkQuery) -> Result<Vec<(String, Tile)>, SiteError> {
        let mut found = Vec::new();
        self.visit_bookmarks(query, |tile, group| {
            found.push((group.id().to_string(), tile.clone()))
        })
        .await?;
        Ok(found)
    }

    /// Overwrites the given fields on every match and returns the number of updated tiles.
    ///
    /// Live components of updated tiles receive their new visual properties once each.
    #[tracing::instrument(skip(self))]
    pub async fn update_bookmarks(
        &self,
        query: &BookmarkQuery,
        state: &BookmarkState,
    ) -> Result<usize, SiteError> {
        query.validate()?;
        let updated = self
            .commit(|site| {
                let ids = bookmarks::update_bookmarks(site, query, state);
                let properties: Vec<(String, VisualProperties)> = ids
                    .iter()
                    .filter_map(|id| {
                        let tile = site.tile(&site.find_tile(id)?)?;
                        Some((
                            id.clone(),
                            VisualProperties {
                                title: tile.title.clone(),
                                subtitle: tile.subtitle.clone(),
                                icon: tile.icon.clone(),
                                info: tile.info.clone(),
                                target_url: tile.target.as_ref().map(|t| t.to_url()),
                            },
                        ))
                    })
                    .collect();
                Ok((properties, SiteEvent::BookmarksUpdated(ids)))
            })
            .await?;

        for (id, properties) in updated.iter() {
            self.resolver.invalidate(id);
            self.resolver.push_visual_properties(id, properties);
        }
        Ok(updated.len())
    }

    /// Removes every match and returns the number of removed tiles.
    #[tracing::instrument(skip(self))]
    pub async fn delete_bookmarks(&self, query: &BookmarkQuery) -> Result<usize, SiteError> {
        query.validate()?;
        let removed = self
            .commit(|site| {
                let removed = bookmarks::delete_bookmarks(site, query);
                Ok((removed.clone(), SiteEvent::BookmarksDeleted(removed)))
            })
            .await?;
        for id in removed.iter() {
            self.resolver.invalidate(id);
        }
        Ok(removed.len())
    }
}
