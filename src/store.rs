//! Site Document Store: owns the loaded site document and coalesces loads.
//!
//! Loading is exposed as a [`LoadHandle`], a shared future created synchronously by
//! [`SiteStore::ensure_loaded`]. Every call made while a load is pending receives a clone of the
//! same handle, so the backend sees exactly one fetch. Once that load settles, the next call
//! starts a fresh fetch.
//!
//! Edits that save the document hold the store's writer lock from snapshot to save, so a failed
//! save only ever rolls back its own edit.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use crate::{
    config::AdapterConfig,
    error::SiteError,
    event::SiteEvent,
    service::{IdGenerator, SiteService},
    site::{Group, GroupIdentification, Site},
};

type SharedSite = Arc<RwLock<Option<Site>>>;
type SiteLoad = Shared<BoxFuture<'static, Result<Arc<Vec<Group>>, SiteError>>>;

/// A pending or settled site load shared by every caller that asked while it was in flight.
///
/// Awaiting the handle itself is fail-soft and yields an empty group list when the fetch failed;
/// [`LoadHandle::try_groups`] surfaces the error instead.
#[derive(Clone)]
pub struct LoadHandle(SiteLoad);

impl LoadHandle {
    /// True when both handles observe the same fetch.
    pub fn same_load(&self, other: &LoadHandle) -> bool {
        self.0.ptr_eq(&other.0)
    }

    pub fn is_settled(&self) -> bool {
        self.0.peek().is_some()
    }

    pub async fn try_groups(self) -> Result<Arc<Vec<Group>>, SiteError> {
        self.0.await
    }
}

impl Future for LoadHandle {
    type Output = Arc<Vec<Group>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0
            .poll_unpin(cx)
            .map(|result| result.unwrap_or_default())
    }
}

pub struct SiteStore<S: SiteService> {
    service: Arc<S>,
    config: Arc<AdapterConfig>,
    ids: Arc<dyn IdGenerator>,
    site: SharedSite,
    pending: Mutex<Option<SiteLoad>>,
    writer: tokio::sync::Mutex<()>,
}

impl<S: SiteService> SiteStore<S> {
    pub fn new(service: Arc<S>, config: Arc<AdapterConfig>, ids: Arc<dyn IdGenerator>) -> Self {
        SiteStore {
            service,
            config,
            ids,
            site: Arc::new(RwLock::new(None)),
            pending: Mutex::new(None),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn is_loaded(&self) -> bool {
        self.site.read().is_some()
    }

    /// Starts a load unless one is already in flight, in which case that load is returned.
    pub fn ensure_loaded(&self) -> LoadHandle {
        let mut pending = self.pending.lock();
        if let Some(load) = pending.as_ref() {
            if load.peek().is_none() {
                tracing::debug!("[SiteStore.ensure_loaded] Joining the load already in flight");
                return LoadHandle(load.clone());
            }
        }

        let service = Arc::clone(&self.service);
        let slot = Arc::clone(&self.site);
        let load = async move {
            match service.get_site().await {
                Ok(site) => {
                    if let Err(e) = site.check_invariants() {
                        tracing::warn!("[SiteStore.ensure_loaded] Loaded site is inconsistent: {}", e);
                    }
                    let groups: Vec<Group> = site.display_groups().into_iter().cloned().collect();
                    tracing::debug!("[SiteStore.ensure_loaded] Loaded site with {} groups", groups.len());
                    *slot.write() = Some(site);
                    Ok(Arc::new(groups))
                }
                Err(e) => {
                    tracing::error!("[SiteStore.ensure_loaded] Failed to load site: {}", e);
                    Err(e)
                }
            }
        }
        .boxed()
        .shared();
        *pending = Some(load.clone());
        LoadHandle(load)
    }

    /// Loads the site unless it is already present, surfacing load failures.
    pub async fn loaded(&self) -> Result<(), SiteError> {
        if self.is_loaded() {
            return Ok(());
        }
        self.ensure_loaded().try_groups().await.map(|_| ())
    }

    pub fn read<R>(&self, f: impl FnOnce(&Site) -> R) -> Result<R, SiteError> {
        let guard = self.site.read();
        let site = guard
            .as_ref()
            .ok_or_else(|| SiteError::NotFound("site has not been loaded".to_string()))?;
        Ok(f(site))
    }

    /// Runs `f` against the document. `f` must validate before it writes.
    pub fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Site) -> Result<R, SiteError>,
    ) -> Result<R, SiteError> {
        let mut guard = self.site.write();
        let site = guard
            .as_mut()
            .ok_or_else(|| SiteError::NotFound("site has not been loaded".to_string()))?;
        f(site)
    }

    pub fn snapshot(&self) -> Result<Site, SiteError> {
        self.read(Site::clone)
    }

    /// Puts back a snapshot taken before a mutation whose save failed.
    pub fn restore(&self, site: Site) {
        *self.site.write() = Some(site);
    }

    #[tracing::instrument(skip(self))]
    pub async fn save(&self) -> Result<(), SiteError> {
        let site = self.snapshot()?;
        self.service.save(site).await.map_err(|e| {
            tracing::error!("[SiteStore.save] Failed to save site: {}", e);
            e
        })
    }

    pub async fn original_group(&self, group_id: &str) -> Result<Group, SiteError> {
        self.service
            .get_group_from_original_site(group_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    "[SiteStore.original_group] Failed to fetch original group '{}': {}",
                    group_id,
                    e
                );
                e
            })
    }

    /// Serializes edit-and-save sequences. Hold the guard until the save settled.
    pub async fn lock_writer(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// An id with the given prefix that no group or tile uses yet.
    pub fn fresh_id(&self, site: &Site, prefix: &str) -> String {
        loop {
            let id = self.ids.next_id(prefix);
            if !site.contains_id(&id) {
                return id;
            }
            tracing::debug!("[SiteStore.fresh_id] Generated id '{}' is taken, retrying", id);
        }
    }

    /// The first group flagged as default; one is generated and saved when the site has none.
    ///
    /// Returns the group plus the event describing the generated group, if any.
    #[tracing::instrument(skip(self))]
    pub async fn get_default_group(&self) -> Result<(Group, Option<SiteEvent>), SiteError> {
        self.loaded().await.map_err(|e| match e {
            SiteError::Backend(msg) => {
                SiteError::Backend(format!("Failed to access default group: {msg}"))
            }
            other => other,
        })?;

        if let Some(group) = self.read(|site| site.default_group().cloned())? {
            return Ok((group, None));
        }

        let _writer = self.lock_writer().await;
        if let Some(group) = self.read(|site| site.default_group().cloned())? {
            return Ok((group, None));
        }
        let before = self.snapshot()?;
        let group = self.mutate(|site| {
            let id = if site.contains_id(&self.config.default_group_id) {
                self.fresh_id(site, &self.config.group_id_prefix)
            } else {
                self.config.default_group_id.clone()
            };
            let group = Group {
                identification: GroupIdentification {
                    id: id.clone(),
                    title: self.config.default_group_title.clone(),
                    is_default_group: true,
                    is_preset: true,
                    ..Default::default()
                },
                payload: Default::default(),
            };
            site.groups_order_mut().insert(0, id.clone());
            site.groups.insert(id, group.clone());
            Ok(group)
        })?;
        tracing::info!(
            "[SiteStore.get_default_group] Site had no default group, generated '{}'",
            group.id()
        );
        if let Err(e) = self.save().await {
            self.restore(before);
            return Err(e);
        }
        let event = SiteEvent::DefaultGroupCreated(group.id().to_string());
        Ok((group, Some(event)))
    }
}
