//! Intent Resolver Cache.
//!
//! Resolves a tile to a displayable descriptor at most once per tile id. The site lookups
//! (visualization, application, inbound, visualization type) run synchronously when
//! [`IntentResolverCache::resolve`] is called; only the call into the [`ResolutionService`]
//! suspends. While that call is pending, further requests for the same tile id receive a clone
//! of the same shared future. Successful results stay cached; failures are dropped so that the
//! caller may retry.
//!
//! The cache also keeps the handle of a tile's live component (if the UI host instantiated
//! one) so that visibility and refresh signals can be pushed to it without resolving again.

use futures::future::{ready, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use url::Url;

use crate::{
    config::{AdapterConfig, DeviceKind},
    error::SiteError,
    hash::Intent,
    service::{ResolutionResult, ResolutionService, TileComponent, VisualProperties},
    site::{IndicatorDataSource, Inbound, Site, Tile, TileKind, TileTarget},
};

pub const DEFAULT_TILE_SIZE: &str = "1x1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationMode {
    #[default]
    Embedded,
    NewWindow,
}

/// A tile ready for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTile {
    pub tile_id: String,
    /// The hash or url the tile navigates to.
    pub tile_intent: String,
    pub tile_resolution_result: ResolutionResult,
    pub is_link: bool,
    pub title: String,
    pub subtitle: Option<String>,
    pub icon: Option<String>,
    pub info: Option<String>,
    pub navigation_mode: NavigationMode,
    pub indicator_data_source: Option<IndicatorDataSource>,
    pub size: String,
    pub viz_type: Option<String>,
    /// Component the UI host should instantiate for this tile.
    pub component_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct DisplayText {
    title: Option<String>,
    subtitle: Option<String>,
    icon: Option<String>,
    info: Option<String>,
}

impl DisplayText {
    /// Fills every field still missing from `fallback`.
    fn or(self, fallback: DisplayText) -> DisplayText {
        DisplayText {
            title: self.title.or(fallback.title),
            subtitle: self.subtitle.or(fallback.subtitle),
            icon: self.icon.or(fallback.icon),
            info: self.info.or(fallback.info),
        }
    }
}

#[derive(Debug, Clone)]
enum Request {
    /// Static tile without navigation.
    None,
    Url(String),
    Intent(String),
    InContext(Vec<Inbound>, String),
}

/// Everything gathered from the site before the resolution service is asked.
#[derive(Debug, Clone)]
struct ResolutionPlan {
    tile_id: String,
    is_link: bool,
    request: Request,
    display: DisplayText,
    indicator_data_source: Option<IndicatorDataSource>,
    size: String,
    viz_type: Option<String>,
    component_name: Option<String>,
}

impl ResolutionPlan {
    fn tile_intent(&self) -> String {
        match &self.request {
            Request::None => String::new(),
            Request::Url(url) => url.clone(),
            Request::Intent(hash) | Request::InContext(_, hash) => hash.clone(),
        }
    }

    fn finish(self, result: ResolutionResult, config: &AdapterConfig) -> ResolvedTile {
        let resolved_text = DisplayText {
            title: result.title.clone(),
            subtitle: result.subtitle.clone(),
            icon: result.icon.clone(),
            info: result.info.clone(),
        };
        let tile_intent = self.tile_intent();
        let display = self.display.or(resolved_text);
        ResolvedTile {
            navigation_mode: navigation_mode(config, &result),
            title: display.title.unwrap_or_else(|| tile_intent.clone()),
            tile_intent,
            tile_id: self.tile_id,
            tile_resolution_result: result,
            is_link: self.is_link,
            subtitle: display.subtitle,
            icon: display.icon,
            info: display.info,
            indicator_data_source: self.indicator_data_source,
            size: self.size,
            viz_type: self.viz_type,
            component_name: self.component_name,
        }
    }
}

/// Absolute urls on a foreign origin open in a new window, except on phones.
pub fn navigation_mode(config: &AdapterConfig, result: &ResolutionResult) -> NavigationMode {
    if config.device == DeviceKind::Phone || !result.application_type.eq_ignore_ascii_case("URL") {
        return NavigationMode::Embedded;
    }
    let Some(target) = result.url.as_deref().and_then(|u| Url::parse(u).ok()) else {
        return NavigationMode::Embedded;
    };
    match config.origin_url() {
        Some(origin) if origin.origin() == target.origin() => NavigationMode::Embedded,
        _ => NavigationMode::NewWindow,
    }
}

fn tile_text(tile: &Tile) -> DisplayText {
    DisplayText {
        title: tile.title.clone(),
        subtitle: tile.subtitle.clone(),
        icon: tile.icon.clone(),
        info: tile.info.clone(),
    }
}

fn plan_resolution(tile: &Tile, kind: TileKind, site: &Site) -> Result<ResolutionPlan, SiteError> {
    let is_link = kind == TileKind::Link;

    if let Some(viz_id) = tile.viz_id.as_deref() {
        let viz = site
            .visualizations
            .get(viz_id)
            .ok_or_else(|| SiteError::DanglingReference {
                tile_id: tile.id.clone(),
                reference: format!("visualization '{viz_id}'"),
            })?;
        let config = &viz.viz_config;
        let viz_text = DisplayText {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            icon: config.icon.clone(),
            info: config.info.clone(),
        };

        let (request, inbound_text) = match config.target.as_ref() {
            None => (Request::None, DisplayText::default()),
            Some(target) if target.url.is_some() && target.app_id.is_none() => (
                Request::Url(target.url.clone().unwrap_or_default()),
                DisplayText::default(),
            ),
            Some(target) => {
                let app_id = target.app_id.as_deref().unwrap_or_default();
                let app = site
                    .applications
                    .get(app_id)
                    .ok_or_else(|| SiteError::DanglingReference {
                        tile_id: tile.id.clone(),
                        reference: format!("application '{app_id}'"),
                    })?;
                let inbound = match target.inbound_id.as_deref() {
                    Some(inbound_id) => app.inbounds.get(inbound_id),
                    None => app.inbounds.values().next(),
                }
                .ok_or_else(|| SiteError::NoInbound {
                    tile_id: tile.id.clone(),
                    app_id: app_id.to_string(),
                    inbound_id: target.inbound_id.clone().unwrap_or_default(),
                })?;

                let mut intent = Intent::new(&inbound.semantic_object, &inbound.action);
                for (name, value) in inbound.parameters.iter() {
                    intent.parameters.insert(name.clone(), vec![value.clone()]);
                }
                for param in target.parameters.iter() {
                    intent
                        .parameters
                        .insert(param.name.clone(), vec![param.value.clone()]);
                }
                intent.app_specific_route = target
                    .app_specific_route
                    .as_deref()
                    .map(|r| r.trim_start_matches('&').trim_start_matches('/').to_string())
                    .filter(|r| !r.is_empty());

                let inbounds: Vec<Inbound> = app.inbounds.values().cloned().collect();
                let text = DisplayText {
                    title: inbound.title.clone().or_else(|| app.title.clone()),
                    subtitle: inbound.subtitle.clone(),
                    icon: inbound.icon.clone(),
                    info: inbound.info.clone(),
                };
                (Request::InContext(inbounds, intent.to_hash()), text)
            }
        };

        let viz_type = site
            .viz_types
            .get(&viz.viz_type)
            .ok_or_else(|| SiteError::MissingVizType {
                tile_id: tile.id.clone(),
                viz_type: viz.viz_type.clone(),
            })?;

        return Ok(ResolutionPlan {
            tile_id: tile.id.clone(),
            is_link,
            request,
            display: tile_text(tile).or(viz_text).or(inbound_text),
            indicator_data_source: config.indicator_data_source.clone(),
            size: viz_type
                .tile_size
                .clone()
                .unwrap_or_else(|| DEFAULT_TILE_SIZE.to_string()),
            viz_type: Some(viz.viz_type.clone()),
            component_name: viz_type.component_name.clone(),
        });
    }

    let target = tile.target.as_ref().ok_or_else(|| {
        SiteError::invalid(format!("tile '{}' has neither a vizId nor a target", tile.id))
    })?;
    let request = match target {
        TileTarget::Intent(_) => Request::Intent(target.to_url()),
        TileTarget::Url { url } if url.starts_with('#') => Request::Intent(url.clone()),
        TileTarget::Url { url } => Request::Url(url.clone()),
    };
    let descriptor = tile.viz_type.as_ref().and_then(|t| site.viz_types.get(t));
    Ok(ResolutionPlan {
        tile_id: tile.id.clone(),
        is_link,
        request,
        display: tile_text(tile),
        indicator_data_source: tile.service_url.as_ref().map(|path| IndicatorDataSource {
            path: path.clone(),
            refresh: tile.service_refresh_interval,
        }),
        size: descriptor
            .and_then(|d| d.tile_size.clone())
            .unwrap_or_else(|| DEFAULT_TILE_SIZE.to_string()),
        viz_type: tile.viz_type.clone(),
        component_name: descriptor.and_then(|d| d.component_name.clone()),
    })
}

fn log_filtered(error: &SiteError) {
    match error {
        SiteError::DanglingReference { .. } => {
            tracing::info!("[IntentResolverCache] Tile filtered: {}", error)
        }
        e if e.is_soft() => tracing::warn!("[IntentResolverCache] Tile filtered: {}", e),
        e => tracing::error!("[IntentResolverCache] Tile cannot be resolved: {}", e),
    }
}

type PendingResolution = Shared<BoxFuture<'static, Result<Arc<ResolvedTile>, SiteError>>>;

#[derive(Default)]
enum Slot {
    #[default]
    Empty,
    Pending(PendingResolution),
    Ready(Arc<ResolvedTile>),
}

#[derive(Default)]
struct Entry {
    slot: Slot,
    component: Option<Arc<dyn TileComponent>>,
    visible: Option<bool>,
}

type Entries = Arc<Mutex<BTreeMap<String, Entry>>>;

pub struct IntentResolverCache<R: ResolutionService> {
    service: Arc<R>,
    config: Arc<AdapterConfig>,
    entries: Entries,
}

impl<R: ResolutionService> IntentResolverCache<R> {
    pub fn new(service: Arc<R>, config: Arc<AdapterConfig>) -> Self {
        IntentResolverCache {
            service,
            config,
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Resolves `tile` (found in `kind` list of some group of `site`).
    ///
    /// The returned future owns everything it needs; requests issued before it settles share it.
    pub fn resolve(
        &self,
        tile: &Tile,
        kind: TileKind,
        site: &Site,
    ) -> BoxFuture<'static, Result<Arc<ResolvedTile>, SiteError>> {
        if tile.id.trim().is_empty() {
            return ready(Err(SiteError::invalid("tile id must not be empty"))).boxed();
        }

        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&tile.id) {
            match &entry.slot {
                Slot::Ready(resolved) => return ready(Ok(Arc::clone(resolved))).boxed(),
                Slot::Pending(pending) => {
                    tracing::debug!(
                        "[IntentResolverCache.resolve] Joining pending resolution of '{}'",
                        tile.id
                    );
                    return pending.clone().boxed();
                }
                Slot::Empty => {}
            }
        }

        let plan = match plan_resolution(tile, kind, site) {
            Ok(plan) => plan,
            Err(e) => {
                log_filtered(&e);
                return ready(Err(e)).boxed();
            }
        };

        let service = Arc::clone(&self.service);
        let config = Arc::clone(&self.config);
        let registry = Arc::clone(&self.entries);
        let tile_id = tile.id.clone();
        let pending = async move {
            let result = match &plan.request {
                Request::None => Ok(ResolutionResult::default()),
                Request::Url(url) => Ok(ResolutionResult {
                    application_type: "URL".to_string(),
                    url: Some(url.clone()),
                    ..Default::default()
                }),
                Request::Intent(hash) => service.resolve_tile_intent(hash).await,
                Request::InContext(inbounds, hash) => {
                    service.resolve_tile_intent_in_context(inbounds, hash).await
                }
            };
            let outcome = match result {
                Ok(result) => Ok(Arc::new(plan.finish(result, &config))),
                Err(e) => {
                    let err = SiteError::Resolution {
                        tile_id: tile_id.clone(),
                        message: e.to_string(),
                    };
                    tracing::error!("[IntentResolverCache.resolve] {}", err);
                    Err(err)
                }
            };

            let mut entries = registry.lock();
            match &outcome {
                Ok(resolved) => {
                    entries.entry(tile_id).or_default().slot = Slot::Ready(Arc::clone(resolved));
                }
                Err(_) => {
                    if let Some(entry) = entries.get_mut(&tile_id) {
                        entry.slot = Slot::Empty;
                    }
                }
            }
            outcome
        }
        .boxed()
        .shared();

        entries.entry(tile.id.clone()).or_default().slot = Slot::Pending(pending.clone());
        drop(entries);
        pending.boxed()
    }

    pub fn cached(&self, tile_id: &str) -> Option<Arc<ResolvedTile>> {
        match self.entries.lock().get(tile_id).map(|e| &e.slot) {
            Some(Slot::Ready(resolved)) => Some(Arc::clone(resolved)),
            _ => None,
        }
    }

    /// Forgets a settled resolution so the next request resolves again. Pending requests and an
    /// attached component are kept.
    pub fn invalidate(&self, tile_id: &str) {
        if let Some(entry) = self.entries.lock().get_mut(tile_id) {
            if matches!(entry.slot, Slot::Ready(_)) {
                tracing::debug!("[IntentResolverCache.invalidate] Dropping cached '{}'", tile_id);
                entry.slot = Slot::Empty;
            }
        }
    }

    pub fn is_pending(&self, tile_id: &str) -> bool {
        matches!(
            self.entries.lock().get(tile_id).map(|e| &e.slot),
            Some(Slot::Pending(_))
        )
    }

    /// Registers the live component the UI host created for a tile.
    ///
    /// A visibility recorded before the component existed is pushed to it right away.
    pub fn attach_component(&self, tile_id: &str, component: Arc<dyn TileComponent>) {
        let visible = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(tile_id.to_string()).or_default();
            entry.component = Some(Arc::clone(&component));
            entry.visible
        };
        if let Some(visible) = visible {
            component.set_visible(visible);
        }
    }

    pub fn detach_component(&self, tile_id: &str) -> Option<Arc<dyn TileComponent>> {
        self.entries
            .lock()
            .get_mut(tile_id)
            .and_then(|e| e.component.take())
    }

    fn component(&self, tile_id: &str) -> Option<Arc<dyn TileComponent>> {
        self.entries
            .lock()
            .get(tile_id)
            .and_then(|e| e.component.clone())
    }

    /// Records the visibility and pushes it to the live component. Returns whether one existed.
    pub fn set_tile_visible(&self, tile_id: &str, visible: bool) -> bool {
        let component = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(tile_id.to_string()).or_default();
            entry.visible = Some(visible);
            entry.component.clone()
        };
        match component {
            Some(component) => {
                component.set_visible(visible);
                true
            }
            None => false,
        }
    }

    pub fn tile_visibility(&self, tile_id: &str) -> Option<bool> {
        self.entries.lock().get(tile_id).and_then(|e| e.visible)
    }

    /// Asks the live component to refresh. Returns whether one existed.
    pub fn refresh_tile(&self, tile_id: &str) -> bool {
        match self.component(tile_id) {
            Some(component) => {
                component.refresh();
                true
            }
            None => false,
        }
    }

    pub fn push_visual_properties(&self, tile_id: &str, properties: &VisualProperties) -> bool {
        match self.component(tile_id) {
            Some(component) => {
                component.set_visual_properties(properties);
                true
            }
            None => false,
        }
    }
}
