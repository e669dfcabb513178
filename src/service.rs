//! Collaborators the adapter depends on but does not own.
//!
//! - [`SiteService`]: fetches and persists the site document.
//! - [`ResolutionService`]: turns an intent hash into a navigation target.
//! - [`IdGenerator`]: supplies ids for new groups and tiles.
//! - [`TileComponent`]: handle to a live tile component instantiated by the UI host.
//!
//! The in-memory implementations here back the tests and the `site-inspect` binary;
//! [`JsonFileSiteService`] persists to disk.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs::{read_to_string, rename, write},
    future::Future,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};
use uuid::Uuid;

use crate::{
    error::SiteError,
    hash::Intent,
    site::{Group, Inbound, Site},
};

/// Backing store for the site document.
pub trait SiteService: Send + Sync + 'static {
    fn get_site(&self) -> impl Future<Output = Result<Site, SiteError>> + Send;

    fn save(&self, site: Site) -> impl Future<Output = Result<(), SiteError>> + Send;

    /// The group as it was delivered before any personalization.
    fn get_group_from_original_site(
        &self,
        group_id: &str,
    ) -> impl Future<Output = Result<Group, SiteError>> + Send;
}

/// What a navigation target resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// e.g. `UI5`, `URL`, `WDA`
    pub application_type: String,
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
}

pub trait ResolutionService: Send + Sync + 'static {
    fn resolve_tile_intent(
        &self,
        hash: &str,
    ) -> impl Future<Output = Result<ResolutionResult, SiteError>> + Send;

    /// Resolves `hash` against the given inbounds only, not the whole site.
    fn resolve_tile_intent_in_context(
        &self,
        inbounds: &[Inbound],
        hash: &str,
    ) -> impl Future<Output = Result<ResolutionResult, SiteError>> + Send;
}

pub trait IdGenerator: Send + Sync {
    fn next_id(&self, prefix: &str) -> String;
}

#[derive(Debug, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4())
    }
}

/// Deterministic ids (`prefix-1`, `prefix-2`, ...), handy for tests and fixtures.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator(AtomicU64);

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }
}

/// Visual properties pushed to a live tile component after a bookmark update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualProperties {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub icon: Option<String>,
    pub info: Option<String>,
    pub target_url: Option<String>,
}

/// Handle to a tile component instantiated by the UI host.
pub trait TileComponent: Send + Sync {
    fn set_visible(&self, visible: bool);
    fn refresh(&self);
    fn set_visual_properties(&self, properties: &VisualProperties);
}

/// Site service holding both the personalized and the original site in memory.
#[derive(Debug, Default)]
pub struct MemorySiteService {
    site: RwLock<Site>,
    original: RwLock<Site>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MemorySiteService {
    pub fn new(site: Site) -> MemorySiteService {
        MemorySiteService {
            original: RwLock::new(site.clone()),
            site: RwLock::new(site),
            ..Default::default()
        }
    }

    pub fn with_original(site: Site, original: Site) -> MemorySiteService {
        MemorySiteService {
            site: RwLock::new(site),
            original: RwLock::new(original),
            ..Default::default()
        }
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The last successfully saved site.
    pub fn stored(&self) -> Site {
        self.site.read().clone()
    }
}

impl SiteService for MemorySiteService {
    fn get_site(&self) -> impl Future<Output = Result<Site, SiteError>> + Send {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_loads.load(Ordering::SeqCst) {
            Err(SiteError::Backend("site could not be loaded".to_string()))
        } else {
            Ok(self.site.read().clone())
        };
        async move { result }
    }

    fn save(&self, site: Site) -> impl Future<Output = Result<(), SiteError>> + Send {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_saves.load(Ordering::SeqCst) {
            Err(SiteError::Backend("site could not be saved".to_string()))
        } else {
            *self.site.write() = site;
            Ok(())
        };
        async move { result }
    }

    fn get_group_from_original_site(
        &self,
        group_id: &str,
    ) -> impl Future<Output = Result<Group, SiteError>> + Send {
        let result = self.original.read().group(group_id).cloned().ok_or_else(|| {
            SiteError::NotFound(format!("group '{group_id}' is not part of the original site"))
        });
        async move { result }
    }
}

/// Site service reading and writing a CDM site JSON file.
///
/// Saves go through a temp file in the same directory followed by a rename, so a failed write
/// never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct JsonFileSiteService {
    path: PathBuf,
    original_path: Option<PathBuf>,
}

impl JsonFileSiteService {
    pub fn new(path: PathBuf) -> Self {
        JsonFileSiteService {
            path,
            original_path: None,
        }
    }

    pub fn with_original(path: PathBuf, original_path: PathBuf) -> Self {
        JsonFileSiteService {
            path,
            original_path: Some(original_path),
        }
    }

    fn read_site(&self, path: &Path) -> Result<Site, SiteError> {
        tracing::debug!("[JsonFileSiteService] Reading site from {:?}", path);
        let content = read_to_string(path).map_err(|e| {
            SiteError::Backend(format!("Could not read site file {}: {e}", path.display()))
        })?;
        Site::from_json(&content)
    }

    fn write_site(&self, site: &Site) -> Result<(), SiteError> {
        let json = site.to_json()?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        write(&tmp, json)
            .and_then(|_| rename(&tmp, &self.path))
            .map_err(|e| {
                SiteError::Backend(format!(
                    "Could not write site file {}: {e}",
                    self.path.display()
                ))
            })
    }
}

impl SiteService for JsonFileSiteService {
    fn get_site(&self) -> impl Future<Output = Result<Site, SiteError>> + Send {
        let result = self.read_site(&self.path);
        async move { result }
    }

    fn save(&self, site: Site) -> impl Future<Output = Result<(), SiteError>> + Send {
        let result = self.write_site(&site);
        async move { result }
    }

    fn get_group_from_original_site(
        &self,
        group_id: &str,
    ) -> impl Future<Output = Result<Group, SiteError>> + Send {
        let path = self.original_path.as_ref().unwrap_or(&self.path);
        let result = self.read_site(path).and_then(|site| {
            site.group(group_id).cloned().ok_or_else(|| {
                SiteError::NotFound(format!(
                    "group '{group_id}' is not part of the original site"
                ))
            })
        });
        async move { result }
    }
}

/// Resolves intents without a backend: any well formed intent resolves to an embedded
/// application, and in-context resolution requires a matching inbound.
#[derive(Debug, Default)]
pub struct LocalResolutionService {
    calls: AtomicUsize,
    failing: Mutex<BTreeSet<String>>,
}

impl LocalResolutionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resolution requests served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes every resolution of `semantic_object-action` fail.
    pub fn fail_for<S: Into<String>>(&self, so_action: S) {
        self.failing.lock().insert(so_action.into());
    }

    fn resolve(&self, hash: &str, inbounds: Option<&[Inbound]>) -> Result<ResolutionResult, SiteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let intent = Intent::parse(hash)?;
        let key = format!("{}-{}", intent.semantic_object, intent.action);
        if self.failing.lock().contains(&key) {
            return Err(SiteError::Backend(format!("no target mapping for {key}")));
        }
        let inbound = match inbounds {
            Some(inbounds) => Some(
                inbounds
                    .iter()
                    .find(|inb| {
                        inb.semantic_object == intent.semantic_object
                            && inb.action == intent.action
                    })
                    .ok_or_else(|| {
                        SiteError::NotFound(format!("no inbound in context matches {key}"))
                    })?,
            ),
            None => None,
        };
        Ok(ResolutionResult {
            application_type: "UI5".to_string(),
            url: Some(hash.to_string()),
            title: inbound.and_then(|inb| inb.title.clone()),
            subtitle: inbound.and_then(|inb| inb.subtitle.clone()),
            icon: inbound.and_then(|inb| inb.icon.clone()),
            info: inbound.and_then(|inb| inb.info.clone()),
        })
    }
}

impl ResolutionService for LocalResolutionService {
    fn resolve_tile_intent(
        &self,
        hash: &str,
    ) -> impl Future<Output = Result<ResolutionResult, SiteError>> + Send {
        let result = self.resolve(hash, None);
        async move { result }
    }

    fn resolve_tile_intent_in_context(
        &self,
        inbounds: &[Inbound],
        hash: &str,
    ) -> impl Future<Output = Result<ResolutionResult, SiteError>> + Send {
        let result = self.resolve(hash, Some(inbounds));
        async move { result }
    }
}
