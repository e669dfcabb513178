//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use launchpad_site::{
    adapter::SiteAdapter,
    config::AdapterConfig,
    service::{
        LocalResolutionService, MemorySiteService, ResolutionResult, ResolutionService,
        SequentialIdGenerator, SiteService, TileComponent, VisualProperties,
    },
    site::{Group, Inbound, Site},
    SiteError,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// Three groups: `HOME` (default, preset), `ONE` (user group, tiles A B C, link L1) and
/// `TWO` (preset, locked) holding the `#SO-action` bookmark `BM1` plus three tiles that cannot
/// be resolved (missing application, missing inbound, unknown visualization type).
#[allow(dead_code)]
pub const SITE_JSON: &str = r##"{
  "_version": "3.0.0",
  "payload": { "groupsOrder": ["HOME", "ONE", "TWO"] },
  "groups": {
    "HOME": {
      "identification": { "id": "HOME", "title": "Home", "isPreset": true, "isDefaultGroup": true },
      "payload": {
        "tiles": [ { "id": "H1", "vizId": "vizApp" }, { "id": "H2", "vizId": "vizDynamic" } ],
        "links": []
      }
    },
    "ONE": {
      "identification": { "id": "ONE", "title": "One" },
      "payload": {
        "tiles": [
          { "id": "A", "vizId": "vizApp" },
          { "id": "B", "vizId": "vizApp", "title": "B override" },
          { "id": "C", "vizId": "vizUrl" }
        ],
        "links": [ { "id": "L1", "vizId": "vizApp" } ]
      }
    },
    "TWO": {
      "identification": { "id": "TWO", "title": "Two", "isPreset": true, "isGroupLocked": true },
      "payload": {
        "tiles": [
          {
            "id": "BM1",
            "title": "My bookmark",
            "subtitle": "Bookmark subtitle",
            "target": { "semanticObject": "SO", "action": "action" },
            "vizType": "sap.ushell.StaticAppLauncher",
            "contentProvider": "S4SYSTEM",
            "isBookmark": true
          },
          { "id": "X", "vizId": "vizDangling" },
          { "id": "Y", "vizId": "vizNoInbound" },
          { "id": "Z", "vizId": "vizUnknownType" }
        ],
        "links": []
      }
    }
  },
  "visualizations": {
    "vizApp": {
      "vizType": "sap.ushell.StaticAppLauncher",
      "vizConfig": { "target": { "appId": "app1", "inboundId": "inb1" } }
    },
    "vizDynamic": {
      "vizType": "sap.ushell.DynamicAppLauncher",
      "vizConfig": {
        "title": "Sales Count",
        "target": { "appId": "app1", "inboundId": "inb1" },
        "indicatorDataSource": { "path": "/sap/opu/odata/sales/$count", "refresh": 30 }
      }
    },
    "vizUrl": {
      "vizType": "sap.ushell.StaticAppLauncher",
      "vizConfig": { "title": "External", "target": { "url": "https://external.example.com/page" } }
    },
    "vizDangling": {
      "vizType": "sap.ushell.StaticAppLauncher",
      "vizConfig": { "target": { "appId": "appMissing", "inboundId": "inb1" } }
    },
    "vizNoInbound": {
      "vizType": "sap.ushell.StaticAppLauncher",
      "vizConfig": { "target": { "appId": "app1", "inboundId": "inbMissing" } }
    },
    "vizUnknownType": {
      "vizType": "sap.ushell.Unknown",
      "vizConfig": { "target": { "appId": "app1", "inboundId": "inb1" } }
    }
  },
  "vizTypes": {
    "sap.ushell.StaticAppLauncher": { "componentName": "sap.ushell.components.tiles.static", "tileSize": "1x1" },
    "sap.ushell.DynamicAppLauncher": { "componentName": "sap.ushell.components.tiles.dynamic", "tileSize": "1x2" }
  },
  "applications": {
    "app1": {
      "title": "Sales",
      "applicationType": "UI5",
      "inbounds": {
        "inb1": {
          "semanticObject": "Sales",
          "action": "display",
          "title": "Sales Display",
          "subtitle": "Inbound subtitle",
          "icon": "sap-icon://sales",
          "parameters": { "mode": "view" }
        },
        "inb2": { "semanticObject": "Sales", "action": "edit", "title": "Sales Edit" }
      }
    }
  },
  "catalogs": {}
}"##;

#[allow(dead_code)]
pub fn fixture_site() -> Site {
    Site::from_json(SITE_JSON).unwrap()
}

#[allow(dead_code)]
pub type TestAdapter = SiteAdapter<MemorySiteService, LocalResolutionService>;

/// Adapter over an in-memory copy of the fixture with deterministic ids.
#[allow(dead_code)]
pub fn adapter_for<S: SiteService, R: ResolutionService>(
    site_service: Arc<S>,
    resolution: Arc<R>,
) -> SiteAdapter<S, R> {
    SiteAdapter::with_id_generator(
        site_service,
        resolution,
        AdapterConfig::default(),
        Arc::new(SequentialIdGenerator::default()),
    )
}

#[allow(dead_code)]
pub fn fixture_adapter() -> (TestAdapter, Arc<MemorySiteService>, Arc<LocalResolutionService>) {
    let site_service = Arc::new(MemorySiteService::new(fixture_site()));
    let resolution = Arc::new(LocalResolutionService::new());
    let adapter = adapter_for(site_service.clone(), resolution.clone());
    (adapter, site_service, resolution)
}

/// Site service whose loads wait until [`GatedSiteService::open`] is called.
#[allow(dead_code)]
pub struct GatedSiteService {
    pub inner: MemorySiteService,
    gate: Semaphore,
}

#[allow(dead_code)]
impl GatedSiteService {
    pub fn new(site: Site) -> Self {
        GatedSiteService {
            inner: MemorySiteService::new(site),
            gate: Semaphore::new(0),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(1024);
    }
}

impl SiteService for GatedSiteService {
    fn get_site(&self) -> impl Future<Output = Result<Site, SiteError>> + Send {
        async move {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| SiteError::Backend(e.to_string()))?;
            self.inner.get_site().await
        }
    }

    fn save(&self, site: Site) -> impl Future<Output = Result<(), SiteError>> + Send {
        self.inner.save(site)
    }

    fn get_group_from_original_site(
        &self,
        group_id: &str,
    ) -> impl Future<Output = Result<Group, SiteError>> + Send {
        self.inner.get_group_from_original_site(group_id)
    }
}

/// Site service whose saves yield to other tasks before they settle, so concurrent edits can
/// interleave with a save in flight. [`SlowSaveService::fail_next_save`] arms a single failure.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct SlowSaveService {
    pub inner: MemorySiteService,
    fail_next: AtomicBool,
}

#[allow(dead_code)]
impl SlowSaveService {
    pub fn new(site: Site) -> Self {
        SlowSaveService {
            inner: MemorySiteService::new(site),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn fail_next_save(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl SiteService for SlowSaveService {
    fn get_site(&self) -> impl Future<Output = Result<Site, SiteError>> + Send {
        self.inner.get_site()
    }

    fn save(&self, site: Site) -> impl Future<Output = Result<(), SiteError>> + Send {
        let fail = self.fail_next.swap(false, Ordering::SeqCst);
        async move {
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            if fail {
                Err(SiteError::Backend("first save failed".to_string()))
            } else {
                self.inner.save(site).await
            }
        }
    }

    fn get_group_from_original_site(
        &self,
        group_id: &str,
    ) -> impl Future<Output = Result<Group, SiteError>> + Send {
        self.inner.get_group_from_original_site(group_id)
    }
}

/// Resolution service whose answers wait until [`GatedResolutionService::open`] is called.
#[allow(dead_code)]
pub struct GatedResolutionService {
    pub inner: LocalResolutionService,
    gate: Semaphore,
}

#[allow(dead_code)]
impl GatedResolutionService {
    pub fn new() -> Self {
        GatedResolutionService {
            inner: LocalResolutionService::new(),
            gate: Semaphore::new(0),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(1024);
    }
}

impl ResolutionService for GatedResolutionService {
    fn resolve_tile_intent(
        &self,
        hash: &str,
    ) -> impl Future<Output = Result<ResolutionResult, SiteError>> + Send {
        let hash = hash.to_string();
        async move {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| SiteError::Backend(e.to_string()))?;
            self.inner.resolve_tile_intent(&hash).await
        }
    }

    fn resolve_tile_intent_in_context(
        &self,
        inbounds: &[Inbound],
        hash: &str,
    ) -> impl Future<Output = Result<ResolutionResult, SiteError>> + Send {
        let inbounds = inbounds.to_vec();
        let hash = hash.to_string();
        async move {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| SiteError::Backend(e.to_string()))?;
            self.inner
                .resolve_tile_intent_in_context(&inbounds, &hash)
                .await
        }
    }
}

/// Tile component recording the signals it receives.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingComponent {
    pub visibility: Mutex<Vec<bool>>,
    pub refreshes: Mutex<usize>,
    pub properties: Mutex<Vec<VisualProperties>>,
}

impl TileComponent for RecordingComponent {
    fn set_visible(&self, visible: bool) {
        self.visibility.lock().push(visible);
    }

    fn refresh(&self) {
        *self.refreshes.lock() += 1;
    }

    fn set_visual_properties(&self, properties: &VisualProperties) {
        self.properties.lock().push(properties.clone());
    }
}
