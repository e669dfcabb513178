//! Shared test utilities: the reference site fixture and a recording tile component.
//!
//! Log output comes from `test_log::test`, which every test module imports.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::{
    service::{TileComponent, VisualProperties},
    site::{
        Application, Group, GroupIdentification, GroupPayload, IndicatorDataSource, Inbound,
        IntentTarget, Site, SitePayload, Tile, TileTarget, Visualization, VizConfig, VizTarget,
        VizType,
    },
};

pub const STATIC_LAUNCHER: &str = "sap.ushell.StaticAppLauncher";
pub const DYNAMIC_LAUNCHER: &str = "sap.ushell.DynamicAppLauncher";

fn group(id: &str, title: &str, tiles: Vec<Tile>, links: Vec<Tile>) -> Group {
    Group {
        identification: GroupIdentification {
            id: id.to_string(),
            title: title.to_string(),
            ..Default::default()
        },
        payload: GroupPayload { tiles, links },
    }
}

fn viz(viz_type: &str, config: VizConfig) -> Visualization {
    Visualization {
        viz_type: viz_type.to_string(),
        viz_config: config,
    }
}

fn app_target(app_id: &str, inbound_id: &str) -> Option<VizTarget> {
    Some(VizTarget {
        app_id: Some(app_id.to_string()),
        inbound_id: Some(inbound_id.to_string()),
        ..Default::default()
    })
}

/// The reference site used across unit tests.
///
/// - `HOME` ("Home"): default + preset, tiles `[H1, H2]`, no links
/// - `ONE` ("One"): user group, tiles `[A, B, C]`, links `[L1]`
/// - `TWO` ("Two"): preset + locked, tiles `[BM1, X, Y, Z]`
///
/// `BM1` is a `#SO-action` bookmark from content provider `S4SYSTEM`. `X`, `Y` and `Z` point at
/// a missing application, a missing inbound and an unknown visualization type.
pub fn fixture_site() -> Site {
    let mut inbounds = BTreeMap::new();
    inbounds.insert(
        "inb1".to_string(),
        Inbound {
            semantic_object: "Sales".into(),
            action: "display".into(),
            title: Some("Sales Display".into()),
            subtitle: Some("Inbound subtitle".into()),
            icon: Some("sap-icon://sales".into()),
            info: None,
            parameters: BTreeMap::from([("mode".to_string(), "view".to_string())]),
        },
    );
    inbounds.insert(
        "inb2".to_string(),
        Inbound {
            semantic_object: "Sales".into(),
            action: "edit".into(),
            title: Some("Sales Edit".into()),
            ..Default::default()
        },
    );

    let applications = BTreeMap::from([(
        "app1".to_string(),
        Application {
            title: Some("Sales".into()),
            application_type: Some("UI5".into()),
            url: None,
            inbounds,
        },
    )]);

    let visualizations = BTreeMap::from([
        (
            "vizApp".to_string(),
            viz(
                STATIC_LAUNCHER,
                VizConfig {
                    target: app_target("app1", "inb1"),
                    ..Default::default()
                },
            ),
        ),
        (
            "vizDynamic".to_string(),
            viz(
                DYNAMIC_LAUNCHER,
                VizConfig {
                    title: Some("Sales Count".into()),
                    target: app_target("app1", "inb1"),
                    indicator_data_source: Some(IndicatorDataSource {
                        path: "/sap/opu/odata/sales/$count".into(),
                        refresh: Some(30),
                    }),
                    ..Default::default()
                },
            ),
        ),
        (
            "vizUrl".to_string(),
            viz(
                STATIC_LAUNCHER,
                VizConfig {
                    title: Some("External".into()),
                    target: Some(VizTarget {
                        url: Some("https://external.example.com/page".into()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ),
        ),
        (
            "vizDangling".to_string(),
            viz(
                STATIC_LAUNCHER,
                VizConfig {
                    target: app_target("appMissing", "inb1"),
                    ..Default::default()
                },
            ),
        ),
        (
            "vizNoInbound".to_string(),
            viz(
                STATIC_LAUNCHER,
                VizConfig {
                    target: app_target("app1", "inbMissing"),
                    ..Default::default()
                },
            ),
        ),
        (
            "vizUnknownType".to_string(),
            viz(
                "sap.ushell.Unknown",
                VizConfig {
                    target: app_target("app1", "inb1"),
                    ..Default::default()
                },
            ),
        ),
    ]);

    let viz_types = BTreeMap::from([
        (
            STATIC_LAUNCHER.to_string(),
            VizType {
                component_name: Some("sap.ushell.components.tiles.static".into()),
                tile_size: Some("1x1".into()),
            },
        ),
        (
            DYNAMIC_LAUNCHER.to_string(),
            VizType {
                component_name: Some("sap.ushell.components.tiles.dynamic".into()),
                tile_size: Some("1x2".into()),
            },
        ),
    ]);

    let mut home = group(
        "HOME",
        "Home",
        vec![Tile::from_viz("H1", "vizApp"), Tile::from_viz("H2", "vizDynamic")],
        vec![],
    );
    home.identification.is_default_group = true;
    home.identification.is_preset = true;

    let mut b = Tile::from_viz("B", "vizApp");
    b.title = Some("B override".into());
    let one = group(
        "ONE",
        "One",
        vec![
            Tile::from_viz("A", "vizApp"),
            b,
            Tile::from_viz("C", "vizUrl"),
        ],
        vec![Tile::from_viz("L1", "vizApp")],
    );

    let mut bookmark = Tile::bookmark(
        "BM1",
        TileTarget::Intent(IntentTarget {
            semantic_object: "SO".into(),
            action: "action".into(),
            ..Default::default()
        }),
    );
    bookmark.title = Some("My bookmark".into());
    bookmark.subtitle = Some("Bookmark subtitle".into());
    bookmark.viz_type = Some(STATIC_LAUNCHER.into());
    bookmark.content_provider = Some("S4SYSTEM".into());
    let mut two = group(
        "TWO",
        "Two",
        vec![
            bookmark,
            Tile::from_viz("X", "vizDangling"),
            Tile::from_viz("Y", "vizNoInbound"),
            Tile::from_viz("Z", "vizUnknownType"),
        ],
        vec![],
    );
    two.identification.is_preset = true;
    two.identification.is_group_locked = true;

    Site {
        version: Some("3.0.0".into()),
        identification: None,
        payload: SitePayload {
            groups_order: Some(vec!["HOME".into(), "ONE".into(), "TWO".into()]),
        },
        groups: BTreeMap::from([
            ("HOME".to_string(), home),
            ("ONE".to_string(), one),
            ("TWO".to_string(), two),
        ]),
        catalogs: BTreeMap::new(),
        visualizations,
        viz_types,
        applications,
    }
}

/// Tile component recording every signal it receives.
#[derive(Debug, Default)]
pub struct RecordingComponent {
    visibility: Mutex<Vec<bool>>,
    refreshes: Mutex<usize>,
    properties: Mutex<Vec<VisualProperties>>,
}

impl RecordingComponent {
    pub fn visibility(&self) -> Vec<bool> {
        self.visibility.lock().clone()
    }

    pub fn refreshes(&self) -> usize {
        *self.refreshes.lock()
    }

    pub fn properties(&self) -> Vec<VisualProperties> {
        self.properties.lock().clone()
    }
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
