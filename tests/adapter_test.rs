//! End-to-end behavior of the [`SiteAdapter`] against in-memory and gated services.

mod common;

use std::sync::Arc;

use launchpad_site::{
    error::RejectionPayload,
    event::SiteEvent,
    mutators::MoveTileRequest,
    service::MemorySiteService,
    site::TileKind,
    ErrorKind,
};
use test_log::test;
use tokio::sync::mpsc::unbounded_channel;

use common::{
    adapter_for, fixture_adapter, fixture_site, GatedResolutionService, GatedSiteService,
    SlowSaveService,
};

fn tile_ids(site: &launchpad_site::site::Site, group: &str) -> Vec<String> {
    site.group(group)
        .unwrap()
        .tiles()
        .iter()
        .map(|t| t.id.clone())
        .collect()
}

#[test(tokio::test)]
async fn concurrent_loads_are_coalesced_until_settled() {
    let service = Arc::new(GatedSiteService::new(fixture_site()));
    let adapter = adapter_for(service.clone(), Arc::new(GatedResolutionService::new()));

    let first = adapter.ensure_loaded();
    let second = adapter.ensure_loaded();
    assert!(first.same_load(&second));
    assert!(!first.is_settled());

    service.open();
    let (a, b) = futures::join!(first.clone(), second);
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
    assert_eq!(service.inner.load_count(), 1);

    let third = adapter.ensure_loaded();
    assert!(!third.same_load(&first));
    third.await;
    assert_eq!(service.inner.load_count(), 2);
}

#[test(tokio::test)]
async fn failed_initial_load_yields_no_groups() {
    let (adapter, service, _) = fixture_adapter();
    service.set_fail_loads(true);
    assert!(adapter.get_groups().await.is_empty());

    let err = adapter.get_default_group().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendFailure);
    assert!(err.to_string().contains("Failed to access default group"));
}

#[test(tokio::test)]
async fn groups_come_back_in_display_order() {
    let (adapter, _, _) = fixture_adapter();
    let ids: Vec<String> = adapter
        .get_groups()
        .await
        .iter()
        .map(|g| g.id().to_string())
        .collect();
    assert_eq!(ids, ["HOME", "ONE", "TWO"]);
    assert!(!adapter.is_group_removable("HOME").await.unwrap());
    assert!(adapter.is_group_removable("ONE").await.unwrap());
    assert!(adapter.is_group_locked("TWO").await.unwrap());
    assert!(adapter.is_group_visible("ONE").await.unwrap());
    assert!(!adapter.is_group_featured("ONE").await.unwrap());
}

#[test(tokio::test)]
async fn add_and_remove_groups_persist_and_emit_events() {
    let (adapter, service, _) = fixture_adapter();
    let (tx, mut rx) = unbounded_channel();
    let adapter = adapter.with_event_sender(tx);

    let added = adapter.add_group("Fresh").await.unwrap();
    assert_eq!(added.title(), "Fresh");
    assert!(added.is_removable());
    assert_eq!(
        rx.recv().await,
        Some(SiteEvent::GroupAdded(added.id().to_string(), 3))
    );

    adapter.remove_group("ONE").await.unwrap();
    assert_eq!(
        rx.recv().await,
        Some(SiteEvent::GroupRemoved("ONE".into(), Some(1)))
    );

    let stored = service.stored();
    assert_eq!(
        stored.groups_order(),
        ["HOME".to_string(), "TWO".to_string(), added.id().to_string()]
    );
    assert!(stored.check_invariants().is_ok());
}

#[test(tokio::test)]
async fn invalid_input_is_rejected_before_any_io() {
    let (adapter, service, _) = fixture_adapter();
    assert_eq!(
        adapter.add_group("  ").await.unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(
        adapter.remove_group("").await.unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(service.load_count(), 0);
    assert_eq!(service.save_count(), 0);
}

#[test(tokio::test)]
async fn failed_rename_hands_back_the_previous_title() {
    let (adapter, service, _) = fixture_adapter();
    adapter.get_groups().await;
    service.set_fail_saves(true);

    let rejection = adapter.set_group_title("ONE", "Uno").await.unwrap_err();
    assert_eq!(rejection.kind(), ErrorKind::BackendFailure);
    assert_eq!(rejection.payload, RejectionPayload::PreviousTitle("One".into()));
    assert!(rejection.to_string().contains("site could not be saved"));

    // Memory was rolled back along with the failed save.
    assert_eq!(adapter.get_group("ONE").await.unwrap().title(), "One");
    assert_eq!(service.stored().group("ONE").unwrap().title(), "One");

    let blank = adapter.set_group_title("ONE", "").await.unwrap_err();
    assert_eq!(blank.kind(), ErrorKind::InvalidInput);
    assert_eq!(blank.payload, RejectionPayload::PreviousTitle("One".into()));
}

#[test(tokio::test)]
async fn move_group_reorders_and_reports_groups_on_failure() {
    let mut site = fixture_site();
    site.groups.remove("TWO");
    site.payload.groups_order = Some(vec!["HOME".into(), "ONE".into()]);
    let service = Arc::new(MemorySiteService::new(site));
    let adapter = adapter_for(service.clone(), Arc::new(GatedResolutionService::new()));

    adapter.move_group("HOME", 1).await.unwrap();
    assert_eq!(
        service.stored().groups_order(),
        ["ONE".to_string(), "HOME".to_string()]
    );

    let rejection = adapter.move_group("HOME", 7).await.unwrap_err();
    assert_eq!(rejection.kind(), ErrorKind::InvalidInput);
    assert_eq!(
        rejection.payload,
        RejectionPayload::Groups(vec!["ONE".into(), "HOME".into()])
    );
}

#[test(tokio::test)]
async fn move_group_without_order_aborts() {
    let mut site = fixture_site();
    site.payload.groups_order = None;
    let service = Arc::new(MemorySiteService::new(site));
    let adapter = adapter_for(service.clone(), Arc::new(GatedResolutionService::new()));

    let rejection = adapter.move_group("HOME", 1).await.unwrap_err();
    assert_eq!(rejection.kind(), ErrorKind::NotFound);
    assert_eq!(service.save_count(), 0);
    assert!(service.stored().payload.groups_order.is_none());
}

#[test(tokio::test)]
async fn add_group_to_an_unordered_site_keeps_every_group() {
    let mut site = fixture_site();
    site.payload.groups_order = None;
    let service = Arc::new(MemorySiteService::new(site));
    let adapter = adapter_for(service.clone(), Arc::new(GatedResolutionService::new()));

    let before: Vec<String> = adapter.get_groups().await.iter().map(|g| g.id().to_string()).collect();
    assert_eq!(before, ["HOME", "ONE", "TWO"]);

    let group = adapter.add_group("New").await.unwrap();
    let after: Vec<String> = adapter.get_groups().await.iter().map(|g| g.id().to_string()).collect();
    assert_eq!(after, ["HOME", "ONE", "TWO", group.id()]);

    let stored = service.stored();
    assert_eq!(stored.groups_order(), ["HOME", "ONE", "TWO", group.id()]);
    assert!(stored.check_invariants().is_ok());
}

#[test(tokio::test)]
async fn generated_default_group_on_an_unordered_site_keeps_every_group() {
    let mut site = fixture_site();
    site.payload.groups_order = None;
    if let Some(home) = site.group_mut("HOME") {
        home.identification.is_default_group = false;
    }
    let service = Arc::new(MemorySiteService::new(site));
    let adapter = adapter_for(service.clone(), Arc::new(GatedResolutionService::new()));

    let group = adapter.get_default_group().await.unwrap();
    assert_eq!(group.id(), "DEFAULT_GROUP");
    let ids: Vec<String> = adapter.get_groups().await.iter().map(|g| g.id().to_string()).collect();
    assert_eq!(ids, ["DEFAULT_GROUP", "HOME", "ONE", "TWO"]);

    let stored = service.stored();
    assert!(stored.check_invariants().is_ok());
    assert_eq!(stored.groups_order().len(), 4);
}

#[test(tokio::test)]
async fn failed_save_rolls_back_only_its_own_edit() {
    let service = Arc::new(SlowSaveService::new(fixture_site()));
    let adapter = adapter_for(service.clone(), Arc::new(GatedResolutionService::new()));
    adapter.get_groups().await;

    service.fail_next_save();
    let (alpha, beta) = futures::join!(adapter.add_group("Alpha"), adapter.add_group("Beta"));
    assert_eq!(alpha.unwrap_err().kind(), ErrorKind::BackendFailure);
    let beta = beta.unwrap();

    let stored = service.inner.stored();
    assert!(stored.group(beta.id()).is_some());
    assert_eq!(adapter.store().snapshot().unwrap(), stored);
    let titles: Vec<String> = adapter.get_groups().await.iter().map(|g| g.title().to_string()).collect();
    assert_eq!(titles, ["Home", "One", "Two", "Beta"]);
}

#[test(tokio::test)]
async fn concurrent_callers_share_one_generated_default_group() {
    let mut site = fixture_site();
    if let Some(home) = site.group_mut("HOME") {
        home.identification.is_default_group = false;
    }
    let service = Arc::new(SlowSaveService::new(site));
    let adapter = adapter_for(service.clone(), Arc::new(GatedResolutionService::new()));
    adapter.get_groups().await;

    let (first, second) = futures::join!(adapter.get_default_group(), adapter.get_default_group());
    assert_eq!(first.unwrap().id(), second.unwrap().id());
    assert_eq!(service.inner.save_count(), 1);
    assert_eq!(adapter.get_groups().await.len(), 4);
}

#[test(tokio::test)]
async fn hiding_no_groups_clears_every_visibility_flag() {
    let mut site = fixture_site();
    site.group_mut("ONE").unwrap().identification.is_visible = Some(false);
    site.group_mut("TWO").unwrap().identification.is_visible = Some(true);
    let service = Arc::new(MemorySiteService::new(site));
    let adapter = adapter_for(service.clone(), Arc::new(GatedResolutionService::new()));

    adapter.hide_groups(&["TWO".to_string()]).await.unwrap();
    assert!(!adapter.is_group_visible("TWO").await.unwrap());

    adapter.hide_groups(&[]).await.unwrap();
    let json = service.stored().to_json().unwrap();
    assert!(!json.contains("isVisible"));
}

#[test(tokio::test)]
async fn reset_applies_only_to_preset_groups() {
    let mut personalized = fixture_site();
    personalized.group_mut("TWO").unwrap().identification.title = "Mine".into();
    personalized.group_mut("TWO").unwrap().payload.tiles.truncate(1);
    let service = Arc::new(MemorySiteService::with_original(personalized, fixture_site()));
    let adapter = adapter_for(service.clone(), Arc::new(GatedResolutionService::new()));

    let err = adapter.reset_group("ONE").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(service.save_count(), 0);

    let reset = adapter.reset_group("TWO").await.unwrap();
    assert_eq!(reset.title(), "Two");
    assert_eq!(reset.tiles().len(), 4);
    assert!(reset.is_locked());
    assert_eq!(service.stored().group("TWO").unwrap(), &reset);
}

#[test(tokio::test)]
async fn move_tile_within_group_and_back() {
    let (adapter, service, _) = fixture_adapter();
    let forward = MoveTileRequest {
        tile_id: "A",
        source_index: 0,
        target_index: 2,
        source_group: "ONE",
        target_group: "ONE",
        target_type: TileKind::Tile,
    };
    let moved = adapter.move_tile(&forward).await.unwrap();
    assert_eq!((moved.from_index, moved.to_index), (0, 2));
    assert_eq!(tile_ids(&service.stored(), "ONE"), ["B", "C", "A"]);

    let back = MoveTileRequest {
        source_index: 2,
        target_index: 0,
        ..forward.clone()
    };
    adapter.move_tile(&back).await.unwrap();
    assert_eq!(service.stored(), fixture_site());
}

#[test(tokio::test)]
async fn noop_move_succeeds_without_saving() {
    let (adapter, service, _) = fixture_adapter();
    let request = MoveTileRequest {
        tile_id: "B",
        source_index: 1,
        target_index: 1,
        source_group: "ONE",
        target_group: "ONE",
        target_type: TileKind::Tile,
    };
    let moved = adapter.move_tile(&request).await.unwrap();
    assert!(moved.is_noop());
    assert_eq!(service.save_count(), 0);
}

#[test(tokio::test)]
async fn add_and_remove_catalog_tiles() {
    let (adapter, service, _) = fixture_adapter();
    let tile = adapter.add_tile("vizApp", None).await.unwrap();
    assert_eq!(tile.id, "tile-1");
    assert_eq!(tile_ids(&service.stored(), "HOME"), ["H1", "H2", "tile-1"]);

    adapter.remove_tile("HOME", "tile-1", 2).await.unwrap();
    assert_eq!(tile_ids(&service.stored(), "HOME"), ["H1", "H2"]);

    let err = adapter.add_tile("nope", Some("ONE")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test(tokio::test)]
async fn unresolvable_tiles_are_filtered_from_listings() {
    let (adapter, _, _) = fixture_adapter();
    let tiles = adapter.get_group_tiles("TWO").await.unwrap();
    let ids: Vec<&str> = tiles.iter().map(|t| t.tile_id.as_str()).collect();
    assert_eq!(ids, ["BM1"]);

    assert!(!adapter.is_tile_intent_supported("X").await);
    let err = adapter.resolve_tile("X").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DanglingReference);
    assert!(err.is_soft());
}

#[test(tokio::test)]
async fn links_resolve_with_the_link_flag() {
    let (adapter, _, _) = fixture_adapter();
    let links = adapter.get_links("ONE").await.unwrap();
    assert_eq!(links.len(), 1);
    assert!(links[0].is_link);
    assert_eq!(adapter.get_tile_type("L1").await.unwrap(), TileKind::Link);
}

#[test(tokio::test)]
async fn tile_queries_read_the_resolved_descriptor() {
    let (adapter, _, _) = fixture_adapter();
    assert_eq!(adapter.get_tile_title("B").await.unwrap(), "B override");
    assert_eq!(
        adapter.get_tile_subtitle("A").await.unwrap().as_deref(),
        Some("Inbound subtitle")
    );
    assert_eq!(
        adapter.get_tile_icon("A").await.unwrap().as_deref(),
        Some("sap-icon://sales")
    );
    assert_eq!(adapter.get_tile_info("A").await.unwrap(), None);
    assert_eq!(
        adapter.get_tile_target("A").await.unwrap(),
        "#Sales-display?mode=view"
    );
    assert_eq!(adapter.get_tile_size("H2").await.unwrap(), "1x2");
    assert_eq!(adapter.get_tile_size("A").await.unwrap(), "1x1");
    assert_eq!(adapter.get_tile_title("H2").await.unwrap(), "Sales Count");
}

#[test(tokio::test)]
async fn concurrent_resolutions_share_one_request() {
    let site_service = Arc::new(MemorySiteService::new(fixture_site()));
    let resolution = Arc::new(GatedResolutionService::new());
    let adapter = adapter_for(site_service, resolution.clone());
    adapter.get_groups().await;

    let first = adapter.resolve_tile("A");
    let second = adapter.resolve_tile("A");
    let opener = async {
        tokio::task::yield_now().await;
        resolution.open();
    };
    let (first, second, ()) = futures::join!(first, second, opener);
    assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
    assert_eq!(resolution.inner.call_count(), 1);

    adapter.resolve_tile("A").await.unwrap();
    assert_eq!(resolution.inner.call_count(), 1);
}
