//! Navigation, export/import round-trips, and write-through persistence
//! exercised through the public model API.

use tempfile::TempDir;
use waymark::atlas::{
    export_world, import_document, AlwaysConfirm, AtlasModel, BackOutcome, KvStore, LegacyStore,
    NewPin, PinKind, DEFAULT_MAP_ID,
};

async fn open(dir: &TempDir) -> AtlasModel {
    AtlasModel::load(KvStore::new(dir.path()), &LegacyStore::empty())
        .await
        .expect("model")
}

#[tokio::test]
async fn portal_navigation_and_back_history() {
    let dir = TempDir::new().expect("tempdir");
    let mut model = open(&dir).await;

    // Follow the starter portal, then one to a map that does not exist yet.
    let portal_target = model.pin("to_suburbs").expect("portal").target_map_id.clone();
    let target = portal_target.expect("portal has target");
    let _ = model.switch_map(&target).await.expect("switch");
    assert_eq!(model.world().current_map_id, "suburbs");

    let _ = model.switch_map("harbor_district").await.expect("switch");
    assert!(model.world().maps.contains_key("harbor_district"));
    assert!(model.current_pins().is_empty());

    // Back-history unwinds in order.
    assert_eq!(
        model.go_back().await.expect("back"),
        BackOutcome::Moved {
            to: "suburbs".to_string()
        }
    );
    assert_eq!(
        model.go_back().await.expect("back"),
        BackOutcome::Moved {
            to: DEFAULT_MAP_ID.to_string()
        }
    );
    assert_eq!(model.go_back().await.expect("back"), BackOutcome::EmptyHistory);
}

#[tokio::test]
async fn world_edits_round_trip_through_export_and_import() {
    let dir = TempDir::new().expect("tempdir");
    let mut model = open(&dir).await;

    let _ = model
        .add_pin(NewPin {
            id: Some("cafe".to_string()),
            name: "咖啡馆".to_string(),
            x: "33%".to_string(),
            y: "44%".to_string(),
            desc: "街角的咖啡馆。".to_string(),
            kind: PinKind::Simple,
            color: "#8d6e63".to_string(),
            target_map_id: None,
        })
        .await
        .expect("add pin");
    let _ = model.add_floor("cafe").await.expect("add floor");
    let _ = model
        .change_background(Some("blob:city-night".to_string()))
        .await
        .expect("background");
    let before = model.world().clone();

    let snapshot = export_world(model.world()).expect("export");
    assert!(snapshot.file_name.starts_with("waymark_export_"));
    assert!(snapshot.file_name.ends_with(".json"));

    // Import into a completely fresh store.
    let other_dir = TempDir::new().expect("tempdir");
    let mut other = open(&other_dir).await;
    let _ = import_document(&mut other, &snapshot.contents, &AlwaysConfirm)
        .await
        .expect("import");
    assert_eq!(other.world(), &before);
    assert_eq!(other.pin("cafe").expect("pin").kind, PinKind::Complex);
}

#[tokio::test]
async fn edits_survive_a_full_reopen() {
    let dir = TempDir::new().expect("tempdir");
    {
        let mut model = open(&dir).await;
        let _ = model.switch_map("suburbs").await.expect("switch");
        let _ = model
            .add_pin(NewPin {
                id: Some("mill".to_string()),
                name: "磨坊".to_string(),
                ..NewPin::default()
            })
            .await
            .expect("add pin");
    }
    let model = open(&dir).await;
    assert_eq!(model.world().current_map_id, "suburbs");
    assert_eq!(model.pin("mill").expect("pin").name, "磨坊");
    // The main map was untouched by edits on the suburbs map.
    assert!(model.world().maps[DEFAULT_MAP_ID].pins.contains_key("gov"));
}
