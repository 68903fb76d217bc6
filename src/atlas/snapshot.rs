//! World snapshot export and format-detecting import.

use chrono::Utc;

use crate::atlas::errors::AtlasError;
use crate::atlas::migrate;
use crate::atlas::model::{AtlasModel, Confirm, Refresh};
use crate::atlas::types::World;

/// A serialized world snapshot with its suggested file name. The export date
/// is embedded in the name.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub file_name: String,
    pub contents: String,
}

/// Serialize the complete world as a pretty-printed JSON document.
pub fn export_world(world: &World) -> Result<Snapshot, AtlasError> {
    let contents = serde_json::to_string_pretty(world)?;
    let file_name = format!("waymark_export_{}.json", Utc::now().format("%Y-%m-%d"));
    Ok(Snapshot {
        file_name,
        contents,
    })
}

/// Classify and import a textual document, replacing the live world after
/// explicit confirmation. A rejected or unconfirmed import leaves the
/// existing world untouched.
pub async fn import_document(
    model: &mut AtlasModel,
    text: &str,
    confirm: &dyn Confirm,
) -> Result<Refresh, AtlasError> {
    let world = migrate::classify_document(text)?;
    if !confirm.confirm("导入将覆盖当前所有地图数据，确定继续吗？") {
        return Err(AtlasError::Cancelled);
    }
    model.replace_world(world).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::model::AlwaysConfirm;
    use crate::atlas::store::{KvStore, LegacyStore};
    use crate::atlas::types::{default_world, DEFAULT_MAP_ID};
    use tempfile::TempDir;

    struct DenyConfirm;
    impl Confirm for DenyConfirm {
        fn confirm(&self, _prompt: &str) -> bool {
            false
        }
    }

    async fn test_model(dir: &TempDir) -> AtlasModel {
        AtlasModel::load(KvStore::new(dir.path()), &LegacyStore::empty())
            .await
            .expect("model")
    }

    #[test]
    fn export_file_name_embeds_date() {
        let snapshot = export_world(&default_world()).expect("export");
        let expected = format!("waymark_export_{}.json", Utc::now().format("%Y-%m-%d"));
        assert_eq!(snapshot.file_name, expected);
    }

    #[tokio::test]
    async fn export_import_round_trip_native_schema() {
        let dir = TempDir::new().expect("tempdir");
        let mut model = test_model(&dir).await;
        let _ = model
            .change_background(Some("blob:city".to_string()))
            .await
            .expect("background");
        let before = model.world().clone();

        let snapshot = export_world(model.world()).expect("export");
        let _ = import_document(&mut model, &snapshot.contents, &AlwaysConfirm)
            .await
            .expect("import");
        assert_eq!(model.world(), &before);
    }

    #[tokio::test]
    async fn import_wraps_legacy_document() {
        let dir = TempDir::new().expect("tempdir");
        let mut model = test_model(&dir).await;
        let legacy = r##"{
            "beach": {"id": "beach", "name": "海边", "x": "10%", "y": "20%",
                      "desc": "", "type": "simple", "color": "#fff"}
        }"##;
        let _ = import_document(&mut model, legacy, &AlwaysConfirm)
            .await
            .expect("import");
        assert_eq!(model.world().current_map_id, DEFAULT_MAP_ID);
        assert_eq!(model.current_pins()["beach"].name, "海边");

        // Wrapped output round-trips through export/import unchanged.
        let before = model.world().clone();
        let snapshot = export_world(model.world()).expect("export");
        let _ = import_document(&mut model, &snapshot.contents, &AlwaysConfirm)
            .await
            .expect("re-import");
        assert_eq!(model.world(), &before);
    }

    #[tokio::test]
    async fn rejected_import_leaves_world_untouched() {
        let dir = TempDir::new().expect("tempdir");
        let mut model = test_model(&dir).await;
        let before = model.world().clone();

        let err = import_document(&mut model, "{\"nope\": 1}", &AlwaysConfirm)
            .await
            .expect_err("invalid");
        assert!(matches!(err, AtlasError::Format(_)));
        assert_eq!(model.world(), &before);
    }

    #[tokio::test]
    async fn unconfirmed_import_is_cancelled() {
        let dir = TempDir::new().expect("tempdir");
        let mut model = test_model(&dir).await;
        let before = model.world().clone();
        let snapshot = export_world(&default_world()).expect("export");

        let err = import_document(&mut model, &snapshot.contents, &DenyConfirm)
            .await
            .expect_err("cancelled");
        assert!(matches!(err, AtlasError::Cancelled));
        assert_eq!(model.world(), &before);
    }
}
