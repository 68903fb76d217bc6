use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::atlas::errors::AtlasError;

/// Map id used when wrapping legacy flat pin collections and for the starter world.
pub const DEFAULT_MAP_ID: &str = "main";

/// Pin variants. Serialized as the lowercase strings used by the persisted document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    /// Plain location.
    #[default]
    Simple,
    /// Multi-floor complex with an interior view.
    Complex,
    /// Navigates to another map on activation.
    Portal,
    /// Free-text custom-destination trigger.
    Custom,
}

impl fmt::Display for PinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PinKind::Simple => "simple",
            PinKind::Complex => "complex",
            PinKind::Portal => "portal",
            PinKind::Custom => "custom",
        };
        f.write_str(s)
    }
}

impl FromStr for PinKind {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(PinKind::Simple),
            "complex" => Ok(PinKind::Complex),
            "portal" => Ok(PinKind::Portal),
            "custom" => Ok(PinKind::Custom),
            other => Err(AtlasError::InvalidInput(format!(
                "unknown pin type: {other}"
            ))),
        }
    }
}

/// One floor or area inside a complex pin. Owned exclusively by its pin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_items: Vec<String>,
}

/// A point location on a map. Coordinates are percentage-of-container strings
/// (e.g. `"42.5%"`); pixel geometry belongs to the rendering layer, never here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: String,
    pub name: String,
    pub x: String,
    pub y: String,
    #[serde(default)]
    pub desc: String,
    #[serde(rename = "type", default)]
    pub kind: PinKind,
    #[serde(default)]
    pub color: String,
    /// Opaque blob reference for the cover image, produced by the UI's encoder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub floors: Vec<Floor>,
    /// Destination map id. Meaningful for portal pins; a portal without a
    /// target is inert but legal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_map_id: Option<String>,
}

/// A named scene holding its own background and pin collection.
/// Backgrounds are per-map, never global.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Map {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default)]
    pub pins: BTreeMap<String, Pin>,
}

impl Map {
    /// Empty map created lazily when navigation targets an unknown id.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            background: None,
            pins: BTreeMap::new(),
        }
    }
}

/// Top-level persisted aggregate: every map plus the current navigation
/// position. The back-history lives here too but is session state and is
/// not written to the persisted document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct World {
    pub current_map_id: String,
    pub maps: BTreeMap<String, Map>,
    #[serde(skip)]
    pub history: Vec<String>,
}

impl World {
    /// Repair `current_map_id` if it no longer resolves, falling back to an
    /// arbitrary existing map. Returns true when a repair happened. Callers
    /// must guarantee `maps` is non-empty first.
    pub fn ensure_current_resolves(&mut self) -> bool {
        if self.maps.contains_key(&self.current_map_id) {
            return false;
        }
        if let Some(id) = self.maps.keys().next() {
            self.current_map_id = id.clone();
            return true;
        }
        false
    }
}

fn pin(id: &str, name: &str, x: &str, y: &str, desc: &str, kind: PinKind, color: &str) -> Pin {
    Pin {
        id: id.to_string(),
        name: name.to_string(),
        x: x.to_string(),
        y: y.to_string(),
        desc: desc.to_string(),
        kind,
        color: color.to_string(),
        image: None,
        internal_image: None,
        floors: Vec::new(),
        target_map_id: None,
    }
}

/// Starter world synthesized when no stored or legacy data exists: the city
/// map with its canonical pins, plus a suburbs map reachable through a portal.
pub fn default_world() -> World {
    use PinKind::*;

    let mut main = Map::named("城市");
    for p in [
        pin("gov", "市政府", "50%", "60%", "城市行政中心。", Simple, "#ef9a9a"),
        pin("villa", "私人别墅", "25%", "15%", "位于北区的一栋独栋别墅。", Simple, "#ba68c8"),
        pin("private_club", "私人会所", "75%", "15%", "仅限会员进入的高级会所，隐秘性极高。", Simple, "#ce93d8"),
        pin("airport", "机场", "85%", "35%", "连接世界的交通枢纽。", Simple, "#b0bec5"),
        pin("port", "港口", "85%", "65%", "繁忙的国际货运港口。", Simple, "#a5d6a7"),
        pin("office4", "A集团", "15%", "25%", "本市新兴科技巨头。", Simple, "#b39ddb"),
        pin("office3", "B集团", "10%", "35%", "老牌实业集团，在本地拥有深厚根基。", Simple, "#90caf9"),
        pin("office", "C集团", "15%", "60%", "主营航运、大宗商品与投资的家族企业。", Simple, "#64b5f6"),
        pin("tv_station", "电视台", "20%", "65%", "城市媒体中心，众多节目的录制现场。", Simple, "#80cbc4"),
        pin("office2", "D集团", "15%", "70%", "国内最大的娱乐产业集团之一。", Simple, "#e57373"),
        pin("highschool", "高中", "30%", "85%", "本市著名的重点高中。", Simple, "#ffcc80"),
        pin("other_places", "其他地点", "85%", "85%", "前往未在地图上标注的区域。", Custom, "#ffe0b2"),
    ] {
        main.pins.insert(p.id.clone(), p);
    }
    let mut to_suburbs = pin(
        "to_suburbs",
        "郊区入口",
        "50%",
        "90%",
        "通往郊区的主干道。",
        Portal,
        "#c5e1a5",
    );
    to_suburbs.target_map_id = Some("suburbs".to_string());
    main.pins.insert(to_suburbs.id.clone(), to_suburbs);

    let mut suburbs = Map::named("郊区");
    for p in [
        pin("lake", "湖畔营地", "40%", "30%", "安静的湖边露营地。", Simple, "#81d4fa"),
        pin("farm", "农场", "70%", "60%", "供应全市的有机农场。", Simple, "#a5d6a7"),
    ] {
        suburbs.pins.insert(p.id.clone(), p);
    }
    let mut back = pin(
        "to_city",
        "返回城区",
        "15%",
        "80%",
        "回到市中心。",
        Portal,
        "#ffab91",
    );
    back.target_map_id = Some(DEFAULT_MAP_ID.to_string());
    suburbs.pins.insert(back.id.clone(), back);

    let mut maps = BTreeMap::new();
    maps.insert(DEFAULT_MAP_ID.to_string(), main);
    maps.insert("suburbs".to_string(), suburbs);

    World {
        current_map_id: DEFAULT_MAP_ID.to_string(),
        maps,
        history: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_world_current_resolves() {
        let world = default_world();
        assert!(world.maps.contains_key(&world.current_map_id));
        assert_eq!(world.current_map_id, DEFAULT_MAP_ID);
        assert!(world.maps.len() >= 2);
    }

    #[test]
    fn default_world_portals_have_targets() {
        let world = default_world();
        for map in world.maps.values() {
            for p in map.pins.values() {
                if p.kind == PinKind::Portal {
                    let target = p.target_map_id.as_ref().expect("portal target");
                    assert!(world.maps.contains_key(target), "dangling portal {}", p.id);
                }
            }
        }
    }

    #[test]
    fn ensure_current_resolves_repairs_stale_id() {
        let mut world = default_world();
        world.current_map_id = "nowhere".to_string();
        assert!(world.ensure_current_resolves());
        assert!(world.maps.contains_key(&world.current_map_id));
        // Already-valid id is left alone.
        assert!(!world.ensure_current_resolves());
    }

    #[test]
    fn pin_document_shape_is_camel_case() {
        let mut p = pin("a", "A", "10%", "20%", "", PinKind::Portal, "#fff");
        p.target_map_id = Some("m2".to_string());
        let value = serde_json::to_value(&p).expect("serialize");
        assert_eq!(value["type"], "portal");
        assert_eq!(value["targetMapId"], "m2");
        assert!(value.get("floors").is_none(), "empty floors omitted");
    }

    #[test]
    fn history_is_not_persisted() {
        let mut world = default_world();
        world.history.push("suburbs".to_string());
        let text = serde_json::to_string(&world).expect("serialize");
        assert!(!text.contains("history"));
        let back: World = serde_json::from_str(&text).expect("parse");
        assert!(back.history.is_empty());
    }
}
