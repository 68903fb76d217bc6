//! Schema detection and backward-compatible migration for world documents.
//!
//! The load path runs an ordered list of probes, each returning a tagged
//! found/not-found result: current schema under the primary key, then the
//! legacy flat pin collection in the primary backend, then the same legacy
//! keys in the flat-text fallback, and finally the synthesized starter
//! world. Migration of a stored value executes at most once and is not
//! reversible. Unparsable data is logged and treated as absent, never
//! surfaced to the load-path caller.

use std::collections::BTreeMap;

use log::{info, warn};
use serde_json::Value;

use crate::atlas::errors::AtlasError;
use crate::atlas::store::{KvStore, LegacyStore};
use crate::atlas::types::{default_world, Map, Pin, World, DEFAULT_MAP_ID};

/// Primary key for the current-schema world document.
pub const WORLD_KEY: &str = "atlas:world";
/// Legacy flat pin collection key, identical in both backends.
pub const LEGACY_PINS_KEY: &str = "general_map_data_v2";
/// Legacy global background key, absorbed into the wrapped map.
pub const LEGACY_BG_KEY: &str = "general_map_bg_v2";

/// Tagged result of one migration probe.
pub enum Probe {
    Found(World),
    NotFound,
}

/// A document is current schema when it carries both `maps` and
/// `currentMapId` at the top level.
fn is_current_schema(value: &Value) -> bool {
    value.get("maps").is_some() && value.get("currentMapId").is_some()
}

/// A legacy document is a non-empty flat mapping of pin id to pin where
/// every value carries `x` and `y` fields; there is no map wrapper.
fn is_legacy_collection(value: &Value) -> bool {
    match value.as_object() {
        Some(entries) if !entries.is_empty() => entries
            .values()
            .all(|pin| pin.get("x").is_some() && pin.get("y").is_some()),
        _ => false,
    }
}

/// Wrap a legacy flat pin collection as the single map under the default map
/// id, absorbing the separately-stored legacy background if present.
pub fn wrap_legacy(pins: BTreeMap<String, Pin>, background: Option<String>) -> World {
    let mut map = Map::named("地图");
    map.background = background;
    map.pins = pins;
    let mut maps = BTreeMap::new();
    maps.insert(DEFAULT_MAP_ID.to_string(), map);
    World {
        current_map_id: DEFAULT_MAP_ID.to_string(),
        maps,
        history: Vec::new(),
    }
}

fn parse_legacy_pins(value: Value) -> Option<BTreeMap<String, Pin>> {
    match serde_json::from_value::<BTreeMap<String, Pin>>(value) {
        Ok(pins) => Some(pins),
        Err(err) => {
            warn!("legacy pin collection failed to parse: {err}");
            None
        }
    }
}

/// Fetch a raw document, treating corrupt bytes as absent on the load path.
async fn get_raw_lenient(store: &KvStore, key: &str) -> Result<Option<Value>, AtlasError> {
    match store.get_raw(key).await {
        Ok(value) => Ok(value),
        Err(AtlasError::Format(err)) => {
            warn!("stored value under '{key}' is corrupt, treating as absent: {err}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

async fn probe_current(store: &KvStore) -> Result<Probe, AtlasError> {
    let Some(value) = get_raw_lenient(store, WORLD_KEY).await? else {
        return Ok(Probe::NotFound);
    };
    if !is_current_schema(&value) {
        warn!("document under '{WORLD_KEY}' lacks maps/currentMapId, treating as absent");
        return Ok(Probe::NotFound);
    }
    match serde_json::from_value::<World>(value) {
        Ok(world) => Ok(Probe::Found(world)),
        Err(err) => {
            warn!("stored world failed to parse, treating as absent: {err}");
            Ok(Probe::NotFound)
        }
    }
}

async fn probe_legacy_primary(store: &KvStore) -> Result<Probe, AtlasError> {
    let Some(value) = get_raw_lenient(store, LEGACY_PINS_KEY).await? else {
        return Ok(Probe::NotFound);
    };
    if !is_legacy_collection(&value) {
        return Ok(Probe::NotFound);
    }
    let Some(pins) = parse_legacy_pins(value) else {
        return Ok(Probe::NotFound);
    };
    let background = match get_raw_lenient(store, LEGACY_BG_KEY).await? {
        Some(Value::String(blob)) => Some(blob),
        _ => None,
    };
    Ok(Probe::Found(wrap_legacy(pins, background)))
}

fn probe_legacy_fallback(legacy: &LegacyStore) -> Probe {
    let Some(text) = legacy.get(LEGACY_PINS_KEY) else {
        return Probe::NotFound;
    };
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(err) => {
            warn!("legacy fallback pin collection is unparsable: {err}");
            return Probe::NotFound;
        }
    };
    if !is_legacy_collection(&value) {
        return Probe::NotFound;
    }
    let Some(pins) = parse_legacy_pins(value) else {
        return Probe::NotFound;
    };
    // The fallback backend stored the background blob as a raw string.
    let background = legacy.get(LEGACY_BG_KEY).map(str::to_string);
    Probe::Found(wrap_legacy(pins, background))
}

/// Guarantee the post-condition of every load path: `maps` non-empty and
/// `currentMapId` resolving to an existing map.
fn normalize(world: &mut World) {
    if world.maps.is_empty() {
        warn!("loaded world has no maps, reseeding starter maps");
        *world = default_world();
        return;
    }
    if world.ensure_current_resolves() {
        warn!(
            "currentMapId did not resolve, falling back to '{}'",
            world.current_map_id
        );
    }
}

/// Load the world, migrating legacy data or synthesizing defaults as needed.
/// Whichever path was taken, the result is persisted under the primary key
/// when it did not come from there verbatim.
pub async fn load_world(store: &KvStore, legacy: &LegacyStore) -> Result<World, AtlasError> {
    if let Probe::Found(mut world) = probe_current(store).await? {
        let repaired = {
            let before = world.clone();
            normalize(&mut world);
            world != before
        };
        if repaired {
            store.set_item(WORLD_KEY, &world).await?;
        }
        return Ok(world);
    }

    let mut world = if let Probe::Found(world) = probe_legacy_primary(store).await? {
        info!("migrated legacy pin collection from primary backend");
        world
    } else if let Probe::Found(world) = probe_legacy_fallback(legacy) {
        info!("migrated legacy pin collection from fallback backend");
        world
    } else {
        info!("no stored world found, synthesizing starter world");
        default_world()
    };

    normalize(&mut world);
    store.set_item(WORLD_KEY, &world).await?;
    Ok(world)
}

/// Classify an arbitrary import document: current schema is taken as-is,
/// a legacy flat collection is wrapped exactly like the load-path migration,
/// anything else is rejected with a descriptive format error.
pub fn classify_document(text: &str) -> Result<World, AtlasError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| AtlasError::Format(format!("document is not valid JSON: {err}")))?;

    if is_current_schema(&value) {
        let mut world: World = serde_json::from_value(value)
            .map_err(|err| AtlasError::Format(format!("world document failed to parse: {err}")))?;
        if world.maps.is_empty() {
            return Err(AtlasError::Format(
                "world document contains no maps".to_string(),
            ));
        }
        world.ensure_current_resolves();
        return Ok(world);
    }

    if is_legacy_collection(&value) {
        let pins = serde_json::from_value::<BTreeMap<String, Pin>>(value).map_err(|err| {
            AtlasError::Format(format!("legacy pin collection failed to parse: {err}"))
        })?;
        return Ok(wrap_legacy(pins, None));
    }

    Err(AtlasError::Format(
        "unrecognized document: expected a world with maps/currentMapId or a flat pin collection"
            .to_string(),
    ))
}
