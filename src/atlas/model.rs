//! The map graph model: owns the world aggregate and the persistence handle,
//! exposes navigation (switch/back) and pin/floor CRUD.
//!
//! Every mutation is write-through: the world is cloned before the change,
//! persisted after it, and rolled back to the clone if the write fails, so a
//! storage failure never leaves a silent partial commit. Mutators return a
//! [`Refresh`] hint telling the (external) view layer what to redraw.

use log::{info, warn};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::atlas::errors::AtlasError;
use crate::atlas::migrate::{self, WORLD_KEY};
use crate::atlas::store::{KvStore, LegacyStore};
use crate::atlas::types::{default_world, Floor, Map, Pin, PinKind, World};

/// Blocking yes/no confirmation primitive for destructive operations,
/// supplied by the embedding layer.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirmation that always answers yes. Used by scripted callers and tests.
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// What the view layer needs to redraw after a mutation.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// No visual identity changed.
    None,
    /// Pin labels/identities on the current map changed.
    Pins,
    /// The visible map itself changed (navigation, background, import).
    MapView,
}

/// Outcome of a back-navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackOutcome {
    Moved { to: String },
    /// The history stack was empty; nothing happened.
    EmptyHistory,
    /// The popped map no longer exists. The whole stack was cleared rather
    /// than attempting partial repair; the caller should notify the user.
    StaleEntry,
}

/// Mutable pin fields addressable by the edit surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinField {
    Name,
    Desc,
    X,
    Y,
    Color,
    Kind,
    Image,
    InternalImage,
    TargetMapId,
}

/// Mutable floor fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorField {
    Name,
    Content,
}

/// Creation parameters for a new pin. A missing id gets a generated UUID.
#[derive(Debug, Clone)]
pub struct NewPin {
    pub id: Option<String>,
    pub name: String,
    pub x: String,
    pub y: String,
    pub desc: String,
    pub kind: PinKind,
    pub color: String,
    pub target_map_id: Option<String>,
}

impl Default for NewPin {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            x: "50%".to_string(),
            y: "50%".to_string(),
            desc: String::new(),
            kind: PinKind::Simple,
            color: String::new(),
            target_map_id: None,
        }
    }
}

/// Owned model instance with an explicit lifecycle: constructed when the
/// embedding panel opens, dropped when it closes. Single active driver;
/// overlapping mutations are last-write-wins by design.
pub struct AtlasModel {
    store: KvStore,
    world: World,
}

impl AtlasModel {
    /// Open the store, run migration, and build the model around the result.
    pub async fn load(store: KvStore, legacy: &LegacyStore) -> Result<Self, AtlasError> {
        store.open().await?;
        let world = migrate::load_world(&store, legacy).await?;
        Ok(Self { store, world })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// The map `current_map_id` points at. The resolve invariant is re-checked
    /// after every mutation, so this cannot miss.
    pub fn current_map(&self) -> &Map {
        &self.world.maps[&self.world.current_map_id]
    }

    /// Explicit query for the current map's pins (no implicit accessors).
    pub fn current_pins(&self) -> &BTreeMap<String, Pin> {
        &self.current_map().pins
    }

    pub fn pin(&self, id: &str) -> Option<&Pin> {
        self.current_map().pins.get(id)
    }

    fn current_map_mut(&mut self) -> &mut Map {
        let id = self.world.current_map_id.clone();
        self.world.maps.get_mut(&id).expect("current map resolves")
    }

    /// Persist the mutated world; restore `prior` if the write fails. Also
    /// re-validates the `current_map_id`-resolves invariant before returning.
    async fn commit(&mut self, prior: World) -> Result<(), AtlasError> {
        if self.world.ensure_current_resolves() {
            warn!(
                "current map id did not resolve after mutation, repaired to '{}'",
                self.world.current_map_id
            );
        }
        if let Err(err) = self.store.set_item(WORLD_KEY, &self.world).await {
            self.world = prior;
            return Err(err);
        }
        Ok(())
    }

    /// Navigate to `target`, lazily creating an empty map if it is unknown so
    /// dangling portal references never hard-fail. Pushes the prior current
    /// map onto the history stack. Self-loop portals are legal and simply
    /// re-enter the same map.
    pub async fn switch_map(&mut self, target: &str) -> Result<Refresh, AtlasError> {
        let prior = self.world.clone();
        if !self.world.maps.contains_key(target) {
            info!("map '{target}' does not exist yet, creating it");
            self.world
                .maps
                .insert(target.to_string(), Map::named(target));
        }
        let from = std::mem::replace(&mut self.world.current_map_id, target.to_string());
        self.world.history.push(from);
        self.commit(prior).await?;
        Ok(Refresh::MapView)
    }

    /// Pop the history stack and return to the recorded map. A stale entry
    /// (map deleted since it was pushed) clears the entire stack.
    pub async fn go_back(&mut self) -> Result<BackOutcome, AtlasError> {
        let prior = self.world.clone();
        let Some(prev) = self.world.history.pop() else {
            return Ok(BackOutcome::EmptyHistory);
        };
        if !self.world.maps.contains_key(&prev) {
            warn!("history entry '{prev}' no longer exists, clearing history stack");
            self.world.history.clear();
            return Ok(BackOutcome::StaleEntry);
        }
        self.world.current_map_id = prev.clone();
        self.commit(prior).await?;
        Ok(BackOutcome::Moved { to: prev })
    }

    /// Add a pin to the current map. Duplicate ids within the map are
    /// rejected. A portal created without a target stays inert until one is
    /// configured.
    pub async fn add_pin(&mut self, new: NewPin) -> Result<Refresh, AtlasError> {
        let id = new
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.current_map().pins.contains_key(&id) {
            return Err(AtlasError::InvalidInput(format!(
                "pin id '{id}' already exists on this map"
            )));
        }
        if new.kind == PinKind::Portal && new.target_map_id.is_none() {
            warn!("portal pin '{id}' created without a target map");
        }
        let prior = self.world.clone();
        let pin = Pin {
            id: id.clone(),
            name: new.name,
            x: new.x,
            y: new.y,
            desc: new.desc,
            kind: new.kind,
            color: new.color,
            image: None,
            internal_image: None,
            floors: Vec::new(),
            target_map_id: new.target_map_id,
        };
        self.current_map_mut().pins.insert(id, pin);
        self.commit(prior).await?;
        Ok(Refresh::Pins)
    }

    /// Delete a pin from the current map after confirmation.
    pub async fn delete_pin(
        &mut self,
        id: &str,
        confirm: &dyn Confirm,
    ) -> Result<Refresh, AtlasError> {
        let name = self
            .pin(id)
            .map(|p| p.name.clone())
            .ok_or_else(|| AtlasError::NotFound(format!("pin: {id}")))?;
        if !confirm.confirm(&format!("删除地点 \"{name}\" 吗？")) {
            return Err(AtlasError::Cancelled);
        }
        let prior = self.world.clone();
        self.current_map_mut().pins.remove(id);
        self.commit(prior).await?;
        Ok(Refresh::Pins)
    }

    /// Update one field of a pin on the current map. Name and type changes
    /// alter the pin's visual identity and request a pin refresh; other
    /// fields do not.
    pub async fn update_pin_field(
        &mut self,
        id: &str,
        field: PinField,
        value: &str,
    ) -> Result<Refresh, AtlasError> {
        let prior = self.world.clone();
        let pin = self
            .current_map_mut()
            .pins
            .get_mut(id)
            .ok_or_else(|| AtlasError::NotFound(format!("pin: {id}")))?;
        match field {
            PinField::Name => pin.name = value.to_string(),
            PinField::Desc => pin.desc = value.to_string(),
            PinField::X => pin.x = value.to_string(),
            PinField::Y => pin.y = value.to_string(),
            PinField::Color => pin.color = value.to_string(),
            PinField::Kind => {
                // Parse before assigning so a bad value leaves the pin untouched.
                pin.kind = value.parse::<PinKind>()?;
                if pin.kind == PinKind::Portal && pin.target_map_id.is_none() {
                    warn!("pin '{id}' became a portal with no target map");
                }
            }
            PinField::Image => pin.image = non_empty(value),
            PinField::InternalImage => pin.internal_image = non_empty(value),
            PinField::TargetMapId => pin.target_map_id = non_empty(value),
        }
        self.commit(prior).await?;
        Ok(match field {
            PinField::Name | PinField::Kind => Refresh::Pins,
            _ => Refresh::None,
        })
    }

    /// Append a floor to a pin. A pin that gains a floor becomes a complex
    /// pin whatever its previous type, matching the edit surface's behavior.
    pub async fn add_floor(&mut self, pin_id: &str) -> Result<Refresh, AtlasError> {
        let prior = self.world.clone();
        let pin = self
            .current_map_mut()
            .pins
            .get_mut(pin_id)
            .ok_or_else(|| AtlasError::NotFound(format!("pin: {pin_id}")))?;
        pin.floors.push(Floor {
            name: format!("新区域 {}", pin.floors.len() + 1),
            content: "在这里输入描述...".to_string(),
            sub_items: Vec::new(),
        });
        let promoted = pin.kind != PinKind::Complex;
        if promoted {
            pin.kind = PinKind::Complex;
        }
        self.commit(prior).await?;
        Ok(if promoted { Refresh::Pins } else { Refresh::None })
    }

    /// Remove one floor by index after confirmation.
    pub async fn delete_floor(
        &mut self,
        pin_id: &str,
        index: usize,
        confirm: &dyn Confirm,
    ) -> Result<Refresh, AtlasError> {
        let floor_name = self
            .pin(pin_id)
            .ok_or_else(|| AtlasError::NotFound(format!("pin: {pin_id}")))?
            .floors
            .get(index)
            .map(|f| f.name.clone())
            .ok_or_else(|| AtlasError::NotFound(format!("floor {index} of pin {pin_id}")))?;
        if !confirm.confirm(&format!("删除楼层 \"{floor_name}\" 吗？")) {
            return Err(AtlasError::Cancelled);
        }
        let prior = self.world.clone();
        if let Some(pin) = self.current_map_mut().pins.get_mut(pin_id) {
            pin.floors.remove(index);
        }
        self.commit(prior).await?;
        Ok(Refresh::None)
    }

    /// Update one field of a floor.
    pub async fn update_floor(
        &mut self,
        pin_id: &str,
        index: usize,
        field: FloorField,
        value: &str,
    ) -> Result<Refresh, AtlasError> {
        let prior = self.world.clone();
        let floor = self
            .current_map_mut()
            .pins
            .get_mut(pin_id)
            .ok_or_else(|| AtlasError::NotFound(format!("pin: {pin_id}")))?
            .floors
            .get_mut(index)
            .ok_or_else(|| AtlasError::NotFound(format!("floor {index} of pin {pin_id}")))?;
        match field {
            FloorField::Name => floor.name = value.to_string(),
            FloorField::Content => floor.content = value.to_string(),
        }
        self.commit(prior).await?;
        Ok(Refresh::None)
    }

    /// Set or clear the background of the current map only.
    pub async fn change_background(
        &mut self,
        blob_ref: Option<String>,
    ) -> Result<Refresh, AtlasError> {
        let prior = self.world.clone();
        self.current_map_mut().background = blob_ref;
        self.commit(prior).await?;
        Ok(Refresh::MapView)
    }

    /// Replace the live world wholesale with the starter world.
    pub async fn reset_to_defaults(
        &mut self,
        confirm: &dyn Confirm,
    ) -> Result<Refresh, AtlasError> {
        if !confirm.confirm("确定要重置所有地图数据吗？所有自定义名称、图片和楼层都将丢失。") {
            return Err(AtlasError::Cancelled);
        }
        let prior = self.world.clone();
        self.world = default_world();
        self.commit(prior).await?;
        Ok(Refresh::MapView)
    }

    /// Replace the live world with an already-classified import. The caller
    /// is responsible for the destructive-action confirmation.
    pub async fn replace_world(&mut self, world: World) -> Result<Refresh, AtlasError> {
        let prior = self.world.clone();
        self.world = world;
        self.world.history.clear();
        self.commit(prior).await?;
        Ok(Refresh::MapView)
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
