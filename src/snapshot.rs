use crate::geometry::point::Point2;
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// Stable identity of a unit or a resource deposit for the duration of a game.
#[derive(
    Copy, Clone, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct UnitTag(pub u64);

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct UnitTypeId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Alliance {
    Own,
    Enemy,
    Neutral,
}

/// Coarse unit classification. Deriving it from raw type ids is the backend
/// adapter's job; the core only consumes the result.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum UnitClass {
    TownHall,
    GasBuilding,
    Worker,
    OtherStructure,
    Other,
}

/// What a worker is currently doing, as reported by its order queue.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum WorkerActivity {
    Idle,
    Gathering,
    Returning,
    Other,
}

#[derive(Clone, Debug, Constructor, Serialize, Deserialize)]
pub struct Unit {
    pub tag: UnitTag,
    pub unit_type: UnitTypeId,
    pub class: UnitClass,
    pub alliance: Alliance,
    pub pos: Point2,
    pub radius: f32,
    /// Construction progress in `0.0..=1.0`. `1.0` for finished structures.
    pub build_progress: f32,
    /// Total construction time of this structure type, in steps.
    pub build_time: f32,
    pub movement_speed: f32,
    pub is_carrying_resources: bool,
    pub activity: WorkerActivity,
}

impl Unit {
    pub fn is_structure(&self) -> bool {
        matches!(
            self.class,
            UnitClass::TownHall | UnitClass::GasBuilding | UnitClass::OtherStructure
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ResourceKind {
    Mineral {
        /// The depleted patch variant that holds less and sorts after full
        /// patches for assignment purposes.
        small: bool,
    },
    Vespene,
}

#[derive(Clone, Debug, Constructor, Serialize, Deserialize)]
pub struct ResourceDeposit {
    pub tag: UnitTag,
    pub kind: ResourceKind,
    pub pos: Point2,
    pub remaining: u32,
    /// Whether the deposit is currently visible as opposed to remembered from
    /// an earlier observation.
    pub observed: bool,
}

impl ResourceDeposit {
    pub fn is_mineral(&self) -> bool {
        matches!(self.kind, ResourceKind::Mineral { .. })
    }

    pub fn is_vespene(&self) -> bool {
        self.kind == ResourceKind::Vespene
    }

    pub fn is_small(&self) -> bool {
        matches!(self.kind, ResourceKind::Mineral { small: true })
    }
}

/// An immutable per-step observation of the game. The core never reaches out
/// to the backend for unit data; everything it learns per step comes in here.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub step: u32,
    pub units: Vec<Unit>,
    pub resources: Vec<ResourceDeposit>,
}

impl Snapshot {
    pub fn new(step: u32) -> Self {
        Snapshot {
            step,
            units: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Serializes the observation for external inspection tooling.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}
