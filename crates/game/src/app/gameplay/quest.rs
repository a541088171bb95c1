use engine::{Aabb, DeliveryPointDef, PlacementDef};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Collectible {
    pub(crate) name: String,
    pub(crate) area: Aabb,
    collected: bool,
}

impl Collectible {
    pub(crate) fn new(name: impl Into<String>, area: Aabb) -> Self {
        Self {
            name: name.into(),
            area,
            collected: false,
        }
    }

    pub(crate) fn from_def(def: &PlacementDef) -> Self {
        Self::new(def.name.clone(), def.area)
    }

    pub(crate) fn is_collected(&self) -> bool {
        self.collected
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DeliveryPoint {
    pub(crate) name: String,
    pub(crate) area: Aabb,
    pub(crate) required_items: u32,
    delivered: bool,
}

impl DeliveryPoint {
    pub(crate) fn new(name: impl Into<String>, area: Aabb, required_items: u32) -> Self {
        Self {
            name: name.into(),
            area,
            required_items,
            delivered: false,
        }
    }

    pub(crate) fn from_def(def: &DeliveryPointDef) -> Self {
        Self::new(def.name.clone(), def.area, def.required_items)
    }

    pub(crate) fn is_delivered(&self) -> bool {
        self.delivered
    }
}

/// Items picked up but not yet handed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Inventory {
    held: u32,
}

impl Inventory {
    pub(crate) fn held(&self) -> u32 {
        self.held
    }

    fn add_one(&mut self) {
        self.held = self.held.saturating_add(1);
    }

    fn take(&mut self, count: u32) {
        self.held = self.held.saturating_sub(count);
    }
}

/// What a drop point asks of the carried inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DeliveryPolicy {
    /// The goose must carry `required_items` to hand anything in.
    #[default]
    RequireHeldItem,
    /// Touching a drop point is enough, carried or not.
    Unchecked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct QuestReport {
    pub(crate) collected: Vec<usize>,
    pub(crate) delivered: Vec<usize>,
}

impl QuestReport {
    pub(crate) fn is_empty(&self) -> bool {
        self.collected.is_empty() && self.delivered.is_empty()
    }
}

/// One-shot collect and deliver reducers. Holds no entities; the level passes
/// its own flags in on every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct QuestTracker {
    policy: DeliveryPolicy,
}

impl QuestTracker {
    pub(crate) fn new(policy: DeliveryPolicy) -> Self {
        Self { policy }
    }

    pub(crate) fn try_collect(
        &self,
        actor_box: &Aabb,
        collectible: &mut Collectible,
        inventory: &mut Inventory,
    ) -> bool {
        if collectible.collected || !actor_box.intersects(&collectible.area) {
            return false;
        }
        collectible.collected = true;
        inventory.add_one();
        true
    }

    pub(crate) fn try_deliver(
        &self,
        actor_box: &Aabb,
        point: &mut DeliveryPoint,
        inventory: &mut Inventory,
    ) -> bool {
        if point.delivered || !actor_box.intersects(&point.area) {
            return false;
        }
        if self.policy == DeliveryPolicy::RequireHeldItem && inventory.held() < point.required_items
        {
            debug!(
                point = %point.name,
                held = inventory.held(),
                required = point.required_items,
                "delivery_rejected_empty_inventory"
            );
            return false;
        }
        point.delivered = true;
        inventory.take(point.required_items);
        true
    }

    pub(crate) fn is_complete(collectibles: &[Collectible], points: &[DeliveryPoint]) -> bool {
        collectibles.iter().all(Collectible::is_collected)
            && points.iter().all(DeliveryPoint::is_delivered)
    }

    /// Runs every pending collectible, then every pending drop point, against
    /// the actor box for this tick.
    pub(crate) fn update(
        &self,
        actor_box: &Aabb,
        collectibles: &mut [Collectible],
        points: &mut [DeliveryPoint],
        inventory: &mut Inventory,
    ) -> QuestReport {
        let mut report = QuestReport::default();

        for (idx, collectible) in collectibles.iter_mut().enumerate() {
            if collectible.collected {
                continue;
            }
            if self.try_collect(actor_box, collectible, inventory) {
                info!(
                    item = %collectible.name,
                    held = inventory.held(),
                    "item_collected"
                );
                report.collected.push(idx);
            }
        }

        for (idx, point) in points.iter_mut().enumerate() {
            if point.delivered {
                continue;
            }
            if self.try_deliver(actor_box, point, inventory) {
                info!(
                    point = %point.name,
                    held = inventory.held(),
                    "item_delivered"
                );
                report.delivered.push(idx);
            }
        }

        report
    }
}
