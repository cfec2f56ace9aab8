//! Authoritative tower state management utilities.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use hashguard_core::{
    Ability, EnemyId, ProtocolDefinition, ProtocolId, Rarity, SlotId, TowerCooldownSnapshot,
    TowerId, TowerSnapshot, TowerStats,
};
use serde::{Deserialize, Serialize};

/// Tower stored inside the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Protocol the tower was built from.
    pub(crate) protocol: ProtocolId,
    /// Slot occupied by the tower.
    pub(crate) slot: SlotId,
    /// Game-space position copied from the slot.
    pub(crate) position: Vec2,
    /// Upgrade level, starting at one.
    pub(crate) level: u32,
    /// Rarity inherited from the protocol.
    pub(crate) rarity: Rarity,
    /// Level-scaled statistics.
    pub(crate) stats: TowerStats,
    /// Ability inherited from the protocol.
    pub(crate) ability: Option<Ability>,
    /// Time remaining until the tower may fire again.
    pub(crate) ready_in: Duration,
    /// Enemy currently tracked, if any.
    pub(crate) target: Option<EnemyId>,
    /// Hash spent on placement and upgrades.
    pub(crate) invested: u64,
}

impl TowerState {
    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            protocol: self.protocol.clone(),
            slot: self.slot,
            position: self.position,
            level: self.level,
            rarity: self.rarity,
            stats: self.stats,
            ready_in: self.ready_in,
            target: self.target,
            ability: self.ability,
        }
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

/// Placement details for a new tower.
#[derive(Clone, Debug)]
pub(crate) struct TowerSeed<'a> {
    pub(crate) protocol: &'a ProtocolDefinition,
    pub(crate) slot: SlotId,
    pub(crate) position: Vec2,
    pub(crate) level: u32,
    pub(crate) stats: TowerStats,
    pub(crate) cost: u64,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Rebuilds a registry from captured towers.
    pub(crate) fn from_parts(towers: Vec<TowerState>, next_tower_id: TowerId) -> Self {
        let entries: BTreeMap<TowerId, TowerState> =
            towers.into_iter().map(|tower| (tower.id, tower)).collect();
        let floor = entries
            .keys()
            .next_back()
            .map_or(0, |id| id.get().saturating_add(1));
        Self {
            entries,
            next_tower_id: TowerId::new(next_tower_id.get().max(floor)),
        }
    }

    pub(crate) fn next_id(&self) -> TowerId {
        self.next_tower_id
    }

    /// Inserts a freshly placed tower and returns its identifier.
    pub(crate) fn insert(&mut self, seed: TowerSeed<'_>) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().saturating_add(1));
        let previous = self.entries.insert(
            id,
            TowerState {
                id,
                protocol: seed.protocol.id.clone(),
                slot: seed.slot,
                position: seed.position,
                level: seed.level,
                rarity: seed.protocol.rarity,
                stats: seed.stats,
                ability: seed.protocol.ability,
                ready_in: Duration::ZERO,
                target: None,
                invested: seed.cost,
            },
        );
        debug_assert!(previous.is_none(), "tower identifiers are never reused");
        id
    }

    pub(crate) fn remove(&mut self, id: TowerId) -> Option<TowerState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    /// Sum of the power drawn by every tower.
    pub(crate) fn total_draw(&self) -> u32 {
        self.entries
            .values()
            .fold(0u32, |total, tower| total.saturating_add(tower.stats.power_draw))
    }

    /// Clears every reference to an enemy that left the board.
    pub(crate) fn forget_target(&mut self, enemy: EnemyId) {
        for tower in self.entries.values_mut() {
            if tower.target == Some(enemy) {
                tower.target = None;
            }
        }
    }

    pub(crate) fn cooldowns(&self) -> Vec<TowerCooldownSnapshot> {
        self.entries
            .values()
            .map(|tower| TowerCooldownSnapshot {
                tower: tower.id,
                ready_in: tower.ready_in,
                fire_interval: tower.stats.fire_interval(),
                target: tower.target,
            })
            .collect()
    }
}
