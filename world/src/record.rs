//! Settled world contents captured between ticks.

use std::collections::BTreeSet;

use hashguard_core::{EnemyId, ProjectileId, SessionSetup, SetupError, TowerId};
use hashguard_system_boss::{BossEncounter, EncounterState};
use hashguard_system_economy::{Ledger, LedgerState};
use serde::{Deserialize, Serialize};

use crate::{
    enemies::{EnemyRegistry, EnemyState},
    projectiles::ProjectileRegistry,
    sectors::Progression,
    towers::{TowerRegistry, TowerState},
    World,
};

/// Serialisable contents of a world between ticks.
///
/// Towers, slots, enemies, resources and the boss sub-state are kept.
/// Projectiles in flight are dropped; their identifier counter is kept so
/// resumed sessions never reuse an identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldRecord {
    ledger: LedgerState,
    towers: Vec<TowerState>,
    next_tower_id: TowerId,
    enemies: Vec<EnemyState>,
    next_enemy_id: EnemyId,
    next_projectile_id: ProjectileId,
    progression: Progression,
    encounter: EncounterState,
    paused: bool,
    tick_index: u64,
}

impl WorldRecord {
    /// Number of ticks the world had processed when captured.
    #[must_use]
    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    /// Hash balance at capture time.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.ledger.hash
    }
}

impl World {
    /// Captures the settled world contents.
    #[must_use]
    pub fn record(&self) -> WorldRecord {
        WorldRecord {
            ledger: self.ledger.state().clone(),
            towers: self.towers.iter().cloned().collect(),
            next_tower_id: self.towers.next_id(),
            enemies: self.enemies.iter().cloned().collect(),
            next_enemy_id: self.enemies.next_id(),
            next_projectile_id: self.projectiles.next_id(),
            progression: self.progression.clone(),
            encounter: self.boss.state().clone(),
            paused: self.paused,
            tick_index: self.tick_index,
        }
    }

    /// Rebuilds a world from a record captured against the same setup.
    ///
    /// The record is checked against the setup's map and roster; references
    /// that no longer resolve are reported as [`SetupError::RecordMismatch`].
    pub fn restore(setup: &SessionSetup, record: WorldRecord) -> Result<Self, SetupError> {
        setup.validate()?;
        let mut world = Self::assemble(
            setup,
            Ledger::new(record.ledger, &setup.balance),
            record.progression,
            BossEncounter::restore(record.encounter, setup.balance.boss),
        );

        let mut seen_slots = BTreeSet::new();
        for tower in &record.towers {
            if !world.roster.contains_key(&tower.protocol) {
                return Err(mismatch(format!(
                    "tower {} uses unknown protocol {}",
                    tower.id.get(),
                    tower.protocol
                )));
            }
            let Some(slot) = world.slots.get_mut(&tower.slot) else {
                return Err(mismatch(format!(
                    "tower {} stands on unknown slot {}",
                    tower.id.get(),
                    tower.slot.get()
                )));
            };
            if !seen_slots.insert(tower.slot) {
                return Err(mismatch(format!(
                    "slot {} holds more than one tower",
                    tower.slot.get()
                )));
            }
            slot.occupant = Some(tower.id);
        }

        for enemy in &record.enemies {
            if !world.lanes.contains_key(&enemy.lane) {
                return Err(mismatch(format!(
                    "enemy {} walks unknown lane {}",
                    enemy.id.get(),
                    enemy.lane.get()
                )));
            }
        }

        if let Some(boss) = world.boss.phase().enemy() {
            let present = record
                .enemies
                .iter()
                .any(|enemy| enemy.id == boss && enemy.boss);
            if !present {
                return Err(mismatch(format!(
                    "active boss {} has no enemy record",
                    boss.get()
                )));
            }
        }
        if let Some(sector) = world.boss.phase().sector() {
            if world.map.sector(sector).is_none() {
                return Err(mismatch(format!("boss belongs to unknown sector {sector}")));
            }
        }

        world.towers = TowerRegistry::from_parts(record.towers, record.next_tower_id);
        world.enemies = EnemyRegistry::from_parts(record.enemies, record.next_enemy_id);
        world.projectiles = ProjectileRegistry::new(record.next_projectile_id);
        world.paused = record.paused;
        world.tick_index = record.tick_index;

        let mut ignored = Vec::new();
        world
            .ledger
            .recompute_power(world.towers.total_draw(), &mut ignored);
        Ok(world)
    }
}

fn mismatch(reason: String) -> SetupError {
    SetupError::RecordMismatch { reason }
}
