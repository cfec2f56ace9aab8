//! Sector progression and tower slot ownership.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use hashguard_core::{
    LaneId, MapDefinition, PlayerProfile, ProtocolId, SectorId, SlotId, SlotSnapshot, TowerId,
};
use hashguard_system_placement::check_prerequisites;
use serde::{Deserialize, Serialize};

/// Unlock, payment and boss progress of the session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Progression {
    pub(crate) unlocked: BTreeSet<SectorId>,
    pub(crate) defeated: BTreeSet<SectorId>,
    pub(crate) payments: BTreeMap<SectorId, u64>,
    pub(crate) compiled: BTreeMap<ProtocolId, u32>,
}

impl Progression {
    /// Progress carried in by the profile.
    ///
    /// Sectors that cost nothing and have no requirements start unlocked, as
    /// do sectors the profile already paid in full once their requirements
    /// hold.
    pub(crate) fn from_profile(profile: &PlayerProfile, map: &MapDefinition) -> Self {
        let mut unlocked = profile.unlocked_sectors.clone();
        for sector in &map.sectors {
            if sector.unlock_cost == 0
                && sector.prerequisites.is_empty()
                && sector.required_protocols.is_empty()
            {
                let _ = unlocked.insert(sector.id.clone());
            }
        }

        let mut payments: BTreeMap<SectorId, u64> = profile
            .sector_payments
            .iter()
            .filter(|(sector, _)| !unlocked.contains(*sector))
            .map(|(sector, paid)| {
                let cap = map.sector(sector).map_or(0, |definition| definition.unlock_cost);
                (sector.clone(), (*paid).min(cap))
            })
            .filter(|(_, paid)| *paid > 0)
            .collect();

        // Map order is topological, so one pass settles chains of paid sectors.
        for sector in &map.sectors {
            let paid = payments.get(&sector.id).copied().unwrap_or(0);
            if paid == 0 || paid < sector.unlock_cost {
                continue;
            }
            if check_prerequisites(sector, &unlocked, &profile.compiled_protocols).is_ok() {
                let _ = payments.remove(&sector.id);
                let _ = unlocked.insert(sector.id.clone());
            }
        }

        Self {
            unlocked,
            defeated: profile.defeated_bosses.clone(),
            payments,
            compiled: profile.compiled_protocols.clone(),
        }
    }

    pub(crate) fn is_unlocked(&self, sector: &SectorId) -> bool {
        self.unlocked.contains(sector)
    }

    pub(crate) fn paid(&self, sector: &SectorId) -> u64 {
        self.payments.get(sector).copied().unwrap_or(0)
    }

    /// Marks a sector unlocked, returning the partial payments it held.
    pub(crate) fn unlock(&mut self, sector: &SectorId) -> u64 {
        let _ = self.unlocked.insert(sector.clone());
        self.payments.remove(sector).unwrap_or(0)
    }

    /// Lanes belonging to unlocked sectors in ascending lane order.
    pub(crate) fn open_lanes(&self, map: &MapDefinition) -> Vec<LaneId> {
        let lanes: BTreeSet<LaneId> = map
            .sectors
            .iter()
            .filter(|sector| self.unlocked.contains(&sector.id))
            .flat_map(|sector| sector.lanes.iter().copied())
            .collect();
        lanes.into_iter().collect()
    }
}

/// Tower slot stored inside the world.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SlotState {
    pub(crate) id: SlotId,
    pub(crate) position: Vec2,
    pub(crate) sector: SectorId,
    pub(crate) occupant: Option<TowerId>,
}

impl SlotState {
    pub(crate) fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            id: self.id,
            position: self.position,
            sector: self.sector.clone(),
            occupant: self.occupant,
        }
    }
}

pub(crate) fn slots_from_map(map: &MapDefinition) -> BTreeMap<SlotId, SlotState> {
    map.slots
        .iter()
        .map(|slot| {
            (
                slot.id,
                SlotState {
                    id: slot.id,
                    position: slot.position,
                    sector: slot.sector.clone(),
                    occupant: None,
                },
            )
        })
        .collect()
}
