#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure placement and sector gate rules.
//!
//! Slot snapping turns a game-space point into a concrete slot and the gate
//! rules decide whether a sector may be unlocked. Neither mutates anything:
//! the world runs these checks, then the economy checks, and only mutates
//! once every check passed.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use hashguard_core::{
    Camera, CommandError, MapDefinition, ProtocolId, SectorDefinition, SectorId, SlotSnapshot,
};

/// Snap radius for a camera and map scale.
///
/// Zooming out grows the radius so the same on-screen distance keeps
/// reaching the same slots.
#[must_use]
pub fn snap_radius(base_radius: f32, map_scale: f32, camera: &Camera) -> f32 {
    base_radius * map_scale.max(0.0) / camera.effective_zoom()
}

/// Finds the nearest unoccupied slot within `radius` of `point`.
///
/// Ties resolve toward the lowest slot id. When only occupied slots are in
/// range the nearest one is reported as [`CommandError::SlotOccupied`].
pub fn nearest_free_slot<'a>(
    point: Vec2,
    radius: f32,
    slots: impl IntoIterator<Item = &'a SlotSnapshot>,
) -> Result<&'a SlotSnapshot, CommandError> {
    let radius_sq = radius * radius;
    let mut free: Option<Candidate<'a>> = None;
    let mut occupied: Option<Candidate<'a>> = None;

    for slot in slots {
        let distance_sq = slot.position.distance_squared(point);
        if distance_sq > radius_sq {
            continue;
        }

        let current = Candidate { distance_sq, slot };
        let best = if slot.is_occupied() {
            &mut occupied
        } else {
            &mut free
        };
        let replace = match *best {
            Some(existing) => current.precedes(&existing),
            None => true,
        };
        if replace {
            *best = Some(current);
        }
    }

    match (free, occupied) {
        (Some(candidate), _) => Ok(candidate.slot),
        (None, Some(candidate)) => Err(CommandError::SlotOccupied {
            slot: candidate.slot.id,
        }),
        (None, None) => Err(CommandError::NoValidSlot),
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate<'a> {
    distance_sq: f32,
    slot: &'a SlotSnapshot,
}

impl Candidate<'_> {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_sq != other.distance_sq {
            return self.distance_sq < other.distance_sq;
        }
        self.slot.id < other.slot.id
    }
}

/// Checks the unlock prerequisites of a sector.
///
/// Cost is checked separately so callers can distinguish a locked gate from
/// an unaffordable one.
pub fn check_prerequisites(
    sector: &SectorDefinition,
    unlocked: &BTreeSet<SectorId>,
    compiled: &BTreeMap<ProtocolId, u32>,
) -> Result<(), CommandError> {
    if unlocked.contains(&sector.id) {
        return Err(CommandError::AlreadyUnlocked {
            sector: sector.id.clone(),
        });
    }

    let missing_sectors: Vec<SectorId> = sector
        .prerequisites
        .iter()
        .filter(|id| !unlocked.contains(*id))
        .cloned()
        .collect();
    let missing_protocols: Vec<ProtocolId> = sector
        .required_protocols
        .iter()
        .filter(|id| !compiled.contains_key(*id))
        .cloned()
        .collect();

    if missing_sectors.is_empty() && missing_protocols.is_empty() {
        Ok(())
    } else {
        Err(CommandError::SectorLocked {
            missing_sectors,
            missing_protocols,
        })
    }
}

/// Hash still owed for a sector after earlier partial payments.
#[must_use]
pub fn remaining_cost(sector: &SectorDefinition, paid: u64) -> u64 {
    sector.unlock_cost.saturating_sub(paid)
}

/// Effect of a partial payment toward a sector unlock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentPlan {
    /// Hash taken from the balance.
    pub applied: u64,
    /// Total paid after the payment.
    pub paid: u64,
    /// Whether the payment reaches the unlock cost.
    pub completes: bool,
}

/// Plans a partial payment, clamping the offer to the remaining cost.
#[must_use]
pub fn plan_payment(sector: &SectorDefinition, paid: u64, offered: u64) -> PaymentPlan {
    let applied = offered.min(remaining_cost(sector, paid));
    let paid = paid + applied;
    PaymentPlan {
        applied,
        paid,
        completes: paid >= sector.unlock_cost,
    }
}

/// First locked sector, in map order, whose prerequisite sectors are unlocked.
///
/// This is the sector granted by a first boss kill; protocol requirements do
/// not apply to the grant.
#[must_use]
pub fn next_in_order<'a>(
    map: &'a MapDefinition,
    unlocked: &BTreeSet<SectorId>,
) -> Option<&'a SectorDefinition> {
    map.sectors.iter().find(|sector| {
        !unlocked.contains(&sector.id)
            && sector
                .prerequisites
                .iter()
                .all(|prerequisite| unlocked.contains(prerequisite))
    })
}
