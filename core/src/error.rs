use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{LaneId, ProtocolId, SectorId, SlotId};

/// Reasons a [`crate::PlayerCommand`] was rejected.
///
/// A rejected command never mutates the session.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CommandError {
    /// The hash balance does not cover the cost.
    #[error("insufficient hash: {required} required, {available} available")]
    InsufficientCurrency {
        /// Hash needed by the command.
        required: u64,
        /// Hash currently held.
        available: u64,
    },
    /// The power grid cannot supply the extra draw.
    #[error("insufficient power: {required} required, {available} available")]
    InsufficientPower {
        /// Extra power the command would draw.
        required: u32,
        /// Spare power capacity.
        available: u32,
    },
    /// No slot accepts the placement.
    #[error("no valid slot for placement")]
    NoValidSlot,
    /// The targeted slot already holds a tower.
    #[error("slot {} is occupied", slot.get())]
    SlotOccupied {
        /// Slot that rejected the placement.
        slot: SlotId,
    },
    /// Unlock requirements are not met.
    #[error("sector is locked (missing sectors: {missing_sectors:?}, missing protocols: {missing_protocols:?})")]
    SectorLocked {
        /// Prerequisite sectors still locked.
        missing_sectors: Vec<SectorId>,
        /// Required protocols not yet compiled.
        missing_protocols: Vec<ProtocolId>,
    },
    /// The sector is already unlocked.
    #[error("sector {sector} is already unlocked")]
    AlreadyUnlocked {
        /// Sector named by the command.
        sector: SectorId,
    },
    /// The engaged boss was already defeated.
    #[error("boss of sector {sector} is already defeated")]
    AlreadyDefeated {
        /// Sector whose boss fell.
        sector: SectorId,
    },
    /// The protocol is not part of the roster.
    #[error("unknown protocol {protocol}")]
    UnknownProtocol {
        /// Protocol named by the command.
        protocol: ProtocolId,
    },
    /// The player has not compiled the protocol.
    #[error("protocol {protocol} is not compiled")]
    ProtocolNotCompiled {
        /// Protocol named by the command.
        protocol: ProtocolId,
    },
    /// No tower carries the identifier.
    #[error("unknown tower")]
    UnknownTower,
    /// The sector is not part of the map.
    #[error("unknown sector {sector}")]
    UnknownSector {
        /// Sector named by the command.
        sector: SectorId,
    },
    /// The tower reached its maximum level.
    #[error("tower is at maximum level {level}")]
    MaxLevel {
        /// Level the tower is at.
        level: u32,
    },
    /// No boss is on the board.
    #[error("no boss is active")]
    NoActiveBoss,
    /// The boss is on the board but the alert has not been raised yet.
    #[error("boss has not been alerted yet")]
    BossNotAlerted,
    /// The boss is not engaged.
    #[error("no boss encounter is running")]
    NoBossEngaged,
    /// An encounter with the boss is already running.
    #[error("boss encounter is already running")]
    BossAlreadyEngaged,
    /// Efficiency does not need restoring.
    #[error("system is not frozen and efficiency is already restored")]
    NothingToRecover,
}

impl CommandError {
    /// Reports whether the rejection is an idempotent no-op the caller may ignore.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(
            self,
            Self::AlreadyUnlocked { .. } | Self::AlreadyDefeated { .. }
        )
    }
}

/// Inconsistencies detected while creating or resuming a session.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SetupError {
    /// Two lanes share an identifier.
    #[error("lane {} is defined twice", lane.get())]
    DuplicateLane {
        /// Duplicated lane.
        lane: LaneId,
    },
    /// A lane has fewer than two waypoints.
    #[error("lane {} needs at least two waypoints", lane.get())]
    DegenerateLane {
        /// Offending lane.
        lane: LaneId,
    },
    /// Two slots share an identifier.
    #[error("slot {} is defined twice", slot.get())]
    DuplicateSlot {
        /// Duplicated slot.
        slot: SlotId,
    },
    /// Two sectors share an identifier.
    #[error("sector {sector} is defined twice")]
    DuplicateSector {
        /// Duplicated sector.
        sector: SectorId,
    },
    /// Two protocols share an identifier.
    #[error("protocol {protocol} is defined twice")]
    DuplicateProtocol {
        /// Duplicated protocol.
        protocol: ProtocolId,
    },
    /// A sector references a lane missing from the map.
    #[error("sector {sector} references unknown lane {}", lane.get())]
    UnknownLane {
        /// Sector holding the reference.
        sector: SectorId,
        /// Missing lane.
        lane: LaneId,
    },
    /// A reference names a sector missing from the map.
    #[error("unknown sector {sector}")]
    UnknownSector {
        /// Missing sector.
        sector: SectorId,
    },
    /// A reference names a protocol missing from the roster.
    #[error("unknown protocol {protocol}")]
    UnknownProtocol {
        /// Missing protocol.
        protocol: ProtocolId,
    },
    /// A sector lists a prerequisite that does not precede it.
    #[error("sector {sector} lists prerequisite {prerequisite} which does not precede it")]
    PrerequisiteOrder {
        /// Dependent sector.
        sector: SectorId,
        /// Prerequisite out of order.
        prerequisite: SectorId,
    },
    /// A protocol fires zero or fewer shots per second.
    #[error("protocol {protocol} must have a positive fire rate")]
    InvalidFireRate {
        /// Offending protocol.
        protocol: ProtocolId,
    },
    /// A protocol ability carries out-of-range parameters.
    #[error("protocol {protocol} has an invalid ability")]
    InvalidAbility {
        /// Offending protocol.
        protocol: ProtocolId,
    },
    /// Bosses are spawned by the encounter rules, never by compositions.
    #[error("wave {wave} lists a boss in its composition")]
    BossInComposition {
        /// Offending wave.
        wave: u32,
    },
    /// Zero-Days are spawned by the threat rules, never by compositions.
    #[error("wave {wave} lists a zero-day in its composition")]
    ZeroDayInComposition {
        /// Offending wave.
        wave: u32,
    },
    /// A wave carries a negative delay or interval.
    #[error("wave {wave} has a negative delay")]
    NegativeDuration {
        /// Offending wave.
        wave: u32,
    },
    /// The repeating wave would spawn unboundedly in a single tick.
    #[error("the repeating wave must take time to spawn")]
    InstantRepeatingWave,
    /// A saved record does not match the provided setup.
    #[error("record does not match the session setup: {reason}")]
    RecordMismatch {
        /// Description of the mismatch.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::CommandError;
    use crate::SectorId;

    #[test]
    fn idempotent_rejections_are_noops() {
        assert!(CommandError::AlreadyUnlocked {
            sector: SectorId::new("alpha"),
        }
        .is_noop());
        assert!(!CommandError::NoValidSlot.is_noop());
    }

    #[test]
    fn messages_carry_amounts() {
        let error = CommandError::InsufficientCurrency {
            required: 150,
            available: 20,
        };
        assert_eq!(
            error.to_string(),
            "insufficient hash: 150 required, 20 available"
        );
    }
}
