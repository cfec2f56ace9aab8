#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Boss encounter state machine.
//!
//! The machine tracks the boss sub-state of a session while the world keeps
//! the boss's enemy record. Transitions return plans describing the health
//! and reward values the world must apply, so no transition mutates the
//! board directly.

use std::time::Duration;

use hashguard_core::{
    BossBalance, BossDifficulty, BossPhase, CommandError, EnemyId, Event, MapDefinition, SectorId,
};
use serde::{Deserialize, Serialize};

/// Serialisable encounter state captured between ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncounterState {
    /// Current phase.
    pub phase: BossPhase,
    /// Sector of the most recently defeated boss, cleared when a new boss spawns.
    pub last_defeated: Option<SectorId>,
    /// Health thresholds the engaged boss has already fallen through.
    #[serde(default)]
    pub thresholds_passed: u8,
}

impl Default for EncounterState {
    fn default() -> Self {
        Self {
            phase: BossPhase::Dormant,
            last_defeated: None,
            thresholds_passed: 0,
        }
    }
}

/// Health values the world applies to the boss record on engagement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Engagement {
    /// Enemy record representing the boss.
    pub enemy: EnemyId,
    /// Health after difficulty scaling.
    pub health: f32,
    /// Maximum health after difficulty scaling.
    pub max_health: f32,
}

/// Health values the world restores on the boss record after a retreat.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Retreat {
    /// Enemy record representing the boss.
    pub enemy: EnemyId,
    /// Health before the encounter began.
    pub health: f32,
    /// Maximum health before the encounter began.
    pub max_health: f32,
}

/// Outcome of a victory against the engaged boss.
#[derive(Clone, Debug, PartialEq)]
pub struct Victory {
    /// Enemy record the world removes.
    pub enemy: EnemyId,
    /// Sector the boss belonged to.
    pub sector: SectorId,
    /// Hash awarded, before storage capping.
    pub reward: u64,
    /// Whether the sector's boss had never been defeated before.
    pub first_kill: bool,
}

/// Boss encounter state machine.
#[derive(Clone, Debug)]
pub struct BossEncounter {
    state: EncounterState,
    balance: BossBalance,
}

impl BossEncounter {
    /// Creates a dormant encounter machine.
    #[must_use]
    pub fn new(balance: BossBalance) -> Self {
        Self::restore(EncounterState::default(), balance)
    }

    /// Recreates a machine from captured state.
    #[must_use]
    pub fn restore(state: EncounterState, balance: BossBalance) -> Self {
        Self { state, balance }
    }

    /// Captured encounter state.
    #[must_use]
    pub fn state(&self) -> &EncounterState {
        &self.state
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> &BossPhase {
        &self.state.phase
    }

    /// Records that the boss entered the board.
    ///
    /// Returns `false` without changes when a boss is already active.
    pub fn spawned(&mut self, enemy: EnemyId, sector: SectorId, out: &mut Vec<Event>) -> bool {
        if self.state.phase.is_active() {
            return false;
        }

        out.push(Event::BossSpawned {
            enemy,
            sector: sector.clone(),
        });
        self.state.last_defeated = None;
        self.state.phase = BossPhase::Spawned {
            enemy,
            sector,
            alert_in: self.balance.alert_delay(),
        };
        true
    }

    /// Counts down the alert delay.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let alerted = match &mut self.state.phase {
            BossPhase::Spawned {
                enemy,
                sector,
                alert_in,
            } => {
                *alert_in = alert_in.saturating_sub(dt);
                alert_in.is_zero().then(|| BossPhase::Alerted {
                    enemy: *enemy,
                    sector: sector.clone(),
                })
            }
            _ => None,
        };

        if let Some(phase) = alerted {
            if let Some(sector) = phase.sector() {
                out.push(Event::BossAlerted {
                    sector: sector.clone(),
                });
            }
            self.state.phase = phase;
        }
    }

    /// Engages the alerted boss at the selected difficulty.
    ///
    /// `health` and `max_health` describe the boss record before scaling. A
    /// boss still counting down to its alert cannot be engaged yet.
    pub fn engage(
        &mut self,
        difficulty: BossDifficulty,
        health: f32,
        max_health: f32,
        out: &mut Vec<Event>,
    ) -> Result<Engagement, CommandError> {
        let (enemy, sector) = match &self.state.phase {
            BossPhase::Alerted { enemy, sector } => (*enemy, sector.clone()),
            BossPhase::Spawned { .. } => return Err(CommandError::BossNotAlerted),
            BossPhase::Engaged { .. } => return Err(CommandError::BossAlreadyEngaged),
            BossPhase::Dormant => return Err(self.dormant_error(CommandError::NoActiveBoss)),
        };

        let multiplier = self.balance.difficulties.get(difficulty).health_multiplier;
        out.push(Event::BossEngaged {
            sector: sector.clone(),
            difficulty,
        });
        self.state.phase = BossPhase::Engaged {
            enemy,
            sector,
            difficulty,
            pre_engagement_health: health,
            pre_engagement_max_health: max_health,
        };
        self.state.thresholds_passed = 0;
        Ok(Engagement {
            enemy,
            health: health * multiplier,
            max_health: max_health * multiplier,
        })
    }

    /// Ends the encounter without a victory, keeping the boss on the board.
    pub fn retreat(&mut self, out: &mut Vec<Event>) -> Result<Retreat, CommandError> {
        let BossPhase::Engaged {
            enemy,
            sector,
            pre_engagement_health,
            pre_engagement_max_health,
            ..
        } = &self.state.phase
        else {
            return Err(self.engaged_error());
        };

        let retreat = Retreat {
            enemy: *enemy,
            health: *pre_engagement_health,
            max_health: *pre_engagement_max_health,
        };
        let sector = sector.clone();
        out.push(Event::BossRetreated {
            sector: sector.clone(),
        });
        self.state.phase = BossPhase::Alerted {
            enemy: retreat.enemy,
            sector,
        };
        self.state.thresholds_passed = 0;
        Ok(retreat)
    }

    /// Reports the phases the engaged boss entered after taking damage.
    ///
    /// One event is emitted per threshold crossed, in order, so a single
    /// heavy hit can announce several phases at once.
    pub fn track_health(&mut self, health: f32, max_health: f32, out: &mut Vec<Event>) {
        let BossPhase::Engaged { sector, .. } = &self.state.phase else {
            return;
        };
        if max_health <= 0.0 {
            return;
        }

        let fraction = health / max_health;
        let crossed = self
            .balance
            .phase_thresholds
            .iter()
            .filter(|threshold| fraction <= **threshold)
            .count();
        let crossed = u8::try_from(crossed).unwrap_or(u8::MAX);
        let sector = sector.clone();
        while self.state.thresholds_passed < crossed {
            self.state.thresholds_passed += 1;
            out.push(Event::BossPhaseChanged {
                sector: sector.clone(),
                phase: self.state.thresholds_passed + 1,
            });
        }
    }

    /// Enemy record that damage reports apply to.
    pub fn engaged_enemy(&self) -> Result<EnemyId, CommandError> {
        match &self.state.phase {
            BossPhase::Engaged { enemy, .. } => Ok(*enemy),
            _ => Err(self.engaged_error()),
        }
    }

    /// Concludes the encounter with a victory.
    ///
    /// `defeated_before` reports whether the sector's boss already fell in an
    /// earlier cycle, which decides the first-kill bonus.
    pub fn victory(
        &mut self,
        defeated_before: bool,
        out: &mut Vec<Event>,
    ) -> Result<Victory, CommandError> {
        let BossPhase::Engaged {
            enemy,
            sector,
            difficulty,
            ..
        } = &self.state.phase
        else {
            return Err(self.engaged_error());
        };

        let victory = Victory {
            enemy: *enemy,
            sector: sector.clone(),
            reward: self.reward_for(*difficulty),
            first_kill: !defeated_before,
        };
        out.push(Event::BossDefeated {
            sector: victory.sector.clone(),
            reward: victory.reward,
            first_kill: victory.first_kill,
        });
        self.state.last_defeated = Some(victory.sector.clone());
        self.state.phase = BossPhase::Dormant;
        self.state.thresholds_passed = 0;
        Ok(victory)
    }

    /// Records that the ignored boss reached the objective.
    ///
    /// Returns the sector whose engagement opportunity was lost.
    pub fn escaped(&mut self, out: &mut Vec<Event>) -> Option<SectorId> {
        let sector = match &self.state.phase {
            BossPhase::Spawned { sector, .. } | BossPhase::Alerted { sector, .. } => sector.clone(),
            BossPhase::Engaged { .. } | BossPhase::Dormant => return None,
        };
        out.push(Event::BossEscaped {
            sector: sector.clone(),
        });
        self.state.phase = BossPhase::Dormant;
        Some(sector)
    }

    /// Hash awarded for a victory at the provided difficulty.
    #[must_use]
    pub fn reward_for(&self, difficulty: BossDifficulty) -> u64 {
        let multiplier = self.balance.difficulties.get(difficulty).reward_multiplier;
        (self.balance.base_reward as f64 * f64::from(multiplier)).round() as u64
    }

    fn engaged_error(&self) -> CommandError {
        if self.state.phase.is_active() {
            return CommandError::NoBossEngaged;
        }
        self.dormant_error(CommandError::NoBossEngaged)
    }

    fn dormant_error(&self, fallback: CommandError) -> CommandError {
        match &self.state.last_defeated {
            Some(sector) => CommandError::AlreadyDefeated {
                sector: sector.clone(),
            },
            None => fallback,
        }
    }
}

/// Sector whose boss appears next.
///
/// The first unlocked sector in map order with an undefeated boss is chosen;
/// once every unlocked boss fell, the deepest unlocked sector repeats.
#[must_use]
pub fn choose_sector<'a>(
    map: &'a MapDefinition,
    is_unlocked: impl Fn(&SectorId) -> bool,
    is_defeated: impl Fn(&SectorId) -> bool,
) -> Option<&'a SectorId> {
    let mut last = None;
    for sector in &map.sectors {
        if !is_unlocked(&sector.id) {
            continue;
        }
        if !is_defeated(&sector.id) {
            return Some(&sector.id);
        }
        last = Some(&sector.id);
    }
    last
}
