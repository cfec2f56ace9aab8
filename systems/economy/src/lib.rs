#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Hash, power and efficiency bookkeeping for a session.
//!
//! The ledger owns the currency balance, the power grid pair and the derived
//! efficiency metric together with the freeze state it drives. It performs no
//! logging and holds no references to the world; the world forwards tower
//! draws and recovery requests and relays the emitted events.

use std::time::Duration;

use hashguard_core::{
    BalanceConfig, CommandError, EconomyBalance, EfficiencyBalance, Event, PlayerProfile,
    RecoveryMethod,
};
use serde::{Deserialize, Serialize};

/// Efficiency reported by a healthy grid.
pub const MAX_EFFICIENCY: f32 = 100.0;

/// Serialisable ledger contents captured between ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Current hash balance.
    pub hash: u64,
    /// Power drawn by all placed towers.
    pub power_used: u32,
    /// Power the grid can supply.
    pub power_capacity: u32,
    /// Efficiency between zero and one hundred.
    pub efficiency: f32,
    /// Whether the system is frozen.
    pub frozen: bool,
    /// Whether the low efficiency warning was raised and not yet cleared.
    pub warned: bool,
    /// Fractional passive income carried between ticks.
    pub income_remainder: f64,
    /// CPU component level scaling passive income.
    pub cpu_level: u32,
    /// Breaches not yet forgiven; efficiency does not regenerate while any remain.
    #[serde(default)]
    pub leaks: u32,
    /// Time accumulated toward forgiving the oldest breach.
    #[serde(default)]
    pub leak_clock: Duration,
}

impl LedgerState {
    /// Initial ledger contents derived from a player profile.
    #[must_use]
    pub fn from_profile(profile: &PlayerProfile, balance: &BalanceConfig) -> Self {
        Self {
            hash: profile.hash.min(balance.economy.hash_storage_capacity),
            power_used: 0,
            power_capacity: balance.power.capacity_for(profile.psu_level),
            efficiency: MAX_EFFICIENCY,
            frozen: false,
            warned: false,
            income_remainder: 0.0,
            cpu_level: profile.cpu_level,
            leaks: 0,
            leak_clock: Duration::ZERO,
        }
    }
}

/// Economy ledger applying balance rules to a [`LedgerState`].
#[derive(Clone, Debug)]
pub struct Ledger {
    state: LedgerState,
    economy: EconomyBalance,
    efficiency: EfficiencyBalance,
}

impl Ledger {
    /// Creates a ledger from captured contents and the balance configuration.
    #[must_use]
    pub fn new(state: LedgerState, balance: &BalanceConfig) -> Self {
        let mut state = state;
        state.hash = state.hash.min(balance.economy.hash_storage_capacity);
        state.efficiency = state.efficiency.clamp(0.0, MAX_EFFICIENCY);
        Self {
            state,
            economy: balance.economy,
            efficiency: balance.efficiency,
        }
    }

    /// Captures the ledger contents.
    #[must_use]
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Current hash balance.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.state.hash
    }

    /// Storage capacity capping the hash balance.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.economy.hash_storage_capacity
    }

    /// Power drawn by all placed towers.
    #[must_use]
    pub fn power_used(&self) -> u32 {
        self.state.power_used
    }

    /// Power the grid can supply.
    #[must_use]
    pub fn power_capacity(&self) -> u32 {
        self.state.power_capacity
    }

    /// Current efficiency.
    #[must_use]
    pub fn efficiency(&self) -> f32 {
        self.state.efficiency
    }

    /// Reports whether the system is frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.state.frozen
    }

    /// Reports whether the towers draw more power than the grid supplies.
    #[must_use]
    pub fn is_overloaded(&self) -> bool {
        self.state.power_used > self.state.power_capacity
    }

    /// Credits hash, discarding anything above the storage capacity.
    ///
    /// Returns the amount actually credited.
    pub fn add_hash(&mut self, amount: u64) -> u64 {
        let room = self.capacity().saturating_sub(self.state.hash);
        let credited = amount.min(room);
        self.state.hash += credited;
        credited
    }

    /// Verifies that the balance covers a cost without spending it.
    pub fn ensure_funds(&self, cost: u64) -> Result<(), CommandError> {
        if self.state.hash < cost {
            return Err(CommandError::InsufficientCurrency {
                required: cost,
                available: self.state.hash,
            });
        }
        Ok(())
    }

    /// Deducts a cost from the balance.
    pub fn spend(&mut self, cost: u64) -> Result<(), CommandError> {
        self.ensure_funds(cost)?;
        self.state.hash -= cost;
        Ok(())
    }

    /// Verifies that the grid can supply an extra draw.
    pub fn ensure_power(&self, extra: u32) -> Result<(), CommandError> {
        let available = self
            .state
            .power_capacity
            .saturating_sub(self.state.power_used);
        if extra > available {
            return Err(CommandError::InsufficientPower {
                required: extra,
                available,
            });
        }
        Ok(())
    }

    /// Replaces the power usage with a freshly summed draw.
    pub fn recompute_power(&mut self, used: u32, out: &mut Vec<Event>) {
        let was_overloaded = self.is_overloaded();
        self.state.power_used = used;
        self.report_grid_transition(was_overloaded, out);
    }

    /// Applies a new grid capacity.
    pub fn set_power_capacity(&mut self, capacity: u32, out: &mut Vec<Event>) {
        let was_overloaded = self.is_overloaded();
        self.state.power_capacity = capacity;
        self.report_grid_transition(was_overloaded, out);
    }

    fn report_grid_transition(&self, was_overloaded: bool, out: &mut Vec<Event>) {
        let used = self.state.power_used;
        let capacity = self.state.power_capacity;
        match (was_overloaded, self.is_overloaded()) {
            (false, true) => out.push(Event::PowerOverloaded { used, capacity }),
            (true, false) => out.push(Event::PowerRestored { used, capacity }),
            _ => {}
        }
    }

    /// Share of capacity by which usage exceeds it, zero within budget.
    #[must_use]
    pub fn overload_ratio(&self) -> f32 {
        if !self.is_overloaded() {
            return 0.0;
        }
        if self.state.power_capacity == 0 {
            return 1.0;
        }
        let excess = self.state.power_used - self.state.power_capacity;
        excess as f32 / self.state.power_capacity as f32
    }

    /// Advances efficiency by `dt`.
    ///
    /// Overload decays efficiency at a rate scaled by the overload ratio and
    /// freezes the system on reaching zero. Within budget efficiency regains
    /// ground toward one hundred once every recorded breach has been
    /// forgiven, except while frozen.
    pub fn tick_efficiency(&mut self, dt: Duration, out: &mut Vec<Event>) {
        if self.state.frozen || dt.is_zero() {
            return;
        }

        self.forgive_leaks(dt);
        let seconds = dt.as_secs_f32();
        if self.is_overloaded() {
            let rate = self.efficiency.overload_decay_per_second * (1.0 + self.overload_ratio());
            self.decay(rate * seconds, out);
        } else if self.state.leaks == 0 {
            self.state.efficiency = (self.state.efficiency
                + self.efficiency.regen_per_second * seconds)
                .min(MAX_EFFICIENCY);
            if self.state.efficiency >= self.efficiency.warning_threshold {
                self.state.warned = false;
            }
        }
    }

    /// Removes efficiency drained by a hostile effect, such as a Zero-Day.
    ///
    /// Warnings and freezing follow the same rules as overload decay.
    pub fn drain(&mut self, points: f32, out: &mut Vec<Event>) {
        if self.state.frozen || points.is_nan() || points <= 0.0 {
            return;
        }
        self.decay(points, out);
    }

    /// Records an enemy breach scaled by the enemy's damage multiplier.
    ///
    /// The breach costs efficiency immediately and holds back regeneration
    /// until it is forgiven after the configured interval.
    pub fn record_leak(&mut self, damage: f32, out: &mut Vec<Event>) {
        if self.state.leaks == 0 {
            self.state.leak_clock = Duration::ZERO;
        }
        self.state.leaks = self.state.leaks.saturating_add(1);
        self.drain(self.efficiency.leak_penalty * damage, out);
    }

    /// Number of breaches still holding back regeneration.
    #[must_use]
    pub fn leaks(&self) -> u32 {
        self.state.leaks
    }

    /// Gives back efficiency without lifting a freeze.
    ///
    /// Returns the efficiency afterwards.
    pub fn restore_efficiency(&mut self, points: f32) -> f32 {
        if !self.state.frozen && points > 0.0 {
            self.state.efficiency = (self.state.efficiency + points).min(MAX_EFFICIENCY);
            if self.state.efficiency >= self.efficiency.warning_threshold {
                self.state.warned = false;
            }
        }
        self.state.efficiency
    }

    fn decay(&mut self, points: f32, out: &mut Vec<Event>) {
        self.state.efficiency = (self.state.efficiency - points).max(0.0);

        if !self.state.warned && self.state.efficiency < self.efficiency.warning_threshold {
            self.state.warned = true;
            out.push(Event::EfficiencyWarning {
                efficiency: self.state.efficiency,
            });
        }

        if self.state.efficiency <= 0.0 {
            self.state.efficiency = 0.0;
            self.state.frozen = true;
            out.push(Event::SystemFrozen);
        }
    }

    fn forgive_leaks(&mut self, dt: Duration) {
        let interval = self.efficiency.leak_decay_interval();
        if self.state.leaks > 0 && !interval.is_zero() {
            self.state.leak_clock = self.state.leak_clock.saturating_add(dt);
            while self.state.leaks > 0 && self.state.leak_clock >= interval {
                self.state.leak_clock -= interval;
                self.state.leaks -= 1;
            }
        } else {
            self.state.leaks = 0;
        }
        if self.state.leaks == 0 {
            self.state.leak_clock = Duration::ZERO;
        }
    }

    /// Passive hash per second at the current efficiency.
    #[must_use]
    pub fn income_rate(&self) -> f64 {
        if self.state.frozen {
            return 0.0;
        }
        passive_rate(self.state.cpu_level, &self.economy)
            * f64::from(self.state.efficiency / MAX_EFFICIENCY)
    }

    /// Credits passive income for `dt`, carrying the fractional remainder.
    ///
    /// Returns the whole hash credited.
    pub fn accrue_income(&mut self, dt: Duration) -> u64 {
        let rate = self.income_rate();
        if rate <= 0.0 {
            return 0;
        }
        let earned = self.state.income_remainder + rate * dt.as_secs_f64();
        let whole = earned.floor();
        self.state.income_remainder = earned - whole;
        self.add_hash(whole as u64)
    }

    /// Pays a share of the current balance to restore efficiency.
    ///
    /// Returns the hash paid.
    pub fn flush_memory(&mut self, out: &mut Vec<Event>) -> Result<u64, CommandError> {
        let target = self.efficiency.flush_restore_target;
        if !self.state.frozen && self.state.efficiency >= target {
            return Err(CommandError::NothingToRecover);
        }

        let cost =
            (self.state.hash as f64 * f64::from(self.efficiency.flush_cost_fraction)).floor() as u64;
        self.state.hash -= cost.min(self.state.hash);
        self.restore(target, RecoveryMethod::FlushMemory, cost, out);
        Ok(cost)
    }

    /// Restores efficiency after a completed manual override, free of charge.
    pub fn manual_override_success(&mut self, out: &mut Vec<Event>) -> Result<(), CommandError> {
        let target = self.efficiency.override_restore_target;
        if !self.state.frozen && self.state.efficiency >= target {
            return Err(CommandError::NothingToRecover);
        }
        self.restore(target, RecoveryMethod::ManualOverride, 0, out);
        Ok(())
    }

    fn restore(&mut self, target: f32, method: RecoveryMethod, cost: u64, out: &mut Vec<Event>) {
        self.state.efficiency = self
            .state
            .efficiency
            .max(target.clamp(0.0, MAX_EFFICIENCY));
        self.state.frozen = false;
        self.state.warned = self.state.efficiency < self.efficiency.warning_threshold;
        self.state.leaks = 0;
        self.state.leak_clock = Duration::ZERO;
        out.push(Event::SystemRecovered {
            method,
            efficiency: self.state.efficiency,
            cost,
        });
    }
}

/// Passive hash per second at full efficiency for a CPU level.
#[must_use]
pub fn passive_rate(cpu_level: u32, economy: &EconomyBalance) -> f64 {
    f64::from(economy.base_hash_per_second)
        * (1.0 + f64::from(cpu_level) * f64::from(economy.cpu_level_scaling))
}

/// Hash earned while the session was closed for `elapsed`.
///
/// The period is capped at the configured maximum; storage capping happens
/// when the amount is credited.
#[must_use]
pub fn offline_earnings(elapsed: Duration, profile: &PlayerProfile, economy: &EconomyBalance) -> u64 {
    let max_seconds = f64::from(economy.max_offline_hours.max(0.0)) * 3600.0;
    let seconds = elapsed.as_secs_f64().min(max_seconds);
    let earned = passive_rate(profile.cpu_level, economy)
        * f64::from(economy.offline_earnings_rate)
        * seconds;
    earned.max(0.0).floor() as u64
}
