//! Read-only configuration consumed by the simulation.
//!
//! Balance tables, the protocol roster, the map, the wave schedule and the
//! player profile are owned by external collaborators and handed to the
//! simulation as a [`SessionSetup`]. Every type here deserialises from the
//! formats those collaborators write, and [`SessionSetup::validate`] rejects
//! inconsistent cross references before a session is created.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{LaneId, ProtocolId, SectorId, SetupError, SlotId, StatScaling};

/// Rarity tier of a protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Baseline protocols.
    Common,
    /// Uncommon protocols.
    Rare,
    /// High tier protocols.
    Epic,
    /// Top tier protocols.
    Legendary,
}

/// Value keyed by [`Rarity`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RarityTable<T> {
    /// Value for common protocols.
    pub common: T,
    /// Value for rare protocols.
    pub rare: T,
    /// Value for epic protocols.
    pub epic: T,
    /// Value for legendary protocols.
    pub legendary: T,
}

impl<T: Copy> RarityTable<T> {
    /// Looks up the value for a rarity tier.
    #[must_use]
    pub const fn get(&self, rarity: Rarity) -> T {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Rare => self.rare,
            Rarity::Epic => self.epic,
            Rarity::Legendary => self.legendary,
        }
    }
}

/// Special effect carried by a protocol's projectiles.
///
/// The set is closed: an unknown `kind` key is rejected while the roster is
/// deserialised instead of being ignored at impact time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Ability {
    /// Multiplies the target's speed by `factor` for `duration_secs`.
    Slow {
        /// Speed multiplier while slowed, between zero and one.
        factor: f32,
        /// Duration of the effect in seconds.
        duration_secs: f32,
    },
    /// Deals `fraction` of the impact damage to enemies within `radius`.
    Splash {
        /// Radius around the impact point in game units.
        radius: f32,
        /// Fraction of the impact damage dealt to bystanders.
        fraction: f32,
    },
}

impl Ability {
    /// Duration of the slow effect, if this is a slow ability.
    #[must_use]
    pub fn slow_duration(&self) -> Option<Duration> {
        match self {
            Self::Slow { duration_secs, .. } => Some(secs(*duration_secs)),
            Self::Splash { .. } => None,
        }
    }

    fn is_valid(&self) -> bool {
        match *self {
            Self::Slow {
                factor,
                duration_secs,
            } => (0.0..=1.0).contains(&factor) && duration_secs >= 0.0,
            Self::Splash { radius, fraction } => radius >= 0.0 && (0.0..=1.0).contains(&fraction),
        }
    }
}

/// Unified weapon/tower template compiled by the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolDefinition {
    /// Identifier of the protocol.
    pub id: ProtocolId,
    /// Display name.
    pub name: String,
    /// Rarity tier, which drives the power draw.
    pub rarity: Rarity,
    /// Damage per projectile at level one.
    pub base_damage: f32,
    /// Targeting range at level one, in game units.
    pub base_range: f32,
    /// Shots per second at level one.
    pub base_fire_rate: f32,
    /// Hash paid to place the tower.
    pub placement_cost: u64,
    /// Optional special effect.
    #[serde(default)]
    pub ability: Option<Ability>,
}

/// Level-scaled statistics of a placed tower.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerStats {
    /// Damage per projectile.
    pub damage: f32,
    /// Targeting range in game units.
    pub range: f32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Power drawn from the grid.
    pub power_draw: u32,
}

impl TowerStats {
    /// Computes the statistics of a protocol at the provided level.
    #[must_use]
    pub fn for_level(
        protocol: &ProtocolDefinition,
        level: u32,
        scaling: &ProtocolScaling,
        power: &PowerBalance,
    ) -> Self {
        let multiplier = scaling.level_multiplier(level);
        let steps = level.saturating_sub(1) as f32;
        let base_draw = power.tower_power.get(protocol.rarity) as f32;
        Self {
            damage: protocol.base_damage * multiplier,
            range: protocol.base_range * (1.0 + steps * scaling.range_per_level),
            fire_rate: protocol.base_fire_rate * (1.0 + steps * scaling.fire_rate_per_level),
            power_draw: (base_draw * multiplier).round() as u32,
        }
    }

    /// Time between consecutive shots.
    #[must_use]
    pub fn fire_interval(&self) -> Duration {
        if self.fire_rate <= 0.0 {
            return Duration::MAX;
        }
        secs(1.0 / self.fire_rate)
    }
}

/// Hash economy parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomyBalance {
    /// Storage capacity that caps the hash balance.
    pub hash_storage_capacity: u64,
    /// Passive hash generated per second at full efficiency and CPU level zero.
    pub base_hash_per_second: f32,
    /// Extra passive income per CPU level, as a fraction of the base rate.
    pub cpu_level_scaling: f32,
    /// Fraction of the passive rate earned while the app is closed.
    pub offline_earnings_rate: f32,
    /// Upper bound on the offline period credited, in hours.
    pub max_offline_hours: f32,
}

/// Power grid parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerBalance {
    /// Power capacity before component upgrades.
    pub base_power_budget: u32,
    /// Capacity added per PSU component level.
    pub psu_bonus_per_level: u32,
    /// Power drawn by a level one tower, by rarity.
    pub tower_power: RarityTable<u32>,
}

impl PowerBalance {
    /// Power capacity for a profile's PSU level.
    #[must_use]
    pub fn capacity_for(&self, psu_level: u32) -> u32 {
        self.base_power_budget
            .saturating_add(self.psu_bonus_per_level.saturating_mul(psu_level))
    }
}

/// Efficiency and freeze parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyBalance {
    /// Efficiency points lost per second while overloaded, before the overload ratio.
    pub overload_decay_per_second: f32,
    /// Efficiency points regained per second while within budget.
    pub regen_per_second: f32,
    /// Efficiency below which a warning is raised.
    pub warning_threshold: f32,
    /// Share of current hash paid by a memory flush.
    pub flush_cost_fraction: f32,
    /// Efficiency restored by a memory flush.
    pub flush_restore_target: f32,
    /// Efficiency restored by a manual override.
    pub override_restore_target: f32,
    /// Efficiency points lost per breach by an enemy of damage multiplier one.
    #[serde(default = "default_leak_penalty")]
    pub leak_penalty: f32,
    /// Seconds after which the oldest breach stops holding back regeneration.
    #[serde(default = "default_leak_decay_interval_secs")]
    pub leak_decay_interval_secs: f32,
}

impl EfficiencyBalance {
    /// Time needed to forgive one breach.
    #[must_use]
    pub fn leak_decay_interval(&self) -> Duration {
        secs(self.leak_decay_interval_secs)
    }
}

fn default_leak_penalty() -> f32 {
    2.0
}

fn default_leak_decay_interval_secs() -> f32 {
    10.0
}

/// Level scaling shared by every protocol.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolScaling {
    /// Linear damage and power multiplier added per level above one.
    pub level_multiplier: f32,
    /// Range bonus per level above one, as a fraction of base range.
    pub range_per_level: f32,
    /// Fire rate bonus per level above one, as a fraction of base rate.
    pub fire_rate_per_level: f32,
    /// Exponential growth applied to upgrade costs.
    pub upgrade_cost_growth: f32,
    /// Highest level a tower can reach.
    pub max_level: u32,
    /// Share of invested hash refunded on sale.
    pub sell_refund_fraction: f32,
}

impl ProtocolScaling {
    /// Linear stat multiplier for a level.
    #[must_use]
    pub fn level_multiplier(&self, level: u32) -> f32 {
        1.0 + level.saturating_sub(1) as f32 * self.level_multiplier
    }

    /// Hash needed to upgrade a tower from `level` to `level + 1`.
    #[must_use]
    pub fn upgrade_cost(&self, placement_cost: u64, level: u32) -> u64 {
        let exponent = i32::try_from(level).unwrap_or(i32::MAX);
        let cost = placement_cost as f64 * f64::from(self.upgrade_cost_growth).powi(exponent);
        if cost.is_finite() {
            cost.round().min(u64::MAX as f64) as u64
        } else {
            u64::MAX
        }
    }

    /// Hash refunded when selling a tower with the given investment.
    #[must_use]
    pub fn refund(&self, invested: u64) -> u64 {
        (invested as f64 * f64::from(self.sell_refund_fraction)).floor() as u64
    }
}

/// Archetypes of wave enemies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Baseline enemy.
    Basic,
    /// Fast and fragile enemy.
    Fast,
    /// Slow and durable enemy.
    Tank,
    /// Sector boss; never part of a wave composition.
    Boss,
    /// Efficiency-draining intruder spawned by the threat rules; never part of
    /// a wave composition.
    ZeroDay,
}

impl EnemyKind {
    /// Reports whether wave compositions may list the archetype.
    #[must_use]
    pub const fn is_scripted(&self) -> bool {
        !matches!(self, Self::Boss | Self::ZeroDay)
    }
}

/// Base statistics of an enemy archetype.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyStats {
    /// Health at wave zero.
    pub health: f32,
    /// Movement speed in game units per second at wave zero.
    pub speed: f32,
    /// Hash credited on kill at wave zero.
    pub reward: u64,
}

impl EnemyStats {
    /// Applies spawn-time multipliers.
    #[must_use]
    pub fn scaled(&self, scaling: StatScaling) -> Self {
        Self {
            health: self.health * scaling.health,
            speed: self.speed * scaling.speed,
            reward: (self.reward as f32 * scaling.reward).round() as u64,
        }
    }
}

/// Base statistics of every wave enemy archetype.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyRoster {
    /// Baseline enemy.
    pub basic: EnemyStats,
    /// Fast enemy.
    pub fast: EnemyStats,
    /// Durable enemy.
    pub tank: EnemyStats,
}

/// Health and reward multipliers for a boss difficulty tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyModifier {
    /// Multiplier applied to boss health on engagement.
    pub health_multiplier: f32,
    /// Multiplier applied to the boss reward on victory.
    pub reward_multiplier: f32,
}

/// Difficulty tiers a player may select when engaging a boss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossDifficulty {
    /// Reduced health and reward.
    Easy,
    /// Baseline encounter.
    Normal,
    /// Doubled stakes.
    Hard,
    /// Highest tier.
    Nightmare,
}

/// Modifiers for every boss difficulty tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTable {
    /// Easy tier.
    pub easy: DifficultyModifier,
    /// Normal tier.
    pub normal: DifficultyModifier,
    /// Hard tier.
    pub hard: DifficultyModifier,
    /// Nightmare tier.
    pub nightmare: DifficultyModifier,
}

impl DifficultyTable {
    /// Looks up the modifier for a difficulty tier.
    #[must_use]
    pub const fn get(&self, difficulty: BossDifficulty) -> DifficultyModifier {
        match difficulty {
            BossDifficulty::Easy => self.easy,
            BossDifficulty::Normal => self.normal,
            BossDifficulty::Hard => self.hard,
            BossDifficulty::Nightmare => self.nightmare,
        }
    }
}

/// Boss encounter parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BossBalance {
    /// Boss health before difficulty scaling.
    pub base_health: f32,
    /// Boss movement speed while not engaged.
    pub speed: f32,
    /// Hash awarded on victory before difficulty scaling.
    pub base_reward: u64,
    /// A boss spawns when a wave whose one-based number is a multiple of this starts; zero disables bosses.
    pub spawn_wave_interval: u32,
    /// Delay between the boss entering the board and the player alert, in seconds.
    pub alert_delay_secs: f32,
    /// Difficulty modifiers.
    pub difficulties: DifficultyTable,
    /// Health fractions at which the engaged boss enters its second, third
    /// and fourth phase.
    #[serde(default = "default_phase_thresholds")]
    pub phase_thresholds: [f32; 3],
}

fn default_phase_thresholds() -> [f32; 3] {
    [0.75, 0.5, 0.25]
}

/// Zero-Day intruder parameters.
///
/// A Zero-Day drains efficiency for as long as it stays on the board. At most
/// one is alive at a time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZeroDayBalance {
    /// Health before wave scaling.
    pub base_health: f32,
    /// Movement speed before wave scaling.
    pub speed: f32,
    /// Efficiency points drained per second while alive.
    pub efficiency_drain_per_second: f32,
    /// Zero-based wave index from which every starting wave may bring one.
    pub min_waves_before_spawn: u32,
    /// Hash credited for the kill; not scaled by wave.
    pub defeat_hash_bonus: u64,
    /// Efficiency points restored on the kill, capped at one hundred.
    pub defeat_efficiency_restore: f32,
}

impl Default for ZeroDayBalance {
    fn default() -> Self {
        Self {
            base_health: 400.0,
            speed: 25.0,
            efficiency_drain_per_second: 2.0,
            min_waves_before_spawn: 3,
            defeat_hash_bonus: 250,
            defeat_efficiency_restore: 25.0,
        }
    }
}

impl BossBalance {
    /// Delay between spawn and alert.
    #[must_use]
    pub fn alert_delay(&self) -> Duration {
        secs(self.alert_delay_secs)
    }
}

/// Projectile parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatBalance {
    /// Projectile speed in game units per second.
    pub projectile_speed: f32,
    /// Maximum projectile flight time in seconds.
    pub projectile_lifetime_secs: f32,
    /// Distance at which a projectile counts as having hit.
    pub impact_epsilon: f32,
}

impl CombatBalance {
    /// Maximum projectile flight time.
    #[must_use]
    pub fn projectile_lifetime(&self) -> Duration {
        secs(self.projectile_lifetime_secs)
    }
}

/// Placement parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementBalance {
    /// Snap radius at zoom one on a map of scale one.
    pub base_snap_radius: f32,
}

/// Complete balance configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Hash economy.
    pub economy: EconomyBalance,
    /// Power grid.
    pub power: PowerBalance,
    /// Efficiency and freeze.
    pub efficiency: EfficiencyBalance,
    /// Protocol level scaling.
    pub scaling: ProtocolScaling,
    /// Wave enemy archetypes.
    pub enemies: EnemyRoster,
    /// Boss encounters.
    pub boss: BossBalance,
    /// Projectiles.
    pub combat: CombatBalance,
    /// Placement snapping.
    pub placement: PlacementBalance,
    /// Zero-Day intruders.
    #[serde(default)]
    pub zero_day: ZeroDayBalance,
}

impl BalanceConfig {
    /// Base statistics for an enemy archetype, bosses and Zero-Days included.
    #[must_use]
    pub fn enemy_stats(&self, kind: EnemyKind) -> EnemyStats {
        match kind {
            EnemyKind::Basic => self.enemies.basic,
            EnemyKind::Fast => self.enemies.fast,
            EnemyKind::Tank => self.enemies.tank,
            EnemyKind::Boss => EnemyStats {
                health: self.boss.base_health,
                speed: self.boss.speed,
                reward: self.boss.base_reward,
            },
            EnemyKind::ZeroDay => EnemyStats {
                health: self.zero_day.base_health,
                speed: self.zero_day.speed,
                reward: self.zero_day.defeat_hash_bonus,
            },
        }
    }
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            economy: EconomyBalance {
                hash_storage_capacity: 25_000,
                base_hash_per_second: 1.0,
                cpu_level_scaling: 0.15,
                offline_earnings_rate: 0.2,
                max_offline_hours: 8.0,
            },
            power: PowerBalance {
                base_power_budget: 300,
                psu_bonus_per_level: 50,
                tower_power: RarityTable {
                    common: 15,
                    rare: 20,
                    epic: 25,
                    legendary: 30,
                },
            },
            efficiency: EfficiencyBalance {
                overload_decay_per_second: 5.0,
                regen_per_second: 1.0,
                warning_threshold: 25.0,
                flush_cost_fraction: 0.1,
                flush_restore_target: 50.0,
                override_restore_target: 100.0,
                leak_penalty: default_leak_penalty(),
                leak_decay_interval_secs: default_leak_decay_interval_secs(),
            },
            scaling: ProtocolScaling {
                level_multiplier: 0.1,
                range_per_level: 0.05,
                fire_rate_per_level: 0.03,
                upgrade_cost_growth: 1.5,
                max_level: 10,
                sell_refund_fraction: 0.5,
            },
            enemies: EnemyRoster {
                basic: EnemyStats {
                    health: 30.0,
                    speed: 40.0,
                    reward: 5,
                },
                fast: EnemyStats {
                    health: 18.0,
                    speed: 75.0,
                    reward: 6,
                },
                tank: EnemyStats {
                    health: 120.0,
                    speed: 22.0,
                    reward: 15,
                },
            },
            boss: BossBalance {
                base_health: 1000.0,
                speed: 15.0,
                base_reward: 500,
                spawn_wave_interval: 5,
                alert_delay_secs: 2.0,
                difficulties: DifficultyTable {
                    easy: DifficultyModifier {
                        health_multiplier: 0.5,
                        reward_multiplier: 0.5,
                    },
                    normal: DifficultyModifier {
                        health_multiplier: 1.0,
                        reward_multiplier: 1.0,
                    },
                    hard: DifficultyModifier {
                        health_multiplier: 2.0,
                        reward_multiplier: 2.0,
                    },
                    nightmare: DifficultyModifier {
                        health_multiplier: 4.0,
                        reward_multiplier: 3.5,
                    },
                },
                phase_thresholds: default_phase_thresholds(),
            },
            combat: CombatBalance {
                projectile_speed: 400.0,
                projectile_lifetime_secs: 3.0,
                impact_epsilon: 1.0,
            },
            placement: PlacementBalance {
                base_snap_radius: 40.0,
            },
            zero_day: ZeroDayBalance::default(),
        }
    }
}

/// Polyline walked by enemies from spawn to objective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneDefinition {
    /// Identifier of the lane.
    pub id: LaneId,
    /// Waypoints from spawn to objective.
    pub waypoints: Vec<Vec2>,
}

/// Location that can hold a single tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotDefinition {
    /// Identifier of the slot.
    pub id: SlotId,
    /// Game-space position.
    pub position: Vec2,
    /// Sector that owns the slot.
    pub sector: SectorId,
}

/// Gated region of the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectorDefinition {
    /// Identifier of the sector.
    pub id: SectorId,
    /// Name shown to the player.
    pub display_name: String,
    /// Hash needed to unlock the sector.
    pub unlock_cost: u64,
    /// Sectors that must be unlocked first.
    #[serde(default)]
    pub prerequisites: Vec<SectorId>,
    /// Protocols that must be compiled first.
    #[serde(default)]
    pub required_protocols: Vec<ProtocolId>,
    /// Lanes that open once the sector is unlocked.
    #[serde(default)]
    pub lanes: Vec<LaneId>,
    /// Identifier of the sector's boss, forwarded to the encounter mode.
    pub boss: String,
}

/// Board layout.
///
/// Sectors are listed in topological unlock order: every prerequisite appears
/// before the sectors that depend on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    /// Game units per layout unit; larger maps need larger snap radii.
    pub scale: f32,
    /// Enemy lanes.
    pub lanes: Vec<LaneDefinition>,
    /// Tower slots.
    pub slots: Vec<SlotDefinition>,
    /// Sectors in unlock order.
    pub sectors: Vec<SectorDefinition>,
}

impl MapDefinition {
    /// Looks up a sector definition.
    #[must_use]
    pub fn sector(&self, id: &SectorId) -> Option<&SectorDefinition> {
        self.sectors.iter().find(|sector| &sector.id == id)
    }
}

/// Enemies spawned by a composition entry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnEntry {
    /// Archetype to spawn.
    pub kind: EnemyKind,
    /// Number of enemies.
    pub count: u32,
    /// Seconds between consecutive spawns of this entry.
    pub interval_secs: f32,
}

impl SpawnEntry {
    /// Time between consecutive spawns.
    #[must_use]
    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }
}

/// Scripted composition of a single wave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Seconds between the previous wave finishing its spawns and this wave starting.
    pub pre_delay_secs: f32,
    /// Composition entries spawned in order.
    pub entries: Vec<SpawnEntry>,
}

impl WaveDefinition {
    /// Delay before the wave starts.
    #[must_use]
    pub fn pre_delay(&self) -> Duration {
        secs(self.pre_delay_secs)
    }

    /// Total number of enemies in the wave.
    #[must_use]
    pub fn enemy_count(&self) -> u32 {
        self.entries.iter().map(|entry| entry.count).sum()
    }
}

/// Per-wave growth rates applied to enemy statistics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreatGrowth {
    /// Health growth per wave.
    pub health_growth: f32,
    /// Speed growth per wave.
    pub speed_growth: f32,
    /// Reward growth per wave.
    pub reward_growth: f32,
    /// Growth per wave of the efficiency damage a breach deals.
    #[serde(default = "default_damage_growth")]
    pub damage_growth: f32,
}

fn default_damage_growth() -> f32 {
    0.05
}

impl ThreatGrowth {
    /// Multipliers `1 + wave × growth` for a wave index.
    #[must_use]
    pub fn scaling_for(&self, wave: u32) -> StatScaling {
        let wave = wave as f32;
        StatScaling {
            health: 1.0 + wave * self.health_growth,
            speed: 1.0 + wave * self.speed_growth,
            reward: 1.0 + wave * self.reward_growth,
            damage: 1.0 + wave * self.damage_growth,
        }
    }
}

impl Default for ThreatGrowth {
    fn default() -> Self {
        Self {
            health_growth: 0.15,
            speed_growth: 0.02,
            reward_growth: 0.1,
            damage_growth: default_damage_growth(),
        }
    }
}

/// Ordered wave schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveSchedule {
    /// Scripted waves in order.
    pub waves: Vec<WaveDefinition>,
    /// Growth rates applied per wave index.
    #[serde(default)]
    pub growth: ThreatGrowth,
    /// Seed for deterministic lane selection.
    #[serde(default)]
    pub seed: u64,
    /// Whether the last definition repeats forever once the script runs out.
    #[serde(default)]
    pub repeat_last: bool,
}

impl WaveSchedule {
    /// Definition used for a wave index, honouring `repeat_last`.
    #[must_use]
    pub fn definition(&self, wave: u32) -> Option<&WaveDefinition> {
        let index = usize::try_from(wave).ok()?;
        match self.waves.get(index) {
            Some(definition) => Some(definition),
            None if self.repeat_last => self.waves.last(),
            None => None,
        }
    }
}

/// Player progression mirrored into the session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Hash balance at session start.
    #[serde(default)]
    pub hash: u64,
    /// CPU component level, scaling passive income.
    #[serde(default)]
    pub cpu_level: u32,
    /// PSU component level, scaling power capacity.
    #[serde(default)]
    pub psu_level: u32,
    /// Compiled protocols and their levels.
    #[serde(default)]
    pub compiled_protocols: BTreeMap<ProtocolId, u32>,
    /// Sectors already unlocked.
    #[serde(default)]
    pub unlocked_sectors: BTreeSet<SectorId>,
    /// Sectors whose boss has been defeated at least once.
    #[serde(default)]
    pub defeated_bosses: BTreeSet<SectorId>,
    /// Partial payments credited toward locked sectors.
    #[serde(default)]
    pub sector_payments: BTreeMap<SectorId, u64>,
}

/// Everything needed to create a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSetup {
    /// Player profile snapshot.
    pub profile: PlayerProfile,
    /// Wave schedule.
    pub schedule: WaveSchedule,
    /// Board layout.
    pub map: MapDefinition,
    /// Balance configuration.
    #[serde(default)]
    pub balance: BalanceConfig,
    /// Protocol roster.
    pub roster: Vec<ProtocolDefinition>,
}

impl SessionSetup {
    /// Validates cross references between the setup's parts.
    pub fn validate(&self) -> Result<(), SetupError> {
        let mut lanes = BTreeSet::new();
        for lane in &self.map.lanes {
            if !lanes.insert(lane.id) {
                return Err(SetupError::DuplicateLane { lane: lane.id });
            }
            if lane.waypoints.len() < 2 {
                return Err(SetupError::DegenerateLane { lane: lane.id });
            }
        }

        let mut protocols = BTreeSet::new();
        for protocol in &self.roster {
            if !protocols.insert(protocol.id.clone()) {
                return Err(SetupError::DuplicateProtocol {
                    protocol: protocol.id.clone(),
                });
            }
            if protocol.base_fire_rate.is_nan() || protocol.base_fire_rate <= 0.0 {
                return Err(SetupError::InvalidFireRate {
                    protocol: protocol.id.clone(),
                });
            }
            if protocol.ability.is_some_and(|ability| !ability.is_valid()) {
                return Err(SetupError::InvalidAbility {
                    protocol: protocol.id.clone(),
                });
            }
        }

        let mut sectors: BTreeSet<SectorId> = BTreeSet::new();
        for sector in &self.map.sectors {
            for prerequisite in &sector.prerequisites {
                if !sectors.contains(prerequisite) {
                    return Err(SetupError::PrerequisiteOrder {
                        sector: sector.id.clone(),
                        prerequisite: prerequisite.clone(),
                    });
                }
            }
            for lane in &sector.lanes {
                if !lanes.contains(lane) {
                    return Err(SetupError::UnknownLane {
                        sector: sector.id.clone(),
                        lane: *lane,
                    });
                }
            }
            for protocol in &sector.required_protocols {
                if !protocols.contains(protocol) {
                    return Err(SetupError::UnknownProtocol {
                        protocol: protocol.clone(),
                    });
                }
            }
            if !sectors.insert(sector.id.clone()) {
                return Err(SetupError::DuplicateSector {
                    sector: sector.id.clone(),
                });
            }
        }

        let mut slots = BTreeSet::new();
        for slot in &self.map.slots {
            if !slots.insert(slot.id) {
                return Err(SetupError::DuplicateSlot { slot: slot.id });
            }
            if !sectors.contains(&slot.sector) {
                return Err(SetupError::UnknownSector {
                    sector: slot.sector.clone(),
                });
            }
        }

        for sector in self
            .profile
            .unlocked_sectors
            .iter()
            .chain(self.profile.defeated_bosses.iter())
            .chain(self.profile.sector_payments.keys())
        {
            if !sectors.contains(sector) {
                return Err(SetupError::UnknownSector {
                    sector: sector.clone(),
                });
            }
        }
        for protocol in self.profile.compiled_protocols.keys() {
            if !protocols.contains(protocol) {
                return Err(SetupError::UnknownProtocol {
                    protocol: protocol.clone(),
                });
            }
        }

        for (index, wave) in self.schedule.waves.iter().enumerate() {
            let wave_index = u32::try_from(index).unwrap_or(u32::MAX);
            for entry in &wave.entries {
                match entry.kind {
                    EnemyKind::Boss => {
                        return Err(SetupError::BossInComposition { wave: wave_index })
                    }
                    EnemyKind::ZeroDay => {
                        return Err(SetupError::ZeroDayInComposition { wave: wave_index })
                    }
                    EnemyKind::Basic | EnemyKind::Fast | EnemyKind::Tank => {}
                }
            }
            if wave.pre_delay_secs < 0.0
                || wave.entries.iter().any(|entry| entry.interval_secs < 0.0)
            {
                return Err(SetupError::NegativeDuration { wave: wave_index });
            }
        }

        if self.schedule.repeat_last {
            let repeating = self.schedule.waves.last();
            let has_duration = repeating.is_some_and(|wave| {
                wave.pre_delay_secs > 0.0
                    || wave
                        .entries
                        .iter()
                        .any(|entry| entry.count > 1 && entry.interval_secs > 0.0)
            });
            if !has_duration {
                return Err(SetupError::InstantRepeatingWave);
            }
        }

        Ok(())
    }
}

fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol(fire_rate: f32) -> ProtocolDefinition {
        ProtocolDefinition {
            id: ProtocolId::new("pulse"),
            name: "Pulse".to_owned(),
            rarity: Rarity::Rare,
            base_damage: 10.0,
            base_range: 100.0,
            base_fire_rate: fire_rate,
            placement_cost: 100,
            ability: None,
        }
    }

    fn setup() -> SessionSetup {
        SessionSetup {
            profile: PlayerProfile::default(),
            schedule: WaveSchedule {
                waves: vec![WaveDefinition {
                    pre_delay_secs: 1.0,
                    entries: vec![SpawnEntry {
                        kind: EnemyKind::Basic,
                        count: 3,
                        interval_secs: 0.5,
                    }],
                }],
                growth: ThreatGrowth::default(),
                seed: 7,
                repeat_last: false,
            },
            map: MapDefinition {
                scale: 1.0,
                lanes: vec![LaneDefinition {
                    id: LaneId::new(0),
                    waypoints: vec![Vec2::ZERO, Vec2::new(100.0, 0.0)],
                }],
                slots: vec![SlotDefinition {
                    id: SlotId::new(0),
                    position: Vec2::new(0.0, 20.0),
                    sector: SectorId::new("alpha"),
                }],
                sectors: vec![SectorDefinition {
                    id: SectorId::new("alpha"),
                    display_name: "Alpha".to_owned(),
                    unlock_cost: 0,
                    prerequisites: Vec::new(),
                    required_protocols: Vec::new(),
                    lanes: vec![LaneId::new(0)],
                    boss: "cyberboss".to_owned(),
                }],
            },
            balance: BalanceConfig::default(),
            roster: vec![protocol(2.0)],
        }
    }

    #[test]
    fn level_one_stats_match_base_values() {
        let balance = BalanceConfig::default();
        let stats = TowerStats::for_level(&protocol(2.0), 1, &balance.scaling, &balance.power);
        assert_eq!(stats.damage, 10.0);
        assert_eq!(stats.range, 100.0);
        assert_eq!(stats.fire_rate, 2.0);
        assert_eq!(stats.power_draw, 20);
        assert_eq!(stats.fire_interval(), Duration::from_millis(500));
    }

    #[test]
    fn stats_grow_linearly_with_level() {
        let balance = BalanceConfig::default();
        let stats = TowerStats::for_level(&protocol(2.0), 3, &balance.scaling, &balance.power);
        assert!((stats.damage - 12.0).abs() < 1e-4);
        assert_eq!(stats.power_draw, 24);
        assert!((stats.range - 110.0).abs() < 1e-3);
    }

    #[test]
    fn upgrade_costs_grow_exponentially() {
        let scaling = BalanceConfig::default().scaling;
        assert_eq!(scaling.upgrade_cost(100, 1), 150);
        assert_eq!(scaling.upgrade_cost(100, 2), 225);
        assert_eq!(scaling.refund(225), 112);
    }

    #[test]
    fn wave_scaling_is_linear_in_wave_index() {
        let growth = ThreatGrowth {
            health_growth: 0.5,
            speed_growth: 0.0,
            reward_growth: 0.25,
            damage_growth: 0.125,
        };
        assert_eq!(growth.scaling_for(0), StatScaling::IDENTITY);
        let scaling = growth.scaling_for(4);
        assert_eq!(scaling.health, 3.0);
        assert_eq!(scaling.speed, 1.0);
        assert_eq!(scaling.reward, 2.0);
        assert_eq!(scaling.damage, 1.5);
    }

    #[test]
    fn zero_day_stats_come_from_their_own_table() {
        let mut balance = BalanceConfig::default();
        balance.zero_day.base_health = 320.0;
        balance.zero_day.defeat_hash_bonus = 90;
        let stats = balance.enemy_stats(EnemyKind::ZeroDay);
        assert_eq!(stats.health, 320.0);
        assert_eq!(stats.speed, balance.zero_day.speed);
        assert_eq!(stats.reward, 90);
        assert!(!EnemyKind::ZeroDay.is_scripted());
        assert!(EnemyKind::Tank.is_scripted());
    }

    #[test]
    fn valid_setup_passes_validation() {
        assert_eq!(setup().validate(), Ok(()));
    }

    #[test]
    fn non_positive_fire_rate_is_rejected() {
        let mut setup = setup();
        setup.roster = vec![protocol(0.0)];
        assert_eq!(
            setup.validate(),
            Err(SetupError::InvalidFireRate {
                protocol: ProtocolId::new("pulse"),
            })
        );
    }

    #[test]
    fn prerequisites_must_precede_dependants() {
        let mut setup = setup();
        setup.map.sectors[0].prerequisites = vec![SectorId::new("omega")];
        assert!(matches!(
            setup.validate(),
            Err(SetupError::PrerequisiteOrder { .. })
        ));
    }

    #[test]
    fn bosses_cannot_appear_in_wave_compositions() {
        let mut setup = setup();
        setup.schedule.waves[0].entries[0].kind = EnemyKind::Boss;
        assert_eq!(
            setup.validate(),
            Err(SetupError::BossInComposition { wave: 0 })
        );
    }

    #[test]
    fn zero_days_cannot_appear_in_wave_compositions() {
        let mut setup = setup();
        setup.schedule.waves[0].entries[0].kind = EnemyKind::ZeroDay;
        assert_eq!(
            setup.validate(),
            Err(SetupError::ZeroDayInComposition { wave: 0 })
        );
    }

    #[test]
    fn instantly_repeating_wave_is_rejected() {
        let mut setup = setup();
        setup.schedule.repeat_last = true;
        setup.schedule.waves[0].pre_delay_secs = 0.0;
        setup.schedule.waves[0].entries[0].interval_secs = 0.0;
        assert_eq!(setup.validate(), Err(SetupError::InstantRepeatingWave));
    }

    #[test]
    fn unknown_ability_kind_fails_to_deserialize() {
        let known: Result<Ability, _> =
            serde_json::from_str(r#"{"kind":"slow","factor":0.5,"duration_secs":2.0}"#);
        assert!(known.is_ok());

        let unknown: Result<Ability, _> = serde_json::from_str(r#"{"kind":"teleport"}"#);
        assert!(unknown.is_err(), "retired ability keys must fail at load");
    }

    #[test]
    fn balance_tables_without_threat_keys_load_with_defaults() {
        let mut value = serde_json::to_value(BalanceConfig::default()).expect("balance serialises");
        let table = value.as_object_mut().expect("balance is a table");
        let _ = table.remove("zero_day");
        for (section, key) in [
            ("efficiency", "leak_penalty"),
            ("efficiency", "leak_decay_interval_secs"),
            ("boss", "phase_thresholds"),
        ] {
            let _ = table
                .get_mut(section)
                .and_then(|section| section.as_object_mut())
                .and_then(|section| section.remove(key));
        }

        let loaded: BalanceConfig = serde_json::from_value(value).expect("older tables still load");
        assert_eq!(loaded, BalanceConfig::default());
    }

    #[test]
    fn schedule_repeats_last_definition_when_enabled() {
        let mut schedule = setup().schedule;
        assert!(schedule.definition(1).is_none());
        schedule.repeat_last = true;
        assert_eq!(schedule.definition(5), schedule.waves.last());
    }
}
