#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Hashguard simulation.
//!
//! This crate defines the message surface that connects the tick driver, the
//! authoritative world, and pure systems. Systems read immutable views and
//! respond with [`Command`] batches, the world executes those commands via its
//! `apply` entry point and broadcasts [`Event`] values. Player intent arrives
//! as [`PlayerCommand`] values which are validated before any mutation and
//! rejected with a typed [`CommandError`].

pub mod config;
mod error;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use config::{
    Ability, BalanceConfig, BossBalance, BossDifficulty, CombatBalance, DifficultyModifier,
    DifficultyTable, EconomyBalance, EfficiencyBalance, EnemyKind, EnemyRoster, EnemyStats,
    LaneDefinition, MapDefinition, PlacementBalance, PlayerProfile, PowerBalance,
    ProtocolDefinition, ProtocolScaling, Rarity, RarityTable, SectorDefinition, SessionSetup,
    SlotDefinition, SpawnEntry, ThreatGrowth, TowerStats, WaveDefinition, WaveSchedule,
};
pub use error::{CommandError, SetupError};

/// Commands that express all internal world mutations issued by systems.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock and moves enemies along their lanes.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a wave enemy be inserted on one of the open lanes.
    SpawnEnemy {
        /// Archetype of the enemy to create.
        kind: EnemyKind,
        /// Zero-based wave index the enemy belongs to.
        wave: u32,
        /// Deterministic roll used to choose among the open lanes.
        lane_roll: u32,
        /// Multipliers applied once to the archetype's base stats.
        scaling: StatScaling,
    },
    /// Requests that the sector boss for the current progression be spawned.
    SpawnBoss {
        /// Zero-based wave index that triggered the boss.
        wave: u32,
    },
    /// Requests that a Zero-Day intruder be inserted on one of the open lanes.
    ///
    /// Ignored while another Zero-Day is alive.
    SpawnZeroDay {
        /// Zero-based wave index that let the intruder in.
        wave: u32,
        /// Deterministic roll used to choose among the open lanes.
        lane_roll: u32,
        /// Multipliers applied once to the intruder's base stats.
        scaling: StatScaling,
    },
    /// Requests that a tower launch one or more projectiles at a target.
    FireProjectile {
        /// Tower launching the projectiles.
        tower: TowerId,
        /// Enemy the projectiles track.
        target: EnemyId,
        /// Number of projectiles released during this tick.
        shots: u32,
    },
    /// Stores the tower's remaining cooldown and current target after combat.
    RearmTower {
        /// Tower being updated.
        tower: TowerId,
        /// Target selected this tick, if any.
        target: Option<EnemyId>,
        /// Time remaining until the tower may fire again.
        ready_in: Duration,
    },
    /// Moves an in-flight projectile toward its target.
    MoveProjectile {
        /// Projectile being advanced.
        projectile: ProjectileId,
        /// Position after the move.
        position: Vec2,
        /// Remaining lifetime after the move.
        lifetime: Duration,
    },
    /// Resolves a projectile hit against its target.
    ImpactProjectile {
        /// Projectile that reached its target or expired.
        projectile: ProjectileId,
    },
    /// Removes a projectile whose target vanished before impact.
    DiscardProjectile {
        /// Projectile being removed.
        projectile: ProjectileId,
    },
    /// Recomputes power usage, ticks efficiency and accrues passive income.
    SettleEconomy {
        /// Duration of simulated time covered by the settlement.
        dt: Duration,
    },
    /// Advances boss encounter timers.
    AdvanceBoss {
        /// Duration of simulated time that elapsed.
        dt: Duration,
    },
    /// Credits hash earned outside the tick loop, capped by storage.
    CreditHash {
        /// Hash offered to the ledger.
        amount: u64,
    },
}

/// Player-issued requests validated by the world before mutating state.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerCommand {
    /// Places a tower built from a compiled protocol into a specific slot.
    PlaceTower {
        /// Protocol the tower is built from.
        protocol: ProtocolId,
        /// Slot that receives the tower.
        slot: SlotId,
    },
    /// Places a tower at the slot nearest to a screen position.
    PlaceTowerAt {
        /// Protocol the tower is built from.
        protocol: ProtocolId,
        /// Screen-space point where the drag ended.
        screen: Vec2,
        /// Camera used to translate the screen point into game space.
        camera: Camera,
    },
    /// Sells a tower, refunding part of the hash invested in it.
    SellTower {
        /// Tower being sold.
        tower: TowerId,
    },
    /// Upgrades a tower by a single level.
    UpgradeTower {
        /// Tower being upgraded.
        tower: TowerId,
    },
    /// Engages the active boss at the selected difficulty.
    EngageBoss {
        /// Difficulty tier chosen by the player.
        difficulty: BossDifficulty,
    },
    /// Flees or loses the active boss encounter.
    RetreatFromBoss,
    /// Reports damage dealt to the engaged boss by the encounter mode.
    DamageBoss {
        /// Damage dealt since the previous report.
        amount: f32,
    },
    /// Unlocks a sector by paying its remaining cost in one step.
    UnlockSector {
        /// Sector being unlocked.
        sector: SectorId,
    },
    /// Credits hash toward a future sector unlock.
    AddPartialPayment {
        /// Sector receiving the payment.
        sector: SectorId,
        /// Hash offered toward the unlock.
        amount: u64,
    },
    /// Reports that the player tapped a sector gate on the board.
    TapSectorGate {
        /// Sector whose gate was tapped.
        sector: SectorId,
    },
    /// Pays a share of current hash to restore efficiency.
    FlushMemory,
    /// Reports that the player completed the manual override minigame.
    ManualOverrideSuccess,
    /// Pauses or resumes simulation advancement.
    SetPaused {
        /// Whether the simulation should be paused.
        paused: bool,
    },
    /// Applies a new power capacity after a component change.
    SetPowerCapacity {
        /// New power capacity.
        capacity: u32,
    },
}

/// Events broadcast by the world and systems while the simulation advances.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that a wave began spawning.
    WaveStarted {
        /// Zero-based wave index.
        wave: u32,
    },
    /// Announces that every enemy of a wave has spawned.
    WaveCleared {
        /// Zero-based wave index.
        wave: u32,
    },
    /// Confirms that an enemy entered the board.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Archetype of the enemy.
        kind: EnemyKind,
        /// Lane the enemy walks.
        lane: LaneId,
        /// Wave the enemy belongs to.
        wave: u32,
    },
    /// Reports that a Zero-Day was destroyed and part of the efficiency it
    /// drained came back.
    ZeroDayPurged {
        /// Identifier of the destroyed intruder.
        enemy: EnemyId,
        /// Efficiency after the restore.
        efficiency: f32,
    },
    /// Confirms that an enemy was destroyed by tower fire.
    EnemyKilled {
        /// Identifier of the destroyed enemy.
        enemy: EnemyId,
        /// Hash credited for the kill.
        reward: u64,
        /// Tower whose projectile landed the final hit.
        tower: TowerId,
    },
    /// Reports that an enemy reached the end of its lane.
    EnemyBreached {
        /// Identifier of the enemy that breached.
        enemy: EnemyId,
        /// Whether the enemy was a boss.
        boss: bool,
    },
    /// Confirms that a tower released a projectile.
    ProjectileFired {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Tower that released it.
        tower: TowerId,
        /// Enemy the projectile tracks.
        target: EnemyId,
    },
    /// Reports that a projectile was removed without dealing damage.
    ProjectileDiscarded {
        /// Identifier of the discarded projectile.
        projectile: ProjectileId,
    },
    /// Confirms a tower placement.
    TowerPlaced {
        /// Identifier assigned to the tower.
        tower: TowerId,
        /// Slot the tower occupies.
        slot: SlotId,
        /// Protocol the tower was built from.
        protocol: ProtocolId,
    },
    /// Confirms a tower sale.
    TowerSold {
        /// Identifier of the sold tower.
        tower: TowerId,
        /// Slot freed by the sale.
        slot: SlotId,
        /// Hash refunded to the player.
        refund: u64,
    },
    /// Confirms a tower upgrade.
    TowerUpgraded {
        /// Identifier of the upgraded tower.
        tower: TowerId,
        /// Level reached.
        level: u32,
    },
    /// Reports that power usage exceeded capacity.
    PowerOverloaded {
        /// Power drawn by all towers.
        used: u32,
        /// Available capacity.
        capacity: u32,
    },
    /// Reports that power usage returned within capacity.
    PowerRestored {
        /// Power drawn by all towers.
        used: u32,
        /// Available capacity.
        capacity: u32,
    },
    /// Reports that efficiency fell below the warning threshold.
    EfficiencyWarning {
        /// Efficiency after the drop.
        efficiency: f32,
    },
    /// Announces that efficiency reached zero and the system froze.
    SystemFrozen,
    /// Announces a successful recovery action.
    SystemRecovered {
        /// Recovery path that restored efficiency.
        method: RecoveryMethod,
        /// Efficiency after recovery.
        efficiency: f32,
        /// Hash paid for the recovery.
        cost: u64,
    },
    /// Announces that a boss entered the board.
    BossSpawned {
        /// Enemy record representing the boss.
        enemy: EnemyId,
        /// Sector the boss belongs to.
        sector: SectorId,
    },
    /// Raises the player-facing boss alert.
    BossAlerted {
        /// Sector the boss belongs to.
        sector: SectorId,
    },
    /// Confirms that the player engaged the boss.
    BossEngaged {
        /// Sector the boss belongs to.
        sector: SectorId,
        /// Difficulty selected for the encounter.
        difficulty: BossDifficulty,
    },
    /// Reports that the engaged boss fell through a health threshold.
    BossPhaseChanged {
        /// Sector the boss belongs to.
        sector: SectorId,
        /// Phase entered, from two upward.
        phase: u8,
    },
    /// Confirms that the boss was defeated.
    BossDefeated {
        /// Sector the boss belongs to.
        sector: SectorId,
        /// Hash awarded for the victory.
        reward: u64,
        /// Whether this was the first victory against the sector's boss.
        first_kill: bool,
    },
    /// Confirms that the player left the encounter without a victory.
    BossRetreated {
        /// Sector the boss belongs to.
        sector: SectorId,
    },
    /// Reports that an ignored boss reached the objective.
    BossEscaped {
        /// Sector the boss belongs to.
        sector: SectorId,
    },
    /// Reports that the player tapped a sector gate.
    SectorGateTapped {
        /// Sector whose gate was tapped.
        sector: SectorId,
        /// Whether the sector could be unlocked right now.
        unlockable: bool,
    },
    /// Confirms a partial payment toward a sector unlock.
    SectorPaymentRecorded {
        /// Sector receiving the payment.
        sector: SectorId,
        /// Total hash paid so far.
        paid: u64,
        /// Unlock cost of the sector.
        cost: u64,
    },
    /// Confirms that a sector was unlocked.
    SectorUnlocked {
        /// Sector that became available.
        sector: SectorId,
    },
    /// Announces a pause state change.
    PauseChanged {
        /// Whether the simulation is now paused.
        paused: bool,
    },
}

/// Recovery paths that lift a system freeze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecoveryMethod {
    /// Paid memory flush.
    FlushMemory,
    /// Completed manual override minigame.
    ManualOverride,
}

/// Camera parameters used to translate screen points into game space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Game-space point shown at the screen origin.
    pub offset: Vec2,
    /// Zoom factor; values below one show more of the board.
    pub zoom: f32,
}

impl Camera {
    /// Creates a camera description.
    #[must_use]
    pub const fn new(offset: Vec2, zoom: f32) -> Self {
        Self { offset, zoom }
    }

    /// Translates a screen-space point into game space.
    ///
    /// Non-positive zoom values are treated as the smallest supported zoom so
    /// the translation never divides by zero.
    #[must_use]
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        screen / self.effective_zoom() + self.offset
    }

    /// Zoom factor clamped to the supported range.
    #[must_use]
    pub fn effective_zoom(&self) -> f32 {
        self.zoom.max(MIN_CAMERA_ZOOM)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 1.0)
    }
}

/// Smallest zoom factor honoured by [`Camera`].
pub const MIN_CAMERA_ZOOM: f32 = 0.1;

/// Multipliers applied to an enemy archetype when it spawns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatScaling {
    /// Multiplier applied to health.
    pub health: f32,
    /// Multiplier applied to movement speed.
    pub speed: f32,
    /// Multiplier applied to the kill reward.
    pub reward: f32,
    /// Multiplier applied to the efficiency damage of a breach.
    #[serde(default = "unit_multiplier")]
    pub damage: f32,
}

impl StatScaling {
    /// Scaling that leaves base stats untouched.
    pub const IDENTITY: Self = Self {
        health: 1.0,
        speed: 1.0,
        reward: 1.0,
        damage: 1.0,
    };
}

fn unit_multiplier() -> f32 {
    1.0
}

impl Default for StatScaling {
    fn default() -> Self {
        Self::IDENTITY
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }
    };
}

numeric_id!(
    /// Unique identifier assigned to a tower.
    TowerId
);
numeric_id!(
    /// Unique identifier assigned to an enemy.
    EnemyId
);
numeric_id!(
    /// Unique identifier assigned to a projectile.
    ProjectileId
);
numeric_id!(
    /// Unique identifier of a tower slot on the map.
    SlotId
);
numeric_id!(
    /// Unique identifier of an enemy lane on the map.
    LaneId
);

/// Identifier of a board sector.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorId(String);

impl SectorId {
    /// Creates a sector identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// String form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a protocol template.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolId(String);

impl ProtocolId {
    /// Creates a protocol identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// String form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable representation of a single tower used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Protocol the tower was built from.
    pub protocol: ProtocolId,
    /// Slot the tower occupies.
    pub slot: SlotId,
    /// Game-space position of the tower.
    pub position: Vec2,
    /// Current upgrade level, starting at one.
    pub level: u32,
    /// Rarity inherited from the protocol.
    pub rarity: Rarity,
    /// Level-scaled combat and power statistics.
    pub stats: TowerStats,
    /// Time remaining until the tower may fire again.
    pub ready_in: Duration,
    /// Enemy the tower currently tracks, if any.
    pub target: Option<EnemyId>,
    /// Special effect applied by the tower's projectiles.
    pub ability: Option<Ability>,
}

/// Read-only snapshot describing all towers in ascending id order.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a tower snapshot by identifier.
    #[must_use]
    pub fn get(&self, id: TowerId) -> Option<&TowerSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of towers captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no towers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single enemy used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Unique identifier assigned to the enemy.
    pub id: EnemyId,
    /// Archetype of the enemy.
    pub kind: EnemyKind,
    /// Lane the enemy walks.
    pub lane: LaneId,
    /// Game-space position of the enemy.
    pub position: Vec2,
    /// Fraction of the lane already covered, between zero and one.
    pub progress: f32,
    /// Remaining health.
    pub health: f32,
    /// Health at spawn (or after boss difficulty scaling).
    pub max_health: f32,
    /// Base movement speed in game units per second.
    pub speed: f32,
    /// Hash credited when the enemy is killed.
    pub reward: u64,
    /// Whether a slow effect currently applies.
    pub slowed: bool,
    /// Whether the enemy is a sector boss.
    pub boss: bool,
}

impl EnemySnapshot {
    /// Reports whether towers may select the enemy as a target.
    #[must_use]
    pub const fn targetable(&self) -> bool {
        !self.boss
    }
}

/// Read-only snapshot describing all enemies in ascending id order.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up an enemy snapshot by identifier.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&EnemySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of enemies captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of an in-flight projectile.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Unique identifier assigned to the projectile.
    pub id: ProjectileId,
    /// Tower that released the projectile.
    pub tower: TowerId,
    /// Enemy the projectile tracks.
    pub target: EnemyId,
    /// Current game-space position.
    pub position: Vec2,
    /// Travel speed in game units per second.
    pub speed: f32,
    /// Damage applied on impact.
    pub damage: f32,
    /// Time left before the projectile resolves regardless of distance.
    pub lifetime: Duration,
}

/// Read-only snapshot describing all projectiles in ascending id order.
#[derive(Clone, Debug, Default)]
pub struct ProjectileView {
    snapshots: Vec<ProjectileSnapshot>,
}

impl ProjectileView {
    /// Creates a new projectile view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ProjectileSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured projectile snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectileSnapshot> {
        self.snapshots.iter()
    }

    /// Number of projectiles captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no projectiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ProjectileSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a tower slot.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotSnapshot {
    /// Identifier of the slot.
    pub id: SlotId,
    /// Game-space position of the slot.
    pub position: Vec2,
    /// Sector that owns the slot.
    pub sector: SectorId,
    /// Tower occupying the slot, if any.
    pub occupant: Option<TowerId>,
}

impl SlotSnapshot {
    /// Reports whether a tower currently occupies the slot.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

/// Cooldown state of a tower used by the combat system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerCooldownSnapshot {
    /// Tower described by the snapshot.
    pub tower: TowerId,
    /// Time remaining until the tower may fire again.
    pub ready_in: Duration,
    /// Time between consecutive shots.
    pub fire_interval: Duration,
    /// Target the tower tracked at the end of the previous tick.
    pub target: Option<EnemyId>,
}

/// Read-only snapshot of all tower cooldowns in ascending tower order.
#[derive(Clone, Debug, Default)]
pub struct TowerCooldownView {
    snapshots: Vec<TowerCooldownSnapshot>,
}

impl TowerCooldownView {
    /// Creates a new cooldown view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerCooldownSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.tower);
        Self { snapshots }
    }

    /// Iterator over the captured cooldowns in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerCooldownSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerCooldownSnapshot> {
        self.snapshots
    }
}

/// Target assignment computed for a tower during a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerTarget {
    /// Tower that acquired the target.
    pub tower: TowerId,
    /// Enemy selected as the target.
    pub enemy: EnemyId,
    /// Squared distance between the tower and the enemy.
    pub distance_sq: f32,
}

/// Phases of the per-wave spawning state machine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum WavePhase {
    /// Counting down the wave's pre-delay.
    Pending {
        /// Time left before the wave starts spawning.
        remaining: Duration,
    },
    /// Emitting spawns for the wave's composition entries.
    Spawning {
        /// Index of the composition entry being spawned.
        entry: usize,
        /// Enemies already spawned for the current entry.
        spawned: u32,
        /// Time left until the next spawn.
        next_in: Duration,
    },
    /// Every wave of a finite schedule has spawned.
    Exhausted,
}

/// Persistent wave pointer captured between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveProgress {
    /// Zero-based index of the current wave.
    pub wave: u32,
    /// Phase of the current wave.
    pub phase: WavePhase,
    /// Enemies spawned so far during the current wave.
    pub spawned_in_wave: u32,
}

/// Boss encounter sub-state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BossPhase {
    /// No boss is on the board.
    Dormant,
    /// A boss entered the board and the alert is counting down.
    Spawned {
        /// Enemy record representing the boss.
        enemy: EnemyId,
        /// Sector the boss belongs to.
        sector: SectorId,
        /// Time left until the alert is raised.
        alert_in: Duration,
    },
    /// The player has been alerted and may engage.
    Alerted {
        /// Enemy record representing the boss.
        enemy: EnemyId,
        /// Sector the boss belongs to.
        sector: SectorId,
    },
    /// The encounter mode owns combat against the boss.
    Engaged {
        /// Enemy record representing the boss.
        enemy: EnemyId,
        /// Sector the boss belongs to.
        sector: SectorId,
        /// Difficulty selected by the player.
        difficulty: BossDifficulty,
        /// Boss health before difficulty scaling.
        pre_engagement_health: f32,
        /// Boss maximum health before difficulty scaling.
        pre_engagement_max_health: f32,
    },
}

impl BossPhase {
    /// Reports whether a boss is on the board.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Dormant)
    }

    /// Reports whether the encounter mode currently owns the boss.
    #[must_use]
    pub const fn is_engaged(&self) -> bool {
        matches!(self, Self::Engaged { .. })
    }

    /// Enemy record representing the active boss.
    #[must_use]
    pub fn enemy(&self) -> Option<EnemyId> {
        match self {
            Self::Dormant => None,
            Self::Spawned { enemy, .. }
            | Self::Alerted { enemy, .. }
            | Self::Engaged { enemy, .. } => Some(*enemy),
        }
    }

    /// Sector the active boss belongs to.
    #[must_use]
    pub fn sector(&self) -> Option<&SectorId> {
        match self {
            Self::Dormant => None,
            Self::Spawned { sector, .. }
            | Self::Alerted { sector, .. }
            | Self::Engaged { sector, .. } => Some(sector),
        }
    }

    /// Difficulty selected for the running encounter.
    #[must_use]
    pub const fn difficulty(&self) -> Option<BossDifficulty> {
        match self {
            Self::Engaged { difficulty, .. } => Some(*difficulty),
            _ => None,
        }
    }
}
