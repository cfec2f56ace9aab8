#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick driver that wires the Hashguard world to its systems.
//!
//! A [`Simulation`] owns the world and every pure system. Each call to
//! [`Simulation::advance`] runs one tick in a fixed order: enemy movement,
//! wave scheduling, targeting, firing, projectile flight, economy settlement
//! and finally boss timers. Player commands go through
//! [`Simulation::execute`] and never run while a tick is in progress.

mod record;

use std::time::Duration;

use hashguard_core::{
    BossPhase, Command, CommandError, EnemyView, Event, PlayerCommand, ProjectileView,
    SessionSetup, SetupError, TowerTarget, TowerView, WaveProgress,
};
use hashguard_system_economy::offline_earnings;
use hashguard_system_spawning::{SpawnGate, WaveScheduler};
use hashguard_system_tower_combat::{ProjectileFlight, TowerCombat};
use hashguard_system_tower_targeting::TowerTargeting;
use hashguard_world::{self as world, query, World};
use tracing::{debug, info};

pub use record::{RecordError, SessionRecord, RECORD_HEADER};

/// Single-threaded session driver.
#[derive(Debug)]
pub struct Simulation {
    setup: SessionSetup,
    world: World,
    scheduler: WaveScheduler,
    targeting: TowerTargeting,
    combat: TowerCombat,
    flight: ProjectileFlight,
    targets: Vec<TowerTarget>,
    outbox: Vec<Event>,
    mid_update: bool,
}

impl Simulation {
    /// Creates a fresh session from a setup.
    pub fn create(setup: SessionSetup) -> Result<Self, SetupError> {
        let world = World::new(&setup)?;
        let scheduler = WaveScheduler::new(
            setup.schedule.clone(),
            setup.balance.boss.spawn_wave_interval,
        )
        .with_zero_day(setup.balance.zero_day.min_waves_before_spawn);
        info!(
            waves = setup.schedule.waves.len(),
            hash = query::hash(&world),
            "session created"
        );
        Ok(Self::assemble(setup, world, scheduler))
    }

    /// Resumes a session from a record captured against the same setup.
    pub fn resume(setup: SessionSetup, record: SessionRecord) -> Result<Self, SetupError> {
        let SessionRecord { world, waves } = record;
        let world = World::restore(&setup, world)?;
        let scheduler = WaveScheduler::restore(
            setup.schedule.clone(),
            setup.balance.boss.spawn_wave_interval,
            waves,
        )?
        .with_zero_day(setup.balance.zero_day.min_waves_before_spawn);
        info!(
            tick = query::tick_index(&world),
            wave = waves.wave,
            "session resumed"
        );
        Ok(Self::assemble(setup, world, scheduler))
    }

    fn assemble(setup: SessionSetup, world: World, scheduler: WaveScheduler) -> Self {
        Self {
            setup,
            world,
            scheduler,
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            flight: ProjectileFlight::new(),
            targets: Vec::new(),
            outbox: Vec::new(),
            mid_update: false,
        }
    }

    /// Advances the session by `dt` and returns the events of the tick.
    ///
    /// A paused session does not advance and reports nothing.
    pub fn advance(&mut self, dt: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        if query::is_paused(&self.world) {
            return events;
        }

        self.mid_update = true;
        self.apply(Command::Tick { dt }, &mut events);
        self.schedule_waves(&mut events);
        self.resolve_combat(dt, &mut events);
        self.apply(Command::SettleEconomy { dt }, &mut events);
        self.apply(Command::AdvanceBoss { dt }, &mut events);
        self.mid_update = false;

        for event in &events {
            match event {
                Event::WaveStarted { wave } => info!(wave, "wave started"),
                Event::WaveCleared { wave } => info!(wave, "wave cleared"),
                Event::SystemRecovered { method, .. } => info!(?method, "system recovered"),
                _ => {}
            }
        }
        events
    }

    fn apply(&mut self, command: Command, events: &mut Vec<Event>) {
        world::apply(&mut self.world, command, events);
    }

    fn schedule_waves(&mut self, events: &mut Vec<Event>) {
        let gate = SpawnGate {
            frozen: query::is_frozen(&self.world),
            boss_engaged: query::boss_engaged(&self.world),
        };
        let mut commands = Vec::new();
        let mut scheduled = Vec::new();
        self.scheduler
            .handle(events, gate, &mut commands, &mut scheduled);
        events.append(&mut scheduled);
        for command in commands {
            self.apply(command, events);
        }
    }

    fn resolve_combat(&mut self, dt: Duration, events: &mut Vec<Event>) {
        let frozen = query::is_frozen(&self.world);
        let towers = query::tower_view(&self.world);
        let enemies = query::enemy_view(&self.world);
        self.targeting
            .handle(frozen, &towers, &enemies, &mut self.targets);

        let mut commands = Vec::new();
        self.combat.handle(
            frozen,
            dt,
            query::tower_cooldowns(&self.world),
            &self.targets,
            &mut commands,
        );
        for command in commands.drain(..) {
            self.apply(command, events);
        }

        let projectiles = query::projectile_view(&self.world);
        let enemies = query::enemy_view(&self.world);
        self.flight.handle(
            dt,
            &projectiles,
            &enemies,
            self.setup.balance.combat.impact_epsilon,
            &mut commands,
        );
        for command in commands {
            self.apply(command, events);
        }
    }

    /// Validates and applies a player command.
    ///
    /// Events produced by the command, including the gate tap reported by a
    /// rejected snapped placement, are queued for [`Simulation::take_events`].
    pub fn execute(&mut self, command: PlayerCommand) -> Result<(), CommandError> {
        world::execute(&mut self.world, command, &mut self.outbox)
    }

    /// Drains the events queued by player commands.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    /// Credits hash earned while the session was closed.
    ///
    /// Returns the hash actually credited after the storage cap.
    pub fn credit_offline(&mut self, elapsed: Duration) -> u64 {
        let earned = offline_earnings(elapsed, &self.setup.profile, &self.setup.balance.economy);
        let before = query::hash(&self.world);
        let mut ignored = Vec::new();
        self.apply(Command::CreditHash { amount: earned }, &mut ignored);
        let credited = query::hash(&self.world).saturating_sub(before);
        info!(secs = elapsed.as_secs(), earned, credited, "offline earnings credited");
        credited
    }

    /// Captures the settled session.
    pub fn record(&self) -> Result<SessionRecord, RecordError> {
        if self.mid_update {
            return Err(RecordError::MidUpdate);
        }
        debug!(tick = query::tick_index(&self.world), "session recorded");
        Ok(SessionRecord {
            world: self.world.record(),
            waves: self.scheduler.progress(),
        })
    }

    /// Reports whether a tick is in progress.
    #[must_use]
    pub fn is_mid_update(&self) -> bool {
        self.mid_update
    }

    /// Read-only access to the world for [`hashguard_world::query`].
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Wave pointer of the scheduler.
    #[must_use]
    pub fn waves(&self) -> WaveProgress {
        self.scheduler.progress()
    }

    /// Captures a read-only summary of the session.
    #[must_use]
    pub fn snapshot(&self) -> SimulationSnapshot {
        let world = &self.world;
        SimulationSnapshot {
            tick_index: query::tick_index(world),
            hash: query::hash(world),
            hash_capacity: query::hash_capacity(world),
            power_used: query::power_used(world),
            power_capacity: query::power_capacity(world),
            efficiency: query::efficiency(world),
            frozen: query::is_frozen(world),
            paused: query::is_paused(world),
            waves: self.scheduler.progress(),
            boss: query::boss_phase(world).clone(),
            towers: query::tower_view(world),
            enemies: query::enemy_view(world),
            projectiles: query::projectile_view(world),
        }
    }
}

/// Read-only summary of a session between ticks.
#[derive(Clone, Debug)]
pub struct SimulationSnapshot {
    /// Ticks processed since the session began.
    pub tick_index: u64,
    /// Current hash balance.
    pub hash: u64,
    /// Storage capacity capping the balance.
    pub hash_capacity: u64,
    /// Power drawn by all towers.
    pub power_used: u32,
    /// Power the grid can supply.
    pub power_capacity: u32,
    /// Efficiency between zero and one hundred.
    pub efficiency: f32,
    /// Whether the system is frozen.
    pub frozen: bool,
    /// Whether advancement is paused.
    pub paused: bool,
    /// Wave pointer of the scheduler.
    pub waves: WaveProgress,
    /// Boss encounter phase.
    pub boss: BossPhase,
    /// Towers on the board.
    pub towers: TowerView,
    /// Enemies on the board.
    pub enemies: EnemyView,
    /// Projectiles in flight.
    pub projectiles: ProjectileView,
}
