#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Hashguard.
//!
//! The world owns every mutable record of a session: the economy ledger,
//! towers, enemies, projectiles, slots, sector progression and the boss
//! encounter. Systems mutate it only through [`apply`], players only through
//! [`execute`], and everything else reads it through the [`query`] module.

mod enemies;
mod projectiles;
mod record;
mod sectors;
mod towers;

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use hashguard_core::{
    Ability, BalanceConfig, BossDifficulty, BossPhase, Camera, Command, CommandError, EnemyId,
    EnemyKind, Event, LaneId, MapDefinition, PlayerCommand, ProjectileId, ProtocolDefinition,
    ProtocolId, SectorDefinition, SectorId, SessionSetup, SetupError, SlotId, SlotSnapshot,
    StatScaling, TowerId, TowerStats,
};
use hashguard_system_boss::{choose_sector, BossEncounter};
use hashguard_system_economy::{Ledger, LedgerState};
use hashguard_system_placement as placement;
use tracing::{debug, info, warn};

use enemies::{EnemyRegistry, EnemySeed, Lane};
use projectiles::{Launch, ProjectileRegistry};
use sectors::{Progression, SlotState};
use towers::{TowerRegistry, TowerSeed};

pub use record::WorldRecord;

/// Represents the authoritative Hashguard world state.
#[derive(Debug)]
pub struct World {
    map: MapDefinition,
    lanes: BTreeMap<LaneId, Lane>,
    roster: BTreeMap<ProtocolId, ProtocolDefinition>,
    balance: BalanceConfig,
    ledger: Ledger,
    towers: TowerRegistry,
    enemies: EnemyRegistry,
    projectiles: ProjectileRegistry,
    slots: BTreeMap<SlotId, SlotState>,
    progression: Progression,
    boss: BossEncounter,
    paused: bool,
    tick_index: u64,
}

impl World {
    /// Creates a fresh world from a validated session setup.
    pub fn new(setup: &SessionSetup) -> Result<Self, SetupError> {
        setup.validate()?;
        let ledger = Ledger::new(
            LedgerState::from_profile(&setup.profile, &setup.balance),
            &setup.balance,
        );
        let progression = Progression::from_profile(&setup.profile, &setup.map);
        let boss = BossEncounter::new(setup.balance.boss);
        Ok(Self::assemble(setup, ledger, progression, boss))
    }

    fn assemble(
        setup: &SessionSetup,
        ledger: Ledger,
        progression: Progression,
        boss: BossEncounter,
    ) -> Self {
        Self {
            lanes: setup
                .map
                .lanes
                .iter()
                .map(|lane| (lane.id, Lane::new(lane)))
                .collect(),
            roster: setup
                .roster
                .iter()
                .map(|protocol| (protocol.id.clone(), protocol.clone()))
                .collect(),
            slots: sectors::slots_from_map(&setup.map),
            map: setup.map.clone(),
            balance: setup.balance.clone(),
            ledger,
            towers: TowerRegistry::new(),
            enemies: EnemyRegistry::new(),
            projectiles: ProjectileRegistry::new(ProjectileId::new(0)),
            progression,
            boss,
            paused: false,
            tick_index: 0,
        }
    }

    fn advance_enemies(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let held = match self.boss.phase() {
            BossPhase::Engaged { enemy, .. } => Some(*enemy),
            _ => None,
        };

        let mut breached = Vec::new();
        for enemy in self.enemies.iter_mut() {
            if Some(enemy.id) == held {
                continue;
            }
            let Some(lane) = self.lanes.get(&enemy.lane) else {
                warn!(enemy = enemy.id.get(), lane = enemy.lane.get(), "enemy on unknown lane");
                continue;
            };
            if enemy.advance(lane, dt) {
                breached.push((enemy.id, enemy.boss, enemy.damage));
            }
        }

        for (enemy, boss, damage) in breached {
            out_events.push(Event::EnemyBreached { enemy, boss });
            self.remove_enemy(enemy, out_events);
            self.ledger.record_leak(damage, out_events);
            if boss {
                if let Some(sector) = self.boss.escaped(out_events) {
                    info!(%sector, "boss reached the objective");
                }
            }
        }
    }

    fn spawn_enemy(
        &mut self,
        kind: EnemyKind,
        wave: u32,
        lane_roll: u32,
        scaling: StatScaling,
        out_events: &mut Vec<Event>,
    ) {
        debug_assert!(kind.is_scripted(), "{kind:?} spawns through its own command");
        if !kind.is_scripted() {
            warn!(wave, ?kind, "unscripted enemy requested by a wave composition, skipped");
            return;
        }

        let Some(lane) = self.pick_lane(lane_roll) else {
            warn!(wave, ?kind, "no open lane for spawn, skipped");
            return;
        };
        let stats = self.balance.enemy_stats(kind).scaled(scaling);
        let enemy = self.enemies.insert(
            EnemySeed {
                kind,
                lane,
                wave,
                start: self.lanes.get(&lane).map_or(Vec2::ZERO, Lane::start),
                health: stats.health,
                speed: stats.speed,
                reward: stats.reward,
                damage: scaling.damage,
            },
            false,
        );
        debug!(enemy = enemy.get(), ?kind, wave, lane = lane.get(), "enemy spawned");
        out_events.push(Event::EnemySpawned {
            enemy,
            kind,
            lane,
            wave,
        });
    }

    fn pick_lane(&self, lane_roll: u32) -> Option<LaneId> {
        let lanes = self.progression.open_lanes(&self.map);
        if lanes.is_empty() {
            return None;
        }
        Some(lanes[lane_roll as usize % lanes.len()])
    }

    fn spawn_zero_day(
        &mut self,
        wave: u32,
        lane_roll: u32,
        scaling: StatScaling,
        out_events: &mut Vec<Event>,
    ) {
        if self.enemies.count_of(EnemyKind::ZeroDay) > 0 {
            debug!(wave, "zero-day already on the board, request ignored");
            return;
        }
        let Some(lane) = self.pick_lane(lane_roll) else {
            warn!(wave, "no open lane for zero-day, skipped");
            return;
        };

        // The kill bonus ignores wave growth.
        let stats = self.balance.enemy_stats(EnemyKind::ZeroDay);
        let enemy = self.enemies.insert(
            EnemySeed {
                kind: EnemyKind::ZeroDay,
                lane,
                wave,
                start: self.lanes.get(&lane).map_or(Vec2::ZERO, Lane::start),
                health: stats.health * scaling.health,
                speed: stats.speed * scaling.speed,
                reward: stats.reward,
                damage: scaling.damage,
            },
            false,
        );
        info!(enemy = enemy.get(), wave, lane = lane.get(), "zero-day intrusion");
        out_events.push(Event::EnemySpawned {
            enemy,
            kind: EnemyKind::ZeroDay,
            lane,
            wave,
        });
    }

    fn spawn_boss(&mut self, wave: u32, out_events: &mut Vec<Event>) {
        if self.boss.phase().is_active() {
            debug!(wave, "boss already on the board, request ignored");
            return;
        }

        let progression = &self.progression;
        let Some(sector) = choose_sector(
            &self.map,
            |id| progression.is_unlocked(id),
            |id| progression.defeated.contains(id),
        )
        .cloned() else {
            debug!(wave, "no unlocked sector to host a boss");
            return;
        };
        let Some(lane) = self
            .map
            .sector(&sector)
            .and_then(|definition| definition.lanes.first().copied())
        else {
            warn!(%sector, "boss sector has no lane, skipped");
            return;
        };

        let stats = self.balance.enemy_stats(EnemyKind::Boss);
        let enemy = self.enemies.insert(
            EnemySeed {
                kind: EnemyKind::Boss,
                lane,
                wave,
                start: self.lanes.get(&lane).map_or(Vec2::ZERO, Lane::start),
                health: stats.health,
                speed: stats.speed,
                reward: stats.reward,
                damage: 1.0,
            },
            true,
        );
        out_events.push(Event::EnemySpawned {
            enemy,
            kind: EnemyKind::Boss,
            lane,
            wave,
        });
        info!(%sector, wave, "boss spawned");
        let _ = self.boss.spawned(enemy, sector, out_events);
    }

    fn fire(&mut self, tower: TowerId, target: EnemyId, shots: u32, out_events: &mut Vec<Event>) {
        let Some(state) = self.towers.get(tower) else {
            warn!(tower = tower.get(), "fire request for unknown tower");
            return;
        };
        if self.enemies.get(target).is_none() {
            warn!(tower = tower.get(), enemy = target.get(), "fire request for missing target");
            return;
        }

        let launch = Launch {
            tower,
            target,
            origin: state.position,
            speed: self.balance.combat.projectile_speed,
            damage: state.stats.damage,
            lifetime: self.balance.combat.projectile_lifetime(),
            ability: state.ability,
        };
        for _ in 0..shots {
            let projectile = self.projectiles.launch(launch);
            out_events.push(Event::ProjectileFired {
                projectile,
                tower,
                target,
            });
        }
    }

    fn resolve_impact(&mut self, projectile: ProjectileId, out_events: &mut Vec<Event>) {
        // Projectiles drained by an earlier kill in the same batch are gone.
        let Some(shot) = self.projectiles.remove(projectile) else {
            return;
        };

        let impact_point = self.enemies.get(shot.target).map(|enemy| enemy.position);
        debug_assert!(impact_point.is_some(), "projectile outlived its target");
        let Some(impact_point) = impact_point else {
            warn!(projectile = projectile.get(), "projectile target vanished, discarded");
            out_events.push(Event::ProjectileDiscarded { projectile });
            return;
        };

        let splash = match shot.ability {
            Some(Ability::Splash { radius, fraction }) => {
                let radius_sq = radius * radius;
                let bystanders: Vec<EnemyId> = self
                    .enemies
                    .iter()
                    .filter(|enemy| {
                        enemy.id != shot.target
                            && !enemy.boss
                            && enemy.position.distance_squared(impact_point) <= radius_sq
                    })
                    .map(|enemy| enemy.id)
                    .collect();
                Some((bystanders, shot.damage * fraction))
            }
            _ => None,
        };

        self.damage_enemy(shot.target, shot.damage, shot.tower, shot.ability, out_events);
        if let Some((bystanders, damage)) = splash {
            for enemy in bystanders {
                self.damage_enemy(enemy, damage, shot.tower, None, out_events);
            }
        }
    }

    fn damage_enemy(
        &mut self,
        id: EnemyId,
        amount: f32,
        tower: TowerId,
        ability: Option<Ability>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(enemy) = self.enemies.get_mut(id) else {
            return;
        };

        enemy.health -= amount;
        if let Some(Ability::Slow { factor, .. }) = ability {
            let duration = ability
                .and_then(|ability| ability.slow_duration())
                .unwrap_or_default();
            enemy.apply_slow(factor, duration);
        }
        if enemy.health > 0.0 {
            return;
        }

        let reward = enemy.reward;
        let kind = enemy.kind;
        let _ = self.ledger.add_hash(reward);
        debug!(enemy = id.get(), tower = tower.get(), reward, "enemy killed");
        out_events.push(Event::EnemyKilled {
            enemy: id,
            reward,
            tower,
        });
        if kind == EnemyKind::ZeroDay {
            let efficiency = self
                .ledger
                .restore_efficiency(self.balance.zero_day.defeat_efficiency_restore);
            info!(enemy = id.get(), efficiency, "zero-day purged");
            out_events.push(Event::ZeroDayPurged {
                enemy: id,
                efficiency,
            });
        }
        self.remove_enemy(id, out_events);
    }

    fn remove_enemy(&mut self, id: EnemyId, out_events: &mut Vec<Event>) {
        let _ = self.enemies.remove(id);
        self.towers.forget_target(id);
        for projectile in self.projectiles.drain_targeting(id) {
            out_events.push(Event::ProjectileDiscarded { projectile });
        }
    }

    fn settle_economy(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let was_frozen = self.ledger.is_frozen();
        self.ledger
            .recompute_power(self.towers.total_draw(), out_events);
        self.ledger.tick_efficiency(dt, out_events);
        let intruders = self.enemies.count_of(EnemyKind::ZeroDay);
        if intruders > 0 {
            let drain = self.balance.zero_day.efficiency_drain_per_second
                * intruders as f32
                * dt.as_secs_f32();
            self.ledger.drain(drain, out_events);
        }
        if !was_frozen && self.ledger.is_frozen() {
            info!(tick = self.tick_index, "efficiency exhausted, system frozen");
        }
        let _ = self.ledger.accrue_income(dt);
    }

    fn handle_player(
        &mut self,
        command: PlayerCommand,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        match command {
            PlayerCommand::PlaceTower { protocol, slot } => {
                self.place_tower(&protocol, slot, out_events)
            }
            PlayerCommand::PlaceTowerAt {
                protocol,
                screen,
                camera,
            } => self.place_tower_at(&protocol, screen, &camera, out_events),
            PlayerCommand::SellTower { tower } => self.sell_tower(tower, out_events),
            PlayerCommand::UpgradeTower { tower } => self.upgrade_tower(tower, out_events),
            PlayerCommand::EngageBoss { difficulty } => self.engage_boss(difficulty, out_events),
            PlayerCommand::RetreatFromBoss => {
                let retreat = self.boss.retreat(out_events)?;
                if let Some(enemy) = self.enemies.get_mut(retreat.enemy) {
                    enemy.health = retreat.health;
                    enemy.max_health = retreat.max_health;
                }
                info!("retreated from boss");
                Ok(())
            }
            PlayerCommand::DamageBoss { amount } => self.damage_boss(amount, out_events),
            PlayerCommand::UnlockSector { sector } => self.unlock_sector(&sector, out_events),
            PlayerCommand::AddPartialPayment { sector, amount } => {
                self.add_partial_payment(&sector, amount, out_events)
            }
            PlayerCommand::TapSectorGate { sector } => self.tap_sector_gate(&sector, out_events),
            PlayerCommand::FlushMemory => {
                let cost = self.ledger.flush_memory(out_events)?;
                info!(cost, efficiency = self.ledger.efficiency(), "memory flushed");
                Ok(())
            }
            PlayerCommand::ManualOverrideSuccess => {
                self.ledger.manual_override_success(out_events)?;
                info!(efficiency = self.ledger.efficiency(), "manual override completed");
                Ok(())
            }
            PlayerCommand::SetPaused { paused } => {
                if self.paused != paused {
                    self.paused = paused;
                    out_events.push(Event::PauseChanged { paused });
                }
                Ok(())
            }
            PlayerCommand::SetPowerCapacity { capacity } => {
                self.ledger.set_power_capacity(capacity, out_events);
                Ok(())
            }
        }
    }

    fn place_tower(
        &mut self,
        protocol: &ProtocolId,
        slot: SlotId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let (definition, level) = compiled_protocol(
            &self.roster,
            &self.progression,
            self.balance.scaling.max_level,
            protocol,
        )?;
        let target = self.slots.get(&slot).ok_or(CommandError::NoValidSlot)?;
        if !self.progression.is_unlocked(&target.sector) {
            return Err(CommandError::SectorLocked {
                missing_sectors: vec![target.sector.clone()],
                missing_protocols: Vec::new(),
            });
        }
        if target.occupant.is_some() {
            return Err(CommandError::SlotOccupied { slot });
        }

        let cost = definition.placement_cost;
        self.ledger.ensure_funds(cost)?;
        let stats = TowerStats::for_level(
            definition,
            level,
            &self.balance.scaling,
            &self.balance.power,
        );
        self.ledger.ensure_power(stats.power_draw)?;

        let seed = TowerSeed {
            protocol: definition,
            slot,
            position: target.position,
            level,
            stats,
            cost,
        };
        self.ledger.spend(cost)?;
        let tower = self.towers.insert(seed);
        if let Some(state) = self.slots.get_mut(&slot) {
            state.occupant = Some(tower);
        }

        debug!(tower = tower.get(), slot = slot.get(), %protocol, "tower placed");
        out_events.push(Event::TowerPlaced {
            tower,
            slot,
            protocol: protocol.clone(),
        });
        self.ledger
            .recompute_power(self.towers.total_draw(), out_events);
        Ok(())
    }

    fn place_tower_at(
        &mut self,
        protocol: &ProtocolId,
        screen: Vec2,
        camera: &Camera,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let _ = compiled_protocol(
            &self.roster,
            &self.progression,
            self.balance.scaling.max_level,
            protocol,
        )?;

        let point = camera.screen_to_world(screen);
        let radius = placement::snap_radius(
            self.balance.placement.base_snap_radius,
            self.map.scale,
            camera,
        );
        let snapshots: Vec<SlotSnapshot> = self.slots.values().map(SlotState::snapshot).collect();
        let nearest = placement::nearest_free_slot(point, radius, &snapshots)?;

        if !self.progression.is_unlocked(&nearest.sector) {
            let sector = nearest.sector.clone();
            let unlockable = self
                .map
                .sector(&sector)
                .is_some_and(|definition| self.is_unlockable(definition));
            out_events.push(Event::SectorGateTapped {
                sector: sector.clone(),
                unlockable,
            });
            return Err(CommandError::SectorLocked {
                missing_sectors: vec![sector],
                missing_protocols: Vec::new(),
            });
        }

        let slot = nearest.id;
        self.place_tower(protocol, slot, out_events)
    }

    fn sell_tower(&mut self, tower: TowerId, out_events: &mut Vec<Event>) -> Result<(), CommandError> {
        let state = self.towers.remove(tower).ok_or(CommandError::UnknownTower)?;
        let refund = self.balance.scaling.refund(state.invested);
        let _ = self.ledger.add_hash(refund);

        match self.slots.get_mut(&state.slot) {
            Some(slot) => slot.occupant = None,
            None => warn!(tower = tower.get(), slot = state.slot.get(), "sold tower had no slot"),
        }

        debug!(tower = tower.get(), refund, "tower sold");
        out_events.push(Event::TowerSold {
            tower,
            slot: state.slot,
            refund,
        });
        self.ledger
            .recompute_power(self.towers.total_draw(), out_events);
        Ok(())
    }

    fn upgrade_tower(
        &mut self,
        tower: TowerId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let state = self.towers.get(tower).ok_or(CommandError::UnknownTower)?;
        let scaling = &self.balance.scaling;
        if state.level >= scaling.max_level {
            return Err(CommandError::MaxLevel { level: state.level });
        }
        let definition =
            self.roster
                .get(&state.protocol)
                .ok_or_else(|| CommandError::UnknownProtocol {
                    protocol: state.protocol.clone(),
                })?;

        let cost = scaling.upgrade_cost(definition.placement_cost, state.level);
        let level = state.level + 1;
        let stats = TowerStats::for_level(definition, level, scaling, &self.balance.power);
        let extra = stats.power_draw.saturating_sub(state.stats.power_draw);
        self.ledger.ensure_funds(cost)?;
        self.ledger.ensure_power(extra)?;

        self.ledger.spend(cost)?;
        if let Some(state) = self.towers.get_mut(tower) {
            state.level = level;
            state.stats = stats;
            state.invested = state.invested.saturating_add(cost);
        }

        debug!(tower = tower.get(), level, cost, "tower upgraded");
        out_events.push(Event::TowerUpgraded { tower, level });
        self.ledger
            .recompute_power(self.towers.total_draw(), out_events);
        Ok(())
    }

    fn engage_boss(
        &mut self,
        difficulty: BossDifficulty,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let (health, max_health) = self
            .boss
            .phase()
            .enemy()
            .and_then(|id| self.enemies.get(id))
            .map_or((0.0, 0.0), |enemy| (enemy.health, enemy.max_health));

        let engagement = self
            .boss
            .engage(difficulty, health, max_health, out_events)?;
        if let Some(enemy) = self.enemies.get_mut(engagement.enemy) {
            enemy.health = engagement.health;
            enemy.max_health = engagement.max_health;
        }
        info!(?difficulty, health = engagement.health, "boss engaged");
        Ok(())
    }

    fn damage_boss(&mut self, amount: f32, out_events: &mut Vec<Event>) -> Result<(), CommandError> {
        let enemy = self.boss.engaged_enemy()?;
        if !amount.is_finite() || amount <= 0.0 {
            return Ok(());
        }

        let remaining = self.enemies.get_mut(enemy).map(|boss| {
            boss.health -= amount;
            (boss.health, boss.max_health)
        });
        debug_assert!(remaining.is_some(), "engaged boss has no enemy record");
        let (health, max_health) = remaining.unwrap_or((0.0, 0.0));
        if health > 0.0 {
            let reported = out_events.len();
            self.boss.track_health(health, max_health, out_events);
            for event in &out_events[reported..] {
                if let Event::BossPhaseChanged { phase, .. } = event {
                    info!(phase, health, "boss entered a new phase");
                }
            }
            return Ok(());
        }

        let defeated_before = self
            .boss
            .phase()
            .sector()
            .is_some_and(|sector| self.progression.defeated.contains(sector));
        let victory = self.boss.victory(defeated_before, out_events)?;
        self.remove_enemy(victory.enemy, out_events);
        let _ = self.ledger.add_hash(victory.reward);
        let _ = self.progression.defeated.insert(victory.sector.clone());
        info!(
            sector = %victory.sector,
            reward = victory.reward,
            first_kill = victory.first_kill,
            "boss defeated"
        );

        if victory.first_kill {
            self.grant_next_sector(out_events);
        }
        Ok(())
    }

    fn grant_next_sector(&mut self, out_events: &mut Vec<Event>) {
        let Some(sector) = placement::next_in_order(&self.map, &self.progression.unlocked)
            .map(|definition| definition.id.clone())
        else {
            return;
        };

        let refund = self.progression.unlock(&sector);
        if refund > 0 {
            let _ = self.ledger.add_hash(refund);
        }
        info!(%sector, refund, "sector unlocked by first boss kill");
        out_events.push(Event::SectorUnlocked { sector });
    }

    fn sector_definition(&self, sector: &SectorId) -> Result<&SectorDefinition, CommandError> {
        self.map
            .sector(sector)
            .ok_or_else(|| CommandError::UnknownSector {
                sector: sector.clone(),
            })
    }

    fn is_unlockable(&self, definition: &SectorDefinition) -> bool {
        placement::check_prerequisites(
            definition,
            &self.progression.unlocked,
            &self.progression.compiled,
        )
        .is_ok()
            && self.ledger.hash()
                >= placement::remaining_cost(definition, self.progression.paid(&definition.id))
    }

    fn unlock_sector(
        &mut self,
        sector: &SectorId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let definition = self.sector_definition(sector)?;
        placement::check_prerequisites(
            definition,
            &self.progression.unlocked,
            &self.progression.compiled,
        )?;
        let remaining = placement::remaining_cost(definition, self.progression.paid(sector));

        self.ledger.spend(remaining)?;
        let _ = self.progression.unlock(sector);
        info!(%sector, paid = remaining, "sector unlocked");
        out_events.push(Event::SectorUnlocked {
            sector: sector.clone(),
        });
        Ok(())
    }

    fn add_partial_payment(
        &mut self,
        sector: &SectorId,
        amount: u64,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let definition = self.sector_definition(sector)?;
        if amount == 0 {
            return Ok(());
        }
        placement::check_prerequisites(
            definition,
            &self.progression.unlocked,
            &self.progression.compiled,
        )?;
        let plan = placement::plan_payment(definition, self.progression.paid(sector), amount);
        let cost = definition.unlock_cost;

        self.ledger.spend(plan.applied)?;
        out_events.push(Event::SectorPaymentRecorded {
            sector: sector.clone(),
            paid: plan.paid,
            cost,
        });
        if plan.completes {
            let _ = self.progression.unlock(sector);
            info!(%sector, "sector unlocked by partial payments");
            out_events.push(Event::SectorUnlocked {
                sector: sector.clone(),
            });
        } else {
            let _ = self.progression.payments.insert(sector.clone(), plan.paid);
        }
        Ok(())
    }

    fn tap_sector_gate(
        &mut self,
        sector: &SectorId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let definition = self.sector_definition(sector)?;
        if self.progression.is_unlocked(sector) {
            return Err(CommandError::AlreadyUnlocked {
                sector: sector.clone(),
            });
        }
        let unlockable = self.is_unlockable(definition);
        out_events.push(Event::SectorGateTapped {
            sector: sector.clone(),
            unlockable,
        });
        Ok(())
    }
}

/// Resolves a protocol the player may place, with its starting level.
fn compiled_protocol<'a>(
    roster: &'a BTreeMap<ProtocolId, ProtocolDefinition>,
    progression: &Progression,
    max_level: u32,
    protocol: &ProtocolId,
) -> Result<(&'a ProtocolDefinition, u32), CommandError> {
    let definition = roster
        .get(protocol)
        .ok_or_else(|| CommandError::UnknownProtocol {
            protocol: protocol.clone(),
        })?;
    let compiled = progression
        .compiled
        .get(protocol)
        .copied()
        .ok_or_else(|| CommandError::ProtocolNotCompiled {
            protocol: protocol.clone(),
        })?;
    Ok((definition, compiled.clamp(1, max_level.max(1))))
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
            world.advance_enemies(dt, out_events);
        }
        Command::SpawnEnemy {
            kind,
            wave,
            lane_roll,
            scaling,
        } => world.spawn_enemy(kind, wave, lane_roll, scaling, out_events),
        Command::SpawnZeroDay {
            wave,
            lane_roll,
            scaling,
        } => world.spawn_zero_day(wave, lane_roll, scaling, out_events),
        Command::SpawnBoss { wave } => world.spawn_boss(wave, out_events),
        Command::FireProjectile {
            tower,
            target,
            shots,
        } => world.fire(tower, target, shots, out_events),
        Command::RearmTower {
            tower,
            target,
            ready_in,
        } => match world.towers.get_mut(tower) {
            Some(state) => {
                state.ready_in = ready_in;
                state.target = target;
            }
            None => warn!(tower = tower.get(), "rearm for unknown tower skipped"),
        },
        Command::MoveProjectile {
            projectile,
            position,
            lifetime,
        } => {
            if let Some(state) = world.projectiles.get_mut(projectile) {
                state.position = position;
                state.lifetime = lifetime;
            }
        }
        Command::ImpactProjectile { projectile } => world.resolve_impact(projectile, out_events),
        Command::DiscardProjectile { projectile } => {
            if world.projectiles.remove(projectile).is_some() {
                out_events.push(Event::ProjectileDiscarded { projectile });
            }
        }
        Command::SettleEconomy { dt } => world.settle_economy(dt, out_events),
        Command::AdvanceBoss { dt } => world.boss.advance(dt, out_events),
        Command::CreditHash { amount } => {
            let credited = world.ledger.add_hash(amount);
            debug!(amount, credited, "hash credited");
        }
    }
}

/// Validates a player command and applies it when every check passes.
///
/// Rejected commands leave the world untouched. A placement snapped onto a
/// locked sector still reports the gate tap through `out_events`.
pub fn execute(
    world: &mut World,
    command: PlayerCommand,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    let result = world.handle_player(command, out_events);
    if let Err(error) = &result {
        if error.is_noop() {
            debug!(%error, "player command was a no-op");
        } else {
            debug!(%error, "player command rejected");
        }
    }
    result
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::collections::{BTreeMap, BTreeSet};

    use hashguard_core::{
        BalanceConfig, BossPhase, EnemyView, MapDefinition, ProjectileView, ProtocolDefinition,
        ProtocolId, SectorId, SlotSnapshot, TowerCooldownView, TowerView,
    };
    use hashguard_system_economy::LedgerState;

    use super::World;

    /// Captures a read-only view of the towers on the board.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.iter().map(|tower| tower.snapshot()).collect())
    }

    /// Captures a read-only view of the enemies on the board.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(world.enemies.iter().map(|enemy| enemy.snapshot()).collect())
    }

    /// Captures a read-only view of the projectiles in flight.
    #[must_use]
    pub fn projectile_view(world: &World) -> ProjectileView {
        ProjectileView::from_snapshots(
            world
                .projectiles
                .iter()
                .map(|projectile| projectile.snapshot())
                .collect(),
        )
    }

    /// Captures the cooldown state of every tower.
    #[must_use]
    pub fn tower_cooldowns(world: &World) -> TowerCooldownView {
        TowerCooldownView::from_snapshots(world.towers.cooldowns())
    }

    /// Captures every tower slot in ascending id order.
    #[must_use]
    pub fn slots(world: &World) -> Vec<SlotSnapshot> {
        world.slots.values().map(|slot| slot.snapshot()).collect()
    }

    /// Current hash balance.
    #[must_use]
    pub fn hash(world: &World) -> u64 {
        world.ledger.hash()
    }

    /// Storage capacity that caps the hash balance.
    #[must_use]
    pub fn hash_capacity(world: &World) -> u64 {
        world.ledger.capacity()
    }

    /// Power drawn by all placed towers.
    #[must_use]
    pub fn power_used(world: &World) -> u32 {
        world.ledger.power_used()
    }

    /// Power the grid can supply.
    #[must_use]
    pub fn power_capacity(world: &World) -> u32 {
        world.ledger.power_capacity()
    }

    /// Current efficiency between zero and one hundred.
    #[must_use]
    pub fn efficiency(world: &World) -> f32 {
        world.ledger.efficiency()
    }

    /// Reports whether the system is frozen.
    #[must_use]
    pub fn is_frozen(world: &World) -> bool {
        world.ledger.is_frozen()
    }

    /// Full ledger contents.
    #[must_use]
    pub fn ledger(world: &World) -> &LedgerState {
        world.ledger.state()
    }

    /// Reports whether simulation advancement is paused.
    #[must_use]
    pub fn is_paused(world: &World) -> bool {
        world.paused
    }

    /// Number of ticks processed since the session began.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Current boss encounter phase.
    #[must_use]
    pub fn boss_phase(world: &World) -> &BossPhase {
        world.boss.phase()
    }

    /// Reports whether the encounter mode currently owns the boss.
    #[must_use]
    pub fn boss_engaged(world: &World) -> bool {
        world.boss.phase().is_engaged()
    }

    /// Sectors currently unlocked.
    #[must_use]
    pub fn unlocked_sectors(world: &World) -> &BTreeSet<SectorId> {
        &world.progression.unlocked
    }

    /// Sectors whose boss has been defeated at least once.
    #[must_use]
    pub fn defeated_bosses(world: &World) -> &BTreeSet<SectorId> {
        &world.progression.defeated
    }

    /// Hash paid so far toward a locked sector.
    #[must_use]
    pub fn sector_payment(world: &World, sector: &SectorId) -> u64 {
        world.progression.paid(sector)
    }

    /// Protocols available for placement with their compiled level.
    #[must_use]
    pub fn compiled_protocols(world: &World) -> &BTreeMap<ProtocolId, u32> {
        &world.progression.compiled
    }

    /// Looks up a protocol template from the roster.
    #[must_use]
    pub fn protocol<'a>(world: &'a World, id: &ProtocolId) -> Option<&'a ProtocolDefinition> {
        world.roster.get(id)
    }

    /// Balance tables the world was created with.
    #[must_use]
    pub fn balance(world: &World) -> &BalanceConfig {
        &world.balance
    }

    /// Map the world was created with.
    #[must_use]
    pub fn map(world: &World) -> &MapDefinition {
        &world.map
    }
}
