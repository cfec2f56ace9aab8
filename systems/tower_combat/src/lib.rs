#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure systems that turn targeting data into projectile commands.
//!
//! [`TowerCombat`] decides how many shots each tower releases during a tick
//! and how much cooldown remains afterwards. [`ProjectileFlight`] advances
//! in-flight projectiles toward the current position of their target.

use std::time::Duration;

use hashguard_core::{
    Command, EnemyId, EnemyView, ProjectileView, TowerCooldownSnapshot, TowerCooldownView,
    TowerTarget,
};

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireProjectile` for towers ready to fire and
    /// `Command::RearmTower` for every tower.
    ///
    /// A tower whose cooldown expires within the tick fires once at that
    /// instant and again after every full fire interval that still fits in
    /// the tick. Towers without a target let their cooldown run down to zero
    /// without banking shots. A frozen system never fires.
    pub fn handle(
        &mut self,
        frozen: bool,
        dt: Duration,
        tower_cooldowns: TowerCooldownView,
        tower_targets: &[TowerTarget],
        out: &mut Vec<Command>,
    ) {
        let cooldowns = tower_cooldowns.into_vec();
        if cooldowns.is_empty() {
            return;
        }

        self.scratch.clear();

        for snapshot in &cooldowns {
            let target = if frozen {
                None
            } else {
                find_target(tower_targets, snapshot)
            };

            let (shots, ready_in) = match target {
                Some(_) => volley(snapshot.ready_in, snapshot.fire_interval, dt),
                None => (0, snapshot.ready_in.saturating_sub(dt)),
            };

            if let (Some(enemy), true) = (target, shots > 0) {
                self.scratch.push(Command::FireProjectile {
                    tower: snapshot.tower,
                    target: enemy,
                    shots,
                });
            }

            if ready_in != snapshot.ready_in || target != snapshot.target {
                self.scratch.push(Command::RearmTower {
                    tower: snapshot.tower,
                    target,
                    ready_in,
                });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

fn find_target(targets: &[TowerTarget], snapshot: &TowerCooldownSnapshot) -> Option<EnemyId> {
    targets
        .binary_search_by_key(&snapshot.tower, |target| target.tower)
        .ok()
        .map(|index| targets[index].enemy)
}

fn volley(ready_in: Duration, interval: Duration, dt: Duration) -> (u32, Duration) {
    if ready_in >= dt {
        return (0, ready_in - dt);
    }
    if interval.is_zero() {
        return (1, Duration::ZERO);
    }

    let mut shots = 0u32;
    let mut next_shot = ready_in;
    while next_shot < dt {
        shots = shots.saturating_add(1);
        next_shot = next_shot.saturating_add(interval);
    }
    (shots, next_shot - dt)
}

/// Projectile flight system that reuses scratch buffers between ticks.
#[derive(Debug, Default)]
pub struct ProjectileFlight {
    scratch: Vec<Command>,
}

impl ProjectileFlight {
    /// Creates a new projectile flight system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves every projectile toward its target's current position.
    ///
    /// Projectiles whose target vanished are discarded. Projectiles that come
    /// within `impact_epsilon` of the target, or whose lifetime runs out
    /// during the tick, resolve as impacts.
    pub fn handle(
        &mut self,
        dt: Duration,
        projectiles: &ProjectileView,
        enemies: &EnemyView,
        impact_epsilon: f32,
        out: &mut Vec<Command>,
    ) {
        if projectiles.is_empty() {
            return;
        }

        self.scratch.clear();
        let seconds = dt.as_secs_f32();

        for projectile in projectiles.iter() {
            let Some(target) = enemies.get(projectile.target) else {
                self.scratch.push(Command::DiscardProjectile {
                    projectile: projectile.id,
                });
                continue;
            };

            let offset = target.position - projectile.position;
            let distance = offset.length();
            let step = projectile.speed * seconds;

            if distance - step <= impact_epsilon || projectile.lifetime <= dt {
                self.scratch.push(Command::ImpactProjectile {
                    projectile: projectile.id,
                });
                continue;
            }

            self.scratch.push(Command::MoveProjectile {
                projectile: projectile.id,
                position: projectile.position + offset / distance * step,
                lifetime: projectile.lifetime - dt,
            });
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}
