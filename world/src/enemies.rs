//! Lane geometry and enemy bookkeeping.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use hashguard_core::{EnemyId, EnemyKind, EnemySnapshot, LaneDefinition, LaneId};
use serde::{Deserialize, Serialize};

/// Polyline walked by enemies, with precomputed segment offsets.
#[derive(Clone, Debug)]
pub(crate) struct Lane {
    waypoints: Vec<Vec2>,
    offsets: Vec<f32>,
    length: f32,
}

impl Lane {
    pub(crate) fn new(definition: &LaneDefinition) -> Self {
        let mut offsets = Vec::with_capacity(definition.waypoints.len());
        let mut length = 0.0;
        let mut previous: Option<Vec2> = None;
        for point in &definition.waypoints {
            if let Some(previous) = previous {
                length += previous.distance(*point);
            }
            offsets.push(length);
            previous = Some(*point);
        }
        Self {
            waypoints: definition.waypoints.clone(),
            offsets,
            length,
        }
    }

    pub(crate) fn length(&self) -> f32 {
        self.length
    }

    pub(crate) fn start(&self) -> Vec2 {
        self.waypoints.first().copied().unwrap_or(Vec2::ZERO)
    }

    /// Point reached after walking `distance` units from the lane start.
    pub(crate) fn point_at(&self, distance: f32) -> Vec2 {
        if distance <= 0.0 {
            return self.start();
        }
        let segment = self.offsets.partition_point(|offset| *offset <= distance);
        if segment == 0 || segment >= self.waypoints.len() {
            return self.waypoints.last().copied().unwrap_or(Vec2::ZERO);
        }
        let from = self.waypoints[segment - 1];
        let to = self.waypoints[segment];
        let span = self.offsets[segment] - self.offsets[segment - 1];
        if span <= 0.0 {
            return to;
        }
        from.lerp(to, (distance - self.offsets[segment - 1]) / span)
    }
}

/// Timed speed reduction applied by slow projectiles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct SlowEffect {
    pub(crate) factor: f32,
    pub(crate) remaining: Duration,
}

/// Enemy stored inside the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct EnemyState {
    pub(crate) id: EnemyId,
    pub(crate) kind: EnemyKind,
    pub(crate) lane: LaneId,
    pub(crate) wave: u32,
    pub(crate) distance: f32,
    pub(crate) progress: f32,
    pub(crate) position: Vec2,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) speed: f32,
    pub(crate) reward: u64,
    /// Multiplier on the efficiency a breach costs.
    #[serde(default = "full_damage")]
    pub(crate) damage: f32,
    pub(crate) slow: Option<SlowEffect>,
    pub(crate) boss: bool,
}

fn full_damage() -> f32 {
    1.0
}

impl EnemyState {
    /// Walks the enemy along its lane, returning `true` once it reaches the end.
    pub(crate) fn advance(&mut self, lane: &Lane, dt: Duration) -> bool {
        let factor = match self.slow.as_mut() {
            Some(slow) => {
                slow.remaining = slow.remaining.saturating_sub(dt);
                slow.factor
            }
            None => 1.0,
        };
        if self.slow.is_some_and(|slow| slow.remaining.is_zero()) {
            self.slow = None;
        }

        self.distance += self.speed * factor * dt.as_secs_f32();
        if self.distance >= lane.length() {
            self.distance = lane.length();
            self.progress = 1.0;
            self.position = lane.point_at(self.distance);
            return true;
        }

        self.position = lane.point_at(self.distance);
        self.progress = self.distance / lane.length();
        false
    }

    /// Applies a slow, keeping the stronger factor and the longer duration.
    pub(crate) fn apply_slow(&mut self, factor: f32, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.slow = Some(match self.slow {
            Some(existing) => SlowEffect {
                factor: existing.factor.min(factor),
                remaining: existing.remaining.max(duration),
            },
            None => SlowEffect {
                factor,
                remaining: duration,
            },
        });
    }

    pub(crate) fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            kind: self.kind,
            lane: self.lane,
            position: self.position,
            progress: self.progress,
            health: self.health,
            max_health: self.max_health,
            speed: self.speed,
            reward: self.reward,
            slowed: self.slow.is_some(),
            boss: self.boss,
        }
    }
}

/// Statistics of an enemy about to enter the board.
#[derive(Clone, Copy, Debug)]
pub(crate) struct EnemySeed {
    pub(crate) kind: EnemyKind,
    pub(crate) lane: LaneId,
    pub(crate) wave: u32,
    pub(crate) start: Vec2,
    pub(crate) health: f32,
    pub(crate) speed: f32,
    pub(crate) reward: u64,
    pub(crate) damage: f32,
}

/// Registry that stores enemies and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct EnemyRegistry {
    entries: BTreeMap<EnemyId, EnemyState>,
    next_enemy_id: EnemyId,
}

impl EnemyRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_enemy_id: EnemyId::new(0),
        }
    }

    pub(crate) fn from_parts(enemies: Vec<EnemyState>, next_enemy_id: EnemyId) -> Self {
        let entries: BTreeMap<EnemyId, EnemyState> =
            enemies.into_iter().map(|enemy| (enemy.id, enemy)).collect();
        let floor = entries
            .keys()
            .next_back()
            .map_or(0, |id| id.get().saturating_add(1));
        Self {
            entries,
            next_enemy_id: EnemyId::new(next_enemy_id.get().max(floor)),
        }
    }

    pub(crate) fn next_id(&self) -> EnemyId {
        self.next_enemy_id
    }

    pub(crate) fn insert(&mut self, seed: EnemySeed, boss: bool) -> EnemyId {
        let id = self.next_enemy_id;
        self.next_enemy_id = EnemyId::new(id.get().saturating_add(1));
        let previous = self.entries.insert(
            id,
            EnemyState {
                id,
                kind: seed.kind,
                lane: seed.lane,
                wave: seed.wave,
                distance: 0.0,
                progress: 0.0,
                position: seed.start,
                health: seed.health,
                max_health: seed.health,
                speed: seed.speed,
                reward: seed.reward,
                damage: seed.damage,
                slow: None,
                boss,
            },
        );
        debug_assert!(previous.is_none(), "enemy identifiers are never reused");
        id
    }

    pub(crate) fn remove(&mut self, id: EnemyId) -> Option<EnemyState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: EnemyId) -> Option<&EnemyState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EnemyId) -> Option<&mut EnemyState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &EnemyState> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut EnemyState> {
        self.entries.values_mut()
    }

    pub(crate) fn count_of(&self, kind: EnemyKind) -> usize {
        self.entries.values().filter(|enemy| enemy.kind == kind).count()
    }
}
