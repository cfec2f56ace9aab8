//! In-flight projectile bookkeeping.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use hashguard_core::{Ability, EnemyId, ProjectileId, ProjectileSnapshot, TowerId};

/// Projectile stored inside the world.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ProjectileState {
    pub(crate) id: ProjectileId,
    pub(crate) tower: TowerId,
    pub(crate) target: EnemyId,
    pub(crate) position: Vec2,
    pub(crate) speed: f32,
    pub(crate) damage: f32,
    pub(crate) lifetime: Duration,
    pub(crate) ability: Option<Ability>,
}

impl ProjectileState {
    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: self.id,
            tower: self.tower,
            target: self.target,
            position: self.position,
            speed: self.speed,
            damage: self.damage,
            lifetime: self.lifetime,
        }
    }
}

/// Launch parameters for a new projectile.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Launch {
    pub(crate) tower: TowerId,
    pub(crate) target: EnemyId,
    pub(crate) origin: Vec2,
    pub(crate) speed: f32,
    pub(crate) damage: f32,
    pub(crate) lifetime: Duration,
    pub(crate) ability: Option<Ability>,
}

/// Registry that stores projectiles and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct ProjectileRegistry {
    entries: BTreeMap<ProjectileId, ProjectileState>,
    next_projectile_id: ProjectileId,
}

impl ProjectileRegistry {
    pub(crate) fn new(next_projectile_id: ProjectileId) -> Self {
        Self {
            entries: BTreeMap::new(),
            next_projectile_id,
        }
    }

    pub(crate) fn next_id(&self) -> ProjectileId {
        self.next_projectile_id
    }

    pub(crate) fn launch(&mut self, launch: Launch) -> ProjectileId {
        let id = self.next_projectile_id;
        self.next_projectile_id = ProjectileId::new(id.get().saturating_add(1));
        let previous = self.entries.insert(
            id,
            ProjectileState {
                id,
                tower: launch.tower,
                target: launch.target,
                position: launch.origin,
                speed: launch.speed,
                damage: launch.damage,
                lifetime: launch.lifetime,
                ability: launch.ability,
            },
        );
        debug_assert!(previous.is_none(), "projectile identifiers are never reused");
        id
    }

    pub(crate) fn remove(&mut self, id: ProjectileId) -> Option<ProjectileState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ProjectileId) -> Option<&mut ProjectileState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ProjectileState> {
        self.entries.values()
    }

    /// Removes every projectile tracking `enemy`, returning their identifiers.
    pub(crate) fn drain_targeting(&mut self, enemy: EnemyId) -> Vec<ProjectileId> {
        let orphaned: Vec<ProjectileId> = self
            .entries
            .values()
            .filter(|projectile| projectile.target == enemy)
            .map(|projectile| projectile.id)
            .collect();
        for id in &orphaned {
            let _ = self.entries.remove(id);
        }
        orphaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch(target: u32) -> Launch {
        Launch {
            tower: TowerId::new(0),
            target: EnemyId::new(target),
            origin: Vec2::ZERO,
            speed: 400.0,
            damage: 10.0,
            lifetime: Duration::from_secs(3),
            ability: None,
        }
    }

    #[test]
    fn draining_a_target_leaves_other_projectiles() {
        let mut registry = ProjectileRegistry::new(ProjectileId::new(0));
        let first = registry.launch(launch(1));
        let _ = registry.launch(launch(2));
        let third = registry.launch(launch(1));

        assert_eq!(registry.drain_targeting(EnemyId::new(1)), vec![first, third]);
        assert_eq!(registry.iter().count(), 1);
        assert!(registry.drain_targeting(EnemyId::new(1)).is_empty());
    }

    #[test]
    fn identifiers_continue_from_the_provided_counter() {
        let mut registry = ProjectileRegistry::new(ProjectileId::new(41));
        assert_eq!(registry.launch(launch(1)), ProjectileId::new(41));
        assert_eq!(registry.next_id(), ProjectileId::new(42));
    }
}
