#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.

use glam::Vec2;
use hashguard_core::{EnemyId, EnemyView, TowerId, TowerTarget, TowerView};

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    tower_workspace: Vec<TowerWorkspace>,
    enemy_workspace: Vec<EnemyCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes tower targets for the provided world snapshot.
    ///
    /// The output buffer is cleared before populating it with the latest
    /// assignments. A frozen system assigns no targets.
    pub fn handle(
        &mut self,
        frozen: bool,
        towers: &TowerView,
        enemies: &EnemyView,
        out: &mut Vec<TowerTarget>,
    ) {
        out.clear();

        if frozen || towers.is_empty() || enemies.is_empty() {
            return;
        }

        self.prepare_tower_workspace(towers);
        if self.tower_workspace.is_empty() {
            return;
        }

        self.prepare_enemy_workspace(enemies);
        if self.enemy_workspace.is_empty() {
            return;
        }

        for tower in &self.tower_workspace {
            let max_distance = tower.range * tower.range;
            let mut best: Option<BestCandidate> = None;

            for candidate in &self.enemy_workspace {
                let distance_sq = candidate.position.distance_squared(tower.position);
                if distance_sq > max_distance {
                    continue;
                }

                let current = BestCandidate {
                    distance_sq,
                    enemy: candidate.id,
                };

                match &mut best {
                    Some(existing) => {
                        if current.precedes(existing) {
                            *existing = current;
                        }
                    }
                    None => best = Some(current),
                }
            }

            if let Some(best_candidate) = best {
                out.push(TowerTarget {
                    tower: tower.id,
                    enemy: best_candidate.enemy,
                    distance_sq: best_candidate.distance_sq,
                });
            }
        }
    }

    fn prepare_tower_workspace(&mut self, towers: &TowerView) {
        self.tower_workspace.clear();
        self.tower_workspace.reserve(towers.len());

        for snapshot in towers.iter() {
            let range = snapshot.stats.range;
            if !range.is_finite() || range <= 0.0 {
                continue;
            }

            self.tower_workspace.push(TowerWorkspace {
                id: snapshot.id,
                position: snapshot.position,
                range,
            });
        }
    }

    fn prepare_enemy_workspace(&mut self, enemies: &EnemyView) {
        self.enemy_workspace.clear();
        self.enemy_workspace.reserve(enemies.len());

        for snapshot in enemies.iter().filter(|snapshot| snapshot.targetable()) {
            self.enemy_workspace.push(EnemyCandidate {
                id: snapshot.id,
                position: snapshot.position,
            });
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TowerWorkspace {
    id: TowerId,
    position: Vec2,
    range: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct EnemyCandidate {
    id: EnemyId,
    position: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    distance_sq: f32,
    enemy: EnemyId,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_sq != other.distance_sq {
            return self.distance_sq < other.distance_sq;
        }

        self.enemy < other.enemy
    }
}

#[cfg(test)]
mod tests {
    use super::{TowerTarget, TowerTargeting};
    use glam::Vec2;
    use hashguard_core::{
        EnemyId, EnemyKind, EnemySnapshot, EnemyView, LaneId, ProtocolId, Rarity, SlotId, TowerId,
        TowerSnapshot, TowerStats, TowerView,
    };
    use std::time::Duration;

    fn tower_view(snapshots: Vec<TowerSnapshot>) -> TowerView {
        TowerView::from_snapshots(snapshots)
    }

    fn enemy_view(snapshots: Vec<EnemySnapshot>) -> EnemyView {
        EnemyView::from_snapshots(snapshots)
    }

    fn tower_snapshot(id: u32, position: (f32, f32), range: f32) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(id),
            protocol: ProtocolId::new("pulse"),
            slot: SlotId::new(id),
            position: Vec2::new(position.0, position.1),
            level: 1,
            rarity: Rarity::Common,
            stats: TowerStats {
                damage: 10.0,
                range,
                fire_rate: 1.0,
                power_draw: 15,
            },
            ready_in: Duration::ZERO,
            target: None,
            ability: None,
        }
    }

    fn enemy_snapshot(id: u32, position: (f32, f32)) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            kind: EnemyKind::Basic,
            lane: LaneId::new(0),
            position: Vec2::new(position.0, position.1),
            progress: 0.0,
            health: 30.0,
            max_health: 30.0,
            speed: 40.0,
            reward: 5,
            slowed: false,
            boss: false,
        }
    }

    #[test]
    fn targets_enemy_within_range() {
        let mut system = TowerTargeting::new();
        let towers = tower_view(vec![tower_snapshot(1, (0.0, 0.0), 100.0)]);
        let enemies = enemy_view(vec![enemy_snapshot(2, (30.0, 40.0))]);

        let mut out = Vec::new();
        system.handle(false, &towers, &enemies, &mut out);

        assert_eq!(
            out,
            vec![TowerTarget {
                tower: TowerId::new(1),
                enemy: EnemyId::new(2),
                distance_sq: 2_500.0,
            }]
        );
    }

    #[test]
    fn enemy_outside_range_is_ignored() {
        let mut system = TowerTargeting::new();
        let towers = tower_view(vec![tower_snapshot(1, (0.0, 0.0), 50.0)]);
        let enemies = enemy_view(vec![enemy_snapshot(2, (50.0, 1.0))]);

        let mut out = Vec::new();
        system.handle(false, &towers, &enemies, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn enemy_on_range_boundary_is_targeted() {
        let mut system = TowerTargeting::new();
        let towers = tower_view(vec![tower_snapshot(1, (0.0, 0.0), 50.0)]);
        let enemies = enemy_view(vec![enemy_snapshot(2, (50.0, 0.0))]);

        let mut out = Vec::new();
        system.handle(false, &towers, &enemies, &mut out);

        assert_eq!(out.len(), 1);
    }

    #[test]
    fn nearest_enemy_wins() {
        let mut system = TowerTargeting::new();
        let towers = tower_view(vec![tower_snapshot(1, (0.0, 0.0), 100.0)]);
        let enemies = enemy_view(vec![
            enemy_snapshot(1, (80.0, 0.0)),
            enemy_snapshot(2, (0.0, 20.0)),
            enemy_snapshot(3, (40.0, 40.0)),
        ]);

        let mut out = Vec::new();
        system.handle(false, &towers, &enemies, &mut out);

        assert_eq!(out[0].enemy, EnemyId::new(2));
    }

    #[test]
    fn smaller_enemy_id_is_preferred_when_distances_match() {
        let mut system = TowerTargeting::new();
        let towers = tower_view(vec![tower_snapshot(1, (0.0, 0.0), 100.0)]);
        let enemies = enemy_view(vec![
            enemy_snapshot(20, (30.0, 0.0)),
            enemy_snapshot(10, (-30.0, 0.0)),
        ]);

        let mut out = Vec::new();
        system.handle(false, &towers, &enemies, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].enemy, EnemyId::new(10));
    }

    #[test]
    fn bosses_are_never_targeted() {
        let mut system = TowerTargeting::new();
        let towers = tower_view(vec![tower_snapshot(1, (0.0, 0.0), 100.0)]);
        let mut boss = enemy_snapshot(1, (5.0, 0.0));
        boss.boss = true;
        boss.kind = EnemyKind::Boss;
        let enemies = enemy_view(vec![boss, enemy_snapshot(2, (90.0, 0.0))]);

        let mut out = Vec::new();
        system.handle(false, &towers, &enemies, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].enemy, EnemyId::new(2));
    }

    #[test]
    fn frozen_system_clears_output() {
        let mut system = TowerTargeting::new();
        let towers = tower_view(vec![tower_snapshot(1, (0.0, 0.0), 100.0)]);
        let enemies = enemy_view(vec![enemy_snapshot(1, (1.0, 1.0))]);

        let mut out = vec![TowerTarget {
            tower: TowerId::new(99),
            enemy: EnemyId::new(99),
            distance_sq: 0.0,
        }];

        system.handle(true, &towers, &enemies, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn zero_range_tower_produces_no_target() {
        let mut system = TowerTargeting::new();
        let towers = tower_view(vec![tower_snapshot(1, (0.0, 0.0), 0.0)]);
        let enemies = enemy_view(vec![enemy_snapshot(1, (0.0, 0.0))]);

        let mut out = Vec::new();
        system.handle(false, &towers, &enemies, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn empty_collections_produce_no_targets() {
        let mut system = TowerTargeting::new();
        let towers = tower_view(Vec::new());
        let enemies = enemy_view(vec![enemy_snapshot(1, (1.0, 1.0))]);

        let mut out = Vec::new();
        system.handle(false, &towers, &enemies, &mut out);
        assert!(out.is_empty());

        let towers = tower_view(vec![tower_snapshot(1, (0.0, 0.0), 100.0)]);
        let enemies = enemy_view(Vec::new());
        system.handle(false, &towers, &enemies, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn removing_enemies_does_not_select_out_of_range_candidates() {
        let mut system = TowerTargeting::new();
        let towers = tower_view(vec![tower_snapshot(1, (0.0, 0.0), 50.0)]);
        let enemies = enemy_view(vec![
            enemy_snapshot(1, (20.0, 0.0)),
            enemy_snapshot(2, (200.0, 0.0)),
        ]);
        let mut out = Vec::new();
        system.handle(false, &towers, &enemies, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].enemy, EnemyId::new(1));

        let enemies = enemy_view(vec![enemy_snapshot(2, (200.0, 0.0))]);
        system.handle(false, &towers, &enemies, &mut out);
        assert!(out.is_empty(), "far enemy should not be targeted when alone");
    }
}
