#![allow(dead_code)]

use std::time::Duration;

use glam::Vec2;
use hashguard_core::{
    BalanceConfig, EnemyKind, EnemyStats, Event, LaneDefinition, LaneId, MapDefinition,
    PlayerCommand, PlayerProfile, ProtocolDefinition, ProtocolId, Rarity, SectorDefinition,
    SectorId, SessionSetup, SlotDefinition, SlotId, SpawnEntry, ThreatGrowth, WaveDefinition,
    WaveSchedule,
};
use hashguard_simulation::Simulation;

pub const CORE_SLOTS: u32 = 12;
pub const EDGE_SLOT: SlotId = SlotId::new(50);
pub const STEP: Duration = Duration::from_secs(1);

/// Board with a free `core` sector on lane 0 and an `edge` sector on lane 1.
///
/// Core slots sit fifty units above the start of lane 0, spaced along it.
pub fn map() -> MapDefinition {
    let mut slots: Vec<SlotDefinition> = (0..CORE_SLOTS)
        .map(|index| SlotDefinition {
            id: SlotId::new(index),
            position: Vec2::new(60.0 * index as f32, 50.0),
            sector: SectorId::new("core"),
        })
        .collect();
    slots.push(SlotDefinition {
        id: EDGE_SLOT,
        position: Vec2::new(0.0, 450.0),
        sector: SectorId::new("edge"),
    });

    MapDefinition {
        scale: 1.0,
        lanes: vec![
            LaneDefinition {
                id: LaneId::new(0),
                waypoints: vec![Vec2::new(0.0, 0.0), Vec2::new(1_000.0, 0.0)],
            },
            LaneDefinition {
                id: LaneId::new(1),
                waypoints: vec![Vec2::new(0.0, 500.0), Vec2::new(1_000.0, 500.0)],
            },
        ],
        slots,
        sectors: vec![
            SectorDefinition {
                id: SectorId::new("core"),
                display_name: "Core".to_owned(),
                unlock_cost: 0,
                prerequisites: Vec::new(),
                required_protocols: Vec::new(),
                lanes: vec![LaneId::new(0)],
                boss: "core-warden".to_owned(),
            },
            SectorDefinition {
                id: SectorId::new("edge"),
                display_name: "Edge".to_owned(),
                unlock_cost: 400,
                prerequisites: vec![SectorId::new("core")],
                required_protocols: Vec::new(),
                lanes: vec![LaneId::new(1)],
                boss: "edge-warden".to_owned(),
            },
        ],
    }
}

fn protocol(id: &str, rarity: Rarity, cost: u64) -> ProtocolDefinition {
    ProtocolDefinition {
        id: ProtocolId::new(id),
        name: id.to_uppercase(),
        rarity,
        base_damage: 10.0,
        base_range: 100.0,
        base_fire_rate: 2.0,
        placement_cost: cost,
        ability: None,
    }
}

/// Balance without passive income so hash changes come only from play.
pub fn balance() -> BalanceConfig {
    let mut balance = BalanceConfig::default();
    balance.economy.base_hash_per_second = 0.0;
    balance.enemies.basic = EnemyStats {
        health: 25.0,
        speed: 0.0,
        reward: 7,
    };
    balance
}

/// Single wave of `count` stationary basic enemies spawning immediately.
pub fn waves(count: u32) -> WaveSchedule {
    WaveSchedule {
        waves: vec![WaveDefinition {
            pre_delay_secs: 0.0,
            entries: vec![SpawnEntry {
                kind: EnemyKind::Basic,
                count,
                interval_secs: 1.0,
            }],
        }],
        growth: ThreatGrowth::default(),
        seed: 3,
        repeat_last: false,
    }
}

pub fn setup(hash: u64, schedule: WaveSchedule) -> SessionSetup {
    let mut profile = PlayerProfile {
        hash,
        ..PlayerProfile::default()
    };
    for id in ["pulse", "spark", "lance"] {
        let _ = profile.compiled_protocols.insert(ProtocolId::new(id), 1);
    }

    SessionSetup {
        profile,
        schedule,
        map: map(),
        balance: balance(),
        roster: vec![
            protocol("pulse", Rarity::Common, 50),
            protocol("spark", Rarity::Rare, 60),
            protocol("lance", Rarity::Legendary, 80),
        ],
    }
}

pub fn place(simulation: &mut Simulation, protocol: &str, slot: u32) {
    simulation
        .execute(PlayerCommand::PlaceTower {
            protocol: ProtocolId::new(protocol),
            slot: SlotId::new(slot),
        })
        .expect("scripted placement succeeds");
}

pub fn run(simulation: &mut Simulation, ticks: u32) -> Vec<Event> {
    (0..ticks)
        .flat_map(|_| simulation.advance(STEP))
        .collect()
}

pub fn sector(id: &str) -> SectorId {
    SectorId::new(id)
}
