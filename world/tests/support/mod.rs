#![allow(dead_code)]

use glam::Vec2;
use hashguard_core::{
    Ability, BalanceConfig, LaneDefinition, LaneId, MapDefinition, PlayerProfile,
    ProtocolDefinition, ProtocolId, Rarity, SectorDefinition, SectorId, SessionSetup,
    SlotDefinition, SlotId, WaveSchedule,
};

pub const ALPHA_SLOTS: u32 = 12;
pub const BETA_SLOT: SlotId = SlotId::new(100);

pub fn protocol(id: &str, rarity: Rarity, cost: u64, ability: Option<Ability>) -> ProtocolDefinition {
    ProtocolDefinition {
        id: ProtocolId::new(id),
        name: id.to_uppercase(),
        rarity,
        base_damage: 10.0,
        base_range: 100.0,
        base_fire_rate: 2.0,
        placement_cost: cost,
        ability,
    }
}

fn sector(
    id: &str,
    cost: u64,
    prerequisites: &[&str],
    protocols: &[&str],
    lane: u32,
) -> SectorDefinition {
    SectorDefinition {
        id: SectorId::new(id),
        display_name: id.to_owned(),
        unlock_cost: cost,
        prerequisites: prerequisites.iter().map(|id| SectorId::new(*id)).collect(),
        required_protocols: protocols.iter().map(|id| ProtocolId::new(*id)).collect(),
        lanes: vec![LaneId::new(lane)],
        boss: format!("{id}-warden"),
    }
}

pub fn map() -> MapDefinition {
    let mut slots: Vec<SlotDefinition> = (0..ALPHA_SLOTS)
        .map(|index| SlotDefinition {
            id: SlotId::new(index),
            position: Vec2::new(100.0 * (index + 1) as f32, 50.0),
            sector: SectorId::new("alpha"),
        })
        .collect();
    slots.push(SlotDefinition {
        id: BETA_SLOT,
        position: Vec2::new(100.0, 150.0),
        sector: SectorId::new("beta"),
    });

    MapDefinition {
        scale: 1.0,
        lanes: vec![
            LaneDefinition {
                id: LaneId::new(0),
                waypoints: vec![Vec2::new(0.0, 0.0), Vec2::new(2_000.0, 0.0)],
            },
            LaneDefinition {
                id: LaneId::new(1),
                waypoints: vec![Vec2::new(0.0, 200.0), Vec2::new(2_000.0, 200.0)],
            },
            LaneDefinition {
                id: LaneId::new(2),
                waypoints: vec![Vec2::new(0.0, 400.0), Vec2::new(2_000.0, 400.0)],
            },
        ],
        slots,
        sectors: vec![
            sector("alpha", 0, &[], &[], 0),
            sector("beta", 500, &["alpha"], &[], 1),
            sector("gamma", 800, &["beta"], &["relay"], 2),
        ],
    }
}

pub fn roster() -> Vec<ProtocolDefinition> {
    vec![
        protocol("pulse", Rarity::Common, 50, None),
        protocol("spark", Rarity::Rare, 60, None),
        protocol("lance", Rarity::Legendary, 80, None),
        protocol(
            "burst",
            Rarity::Epic,
            90,
            Some(Ability::Splash {
                radius: 50.0,
                fraction: 0.5,
            }),
        ),
        protocol(
            "frost",
            Rarity::Epic,
            90,
            Some(Ability::Slow {
                factor: 0.5,
                duration_secs: 2.0,
            }),
        ),
        protocol("relay", Rarity::Rare, 70, None),
    ]
}

pub fn setup(hash: u64) -> SessionSetup {
    let mut profile = PlayerProfile {
        hash,
        ..PlayerProfile::default()
    };
    for id in ["pulse", "spark", "lance", "burst", "frost"] {
        let _ = profile.compiled_protocols.insert(ProtocolId::new(id), 1);
    }

    SessionSetup {
        profile,
        schedule: WaveSchedule {
            waves: Vec::new(),
            growth: Default::default(),
            seed: 7,
            repeat_last: false,
        },
        map: map(),
        balance: BalanceConfig::default(),
        roster: roster(),
    }
}

pub fn sector_id(id: &str) -> SectorId {
    SectorId::new(id)
}

pub fn protocol_id(id: &str) -> ProtocolId {
    ProtocolId::new(id)
}
