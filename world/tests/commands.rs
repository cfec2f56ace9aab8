mod support;

use std::time::Duration;

use glam::Vec2;
use hashguard_core::{
    BossDifficulty, BossPhase, Camera, Command, CommandError, Event, PlayerCommand, SlotId,
    TowerId,
};
use hashguard_world::{apply, execute, query, World};

use support::{protocol_id, sector_id, setup, BETA_SLOT};

fn world(hash: u64) -> World {
    World::new(&setup(hash)).expect("fixture setup is valid")
}

fn place(world: &mut World, protocol: &str, slot: u32) -> Result<Vec<Event>, CommandError> {
    let mut events = Vec::new();
    execute(
        world,
        PlayerCommand::PlaceTower {
            protocol: protocol_id(protocol),
            slot: SlotId::new(slot),
        },
        &mut events,
    )
    .map(|()| events)
}

fn run(world: &mut World, command: PlayerCommand) -> (Result<(), CommandError>, Vec<Event>) {
    let mut events = Vec::new();
    let result = execute(world, command, &mut events);
    (result, events)
}

fn raise_boss_alert(world: &mut World) {
    let mut events = Vec::new();
    apply(world, Command::AdvanceBoss { dt: Duration::from_secs(2) }, &mut events);
    assert!(matches!(query::boss_phase(world), BossPhase::Alerted { .. }));
}

#[test]
fn placement_debits_hash_and_draws_power() {
    let mut world = world(1_000);
    let events = place(&mut world, "pulse", 0).expect("placement succeeds");

    assert_eq!(
        events,
        vec![Event::TowerPlaced {
            tower: TowerId::new(0),
            slot: SlotId::new(0),
            protocol: protocol_id("pulse"),
        }]
    );
    assert_eq!(query::hash(&world), 950);
    assert_eq!(query::power_used(&world), 15);
    let slots = query::slots(&world);
    assert_eq!(slots[0].occupant, Some(TowerId::new(0)));
}

#[test]
fn placement_rejections_follow_a_fixed_order() {
    let mut world = world(10);

    assert_eq!(
        place(&mut world, "unknown", 0),
        Err(CommandError::UnknownProtocol {
            protocol: protocol_id("unknown"),
        })
    );
    assert_eq!(
        place(&mut world, "relay", 0),
        Err(CommandError::ProtocolNotCompiled {
            protocol: protocol_id("relay"),
        })
    );
    assert_eq!(place(&mut world, "pulse", 999), Err(CommandError::NoValidSlot));
    assert_eq!(
        place(&mut world, "pulse", BETA_SLOT.get()),
        Err(CommandError::SectorLocked {
            missing_sectors: vec![sector_id("beta")],
            missing_protocols: Vec::new(),
        })
    );
    assert_eq!(
        place(&mut world, "pulse", 0),
        Err(CommandError::InsufficientCurrency {
            required: 50,
            available: 10,
        })
    );
    assert_eq!(query::hash(&world), 10, "rejections never debit hash");
    assert!(query::tower_view(&world).is_empty());
}

#[test]
fn occupied_slot_is_rejected() {
    let mut world = world(1_000);
    let _ = place(&mut world, "pulse", 0).expect("first placement succeeds");
    assert_eq!(
        place(&mut world, "spark", 0),
        Err(CommandError::SlotOccupied {
            slot: SlotId::new(0),
        })
    );
}

#[test]
fn placement_beyond_power_capacity_leaves_usage_unchanged() {
    let mut world = world(5_000);
    for slot in 0..10 {
        let _ = place(&mut world, "lance", slot).expect("within the 300 power budget");
    }
    assert_eq!(query::power_used(&world), 300);
    let hash_before = query::hash(&world);

    assert_eq!(
        place(&mut world, "spark", 10),
        Err(CommandError::InsufficientPower {
            required: 20,
            available: 0,
        })
    );
    assert_eq!(query::power_used(&world), 300);
    assert_eq!(query::hash(&world), hash_before);
    assert_eq!(query::tower_view(&world).len(), 10);
}

#[test]
fn selling_refunds_half_the_investment_and_frees_the_slot() {
    let mut world = world(1_000);
    let _ = place(&mut world, "pulse", 0).expect("placement succeeds");
    let (result, _) = run(
        &mut world,
        PlayerCommand::UpgradeTower {
            tower: TowerId::new(0),
        },
    );
    result.expect("upgrade succeeds");
    assert_eq!(query::hash(&world), 875, "upgrade from level one costs 75");

    let (result, events) = run(
        &mut world,
        PlayerCommand::SellTower {
            tower: TowerId::new(0),
        },
    );
    result.expect("sale succeeds");
    assert_eq!(
        events,
        vec![Event::TowerSold {
            tower: TowerId::new(0),
            slot: SlotId::new(0),
            refund: 62,
        }]
    );
    assert_eq!(query::hash(&world), 937);
    assert_eq!(query::power_used(&world), 0);
    assert!(query::slots(&world)[0].occupant.is_none());

    let (result, _) = run(
        &mut world,
        PlayerCommand::SellTower {
            tower: TowerId::new(0),
        },
    );
    assert_eq!(result, Err(CommandError::UnknownTower));
}

#[test]
fn upgrades_stop_at_the_maximum_level() {
    let mut world = world(25_000);
    let _ = place(&mut world, "pulse", 0).expect("placement succeeds");
    for level in 2..=10 {
        let (result, events) = run(
            &mut world,
            PlayerCommand::UpgradeTower {
                tower: TowerId::new(0),
            },
        );
        result.expect("upgrade below the maximum succeeds");
        assert!(events.contains(&Event::TowerUpgraded {
            tower: TowerId::new(0),
            level,
        }));
    }

    let (result, _) = run(
        &mut world,
        PlayerCommand::UpgradeTower {
            tower: TowerId::new(0),
        },
    );
    assert_eq!(result, Err(CommandError::MaxLevel { level: 10 }));
    let tower = query::tower_view(&world).into_vec().remove(0);
    assert_eq!(tower.level, 10);
    assert!(tower.stats.power_draw > 15);
    assert_eq!(query::power_used(&world), tower.stats.power_draw);
}

#[test]
fn snapped_placement_picks_the_nearest_free_slot() {
    let mut world = world(1_000);
    let camera = Camera::new(Vec2::new(50.0, 0.0), 1.0);
    let (result, events) = run(
        &mut world,
        PlayerCommand::PlaceTowerAt {
            protocol: protocol_id("pulse"),
            screen: Vec2::new(60.0, 45.0),
            camera,
        },
    );
    result.expect("a slot lies within the snap radius");
    assert!(events.contains(&Event::TowerPlaced {
        tower: TowerId::new(0),
        slot: SlotId::new(0),
        protocol: protocol_id("pulse"),
    }));

    let (result, _) = run(
        &mut world,
        PlayerCommand::PlaceTowerAt {
            protocol: protocol_id("pulse"),
            screen: Vec2::new(60.0, 45.0),
            camera,
        },
    );
    assert_eq!(
        result,
        Err(CommandError::SlotOccupied {
            slot: SlotId::new(0),
        })
    );
}

#[test]
fn snapping_onto_a_locked_sector_taps_its_gate() {
    let mut world = world(600);
    let (result, events) = run(
        &mut world,
        PlayerCommand::PlaceTowerAt {
            protocol: protocol_id("pulse"),
            screen: Vec2::new(100.0, 150.0),
            camera: Camera::default(),
        },
    );
    assert_eq!(
        result,
        Err(CommandError::SectorLocked {
            missing_sectors: vec![sector_id("beta")],
            missing_protocols: Vec::new(),
        })
    );
    assert_eq!(
        events,
        vec![Event::SectorGateTapped {
            sector: sector_id("beta"),
            unlockable: true,
        }]
    );
}

#[test]
fn partial_payments_accumulate_and_unlock_at_the_cost() {
    let mut world = world(1_000);

    let (result, events) = run(
        &mut world,
        PlayerCommand::AddPartialPayment {
            sector: sector_id("beta"),
            amount: 0,
        },
    );
    assert_eq!(result, Ok(()));
    assert!(events.is_empty());
    assert_eq!(query::hash(&world), 1_000);

    let (result, _) = run(
        &mut world,
        PlayerCommand::AddPartialPayment {
            sector: sector_id("beta"),
            amount: 200,
        },
    );
    result.expect("payment is accepted");
    assert_eq!(query::sector_payment(&world, &sector_id("beta")), 200);

    let (result, events) = run(
        &mut world,
        PlayerCommand::AddPartialPayment {
            sector: sector_id("beta"),
            amount: 400,
        },
    );
    result.expect("completing payment is accepted");
    assert_eq!(
        events,
        vec![
            Event::SectorPaymentRecorded {
                sector: sector_id("beta"),
                paid: 500,
                cost: 500,
            },
            Event::SectorUnlocked {
                sector: sector_id("beta"),
            },
        ]
    );
    assert_eq!(query::hash(&world), 500, "only the remaining 300 is taken");
    assert!(query::unlocked_sectors(&world).contains(&sector_id("beta")));
    assert_eq!(query::sector_payment(&world, &sector_id("beta")), 0);
}

#[test]
fn profile_payments_covering_the_cost_unlock_on_load() {
    let mut setup = setup(1_000);
    let _ = setup.profile.sector_payments.insert(sector_id("beta"), 500);
    let mut world = World::new(&setup).expect("fixture setup is valid");

    assert!(query::unlocked_sectors(&world).contains(&sector_id("beta")));
    assert_eq!(query::sector_payment(&world, &sector_id("beta")), 0);
    assert_eq!(query::hash(&world), 1_000);
    place(&mut world, "pulse", BETA_SLOT.get()).expect("beta slots are open");
}

#[test]
fn unlock_reports_every_missing_requirement() {
    let mut world = world(5_000);
    let (result, _) = run(
        &mut world,
        PlayerCommand::UnlockSector {
            sector: sector_id("gamma"),
        },
    );
    assert_eq!(
        result,
        Err(CommandError::SectorLocked {
            missing_sectors: vec![sector_id("beta")],
            missing_protocols: vec![protocol_id("relay")],
        })
    );
    assert_eq!(query::hash(&world), 5_000);

    let (result, _) = run(
        &mut world,
        PlayerCommand::UnlockSector {
            sector: sector_id("alpha"),
        },
    );
    let error = result.expect_err("alpha starts unlocked");
    assert!(error.is_noop());
}

#[test]
fn unlock_deducts_only_the_unpaid_remainder() {
    let mut world = world(1_000);
    let (result, _) = run(
        &mut world,
        PlayerCommand::AddPartialPayment {
            sector: sector_id("beta"),
            amount: 150,
        },
    );
    result.expect("payment is accepted");

    let (result, events) = run(
        &mut world,
        PlayerCommand::UnlockSector {
            sector: sector_id("beta"),
        },
    );
    result.expect("unlock succeeds");
    assert_eq!(
        events,
        vec![Event::SectorUnlocked {
            sector: sector_id("beta"),
        }]
    );
    assert_eq!(query::hash(&world), 500);
}

#[test]
fn insufficient_hash_for_unlock_changes_nothing() {
    let mut world = world(100);
    let (result, events) = run(
        &mut world,
        PlayerCommand::UnlockSector {
            sector: sector_id("beta"),
        },
    );
    assert_eq!(
        result,
        Err(CommandError::InsufficientCurrency {
            required: 500,
            available: 100,
        })
    );
    assert!(events.is_empty());
    assert!(!query::unlocked_sectors(&world).contains(&sector_id("beta")));
}

#[test]
fn gate_tap_reports_whether_the_sector_is_affordable() {
    let mut world = world(100);
    let (result, events) = run(
        &mut world,
        PlayerCommand::TapSectorGate {
            sector: sector_id("beta"),
        },
    );
    result.expect("tap on a locked gate succeeds");
    assert_eq!(
        events,
        vec![Event::SectorGateTapped {
            sector: sector_id("beta"),
            unlockable: false,
        }]
    );
}

#[test]
fn hard_boss_needs_double_health_in_damage() {
    let mut world = world(0);
    let mut events = Vec::new();
    apply(&mut world, Command::SpawnBoss { wave: 4 }, &mut events);
    assert!(matches!(query::boss_phase(&world), BossPhase::Spawned { .. }));
    raise_boss_alert(&mut world);

    let (result, _) = run(
        &mut world,
        PlayerCommand::EngageBoss {
            difficulty: BossDifficulty::Hard,
        },
    );
    result.expect("an alerted boss can be engaged");
    assert!(query::boss_engaged(&world));

    let (result, events) = run(&mut world, PlayerCommand::DamageBoss { amount: 1_999.0 });
    result.expect("damage is accepted");
    assert_eq!(
        events,
        (2..=4)
            .map(|phase| Event::BossPhaseChanged {
                sector: sector_id("alpha"),
                phase,
            })
            .collect::<Vec<_>>(),
        "1999 damage leaves the boss standing in its last phase"
    );

    let (result, events) = run(&mut world, PlayerCommand::DamageBoss { amount: 1.0 });
    result.expect("final damage is accepted");
    assert_eq!(
        events,
        vec![
            Event::BossDefeated {
                sector: sector_id("alpha"),
                reward: 1_000,
                first_kill: true,
            },
            Event::SectorUnlocked {
                sector: sector_id("beta"),
            },
        ]
    );
    assert_eq!(query::hash(&world), 1_000);
    assert!(query::defeated_bosses(&world).contains(&sector_id("alpha")));
    assert!(query::enemy_view(&world).is_empty());

    let (result, _) = run(
        &mut world,
        PlayerCommand::EngageBoss {
            difficulty: BossDifficulty::Easy,
        },
    );
    assert_eq!(
        result,
        Err(CommandError::AlreadyDefeated {
            sector: sector_id("alpha"),
        })
    );
}

#[test]
fn spawned_boss_must_raise_its_alert_before_engagement() {
    let mut world = world(0);
    let mut events = Vec::new();
    apply(&mut world, Command::SpawnBoss { wave: 4 }, &mut events);

    let (result, events) = run(
        &mut world,
        PlayerCommand::EngageBoss {
            difficulty: BossDifficulty::Normal,
        },
    );
    assert_eq!(result, Err(CommandError::BossNotAlerted));
    assert!(events.is_empty());
    assert!(!query::boss_engaged(&world));

    raise_boss_alert(&mut world);
    let (result, _) = run(
        &mut world,
        PlayerCommand::EngageBoss {
            difficulty: BossDifficulty::Normal,
        },
    );
    result.expect("alerted boss can be engaged");
}

#[test]
fn boss_phases_follow_health_after_engagement() {
    let mut world = world(0);
    let mut events = Vec::new();
    apply(&mut world, Command::SpawnBoss { wave: 4 }, &mut events);
    raise_boss_alert(&mut world);
    let (result, _) = run(
        &mut world,
        PlayerCommand::EngageBoss {
            difficulty: BossDifficulty::Normal,
        },
    );
    result.expect("engagement succeeds");

    let (_, events) = run(&mut world, PlayerCommand::DamageBoss { amount: 249.0 });
    assert!(events.is_empty());
    let (_, events) = run(&mut world, PlayerCommand::DamageBoss { amount: 1.0 });
    assert_eq!(
        events,
        vec![Event::BossPhaseChanged {
            sector: sector_id("alpha"),
            phase: 2,
        }]
    );
    let (_, events) = run(&mut world, PlayerCommand::DamageBoss { amount: 750.0 });
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::BossPhaseChanged { .. })),
        "the killing blow reports the victory only"
    );
    assert!(events.contains(&Event::BossDefeated {
        sector: sector_id("alpha"),
        reward: 500,
        first_kill: true,
    }));
}

#[test]
fn retreat_restores_pre_engagement_health() {
    let mut world = world(0);
    let mut events = Vec::new();
    apply(&mut world, Command::SpawnBoss { wave: 4 }, &mut events);
    raise_boss_alert(&mut world);

    let (result, _) = run(
        &mut world,
        PlayerCommand::EngageBoss {
            difficulty: BossDifficulty::Nightmare,
        },
    );
    result.expect("engagement succeeds");
    let (result, _) = run(&mut world, PlayerCommand::DamageBoss { amount: 900.0 });
    result.expect("damage is accepted");

    let (result, events) = run(&mut world, PlayerCommand::RetreatFromBoss);
    result.expect("retreat succeeds");
    assert_eq!(
        events,
        vec![Event::BossRetreated {
            sector: sector_id("alpha"),
        }]
    );
    let boss = query::enemy_view(&world).into_vec().remove(0);
    assert_eq!(boss.health, 1_000.0);
    assert_eq!(boss.max_health, 1_000.0);
    assert!(matches!(query::boss_phase(&world), BossPhase::Alerted { .. }));
}

#[test]
fn boss_commands_without_a_boss_are_rejected() {
    let mut world = world(0);
    let (result, _) = run(
        &mut world,
        PlayerCommand::EngageBoss {
            difficulty: BossDifficulty::Normal,
        },
    );
    assert_eq!(result, Err(CommandError::NoActiveBoss));
    let (result, _) = run(&mut world, PlayerCommand::DamageBoss { amount: 10.0 });
    assert_eq!(result, Err(CommandError::NoBossEngaged));
}

#[test]
fn lowering_capacity_overloads_the_grid() {
    let mut world = world(1_000);
    let _ = place(&mut world, "pulse", 0).expect("placement succeeds");
    let (result, events) = run(&mut world, PlayerCommand::SetPowerCapacity { capacity: 10 });
    result.expect("capacity changes are always accepted");
    assert_eq!(
        events,
        vec![Event::PowerOverloaded {
            used: 15,
            capacity: 10,
        }]
    );

    let (result, _) = run(&mut world, PlayerCommand::FlushMemory);
    assert_eq!(result, Err(CommandError::NothingToRecover));
}

#[test]
fn pause_toggle_only_reports_changes() {
    let mut world = world(0);
    let (_, events) = run(&mut world, PlayerCommand::SetPaused { paused: true });
    assert_eq!(events, vec![Event::PauseChanged { paused: true }]);
    let (_, events) = run(&mut world, PlayerCommand::SetPaused { paused: true });
    assert!(events.is_empty());
    assert!(query::is_paused(&world));
}
