mod support;

use hashguard_core::{
    Command, EnemyId, EnemyKind, PlayerCommand, SetupError, SlotId, StatScaling, TowerId,
};
use hashguard_world::{apply, execute, query, World, WorldRecord};

use support::{map, protocol_id, sector_id, setup};

fn populated_world() -> World {
    let mut world = World::new(&setup(2_000)).expect("fixture setup is valid");
    let mut events = Vec::new();
    for slot in [0, 3] {
        execute(
            &mut world,
            PlayerCommand::PlaceTower {
                protocol: protocol_id("pulse"),
                slot: SlotId::new(slot),
            },
            &mut events,
        )
        .expect("placement succeeds");
    }
    execute(
        &mut world,
        PlayerCommand::AddPartialPayment {
            sector: sector_id("beta"),
            amount: 120,
        },
        &mut events,
    )
    .expect("payment succeeds");
    apply(
        &mut world,
        Command::SpawnEnemy {
            kind: EnemyKind::Tank,
            wave: 2,
            lane_roll: 5,
            scaling: StatScaling::IDENTITY,
        },
        &mut events,
    );
    apply(
        &mut world,
        Command::FireProjectile {
            tower: TowerId::new(0),
            target: EnemyId::new(0),
            shots: 2,
        },
        &mut events,
    );
    world
}

#[test]
fn record_survives_bincode_and_restores_the_same_world() {
    let world = populated_world();
    let record = world.record();
    let bytes = bincode::serialize(&record).expect("serialize");
    let decoded: WorldRecord = bincode::deserialize(&bytes).expect("deserialize");
    assert_eq!(decoded, record);

    let restored = World::restore(&setup(2_000), decoded).expect("record matches the setup");
    assert_eq!(query::hash(&restored), query::hash(&world));
    assert_eq!(query::power_used(&restored), 30);
    assert_eq!(query::tower_view(&restored).into_vec(), query::tower_view(&world).into_vec());
    assert_eq!(query::enemy_view(&restored).into_vec(), query::enemy_view(&world).into_vec());
    assert_eq!(query::slots(&restored), query::slots(&world));
    assert_eq!(query::sector_payment(&restored, &sector_id("beta")), 120);
    assert!(
        query::projectile_view(&restored).is_empty(),
        "projectiles in flight are not recorded"
    );
    assert_eq!(restored.record(), record);
}

#[test]
fn restored_world_keeps_allocating_fresh_ids() {
    let record = populated_world().record();
    let mut restored = World::restore(&setup(2_000), record).expect("record matches the setup");

    let mut events = Vec::new();
    execute(
        &mut restored,
        PlayerCommand::PlaceTower {
            protocol: protocol_id("spark"),
            slot: SlotId::new(1),
        },
        &mut events,
    )
    .expect("placement succeeds");
    let towers = query::tower_view(&restored);
    assert!(towers.get(TowerId::new(2)).is_some());
}

#[test]
fn record_referencing_a_missing_slot_is_rejected() {
    let record = populated_world().record();
    let mut shrunk = setup(2_000);
    shrunk.map = map();
    shrunk.map.slots.retain(|slot| slot.id != SlotId::new(3));

    let error = World::restore(&shrunk, record).expect_err("slot 3 no longer exists");
    assert!(matches!(error, SetupError::RecordMismatch { .. }));
}
