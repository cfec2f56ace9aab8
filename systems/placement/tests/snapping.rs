use glam::Vec2;
use hashguard_core::{Camera, CommandError, SectorId, SlotId, SlotSnapshot};
use hashguard_system_placement::{nearest_free_slot, snap_radius};

fn grid() -> Vec<SlotSnapshot> {
    (0..4u32)
        .map(|index| SlotSnapshot {
            id: SlotId::new(index),
            position: Vec2::new(100.0 * index as f32, 100.0),
            sector: SectorId::new("alpha"),
            occupant: None,
        })
        .collect()
}

fn snap(screen: Vec2, camera: Camera, slots: &[SlotSnapshot]) -> Result<SlotId, CommandError> {
    let point = camera.screen_to_world(screen);
    let radius = snap_radius(40.0, 1.0, &camera);
    nearest_free_slot(point, radius, slots).map(|slot| slot.id)
}

#[test]
fn drag_release_snaps_to_slot_under_the_finger() {
    let slots = grid();
    let camera = Camera::new(Vec2::new(50.0, 50.0), 1.0);
    assert_eq!(
        snap(Vec2::new(160.0, 60.0), camera, &slots),
        Ok(SlotId::new(2))
    );
}

#[test]
fn zoomed_out_release_reaches_further() {
    let slots = grid();
    let near = Camera::new(Vec2::ZERO, 1.0);
    let far = Camera::new(Vec2::ZERO, 0.5);

    // 60 game units away from slot 1 at zoom one.
    assert_eq!(
        snap(Vec2::new(100.0, 160.0), near, &slots),
        Err(CommandError::NoValidSlot)
    );
    // The same game point at half zoom sits at half the screen distance.
    assert_eq!(
        snap(Vec2::new(50.0, 80.0), far, &slots),
        Ok(SlotId::new(1))
    );
}
