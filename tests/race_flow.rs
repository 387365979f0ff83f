//! End-to-end race behavior against a real physics world.

use rapier2d::prelude::*;

use slipstream::physics::{FIXED_DT, px_to_m};
use slipstream::waypoints::ProgressDetection;
use slipstream::{
    CarId, MapData, PhysicsWorld, PlayerInput, RaceConfig, RaceEvent, RaceSession,
};

/// Three corners, car parked just west of the first.
const THREE_CORNERS: &str = "\
START 90 100
CAR 25 50 1.0 -90
WP 100 100 40 40 0
WP 200 100 40 40 0
WP 200 200 40 40 0
";

/// Ten simulated minutes; far more than a clean run needs.
const TICK_BUDGET: u64 = 36_000;

fn nimble_config(detection: ProgressDetection, laps_total: u32) -> RaceConfig {
    let mut config = RaceConfig {
        ai_count: 0,
        laps_total,
        detection,
        autopilot_player: true,
        grid_spacing: 0.0,
        ..RaceConfig::default()
    };
    // Tight circuit: give the test car a tighter steering lock than the
    // road-car default so its turn radius fits between the checkpoints.
    config.car.tire.max_steer_angle = 30.0_f32.to_radians();
    config
}

#[test]
fn ai_car_laps_the_three_corner_circuit() {
    let mut world = PhysicsWorld::new();
    let map = MapData::parse(THREE_CORNERS).unwrap();
    let config = nimble_config(ProgressDetection::Proximity { radius: 60.0 }, 3);
    let mut session = RaceSession::new(&mut world, &map, config).unwrap();

    let mut events = Vec::new();
    let mut ticks = 0;
    while session.results.is_none() && ticks < TICK_BUDGET {
        session.update(&mut world, FIXED_DT, PlayerInput::default());
        events.extend(session.drain_events());
        ticks += 1;
    }

    // Progress is strictly in route order: 0, 1, 2, then the wraparound that
    // coincides with the first lap increment.
    let prefix: Vec<RaceEvent> = events.iter().take(4).copied().collect();
    assert!(
        matches!(
            prefix.as_slice(),
            [
                RaceEvent::CheckpointReached { index: 0, .. },
                RaceEvent::CheckpointReached { index: 1, .. },
                RaceEvent::CheckpointReached { index: 2, .. },
                RaceEvent::LapCompleted { lap: 1, .. },
            ]
        ),
        "unexpected event prefix: {prefix:?}"
    );

    // The race ran to the flag.
    let results = session.results.as_ref().expect("player never finished");
    assert_eq!(results.final_ranking, vec![CarId::PLAYER]);
    assert_eq!(results.player_lap_times.len(), 3);

    let player = &session.cars[0];
    assert!(player.progress.finished);
    assert_eq!(player.progress.lap, 3);
    assert_eq!(player.progress.waypoint, 0);

    session.destroy(&mut world);
    assert_eq!(world.body_count(), 0);
}

#[test]
fn lap_count_increments_exactly_once_per_cycle() {
    let mut world = PhysicsWorld::new();
    let map = MapData::parse(THREE_CORNERS).unwrap();
    let config = nimble_config(ProgressDetection::Proximity { radius: 60.0 }, 2);
    let mut session = RaceSession::new(&mut world, &map, config).unwrap();

    let mut laps_seen = 0;
    let mut checkpoints_seen = 0;
    let mut ticks = 0;
    while session.results.is_none() && ticks < TICK_BUDGET {
        session.update(&mut world, FIXED_DT, PlayerInput::default());
        for event in session.drain_events() {
            match event {
                RaceEvent::CheckpointReached { .. } => checkpoints_seen += 1,
                RaceEvent::LapCompleted { lap, .. } => {
                    laps_seen += 1;
                    assert_eq!(lap, laps_seen);
                }
                RaceEvent::RaceFinished { .. } => {}
            }
        }
        ticks += 1;
    }

    assert_eq!(laps_seen, 2);
    assert_eq!(checkpoints_seen, 2 * 3);
    session.destroy(&mut world);
}

/// Moves a whole car (chassis + tires) by the same delta so the joints stay
/// satisfied across the teleport.
fn teleport_car(world: &mut PhysicsWorld, session: &RaceSession, to_x: f32, to_y: f32) {
    let chassis = session.cars[0].chassis;
    let from = *world.bodies.get(chassis).unwrap().translation();
    let delta = vector![px_to_m(to_x), px_to_m(to_y)] - from;

    let mut handles = vec![chassis];
    handles.extend(session.cars[0].tires.iter().map(|t| t.body));
    for handle in handles {
        let body = world.bodies.get_mut(handle).unwrap();
        let pos = *body.translation();
        body.set_translation(pos + delta, true);
        body.set_linvel(vector![0.0, 0.0], true);
        body.set_angvel(0.0, true);
    }
}

#[test]
fn sensor_checkpoints_only_trigger_in_order() {
    let mut world = PhysicsWorld::new();
    let map = MapData::parse(THREE_CORNERS).unwrap();
    let mut config = nimble_config(ProgressDetection::Sensor, 3);
    config.autopilot_player = false; // drive by teleport, not by AI
    let mut session = RaceSession::new(&mut world, &map, config).unwrap();

    let idle = PlayerInput::default();

    // Driving through checkpoint 1 first does nothing: 0 is still expected.
    teleport_car(&mut world, &session, 200.0, 100.0);
    session.update(&mut world, FIXED_DT, idle);
    assert_eq!(session.cars[0].progress.waypoint, 0);

    // Checkpoint 0 advances.
    teleport_car(&mut world, &session, 100.0, 100.0);
    session.update(&mut world, FIXED_DT, idle);
    assert_eq!(session.cars[0].progress.waypoint, 1);

    // Now checkpoint 1 counts.
    teleport_car(&mut world, &session, 200.0, 100.0);
    session.update(&mut world, FIXED_DT, idle);
    assert_eq!(session.cars[0].progress.waypoint, 2);

    // Re-entering an old checkpoint changes nothing.
    teleport_car(&mut world, &session, 100.0, 100.0);
    session.update(&mut world, FIXED_DT, idle);
    assert_eq!(session.cars[0].progress.waypoint, 2);

    session.destroy(&mut world);
}

#[test]
fn full_grid_races_to_a_complete_ranking() {
    let mut world = PhysicsWorld::new();
    let map = MapData::parse(
        "START 400 160\nCAR 25 50 1.0 0\n\
         WP 400 320 260 50 0\nWP 640 540 50 260 90\nWP 400 760 260 50 0\nWP 160 540 50 260 90\n",
    )
    .unwrap();
    let mut config = nimble_config(ProgressDetection::Proximity { radius: 90.0 }, 1);
    config.ai_count = 2;
    config.grid_spacing = 70.0;
    let mut session = RaceSession::new(&mut world, &map, config).unwrap();

    let mut ticks = 0;
    while session.results.is_none() && ticks < TICK_BUDGET {
        session.update(&mut world, FIXED_DT, PlayerInput::default());
        ticks += 1;
    }

    let results = session.results.as_ref().expect("player never finished");
    // Standings always cover the whole grid, exactly once per car.
    assert_eq!(results.final_ranking.len(), 3);
    let mut ids: Vec<u32> = results.final_ranking.iter().map(|id| id.0).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2]);

    session.destroy(&mut world);
}
