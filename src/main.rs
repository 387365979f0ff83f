//! Headless demo: a full AI race on the built-in circuit.
//!
//! Runs the menu -> race -> results flow at a fixed 60 Hz without a renderer,
//! logging standings while the race runs and the final results at the end.

use log::{error, info, warn};

use slipstream::leaderboard::LeaderboardUi;
use slipstream::race::format_race_time;
use slipstream::waypoints::{ProgressDetection, ProgressTracker, Route};
use slipstream::{
    Car, CarConfig, CarId, FIXED_DT, GameFlow, GameState, MapData, PhysicsWorld, PlayerInput,
    RaceConfig, RaceSession,
};

const CIRCUIT: &str = include_str!("../assets/circuit01.map");

/// Menu backdrop: ticks shown before the race starts.
const MENU_TICKS: u32 = 120;
/// Hard cap so a stuck race cannot run forever (10 simulated minutes).
const MAX_RACE_TICKS: u64 = 60 * 60 * 10;

fn main() {
    env_logger::init();

    let map = match MapData::parse(CIRCUIT) {
        Ok(map) => map,
        Err(err) => {
            error!("built-in circuit failed to parse: {err}");
            return;
        }
    };

    let mut world = PhysicsWorld::new();
    let mut flow = GameFlow::new();

    // ------------------------------------------------------------------
    // Menu: a mock car laps the circuit behind the (absent) UI.
    // ------------------------------------------------------------------
    info!("state -> {:?}", flow.state());
    let route = Route::from_map(&mut world, &map);
    let mut mock = vec![Car::spawn(
        &mut world,
        CarId::MOCK,
        map.start.x,
        map.start.y,
        0.0,
        CarConfig::default(),
    )];
    let mut tracker = ProgressTracker::new(ProgressDetection::Proximity { radius: 80.0 }, u32::MAX);
    let mut events = Vec::new();

    for _ in 0..MENU_TICKS {
        if let Some(checkpoint) = route.get(mock[0].progress.waypoint) {
            slipstream::ai::drive_toward(&mut mock[0], &world, checkpoint.center());
        }
        mock[0].update(&mut world, FIXED_DT);
        world.advance(FIXED_DT);
        let contacts = world.drain_contacts();
        tracker.update(&contacts, &route, &mut mock, &world, 0.0, &mut events);
    }

    // Leaving the menu tears the mock-up down before the race is built.
    flow.request(GameState::Race);
    if flow.process().is_some() {
        for car in mock.drain(..) {
            car.destroy(&mut world);
        }
        route.destroy(&mut world);
        events.clear();
        info!("state -> {:?}", flow.state());
    }

    // ------------------------------------------------------------------
    // Race: player slot on autopilot, three AI opponents.
    // ------------------------------------------------------------------
    let config = RaceConfig {
        ai_count: 3,
        autopilot_player: true,
        ..RaceConfig::default()
    };
    let mut session = match RaceSession::new(&mut world, &map, config) {
        Ok(session) => session,
        Err(err) => {
            error!("race setup failed: {err}");
            return;
        }
    };
    let mut ui = LeaderboardUi::default();

    let mut ticks: u64 = 0;
    while session.results.is_none() && ticks < MAX_RACE_TICKS {
        session.update(&mut world, FIXED_DT, PlayerInput::default());

        for event in session.drain_events() {
            match event {
                slipstream::RaceEvent::LapCompleted { car, lap, lap_time } => {
                    info!("car {} lap {lap} in {}", car.0, format_race_time(lap_time));
                }
                slipstream::RaceEvent::RaceFinished { car, total_time } => {
                    info!("car {} finished in {}", car.0, format_race_time(total_time));
                }
                slipstream::RaceEvent::CheckpointReached { .. } => {}
            }
        }

        ui.sync(&session.standings);
        ui.animate(FIXED_DT);

        if ticks % 600 == 0 {
            for row in ui.rows() {
                info!(
                    "t={} P{} car {}{}",
                    format_race_time(session.race_time()),
                    row.rank,
                    row.car.0,
                    if row.flash_timer > 0.0 { " *" } else { "" }
                );
            }
            if let Ok(json) = serde_json::to_string(&session.snapshot(&world)) {
                info!("snapshot: {json}");
            }
        }
        ticks += 1;
    }

    // ------------------------------------------------------------------
    // Results.
    // ------------------------------------------------------------------
    flow.request(GameState::Results);
    flow.process();
    info!("state -> {:?}", flow.state());

    match &session.results {
        Some(results) => {
            for (i, car) in results.final_ranking.iter().enumerate() {
                info!("{}. car {}", i + 1, car.0);
            }
            for (i, lap) in results.player_lap_times.iter().enumerate() {
                info!("player lap {}: {}", i + 1, format_race_time(*lap));
            }
            info!("total: {}", format_race_time(results.total_time));
            if let Ok(json) = serde_json::to_string(results) {
                info!("results json: {json}");
            }
        }
        None => warn!("race hit the tick cap before the player finished"),
    }

    session.destroy(&mut world);
}
