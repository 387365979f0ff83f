// ==============================================================================
// race.rs — RACE SESSION, RANKING, TIMING
// ==============================================================================
// The session owns everything a race needs: the route (checkpoints + sensors),
// the cars, the progress tracker and the clock. One `update` per rendered
// frame runs controllers, tire physics, the fixed-timestep world, progress
// tracking and the standings recompute, in that order.
//
// Standings are a strict total order over (lap desc, checkpoint desc,
// distance-to-next asc), rebuilt from scratch every frame; with at most a
// handful of cars there is nothing worth caching.
// ==============================================================================

use std::cmp::Ordering;
use std::fmt;

use log::info;
use rapier2d::prelude::*;
use serde::Serialize;

use crate::ai;
use crate::car::{Car, CarConfig, CarId};
use crate::map::MapData;
use crate::physics::PhysicsWorld;
use crate::waypoints::{ProgressDetection, ProgressTracker, Route};

#[derive(Clone, Copy, Debug)]
pub struct RaceConfig {
    pub laps_total: u32,
    pub ai_count: u32,
    pub detection: ProgressDetection,
    pub car: CarConfig,
    /// Starting-grid slot spacing (px).
    pub grid_spacing: f32,
    /// Let the waypoint AI drive the player car (headless runs, demos).
    pub autopilot_player: bool,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            laps_total: 3,
            ai_count: 3,
            detection: ProgressDetection::Sensor,
            car: CarConfig::default(),
            grid_spacing: 70.0,
            autopilot_player: false,
        }
    }
}

/// Discrete things that happened during a frame. The host maps these to
/// audio cues and UI; the simulation itself only records them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum RaceEvent {
    CheckpointReached { car: CarId, index: usize },
    LapCompleted { car: CarId, lap: u32, lap_time: f64 },
    RaceFinished { car: CarId, total_time: f64 },
}

/// Frozen outcome of a race, built the moment the player takes the flag.
#[derive(Clone, Debug, Serialize)]
pub struct RaceResults {
    pub final_ranking: Vec<CarId>,
    pub player_lap_times: Vec<f64>,
    pub total_time: f64,
}

#[derive(Debug)]
pub enum RaceSetupError {
    NoCheckpoints,
}

impl fmt::Display for RaceSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceSetupError::NoCheckpoints => {
                write!(f, "map has no checkpoints; a race cannot start without a route")
            }
        }
    }
}

impl std::error::Error for RaceSetupError {}

/// Player intent for one frame: throttle -1/0/+1, steer -1/0/+1.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlayerInput {
    pub throttle: i8,
    pub steer: i8,
}

/// Ranking key for one car.
#[derive(Clone, Copy, Debug)]
pub struct RankKey {
    pub car: CarId,
    pub lap: u32,
    pub checkpoint: usize,
    pub distance_to_next: f32,
}

/// Total order: laps beat checkpoints beat distance. Exact ties keep their
/// incoming order (the sort is stable).
pub fn rank(mut keys: Vec<RankKey>) -> Vec<CarId> {
    keys.sort_by(|a, b| {
        b.lap
            .cmp(&a.lap)
            .then(b.checkpoint.cmp(&a.checkpoint))
            .then(
                a.distance_to_next
                    .partial_cmp(&b.distance_to_next)
                    .unwrap_or(Ordering::Equal),
            )
    });
    keys.into_iter().map(|k| k.car).collect()
}

/// `mm:ss.mmm` race clock.
pub fn format_race_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0) as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{minutes:02}:{secs:02}.{millis:03}")
}

#[derive(Serialize)]
pub struct CarSnapshot {
    pub id: CarId,
    pub x: f32,
    pub y: f32,
    pub rotation_deg: f32,
    pub lap: u32,
    pub checkpoint: usize,
    pub finished: bool,
}

/// Per-frame state export, mirroring what a front end needs to draw a frame.
#[derive(Serialize)]
pub struct SessionSnapshot {
    pub time: f64,
    pub standings: Vec<CarId>,
    pub cars: Vec<CarSnapshot>,
}

pub struct RaceSession {
    pub route: Route,
    pub cars: Vec<Car>,
    pub config: RaceConfig,
    tracker: ProgressTracker,
    elapsed: f64,
    pub standings: Vec<CarId>,
    pub results: Option<RaceResults>,
    events: Vec<RaceEvent>,
}

impl RaceSession {
    /// Builds the route and the starting grid. A map without checkpoints is
    /// rejected outright rather than racing over an empty route.
    pub fn new(
        world: &mut PhysicsWorld,
        map: &MapData,
        config: RaceConfig,
    ) -> Result<RaceSession, RaceSetupError> {
        if map.waypoints.is_empty() {
            return Err(RaceSetupError::NoCheckpoints);
        }

        let route = Route::from_map(world, map);

        let mut car_config = config.car;
        let heading = match map.car {
            Some(dims) => {
                car_config.width = dims.width;
                car_config.height = dims.height;
                dims.heading_deg.to_radians()
            }
            None => 0.0,
        };

        let rot = Rotation::new(heading);
        let mut cars = Vec::with_capacity(config.ai_count as usize + 1);
        for i in 0..=config.ai_count {
            let slot = rot * grid_slot(i, config.grid_spacing);
            cars.push(Car::spawn(
                world,
                CarId(i),
                map.start.x + slot.x,
                map.start.y + slot.y,
                heading,
                car_config,
            ));
        }
        info!("race ready: {} cars, {} checkpoints", cars.len(), route.len());

        let standings = cars.iter().map(|c| c.id).collect();
        Ok(RaceSession {
            route,
            cars,
            tracker: ProgressTracker::new(config.detection, config.laps_total),
            config,
            elapsed: 0.0,
            standings,
            results: None,
            events: Vec::new(),
        })
    }

    /// One rendered frame: controllers, tire forces, fixed-timestep physics,
    /// progress, standings.
    pub fn update(&mut self, world: &mut PhysicsWorld, elapsed: f32, input: PlayerInput) {
        self.elapsed += elapsed as f64;

        for car in &mut self.cars {
            if car.progress.finished {
                // Past the flag: coast out, ignore further intent.
                car.apply_controls(0, 0);
                continue;
            }
            if car.is_player && !self.config.autopilot_player {
                car.apply_controls(input.throttle, input.steer);
            } else if let Some(checkpoint) = self.route.get(car.progress.waypoint) {
                ai::drive_toward(car, world, checkpoint.center());
            }
        }

        // Tire forces act on the state left by the previous completed step.
        for car in &mut self.cars {
            car.update(world, crate::physics::FIXED_DT);
        }

        world.advance(elapsed);

        let contacts = world.drain_contacts();
        self.tracker.update(
            &contacts,
            &self.route,
            &mut self.cars,
            world,
            self.elapsed,
            &mut self.events,
        );

        self.standings = rank(self.rank_keys(world));

        if self.results.is_none() {
            if let Some(player) = self.cars.iter().find(|c| c.is_player) {
                if player.progress.finished {
                    self.results = Some(RaceResults {
                        final_ranking: self.standings.clone(),
                        player_lap_times: player.progress.lap_times.clone(),
                        total_time: self.elapsed,
                    });
                }
            }
        }
    }

    fn rank_keys(&self, world: &PhysicsWorld) -> Vec<RankKey> {
        self.cars
            .iter()
            .filter(|car| car.id != CarId::MOCK)
            .map(|car| {
                let distance_to_next = match (
                    car.position_px(world),
                    self.route.get(car.progress.waypoint),
                ) {
                    (Some(pos), Some(checkpoint)) => (checkpoint.center() - pos).norm(),
                    _ => f32::MAX,
                };
                RankKey {
                    car: car.id,
                    lap: car.progress.lap,
                    checkpoint: car.progress.waypoint,
                    distance_to_next,
                }
            })
            .collect()
    }

    /// Events recorded since the last drain, in the order they happened.
    pub fn drain_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn race_time(&self) -> f64 {
        self.elapsed
    }

    pub fn snapshot(&self, world: &PhysicsWorld) -> SessionSnapshot {
        SessionSnapshot {
            time: self.elapsed,
            standings: self.standings.clone(),
            cars: self
                .cars
                .iter()
                .map(|car| {
                    let pose = car.draw_pose(world).unwrap_or_default();
                    CarSnapshot {
                        id: car.id,
                        x: pose.x,
                        y: pose.y,
                        rotation_deg: pose.rotation_deg,
                        lap: car.progress.lap,
                        checkpoint: car.progress.waypoint,
                        finished: car.progress.finished,
                    }
                })
                .collect(),
        }
    }

    /// Synchronous teardown: every car (tires before chassis), then the
    /// route's sensors.
    pub fn destroy(self, world: &mut PhysicsWorld) {
        for car in self.cars {
            car.destroy(world);
        }
        self.route.destroy(world);
    }
}

fn grid_slot(index: u32, spacing: f32) -> Vector<Real> {
    let row = index as f32;
    let side = if index % 2 == 0 { 1.0 } else { -1.0 };
    // Staggered two-wide grid stretching back from the start line.
    vector![side * spacing * 0.5, -row * spacing]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapData;

    #[test]
    fn ranking_prefers_laps_then_checkpoints_then_distance() {
        let keys = vec![
            RankKey { car: CarId(1), lap: 2, checkpoint: 5, distance_to_next: 10.0 },
            RankKey { car: CarId(2), lap: 2, checkpoint: 5, distance_to_next: 3.0 },
            RankKey { car: CarId(3), lap: 3, checkpoint: 0, distance_to_next: 100.0 },
        ];
        assert_eq!(rank(keys), vec![CarId(3), CarId(2), CarId(1)]);
    }

    #[test]
    fn ranking_is_stable_on_exact_ties() {
        let keys = vec![
            RankKey { car: CarId(4), lap: 1, checkpoint: 2, distance_to_next: 7.0 },
            RankKey { car: CarId(5), lap: 1, checkpoint: 2, distance_to_next: 7.0 },
        ];
        assert_eq!(rank(keys), vec![CarId(4), CarId(5)]);
    }

    #[test]
    fn race_clock_formats_minutes_seconds_millis() {
        assert_eq!(format_race_time(0.0), "00:00.000");
        assert_eq!(format_race_time(83.456), "01:23.456");
        assert_eq!(format_race_time(-1.0), "00:00.000");
    }

    #[test]
    fn empty_route_is_a_setup_error() {
        let mut world = PhysicsWorld::new();
        let map = MapData::parse("START 0 0\n").unwrap();
        assert!(matches!(
            RaceSession::new(&mut world, &map, RaceConfig::default()),
            Err(RaceSetupError::NoCheckpoints)
        ));
    }

    #[test]
    fn session_spawns_grid_and_tears_down_cleanly() {
        let mut world = PhysicsWorld::new();
        let map = MapData::parse("START 400 160\nWP 400 300 240 40 0\nWP 400 700 240 40 0\n")
            .unwrap();
        let baseline = world.body_count();

        let config = RaceConfig { ai_count: 2, ..RaceConfig::default() };
        let mut session = RaceSession::new(&mut world, &map, config).unwrap();

        // 3 cars x 5 bodies + 2 sensors.
        assert_eq!(session.cars.len(), 3);
        assert_eq!(world.body_count(), baseline + 3 * 5 + 2);
        assert_eq!(session.standings.len(), 3);

        session.update(&mut world, crate::physics::FIXED_DT, PlayerInput::default());
        assert_eq!(session.standings.len(), 3);

        session.destroy(&mut world);
        assert_eq!(world.body_count(), baseline);
    }
}
