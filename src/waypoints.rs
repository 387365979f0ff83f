// ==============================================================================
// waypoints.rs — ROUTE CHECKPOINTS + RACE PROGRESS TRACKING
// ==============================================================================
// The route is an ordered, cyclic checkpoint sequence loaded from map data.
// Each checkpoint registers a rectangular sensor in the physics world; the
// collider -> index table is owned here, so nothing is stored inside physics
// objects.
//
// Progress advances one of two ways, selected per session:
// - Sensor (canonical): a drained contact-begin pair whose sensor matches the
//   car's *expected* checkpoint index advances the car. Out-of-order sensors
//   are ignored, which makes checkpoint skipping impossible.
// - Proximity (fallback): center-within-radius against the expected
//   checkpoint, radius configurable.
//
// Either way a car advances at most once per rendered frame, triggers for
// finished or already-destroyed cars are discarded, and wrapping to index 0
// increments the lap exactly once per full cycle.
// ==============================================================================

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rapier2d::prelude::*;

use crate::car::{Car, CarId};
use crate::map::MapData;
use crate::physics::PhysicsWorld;
use crate::race::RaceEvent;

/// Half-width of the lateral scatter applied to AI targets (px).
pub const TARGET_JITTER: f32 = 25.0;

pub struct Checkpoint {
    pub x: f32,      // px center
    pub y: f32,      // px center
    pub width: f32,  // px
    pub height: f32, // px
    pub angle: Real, // radians
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

impl Checkpoint {
    pub fn center(&self) -> Vector<Real> {
        vector![self.x, self.y]
    }
}

/// The ordered checkpoint sequence for one map. Index order defines the
/// route; after the last checkpoint progress wraps to index 0.
pub struct Route {
    checkpoints: Vec<Checkpoint>,
    by_collider: HashMap<ColliderHandle, usize>,
}

impl Route {
    /// Registers one sensor per map waypoint.
    pub fn from_map(world: &mut PhysicsWorld, map: &MapData) -> Route {
        let mut checkpoints = Vec::with_capacity(map.waypoints.len());
        let mut by_collider = HashMap::new();

        for (index, wp) in map.waypoints.iter().enumerate() {
            let angle = wp.angle_deg.to_radians();
            let (body, collider) = world.create_sensor(wp.x, wp.y, wp.width, wp.height, angle);
            by_collider.insert(collider, index);
            checkpoints.push(Checkpoint {
                x: wp.x,
                y: wp.y,
                width: wp.width,
                height: wp.height,
                angle,
                body,
                collider,
            });
        }

        Route {
            checkpoints,
            by_collider,
        }
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Checkpoint> {
        self.checkpoints.get(index)
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn index_of_collider(&self, collider: ColliderHandle) -> Option<usize> {
        self.by_collider.get(&collider).copied()
    }

    /// Releases the checkpoint sensors from the physics world.
    pub fn destroy(self, world: &mut PhysicsWorld) {
        for checkpoint in self.checkpoints {
            world.destroy_body(checkpoint.body);
        }
    }
}

/// True when `pos` is inside the checkpoint's trigger radius (both px).
pub fn reached_waypoint(pos: Vector<Real>, center: Vector<Real>, radius: f32) -> bool {
    (pos - center).norm_squared() <= radius * radius
}

/// Per-car race progress: the expected checkpoint, completed laps, and lap
/// timing. Checkpoint order is enforced by the tracker; this type only walks
/// the cyclic sequence.
#[derive(Clone, Debug, Default)]
pub struct RaceProgress {
    /// Index of the next checkpoint this car must reach.
    pub waypoint: usize,
    pub lap: u32,
    pub finished: bool,
    /// Session time when the running lap started (s).
    pub lap_started_at: f64,
    pub lap_times: Vec<f64>,
}

impl RaceProgress {
    /// One confirmed checkpoint hit. Wrapping to index 0 completes a lap;
    /// completing the final lap finishes the race. Calls after finishing are
    /// no-ops.
    pub fn advance(
        &mut self,
        id: CarId,
        route_len: usize,
        laps_total: u32,
        now: f64,
        events: &mut Vec<RaceEvent>,
    ) {
        debug_assert!(route_len > 0);
        if self.finished || route_len == 0 {
            return;
        }

        let reached = self.waypoint;
        self.waypoint = (reached + 1) % route_len;
        events.push(RaceEvent::CheckpointReached {
            car: id,
            index: reached,
        });

        if self.waypoint == 0 {
            self.lap += 1;
            let lap_time = now - self.lap_started_at;
            self.lap_started_at = now;
            self.lap_times.push(lap_time);
            events.push(RaceEvent::LapCompleted {
                car: id,
                lap: self.lap,
                lap_time,
            });

            if self.lap >= laps_total {
                self.finished = true;
                events.push(RaceEvent::RaceFinished {
                    car: id,
                    total_time: now,
                });
            }
        }
    }
}

/// How checkpoint arrival is detected.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ProgressDetection {
    /// Sensor-trigger contacts from the physics world. Canonical: a car can
    /// only advance through its expected checkpoint, never skip one.
    #[default]
    Sensor,
    /// Center-within-radius check against the expected checkpoint (px).
    /// Cuts corners when the radius is small relative to the track width.
    Proximity { radius: f32 },
}

pub struct ProgressTracker {
    pub detection: ProgressDetection,
    pub laps_total: u32,
    rng: StdRng,
}

impl ProgressTracker {
    pub fn new(detection: ProgressDetection, laps_total: u32) -> Self {
        Self {
            detection,
            laps_total,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for tests.
    pub fn seeded(detection: ProgressDetection, laps_total: u32, seed: u64) -> Self {
        Self {
            detection,
            laps_total,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Applies one frame of progress. `contacts` are the frame's drained
    /// sensor pairs (ignored in proximity mode).
    pub fn update(
        &mut self,
        contacts: &[(ColliderHandle, ColliderHandle)],
        route: &Route,
        cars: &mut [Car],
        world: &PhysicsWorld,
        now: f64,
        events: &mut Vec<RaceEvent>,
    ) {
        if route.is_empty() {
            return;
        }

        match self.detection {
            ProgressDetection::Sensor => {
                self.process_contacts(contacts, route, cars, world, now, events)
            }
            ProgressDetection::Proximity { radius } => {
                self.process_proximity(radius, route, cars, world, now, events)
            }
        }
    }

    fn process_contacts(
        &mut self,
        contacts: &[(ColliderHandle, ColliderHandle)],
        route: &Route,
        cars: &mut [Car],
        world: &PhysicsWorld,
        now: f64,
        events: &mut Vec<RaceEvent>,
    ) {
        // At most one checkpoint credit per car per frame, even when several
        // sub-steps reported contacts.
        let mut advanced: HashSet<CarId> = HashSet::new();

        for &(a, b) in contacts {
            let (index, other) = match route.index_of_collider(a) {
                Some(index) => (index, b),
                None => match route.index_of_collider(b) {
                    Some(index) => (index, a),
                    None => continue,
                },
            };

            // The pair may reference a body whose car was torn down earlier
            // this tick; anything we cannot map to a live car is dropped.
            let Some(body) = world.collider_body(other) else {
                continue;
            };
            let Some(car) = cars
                .iter_mut()
                .find(|c| c.chassis == body || c.tires.iter().any(|t| t.body == body))
            else {
                continue;
            };

            if advanced.contains(&car.id) || car.progress.finished {
                continue;
            }
            // Only the expected checkpoint counts; driving through a later
            // one out of order does nothing.
            if index != car.progress.waypoint {
                continue;
            }

            car.progress
                .advance(car.id, route.len(), self.laps_total, now, events);
            car.target_offset = self.scatter();
            advanced.insert(car.id);
        }
    }

    fn process_proximity(
        &mut self,
        radius: f32,
        route: &Route,
        cars: &mut [Car],
        world: &PhysicsWorld,
        now: f64,
        events: &mut Vec<RaceEvent>,
    ) {
        for car in cars.iter_mut() {
            if car.progress.finished {
                continue;
            }
            let Some(pos) = car.position_px(world) else {
                continue;
            };
            let Some(checkpoint) = route.get(car.progress.waypoint) else {
                continue;
            };

            if reached_waypoint(pos, checkpoint.center(), radius) {
                car.progress
                    .advance(car.id, route.len(), self.laps_total, now, events);
                car.target_offset = self.scatter();
            }
        }
    }

    fn scatter(&mut self) -> Vector<Real> {
        vector![
            self.rng.gen_range(-TARGET_JITTER..=TARGET_JITTER),
            self.rng.gen_range(-TARGET_JITTER..=TARGET_JITTER)
        ]
    }
}
