// ==============================================================================
// car.rs — CAR AGGREGATE (CHASSIS + FOUR JOINTED TIRES)
// ==============================================================================
// A car is one convex-hull chassis body plus four tire bodies, each attached
// by a revolute joint. The front pair may swing within the steering range and
// is re-locked every tick by the tire model; the rear pair is welded at zero.
// The chassis itself receives no forces: it moves purely through the joint
// reaction forces of its tires.
//
// Local +Y is forward. Anchors and the silhouette are normalized by the car's
// width/height so one shape serves every car size.
// ==============================================================================

use log::warn;
use rapier2d::prelude::*;
use serde::Serialize;

use crate::physics::{DrawPose, PhysicsWorld};
use crate::tire::{Tire, TireConfig};
use crate::waypoints::RaceProgress;

/// Identity of a car within a session. The player is always id 0, AI
/// opponents count up from 1, and menu mock-ups use a reserved id that never
/// enters the standings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CarId(pub u32);

impl CarId {
    pub const PLAYER: CarId = CarId(0);
    pub const MOCK: CarId = CarId(u32::MAX);

    pub fn is_player(self) -> bool {
        self == Self::PLAYER
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CarConfig {
    pub width: f32,           // px
    pub height: f32,          // px
    pub tire_width: f32,      // px
    pub tire_height: f32,     // px
    pub chassis_density: f32, // kg/m^2
    pub tire_density: f32,    // kg/m^2
    pub tire: TireConfig,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            width: 50.0,
            height: 100.0,
            tire_width: 10.0,
            tire_height: 20.0,
            chassis_density: 0.1,
            tire_density: 1.0,
            tire: TireConfig::default(),
        }
    }
}

/// Normalized car silhouette, scaled by (width, height) at spawn.
const HULL: [[f32; 2]; 8] = [
    [0.10, 0.80],
    [0.28, 0.25],
    [0.30, -0.20],
    [0.15, -0.80],
    [-0.15, -0.80],
    [-0.30, -0.20],
    [-0.28, 0.25],
    [-0.10, 0.80],
];

/// Joint anchors, normalized by (width, height).
const FRONT_ANCHOR: [f32; 2] = [0.30, 0.55];
const REAR_ANCHOR: [f32; 2] = [0.30, -0.55];

/// Mechanical swing allowed to the front steering joints (radians).
const FRONT_SWING: f32 = 0.5;

pub struct Car {
    pub id: CarId,
    pub is_player: bool,
    pub chassis: RigidBodyHandle,
    /// Front-left, front-right, rear-left, rear-right.
    pub tires: [Tire; 4],
    pub config: CarConfig,
    pub progress: RaceProgress,
    /// Pixel offset applied to the next waypoint target so AI cars fan out
    /// instead of converging on the same point.
    pub target_offset: Vector<Real>,
}

impl Car {
    /// Builds the chassis and its four tires at `(x, y)` px, facing
    /// `heading` radians. Tires spawn at their anchor positions so the joint
    /// solver never has to yank them into place.
    pub fn spawn(
        world: &mut PhysicsWorld,
        id: CarId,
        x: f32,
        y: f32,
        heading: Real,
        config: CarConfig,
    ) -> Car {
        let (w, h) = (config.width, config.height);
        let vertices: Vec<[f32; 2]> = HULL.iter().map(|v| [v[0] * w, v[1] * h]).collect();
        let chassis = world.create_hull(x, y, heading, &vertices, config.chassis_density);

        let [fx, fy] = FRONT_ANCHOR;
        let [rx, ry] = REAR_ANCHOR;
        let tires = [
            attach_tire(world, chassis, x, y, heading, vector![-fx * w, fy * h], &config, true),
            attach_tire(world, chassis, x, y, heading, vector![fx * w, fy * h], &config, true),
            attach_tire(world, chassis, x, y, heading, vector![-rx * w, ry * h], &config, false),
            attach_tire(world, chassis, x, y, heading, vector![rx * w, ry * h], &config, false),
        ];

        Car {
            id,
            is_player: id.is_player(),
            chassis,
            tires,
            config,
            progress: RaceProgress::default(),
            target_offset: vector![0.0, 0.0],
        }
    }

    /// Sets movement intent on the drive axle. `throttle` +1 runs the tires
    /// at full forward speed, -1 at reverse speed, 0 coasts; `steer` is -1
    /// right lock, 0 center, +1 left lock.
    pub fn apply_controls(&mut self, throttle: i8, steer: i8) {
        let speed = if throttle > 0 {
            self.config.tire.max_forward_speed
        } else if throttle < 0 {
            -self.config.tire.max_backward_speed
        } else {
            0.0
        };

        // Only the front axle is driven and steered; the rear pair rolls.
        for tire in &mut self.tires[0..2] {
            tire.desired_speed = speed;
            tire.steer_direction = steer;
        }
    }

    /// Runs the four tire models. No chassis-level force is applied.
    pub fn update(&mut self, world: &mut PhysicsWorld, dt: f32) {
        if !world.bodies.contains(self.chassis) {
            warn!("car {:?}: chassis body missing, skipping update", self.id);
            return;
        }
        for tire in &mut self.tires {
            tire.update(world, dt);
        }
    }

    pub fn position_px(&self, world: &PhysicsWorld) -> Option<Vector<Real>> {
        world.position_px(self.chassis)
    }

    pub fn heading(&self, world: &PhysicsWorld) -> Option<Real> {
        world.rotation(self.chassis)
    }

    pub fn draw_pose(&self, world: &PhysicsWorld) -> Option<DrawPose> {
        world.draw_pose(self.chassis)
    }

    /// Tears the car down: tire bodies first, chassis last, so no joint ever
    /// outlives one of its attached bodies. Consuming `self` makes a second
    /// teardown unrepresentable.
    pub fn destroy(self, world: &mut PhysicsWorld) {
        for tire in self.tires {
            world.destroy_body(tire.body);
        }
        world.destroy_body(self.chassis);
    }
}

fn attach_tire(
    world: &mut PhysicsWorld,
    chassis: RigidBodyHandle,
    x: f32,
    y: f32,
    heading: Real,
    anchor_px: Vector<Real>,
    config: &CarConfig,
    steerable: bool,
) -> Tire {
    let rot = Rotation::new(heading);
    let pos = vector![x, y] + rot * anchor_px;
    let body = world.create_box(
        pos.x,
        pos.y,
        config.tire_width,
        config.tire_height,
        heading,
        config.tire_density,
    );

    let (lower, upper) = if steerable {
        (-FRONT_SWING, FRONT_SWING)
    } else {
        (0.0, 0.0)
    };
    let joint = world.create_steer_joint(chassis, body, anchor_px, lower, upper);

    Tire::new(body, joint, config.tire)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_creates_five_bodies_destroy_releases_them() {
        let mut world = PhysicsWorld::new();
        let baseline = world.body_count();

        let car = Car::spawn(&mut world, CarId(1), 200.0, 200.0, 0.0, CarConfig::default());
        assert_eq!(world.body_count(), baseline + 5);

        car.destroy(&mut world);
        assert_eq!(world.body_count(), baseline);
        assert_eq!(world.joints.len(), 0);
    }

    #[test]
    fn controls_reach_only_the_front_axle() {
        let mut world = PhysicsWorld::new();
        let mut car = Car::spawn(&mut world, CarId::PLAYER, 0.0, 0.0, 0.0, CarConfig::default());

        car.apply_controls(1, -1);
        for tire in &car.tires[0..2] {
            assert_eq!(tire.desired_speed, car.config.tire.max_forward_speed);
            assert_eq!(tire.steer_direction, -1);
        }
        for tire in &car.tires[2..4] {
            assert_eq!(tire.desired_speed, 0.0);
            assert_eq!(tire.steer_direction, 0);
        }

        car.apply_controls(-1, 0);
        assert_eq!(
            car.tires[0].desired_speed,
            -car.config.tire.max_backward_speed
        );
    }

    #[test]
    fn tires_spawn_on_their_anchors() {
        let mut world = PhysicsWorld::new();
        let car = Car::spawn(&mut world, CarId(2), 300.0, 400.0, 0.0, CarConfig::default());

        // Front-left anchor for the default 50x100 chassis.
        let pos = world.position_px(car.tires[0].body).unwrap();
        assert!((pos.x - (300.0 - 15.0)).abs() < 1e-3);
        assert!((pos.y - (400.0 + 55.0)).abs() < 1e-3);
    }
}
