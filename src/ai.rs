//! Waypoint-chasing controller for AI cars.
//!
//! A proportional-deadband steering loop, not a PID: compute the signed
//! heading error toward the target, steer hard left or right while the error
//! is outside the deadband, center the wheel inside it, and always request
//! full forward speed.

use std::f32::consts::{FRAC_PI_2, PI};

use log::warn;
use rapier2d::prelude::*;

use crate::car::Car;
use crate::physics::PhysicsWorld;

/// Heading error below this magnitude keeps the wheel centered (radians).
pub const STEER_DEADBAND: f32 = 0.15;

/// Wraps an angle into (-PI, PI].
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Steering decision for a heading error: -1 right, 0 center, +1 left.
pub fn steer_from_error(error: f32) -> i8 {
    if error > STEER_DEADBAND {
        1
    } else if error < -STEER_DEADBAND {
        -1
    } else {
        0
    }
}

/// Signed error between the heading that would point the car's nose at
/// `direction` and its current heading. Forward is local +Y, so the desired
/// heading is the direction angle rotated back by 90 degrees.
pub fn heading_error(direction: Vector<Real>, heading: f32) -> f32 {
    let desired = direction.y.atan2(direction.x) - FRAC_PI_2;
    normalize_angle(desired - heading)
}

/// Points `car` at `target` (px, plus the car's scatter offset) and floors
/// the throttle.
pub fn drive_toward(car: &mut Car, world: &PhysicsWorld, target: Vector<Real>) {
    let (Some(pos), Some(heading)) = (car.position_px(world), car.heading(world)) else {
        warn!("car {:?}: chassis missing, AI idle this tick", car.id);
        return;
    };

    let direction = target + car.target_offset - pos;
    if direction.norm_squared() < 1e-6 {
        car.apply_controls(1, 0);
        return;
    }

    let error = heading_error(direction, heading);
    car.apply_controls(1, steer_from_error(error));
}
