// ==============================================================================
// tire.rs — SINGLE-TIRE DRIVE / FRICTION / STEER MODEL
// ==============================================================================
// Each tire is its own dynamic body. Every frame, in order:
// 1) Lateral friction: cancel the sideways component of the tire's velocity
//    with an impulse clamped to the grip limit, damp residual spin, and bleed
//    forward speed with a small rolling drag.
// 2) Drive: push +/- maxDriveForce along the tire's heading until the forward
//    speed matches the commanded speed (bang-bang, no slip-ratio state).
// 3) Steering: walk the current steering angle toward the locked target at a
//    fixed rate, then collapse the revolute joint's limits onto that angle so
//    the joint itself holds the tire there.
//
// The decision math is kept in free functions with no engine types so it can
// be exercised without a physics world; `Tire::update` is the only place that
// touches bodies and joints. All force application happens in the impulse
// domain (force * dt).
// ==============================================================================

use log::warn;
use rapier2d::prelude::*;

use crate::physics::PhysicsWorld;

/// Fraction of spin momentum removed per step.
pub const SPIN_DAMPING: f32 = 0.1;

/// Rolling drag force per unit of forward speed (N per m/s).
pub const DRAG_COEFFICIENT: f32 = 0.01;

/// Tuning for one tire.
#[derive(Clone, Copy, Debug)]
pub struct TireConfig {
    pub max_forward_speed: f32,   // m/s
    pub max_backward_speed: f32,  // m/s
    pub max_drive_force: f32,     // N
    pub max_lateral_impulse: f32, // N*s, grip limit per step
    pub max_steer_angle: f32,     // radians, lock-to-center
    pub steer_rate: f32,          // radians/s toward the lock
}

impl Default for TireConfig {
    fn default() -> Self {
        Self {
            max_forward_speed: 5.0,
            max_backward_speed: 2.0,
            max_drive_force: 2.0,
            max_lateral_impulse: 2.5,
            max_steer_angle: 15.0_f32.to_radians(),
            steer_rate: 30.0_f32.to_radians(),
        }
    }
}

/// Impulse cancelling sideways slip, clamped to the grip limit. The clamp is
/// exact: the returned magnitude never exceeds `max_impulse`.
pub fn lateral_friction_impulse(
    mass: f32,
    lateral_vel: Vector<Real>,
    max_impulse: f32,
) -> Vector<Real> {
    let mut impulse = lateral_vel * -mass;
    let magnitude = impulse.norm();
    if magnitude > max_impulse {
        impulse *= max_impulse / magnitude;
    }
    impulse
}

/// Bang-bang drive force toward the commanded longitudinal speed.
pub fn drive_force(desired_speed: f32, current_speed: f32, max_force: f32) -> f32 {
    if desired_speed > current_speed {
        max_force
    } else if desired_speed < current_speed {
        -max_force
    } else {
        0.0
    }
}

/// One rate-limited steering step. `direction` is -1 (right lock), 0
/// (center) or +1 (left lock); the result never overshoots the target and
/// never leaves [-max_steer_angle, max_steer_angle].
pub fn steer_step(current: f32, direction: i8, config: &TireConfig, dt: f32) -> f32 {
    let target = if direction > 0 {
        config.max_steer_angle
    } else if direction < 0 {
        -config.max_steer_angle
    } else {
        0.0
    };

    let max_delta = config.steer_rate * dt;
    current + (target - current).clamp(-max_delta, max_delta)
}

pub struct Tire {
    pub body: RigidBodyHandle,
    pub joint: ImpulseJointHandle,
    pub config: TireConfig,
    /// Commanded longitudinal speed (m/s), set by the controller.
    pub desired_speed: f32,
    /// -1 right lock, 0 center, +1 left lock.
    pub steer_direction: i8,
    /// Current joint lock angle (radians).
    pub steer_angle: f32,
}

impl Tire {
    pub fn new(body: RigidBodyHandle, joint: ImpulseJointHandle, config: TireConfig) -> Self {
        Self {
            body,
            joint,
            config,
            desired_speed: 0.0,
            steer_direction: 0,
            steer_angle: 0.0,
        }
    }

    /// Applies friction, drive and steering for one frame. A tire whose body
    /// has gone missing logs and stays inert; the rest of the car keeps
    /// simulating.
    pub fn update(&mut self, world: &mut PhysicsWorld, dt: f32) {
        let Some(body) = world.bodies.get_mut(self.body) else {
            warn!("tire body {:?} missing, skipping update", self.body);
            return;
        };

        let rot = *body.rotation();
        let forward = rot * vector![0.0, 1.0];
        let right = rot * vector![1.0, 0.0];
        let linvel = *body.linvel();
        let mass = body.mass();
        let inertia = body.mass_properties().local_mprops.principal_inertia();

        // 1) Lateral friction + spin damping + rolling drag.
        let lateral_vel = right * linvel.dot(&right);
        let impulse =
            lateral_friction_impulse(mass, lateral_vel, self.config.max_lateral_impulse);
        body.apply_impulse(impulse, true);
        body.apply_torque_impulse(SPIN_DAMPING * inertia * -body.angvel(), true);

        let forward_speed = linvel.dot(&forward);
        body.apply_impulse(forward * (-DRAG_COEFFICIENT * forward_speed * dt), true);

        // 2) Drive.
        let force = drive_force(self.desired_speed, forward_speed, self.config.max_drive_force);
        if force != 0.0 {
            body.apply_impulse(forward * (force * dt), true);
        }

        // 3) Steering: the joint tracks the rate-limited lock angle.
        self.steer_angle = steer_step(self.steer_angle, self.steer_direction, &self.config, dt);
        world.set_joint_limits(self.joint, self.steer_angle);
    }
}
