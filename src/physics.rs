// ==============================================================================
// physics.rs — 2D RIGID-BODY WORLD ADAPTER
// ==============================================================================
// Thin façade over rapier2d for the rest of the crate:
// - Creates dynamic boxes (tires), convex-hull bodies (chassis), static
//   rectangular sensors (checkpoints) and revolute steering joints.
// - Public API speaks screen pixels; bodies live in meters (50 px = 1 m).
// - Steps the simulation at a fixed 1/60 s behind a time accumulator, so
//   simulation behavior does not depend on the caller's frame rate.
// - Collision-begin events raised by sensors during sub-steps are collected
//   and drained once per rendered frame by the progress tracker.
// ==============================================================================

use std::sync::Mutex;

use log::warn;
use rapier2d::prelude::*;

/// World scale: 50 screen pixels = 1 physics meter.
pub const PIXELS_PER_METER: f32 = 50.0;

/// Fixed simulation timestep (s).
pub const FIXED_DT: f32 = 1.0 / 60.0;

#[inline]
pub fn px_to_m(px: f32) -> Real {
    px / PIXELS_PER_METER
}

#[inline]
pub fn m_to_px(m: Real) -> f32 {
    m * PIXELS_PER_METER
}

/// Pose handed to a renderer: pixel position plus rotation in degrees.
#[derive(Clone, Copy, Debug, Default)]
pub struct DrawPose {
    pub x: f32,
    pub y: f32,
    pub rotation_deg: f32,
}

/// Collects collision events raised while the pipeline steps. rapier hands
/// events to a `&self` handler, hence the interior mutability.
#[derive(Default)]
struct CollisionEventSink {
    events: Mutex<Vec<CollisionEvent>>,
}

impl CollisionEventSink {
    fn take(&self) -> Vec<CollisionEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(_) => Vec::new(),
        }
    }
}

impl EventHandler for CollisionEventSink {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,
    accumulator: f32,
    events: CollisionEventSink,
    /// Sensor contact-begin pairs gathered since the last drain.
    contacts: Vec<(ColliderHandle, ColliderHandle)>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            // Top-down plane: no gravity, grip comes from the tire model.
            gravity: vector![0.0, 0.0],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            accumulator: 0.0,
            events: CollisionEventSink::default(),
            contacts: Vec::new(),
        }
    }

    /// Dynamic box body (tires). Position and size in pixels.
    pub fn create_box(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        angle: Real,
        density: Real,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![px_to_m(x), px_to_m(y)])
            .rotation(angle)
            .build();
        let handle = self.bodies.insert(rb);

        let collider = ColliderBuilder::cuboid(px_to_m(width) * 0.5, px_to_m(height) * 0.5)
            .density(density)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        handle
    }

    /// Dynamic convex-hull body (car chassis). Vertices in chassis-local
    /// pixels. A degenerate silhouette falls back to its bounding box so the
    /// spawn degrades instead of failing.
    pub fn create_hull(
        &mut self,
        x: f32,
        y: f32,
        angle: Real,
        vertices_px: &[[f32; 2]],
        density: Real,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![px_to_m(x), px_to_m(y)])
            .rotation(angle)
            .build();
        let handle = self.bodies.insert(rb);

        let points: Vec<Point<Real>> = vertices_px
            .iter()
            .map(|v| point![px_to_m(v[0]), px_to_m(v[1])])
            .collect();

        let collider = match ColliderBuilder::convex_hull(&points) {
            Some(builder) => builder.density(density).build(),
            None => {
                warn!(
                    "degenerate chassis hull ({} points), using bounding box",
                    points.len()
                );
                let hx = vertices_px.iter().map(|v| v[0].abs()).fold(1.0, f32::max);
                let hy = vertices_px.iter().map(|v| v[1].abs()).fold(1.0, f32::max);
                ColliderBuilder::cuboid(px_to_m(hx), px_to_m(hy))
                    .density(density)
                    .build()
            }
        };
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        handle
    }

    /// Static rectangular trigger region. Reports contact-begin events but
    /// never blocks movement.
    pub fn create_sensor(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        angle: Real,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let rb = RigidBodyBuilder::fixed()
            .translation(vector![px_to_m(x), px_to_m(y)])
            .rotation(angle)
            .build();
        let body = self.bodies.insert(rb);

        let collider = ColliderBuilder::cuboid(px_to_m(width) * 0.5, px_to_m(height) * 0.5)
            .sensor(true)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);

        (body, collider)
    }

    /// Revolute joint anchored on the chassis, used as a steering pivot. The
    /// angle limits bound the tire's swing; the tire model re-locks them every
    /// tick to track the commanded steering angle.
    pub fn create_steer_joint(
        &mut self,
        chassis: RigidBodyHandle,
        tire: RigidBodyHandle,
        anchor_px: Vector<Real>,
        lower: Real,
        upper: Real,
    ) -> ImpulseJointHandle {
        let joint = RevoluteJointBuilder::new()
            .local_anchor1(point![px_to_m(anchor_px.x), px_to_m(anchor_px.y)])
            .local_anchor2(point![0.0, 0.0])
            .limits([lower, upper])
            .contacts_enabled(false)
            .build();
        self.joints.insert(chassis, tire, joint, true)
    }

    /// Locks a steering joint at exactly `angle` by collapsing its limit range.
    pub fn set_joint_limits(&mut self, handle: ImpulseJointHandle, angle: Real) {
        match self.joints.get_mut(handle) {
            Some(joint) => {
                joint.data.set_limits(JointAxis::AngX, [angle, angle]);
            }
            None => warn!("steering joint {handle:?} missing, limits not updated"),
        }
    }

    /// Removes a body together with its colliders and any attached joints.
    /// Returns false if the handle was already gone.
    pub fn destroy_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Consumes `elapsed` seconds of real time in fixed sub-steps, carrying
    /// the remainder to the next frame. Returns the number of steps taken.
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        self.accumulator += elapsed;
        let mut steps = 0;
        while self.accumulator >= FIXED_DT {
            self.step(FIXED_DT);
            self.accumulator -= FIXED_DT;
            steps += 1;
        }
        steps
    }

    fn step(&mut self, dt: Real) {
        let hooks = ();
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &self.events,
        );

        for event in self.events.take() {
            if let CollisionEvent::Started(a, b, flags) = event {
                if flags.contains(CollisionEventFlags::SENSOR) {
                    self.contacts.push((a, b));
                }
            }
        }
    }

    /// Sensor contact-begin pairs since the last drain. Sub-steps within one
    /// frame are not distinguished; trigger regions are sized so that a body
    /// cannot cross two of them inside a single frame.
    pub fn drain_contacts(&mut self) -> Vec<(ColliderHandle, ColliderHandle)> {
        std::mem::take(&mut self.contacts)
    }

    pub fn collider_body(&self, collider: ColliderHandle) -> Option<RigidBodyHandle> {
        self.colliders.get(collider).and_then(|c| c.parent())
    }

    /// Body center in pixels.
    pub fn position_px(&self, handle: RigidBodyHandle) -> Option<Vector<Real>> {
        self.bodies
            .get(handle)
            .map(|b| b.translation() * PIXELS_PER_METER)
    }

    pub fn rotation(&self, handle: RigidBodyHandle) -> Option<Real> {
        self.bodies.get(handle).map(|b| b.rotation().angle())
    }

    pub fn draw_pose(&self, handle: RigidBodyHandle) -> Option<DrawPose> {
        self.bodies.get(handle).map(|b| DrawPose {
            x: m_to_px(b.translation().x),
            y: m_to_px(b.translation().y),
            rotation_deg: b.rotation().angle().to_degrees(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_carries_partial_steps() {
        let mut world = PhysicsWorld::new();

        // Half a step: nothing runs, remainder is kept.
        assert_eq!(world.advance(FIXED_DT * 0.5), 0);
        // Two more steps' worth: the carried half makes 2.5 steps, so two run
        // and half a step is carried again.
        assert_eq!(world.advance(FIXED_DT * 2.0), 2);
    }

    #[test]
    fn destroy_body_is_single_shot() {
        let mut world = PhysicsWorld::new();
        let body = world.create_box(0.0, 0.0, 10.0, 20.0, 0.0, 1.0);

        assert_eq!(world.body_count(), 1);
        assert!(world.destroy_body(body));
        assert_eq!(world.body_count(), 0);
        assert!(!world.destroy_body(body));
    }

    #[test]
    fn pixel_meter_round_trip() {
        assert!((m_to_px(px_to_m(125.0)) - 125.0).abs() < 1e-4);
        assert!((px_to_m(PIXELS_PER_METER) - 1.0).abs() < 1e-6);
    }
}
