//! The rapier world a level lives in.
//!
//! Bodies and colliders are public so the loader, the player and the platform
//! controller can reach them directly. The solver state is private; the only
//! way to advance it is [`PhysicsWorld::step_with_events`], which hands every
//! collision start and stop to the caller's handler.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use rapier2d::prelude::*;

use crate::tag::Tag;

/// Fixed timestep for physics simulation (60Hz).
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// Gravity of a platformer level, y pointing up.
pub fn default_gravity() -> Vector {
    Vector::new(0.0, -25.0)
}

/// Pipeline state that only matters inside a step.
struct Solver {
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
}

impl Solver {
    fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
        }
    }
}

/// Bodies, colliders and solver of one level.
pub struct PhysicsWorld {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    params: IntegrationParameters,
    solver: Solver,
    gravity: Vector,
    frame: u64,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Empty world with platformer gravity and a 60Hz step.
    pub fn new() -> Self {
        Self::with_settings(default_gravity(), PHYSICS_DT)
    }

    pub fn with_settings(gravity: Vector, dt: f32) -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            params: IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            solver: Solver::new(),
            gravity,
            frame: 0,
        }
    }

    /// Advances one step.
    ///
    /// `events` is called synchronously for every collision start and stop
    /// found during the step. It only ever sees the sets by shared reference,
    /// so it cannot add, remove or move anything.
    pub fn step_with_events(&mut self, events: &dyn EventHandler) {
        let solver = &mut self.solver;
        solver.pipeline.step(
            self.gravity,
            &self.params,
            &mut solver.islands,
            &mut solver.broad_phase,
            &mut solver.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut solver.impulse_joints,
            &mut solver.multibody_joints,
            &mut solver.ccd,
            &(),
            events,
        );
        self.frame += 1;
    }

    pub fn add_rigid_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.bodies.insert(body)
    }

    /// Attaches `collider` to `parent`.
    pub fn add_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.colliders
            .insert_with_parent(collider, parent, &mut self.bodies)
    }

    /// Inserts a parentless collider. Level geometry and sensors use this.
    pub fn add_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.colliders.insert(collider)
    }

    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn get_rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Decodes the tag stored on a collider.
    pub fn collider_tag(&self, handle: ColliderHandle) -> Option<Tag> {
        self.colliders
            .get(handle)
            .and_then(|collider| Tag::from_user_data(collider.user_data))
    }

    /// Hash over the frame number and every body's pose and velocity.
    ///
    /// Two sessions fed the same level and input produce the same hash.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.frame.hash(&mut hasher);

        for (handle, body) in self.bodies.iter() {
            handle.into_raw_parts().hash(&mut hasher);
            let translation = body.translation();
            let linvel = body.linvel();
            let values = [
                translation.x,
                translation.y,
                body.rotation().angle(),
                linvel.x,
                linvel.y,
                body.angvel(),
            ];
            for value in values {
                value.to_bits().hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    pub fn gravity(&self) -> Vector {
        self.gravity
    }

    pub fn dt(&self) -> f32 {
        self.params.dt
    }
}
