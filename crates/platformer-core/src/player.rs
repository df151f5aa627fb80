//! The player avatar: body construction, per-frame control and status.

use rapier2d::prelude::{
    ActiveEvents, ColliderBuilder, ColliderHandle, RigidBodyBuilder, RigidBodyHandle, Vector,
};
use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;
use crate::contact::ContactState;
use crate::physics::PhysicsWorld;
use crate::tag::Tag;

/// Buttons held during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInput {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    /// Jump, or climb while on a ladder.
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    /// Enter the exit the player is standing in (hub only).
    #[serde(default)]
    pub enter: bool,
}

impl PlayerInput {
    /// -1 for left, 1 for right, 0 for neither or both.
    pub fn horizontal(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    /// -1 for down, 1 for up, 0 for neither or both.
    pub fn vertical(&self) -> f32 {
        match (self.down, self.up) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// What killed the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeathCause {
    Hazard,
    FellOutOfWorld,
}

/// Player state resolved between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerStatus {
    Alive {
        grounded: bool,
        climbing: bool,
        /// Exit id while standing in a finish point.
        at_exit: Option<u32>,
    },
    Dead(DeathCause),
}

impl PlayerStatus {
    pub fn is_alive(&self) -> bool {
        matches!(self, Self::Alive { .. })
    }

    pub fn at_exit(&self) -> Option<u32> {
        match self {
            Self::Alive { at_exit, .. } => *at_exit,
            Self::Dead(_) => None,
        }
    }
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self::Alive {
            grounded: false,
            climbing: false,
            at_exit: None,
        }
    }
}

/// Handles of the player's body and colliders.
#[derive(Debug, Clone)]
pub struct Player {
    body: RigidBodyHandle,
    body_collider: ColliderHandle,
    foot_sensor: ColliderHandle,
    last_jump_frame: Option<u64>,
}

impl Player {
    /// Creates the player body at `position`.
    ///
    /// The body does not rotate. A thin massless sensor under it reports what
    /// the player is standing on.
    pub fn spawn(world: &mut PhysicsWorld, position: [f32; 2], config: &PlayerConfig) -> Self {
        let body = world.add_rigid_body(
            RigidBodyBuilder::dynamic()
                .translation(Vector::new(position[0], position[1]))
                .lock_rotations()
                .build(),
        );

        let [hx, hy] = config.body_half_extents;
        let body_collider = world.add_collider(
            ColliderBuilder::cuboid(hx, hy)
                .density(1.0)
                .friction(config.friction)
                .user_data(Tag::PlayerBody.to_user_data())
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
            body,
        );

        let [fx, fy] = config.foot_half_extents;
        let foot_sensor = world.add_collider(
            ColliderBuilder::cuboid(fx, fy)
                .translation(Vector::new(0.0, config.foot_offset))
                .sensor(true)
                .density(0.0)
                .user_data(Tag::PlayerFootSensor.to_user_data())
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
            body,
        );

        tracing::debug!("[player] Spawned at ({}, {})", position[0], position[1]);

        Self {
            body,
            body_collider,
            foot_sensor,
            last_jump_frame: None,
        }
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn body_collider(&self) -> ColliderHandle {
        self.body_collider
    }

    pub fn foot_sensor(&self) -> ColliderHandle {
        self.foot_sensor
    }

    pub fn position(&self, world: &PhysicsWorld) -> Option<[f32; 2]> {
        world.get_rigid_body(self.body).map(|body| {
            let translation = body.translation();
            [translation.x, translation.y]
        })
    }

    fn jump_ready(&self, frame: u64, config: &PlayerConfig) -> bool {
        self.last_jump_frame
            .is_none_or(|last| frame.saturating_sub(last) >= config.jump_cooldown_frames)
    }

    /// Applies this frame's control impulses. Runs before the physics step.
    ///
    /// Target velocities are reached in one step by impulses scaled with the
    /// body mass. On a ladder the vertical axis is driven directly instead of
    /// jumping.
    pub fn apply_input(
        &mut self,
        world: &mut PhysicsWorld,
        contacts: &ContactState,
        input: PlayerInput,
        config: &PlayerConfig,
    ) {
        let frame = world.current_frame();
        let Some((mass, velocity, position)) = world.get_rigid_body(self.body).map(|body| {
            let linvel = body.linvel();
            let translation = body.translation();
            (
                body.mass(),
                [linvel.x, linvel.y],
                [translation.x, translation.y],
            )
        }) else {
            return;
        };

        let mut vertical_impulse = 0.0;
        if contacts.is_on_ladder() {
            vertical_impulse = (input.vertical() * config.climb_speed - velocity[1]) * mass;
        } else if input.up && contacts.is_grounded() && self.jump_ready(frame, config) {
            vertical_impulse = config.jump_impulse;
            self.last_jump_frame = Some(frame);
            tracing::trace!("[player] Jump at frame {}", frame);
        }

        let horizontal_impulse = (input.horizontal() * config.walk_speed - velocity[0]) * mass;

        // Ride along with the platform underfoot.
        let carry = contacts
            .supporting_platform()
            .and_then(|platform| world.get_rigid_body(platform))
            .map_or(0.0, |platform| platform.linvel().x * mass);

        if let Some(body) = world.get_rigid_body_mut(self.body) {
            body.apply_impulse(
                Vector::new(horizontal_impulse + carry, vertical_impulse),
                true,
            );
        }

        // Walking pushes whatever the player stands on the other way.
        let kickback = -horizontal_impulse / config.entity_kickback_divisor;
        let feet_y = position[1] + config.foot_offset - config.foot_half_extents[1];
        for collider in contacts.entity_colliders_underfoot() {
            let Some(parent) = world.colliders.get(*collider).and_then(|c| c.parent()) else {
                continue;
            };
            if let Some(entity) = world.get_rigid_body_mut(parent) {
                let lever_y = feet_y - entity.translation().y;
                entity.apply_impulse(Vector::new(kickback, 0.0), true);
                entity.apply_torque_impulse(-lever_y * kickback, true);
            }
        }
    }

    /// Writes the ladder gravity multiplier to the body.
    pub fn apply_gravity_scale(&self, world: &mut PhysicsWorld, contacts: &ContactState) {
        if let Some(body) = world.get_rigid_body_mut(self.body) {
            body.set_gravity_scale(contacts.player_gravity_scale(), true);
        }
    }

    /// Resolves the player's status from the aggregated contacts.
    pub fn resolve_status(
        &self,
        world: &PhysicsWorld,
        contacts: &ContactState,
        config: &PlayerConfig,
    ) -> PlayerStatus {
        if contacts.is_in_danger() {
            return PlayerStatus::Dead(DeathCause::Hazard);
        }
        match self.position(world) {
            Some([_, y]) if y >= config.fall_limit_y => PlayerStatus::Alive {
                grounded: contacts.is_grounded(),
                climbing: contacts.is_on_ladder(),
                at_exit: contacts.active_exit(),
            },
            _ => PlayerStatus::Dead(DeathCause::FellOutOfWorld),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_axes() {
        let both = PlayerInput {
            left: true,
            right: true,
            ..PlayerInput::default()
        };
        assert_eq!(both.horizontal(), 0.0);

        let climb = PlayerInput {
            up: true,
            ..PlayerInput::default()
        };
        assert_eq!(climb.vertical(), 1.0);
        assert_eq!(climb.horizontal(), 0.0);
    }

    #[test]
    fn test_spawn_builds_tagged_colliders() {
        let mut world = PhysicsWorld::new();
        let config = PlayerConfig::default();
        let player = Player::spawn(&mut world, [3.5, 2.5], &config);

        assert_eq!(world.collider_tag(player.body_collider()), Some(Tag::PlayerBody));
        assert_eq!(
            world.collider_tag(player.foot_sensor()),
            Some(Tag::PlayerFootSensor)
        );
        assert!(world.colliders[player.foot_sensor()].is_sensor());
        assert_eq!(player.position(&world), Some([3.5, 2.5]));
    }

    #[test]
    fn test_walk_reaches_target_speed() {
        let mut world = PhysicsWorld::new();
        let config = PlayerConfig::default();
        let mut player = Player::spawn(&mut world, [0.0, 0.0], &config);
        // Mass properties are settled by the first step.
        world.step_with_events(&());
        let right = PlayerInput {
            right: true,
            ..PlayerInput::default()
        };

        player.apply_input(&mut world, &ContactState::new(), right, &config);

        let vx = world.get_rigid_body(player.body()).unwrap().linvel().x;
        assert!((vx - config.walk_speed).abs() < 1e-3);
    }

    #[test]
    fn test_no_jump_in_mid_air() {
        let mut world = PhysicsWorld::new();
        let config = PlayerConfig::default();
        let mut player = Player::spawn(&mut world, [0.0, 0.0], &config);
        let jump = PlayerInput {
            up: true,
            ..PlayerInput::default()
        };

        player.apply_input(&mut world, &ContactState::new(), jump, &config);

        assert_eq!(world.get_rigid_body(player.body()).unwrap().linvel().y, 0.0);
    }

    #[test]
    fn test_status_from_contacts() {
        let mut world = PhysicsWorld::new();
        let config = PlayerConfig::default();
        let player = Player::spawn(&mut world, [0.0, 0.0], &config);

        let status = player.resolve_status(&world, &ContactState::new(), &config);
        assert_eq!(status, PlayerStatus::default());
        assert!(status.is_alive());

        let below = Player::spawn(&mut world, [0.0, -41.0], &config);
        assert_eq!(
            below.resolve_status(&world, &ContactState::new(), &config),
            PlayerStatus::Dead(DeathCause::FellOutOfWorld)
        );
    }
}
