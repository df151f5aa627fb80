//! One running level.
//!
//! A frame runs in fixed stages: platform update and player control read the
//! aggregated contacts, the physics step feeds new contacts into the
//! listener, then the ladder gravity multiplier and the player status are
//! resolved from the result. Nothing touches the world while the step is
//! delivering events.

use parking_lot::MutexGuard;
use rapier2d::prelude::Vector;

use crate::config::SessionConfig;
use crate::contact::{ContactListener, ContactState};
use crate::level::{EntityData, LevelDocument, LevelError};
use crate::physics::PhysicsWorld;
use crate::platform::PlatformController;
use crate::player::{Player, PlayerInput, PlayerStatus};

/// Outcome of a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Physics frame number after the step.
    pub frame: u64,
    pub status: PlayerStatus,
    /// True when `status` differs from the previous frame.
    pub status_changed: bool,
    /// Moving platforms currently allowed to travel.
    pub active_platforms: usize,
}

/// Simulation of one loaded level.
pub struct LevelSession {
    level: LevelDocument,
    config: SessionConfig,
    world: PhysicsWorld,
    listener: ContactListener,
    platforms: PlatformController,
    entities: Vec<EntityData>,
    player: Player,
    status: PlayerStatus,
}

impl std::fmt::Debug for LevelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelSession")
            .field("level", &self.level.meta.name)
            .field("world", &self.world)
            .field("platform_count", &self.platforms.len())
            .field("entity_count", &self.entities.len())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Freshly built world for a level.
struct Built {
    world: PhysicsWorld,
    platforms: PlatformController,
    entities: Vec<EntityData>,
    player: Player,
}

impl LevelSession {
    /// Builds the level and spawns the player with a cleared contact state.
    pub fn load(level: LevelDocument, config: SessionConfig) -> Result<Self, LevelError> {
        level.check_spawn()?;
        let built = Self::build(&level, &config);
        tracing::info!("[session] Loaded level '{}'", level.meta.name);

        Ok(Self {
            level,
            config,
            world: built.world,
            listener: ContactListener::new(),
            platforms: built.platforms,
            entities: built.entities,
            player: built.player,
            status: PlayerStatus::default(),
        })
    }

    fn build(level: &LevelDocument, config: &SessionConfig) -> Built {
        let [gx, gy] = config.physics.gravity;
        let mut world = PhysicsWorld::with_settings(Vector::new(gx, gy), config.physics.dt);
        let data = level.apply_to_world(&mut world);
        let player = Player::spawn(&mut world, level.player_spawn, &config.player);

        Built {
            world,
            platforms: PlatformController::new(data.platforms),
            entities: data.entities,
            player,
        }
    }

    /// Runs one frame with the given input.
    ///
    /// A dead player receives no input, but the rest of the level keeps
    /// simulating until [`respawn`](Self::respawn) is called.
    pub fn frame(&mut self, input: PlayerInput) -> FrameReport {
        {
            let contacts = self.listener.state();
            self.platforms
                .update(&contacts.button_links(), &mut self.world.bodies);
            if self.status.is_alive() {
                self.player
                    .apply_input(&mut self.world, &contacts, input, &self.config.player);
            }
        }

        self.world.step_with_events(&self.listener);

        let status = {
            let contacts = self.listener.state();
            self.player.apply_gravity_scale(&mut self.world, &contacts);
            if self.status.is_alive() {
                self.player
                    .resolve_status(&self.world, &contacts, &self.config.player)
            } else {
                self.status
            }
        };

        let status_changed = status != self.status;
        if status_changed {
            tracing::info!(
                "[session] Frame {}: player {:?} -> {:?}",
                self.world.current_frame(),
                self.status,
                status
            );
        }
        self.status = status;

        FrameReport {
            frame: self.world.current_frame(),
            status,
            status_changed,
            active_platforms: self.platforms.iter().filter(|p| p.active).count(),
        }
    }

    /// Rebuilds the level from scratch and puts the player back at the spawn.
    pub fn respawn(&mut self) {
        // Handles in the contact state belong to the old world.
        self.listener.reset();
        let built = Self::build(&self.level, &self.config);
        self.world = built.world;
        self.platforms = built.platforms;
        self.entities = built.entities;
        self.player = built.player;
        self.status = PlayerStatus::default();
        tracing::info!("[session] Respawned in '{}'", self.level.meta.name);
    }

    /// Clears all aggregated contacts and restores normal gravity.
    ///
    /// Contacts that are still open are not reported again by the physics
    /// engine, so this is only meaningful right before the world is rebuilt.
    pub fn reset_contacts(&mut self) {
        self.listener.reset();
        let contacts = self.listener.state();
        self.player.apply_gravity_scale(&mut self.world, &contacts);
    }

    /// Locks the aggregated contacts for reading.
    ///
    /// The guard must be dropped before the next call to [`frame`](Self::frame).
    pub fn contacts(&self) -> MutexGuard<'_, ContactState> {
        self.listener.state()
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn level(&self) -> &LevelDocument {
        &self.level
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn platforms(&self) -> &PlatformController {
        &self.platforms
    }

    pub fn entities(&self) -> &[EntityData] {
        &self.entities
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_position(&self) -> Option<[f32; 2]> {
        self.player.position(&self.world)
    }
}
