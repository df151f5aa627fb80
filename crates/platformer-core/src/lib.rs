//! Platformer Core Library
//!
//! Gameplay rules for a tile-based 2D platformer on top of `Rapier2D`.
//!
//! Rapier reports when colliders start and stop touching. This crate turns
//! those reports into durable game state (grounded, climbing, in danger,
//! standing in an exit, which buttons are held) and drives button-gated
//! moving platforms from it once per frame.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod buttons;
pub mod campaign;
pub mod config;
pub mod contact;
pub mod game;
pub mod level;
pub mod physics;
pub mod platform;
pub mod player;
pub mod session;
pub mod tag;

pub use buttons::{ButtonLinks, ButtonPresses};
pub use campaign::{Campaign, CampaignError, HUB_LEVEL};
pub use config::{ConfigError, PhysicsConfig, PlayerConfig, SessionConfig};
pub use contact::{ContactListener, ContactSide, ContactState};
pub use game::{Game, GameError, GameEvent};
pub use level::{
    EntityData, LevelDocument, LevelError, LevelMeta, LevelObject, LevelWorldData, ObjectSkip,
    ObjectSpec, PlatformSpec, PropertyValue, RectShape,
};
pub use physics::{PHYSICS_DT, PhysicsWorld, default_gravity};
pub use platform::{
    AxisTravel, Direction, MovementAxis, PlatformController, PlatformDefinition, PlatformTravel,
};
pub use player::{DeathCause, Player, PlayerInput, PlayerStatus};
pub use session::{FrameReport, LevelSession};
pub use tag::{PAYLOAD_LIMIT, Tag, TagCategory};
