//! Level documents.
//!
//! A level is authored as a flat list of rectangles with a type and a bag of
//! loosely typed properties, the way map editors export object layers. Each
//! object is checked once against the schema of its type, producing either a
//! typed [`LevelObject`] or an [`ObjectSkip`] reason. Skipped objects are
//! logged and left out; the rest of the level still loads.
//!
//! Coordinates are world units with y pointing up.

use std::collections::{BTreeMap, HashMap};

use rapier2d::prelude::{
    ActiveCollisionTypes, ActiveEvents, ColliderBuilder, ColliderHandle, RigidBodyBuilder,
    RigidBodyHandle, Vector,
};
use serde::{Deserialize, Serialize};

use crate::physics::PhysicsWorld;
use crate::platform::{AxisTravel, MovementAxis, PlatformDefinition, PlatformTravel};
use crate::tag::{PAYLOAD_LIMIT, Tag};

/// Friction of entities and platforms; high so crates do not slide off.
const ENTITY_FRICTION: f32 = 3.0;
const GROUND_FRICTION: f32 = 0.3;

/// Errors that prevent a level from loading at all.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("Invalid level JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Player spawn [{0}, {1}] is not a finite position")]
    InvalidSpawn(f32, f32),
}

/// Why a single object was left out of the level.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ObjectSkip {
    #[error("unknown object type '{0}'")]
    UnknownType(String),

    #[error("missing required property '{0}'")]
    MissingProperty(&'static str),

    #[error("property '{name}' must be {expected}")]
    WrongType {
        name: &'static str,
        expected: &'static str,
    },

    #[error("property '{name}' = {value} does not fit in a tag payload")]
    PayloadOutOfRange { name: &'static str, value: i64 },

    #[error("invalid movement direction code {0}")]
    InvalidMovementAxis(i64),

    #[error("boundaries {low}..{high} are inverted")]
    InvertedBoundaries { low: f32, high: f32 },

    #[error("velocity '{name}' must not be negative")]
    NegativeVelocity { name: &'static str },

    #[error("size [{0}, {1}] must be positive")]
    NonPositiveSize(f32, f32),

    #[error("platform id {0} is already used")]
    DuplicatePlatformId(u32),
}

/// Untyped property value as written by the authoring tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectShape {
    pub center: [f32; 2],
    pub size: [f32; 2],
}

impl RectShape {
    pub fn half_extents(&self) -> [f32; 2] {
        [self.size[0] / 2.0, self.size[1] / 2.0]
    }

    fn translation(&self) -> Vector {
        Vector::new(self.center[0], self.center[1])
    }
}

/// One authored object, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub shape: RectShape,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

/// Level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelMeta {
    pub name: String,
}

/// Complete level document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDocument {
    pub meta: LevelMeta,
    pub player_spawn: [f32; 2],
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
}

/// Moving platform as validated from authoring data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformSpec {
    pub id: u32,
    pub tile_gid: u32,
    pub shape: RectShape,
    pub travel: PlatformTravel,
    pub uses_button_gate: bool,
}

/// A validated level object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelObject {
    Ground { shape: RectShape },
    Danger { shape: RectShape },
    Ladder { shape: RectShape },
    Finish { shape: RectShape, exit_level_id: u32 },
    Button { shape: RectShape, platform_id: u32 },
    Entity { id: u32, tile_gid: u32, shape: RectShape },
    MovingPlatform(PlatformSpec),
}

/// A dynamic entity placed in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityData {
    pub id: u32,
    pub tile_gid: u32,
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

/// Data returned after applying a level to a physics world.
#[derive(Debug, Clone)]
pub struct LevelWorldData {
    pub platforms: Vec<PlatformDefinition>,
    pub entities: Vec<EntityData>,
    /// Object id to collider handle mapping.
    pub object_handles: HashMap<u32, ColliderHandle>,
    /// Objects left out, with the reason.
    pub skipped: Vec<(u32, ObjectSkip)>,
}

impl LevelDocument {
    /// Loads a level from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let level: Self = serde_json::from_str(json)?;
        level.check_spawn()?;
        Ok(level)
    }

    /// Serializes the level to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// The bundled demo level, loaded from maps/default.json at compile time.
    pub fn default_level() -> Result<Self, LevelError> {
        const DEFAULT_LEVEL_JSON: &str = include_str!("../maps/default.json");
        Self::from_json(DEFAULT_LEVEL_JSON)
    }

    pub fn check_spawn(&self) -> Result<(), LevelError> {
        let [x, y] = self.player_spawn;
        if x.is_finite() && y.is_finite() {
            Ok(())
        } else {
            Err(LevelError::InvalidSpawn(x, y))
        }
    }

    /// Validates every object, in document order.
    pub fn validate(&self) -> Vec<(u32, Result<LevelObject, ObjectSkip>)> {
        self.objects
            .iter()
            .map(|object| (object.id, object.validate()))
            .collect()
    }

    /// Builds the level's colliders and bodies into `world`.
    ///
    /// Invalid objects are skipped with a warning. The player is not part of
    /// the level and is spawned separately.
    pub fn apply_to_world(&self, world: &mut PhysicsWorld) -> LevelWorldData {
        let mut data = LevelWorldData {
            platforms: Vec::new(),
            entities: Vec::new(),
            object_handles: HashMap::new(),
            skipped: Vec::new(),
        };

        for (id, validated) in self.validate() {
            let object = match validated {
                Ok(object) => object,
                Err(reason) => {
                    tracing::warn!(
                        "[level] Skipping object {} in '{}': {}",
                        id,
                        self.meta.name,
                        reason
                    );
                    data.skipped.push((id, reason));
                    continue;
                }
            };

            if let LevelObject::MovingPlatform(spec) = &object {
                if data.platforms.iter().any(|platform| platform.id == spec.id) {
                    let reason = ObjectSkip::DuplicatePlatformId(spec.id);
                    tracing::warn!(
                        "[level] Skipping object {} in '{}': {}",
                        id,
                        self.meta.name,
                        reason
                    );
                    data.skipped.push((id, reason));
                    continue;
                }
            }

            let collider = match object {
                LevelObject::Ground { shape } => world.add_static_collider(
                    solid(shape, Tag::StaticGround)
                        .friction(GROUND_FRICTION)
                        .build(),
                ),
                LevelObject::Danger { shape } => {
                    world.add_static_collider(solid(shape, Tag::Dangerous).build())
                }
                LevelObject::Ladder { shape } => {
                    world.add_static_collider(sensor(shape, Tag::Ladder).build())
                }
                LevelObject::Finish {
                    shape,
                    exit_level_id,
                } => world.add_static_collider(
                    sensor(shape, Tag::FinishPoint { exit_level_id }).build(),
                ),
                LevelObject::Button { shape, platform_id } => world.add_static_collider(
                    sensor(shape, Tag::Button { platform_id })
                        // Platforms resting on a button press it too.
                        .active_collision_types(
                            ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_FIXED,
                        )
                        .build(),
                ),
                LevelObject::Entity {
                    id,
                    tile_gid,
                    shape,
                } => {
                    let body = world.add_rigid_body(
                        RigidBodyBuilder::dynamic()
                            .translation(shape.translation())
                            .build(),
                    );
                    let [hx, hy] = shape.half_extents();
                    let collider = world.add_collider(
                        ColliderBuilder::cuboid(hx, hy)
                            .density(1.0)
                            .friction(ENTITY_FRICTION)
                            .user_data(Tag::GenericEntity.to_user_data())
                            .active_events(ActiveEvents::COLLISION_EVENTS)
                            .build(),
                        body,
                    );
                    data.entities.push(EntityData {
                        id,
                        tile_gid,
                        body,
                        collider,
                    });
                    collider
                }
                LevelObject::MovingPlatform(spec) => {
                    let (platform, collider) = spawn_platform(world, &spec);
                    data.platforms.push(platform);
                    collider
                }
            };
            data.object_handles.insert(id, collider);
        }

        tracing::info!(
            "[level] Built '{}': {} objects, {} platforms, {} entities, {} skipped",
            self.meta.name,
            data.object_handles.len(),
            data.platforms.len(),
            data.entities.len(),
            data.skipped.len()
        );
        data
    }
}

fn solid(shape: RectShape, tag: Tag) -> ColliderBuilder {
    let [hx, hy] = shape.half_extents();
    ColliderBuilder::cuboid(hx, hy)
        .translation(shape.translation())
        .user_data(tag.to_user_data())
        .active_events(ActiveEvents::COLLISION_EVENTS)
}

fn sensor(shape: RectShape, tag: Tag) -> ColliderBuilder {
    solid(shape, tag).sensor(true)
}

/// Creates the kinematic body for a platform. Ungated platforms start moving
/// immediately.
fn spawn_platform(
    world: &mut PhysicsWorld,
    spec: &PlatformSpec,
) -> (PlatformDefinition, ColliderHandle) {
    let platform_body = RigidBodyBuilder::kinematic_velocity_based()
        .translation(spec.shape.translation())
        .build();
    let body = world.add_rigid_body(platform_body);
    let [hx, hy] = spec.shape.half_extents();
    let collider = world.add_collider(
        ColliderBuilder::cuboid(hx, hy)
            .friction(ENTITY_FRICTION)
            .user_data(Tag::MovingPlatform.to_user_data())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build(),
        body,
    );

    let platform = PlatformDefinition::new(
        spec.id,
        spec.tile_gid,
        body,
        spec.travel,
        spec.uses_button_gate,
        spec.shape.half_extents(),
    );
    if let Some(rigid_body) = world.get_rigid_body_mut(body) {
        rigid_body.set_linvel(platform.velocity(), true);
    }
    (platform, collider)
}

impl ObjectSpec {
    /// Checks the object against the schema of its type.
    pub fn validate(&self) -> Result<LevelObject, ObjectSkip> {
        let shape = self.shape;
        let [width, height] = shape.size;
        if !(width > 0.0 && height > 0.0) {
            return Err(ObjectSkip::NonPositiveSize(width, height));
        }

        let props = Properties(&self.properties);
        match self.kind.as_str() {
            "ground" => Ok(LevelObject::Ground { shape }),
            "danger" => Ok(LevelObject::Danger { shape }),
            "ladder" => Ok(LevelObject::Ladder { shape }),
            "finish" => Ok(LevelObject::Finish {
                shape,
                exit_level_id: props.optional_payload("level")?.unwrap_or(0),
            }),
            "button" => Ok(LevelObject::Button {
                shape,
                platform_id: props.payload("platformID")?,
            }),
            "entity" => Ok(LevelObject::Entity {
                id: self.id,
                tile_gid: props.payload("tileGID")?,
                shape,
            }),
            "mp" => Ok(LevelObject::MovingPlatform(self.platform_spec(&props)?)),
            other => Err(ObjectSkip::UnknownType(other.to_string())),
        }
    }

    fn platform_spec(&self, props: &Properties<'_>) -> Result<PlatformSpec, ObjectSkip> {
        let code = props.int("direction")?;
        let axis = MovementAxis::from_code(code).ok_or(ObjectSkip::InvalidMovementAxis(code))?;
        let tile_gid = props.payload("tileGID")?;

        let horizontal = || props.travel("boundaryLeft", "boundaryRight", "horizontalVelocity");
        let vertical = || props.travel("boundaryBottom", "boundaryTop", "verticalVelocity");
        let travel = match axis {
            MovementAxis::Horizontal => PlatformTravel::Horizontal(horizontal()?),
            MovementAxis::Vertical => PlatformTravel::Vertical(vertical()?),
            MovementAxis::Diagonal => PlatformTravel::Diagonal {
                horizontal: horizontal()?,
                vertical: vertical()?,
            },
        };

        Ok(PlatformSpec {
            id: self.id,
            tile_gid,
            shape: self.shape,
            travel,
            uses_button_gate: props.optional_bool("usesButton")?.unwrap_or(false),
        })
    }
}

/// Typed accessors over an object's property bag.
struct Properties<'a>(&'a BTreeMap<String, PropertyValue>);

impl Properties<'_> {
    fn optional_int(&self, name: &'static str) -> Result<Option<i64>, ObjectSkip> {
        match self.0.get(name) {
            None => Ok(None),
            Some(PropertyValue::Int(value)) => Ok(Some(*value)),
            Some(_) => Err(ObjectSkip::WrongType {
                name,
                expected: "an integer",
            }),
        }
    }

    fn int(&self, name: &'static str) -> Result<i64, ObjectSkip> {
        self.optional_int(name)?
            .ok_or(ObjectSkip::MissingProperty(name))
    }

    fn optional_payload(&self, name: &'static str) -> Result<Option<u32>, ObjectSkip> {
        self.optional_int(name)?
            .map(|value| {
                u32::try_from(value)
                    .ok()
                    .filter(|payload| *payload < PAYLOAD_LIMIT)
                    .ok_or(ObjectSkip::PayloadOutOfRange { name, value })
            })
            .transpose()
    }

    fn payload(&self, name: &'static str) -> Result<u32, ObjectSkip> {
        self.optional_payload(name)?
            .ok_or(ObjectSkip::MissingProperty(name))
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn float(&self, name: &'static str) -> Result<f32, ObjectSkip> {
        match self.0.get(name) {
            None => Err(ObjectSkip::MissingProperty(name)),
            Some(PropertyValue::Int(value)) => Ok(*value as f32),
            Some(PropertyValue::Float(value)) if value.is_finite() => Ok(*value as f32),
            Some(_) => Err(ObjectSkip::WrongType {
                name,
                expected: "a finite number",
            }),
        }
    }

    fn optional_bool(&self, name: &'static str) -> Result<Option<bool>, ObjectSkip> {
        match self.0.get(name) {
            None => Ok(None),
            Some(PropertyValue::Bool(value)) => Ok(Some(*value)),
            Some(_) => Err(ObjectSkip::WrongType {
                name,
                expected: "a boolean",
            }),
        }
    }

    fn travel(
        &self,
        low: &'static str,
        high: &'static str,
        velocity: &'static str,
    ) -> Result<AxisTravel, ObjectSkip> {
        let low = self.float(low)?;
        let high = self.float(high)?;
        let speed = self.float(velocity)?;
        if low > high {
            return Err(ObjectSkip::InvertedBoundaries { low, high });
        }
        if speed < 0.0 {
            return Err(ObjectSkip::NegativeVelocity { name: velocity });
        }
        Ok(AxisTravel::new(low, high, speed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagCategory;

    fn object(json: &str) -> ObjectSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_default_level_loads() {
        let level = LevelDocument::default_level().unwrap();
        assert_eq!(level.meta.name, "Button Yard");
        assert!(level.validate().iter().all(|(_, result)| result.is_ok()));
    }

    #[test]
    fn test_apply_default_level() {
        let level = LevelDocument::default_level().unwrap();
        let mut world = PhysicsWorld::new();

        let data = level.apply_to_world(&mut world);

        assert!(data.skipped.is_empty());
        assert_eq!(data.platforms.len(), 2);
        assert_eq!(data.entities.len(), 1);
        assert_eq!(world.colliders.len(), level.objects.len());
        assert_eq!(data.object_handles.len(), level.objects.len());
    }

    #[test]
    fn test_property_values_are_untyped() {
        let spec = object(
            r#"{ "id": 1, "type": "mp", "shape": { "center": [5, 3], "size": [1, 1] },
                 "properties": { "tileGID": 4, "direction": 1, "boundaryLeft": 2,
                                 "boundaryRight": 9.5, "horizontalVelocity": 2.0,
                                 "usesButton": true, "note": "left side" } }"#,
        );
        assert_eq!(spec.properties.get("tileGID"), Some(&PropertyValue::Int(4)));
        assert_eq!(spec.properties.get("boundaryRight"), Some(&PropertyValue::Float(9.5)));
        assert_eq!(spec.properties.get("usesButton"), Some(&PropertyValue::Bool(true)));

        let LevelObject::MovingPlatform(platform) = spec.validate().unwrap() else {
            panic!("expected a moving platform");
        };
        assert!(platform.uses_button_gate);
        assert_eq!(platform.travel.axis(), MovementAxis::Horizontal);
        let travel = platform.travel.horizontal().unwrap();
        assert_eq!((travel.low, travel.high, travel.speed), (2.0, 9.5, 2.0));
    }

    #[test]
    fn test_platform_needs_matching_axis_properties() {
        let spec = object(
            r#"{ "id": 2, "type": "mp", "shape": { "center": [5, 3], "size": [1, 1] },
                 "properties": { "tileGID": 4, "direction": 3, "boundaryLeft": 2,
                                 "boundaryRight": 9, "horizontalVelocity": 2 } }"#,
        );
        assert_eq!(
            spec.validate(),
            Err(ObjectSkip::MissingProperty("boundaryBottom"))
        );
    }

    #[test]
    fn test_platform_rejects_unknown_direction() {
        let spec = object(
            r#"{ "id": 2, "type": "mp", "shape": { "center": [5, 3], "size": [1, 1] },
                 "properties": { "tileGID": 4, "direction": 5 } }"#,
        );
        assert_eq!(spec.validate(), Err(ObjectSkip::InvalidMovementAxis(5)));
    }

    #[test]
    fn test_platform_rejects_inverted_boundaries() {
        let spec = object(
            r#"{ "id": 2, "type": "mp", "shape": { "center": [5, 3], "size": [1, 1] },
                 "properties": { "tileGID": 4, "direction": 2, "boundaryBottom": 8,
                                 "boundaryTop": 1, "verticalVelocity": 1 } }"#,
        );
        assert_eq!(
            spec.validate(),
            Err(ObjectSkip::InvertedBoundaries { low: 8.0, high: 1.0 })
        );
    }

    #[test]
    fn test_button_payload_range() {
        let spec = object(
            r#"{ "id": 3, "type": "button", "shape": { "center": [1, 1], "size": [1, 0.5] },
                 "properties": { "platformID": 1000000 } }"#,
        );
        assert_eq!(
            spec.validate(),
            Err(ObjectSkip::PayloadOutOfRange {
                name: "platformID",
                value: 1_000_000
            })
        );

        let missing = object(
            r#"{ "id": 4, "type": "button", "shape": { "center": [1, 1], "size": [1, 0.5] } }"#,
        );
        assert_eq!(
            missing.validate(),
            Err(ObjectSkip::MissingProperty("platformID"))
        );
    }

    #[test]
    fn test_wrong_property_type() {
        let spec = object(
            r#"{ "id": 5, "type": "entity", "shape": { "center": [1, 1], "size": [1, 1] },
                 "properties": { "tileGID": "crate" } }"#,
        );
        assert_eq!(
            spec.validate(),
            Err(ObjectSkip::WrongType {
                name: "tileGID",
                expected: "an integer"
            })
        );
    }

    #[test]
    fn test_finish_defaults_to_hub() {
        let spec = object(
            r#"{ "id": 6, "type": "finish", "shape": { "center": [1, 1], "size": [1, 2] } }"#,
        );
        assert!(matches!(
            spec.validate(),
            Ok(LevelObject::Finish { exit_level_id: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_objects_are_skipped_not_fatal() {
        let level = LevelDocument::from_json(
            r#"{
                "meta": { "name": "Broken Bits" },
                "player_spawn": [1, 2],
                "objects": [
                    { "id": 1, "type": "ground", "shape": { "center": [5, 0], "size": [10, 1] } },
                    { "id": 2, "type": "spring", "shape": { "center": [2, 1], "size": [1, 1] } },
                    { "id": 3, "type": "ladder", "shape": { "center": [3, 2], "size": [0, 3] } },
                    { "id": 4, "type": "mp", "shape": { "center": [5, 3], "size": [1, 1] },
                      "properties": { "tileGID": 4, "direction": 1, "boundaryLeft": 2,
                                      "boundaryRight": 9, "horizontalVelocity": 1 } },
                    { "id": 4, "type": "mp", "shape": { "center": [5, 6], "size": [1, 1] },
                      "properties": { "tileGID": 4, "direction": 1, "boundaryLeft": 2,
                                      "boundaryRight": 9, "horizontalVelocity": 1 } }
                ]
            }"#,
        )
        .unwrap();
        let mut world = PhysicsWorld::new();

        let data = level.apply_to_world(&mut world);

        assert_eq!(world.colliders.len(), 2);
        assert_eq!(data.platforms.len(), 1);
        assert_eq!(
            data.skipped,
            vec![
                (2, ObjectSkip::UnknownType("spring".to_string())),
                (3, ObjectSkip::NonPositiveSize(0.0, 3.0)),
                (4, ObjectSkip::DuplicatePlatformId(4)),
            ]
        );
    }

    #[test]
    fn test_colliders_carry_tags() {
        let level = LevelDocument::default_level().unwrap();
        let mut world = PhysicsWorld::new();
        let data = level.apply_to_world(&mut world);

        for object in &level.objects {
            let handle = data.object_handles[&object.id];
            let category = world.collider_tag(handle).unwrap().category();
            let expected = match object.kind.as_str() {
                "ground" => TagCategory::StaticGround,
                "danger" => TagCategory::Dangerous,
                "ladder" => TagCategory::Ladder,
                "finish" => TagCategory::FinishPoint,
                "button" => TagCategory::Button,
                "entity" => TagCategory::GenericEntity,
                "mp" => TagCategory::MovingPlatform,
                other => panic!("unexpected object type {other}"),
            };
            assert_eq!(category, expected);
        }
    }

    #[test]
    fn test_ungated_platform_starts_moving() {
        let level = LevelDocument::default_level().unwrap();
        let mut world = PhysicsWorld::new();
        let data = level.apply_to_world(&mut world);

        for platform in &data.platforms {
            let body = world.get_rigid_body(platform.body).unwrap();
            assert!(body.is_kinematic());
            let speed = body.linvel().x.abs() + body.linvel().y.abs();
            if platform.uses_button_gate {
                assert!(!platform.active);
                assert_eq!(speed, 0.0);
            } else {
                assert!(platform.active);
                assert!(speed > 0.0);
            }
        }
    }

    #[test]
    fn test_rejects_non_finite_spawn() {
        let level = LevelDocument {
            meta: LevelMeta {
                name: "Nowhere".to_string(),
            },
            player_spawn: [f32::NAN, 0.0],
            objects: Vec::new(),
        };
        assert!(matches!(level.check_spawn(), Err(LevelError::InvalidSpawn(..))));
    }

    #[test]
    fn test_json_round_trip() {
        let level = LevelDocument::default_level().unwrap();
        let json = level.to_json().unwrap();
        let loaded = LevelDocument::from_json(&json).unwrap();
        assert_eq!(loaded, level);
    }
}
