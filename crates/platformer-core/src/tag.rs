//! Collider tags.
//!
//! Every collider in a level carries exactly one [`Tag`]. Rapier only offers an
//! untyped `u128` slot per collider, so the tag is packed as
//! `category * PAYLOAD_LIMIT + payload` when written into `user_data` and
//! decoded back at the contact boundary. Everything above that boundary works
//! with the typed enum.

/// Exclusive upper bound for tag payloads (finish exit ids, button platform ids).
pub const PAYLOAD_LIMIT: u32 = 1_000_000;

/// Semantic role of a collider, without its payload.
///
/// The discriminants are the stable category codes used in the integer
/// encoding. `StaticGround` is zero so colliders without a tag read as ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TagCategory {
    StaticGround = 0,
    PlayerBody = 1,
    PlayerFootSensor = 2,
    Dangerous = 3,
    Ladder = 4,
    FinishPoint = 5,
    MovingPlatform = 6,
    Button = 7,
    GenericEntity = 8,
}

impl TagCategory {
    /// Returns the numeric category code.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Looks up a category by its numeric code.
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::StaticGround,
            1 => Self::PlayerBody,
            2 => Self::PlayerFootSensor,
            3 => Self::Dangerous,
            4 => Self::Ladder,
            5 => Self::FinishPoint,
            6 => Self::MovingPlatform,
            7 => Self::Button,
            8 => Self::GenericEntity,
            _ => return None,
        })
    }

    /// Returns true for the two categories that carry a payload.
    pub const fn carries_payload(self) -> bool {
        matches!(self, Self::FinishPoint | Self::Button)
    }
}

/// Typed collider tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    StaticGround,
    PlayerBody,
    PlayerFootSensor,
    Dangerous,
    Ladder,
    /// Level exit. `exit_level_id` selects the destination from the hub.
    FinishPoint { exit_level_id: u32 },
    MovingPlatform,
    /// Pressure button linked to the platform with id `platform_id`.
    Button { platform_id: u32 },
    GenericEntity,
}

impl Tag {
    pub const fn category(self) -> TagCategory {
        match self {
            Self::StaticGround => TagCategory::StaticGround,
            Self::PlayerBody => TagCategory::PlayerBody,
            Self::PlayerFootSensor => TagCategory::PlayerFootSensor,
            Self::Dangerous => TagCategory::Dangerous,
            Self::Ladder => TagCategory::Ladder,
            Self::FinishPoint { .. } => TagCategory::FinishPoint,
            Self::MovingPlatform => TagCategory::MovingPlatform,
            Self::Button { .. } => TagCategory::Button,
            Self::GenericEntity => TagCategory::GenericEntity,
        }
    }

    /// Payload carried by the tag, zero for categories without one.
    pub const fn payload(self) -> u32 {
        match self {
            Self::FinishPoint { exit_level_id } => exit_level_id,
            Self::Button { platform_id } => platform_id,
            _ => 0,
        }
    }

    /// Rebuilds a tag from a decoded category and payload.
    ///
    /// Categories without a payload only accept zero; anything else was not
    /// produced by [`encode`] and is rejected.
    pub const fn from_parts(category: TagCategory, payload: u32) -> Option<Self> {
        if !category.carries_payload() && payload != 0 {
            return None;
        }
        Some(match category {
            TagCategory::StaticGround => Self::StaticGround,
            TagCategory::PlayerBody => Self::PlayerBody,
            TagCategory::PlayerFootSensor => Self::PlayerFootSensor,
            TagCategory::Dangerous => Self::Dangerous,
            TagCategory::Ladder => Self::Ladder,
            TagCategory::FinishPoint => Self::FinishPoint {
                exit_level_id: payload,
            },
            TagCategory::MovingPlatform => Self::MovingPlatform,
            TagCategory::Button => Self::Button {
                platform_id: payload,
            },
            TagCategory::GenericEntity => Self::GenericEntity,
        })
    }

    /// Encodes the tag for a collider's `user_data` slot.
    pub fn to_user_data(self) -> u128 {
        u128::from(encode(self.category(), self.payload()))
    }

    /// Decodes a collider's `user_data` slot.
    pub fn from_user_data(user_data: u128) -> Option<Self> {
        let value = u64::try_from(user_data).ok()?;
        let (category, payload) = decode(value)?;
        Self::from_parts(category, payload)
    }
}

/// Packs a category and payload into a single integer.
///
/// The caller guarantees `payload < PAYLOAD_LIMIT`. A larger payload spills
/// into the category digits and corrupts only the collider it is written to;
/// level loading rejects such values before they get here.
pub fn encode(category: TagCategory, payload: u32) -> u64 {
    debug_assert!(
        payload < PAYLOAD_LIMIT,
        "tag payload {payload} exceeds {PAYLOAD_LIMIT}"
    );
    u64::from(category.code()) * u64::from(PAYLOAD_LIMIT) + u64::from(payload)
}

/// Splits an encoded tag into category and payload.
///
/// Returns `None` when the category code is unknown.
pub fn decode(value: u64) -> Option<(TagCategory, u32)> {
    let limit = u64::from(PAYLOAD_LIMIT);
    let category = u32::try_from(value / limit)
        .ok()
        .and_then(TagCategory::from_code)?;
    let payload = u32::try_from(value % limit).ok()?;
    Some((category, payload))
}
