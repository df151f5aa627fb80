//! Contact aggregation.
//!
//! Rapier reports collider pairs that start or stop touching from inside
//! `PhysicsPipeline::step`. [`ContactState`] folds those transitions into
//! counters and sets the game rules read between steps, and
//! [`ContactListener`] is the event handler that feeds it.
//!
//! Pairs arrive in no particular order. Each pair is normalised by category
//! and resolved to a single [`ContactRule`], so the two orderings can never be
//! handled differently.

use std::collections::{HashMap, HashSet};

use parking_lot::{Mutex, MutexGuard};
use rapier2d::prelude::{
    ColliderHandle, ColliderSet, CollisionEvent, ContactPair, EventHandler, Real,
    RigidBodyHandle, RigidBodySet,
};

use crate::buttons::ButtonLinks;
use crate::tag::Tag;

/// One collider of a contact pair, already decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactSide {
    pub tag: Tag,
    /// Body owning the collider, `None` for parentless static colliders.
    pub body: Option<RigidBodyHandle>,
    pub collider: ColliderHandle,
}

impl ContactSide {
    pub fn new(tag: Tag, body: Option<RigidBodyHandle>, collider: ColliderHandle) -> Self {
        Self {
            tag,
            body,
            collider,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Begin,
    End,
}

/// The gameplay meaning of a contact pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactRule {
    /// Foot sensor over something the player can stand on.
    Support {
        platform: Option<RigidBodyHandle>,
        entity: Option<ColliderHandle>,
    },
    Ladder,
    Danger,
    Finish { exit_level_id: u32 },
    ButtonPress { platform_id: u32 },
    Ignored,
}

impl ContactRule {
    fn classify(a: ContactSide, b: ContactSide) -> Self {
        let (lo, hi) = if a.tag.category() <= b.tag.category() {
            (a, b)
        } else {
            (b, a)
        };

        match (lo.tag, hi.tag) {
            (
                Tag::StaticGround | Tag::PlayerBody | Tag::PlayerFootSensor,
                Tag::PlayerFootSensor,
            ) => Self::Support {
                platform: None,
                entity: None,
            },
            (Tag::PlayerFootSensor, Tag::MovingPlatform) => Self::Support {
                platform: hi.body,
                entity: None,
            },
            (Tag::PlayerFootSensor, Tag::GenericEntity) => Self::Support {
                platform: None,
                entity: Some(hi.collider),
            },
            (Tag::PlayerBody, Tag::Ladder) => Self::Ladder,
            (Tag::PlayerBody, Tag::Dangerous) => Self::Danger,
            (Tag::PlayerBody, Tag::FinishPoint { exit_level_id }) => Self::Finish { exit_level_id },
            (Tag::PlayerFootSensor, Tag::Button { .. })
            | (Tag::Button { .. }, Tag::Button { .. }) => Self::Ignored,
            (_, Tag::Button { platform_id }) | (Tag::Button { platform_id }, _) => {
                Self::ButtonPress { platform_id }
            }
            _ => Self::Ignored,
        }
    }
}

/// Gameplay state derived from the contacts currently open in the world.
///
/// One instance lives per level session. Every counter equals the number of
/// begins of its kind minus the matching ends. Handles stored here are
/// borrowed from the physics world and must be dropped with [`reset`] before
/// that world is replaced.
///
/// [`reset`]: ContactState::reset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactState {
    ground_contacts: u32,
    danger_contacts: u32,
    ladder_contacts: u32,
    finish_contacts: u32,
    last_finish_exit_level_id: Option<u32>,
    moving_platforms_under_player: HashSet<RigidBodyHandle>,
    entity_colliders_underfoot: HashSet<ColliderHandle>,
    button_presses: HashMap<u32, u32>,
}

impl ContactState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that two colliders started touching.
    pub fn on_contact_begin(&mut self, a: ContactSide, b: ContactSide) {
        self.apply(Transition::Begin, a, b);
    }

    /// Records that two colliders stopped touching.
    pub fn on_contact_end(&mut self, a: ContactSide, b: ContactSide) {
        self.apply(Transition::End, a, b);
    }

    /// Clears every counter, set and press count.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn apply(&mut self, transition: Transition, a: ContactSide, b: ContactSide) {
        match ContactRule::classify(a, b) {
            ContactRule::Support { platform, entity } => {
                adjust(&mut self.ground_contacts, transition, "ground");
                if let Some(body) = platform {
                    toggle(&mut self.moving_platforms_under_player, body, transition);
                }
                if let Some(collider) = entity {
                    toggle(&mut self.entity_colliders_underfoot, collider, transition);
                }
            }
            ContactRule::Ladder => adjust(&mut self.ladder_contacts, transition, "ladder"),
            ContactRule::Danger => adjust(&mut self.danger_contacts, transition, "danger"),
            ContactRule::Finish { exit_level_id } => {
                adjust(&mut self.finish_contacts, transition, "finish");
                // Last begin wins when two exits overlap.
                if transition == Transition::Begin {
                    self.last_finish_exit_level_id = Some(exit_level_id);
                }
            }
            ContactRule::ButtonPress { platform_id } => {
                let count = self.button_presses.entry(platform_id).or_insert(0);
                adjust(count, transition, "button");
                tracing::debug!("[contact] Button {} press count {}", platform_id, count);
            }
            ContactRule::Ignored => {}
        }
    }

    pub fn ground_contacts(&self) -> u32 {
        self.ground_contacts
    }

    pub fn danger_contacts(&self) -> u32 {
        self.danger_contacts
    }

    pub fn ladder_contacts(&self) -> u32 {
        self.ladder_contacts
    }

    pub fn finish_contacts(&self) -> u32 {
        self.finish_contacts
    }

    /// Exit id of the most recent finish point the player touched.
    pub fn last_finish_exit_level_id(&self) -> Option<u32> {
        self.last_finish_exit_level_id
    }

    pub fn moving_platforms_under_player(&self) -> &HashSet<RigidBodyHandle> {
        &self.moving_platforms_under_player
    }

    pub fn entity_colliders_underfoot(&self) -> &HashSet<ColliderHandle> {
        &self.entity_colliders_underfoot
    }

    pub fn button_presses(&self) -> &HashMap<u32, u32> {
        &self.button_presses
    }

    pub fn button_links(&self) -> ButtonLinks<'_> {
        ButtonLinks::new(&self.button_presses)
    }

    pub fn is_grounded(&self) -> bool {
        self.ground_contacts > 0
    }

    pub fn is_on_ladder(&self) -> bool {
        self.ladder_contacts > 0
    }

    pub fn is_in_danger(&self) -> bool {
        self.danger_contacts > 0
    }

    /// Exit id while the player overlaps at least one finish point.
    pub fn active_exit(&self) -> Option<u32> {
        if self.finish_contacts > 0 {
            self.last_finish_exit_level_id
        } else {
            None
        }
    }

    /// Gravity multiplier for the player body: 0 on a ladder, 1 otherwise.
    pub fn player_gravity_scale(&self) -> Real {
        if self.is_on_ladder() { 0.0 } else { 1.0 }
    }

    /// The moving platform the player rides, if any.
    ///
    /// With several platforms underfoot the one with the lowest handle wins,
    /// keeping the choice stable across runs.
    pub fn supporting_platform(&self) -> Option<RigidBodyHandle> {
        self.moving_platforms_under_player
            .iter()
            .copied()
            .min_by_key(|handle| handle.into_raw_parts())
    }
}

fn adjust(counter: &mut u32, transition: Transition, kind: &'static str) {
    match transition {
        Transition::Begin => *counter += 1,
        Transition::End => {
            debug_assert!(*counter > 0, "{kind} contact ended without a matching begin");
            if *counter == 0 {
                tracing::warn!(
                    "[contact] {} contact ended without a matching begin, clamping at zero",
                    kind
                );
            } else {
                *counter -= 1;
            }
        }
    }
}

fn toggle<T: Eq + std::hash::Hash>(set: &mut HashSet<T>, value: T, transition: Transition) {
    match transition {
        Transition::Begin => {
            set.insert(value);
        }
        Transition::End => {
            set.remove(&value);
        }
    }
}

/// Rapier event handler that aggregates collision events into a
/// [`ContactState`].
///
/// The handler only ever sees `&RigidBodySet` and `&ColliderSet`, so nothing
/// reachable from a callback can add, remove or step bodies. The state sits
/// behind a mutex because rapier requires handlers to be `Send + Sync`; it is
/// only locked inside callbacks and between steps.
#[derive(Debug, Default)]
pub struct ContactListener {
    state: Mutex<ContactState>,
}

impl ContactListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the aggregated state.
    ///
    /// The guard must be released before the next physics step.
    pub fn state(&self) -> MutexGuard<'_, ContactState> {
        self.state.lock()
    }

    /// Drops every counter and handle. Called on level load and respawn.
    pub fn reset(&self) {
        self.state.lock().reset();
    }

    /// Decodes both colliders of `event` and folds it into the state.
    pub fn record(&self, colliders: &ColliderSet, event: CollisionEvent) {
        let (Some(a), Some(b)) = (
            decode_side(colliders, event.collider1()),
            decode_side(colliders, event.collider2()),
        ) else {
            tracing::trace!("[contact] Ignoring event with an unknown collider: {:?}", event);
            return;
        };

        let mut state = self.state.lock();
        if event.started() {
            state.on_contact_begin(a, b);
        } else {
            state.on_contact_end(a, b);
        }
    }
}

impl EventHandler for ContactListener {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.record(colliders, event);
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

fn decode_side(colliders: &ColliderSet, handle: ColliderHandle) -> Option<ContactSide> {
    let collider = colliders.get(handle)?;
    let Some(tag) = Tag::from_user_data(collider.user_data) else {
        tracing::trace!(
            "[contact] Collider {:?} has undecodable user_data {}",
            handle,
            collider.user_data
        );
        return None;
    };
    Some(ContactSide::new(tag, collider.parent(), handle))
}
