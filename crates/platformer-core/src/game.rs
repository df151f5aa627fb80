//! Top-level game loop: the level list, the campaign and the live session.

use crate::campaign::{Campaign, CampaignError};
use crate::config::SessionConfig;
use crate::level::{LevelDocument, LevelError};
use crate::player::{DeathCause, PlayerInput, PlayerStatus};
use crate::session::{FrameReport, LevelSession};

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Campaign(#[from] CampaignError),
    #[error("Failed to load level {index}: {source}")]
    Level {
        index: usize,
        #[source]
        source: LevelError,
    },
}

/// What happened during one game frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Nothing beyond the regular simulation.
    Running(FrameReport),
    /// The player died this frame. The level waits for [`Game::respawn`].
    Died(DeathCause),
    /// A finish point was used and `to` is now loaded.
    LevelChanged { from: usize, to: usize },
}

/// Owns every level and plays them in campaign order.
#[derive(Debug)]
pub struct Game {
    levels: Vec<LevelDocument>,
    config: SessionConfig,
    campaign: Campaign,
    session: LevelSession,
}

impl Game {
    /// Starts in the hub, which is the first level of `levels`.
    pub fn new(levels: Vec<LevelDocument>, config: SessionConfig) -> Result<Self, GameError> {
        let campaign = Campaign::new(levels.len())?;
        let session = Self::load_session(&levels, &config, campaign.current())?;

        Ok(Self {
            levels,
            config,
            campaign,
            session,
        })
    }

    fn load_session(
        levels: &[LevelDocument],
        config: &SessionConfig,
        index: usize,
    ) -> Result<LevelSession, GameError> {
        let level = levels.get(index).cloned().ok_or(CampaignError::UnknownLevel {
            index,
            count: levels.len(),
        })?;
        LevelSession::load(level, config.clone())
            .map_err(|source| GameError::Level { index, source })
    }

    fn switch_to(&mut self, index: usize) -> Result<(), GameError> {
        // The old session, its world and its contacts go away together.
        self.session = Self::load_session(&self.levels, &self.config, index)?;
        self.campaign.advance_to(index)?;
        Ok(())
    }

    /// Runs one frame and loads the next level when an exit is taken.
    pub fn frame(&mut self, input: PlayerInput) -> Result<GameEvent, GameError> {
        let report = self.session.frame(input);

        if let PlayerStatus::Dead(cause) = report.status {
            if report.status_changed {
                tracing::info!("[game] Player died: {:?}", cause);
                return Ok(GameEvent::Died(cause));
            }
            return Ok(GameEvent::Running(report));
        }

        let from = self.campaign.current();
        match self.campaign.next_level(report.status.at_exit(), input.enter) {
            Some(to) => {
                self.switch_to(to)?;
                Ok(GameEvent::LevelChanged { from, to })
            }
            None => Ok(GameEvent::Running(report)),
        }
    }

    /// Puts the player back at the spawn of the current level.
    pub fn respawn(&mut self) {
        self.session.respawn();
    }

    /// Reloads the current level from its document.
    pub fn restart_level(&mut self) -> Result<(), GameError> {
        self.switch_to(self.campaign.current())
    }

    /// Leaves the current level for the hub.
    pub fn enter_hub(&mut self) -> Result<(), GameError> {
        let hub = self.campaign.enter_hub();
        self.session = Self::load_session(&self.levels, &self.config, hub)?;
        Ok(())
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn session(&self) -> &LevelSession {
        &self.session
    }

    pub fn levels(&self) -> &[LevelDocument] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(name: &str, spawn: [f32; 2], exit: Option<u32>) -> LevelDocument {
        let finish = exit.map_or(String::new(), |exit| {
            format!(
                r#", {{ "id": 2, "type": "finish", "shape": {{ "center": [2, 2], "size": [2, 3] }},
                      "properties": {{ "level": {exit} }} }}"#
            )
        });
        LevelDocument::from_json(&format!(
            r#"{{
                "meta": {{ "name": "{name}" }},
                "player_spawn": [{}, {}],
                "objects": [
                    {{ "id": 1, "type": "ground", "shape": {{ "center": [2, 0], "size": [8, 1] }} }}
                    {finish}
                ]
            }}"#,
            spawn[0], spawn[1]
        ))
        .unwrap()
    }

    fn run_until_event(game: &mut Game, input: PlayerInput, frames: u32) -> Option<GameEvent> {
        for _ in 0..frames {
            match game.frame(input).unwrap() {
                GameEvent::Running(_) => {}
                event => return Some(event),
            }
        }
        None
    }

    #[test]
    fn test_empty_game() {
        assert!(matches!(
            Game::new(Vec::new(), SessionConfig::default()),
            Err(GameError::Campaign(CampaignError::Empty))
        ));
    }

    #[test]
    fn test_hub_exit_needs_enter() {
        let levels = vec![
            level("Hub", [2.0, 1.5], Some(2)),
            level("One", [2.0, 1.5], None),
            level("Two", [2.0, 1.5], None),
        ];
        let mut game = Game::new(levels, SessionConfig::default()).unwrap();

        assert_eq!(run_until_event(&mut game, PlayerInput::default(), 30), None);
        assert_eq!(game.session().status().at_exit(), Some(2));

        let enter = PlayerInput {
            enter: true,
            ..PlayerInput::default()
        };
        assert_eq!(
            game.frame(enter).unwrap(),
            GameEvent::LevelChanged { from: 0, to: 2 }
        );
        assert_eq!(game.campaign().current(), 2);
        assert_eq!(game.session().level().meta.name, "Two");
    }

    #[test]
    fn test_level_exit_wraps_to_first_level() {
        let levels = vec![
            level("Hub", [2.0, 1.5], Some(2)),
            level("One", [2.0, 1.5], Some(0)),
            level("Two", [2.0, 1.5], Some(0)),
        ];
        let mut game = Game::new(levels, SessionConfig::default()).unwrap();
        let enter = PlayerInput {
            enter: true,
            ..PlayerInput::default()
        };
        run_until_event(&mut game, enter, 30);
        assert_eq!(game.campaign().current(), 2);

        let event = run_until_event(&mut game, PlayerInput::default(), 30);

        assert_eq!(event, Some(GameEvent::LevelChanged { from: 2, to: 1 }));
        assert_eq!(game.session().level().meta.name, "One");
    }

    #[test]
    fn test_death_waits_for_respawn() {
        let levels = vec![level("Hub", [40.0, 0.0], None)];
        let mut game = Game::new(levels, SessionConfig::default()).unwrap();

        let event = run_until_event(&mut game, PlayerInput::default(), 200);
        assert_eq!(event, Some(GameEvent::Died(DeathCause::FellOutOfWorld)));

        assert!(matches!(
            game.frame(PlayerInput::default()).unwrap(),
            GameEvent::Running(FrameReport {
                status: PlayerStatus::Dead(DeathCause::FellOutOfWorld),
                ..
            })
        ));

        game.respawn();
        assert!(game.session().status().is_alive());
        assert_eq!(game.session().world().current_frame(), 0);
    }

    #[test]
    fn test_enter_hub_remembers_level() {
        let levels = vec![
            level("Hub", [2.0, 1.5], Some(1)),
            level("One", [2.0, 1.5], None),
        ];
        let mut game = Game::new(levels, SessionConfig::default()).unwrap();
        let enter = PlayerInput {
            enter: true,
            ..PlayerInput::default()
        };
        run_until_event(&mut game, enter, 30);
        assert_eq!(game.campaign().current(), 1);

        game.enter_hub().unwrap();

        assert!(game.campaign().is_hub());
        assert_eq!(game.campaign().natural_level(), 1);
        assert_eq!(game.session().level().meta.name, "Hub");
    }

    #[test]
    fn test_restart_level_reloads() {
        let levels = vec![level("Hub", [2.0, 1.5], None)];
        let mut game = Game::new(levels, SessionConfig::default()).unwrap();
        run_until_event(&mut game, PlayerInput::default(), 20);

        game.restart_level().unwrap();

        assert_eq!(game.session().world().current_frame(), 0);
        assert_eq!(game.session().player_position(), Some([2.0, 1.5]));
    }
}
