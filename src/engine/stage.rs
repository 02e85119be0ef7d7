use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stages a game progresses through, in order. Transitions never skip a stage
/// and never move backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameStage {
    /// Waiting for players to join before the round starts.
    Lobby,
    /// Each player picks one of three bundled product concepts.
    Conjoint,
    /// Players assemble their feature boards from the shared pool.
    Building,
    /// Terminal stage; scores are final and the document is read-only.
    Completed,
}

impl GameStage {
    /// The stage that follows this one, or `None` for the terminal stage.
    pub fn next(self) -> Option<GameStage> {
        match self {
            GameStage::Lobby => Some(GameStage::Conjoint),
            GameStage::Conjoint => Some(GameStage::Building),
            GameStage::Building => Some(GameStage::Completed),
            GameStage::Completed => None,
        }
    }

    /// Whether the game can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStage::Completed)
    }
}

impl fmt::Display for GameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GameStage::Lobby => "lobby",
            GameStage::Conjoint => "conjoint",
            GameStage::Building => "building",
            GameStage::Completed => "completed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_form_a_total_order() {
        assert!(GameStage::Lobby < GameStage::Conjoint);
        assert!(GameStage::Conjoint < GameStage::Building);
        assert!(GameStage::Building < GameStage::Completed);
    }

    #[test]
    fn next_walks_the_chain_and_stops_at_completed() {
        let mut stage = GameStage::Lobby;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage, "progression must be monotonic");
            stage = next;
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                GameStage::Lobby,
                GameStage::Conjoint,
                GameStage::Building,
                GameStage::Completed
            ]
        );
        assert!(GameStage::Completed.is_terminal());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&GameStage::Conjoint).unwrap();
        assert_eq!(json, "\"conjoint\"");
        let back: GameStage = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(back, GameStage::Completed);
    }
}
