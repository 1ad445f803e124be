//! Key events from the display and the turn intent they add up to

use shared::TurnIntent;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    LeftDown,
    LeftUp,
    RightDown,
    RightUp,
}

impl FromStr for KeyEvent {
    type Err = ();

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim_end() {
            "LEFT_KEY_DOWN" => Ok(KeyEvent::LeftDown),
            "LEFT_KEY_UP" => Ok(KeyEvent::LeftUp),
            "RIGHT_KEY_DOWN" => Ok(KeyEvent::RightDown),
            "RIGHT_KEY_UP" => Ok(KeyEvent::RightUp),
            _ => Err(()),
        }
    }
}

/// Tracks the turn intent with "last key wins": pressing a key overrides
/// the other one, releasing a key only matters if it is the one in effect.
#[derive(Debug, Clone)]
pub struct InputManager {
    turn_intent: TurnIntent,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            turn_intent: TurnIntent::Straight,
        }
    }

    pub fn turn_intent(&self) -> TurnIntent {
        self.turn_intent
    }

    pub fn apply(&mut self, key: KeyEvent) -> TurnIntent {
        self.turn_intent = match (key, self.turn_intent) {
            (KeyEvent::LeftDown, _) => TurnIntent::Left,
            (KeyEvent::RightDown, _) => TurnIntent::Right,
            (KeyEvent::LeftUp, TurnIntent::Left) | (KeyEvent::RightUp, TurnIntent::Right) => TurnIntent::Straight,
            (_, current) => current,
        };
        self.turn_intent
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_lines() {
        assert_eq!("LEFT_KEY_DOWN".parse::<KeyEvent>(), Ok(KeyEvent::LeftDown));
        assert_eq!("LEFT_KEY_UP\r".parse::<KeyEvent>(), Ok(KeyEvent::LeftUp));
        assert_eq!("RIGHT_KEY_DOWN".parse::<KeyEvent>(), Ok(KeyEvent::RightDown));
        assert_eq!("RIGHT_KEY_UP".parse::<KeyEvent>(), Ok(KeyEvent::RightUp));
        assert_eq!("UP_KEY_DOWN".parse::<KeyEvent>(), Err(()));
        assert_eq!("".parse::<KeyEvent>(), Err(()));
    }

    #[test]
    fn test_single_key() {
        let mut input = InputManager::new();
        assert_eq!(input.apply(KeyEvent::LeftDown), TurnIntent::Left);
        assert_eq!(input.apply(KeyEvent::LeftUp), TurnIntent::Straight);
        assert_eq!(input.apply(KeyEvent::RightDown), TurnIntent::Right);
        assert_eq!(input.apply(KeyEvent::RightUp), TurnIntent::Straight);
    }

    #[test]
    fn test_last_key_wins() {
        let mut input = InputManager::new();
        input.apply(KeyEvent::LeftDown);
        assert_eq!(input.apply(KeyEvent::RightDown), TurnIntent::Right);

        // Releasing the overridden key keeps the newer one.
        assert_eq!(input.apply(KeyEvent::LeftUp), TurnIntent::Right);
        assert_eq!(input.apply(KeyEvent::RightUp), TurnIntent::Straight);
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let mut input = InputManager::new();
        assert_eq!(input.apply(KeyEvent::RightUp), TurnIntent::Straight);
        input.apply(KeyEvent::LeftDown);
        assert_eq!(input.apply(KeyEvent::RightUp), TurnIntent::Left);
    }
}
