//! Line protocol spoken with the display process.

use std::fmt;

/// A command forwarded to the display, one line each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCommand {
    NewGame {
        width: u32,
        height: u32,
        names: Vec<String>,
    },
    Pixel {
        x: u32,
        y: u32,
        name: String,
    },
    PlayerEliminated {
        name: String,
    },
}

impl fmt::Display for DisplayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayCommand::NewGame {
                width,
                height,
                names,
            } => {
                write!(f, "NEW_GAME {} {}", width, height)?;
                for name in names {
                    write!(f, " {}", name)?;
                }
                Ok(())
            }
            DisplayCommand::Pixel { x, y, name } => write!(f, "PIXEL {} {} {}", x, y, name),
            DisplayCommand::PlayerEliminated { name } => write!(f, "PLAYER_ELIMINATED {}", name),
        }
    }
}

impl DisplayCommand {
    /// The command as sent on the wire, newline included.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}
