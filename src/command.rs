// Operator command vocabulary and the key -> action table

use crate::motor::Direction;

/// Logical movement command, derived fresh every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Forward,
        Command::Backward,
        Command::Left,
        Command::Right,
        Command::Stop,
    ];

    /// (left, right) channel directions for a moving command, `None` for Stop
    ///
    /// Turns are pivot turns: the channel on the inside of the turn reverses.
    pub fn directions(self) -> Option<(Direction, Direction)> {
        match self {
            Command::Forward => Some((Direction::Forward, Direction::Forward)),
            Command::Backward => Some((Direction::Backward, Direction::Backward)),
            Command::Left => Some((Direction::Backward, Direction::Forward)),
            Command::Right => Some((Direction::Forward, Direction::Backward)),
            Command::Stop => None,
        }
    }
}

/// Operator key, already stripped of terminal specifics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    SpeedUp,
    SpeedDown,
    Quit,
    Other,
}

/// What one tick does with the sampled key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Drive(Command),
    SpeedUp,
    SpeedDown,
    Quit,
}

impl Action {
    /// Command issued to the drive unit on this tick
    ///
    /// Speed keys and quit are not directional, so they stop the vehicle.
    pub fn command(self) -> Command {
        match self {
            Action::Drive(command) => command,
            Action::SpeedUp | Action::SpeedDown | Action::Quit => Command::Stop,
        }
    }
}

/// Total map from the sampled key to an action
///
/// No key this tick means Stop, not "repeat the last command": the vehicle
/// only moves while a direction key keeps arriving.
pub fn action_for(key: Option<Key>) -> Action {
    match key {
        Some(Key::Up) => Action::Drive(Command::Forward),
        Some(Key::Down) => Action::Drive(Command::Backward),
        Some(Key::Left) => Action::Drive(Command::Left),
        Some(Key::Right) => Action::Drive(Command::Right),
        Some(Key::SpeedUp) => Action::SpeedUp,
        Some(Key::SpeedDown) => Action::SpeedDown,
        Some(Key::Quit) => Action::Quit,
        Some(Key::Other) | None => Action::Drive(Command::Stop),
    }
}
