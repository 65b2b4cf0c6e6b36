use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::rc::RcCommand;

pub const MOVE_MIN_CM: u32 = 20;
pub const MOVE_MAX_CM: u32 = 500;
pub const ROTATE_MIN_DEG: u32 = 1;
pub const ROTATE_MAX_DEG: u32 = 360;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("distance {0}cm out of range (20-500)")]
    DistanceOutOfRange(u32),

    #[error("angle {0} out of range (1-360)")]
    AngleOutOfRange(u32),

    #[error("unknown direction: {0}")]
    UnknownDirection(String),

    #[error("unknown rotation: {0}")]
    UnknownRotation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Back => "back",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl FromStr for Direction {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Direction::Forward),
            "back" => Ok(Direction::Back),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(CommandError::UnknownDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Cw,
    Ccw,
}

impl Rotation {
    pub fn as_str(self) -> &'static str {
        match self {
            Rotation::Cw => "cw",
            Rotation::Ccw => "ccw",
        }
    }
}

impl FromStr for Rotation {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cw" => Ok(Rotation::Cw),
            "ccw" => Ok(Rotation::Ccw),
            other => Err(CommandError::UnknownRotation(other.to_string())),
        }
    }
}

/// One datagram of the vehicle's text protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `command`: enter SDK mode.
    Sdk,
    Takeoff,
    Land,
    Emergency,
    Stop,
    StreamOn,
    StreamOff,
    Move(Direction, u32),
    Rotate(Rotation, u32),
    Rc(RcCommand),
    Battery,
    State,
    Raw(String),
}

impl Command {
    pub fn movement(dir: Direction, cm: u32) -> Result<Self, CommandError> {
        if !(MOVE_MIN_CM..=MOVE_MAX_CM).contains(&cm) {
            return Err(CommandError::DistanceOutOfRange(cm));
        }
        Ok(Command::Move(dir, cm))
    }

    pub fn rotation(rot: Rotation, deg: u32) -> Result<Self, CommandError> {
        if !(ROTATE_MIN_DEG..=ROTATE_MAX_DEG).contains(&deg) {
            return Err(CommandError::AngleOutOfRange(deg));
        }
        Ok(Command::Rotate(rot, deg))
    }

    /// Time the vehicle needs before it will take the next command.
    pub fn default_wait(&self) -> Duration {
        match self {
            Command::Takeoff | Command::Land | Command::StreamOn => Duration::from_secs(5),
            Command::Move(..) => Duration::from_secs(4),
            Command::Rotate(..) => Duration::from_secs(3),
            Command::Rc(_) => Duration::from_millis(50),
            Command::Emergency | Command::Stop => Duration::from_millis(500),
            Command::Battery | Command::State => Duration::from_millis(100),
            _ => Duration::from_secs(2),
        }
    }

    /// `rc` set-points stream at high rate and are logged quieter.
    pub fn is_rc(&self) -> bool {
        matches!(self, Command::Rc(_))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Sdk => f.write_str("command"),
            Command::Takeoff => f.write_str("takeoff"),
            Command::Land => f.write_str("land"),
            Command::Emergency => f.write_str("emergency"),
            Command::Stop => f.write_str("stop"),
            Command::StreamOn => f.write_str("streamon"),
            Command::StreamOff => f.write_str("streamoff"),
            Command::Move(dir, cm) => write!(f, "{} {}", dir.as_str(), cm),
            Command::Rotate(rot, deg) => write!(f, "{} {}", rot.as_str(), deg),
            Command::Rc(rc) => write!(f, "{}", rc),
            Command::Battery => f.write_str("battery?"),
            Command::State => f.write_str("state?"),
            Command::Raw(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_wire_text() {
        assert_eq!(Command::Sdk.to_string(), "command");
        assert_eq!(Command::Battery.to_string(), "battery?");
        assert_eq!(Command::movement(Direction::Up, 20).unwrap().to_string(), "up 20");
        assert_eq!(Command::rotation(Rotation::Ccw, 360).unwrap().to_string(), "ccw 360");
        let rc = RcCommand { left_right: -30, forward_backward: 100, up_down: 0, yaw: 7 };
        assert_eq!(Command::Rc(rc).to_string(), "rc -30 100 0 7");
    }

    #[test]
    fn rejects_out_of_range_maneuvers() {
        assert_eq!(Command::movement(Direction::Back, 19), Err(CommandError::DistanceOutOfRange(19)));
        assert_eq!(Command::movement(Direction::Back, 501), Err(CommandError::DistanceOutOfRange(501)));
        assert_eq!(Command::rotation(Rotation::Cw, 0), Err(CommandError::AngleOutOfRange(0)));
        assert_eq!(Command::rotation(Rotation::Cw, 361), Err(CommandError::AngleOutOfRange(361)));
    }

    #[test]
    fn parses_direction_words() {
        assert_eq!("left".parse::<Direction>(), Ok(Direction::Left));
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!("cw".parse::<Rotation>(), Ok(Rotation::Cw));
        assert!("spin".parse::<Rotation>().is_err());
    }

    #[test]
    fn waits_track_maneuver_time() {
        assert_eq!(Command::Takeoff.default_wait(), Duration::from_secs(5));
        assert_eq!(Command::Rc(RcCommand::ZERO).default_wait(), Duration::from_millis(50));
        assert_eq!(Command::Sdk.default_wait(), Duration::from_secs(2));
    }
}
