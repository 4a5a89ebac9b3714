#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Increase,
    Decrease,
}

impl Command {
    pub fn path(self) -> &'static str {
        match self {
            Self::Increase => "/increase",
            Self::Decrease => "/decrease",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increase => "INCREASE",
            Self::Decrease => "DECREASE",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Increase => "+",
            Self::Decrease => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchZone {
    Increase,
    Decrease,
    Idle,
}

impl TouchZone {
    pub fn command(self) -> Option<Command> {
        match self {
            Self::Increase => Some(Command::Increase),
            Self::Decrease => Some(Command::Decrease),
            Self::Idle => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
    pub gesture: u8,
}
