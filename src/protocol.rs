use bitflags::bitflags;
use core::convert::TryFrom;

/// Controllers and memory cards share one bus, so the first byte of every
/// packet names the class of device that shall respond to it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceAddress {
    Controller = 0x01,
    MemoryCard = 0x81,
}

impl From<DeviceAddress> for u8 {
    fn from(address: DeviceAddress) -> Self {
        address as u8
    }
}

/// Command byte following the address. Codes marked (config) are only
/// understood by controllers in configuration mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Initialize DualShock pressure sensors (config)
    InitPressure = b'@',
    /// Read controller state
    Poll = b'B',
    /// Enter or exit configuration mode
    ConfigMode = b'C',
    /// Set analog mode/LED state (config)
    SetAnalog = b'D',
    /// Get analog mode/LED state (config)
    GetAnalog = b'E',
    /// Get information about a motor (config)
    GetMotorInfo = b'F',
    /// Get list of all motors (config)
    GetMotorList = b'G',
    /// Get current state of vibration motors (config)
    GetMotorState = b'H',
    /// Get list of all supported modes (config)
    GetMode = b'L',
    /// Configure poll request format (config)
    RequestConfig = b'M',
    /// Configure poll response format (config)
    ResponseConfig = b'O',
    /// Read 128-byte memory card sector
    CardRead = b'R',
    /// Retrieve memory card size information
    CardIdentify = b'S',
    /// Write 128-byte memory card sector
    CardWrite = b'W',
    GameIdPing = b' ',
    GameIdSend = b'!',
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command as u8
    }
}

/// Second response byte of every well-formed controller reply.
pub const POLL_MARKER: u8 = 0x5A;

/// Bytes 2 and 3 of a game-ID ping reply from a card that understands it.
pub const CARD_PROBE_MARKER: [u8; 2] = [0x27, 0xFF];

/// Largest game-ID request the card accepts, header included.
pub const GAME_ID_REQUEST_SIZE: usize = 64;

/// Physical connector whose device-select line is driven.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Port {
    One,
    Two,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PortError {
    Invalid(u8),
}

impl Port {
    pub const ALL: [Port; 2] = [Port::One, Port::Two];

    pub fn index(self) -> usize {
        match self {
            Port::One => 0,
            Port::Two => 1,
        }
    }

    pub fn presence(self) -> CardPresence {
        match self {
            Port::One => CardPresence::PORT_1,
            Port::Two => CardPresence::PORT_2,
        }
    }
}

impl Default for Port {
    fn default() -> Self {
        Port::One
    }
}

impl TryFrom<u8> for Port {
    type Error = PortError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Port::One),
            1 => Ok(Port::Two),
            _ => Err(PortError::Invalid(value)),
        }
    }
}

bitflags! {
    /// Pressed buttons, one bit each. The wire format is active low; these
    /// are already inverted.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Buttons: u16 {
        const SELECT   = 1 << 0;
        const L3       = 1 << 1;
        const R3       = 1 << 2;
        const START    = 1 << 3;
        const UP       = 1 << 4;
        const RIGHT    = 1 << 5;
        const DOWN     = 1 << 6;
        const LEFT     = 1 << 7;
        const L2       = 1 << 8;
        const R2       = 1 << 9;
        const L1       = 1 << 10;
        const R1       = 1 << 11;
        const TRIANGLE = 1 << 12;
        const CIRCLE   = 1 << 13;
        const CROSS    = 1 << 14;
        const SQUARE   = 1 << 15;
    }
}

bitflags! {
    /// Ports on which a memory card answered the game-ID ping.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CardPresence: u8 {
        const PORT_1 = 1 << 0;
        const PORT_2 = 1 << 1;
    }
}

/// Decoded reply to [`Command::Poll`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ControllerState {
    /// Upper nibble is the controller type, lower nibble the number of
    /// halfwords that follow the marker.
    pub device_type: u8,
    pub buttons: Buttons,
}
