//! Wire format for control frames.
//!
//! Every tick the client serialises the current control state into one
//! fixed-size frame. This module is responsible for:
//! - Defining the on-wire binary layout (command code, steering axes).
//! - Resolving the command flags into a single command code.
//! - Serialising a [`ControlFrame`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`ControlFrame`], returning
//!   errors for truncated or unknown input.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte fields are **big-endian**. There is no length prefix and no
//! delimiter; the receiver relies entirely on the fixed frame size.
//!
//! ```text
//! offset  size  field
//! 0       2     command      16-bit code: 's' brake, 'w' accelerate,
//!                            'n' neutral
//! 2       4     steering_x   IEEE-754 single-precision float
//! 6       4     steering_y   IEEE-754 single-precision float
//! ```
//!
//! Total frame size: [`FRAME_LEN`] = 10 bytes. The command travels as a
//! two-byte code because the deployed receiver reads a two-byte character
//! before the floats; a one-byte command would shift every float it unpacks.

use crate::control::ControlSnapshot;

/// Byte length of one frame on the wire.
pub const FRAME_LEN: usize = 10;

// Byte offsets of each field within the serialised frame.
const OFF_COMMAND: usize = 0;
const OFF_STEERING_X: usize = 2;
const OFF_STEERING_Y: usize = 6;

/// Command code for an active brake.
pub const CODE_BRAKE: u16 = b's' as u16;
/// Command code for a pressed accelerator.
pub const CODE_ACCELERATE: u16 = b'w' as u16;
/// Command code when neither pedal is engaged.
pub const CODE_NEUTRAL: u16 = b'n' as u16;

/// The single command slot of a frame.
///
/// A frame never carries a flag combination; [`Command::resolve`] collapses
/// the two booleans with strict brake priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Brake,
    Accelerate,
    Neutral,
}

impl Command {
    /// Collapses the button flags into one command.
    ///
    /// Brake always wins; the accelerator is only reported when the brake is
    /// released.
    pub fn resolve(brake_active: bool, accelerate_pressed: bool) -> Self {
        if brake_active {
            Command::Brake
        } else if accelerate_pressed {
            Command::Accelerate
        } else {
            Command::Neutral
        }
    }

    /// The 16-bit wire code for this command.
    pub fn code(self) -> u16 {
        match self {
            Command::Brake => CODE_BRAKE,
            Command::Accelerate => CODE_ACCELERATE,
            Command::Neutral => CODE_NEUTRAL,
        }
    }

    fn from_code(code: u16) -> Result<Self, FrameError> {
        match code {
            CODE_BRAKE => Ok(Command::Brake),
            CODE_ACCELERATE => Ok(Command::Accelerate),
            CODE_NEUTRAL => Ok(Command::Neutral),
            other => Err(FrameError::UnknownCommand(other)),
        }
    }
}

/// One control frame in host representation.
///
/// Constructed fresh from a state snapshot each tick and discarded after the
/// write; frames are never queued or stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlFrame {
    pub command: Command,
    pub steering_x: f32,
    pub steering_y: f32,
}

impl ControlFrame {
    /// Builds the frame for a state snapshot, resolving command priority.
    pub fn from_snapshot(snapshot: &ControlSnapshot) -> Self {
        Self {
            command: Command::resolve(snapshot.brake_active, snapshot.accelerate_pressed),
            steering_x: snapshot.steering_x,
            steering_y: snapshot.steering_y,
        }
    }

    /// Serialises this frame into its fixed-size wire form.
    ///
    /// The floats are written bit-exact; NaN and infinities pass through
    /// unchanged.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[OFF_COMMAND..OFF_COMMAND + 2].copy_from_slice(&self.command.code().to_be_bytes());
        buf[OFF_STEERING_X..OFF_STEERING_X + 4].copy_from_slice(&self.steering_x.to_be_bytes());
        buf[OFF_STEERING_Y..OFF_STEERING_Y + 4].copy_from_slice(&self.steering_y.to_be_bytes());
        buf
    }

    /// Parses a [`ControlFrame`] from a raw byte slice.
    ///
    /// Returns [`Err`] if `buf` holds fewer than [`FRAME_LEN`] bytes or the
    /// command code is not one of the three known values. Trailing bytes
    /// beyond the frame are ignored so a larger read buffer can be handed in
    /// directly.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < FRAME_LEN {
            return Err(FrameError::TooShort(buf.len()));
        }

        let code = u16::from_be_bytes(buf[OFF_COMMAND..OFF_COMMAND + 2].try_into().unwrap());
        let command = Command::from_code(code)?;
        let steering_x =
            f32::from_be_bytes(buf[OFF_STEERING_X..OFF_STEERING_X + 4].try_into().unwrap());
        let steering_y =
            f32::from_be_bytes(buf[OFF_STEERING_Y..OFF_STEERING_Y + 4].try_into().unwrap());

        Ok(Self {
            command,
            steering_x,
            steering_y,
        })
    }
}

/// Errors that can arise when parsing a raw frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame too short: expected {FRAME_LEN} bytes, got {0}")]
    TooShort(usize),

    #[error("unknown command code: {0:#06x}")]
    UnknownCommand(u16),
}

/// Renders bytes the way the transmit debug log prints them: upper-case hex,
/// space separated.
pub fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}
