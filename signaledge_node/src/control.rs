//! Control surface: discrete commands over the device record.
//!
//! A closed set of named commands, each validated independently. Every
//! command executes under the store lock in a single acquisition, atomic
//! with respect to engine ticks and other commands. The wire shape is one
//! opcode byte plus an optional little-endian `i32` argument.

use crate::error::{NodeError, NodeResult};
use crate::state::{NodeContext, STATE_SIZE};
use signaledge::consts::{FAN_SPEED_MAX, FAN_SPEED_MIN};
use tracing::debug;

/// Command identifiers on the wire.
pub mod opcode {
    /// Set the fan speed (clamped).
    pub const SET_FAN_SPEED: u8 = 1;
    /// Set the alert threshold.
    pub const SET_THRESHOLD: u8 = 2;
    /// Set the bulk-read byte cap.
    pub const SET_EXPOSED_SIZE: u8 = 3;
    /// Store the control channel baud rate.
    pub const SET_CONTROL_BAUD: u8 = 4;
    /// Store the link mode.
    pub const SET_LINK_MODE: u8 = 5;
    /// Fetch a consistent snapshot.
    pub const GET_STATS: u8 = 6;
}

/// A control surface command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// Set fan speed; out-of-range values are clamped to [0, 5], never
    /// rejected.
    SetFanSpeed(i32),
    /// Set the alert threshold. The alert flag is not recomputed until the
    /// next tick.
    SetThreshold(i32),
    /// Set the bulk-read cap; rejected unless `0 < size <= STATE_SIZE`.
    SetExposedSize(i32),
    /// Stored only; no behavioral effect.
    SetControlBaud(i32),
    /// Stored only; no behavioral effect.
    SetLinkMode(i32),
    /// Snapshot of record and tunables, taken under one lock acquisition.
    GetStats,
}

/// Reply to a control surface command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlResponse {
    /// Command applied.
    Ack,
    /// Snapshot reply to `GetStats`.
    Stats(DeviceStats),
}

impl ControlRequest {
    /// Wire opcode for this command.
    pub fn opcode(&self) -> u8 {
        match self {
            Self::SetFanSpeed(_) => opcode::SET_FAN_SPEED,
            Self::SetThreshold(_) => opcode::SET_THRESHOLD,
            Self::SetExposedSize(_) => opcode::SET_EXPOSED_SIZE,
            Self::SetControlBaud(_) => opcode::SET_CONTROL_BAUD,
            Self::SetLinkMode(_) => opcode::SET_LINK_MODE,
            Self::GetStats => opcode::GET_STATS,
        }
    }

    fn argument(&self) -> Option<i32> {
        match *self {
            Self::SetFanSpeed(v)
            | Self::SetThreshold(v)
            | Self::SetExposedSize(v)
            | Self::SetControlBaud(v)
            | Self::SetLinkMode(v) => Some(v),
            Self::GetStats => None,
        }
    }

    /// Encode as a wire frame: opcode byte, then the argument if any.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = vec![self.opcode()];
        if let Some(arg) = self.argument() {
            frame.extend_from_slice(&arg.to_le_bytes());
        }
        frame
    }

    /// Decode a wire frame.
    ///
    /// A frame shorter than its command requires is a `CopyFault` (the
    /// argument transfer failed); an unknown opcode or trailing bytes are
    /// `InvalidArgument`.
    pub fn decode(frame: &[u8]) -> NodeResult<Self> {
        let (&op, rest) = frame.split_first().ok_or(NodeError::CopyFault {
            needed: 1,
            provided: 0,
        })?;

        let build = |ctor: fn(i32) -> Self| -> NodeResult<Self> {
            if rest.len() < 4 {
                return Err(NodeError::CopyFault {
                    needed: 5,
                    provided: frame.len(),
                });
            }
            if rest.len() > 4 {
                return Err(NodeError::InvalidArgument {
                    what: format!("oversized frame: {} bytes", frame.len()),
                });
            }
            let arg = i32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
            Ok(ctor(arg))
        };

        match op {
            opcode::SET_FAN_SPEED => build(Self::SetFanSpeed),
            opcode::SET_THRESHOLD => build(Self::SetThreshold),
            opcode::SET_EXPOSED_SIZE => build(Self::SetExposedSize),
            opcode::SET_CONTROL_BAUD => build(Self::SetControlBaud),
            opcode::SET_LINK_MODE => build(Self::SetLinkMode),
            opcode::GET_STATS => {
                if !rest.is_empty() {
                    return Err(NodeError::InvalidArgument {
                        what: format!("oversized frame: {} bytes", frame.len()),
                    });
                }
                Ok(Self::GetStats)
            }
            other => Err(NodeError::InvalidArgument {
                what: format!("unknown opcode {other}"),
            }),
        }
    }
}

/// Fixed-layout stats record: seven signed 32-bit fields, in this order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStats {
    /// Current temperature [°C].
    pub temperature: i32,
    /// Fan speed.
    pub fan_speed: i32,
    /// Alert threshold [°C].
    pub threshold: i32,
    /// Alert flag, 0/1.
    pub alert: i32,
    /// Bulk-read byte cap.
    pub exposed_size: i32,
    /// Stored control baud.
    pub control_baud: i32,
    /// Stored link mode.
    pub link_mode: i32,
}

/// Size of the stats wire record in bytes.
pub const STATS_SIZE: usize = std::mem::size_of::<DeviceStats>();

impl DeviceStats {
    /// Alert flag as a boolean.
    pub fn alert_active(&self) -> bool {
        self.alert != 0
    }

    /// Pack into the wire layout, little-endian, field order as declared.
    pub fn to_bytes(&self) -> [u8; STATS_SIZE] {
        let fields = [
            self.temperature,
            self.fan_speed,
            self.threshold,
            self.alert,
            self.exposed_size,
            self.control_baud,
            self.link_mode,
        ];
        let mut out = [0u8; STATS_SIZE];
        for (chunk, field) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    /// Unpack from the wire layout.
    pub fn from_bytes(bytes: &[u8; STATS_SIZE]) -> Self {
        let mut fields = [0i32; 7];
        for (field, chunk) in fields.iter_mut().zip(bytes.chunks_exact(4)) {
            *field = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self {
            temperature: fields[0],
            fan_speed: fields[1],
            threshold: fields[2],
            alert: fields[3],
            exposed_size: fields[4],
            control_baud: fields[5],
            link_mode: fields[6],
        }
    }
}

impl NodeContext {
    /// Execute one control command under a single lock acquisition.
    pub fn execute(&self, request: ControlRequest) -> NodeResult<ControlResponse> {
        let mut inner = self.lock();

        match request {
            ControlRequest::SetFanSpeed(value) => {
                let clamped = value.clamp(FAN_SPEED_MIN, FAN_SPEED_MAX);
                inner.backing.state_mut().fan_speed = clamped;
                debug!(requested = value, fan_speed = clamped, "fan speed set");
                Ok(ControlResponse::Ack)
            }
            ControlRequest::SetThreshold(value) => {
                // Stored as-is; the alert flag stays stale until the next
                // tick recomputes it.
                inner.backing.state_mut().threshold = value;
                debug!(threshold = value, "threshold set");
                Ok(ControlResponse::Ack)
            }
            ControlRequest::SetExposedSize(value) => {
                if value <= 0 || value as usize > STATE_SIZE {
                    return Err(NodeError::InvalidArgument {
                        what: format!("exposed_size {value} outside (0, {STATE_SIZE}]"),
                    });
                }
                inner.runtime.exposed_size = value;
                debug!(exposed_size = value, "exposed size set");
                Ok(ControlResponse::Ack)
            }
            ControlRequest::SetControlBaud(value) => {
                inner.runtime.control_baud = value;
                Ok(ControlResponse::Ack)
            }
            ControlRequest::SetLinkMode(value) => {
                inner.runtime.link_mode = value;
                Ok(ControlResponse::Ack)
            }
            ControlRequest::GetStats => {
                let state = inner.backing.state();
                let runtime = &inner.runtime;
                Ok(ControlResponse::Stats(DeviceStats {
                    temperature: state.temperature,
                    fan_speed: state.fan_speed,
                    threshold: state.threshold,
                    alert: state.alert,
                    exposed_size: runtime.exposed_size,
                    control_baud: runtime.control_baud,
                    link_mode: runtime.link_mode,
                }))
            }
        }
    }

    /// Execute a raw wire frame and return the encoded reply:
    /// stats bytes for `GetStats`, empty for an acknowledged set.
    pub fn execute_frame(&self, frame: &[u8]) -> NodeResult<Vec<u8>> {
        let request = ControlRequest::decode(frame)?;
        match self.execute(request)? {
            ControlResponse::Ack => Ok(Vec::new()),
            ControlResponse::Stats(stats) => Ok(stats.to_bytes().to_vec()),
        }
    }
}
