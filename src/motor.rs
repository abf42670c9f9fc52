//! The narrow outbound interface to a crane's motor controller.
//!
//! A small `#[cfg_attr(test, mockall::automock)]` trait is the entire
//! seam between this crate and the (out-of-scope) transport that
//! actually talks to hardware.

use crate::error::DispatchError;
use crate::pulse::CraneId;

/// The only command vocabulary a motor controller port understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// The canonical safety command. Delivered as one logical command
    /// to both ports by `CommandDispatcher::dispatch_halt_all`.
    HaltAll,
    /// Move a specific crane by `delta_mm`. Only ever admitted when the
    /// lift is in LIFTING with fresh, non-stale data.
    Move { crane_id: CraneId, delta_mm: f64 },
}

#[cfg_attr(test, mockall::automock)]
pub trait MotorControllerPort: Send + Sync {
    fn send_command(&self, cmd: Command) -> Result<(), DispatchError>;
    fn is_connected(&self) -> bool;
    fn crane_id(&self) -> CraneId;
}
