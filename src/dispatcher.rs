//! Atomic `HALT_ALL` dispatch to both motor controller ports.

use std::sync::Arc;

use log::error;

use crate::error::DispatchError;
use crate::motor::{Command, MotorControllerPort};

pub struct CommandDispatcher {
    port_a: Arc<dyn MotorControllerPort>,
    port_b: Arc<dyn MotorControllerPort>,
}

impl CommandDispatcher {
    pub fn new(port_a: Arc<dyn MotorControllerPort>, port_b: Arc<dyn MotorControllerPort>) -> Self {
        CommandDispatcher { port_a, port_b }
    }

    pub fn port_for(&self, crane: crate::pulse::CraneId) -> &Arc<dyn MotorControllerPort> {
        match crane {
            crate::pulse::CraneId::A => &self.port_a,
            crate::pulse::CraneId::B => &self.port_b,
        }
    }

    /// Sends `HALT_ALL` to both ports. This is one logical command
    /// delivered twice, not two independently-issued halts — callers
    /// that need to assert on it should observe both ports receiving
    /// the same `Command::HaltAll` value.
    ///
    /// If either port fails, the failure is surfaced but the caller
    /// remains in FAULT regardless: a dispatch failure never reopens
    /// the lift.
    pub fn dispatch_halt_all(&self) -> Result<(), DispatchError> {
        let a_result = self.port_a.send_command(Command::HaltAll);
        let b_result = self.port_b.send_command(Command::HaltAll);

        if let Err(e) = &a_result {
            error!("HALT_ALL dispatch to crane A failed: {}", e);
        }
        if let Err(e) = &b_result {
            error!("HALT_ALL dispatch to crane B failed: {}", e);
        }

        a_result.and(b_result)
    }

    pub fn dispatch_move(
        &self,
        crane_id: crate::pulse::CraneId,
        delta_mm: f64,
    ) -> Result<(), DispatchError> {
        self.port_for(crane_id)
            .send_command(Command::Move { crane_id, delta_mm })
    }
}
