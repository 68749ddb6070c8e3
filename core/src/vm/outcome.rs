use crate::memory::Fault;

/// Terminal result raised by a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Panic,
    Fault,
    Host,
}

/// What the interpreter should do after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Continue with the next instruction.
    Ok,
    /// Relative to the start of the current instruction.
    StaticJump(i32),
    /// Absolute address resolved through the jump table.
    DynamicJump(u32),
    Result(ExitKind, u32),
}

impl Outcome {
    #[inline]
    pub const fn panic() -> Self {
        Outcome::Result(ExitKind::Panic, 0)
    }

    #[inline]
    pub const fn host_call(id: u32) -> Self {
        Outcome::Result(ExitKind::Host, id)
    }

    #[inline]
    pub const fn fault(fault: Fault) -> Self {
        Outcome::Result(ExitKind::Fault, fault.address)
    }

    #[inline]
    pub fn ok_or_fault(result: Result<(), Fault>) -> Self {
        match result {
            Ok(()) => Outcome::Ok,
            Err(fault) => Outcome::fault(fault),
        }
    }

    /// Branch by `offset` when `condition` holds, otherwise fall through.
    #[inline]
    pub fn branch(condition: bool, offset: u32) -> Self {
        if condition {
            Outcome::StaticJump(offset as i32)
        } else {
            Outcome::Ok
        }
    }
}
