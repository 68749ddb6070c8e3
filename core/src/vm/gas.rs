/// Remaining execution budget. Signed so that an overdraw stays observable.
pub type Gas = i64;

/// Metered budget of one interpreter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasCounter {
    gas: Gas,
}

impl GasCounter {
    pub const fn new(gas: Gas) -> Self {
        Self { gas }
    }

    #[inline]
    pub fn get(&self) -> Gas {
        self.gas
    }

    /// Overwrite the remaining gas. Prefer [`GasCounter::sub`] while executing.
    #[inline]
    pub fn set(&mut self, gas: Gas) {
        self.gas = gas;
    }

    /// Charge `amount`; returns `true` when the counter went negative.
    #[inline]
    pub fn sub(&mut self, amount: Gas) -> bool {
        self.gas = self.gas.wrapping_sub(amount);
        self.gas < 0
    }
}
