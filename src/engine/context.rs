use alloy_primitives::Address;

/// Who is calling, on whose behalf, when, and with how much native value.
///
/// `timestamp` is read once per call; every expiry check in the call uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallContext {
    pub sender: Address,
    pub tx_origin: Address,
    pub timestamp: u64,
    pub value: u128,
}

impl CallContext {
    /// A call made directly by an externally owned account
    pub fn new(sender: Address, timestamp: u64) -> Self {
        Self {
            sender,
            tx_origin: sender,
            timestamp,
            value: 0,
        }
    }

    pub fn with_origin(mut self, tx_origin: Address) -> Self {
        self.tx_origin = tx_origin;
        self
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }
}
