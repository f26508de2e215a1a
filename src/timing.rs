use embedded_time::duration::Microseconds;

/// Phase durations of a packet exchange.
///
/// The order of the phases is fixed; only how long each one lasts is
/// tunable. Slow devices may need a longer `ack_timeout`, at the cost of
/// stalling the bus longer when a port is empty.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Timing {
    /// Before the stale acknowledge edge is cleared and select asserted.
    pub select_pre_delay: Microseconds<u32>,
    /// After select is asserted, so the device can prepare.
    pub select_settle: Microseconds<u32>,
    /// Before select is released.
    pub select_hold: Microseconds<u32>,
    /// After select is released, before the bus is considered idle.
    pub select_post_delay: Microseconds<u32>,
    /// Acknowledge window following the address byte.
    pub presence_timeout: Microseconds<u32>,
    /// Acknowledge window following each data byte.
    pub ack_timeout: Microseconds<u32>,
    pub ack_poll_interval: Microseconds<u32>,
    /// Gap between bytes when no acknowledge is awaited.
    pub byte_delay: Microseconds<u32>,
    /// Upper bound on waiting for the channel to accept or deliver a byte.
    pub channel_timeout: Microseconds<u32>,
}

impl Timing {
    pub const fn new() -> Self {
        Self {
            select_pre_delay: Microseconds(10),
            select_settle: Microseconds(150),
            select_hold: Microseconds(150),
            select_post_delay: Microseconds(10),
            presence_timeout: Microseconds(120),
            ack_timeout: Microseconds(120),
            ack_poll_interval: Microseconds(10),
            byte_delay: Microseconds(30),
            channel_timeout: Microseconds(1000),
        }
    }

    pub fn with_presence_timeout(mut self, timeout: Microseconds<u32>) -> Self {
        self.presence_timeout = timeout;
        self
    }

    pub fn with_ack_timeout(mut self, timeout: Microseconds<u32>) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn with_channel_timeout(mut self, timeout: Microseconds<u32>) -> Self {
        self.channel_timeout = timeout;
        self
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}
