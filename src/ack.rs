use core::convert::TryFrom;

use embedded_time::duration::Microseconds;
use embedded_time::TimeError;

use crate::delay::Delay;

/// Latched acknowledge (DSR) line.
///
/// Devices pulse the line briefly after each byte they want to follow up
/// on. The implementation must latch the edge so a pulse between two polls
/// is not lost.
pub trait AckSignal {
    fn is_pending(&self) -> bool;

    /// Reset the latch and re-arm whatever reports the next pulse.
    fn clear(&mut self);
}

pub(crate) struct Acknowledge<'clock, Signal, Clock>
    where
        Signal: AckSignal,
        Clock: embedded_time::Clock,
{
    signal: Signal,
    clock: &'clock Clock,
    delay: Delay<'clock, Clock>,
    poll_interval: Microseconds<u32>,
}

impl<'clock, Signal, Clock> Acknowledge<'clock, Signal, Clock>
    where
        Signal: AckSignal,
        Clock: embedded_time::Clock,
        Clock::T: TryFrom<u32>,
{
    pub(crate) fn new(signal: Signal, clock: &'clock Clock, poll_interval: Microseconds<u32>) -> Self {
        Self {
            signal,
            clock,
            delay: Delay::new(clock),
            poll_interval,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.signal.clear();
    }

    /// Poll for an acknowledge pulse until `timeout` has elapsed.
    ///
    /// Returns `true` and consumes the edge if one was seen.
    pub(crate) fn wait(&mut self, timeout: Microseconds<u32>) -> Result<bool, TimeError> {
        let deadline = self.clock.new_timer(timeout).start()?;
        loop {
            if self.signal.is_pending() {
                self.signal.clear();
                return Ok(true);
            }
            if deadline.is_expired()? {
                return Ok(false);
            }
            self.delay.delay(self.poll_interval)?;
        }
    }

    pub(crate) fn release(self) -> Signal {
        self.signal
    }
}
