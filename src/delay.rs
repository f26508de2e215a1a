use core::convert::TryFrom;

use embedded_time::duration::Microseconds;
use embedded_time::TimeError;

/// Busy-wait delay driven by a monotonic clock.
pub struct Delay<'clock, Clock>
    where
        Clock: embedded_time::Clock,
{
    clock: &'clock Clock,
}

impl<'clock, Clock> Delay<'clock, Clock>
    where
        Clock: embedded_time::Clock,
        Clock::T: TryFrom<u32>,
{
    pub fn new(clock: &'clock Clock) -> Self {
        Self {
            clock,
        }
    }

    pub fn delay(&self, duration: Microseconds<u32>) -> Result<(), TimeError> {
        if duration.0 == 0 {
            return Ok(());
        }
        self.clock.new_timer(duration).start()?.wait()?;
        Ok(())
    }
}

// derive would demand Clock: Clone
impl<Clock> Clone for Delay<'_, Clock>
    where
        Clock: embedded_time::Clock,
{
    fn clone(&self) -> Self {
        Self {
            clock: self.clock,
        }
    }
}

impl<Clock> Copy for Delay<'_, Clock>
    where
        Clock: embedded_time::Clock,
{}
