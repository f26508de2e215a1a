use core::convert::TryFrom;

use embedded_hal::spi::FullDuplex;
use embedded_time::duration::Microseconds;

use crate::arbiter::BusError;

/// Byte-level access to the serial channel.
///
/// Each spin on the channel is bounded by `timeout` so a disconnected or
/// wedged peripheral surfaces as [`BusError::ChannelStall`].
pub(crate) struct Link<'clock, Spi, Clock>
    where
        Spi: FullDuplex<u8>,
        Clock: embedded_time::Clock,
{
    spi: Spi,
    clock: &'clock Clock,
    timeout: Microseconds<u32>,
}

impl<'clock, Spi, Clock> Link<'clock, Spi, Clock>
    where
        Spi: FullDuplex<u8>,
        Clock: embedded_time::Clock,
        Clock::T: TryFrom<u32>,
{
    pub(crate) fn new(spi: Spi, clock: &'clock Clock, timeout: Microseconds<u32>) -> Self {
        Self {
            spi,
            clock,
            timeout,
        }
    }

    /// Place a byte on the bus without collecting the byte shifted in.
    pub(crate) fn transmit(&mut self, value: u8) -> Result<(), BusError<Spi::Error>> {
        let timer = self.clock.new_timer(self.timeout).start()?;
        loop {
            match self.spi.send(value) {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(BusError::Channel(e)),
                Err(nb::Error::WouldBlock) => {
                    if timer.is_expired()? {
                        log::warn!("transmit stalled");
                        return Err(BusError::ChannelStall);
                    }
                }
            }
        }
    }

    pub(crate) fn receive(&mut self) -> Result<u8, BusError<Spi::Error>> {
        let timer = self.clock.new_timer(self.timeout).start()?;
        loop {
            match self.spi.read() {
                Ok(value) => return Ok(value),
                Err(nb::Error::Other(e)) => return Err(BusError::Channel(e)),
                Err(nb::Error::WouldBlock) => {
                    if timer.is_expired()? {
                        log::warn!("receive stalled");
                        return Err(BusError::ChannelStall);
                    }
                }
            }
        }
    }

    /// One full-duplex transaction: the byte shifted in while `value` was
    /// shifted out.
    pub(crate) fn exchange(&mut self, value: u8) -> Result<u8, BusError<Spi::Error>> {
        self.transmit(value)?;
        let received = self.receive()?;
        log::trace!("exchange {:02x} -> {:02x}", value, received);
        Ok(received)
    }

    /// Discard whatever is sitting in the receive buffer.
    pub(crate) fn drain(&mut self) -> usize {
        let mut discarded = 0;
        while self.spi.read().is_ok() {
            discarded += 1;
        }
        discarded
    }

    pub(crate) fn release(self) -> Spi {
        self.spi
    }
}
