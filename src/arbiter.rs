use core::convert::TryFrom;

use embedded_hal::spi::FullDuplex;
use embedded_time::TimeError;

use crate::ack::{AckSignal, Acknowledge};
use crate::chip_select::{DeviceSelect, PortSelector};
use crate::delay::Delay;
use crate::link::Link;
use crate::protocol::{DeviceAddress, Port};
use crate::timing::Timing;

#[derive(Debug)]
pub enum BusError<E> {
    /// The channel reported an error of its own.
    Channel(E),
    /// The channel never became ready within `Timing::channel_timeout`.
    ChannelStall,
    Clock(TimeError),
}

impl<E> From<TimeError> for BusError<E> {
    fn from(e: TimeError) -> Self {
        BusError::Clock(e)
    }
}

/// Exclusive owner of the controller bus.
///
/// Every exchange re-establishes selection and addressing from scratch, and
/// nothing carries over between packets. Holding the arbiter by `&mut` is
/// what keeps two callers from interleaving packets.
pub struct Arbiter<'clock, Spi, Select, Signal, Clock>
    where
        Spi: FullDuplex<u8>,
        Select: DeviceSelect,
        Signal: AckSignal,
        Clock: embedded_time::Clock + 'clock
{
    link: Link<'clock, Spi, Clock>,
    cs: PortSelector<'clock, Select, Clock>,
    ack: Acknowledge<'clock, Signal, Clock>,
    delay: Delay<'clock, Clock>,
    timing: Timing,
}

impl<'clock, Spi, Select, Signal, Clock> Arbiter<'clock, Spi, Select, Signal, Clock>
    where
        Spi: FullDuplex<u8>,
        Select: DeviceSelect,
        Signal: AckSignal,
        Clock: embedded_time::Clock + 'clock,
        Clock::T: TryFrom<u32>,
{
    pub fn new(spi: Spi,
               select: Select,
               ack: Signal,
               clock: &'clock Clock,
               timing: Timing,
    ) -> Self {
        let delay = Delay::new(clock);
        Self {
            link: Link::new(spi, clock, timing.channel_timeout),
            cs: PortSelector::new(select, delay, &timing),
            ack: Acknowledge::new(ack, clock, timing.ack_poll_interval),
            delay,
            timing,
        }
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Route the device-select line to `port`. Takes effect for the next
    /// packet.
    pub fn select_port(&mut self, port: Port) {
        self.cs.select_port(port);
    }

    pub fn active_port(&self) -> Port {
        self.cs.active_port()
    }

    /// Send `request` to the device at `address` on the active port while
    /// collecting its reply into `response`.
    ///
    /// The reply length is not known up front: the device pulses acknowledge
    /// after every byte it has more to follow, and goes quiet when done. The
    /// returned count is the number of valid bytes in `response`. Zero means
    /// nothing answered at `address`; fewer than `response.len()` means the
    /// device had less to say. Once `request` runs out, zero bytes are
    /// shifted out to clock in the rest of the reply.
    pub fn exchange_packet(
        &mut self,
        address: DeviceAddress,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, BusError<Spi::Error>> {
        self.delay.delay(self.timing.select_pre_delay)?;
        self.ack.clear();
        let selected = self.cs.select()?;

        self.link.transmit(address.into())?;
        if !self.ack.wait(self.timing.presence_timeout)? {
            log::debug!("no device at {:?} on {:?}", address, selected.port());
            return Ok(0);
        }
        self.link.drain();

        let mut len = 0;
        let mut request = request.iter();
        while len < response.len() {
            let value = request.next().copied().unwrap_or(0x00);
            response[len] = self.link.exchange(value)?;
            len += 1;

            if !self.ack.wait(self.timing.ack_timeout)? {
                break;
            }
        }

        log::debug!("{:?} on {:?} replied with {} of up to {} bytes", address, selected.port(), len, response.len());
        Ok(len)
    }

    /// Push `request` to a device already known to be present, without
    /// waiting for acknowledge between bytes and without looking at what
    /// comes back.
    pub fn send_packet_no_acknowledge(
        &mut self,
        address: DeviceAddress,
        request: &[u8],
    ) -> Result<(), BusError<Spi::Error>> {
        self.ack.clear();
        let _cs = self.cs.select()?;

        self.link.transmit(address.into())?;
        self.delay.delay(self.timing.byte_delay)?;
        self.link.drain();

        for value in request {
            self.link.exchange(*value)?;
            self.delay.delay(self.timing.byte_delay)?;
        }

        log::debug!("sent {} bytes to {:?} without acknowledge", request.len(), address);
        Ok(())
    }

    /// Give back the peripherals, with select released.
    pub fn release(self) -> (Spi, Select, Signal) {
        (self.link.release(), self.cs.release(), self.ack.release())
    }
}
