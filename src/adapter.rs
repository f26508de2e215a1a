use core::convert::TryFrom;

use embedded_hal::spi::FullDuplex;
use heapless::{consts::*, Vec};

use crate::ack::AckSignal;
use crate::arbiter::{Arbiter, BusError};
use crate::chip_select::DeviceSelect;
use crate::parser;
use crate::protocol::{
    Buttons, CardPresence, Command, ControllerState, DeviceAddress, Port, GAME_ID_REQUEST_SIZE,
};
use crate::timing::Timing;

#[derive(Debug)]
pub enum AdapterError<E> {
    Bus(BusError<E>),
    GameIdTooLong,
    GameIdContainsNul,
}

impl<E> From<BusError<E>> for AdapterError<E> {
    fn from(e: BusError<E>) -> Self {
        AdapterError::Bus(e)
    }
}

// command, reserved, length
const GAME_ID_HEADER: usize = 3;

/// Game ID as announced to memory cards: the id, NUL-terminated, behind a
/// three byte header.
pub(crate) fn game_id_request<E>(id: &str) -> Result<Vec<u8, U64>, AdapterError<E>> {
    let id = id.as_bytes();
    if id.contains(&0) {
        return Err(AdapterError::GameIdContainsNul);
    }
    let len = id.len() + 1;
    if GAME_ID_HEADER + len > GAME_ID_REQUEST_SIZE {
        return Err(AdapterError::GameIdTooLong);
    }

    let mut request = Vec::new();
    request.extend_from_slice(&[Command::GameIdSend.into(), 0x00, len as u8])
        .map_err(|_| AdapterError::GameIdTooLong)?;
    request.extend_from_slice(id)
        .map_err(|_| AdapterError::GameIdTooLong)?;
    request.push(0x00)
        .map_err(|_| AdapterError::GameIdTooLong)?;
    Ok(request)
}

/// Controller and memory card commands on top of an [`Arbiter`].
pub struct Adapter<'clock, Spi, Select, Signal, Clock>
    where
        Spi: FullDuplex<u8>,
        Select: DeviceSelect,
        Signal: AckSignal,
        Clock: embedded_time::Clock + 'clock
{
    arbiter: Arbiter<'clock, Spi, Select, Signal, Clock>,
}

impl<'clock, Spi, Select, Signal, Clock> Adapter<'clock, Spi, Select, Signal, Clock>
    where
        Spi: FullDuplex<u8>,
        Select: DeviceSelect,
        Signal: AckSignal,
        Clock: embedded_time::Clock + 'clock,
        Clock::T: TryFrom<u32>,
{
    pub fn new(
        spi: Spi,
        select: Select,
        ack: Signal,
        clock: &'clock Clock,
        timing: Timing,
    ) -> Self {
        Self::from_arbiter(Arbiter::new(spi, select, ack, clock, timing))
    }

    pub fn from_arbiter(arbiter: Arbiter<'clock, Spi, Select, Signal, Clock>) -> Self {
        Self {
            arbiter,
        }
    }

    pub fn arbiter(&mut self) -> &mut Arbiter<'clock, Spi, Select, Signal, Clock> {
        &mut self.arbiter
    }

    pub fn into_arbiter(self) -> Arbiter<'clock, Spi, Select, Signal, Clock> {
        self.arbiter
    }

    pub fn exchange_packet(
        &mut self,
        address: DeviceAddress,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, AdapterError<Spi::Error>> {
        Ok(self.arbiter.exchange_packet(address, request, response)?)
    }

    pub fn send_packet_no_acknowledge(
        &mut self,
        address: DeviceAddress,
        request: &[u8],
    ) -> Result<(), AdapterError<Spi::Error>> {
        Ok(self.arbiter.send_packet_no_acknowledge(address, request)?)
    }

    /// Poll the controller on `port`.
    ///
    /// `None` when nothing answered, or the reply was not a controller
    /// reply. Polling is slow-ish; once per frame is the usual rate.
    pub fn poll_controller(&mut self, port: Port) -> Result<Option<ControllerState>, AdapterError<Spi::Error>> {
        let request: [u8; 4] = [
            Command::Poll.into(),
            0x00, // multitap address
            0x00, // rumble motor control 1
            0x00, // rumble motor control 2
        ];
        let mut response = [0u8; 32];

        self.arbiter.select_port(port);
        let len = self.arbiter.exchange_packet(DeviceAddress::Controller, &request, &mut response)?;

        match parser::controller_poll(&response[..len]) {
            Ok((_, state)) => Ok(Some(state)),
            Err(_) => {
                if len > 0 {
                    log::debug!("malformed poll reply on {:?}: {:?}", port, &response[..len]);
                }
                Ok(None)
            }
        }
    }

    /// Buttons held on `port`; empty when no controller is connected.
    pub fn poll_buttons(&mut self, port: Port) -> Result<Buttons, AdapterError<Spi::Error>> {
        Ok(self.poll_controller(port)?
            .map(|state| state.buttons)
            .unwrap_or_else(Buttons::empty))
    }

    /// Ping both ports for memory cards that accept a game ID.
    pub fn probe_memory_cards(&mut self) -> Result<CardPresence, AdapterError<Spi::Error>> {
        let request: [u8; 5] = [Command::GameIdPing.into(), 0, 0, 0, 0];
        let mut present = CardPresence::empty();

        for port in Port::ALL.iter() {
            let mut response = [0u8; 5];
            self.arbiter.select_port(*port);
            let len = self.arbiter.exchange_packet(DeviceAddress::MemoryCard, &request, &mut response)?;

            if parser::card_probe(&response[..len]).is_ok() {
                present |= port.presence();
            } else if len > 0 {
                log::debug!("card on {:?} ignored game ID ping: {:?}", port, &response[..len]);
            }
        }

        log::debug!("memory cards: {:?}", present);
        Ok(present)
    }

    /// Announce `id` to the memory cards on the ports in `cards`.
    pub fn send_game_id(&mut self, id: &str, cards: CardPresence) -> Result<(), AdapterError<Spi::Error>> {
        let request = game_id_request(id)?;

        for port in Port::ALL.iter() {
            if cards.contains(port.presence()) {
                self.arbiter.select_port(*port);
                self.arbiter.send_packet_no_acknowledge(DeviceAddress::MemoryCard, &request)?;
            }
        }
        Ok(())
    }
}
