//! Simulated bus for the unit tests.
//!
//! Every mock shares one [`Sim`]: the clock advances a microsecond per read,
//! every byte shifted out is offered to the device plugged into the
//! selected port, and the acknowledge latch is set the way a real pad or
//! card would pulse DSR.

use core::convert::Infallible;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::v2::OutputPin;
use embedded_hal::spi::FullDuplex;
use embedded_time::fraction::Fraction;
use embedded_time::Instant;

use crate::ack::AckSignal;
use crate::arbiter::Arbiter;
use crate::chip_select::DeviceSelect;
use crate::protocol::{DeviceAddress, Port};
use crate::timing::Timing;

pub type SimHandle = Rc<RefCell<Sim>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Route(Port),
    Assert(Port),
    Release,
    Sent(u8),
    AckPoll,
    AckClear,
}

enum Phase {
    Address,
    Data(usize),
    Ignoring,
}

/// A device that answers its address and then replies byte for byte,
/// pulsing acknowledge after every byte except the last.
pub struct SimDevice {
    address: u8,
    replies: Vec<u8>,
    echo: Option<usize>,
    phase: Phase,
    /// Microseconds between a byte and its acknowledge pulse.
    pub ack_latency: u64,
}

impl SimDevice {
    pub fn replying(address: DeviceAddress, replies: &[u8]) -> Self {
        Self {
            address: address.into(),
            replies: replies.to_vec(),
            echo: None,
            phase: Phase::Ignoring,
            ack_latency: 5,
        }
    }

    /// Reply with whatever was shifted in, for `len` bytes.
    pub fn echoing(address: DeviceAddress, len: usize) -> Self {
        Self {
            address: address.into(),
            replies: Vec::new(),
            echo: Some(len),
            phase: Phase::Ignoring,
            ack_latency: 5,
        }
    }

    fn len(&self) -> usize {
        self.echo.unwrap_or_else(|| self.replies.len())
    }

    fn select(&mut self) {
        self.phase = Phase::Address;
    }

    fn deselect(&mut self) {
        self.phase = Phase::Ignoring;
    }

    /// Byte shifted in for `byte`, and whether acknowledge follows.
    fn shift(&mut self, byte: u8) -> (u8, bool) {
        match self.phase {
            Phase::Address => {
                if byte == self.address && self.len() > 0 {
                    self.phase = Phase::Data(0);
                    (0xFF, true)
                } else {
                    self.phase = Phase::Ignoring;
                    (0xFF, false)
                }
            }
            Phase::Data(pos) => {
                let reply = match self.echo {
                    Some(_) => byte,
                    None => self.replies.get(pos).copied().unwrap_or(0xFF),
                };
                let more = pos + 1 < self.len();
                self.phase = if more { Phase::Data(pos + 1) } else { Phase::Ignoring };
                (reply, more)
            }
            Phase::Ignoring => (0xFF, false),
        }
    }
}

pub struct Sim {
    pub now: u64,
    pub routed: Port,
    pub asserted: Option<Port>,
    pub devices: [Option<SimDevice>; 2],
    /// Time from which the acknowledge latch reads as set.
    pub ack_at: Option<u64>,
    pub rx: VecDeque<u8>,
    pub events: Vec<(u64, Event)>,
    pub tx_stalled: bool,
    pub rx_stalled: bool,
    /// Make the first clock read after select is asserted fail.
    pub clock_fails_after_assert: bool,
    clock_fails_at: Option<u64>,
}

impl Sim {
    pub fn new() -> SimHandle {
        Rc::new(RefCell::new(Sim {
            now: 0,
            routed: Port::One,
            asserted: None,
            devices: [None, None],
            ack_at: None,
            rx: VecDeque::new(),
            events: Vec::new(),
            tx_stalled: false,
            rx_stalled: false,
            clock_fails_after_assert: false,
            clock_fails_at: None,
        }))
    }

    pub fn attach(&mut self, port: Port, device: SimDevice) {
        self.devices[port.index()] = Some(device);
    }

    fn record(&mut self, event: Event) {
        self.events.push((self.now, event));
    }

    pub fn sent(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|(_, e)| match e {
                Event::Sent(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    pub fn sent_times(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter(|(_, e)| matches!(e, Event::Sent(_)))
            .map(|(t, _)| *t)
            .collect()
    }

    pub fn ack_polls(&self) -> usize {
        self.events.iter().filter(|(_, e)| *e == Event::AckPoll).count()
    }

    pub fn position_of(&self, event: &Event) -> Option<usize> {
        self.events.iter().position(|(_, e)| e == event)
    }

    pub fn first_time_of(&self, event: &Event) -> Option<u64> {
        self.events.iter().find(|(_, e)| e == event).map(|(t, _)| *t)
    }

    pub fn last_time_of(&self, event: &Event) -> Option<u64> {
        self.events.iter().rev().find(|(_, e)| e == event).map(|(t, _)| *t)
    }

    fn shift_out(&mut self, byte: u8) {
        self.record(Event::Sent(byte));
        let now = self.now;
        let (reply, ack) = match self.asserted {
            Some(port) => match self.devices[port.index()].as_mut() {
                Some(device) => {
                    let (reply, ack) = device.shift(byte);
                    (reply, if ack { Some(now + device.ack_latency) } else { None })
                }
                None => (0xFF, None),
            },
            None => (0xFF, None),
        };
        if !self.rx_stalled {
            self.rx.push_back(reply);
        }
        if ack.is_some() {
            self.ack_at = ack;
        }
    }
}

pub struct MockClock(SimHandle);

impl MockClock {
    pub fn new(sim: &SimHandle) -> Self {
        MockClock(sim.clone())
    }
}

impl embedded_time::Clock for MockClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
        let mut sim = self.0.borrow_mut();
        sim.now += 1;
        if let Some(at) = sim.clock_fails_at {
            if sim.now >= at {
                sim.clock_fails_at = None;
                return Err(embedded_time::clock::Error::Unspecified);
            }
        }
        Ok(Instant::new(sim.now))
    }
}

pub struct MockSpi(SimHandle);

impl MockSpi {
    pub fn new(sim: &SimHandle) -> Self {
        MockSpi(sim.clone())
    }
}

impl FullDuplex<u8> for MockSpi {
    type Error = Infallible;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let mut sim = self.0.borrow_mut();
        sim.now += 1;
        sim.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn send(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        let mut sim = self.0.borrow_mut();
        sim.now += 1;
        if sim.tx_stalled {
            return Err(nb::Error::WouldBlock);
        }
        sim.shift_out(word);
        Ok(())
    }
}

pub struct MockAck(SimHandle);

impl MockAck {
    pub fn new(sim: &SimHandle) -> Self {
        MockAck(sim.clone())
    }
}

impl AckSignal for MockAck {
    fn is_pending(&self) -> bool {
        let mut sim = self.0.borrow_mut();
        sim.record(Event::AckPoll);
        match sim.ack_at {
            Some(at) => sim.now >= at,
            None => false,
        }
    }

    fn clear(&mut self) {
        let mut sim = self.0.borrow_mut();
        sim.record(Event::AckClear);
        // a pulse still in flight lands after the clear
        let now = sim.now;
        if let Some(at) = sim.ack_at {
            if at <= now {
                sim.ack_at = None;
            }
        }
    }
}

pub struct MockSelect(SimHandle);

impl MockSelect {
    pub fn new(sim: &SimHandle) -> Self {
        MockSelect(sim.clone())
    }
}

impl DeviceSelect for MockSelect {
    fn route(&mut self, port: Port) {
        let mut sim = self.0.borrow_mut();
        sim.record(Event::Route(port));
        sim.routed = port;
    }

    fn assert(&mut self) {
        let mut sim = self.0.borrow_mut();
        let port = sim.routed;
        sim.record(Event::Assert(port));
        sim.asserted = Some(port);
        if sim.clock_fails_after_assert {
            sim.clock_fails_after_assert = false;
            sim.clock_fails_at = Some(sim.now + 1);
        }
        if let Some(device) = sim.devices[port.index()].as_mut() {
            device.select();
        }
    }

    fn release(&mut self) {
        let mut sim = self.0.borrow_mut();
        sim.record(Event::Release);
        if let Some(port) = sim.asserted.take() {
            if let Some(device) = sim.devices[port.index()].as_mut() {
                device.deselect();
            }
        }
    }
}

/// Output pin remembering its level; starts low.
pub struct MockPin(Rc<Cell<bool>>);

impl MockPin {
    pub fn new() -> (Self, Rc<Cell<bool>>) {
        let level = Rc::new(Cell::new(false));
        (MockPin(level.clone()), level)
    }
}

impl OutputPin for MockPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

pub fn arbiter<'clock>(
    sim: &SimHandle,
    clock: &'clock MockClock,
) -> Arbiter<'clock, MockSpi, MockSelect, MockAck, MockClock> {
    Arbiter::new(
        MockSpi::new(sim),
        MockSelect::new(sim),
        MockAck::new(sim),
        clock,
        Timing::default(),
    )
}
