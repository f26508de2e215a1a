use core::convert::TryFrom;

use embedded_hal::digital::v2::OutputPin;
use embedded_time::duration::Microseconds;
use embedded_time::TimeError;

use crate::delay::Delay;
use crate::protocol::Port;
use crate::timing::Timing;

/// Device-select (DTR) wiring.
///
/// The bus itself is shared by both ports; only the port whose select line
/// is asserted listens to it.
pub trait DeviceSelect {
    /// Choose which port the next assertion applies to.
    fn route(&mut self, port: Port);

    fn assert(&mut self);

    fn release(&mut self);
}

/// One active-low select pin per port.
pub struct DualSelect<PortOne, PortTwo>
    where PortOne: OutputPin,
          PortTwo: OutputPin,
{
    one: PortOne,
    two: PortTwo,
    port: Port,
}

impl<PortOne, PortTwo> DualSelect<PortOne, PortTwo>
    where PortOne: OutputPin,
          PortTwo: OutputPin,
{
    /// Take both pins and set them high (unselected)
    pub fn new(mut one: PortOne, mut two: PortTwo) -> Self {
        one.set_high().ok();
        two.set_high().ok();
        Self {
            one,
            two,
            port: Port::One,
        }
    }

    pub fn release_pins(self) -> (PortOne, PortTwo) {
        (self.one, self.two)
    }
}

impl<PortOne, PortTwo> DeviceSelect for DualSelect<PortOne, PortTwo>
    where PortOne: OutputPin,
          PortTwo: OutputPin,
{
    fn route(&mut self, port: Port) {
        self.port = port;
    }

    fn assert(&mut self) {
        match self.port {
            Port::One => {
                self.two.set_high().ok();
                self.one.set_low().ok();
            }
            Port::Two => {
                self.one.set_high().ok();
                self.two.set_low().ok();
            }
        }
    }

    fn release(&mut self) {
        self.one.set_high().ok();
        self.two.set_high().ok();
    }
}

/// A single active-low DTR pin plus a routing pin choosing the port
/// (low = port 1, high = port 2).
pub struct MuxSelect<Dtr, Route>
    where Dtr: OutputPin,
          Route: OutputPin,
{
    dtr: Dtr,
    route: Route,
}

impl<Dtr, Route> MuxSelect<Dtr, Route>
    where Dtr: OutputPin,
          Route: OutputPin,
{
    pub fn new(mut dtr: Dtr, mut route: Route) -> Self {
        dtr.set_high().ok();
        route.set_low().ok();
        Self {
            dtr,
            route,
        }
    }

    pub fn release_pins(self) -> (Dtr, Route) {
        (self.dtr, self.route)
    }
}

impl<Dtr, Route> DeviceSelect for MuxSelect<Dtr, Route>
    where Dtr: OutputPin,
          Route: OutputPin,
{
    fn route(&mut self, port: Port) {
        match port {
            Port::One => self.route.set_low().ok(),
            Port::Two => self.route.set_high().ok(),
        };
    }

    fn assert(&mut self) {
        self.dtr.set_low().ok();
    }

    fn release(&mut self) {
        self.dtr.set_high().ok();
    }
}

pub(crate) struct PortSelector<'clock, Select, Clock>
    where Select: DeviceSelect,
          Clock: embedded_time::Clock,
{
    select: Select,
    port: Port,
    delay: Delay<'clock, Clock>,
    settle: Microseconds<u32>,
    hold: Microseconds<u32>,
    post: Microseconds<u32>,
}

impl<'clock, Select, Clock> PortSelector<'clock, Select, Clock>
    where Select: DeviceSelect,
          Clock: embedded_time::Clock,
          Clock::T: TryFrom<u32>,
{
    /// Construct a selector routed to port 1 with select released
    pub(crate) fn new(mut select: Select, delay: Delay<'clock, Clock>, timing: &Timing) -> Self {
        select.release();
        select.route(Port::One);
        Self {
            select,
            port: Port::One,
            delay,
            settle: timing.select_settle,
            hold: timing.select_hold,
            post: timing.select_post_delay,
        }
    }

    pub(crate) fn select_port(&mut self, port: Port) {
        log::debug!("route select to {:?}", port);
        self.select.route(port);
        self.port = port;
    }

    pub(crate) fn active_port(&self) -> Port {
        self.port
    }

    /// Assert select and wait for the device to settle. On a clock error
    /// select is released again before returning.
    pub(crate) fn select<'sel>(&'sel mut self) -> Result<Selected<'sel, 'clock, Select, Clock>, TimeError> {
        Selected::new(self)
    }

    pub(crate) fn release(self) -> Select {
        self.select
    }
}

/// Select asserted on the active port for as long as this lives.
pub(crate) struct Selected<'sel, 'clock, Select, Clock>
    where Select: DeviceSelect,
          Clock: embedded_time::Clock,
          Clock::T: TryFrom<u32>,
{
    selector: &'sel mut PortSelector<'clock, Select, Clock>,
}

impl<'sel, 'clock, Select, Clock> Selected<'sel, 'clock, Select, Clock>
    where Select: DeviceSelect,
          Clock: embedded_time::Clock,
          Clock::T: TryFrom<u32>,
{
    fn new(selector: &'sel mut PortSelector<'clock, Select, Clock>) -> Result<Self, TimeError> {
        log::trace!("select {:?}", selector.port);
        selector.select.assert();
        let selected = Self {
            selector,
        };
        selected.selector.delay.delay(selected.selector.settle)?;
        Ok(selected)
    }

    pub(crate) fn port(&self) -> Port {
        self.selector.port
    }
}

impl<Select, Clock> Drop for Selected<'_, '_, Select, Clock>
    where Select: DeviceSelect,
          Clock: embedded_time::Clock,
          Clock::T: TryFrom<u32>,
{
    fn drop(&mut self) {
        self.selector.delay.delay(self.selector.hold).ok();
        self.selector.select.release();
        log::trace!("de-select {:?}", self.selector.port);
        self.selector.delay.delay(self.selector.post).ok();
    }
}
