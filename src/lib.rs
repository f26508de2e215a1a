//! Bus master for PlayStation controllers and memory cards.
//!
//! Both ports share one full-duplex serial bus. A packet goes to the port
//! whose device-select line is asserted, and to the device class named by
//! its first byte. The device paces the transfer by pulsing the acknowledge
//! line after every byte it has more to say about.
#![no_std]

#[cfg(test)]
extern crate std;

mod ack;
pub mod adapter;
pub mod arbiter;
pub mod chip_select;
mod delay;
mod link;
pub mod parser;
pub mod protocol;
pub mod timing;

#[cfg(test)]
mod mock;

pub use ack::AckSignal;
pub use adapter::{Adapter, AdapterError};
pub use arbiter::{Arbiter, BusError};
pub use chip_select::{DeviceSelect, DualSelect, MuxSelect};
pub use protocol::{Buttons, CardPresence, Command, ControllerState, DeviceAddress, Port};
pub use timing::Timing;
