use nom::{
    IResult,
    bytes::complete::{tag, take},
    combinator::{all_consuming, map},
    number::complete::{le_u16, le_u8},
    sequence::tuple,
};

use crate::protocol::{Buttons, ControllerState, CARD_PROBE_MARKER, POLL_MARKER};

// [type] 5A [buttons lo] [buttons hi] ...
pub fn controller_poll(input: &[u8]) -> IResult<&[u8], ControllerState> {
    map(
        tuple((
            le_u8,
            tag(&[POLL_MARKER][..]),
            le_u16,
        )),
        |(device_type, _, raw)| ControllerState {
            device_type,
            // active low
            buttons: Buttons::from_bits_retain(raw ^ 0xFFFF),
        },
    )(input)
}

// [any] [any] 27 FF [any], nothing more
pub fn card_probe(input: &[u8]) -> IResult<&[u8], ()> {
    map(
        all_consuming(tuple((
            take(2usize),
            tag(&CARD_PROBE_MARKER[..]),
            take(1usize),
        ))),
        |_| (),
    )(input)
}
