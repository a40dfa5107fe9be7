use dmxnet_core::protocol::{decode_dmx, encode_dmx};
use dmxnet_core::{ChannelFrame, UniverseAddress, ValidationError};
use proptest::prelude::*;

proptest! {
    #[test]
    fn key_round_trips(net in 0u8..=127, subnet in 0u8..=15, universe in 0u8..=15) {
        let addr = UniverseAddress::new(net, subnet, universe).unwrap();
        prop_assert_eq!(UniverseAddress::from_key(addr.key()), Ok(addr));
    }

    #[test]
    fn out_of_range_net_rejected(net in 128u8..=255) {
        prop_assert_eq!(UniverseAddress::new(net, 0, 0), Err(ValidationError::Net(net)));
    }

    #[test]
    fn dmx_key_survives_the_wire(net in 0u8..=127, subuni in any::<u8>(), value in any::<u8>()) {
        let addr = UniverseAddress::with_subuni(net, subuni).unwrap();
        let mut frame = ChannelFrame::new();
        frame.set(0, value).unwrap();

        let packet = encode_dmx(1, addr.key(), &frame);
        let decoded = decode_dmx(&packet).unwrap();
        prop_assert_eq!(decoded.key, addr.key());
        prop_assert_eq!(decoded.channels[0], value);
    }
}

#[test]
fn test_distinct_addresses_have_distinct_keys() {
    let a = UniverseAddress::new(1, 0, 0).unwrap();
    let b = UniverseAddress::new(0, 0, 1).unwrap();
    assert_ne!(a.key(), b.key());
    assert_eq!(a.key(), 0x0001);
    assert_eq!(b.key(), 0x0100);
}
