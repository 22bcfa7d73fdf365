//! Property-based tests using proptest
//!
//! These tests validate packet layout invariants across randomly generated
//! header contents, parameter counts and payloads.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::{Bytes, BytesMut};
use proptest::prelude::*;
use smb_protocol::core::codec::NetbiosCodec;
use smb_protocol::core::packer;
use smb_protocol::core::packet::{flags, flags2, SmbPacket, HEADER_LEN, WORD_COUNT};
use smb_protocol::core::status::SmbStatus;
use smb_protocol::error::ProtocolError;
use tokio_util::codec::{Decoder, Encoder};

// Property: the byte area always follows the parameter words and byte count
proptest! {
    #[test]
    fn prop_byte_offset_tracks_word_count(count in 0u8..=255) {
        let mut pkt = SmbPacket::new();
        pkt.set_parameter_count(count);

        let expected = WORD_COUNT + 2 * usize::from(count) + 3;
        prop_assert_eq!(pkt.byte_offset(), expected);
        prop_assert_eq!(pkt.byte_offset() - HEADER_LEN, 35 + 2 * usize::from(count));
    }
}

// Property: total length covers header, words, byte count and bytes
proptest! {
    #[test]
    fn prop_total_length(count in 0u8..=64, data in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut pkt = SmbPacket::new();
        pkt.set_parameter_count(count);
        pkt.set_bytes(&data).unwrap();

        prop_assert_eq!(pkt.total_length(), 35 + 2 * usize::from(count) + data.len());
        prop_assert_eq!(pkt.bytes().unwrap(), &data[..]);
        prop_assert_eq!(pkt.message().unwrap().len(), pkt.total_length());
    }
}

// Property: parameter access fails exactly when the index exceeds the count
proptest! {
    #[test]
    fn prop_parameter_index_boundary(count in 0u8..=32, idx in 0usize..64) {
        let mut pkt = SmbPacket::new();
        pkt.set_parameter_count(count);

        let result = pkt.parameter(idx);
        if idx > usize::from(count) {
            let is_index_error = matches!(result, Err(ProtocolError::ParameterIndex { .. }));
            prop_assert!(is_index_error);
        } else {
            prop_assert!(result.is_ok());
        }
    }
}

// Property: parameter words land little-endian at 33 + 2*idx after the marker
proptest! {
    #[test]
    fn prop_parameter_words_little_endian(words in prop::collection::vec(any::<u16>(), 1..32)) {
        let mut pkt = SmbPacket::new();
        pkt.set_parameter_count(words.len() as u8);
        for (idx, word) in words.iter().enumerate() {
            pkt.set_parameter(idx, *word).unwrap();
        }

        let raw = pkt.as_bytes();
        for (idx, word) in words.iter().enumerate() {
            let off = HEADER_LEN + 33 + 2 * idx;
            prop_assert_eq!(u16::from_le_bytes([raw[off], raw[off + 1]]), *word);
            prop_assert_eq!(pkt.parameter(idx).unwrap(), *word);
        }
    }
}

// Property: the status convention follows the long error code flag
proptest! {
    #[test]
    fn prop_status_convention(status in any::<u32>(), class in any::<u8>(), code in any::<u8>(), long in any::<bool>()) {
        let mut pkt = SmbPacket::new();
        pkt.set_flags(flags::RESPONSE);
        if long {
            pkt.set_flags2(flags2::LONG_ERROR_CODE);
            pkt.set_long_error_code(status);
            prop_assert_eq!(pkt.status(), SmbStatus::NtStatus(status));
        } else {
            pkt.set_error_class(class);
            pkt.set_error_code(code);
            prop_assert_eq!(pkt.status(), SmbStatus::Legacy { class, code });
        }
    }
}

// Property: packing then unpacking through the cursor yields the same values
proptest! {
    #[test]
    fn prop_cursor_pack_unpack(a in any::<u8>(), b in any::<u16>(), c in any::<u32>(), d in any::<u64>(), name in "[a-zA-Z0-9_]{0,40}", unicode in any::<bool>()) {
        let mut pkt = SmbPacket::new();
        pkt.reset_byte_pointer();
        pkt.pack_u8(a).unwrap();
        pkt.pack_string(&name, unicode).unwrap();
        pkt.pack_u16(b).unwrap();
        pkt.pack_u32(c).unwrap();
        pkt.pack_u64(d).unwrap();
        pkt.set_byte_count_from_position().unwrap();

        pkt.reset_byte_pointer();
        prop_assert_eq!(pkt.unpack_u8().unwrap(), a);
        prop_assert_eq!(pkt.unpack_string(unicode).unwrap(), name);
        prop_assert_eq!(pkt.unpack_u16().unwrap(), b);
        prop_assert_eq!(pkt.unpack_u32().unwrap(), c);
        prop_assert_eq!(pkt.unpack_u64().unwrap(), d);
        prop_assert!(!pkt.has_more_data());
    }
}

// Property: writes never truncate, they fail past the end of the buffer
proptest! {
    #[test]
    fn prop_packer_bounds(len in 0usize..16, offset in 0usize..24) {
        let mut buf = vec![0u8; len];
        let result = packer::put_u32_le(0xDEAD_BEEF, &mut buf, offset);
        if offset + 4 <= len {
            prop_assert_eq!(result.unwrap(), 4);
        } else {
            let is_overflow = matches!(result, Err(ProtocolError::BufferOverflow { .. }));
            prop_assert!(is_overflow);
            prop_assert!(buf.iter().all(|b| *b == 0));
        }
    }
}

// Property: NetBIOS frames decode regardless of how the stream is split
proptest! {
    #[test]
    fn prop_netbios_split_delivery(payload in prop::collection::vec(any::<u8>(), 0..2048), split in 0usize..2052) {
        let mut codec = NetbiosCodec::default();
        let mut wire = BytesMut::new();
        codec.encode(Bytes::from(payload.clone()), &mut wire).unwrap();

        let split = split.min(wire.len());
        let mut src = BytesMut::from(&wire[..split]);
        let first = codec.decode(&mut src).unwrap();
        if split < wire.len() {
            prop_assert!(first.is_none());
            src.extend_from_slice(&wire[split..]);
            let frame = codec.decode(&mut src).unwrap().unwrap();
            prop_assert_eq!(&frame[..], &payload[..]);
        } else {
            prop_assert_eq!(&first.unwrap()[..], &payload[..]);
        }
    }
}
