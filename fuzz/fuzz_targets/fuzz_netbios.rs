#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use smb_protocol::core::codec::NetbiosCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = NetbiosCodec::default();
    let mut src = BytesMut::from(data);
    while let Ok(Some(_frame)) = codec.decode(&mut src) {}
});
