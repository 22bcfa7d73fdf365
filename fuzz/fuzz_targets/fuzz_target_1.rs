#![no_main]

use libfuzzer_sys::fuzz_target;
use smb_protocol::SmbPacket;

fuzz_target!(|data: &[u8]| {
    // Received messages drive every layout accessor, none of them may panic
    if let Ok(mut pkt) = SmbPacket::from_bytes(data) {
        let _ = pkt.status();
        let _ = pkt.check_for_error();
        for idx in 0..=usize::from(pkt.parameter_count()) {
            let _ = pkt.parameter(idx);
        }
        let _ = pkt.bytes();
        let _ = pkt.message();
        pkt.reset_byte_pointer();
        while pkt.has_more_data() {
            if pkt.unpack_string(pkt.is_unicode()).is_err() {
                break;
            }
        }
        let _ = pkt.dump().to_string();
    }
});
