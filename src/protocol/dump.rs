//! Human-readable packet dumps for debug logging.

use std::fmt::{self, Write as _};

use crate::core::command::command_name;
use crate::core::packet::{flags, flags2, SmbPacket, HEADER_LEN};
use crate::core::status::{error_text, nt_status_name};

const FLAG_NAMES: [(u8, &str); 6] = [
    (flags::SUB_DIALECT, "SubDialect"),
    (flags::CASELESS, "Caseless"),
    (flags::CANONICAL, "Canonical"),
    (flags::OPLOCK, "Oplock"),
    (flags::NOTIFY, "Notify"),
    (flags::RESPONSE, "Response"),
];

const FLAG2_NAMES: [(u16, &str); 7] = [
    (flags2::LONG_FILENAMES, "LongFilenames"),
    (flags2::EXTENDED_ATTRIBUTES, "ExtAttributes"),
    (flags2::SECURITY_SIGNATURE, "SecuritySignatures"),
    (flags2::EXTENDED_SECURITY, "ExtendedSetup"),
    (flags2::READ_IF_EXECUTE, "ReadIfEXE"),
    (flags2::LONG_ERROR_CODE, "LongErrorCode"),
    (flags2::UNICODE, "Unicode"),
];

/// Parameter words printed per line
const PARAM_COLUMNS: usize = 4;
const PARAM_COLUMN_WIDTH: usize = 20;

fn join_flags<T>(value: T, names: &[(T, &'static str)]) -> String
where
    T: Copy + PartialEq + Default + std::ops::BitAnd<Output = T>,
{
    let set: Vec<&str> = names
        .iter()
        .filter(|(bit, _)| value & *bit != T::default())
        .map(|(_, name)| *name)
        .collect();

    if set.is_empty() {
        "<None>".to_string()
    } else {
        set.join(",")
    }
}

/// Names of the header flags that are set
pub fn flags_string(value: u8) -> String {
    join_flags(value, &FLAG_NAMES)
}

/// Names of the header flags2 bits that are set
pub fn flags2_string(value: u16) -> String {
    join_flags(value, &FLAG2_NAMES)
}

/// Display adapter rendering a decoded view of a packet.
pub struct PacketDump<'a> {
    packet: &'a SmbPacket,
}

impl SmbPacket {
    /// Decoded view for logging, e.g. `trace!("{}", packet.dump())`
    pub fn dump(&self) -> PacketDump<'_> {
        PacketDump { packet: self }
    }
}

impl fmt::Display for PacketDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pkt = self.packet;
        let count = usize::from(pkt.parameter_count());

        write!(f, "SMB {}", command_name(pkt.command()))?;
        if pkt.is_response() {
            f.write_str(" [Response]")?;
        }
        writeln!(f)?;
        writeln!(f, "Packet Length: {}", pkt.total_length())?;
        writeln!(
            f,
            "Byte Offset: {}, Byte Count: {}",
            pkt.byte_offset() - HEADER_LEN,
            pkt.byte_count()
        )?;
        writeln!(f, "Flags: {}", flags_string(pkt.flags()))?;
        writeln!(f, "Flags2: {}", flags2_string(pkt.flags2()))?;
        if pkt.has_security_signature() {
            writeln!(f, "Signature: {:016x}", pkt.signature())?;
        }
        writeln!(
            f,
            "TID={}, PID={}, UID={}, MID={}",
            pkt.tree_id(),
            pkt.process_id(),
            pkt.user_id(),
            pkt.multiplex_id()
        )?;
        write!(f, "Parameter Words: {count}")?;

        let mut line = String::with_capacity(PARAM_COLUMNS * PARAM_COLUMN_WIDTH);
        for row in (0..count).step_by(PARAM_COLUMNS) {
            line.clear();
            for idx in row..(row + PARAM_COLUMNS).min(count) {
                let val = pkt.parameter(idx).unwrap_or_default();
                let cell = format!("P{:<2}={}/0x{:x}", idx + 1, val, val);
                let _ = write!(line, "{cell:<width$}", width = PARAM_COLUMN_WIDTH);
            }
            write!(f, "\n{}", line.trim_end())?;
        }

        if pkt.is_response() {
            writeln!(f)?;
            if pkt.is_long_error_code() {
                let code = pkt.long_error_code();
                match nt_status_name(code) {
                    Some(name) => write!(f, "Long error: 0x{code:08X} ({name})")?,
                    None => write!(f, "Long error: 0x{code:08X}")?,
                }
            } else {
                write!(
                    f,
                    "Error text: {}",
                    error_text(pkt.error_class(), pkt.error_code())
                )?;
            }
        }
        Ok(())
    }
}

/// Hex and ASCII listing of the SMB message, 16 bytes per line
pub fn hex_dump(packet: &SmbPacket) -> String {
    let end = (HEADER_LEN + packet.total_length()).min(packet.capacity());
    let data = &packet.as_bytes()[HEADER_LEN..end];

    let mut out = String::with_capacity(data.len() * 4);
    for (row, chunk) in data.chunks(16).enumerate() {
        let _ = write!(out, "{:04x}: ", row * 16);
        for byte in chunk {
            let _ = write!(out, "{byte:02x} ");
        }
        for _ in chunk.len()..16 {
            out.push_str("   ");
        }
        for &byte in chunk {
            out.push(if byte.is_ascii_graphic() || byte == b' ' {
                char::from(byte)
            } else {
                '.'
            });
        }
        out.push('\n');
    }
    out
}
