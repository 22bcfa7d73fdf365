//! # SMB Status Model
//!
//! SMB1 servers report errors in one of two mutually exclusive ways, selected by
//! the long-error-code bit in the flags2 header field:
//!
//! - **Legacy**: an 8-bit error class and 8-bit error code
//!   (`ERRDOS`/`ERRSRV`/`ERRHRD`/`ERRCMD`)
//! - **NT status**: a 32-bit status value occupying the same header bytes
//!
//! [`SmbStatus`] holds exactly one of the two interpretations; the packet decides
//! which one at decode time. Text tables here are for diagnostics only.

use std::fmt;

// Error classes
pub const SUCCESS: u8 = 0x00;
pub const ERR_DOS: u8 = 0x01;
pub const ERR_SRV: u8 = 0x02;
pub const ERR_HRD: u8 = 0x03;
pub const ERR_CMD: u8 = 0xFF;

/// Legacy success error code
pub const LEGACY_SUCCESS: u8 = 0x00;

/// NT status success value
pub const NT_SUCCESS: u32 = 0x0000_0000;

// ERRDOS codes
pub const DOS_BAD_FUNCTION: u8 = 1;
pub const DOS_FILE_NOT_FOUND: u8 = 2;
pub const DOS_PATH_NOT_FOUND: u8 = 3;
pub const DOS_TOO_MANY_OPEN_FILES: u8 = 4;
pub const DOS_ACCESS_DENIED: u8 = 5;
pub const DOS_INVALID_HANDLE: u8 = 6;
pub const DOS_NOT_ENOUGH_MEMORY: u8 = 8;
pub const DOS_INVALID_DRIVE: u8 = 15;
pub const DOS_NO_MORE_FILES: u8 = 18;
pub const DOS_BAD_SHARE: u8 = 32;
pub const DOS_LOCK_CONFLICT: u8 = 33;
pub const DOS_FILE_EXISTS: u8 = 80;
pub const DOS_NOT_SUPPORTED: u8 = 50;

// ERRSRV codes
pub const SRV_NON_SPECIFIC: u8 = 1;
pub const SRV_BAD_PASSWORD: u8 = 2;
pub const SRV_ACCESS_DENIED: u8 = 4;
pub const SRV_INVALID_TID: u8 = 5;
pub const SRV_INVALID_NETWORK_NAME: u8 = 6;
pub const SRV_INVALID_DEVICE: u8 = 7;
pub const SRV_QUEUE_FULL: u8 = 49;
pub const SRV_BAD_UID: u8 = 91;
pub const SRV_NOT_SUPPORTED: u8 = 250;

// ERRHRD codes
pub const HRD_WRITE_PROTECTED: u8 = 19;
pub const HRD_NOT_READY: u8 = 21;
pub const HRD_DATA_ERROR: u8 = 23;
pub const HRD_WRITE_FAULT: u8 = 29;
pub const HRD_READ_FAULT: u8 = 30;
pub const HRD_DISK_FULL: u8 = 39;

// Common NT status values
pub const NT_BUFFER_OVERFLOW: u32 = 0x8000_0005;
pub const NT_NO_MORE_FILES: u32 = 0x8000_0006;
pub const NT_UNSUCCESSFUL: u32 = 0xC000_0001;
pub const NT_NOT_IMPLEMENTED: u32 = 0xC000_0002;
pub const NT_INVALID_HANDLE: u32 = 0xC000_0008;
pub const NT_INVALID_PARAMETER: u32 = 0xC000_000D;
pub const NT_NO_SUCH_FILE: u32 = 0xC000_000F;
pub const NT_MORE_PROCESSING_REQUIRED: u32 = 0xC000_0016;
pub const NT_ACCESS_DENIED: u32 = 0xC000_0022;
pub const NT_OBJECT_NAME_INVALID: u32 = 0xC000_0033;
pub const NT_OBJECT_NAME_NOT_FOUND: u32 = 0xC000_0034;
pub const NT_OBJECT_NAME_COLLISION: u32 = 0xC000_0035;
pub const NT_OBJECT_PATH_NOT_FOUND: u32 = 0xC000_003A;
pub const NT_SHARING_VIOLATION: u32 = 0xC000_0043;
pub const NT_LOCK_CONFLICT: u32 = 0xC000_0054;
pub const NT_LOGON_FAILURE: u32 = 0xC000_006D;
pub const NT_DISK_FULL: u32 = 0xC000_007F;
pub const NT_BAD_NETWORK_NAME: u32 = 0xC000_00CC;
pub const NT_NOT_SUPPORTED: u32 = 0xC000_00BB;
pub const NT_FILE_IS_A_DIRECTORY: u32 = 0xC000_00BA;
pub const NT_NOT_A_DIRECTORY: u32 = 0xC000_0103;
pub const NT_CANCELLED: u32 = 0xC000_0120;
pub const NT_USER_SESSION_DELETED: u32 = 0xC000_0203;

/// Decoded SMB error/status field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmbStatus {
    /// 8-bit error class and code
    Legacy { class: u8, code: u8 },
    /// 32-bit NT status value
    NtStatus(u32),
}

impl SmbStatus {
    /// Success in the packet's own convention
    pub fn is_success(self) -> bool {
        match self {
            SmbStatus::Legacy { code, .. } => code == LEGACY_SUCCESS,
            SmbStatus::NtStatus(code) => code == NT_SUCCESS,
        }
    }

    /// True when the status means the named object does not exist
    pub fn is_not_found(self) -> bool {
        matches!(
            self,
            SmbStatus::Legacy {
                class: ERR_DOS,
                code: DOS_FILE_NOT_FOUND | DOS_PATH_NOT_FOUND
            } | SmbStatus::NtStatus(
                NT_NO_SUCH_FILE | NT_OBJECT_NAME_NOT_FOUND | NT_OBJECT_PATH_NOT_FOUND
            )
        )
    }

    /// True when the status means access was refused
    pub fn is_access_denied(self) -> bool {
        matches!(
            self,
            SmbStatus::Legacy {
                class: ERR_DOS,
                code: DOS_ACCESS_DENIED
            } | SmbStatus::Legacy {
                class: ERR_SRV,
                code: SRV_ACCESS_DENIED
            } | SmbStatus::NtStatus(NT_ACCESS_DENIED)
        )
    }
}

impl fmt::Display for SmbStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SmbStatus::Legacy { class, code } => f.write_str(&error_text(class, code)),
            SmbStatus::NtStatus(code) => match nt_status_name(code) {
                Some(name) => write!(f, "{name} (0x{code:08X})"),
                None => write!(f, "0x{code:08X}"),
            },
        }
    }
}

fn class_name(class: u8) -> Option<&'static str> {
    match class {
        SUCCESS => Some("Success"),
        ERR_DOS => Some("DOS"),
        ERR_SRV => Some("Server"),
        ERR_HRD => Some("Hardware"),
        ERR_CMD => Some("Command"),
        _ => None,
    }
}

fn dos_text(code: u8) -> Option<&'static str> {
    Some(match code {
        DOS_BAD_FUNCTION => "Bad function",
        DOS_FILE_NOT_FOUND => "File not found",
        DOS_PATH_NOT_FOUND => "Path not found",
        DOS_TOO_MANY_OPEN_FILES => "Too many open files",
        DOS_ACCESS_DENIED => "Access denied",
        DOS_INVALID_HANDLE => "Invalid handle",
        DOS_NOT_ENOUGH_MEMORY => "Not enough memory",
        DOS_INVALID_DRIVE => "Invalid drive",
        DOS_NO_MORE_FILES => "No more files",
        DOS_BAD_SHARE => "Sharing violation",
        DOS_LOCK_CONFLICT => "Lock conflict",
        DOS_NOT_SUPPORTED => "Not supported",
        DOS_FILE_EXISTS => "File exists",
        _ => return None,
    })
}

fn srv_text(code: u8) -> Option<&'static str> {
    Some(match code {
        SRV_NON_SPECIFIC => "Non-specific error",
        SRV_BAD_PASSWORD => "Bad password",
        SRV_ACCESS_DENIED => "Access denied",
        SRV_INVALID_TID => "Invalid tree id",
        SRV_INVALID_NETWORK_NAME => "Invalid network name",
        SRV_INVALID_DEVICE => "Invalid device",
        SRV_QUEUE_FULL => "Print queue full",
        SRV_BAD_UID => "Invalid user id",
        SRV_NOT_SUPPORTED => "Not supported",
        _ => return None,
    })
}

fn hrd_text(code: u8) -> Option<&'static str> {
    Some(match code {
        HRD_WRITE_PROTECTED => "Write protected",
        HRD_NOT_READY => "Drive not ready",
        HRD_DATA_ERROR => "Data error",
        HRD_WRITE_FAULT => "Write fault",
        HRD_READ_FAULT => "Read fault",
        HRD_DISK_FULL => "Disk full",
        _ => return None,
    })
}

/// Render a legacy class/code pair as text
pub fn error_text(class: u8, code: u8) -> String {
    let text = match class {
        SUCCESS if code == LEGACY_SUCCESS => return "Success".to_string(),
        ERR_DOS => dos_text(code),
        ERR_SRV => srv_text(code),
        ERR_HRD => hrd_text(code),
        _ => None,
    };

    match (class_name(class), text) {
        (Some(cls), Some(text)) => format!("{cls}: {text}"),
        (Some(cls), None) => format!("{cls}: unknown error {code}"),
        (None, _) => format!("Unknown error class 0x{class:02X}, code {code}"),
    }
}

/// Symbolic name for well-known NT status values
pub fn nt_status_name(code: u32) -> Option<&'static str> {
    Some(match code {
        NT_SUCCESS => "STATUS_SUCCESS",
        NT_BUFFER_OVERFLOW => "STATUS_BUFFER_OVERFLOW",
        NT_NO_MORE_FILES => "STATUS_NO_MORE_FILES",
        NT_UNSUCCESSFUL => "STATUS_UNSUCCESSFUL",
        NT_NOT_IMPLEMENTED => "STATUS_NOT_IMPLEMENTED",
        NT_INVALID_HANDLE => "STATUS_INVALID_HANDLE",
        NT_INVALID_PARAMETER => "STATUS_INVALID_PARAMETER",
        NT_NO_SUCH_FILE => "STATUS_NO_SUCH_FILE",
        NT_MORE_PROCESSING_REQUIRED => "STATUS_MORE_PROCESSING_REQUIRED",
        NT_ACCESS_DENIED => "STATUS_ACCESS_DENIED",
        NT_OBJECT_NAME_INVALID => "STATUS_OBJECT_NAME_INVALID",
        NT_OBJECT_NAME_NOT_FOUND => "STATUS_OBJECT_NAME_NOT_FOUND",
        NT_OBJECT_NAME_COLLISION => "STATUS_OBJECT_NAME_COLLISION",
        NT_OBJECT_PATH_NOT_FOUND => "STATUS_OBJECT_PATH_NOT_FOUND",
        NT_SHARING_VIOLATION => "STATUS_SHARING_VIOLATION",
        NT_LOCK_CONFLICT => "STATUS_FILE_LOCK_CONFLICT",
        NT_LOGON_FAILURE => "STATUS_LOGON_FAILURE",
        NT_DISK_FULL => "STATUS_DISK_FULL",
        NT_BAD_NETWORK_NAME => "STATUS_BAD_NETWORK_NAME",
        NT_NOT_SUPPORTED => "STATUS_NOT_SUPPORTED",
        NT_FILE_IS_A_DIRECTORY => "STATUS_FILE_IS_A_DIRECTORY",
        NT_NOT_A_DIRECTORY => "STATUS_NOT_A_DIRECTORY",
        NT_CANCELLED => "STATUS_CANCELLED",
        NT_USER_SESSION_DELETED => "STATUS_USER_SESSION_DELETED",
        _ => return None,
    })
}
