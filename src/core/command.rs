//! SMB1 command codes.
//!
//! Only the codes are modelled here; request/response bodies are built by
//! callers through the packet cursor API.

pub const CREATE_DIRECTORY: u8 = 0x00;
pub const DELETE_DIRECTORY: u8 = 0x01;
pub const OPEN_FILE: u8 = 0x02;
pub const CREATE_FILE: u8 = 0x03;
pub const CLOSE_FILE: u8 = 0x04;
pub const FLUSH_FILE: u8 = 0x05;
pub const DELETE_FILE: u8 = 0x06;
pub const RENAME_FILE: u8 = 0x07;
pub const GET_FILE_ATTRIBUTES: u8 = 0x08;
pub const SET_FILE_ATTRIBUTES: u8 = 0x09;
pub const READ_FILE: u8 = 0x0A;
pub const WRITE_FILE: u8 = 0x0B;
pub const LOCK_FILE: u8 = 0x0C;
pub const UNLOCK_FILE: u8 = 0x0D;
pub const CHECK_DIRECTORY: u8 = 0x10;
pub const PROCESS_EXIT: u8 = 0x11;
pub const SEEK_FILE: u8 = 0x12;
pub const LOCKING_ANDX: u8 = 0x24;
pub const TRANSACTION: u8 = 0x25;
pub const TRANSACTION_SECOND: u8 = 0x26;
pub const IOCTL: u8 = 0x27;
pub const ECHO: u8 = 0x2B;
pub const OPEN_ANDX: u8 = 0x2D;
pub const READ_ANDX: u8 = 0x2E;
pub const WRITE_ANDX: u8 = 0x2F;
pub const TRANSACTION2: u8 = 0x32;
pub const TRANSACTION2_SECOND: u8 = 0x33;
pub const FIND_CLOSE2: u8 = 0x34;
pub const TREE_CONNECT: u8 = 0x70;
pub const TREE_DISCONNECT: u8 = 0x71;
pub const NEGOTIATE: u8 = 0x72;
pub const SESSION_SETUP_ANDX: u8 = 0x73;
pub const LOGOFF_ANDX: u8 = 0x74;
pub const TREE_CONNECT_ANDX: u8 = 0x75;
pub const DISK_INFORMATION: u8 = 0x80;
pub const SEARCH: u8 = 0x81;
pub const NT_TRANSACT: u8 = 0xA0;
pub const NT_TRANSACT_SECOND: u8 = 0xA1;
pub const NT_CREATE_ANDX: u8 = 0xA2;
pub const NT_CANCEL: u8 = 0xA4;
pub const OPEN_PRINT_FILE: u8 = 0xC0;
pub const WRITE_PRINT_FILE: u8 = 0xC1;
pub const CLOSE_PRINT_FILE: u8 = 0xC2;

/// AndX command value meaning "no further command in this packet"
pub const NO_CHAINED_COMMAND: u8 = 0xFF;

/// Human-readable command name for diagnostics
pub fn command_name(cmd: u8) -> &'static str {
    match cmd {
        CREATE_DIRECTORY => "CreateDirectory",
        DELETE_DIRECTORY => "DeleteDirectory",
        OPEN_FILE => "OpenFile",
        CREATE_FILE => "CreateFile",
        CLOSE_FILE => "CloseFile",
        FLUSH_FILE => "FlushFile",
        DELETE_FILE => "DeleteFile",
        RENAME_FILE => "RenameFile",
        GET_FILE_ATTRIBUTES => "GetFileAttributes",
        SET_FILE_ATTRIBUTES => "SetFileAttributes",
        READ_FILE => "ReadFile",
        WRITE_FILE => "WriteFile",
        LOCK_FILE => "LockFile",
        UNLOCK_FILE => "UnlockFile",
        CHECK_DIRECTORY => "CheckDirectory",
        PROCESS_EXIT => "ProcessExit",
        SEEK_FILE => "SeekFile",
        LOCKING_ANDX => "LockingAndX",
        TRANSACTION => "Transaction",
        TRANSACTION_SECOND => "TransactionSecond",
        IOCTL => "IOCtl",
        ECHO => "Echo",
        OPEN_ANDX => "OpenAndX",
        READ_ANDX => "ReadAndX",
        WRITE_ANDX => "WriteAndX",
        TRANSACTION2 => "Transaction2",
        TRANSACTION2_SECOND => "Transaction2Second",
        FIND_CLOSE2 => "FindClose2",
        TREE_CONNECT => "TreeConnect",
        TREE_DISCONNECT => "TreeDisconnect",
        NEGOTIATE => "Negotiate",
        SESSION_SETUP_ANDX => "SessionSetupAndX",
        LOGOFF_ANDX => "LogoffAndX",
        TREE_CONNECT_ANDX => "TreeConnectAndX",
        DISK_INFORMATION => "DiskInformation",
        SEARCH => "Search",
        NT_TRANSACT => "NTTransact",
        NT_TRANSACT_SECOND => "NTTransactSecond",
        NT_CREATE_ANDX => "NTCreateAndX",
        NT_CANCEL => "NTCancel",
        OPEN_PRINT_FILE => "OpenPrintFile",
        WRITE_PRINT_FILE => "WritePrintFile",
        CLOSE_PRINT_FILE => "ClosePrintFile",
        _ => "Unknown",
    }
}
