//! Status codes reported by the radio link and the failure context around them

use std::fmt;
use thiserror::Error;

/// Named status codes the link is known to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Ok,
    Fail,
    InvalidState,
    NotReady,
    Busy,
    InProgress,
    Abort,
    Timeout,
    Permission,
    WouldBlock,
    Idle,
    IsWaiting,
    NoneWaiting,
    Suspended,
    NotAvailable,
    NotSupported,
    Initialization,
    NotInitialized,
    AlreadyInitialized,
    Deleted,
    AllocationFailed,
    NoMoreResource,
    Empty,
    Full,
    WouldOverflow,
    HasOverflowed,
    InvalidParameter,
    NullPointer,
    InvalidConfiguration,
    InvalidMode,
    InvalidHandle,
    InvalidType,
    InvalidIndex,
    InvalidRange,
    InvalidCount,
    NotFound,
    AlreadyExists,
    Io,
    IoTimeout,
    Transmit,
    Receive,
    MessageTooLong,
    CommandIsInvalid,
    CommandTooLong,
    CommandIncomplete,
    BtOutOfBonds,
    BtUnspecified,
    BtHardware,
    BtNoBonding,
    BtCrypto,
    BtDataCorrupted,
    BtInvalidSyncHandle,
    BtInvalidModuleAction,
    BtRadio,
    BtPsStoreFull,
    BtPsKeyNotFound,
    BtCtrlUnknownConnectionIdentifier,
    BtCtrlMemoryCapacityExceeded,
    BtCtrlConnectionTimeout,
    BtCtrlConnectionLimitExceeded,
    BtCtrlCommandDisallowed,
    BtCtrlInvalidCommandParameters,
    BtCtrlUnspecifiedError,
    BtCtrlLlResponseTimeout,
}

/// (code, kind, description) for every status the translator resolves
pub static STATUS_TABLE: &[(u16, StatusKind, &str)] = &[
    (0x0000, StatusKind::Ok, "No error."),
    (0x0001, StatusKind::Fail, "Generic error."),
    (0x0002, StatusKind::InvalidState, "Generic invalid state error."),
    (0x0003, StatusKind::NotReady, "Module is not ready for requested operation."),
    (0x0004, StatusKind::Busy, "Module is busy and cannot carry out requested operation."),
    (0x0005, StatusKind::InProgress, "Operation is in progress and not yet complete (pass or fail)."),
    (0x0006, StatusKind::Abort, "Operation aborted."),
    (0x0007, StatusKind::Timeout, "Operation timed out."),
    (0x0008, StatusKind::Permission, "Operation not allowed per permissions."),
    (0x0009, StatusKind::WouldBlock, "Non-blocking operation would block."),
    (0x000A, StatusKind::Idle, "Operation/module is Idle, cannot carry requested operation."),
    (0x000B, StatusKind::IsWaiting, "Operation cannot be done while construct is waiting."),
    (0x000C, StatusKind::NoneWaiting, "No task/construct waiting/pending for that action/event."),
    (0x000D, StatusKind::Suspended, "Operation cannot be done while construct is suspended."),
    (0x000E, StatusKind::NotAvailable, "Feature not available due to software configuration."),
    (0x000F, StatusKind::NotSupported, "Feature not supported."),
    (0x0010, StatusKind::Initialization, "Initialization failed."),
    (0x0011, StatusKind::NotInitialized, "Module has not been initialized."),
    (0x0012, StatusKind::AlreadyInitialized, "Module has already been initialized."),
    (0x0013, StatusKind::Deleted, "Object/construct has been deleted."),
    (0x0019, StatusKind::AllocationFailed, "Generic allocation error."),
    (0x001A, StatusKind::NoMoreResource, "No more resource available to perform the operation."),
    (0x001B, StatusKind::Empty, "Item/list/queue is empty."),
    (0x001C, StatusKind::Full, "Item/list/queue is full."),
    (0x001D, StatusKind::WouldOverflow, "Item would overflow."),
    (0x001E, StatusKind::HasOverflowed, "Item/list/queue has been overflowed."),
    (0x0021, StatusKind::InvalidParameter, "Generic invalid argument or consequence of invalid argument."),
    (0x0022, StatusKind::NullPointer, "Invalid null pointer received as argument."),
    (0x0023, StatusKind::InvalidConfiguration, "Invalid configuration provided."),
    (0x0024, StatusKind::InvalidMode, "Invalid mode."),
    (0x0025, StatusKind::InvalidHandle, "Invalid handle."),
    (0x0026, StatusKind::InvalidType, "Invalid type for operation."),
    (0x0027, StatusKind::InvalidIndex, "Invalid index."),
    (0x0028, StatusKind::InvalidRange, "Invalid range."),
    (0x002B, StatusKind::InvalidCount, "Invalid count."),
    (0x002D, StatusKind::NotFound, "Item could not be found."),
    (0x002E, StatusKind::AlreadyExists, "Item already exists."),
    (0x002F, StatusKind::Io, "Generic I/O failure."),
    (0x0030, StatusKind::IoTimeout, "I/O failure due to timeout."),
    (0x0031, StatusKind::Transmit, "Generic transmission error."),
    (0x0035, StatusKind::Receive, "Generic reception error."),
    (0x0038, StatusKind::MessageTooLong, "Message is too long."),
    (0x0048, StatusKind::CommandIsInvalid, "Command was not recognized"),
    (0x0049, StatusKind::CommandTooLong, "Command or parameter maximum length exceeded"),
    (0x004A, StatusKind::CommandIncomplete, "Data received does not form a complete command"),
    (0x0402, StatusKind::BtOutOfBonds, "Bonding procedure can't be started because device has no space left for bond."),
    (0x0403, StatusKind::BtUnspecified, "Unspecified error"),
    (0x0404, StatusKind::BtHardware, "Hardware failure"),
    (0x0406, StatusKind::BtNoBonding, "The bonding does not exist."),
    (0x0407, StatusKind::BtCrypto, "Error using crypto functions"),
    (0x0408, StatusKind::BtDataCorrupted, "Data was corrupted."),
    (0x040A, StatusKind::BtInvalidSyncHandle, "Invalid periodic advertising sync handle"),
    (0x040B, StatusKind::BtInvalidModuleAction, "Bluetooth cannot be used on this hardware"),
    (0x040C, StatusKind::BtRadio, "Error received from radio"),
    (0x041B, StatusKind::BtPsStoreFull, "Flash reserved for PS store is full"),
    (0x041C, StatusKind::BtPsKeyNotFound, "PS key not found"),
    (0x1002, StatusKind::BtCtrlUnknownConnectionIdentifier, "Connection does not exist, or connection open request was cancelled."),
    (0x1007, StatusKind::BtCtrlMemoryCapacityExceeded, "Controller is out of memory."),
    (0x1008, StatusKind::BtCtrlConnectionTimeout, "Link supervision timeout has expired."),
    (0x1009, StatusKind::BtCtrlConnectionLimitExceeded, "Controller is at limit of connections it can support."),
    (0x100C, StatusKind::BtCtrlCommandDisallowed, "Command requested cannot be executed because the Controller is in a state where it cannot process this command at this time."),
    (0x1012, StatusKind::BtCtrlInvalidCommandParameters, "Command contained invalid parameters."),
    (0x101F, StatusKind::BtCtrlUnspecifiedError, "No other error code specified is appropriate to use."),
    (0x1022, StatusKind::BtCtrlLlResponseTimeout, "Connection terminated due to link-layer procedure timeout."),
];

/// A link status code; codes outside the table stay representable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u16);

impl Status {
    pub const OK: Status = Status(0x0000);
    pub const FAIL: Status = Status(0x0001);
    pub const NOT_READY: Status = Status(0x0003);
    pub const IN_PROGRESS: Status = Status(0x0005);
    pub const TIMEOUT: Status = Status(0x0007);
    pub const PERMISSION: Status = Status(0x0008);
    pub const NOT_AVAILABLE: Status = Status(0x000E);
    pub const NOT_SUPPORTED: Status = Status(0x000F);
    pub const INVALID_PARAMETER: Status = Status(0x0021);
    pub const NOT_FOUND: Status = Status(0x002D);
    pub const ALREADY_EXISTS: Status = Status(0x002E);

    pub fn code(self) -> u16 {
        self.0
    }

    fn entry(self) -> Option<&'static (u16, StatusKind, &'static str)> {
        STATUS_TABLE.iter().find(|(code, _, _)| *code == self.0)
    }

    pub fn kind(self) -> Option<StatusKind> {
        self.entry().map(|(_, kind, _)| *kind)
    }

    pub fn description(self) -> Option<&'static str> {
        self.entry().map(|(_, _, doc)| *doc)
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Status(code)
    }
}

impl fmt::LowerHex for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(doc) => f.write_str(doc),
            None => write!(f, "Unknown status: {:#06x}", self.0),
        }
    }
}

/// A link command answered with a failure status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Command failed with result {status:#06x}: '{status}'\n> {command}\n< {response}")]
pub struct CommandFailed {
    pub status: Status,
    pub command: String,
    pub response: String,
}

impl CommandFailed {
    pub fn new(status: Status, command: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            status,
            command: command.into(),
            response: response.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_known_status() {
        let status = Status::from(0x0007);
        assert_eq!(status.kind(), Some(StatusKind::Timeout));
        assert_eq!(status.to_string(), "Operation timed out.");
    }

    #[test]
    fn test_unknown_status_round_trips() {
        let status = Status::from(0xBEEF);
        assert_eq!(status.kind(), None);
        assert_eq!(status.code(), 0xBEEF);
        assert_eq!(status.to_string(), "Unknown status: 0xbeef");
    }

    #[test]
    fn test_table_codes_are_unique() {
        let codes: HashSet<u16> = STATUS_TABLE.iter().map(|(code, _, _)| *code).collect();
        assert_eq!(codes.len(), STATUS_TABLE.len());
    }

    #[test]
    fn test_command_failed_message() {
        let err = CommandFailed::new(
            Status::from(0x0002),
            "scanner.start(phy=1M, mode=generic)",
            "rsp_scanner_start(result=0x0002)",
        );
        assert_eq!(
            err.to_string(),
            "Command failed with result 0x0002: 'Generic invalid state error.'\n\
             > scanner.start(phy=1M, mode=generic)\n\
             < rsp_scanner_start(result=0x0002)"
        );
    }
}
