pub mod link;
pub mod scanner;

pub use link::{
    BootInfo, ConnectionParameters, Link, LinkError, LinkEvent, LinkIdentity, ScanParameters,
    CONNECTION_DEFAULTS, SCAN_PARAMETERS,
};
pub use scanner::BluerLink;
