pub mod response;
pub mod session;

/// Static schema marker written into every stored record.
pub const RECORD_VERSION: &str = "v0";
