pub(crate) const DEFAULT_DELIMITER: &[u8] = b"\r";
pub(crate) const DEFAULT_BAUD_RATE: u32 = 9600;
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Size of the scratch buffer used for a single blocking read
pub(crate) const READ_CHUNK_SIZE: usize = 1024;
