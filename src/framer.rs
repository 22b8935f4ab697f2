use crate::error::LineResult;

/// Bytes received from the device that have not yet formed a message
#[derive(Debug, Default, Clone)]
pub struct ReceiveBuffer {
    bytes: Vec<u8>,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// No size limit is enforced; the device is expected to terminate its messages
    pub fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Extract the message ending at the first occurrence of `delimiter`.
    ///
    /// When the delimiter is present the whole buffer is consumed, including
    /// anything received after the delimiter. Otherwise the buffer is left
    /// untouched and `None` is returned. A message that is not valid UTF-8 is
    /// dropped together with the buffer contents.
    pub fn try_extract(&mut self, delimiter: &[u8]) -> LineResult<Option<String>> {
        let Some(end) = find(&self.bytes, delimiter) else {
            return Ok(None);
        };

        let message = decode(&self.bytes[..end]);
        self.bytes.clear();
        message.map(Some)
    }

    /// Decode and consume everything buffered, terminated or not
    pub fn take_partial(&mut self) -> LineResult<String> {
        let message = decode(&self.bytes);
        self.bytes.clear();
        message
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// ASCII whitespace including vertical tab
fn is_space(byte: &u8) -> bool {
    byte.is_ascii_whitespace() || *byte == 0x0b
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !is_space(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_space(b)).map_or(start, |last| last + 1);
    &bytes[start..end]
}

fn decode(bytes: &[u8]) -> LineResult<String> {
    Ok(std::str::from_utf8(trim(bytes))?.to_owned())
}
