/// RFC 3550 generic header extension (profile-specific).
///
/// The extension body travels as opaque bytes; one-byte/two-byte element
/// parsing (RFC 8285) is left to whoever negotiated the extension ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeaderExtension {
    /// 16-bit profile-specific identifier.
    pub profile: u16,
    /// Raw extension payload (not including the 4-byte header).
    pub data: Vec<u8>,
}

impl RtpHeaderExtension {
    pub fn new(profile: u16, data: Vec<u8>) -> Self {
        Self { profile, data }
    }

    /// Body length rounded up to a whole number of 32-bit words, as it
    /// appears on the wire.
    pub fn padded_len(&self) -> usize {
        self.data.len().div_ceil(4) * 4
    }

    /// Body length in 32-bit words for the extension length field.
    pub fn length_words(&self) -> u16 {
        (self.padded_len() / 4) as u16
    }
}
