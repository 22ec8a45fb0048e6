use crate::error::CodecError;

use super::Version;

/// Minimum length of a GET STATUS response
const MIN_STATUS_LEN: usize = 8;

/// Card status as reported by GET STATUS
///
/// Trailing flags were added in later applet versions and are `None` when the
/// card does not report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardStatus {
    /// Secure channel protocol version
    pub protocol_version: Version,
    /// Applet version
    pub applet_version: Version,
    /// Remaining tries for PIN 0
    pub pin_tries_remaining: u8,
    /// Remaining tries for PUK 0
    pub puk_tries_remaining: u8,
    /// Whether signing needs second-factor approval
    pub needs_2fa: Option<bool>,
    /// Whether a seed is loaded
    pub is_seeded: Option<bool>,
    /// Whether initial setup was completed
    pub setup_done: Option<bool>,
    /// Whether commands must go through the secure channel
    pub needs_secure_channel: Option<bool>,
}

impl CardStatus {
    /// Serialize the status the way the card reports it
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![
            self.protocol_version.major,
            self.protocol_version.minor,
            self.applet_version.major,
            self.applet_version.minor,
            self.pin_tries_remaining,
            self.puk_tries_remaining,
            // PIN 1 / PUK 1 are unused by the signing flow
            0,
            0,
        ];
        let flags = [
            self.needs_2fa,
            self.is_seeded,
            self.setup_done,
            self.needs_secure_channel,
        ];
        bytes.extend(flags.iter().map_while(|flag| flag.map(u8::from)));
        bytes
    }
}

impl TryFrom<&[u8]> for CardStatus {
    type Error = CodecError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        if data.len() < MIN_STATUS_LEN {
            return Err(CodecError::MalformedResponse("card status too short"));
        }
        let flag = |index: usize| data.get(index).map(|&b| b != 0);

        Ok(Self {
            protocol_version: Version::new(data[0], data[1]),
            applet_version: Version::new(data[2], data[3]),
            pin_tries_remaining: data[4],
            puk_tries_remaining: data[5],
            needs_2fa: flag(8),
            is_seeded: flag(9),
            setup_done: flag(10),
            needs_secure_channel: flag(11),
        })
    }
}
