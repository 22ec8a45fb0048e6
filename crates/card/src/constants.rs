/// Applet identifier of the signing applet
pub const SATOCHIP_AID: &[u8] = b"SatoChip";

/// Class byte of every applet command
pub const CLA_SATOCHIP: u8 = 0xB0;

/// Class byte of the ISO SELECT command
pub const CLA_ISO: u8 = 0x00;

/// Instruction bytes
pub mod ins {
    /// SELECT by name
    pub const SELECT: u8 = 0xA4;
    /// GET STATUS
    pub const GET_STATUS: u8 = 0x3C;
    /// VERIFY PIN
    pub const VERIFY_PIN: u8 = 0x42;
    /// SIGN TRANSACTION HASH
    pub const SIGN_HASH: u8 = 0x7A;
    /// INITIATE SECURE CHANNEL
    pub const INIT_SECURE_CHANNEL: u8 = 0x81;
    /// PROCESS SECURE CHANNEL (wrapped command)
    pub const PROCESS_SECURE_CHANNEL: u8 = 0x82;
}

/// Applet-specific status words
pub mod status {
    use tapsign_apdu_core::StatusWord;

    /// PIN verification failed too many times
    pub const PIN_BLOCKED: StatusWord = StatusWord::new(0x9C, 0x0C);
    /// Command needs a verified PIN
    pub const UNAUTHORIZED: StatusWord = StatusWord::new(0x9C, 0x06);
    /// Secure channel required but not initialized
    pub const SECURE_CHANNEL_REQUIRED: StatusWord = StatusWord::new(0x9C, 0x20);
    /// Secure channel payload failed integrity check
    pub const SECURE_CHANNEL_WRONG_MAC: StatusWord = StatusWord::new(0x9C, 0x21);
    /// Key slot holds no key
    pub const KEY_NOT_INITIALIZED: StatusWord = StatusWord::new(0x9C, 0x0F);
}

/// Default PIN slot
pub const DEFAULT_PIN_SLOT: u8 = 0x00;

/// Default signing key slot
pub const DEFAULT_KEY_INDEX: u8 = 0x00;

/// Secure channel envelope sizes
pub mod envelope {
    /// IV length
    pub const IV_LEN: usize = 16;
    /// Random prefix of the IV, followed by the big-endian counter
    pub const IV_RANDOM_LEN: usize = 12;
    /// HMAC-SHA256 tag length
    pub const MAC_LEN: usize = 32;
    /// AES block size
    pub const BLOCK_LEN: usize = 16;
}

/// KDF label for the encryption key
pub const KDF_LABEL_ENC: &[u8] = b"sc_key";

/// KDF label for the MAC key
pub const KDF_LABEL_MAC: &[u8] = b"sc_mac";
