use bitflags::bitflags;

bitflags! {
    /// X.509 key usage bits as carried on the wire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyUsage: u32 {
        const DIGITAL_SIGNATURE = 0x80;
        const NON_REPUDIATION = 0x40;
        const KEY_ENCIPHERMENT = 0x20;
        const DATA_ENCIPHERMENT = 0x10;
        const KEY_AGREEMENT = 0x08;
        const KEY_CERT_SIGN = 0x04;
        const CRL_SIGN = 0x02;
        const ENCIPHER_ONLY = 0x01;
        const DECIPHER_ONLY = 0x8000;
    }
}

bitflags! {
    /// Extended key usage bits as carried on the wire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExtKeyUsage: u32 {
        const SERVER_AUTH = 1 << 0;
        const CLIENT_AUTH = 1 << 1;
        const CODE_SIGNING = 1 << 2;
        const EMAIL_PROTECTION = 1 << 3;
        const TIME_STAMPING = 1 << 4;
        const OCSP_SIGNING = 1 << 5;
        const ANY = 1 << 6;
    }
}

impl KeyUsage {
    /// Look up a flag by its snake_case name, e.g. `key_cert_sign`.
    #[must_use]
    pub fn from_snake_name(name: &str) -> Option<Self> {
        Self::from_name(&name.to_ascii_uppercase())
    }
}

impl ExtKeyUsage {
    /// Look up a flag by its snake_case name, e.g. `server_auth`.
    #[must_use]
    pub fn from_snake_name(name: &str) -> Option<Self> {
        Self::from_name(&name.to_ascii_uppercase())
    }
}
