//! Fixed-layout token and section headers.
//!
//! All multi-byte fields are big-endian, as the coprocessor writes them.

use crate::error::{error_codes, CcaError, CcaResult};

/// Size of the token header that starts every key token
pub const TOKEN_HEADER_SIZE: usize = 8;

/// Size of the header that starts every token section
pub const SECTION_HEADER_SIZE: usize = 4;

/// Largest PKA key token (and key skeleton) the coprocessor produces
pub const MAX_PKA_KEY_TOKEN_SIZE: usize = 3500;

/// Largest symmetric key token the coprocessor produces
pub const MAX_SYM_KEY_TOKEN_SIZE: usize = 725;

// Key token identifiers
pub const TOKEN_ID_NULL: u8 = 0x00;
pub const TOKEN_ID_INTERNAL_SYMMETRIC: u8 = 0x01;
pub const TOKEN_ID_EXTERNAL_SYMMETRIC: u8 = 0x02;
pub const TOKEN_ID_EXTERNAL_PKA: u8 = 0x1e;
pub const TOKEN_ID_INTERNAL_PKA: u8 = 0x1f;

// Key token versions
pub const TOKEN_VERS1_V0: u8 = 0x00;
pub const TOKEN_VERS2_DES_V0: u8 = 0x00;
pub const TOKEN_VERS2_DES_V1: u8 = 0x01;
pub const TOKEN_VERS2_AES_DATA: u8 = 0x04;
pub const TOKEN_VERS2_AES_CIPHER: u8 = 0x05;

// Section identifiers
pub const SECTION_ID_RSA_ME_1024_PRIV: u8 = 0x02;
pub const SECTION_ID_RSA_PUBL: u8 = 0x04;
pub const SECTION_ID_RSA_CRT_2048_PRIV: u8 = 0x05;
pub const SECTION_ID_RSA_ME_1024_OPK_PRIV: u8 = 0x06;
pub const SECTION_ID_RSA_CRT_4096_OPK_PRIV: u8 = 0x08;
pub const SECTION_ID_RSA_ME_4096_PRIV: u8 = 0x09;
pub const SECTION_ID_ECC_PRIV: u8 = 0x20;
pub const SECTION_ID_ECC_PUBL: u8 = 0x21;
pub const SECTION_ID_RSA_ME_1024_EOPK_PRIV: u8 = 0x30;
pub const SECTION_ID_RSA_CRT_4096_EOPK_PRIV: u8 = 0x31;

/// The header at offset 0 of every key token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenHeader {
    pub identifier: u8,
    /// Used by PKA key tokens
    pub version1: u8,
    pub token_length: u16,
    /// Used by symmetric key tokens
    pub version2: u8,
}

impl TokenHeader {
    /// Header of an internal PKA token, version 0
    pub fn internal_pka(token_length: u16) -> Self {
        Self {
            identifier: TOKEN_ID_INTERNAL_PKA,
            version1: TOKEN_VERS1_V0,
            token_length,
            version2: 0,
        }
    }

    /// Decode the header from the start of `bytes`
    pub fn parse(bytes: &[u8]) -> CcaResult<Self> {
        if bytes.len() < TOKEN_HEADER_SIZE {
            return Err(CcaError::malformed_token(
                &format!(
                    "key token length too small: {} bytes, header needs {}",
                    bytes.len(),
                    TOKEN_HEADER_SIZE
                ),
                0,
                error_codes::TOKEN_TOO_SHORT,
            ));
        }

        Ok(Self {
            identifier: bytes[0],
            version1: bytes[1],
            token_length: u16::from_be_bytes([bytes[2], bytes[3]]),
            version2: bytes[4],
        })
    }

    pub fn encode(&self) -> [u8; TOKEN_HEADER_SIZE] {
        let length = self.token_length.to_be_bytes();
        [
            self.identifier,
            self.version1,
            length[0],
            length[1],
            self.version2,
            0,
            0,
            0,
        ]
    }

    pub fn is_internal_pka(&self) -> bool {
        self.identifier == TOKEN_ID_INTERNAL_PKA
    }
}

/// The header that starts every token section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub identifier: u8,
    pub version: u8,
    /// Length of the whole section, header included
    pub length: u16,
}

impl SectionHeader {
    /// Decode the section header found at `offset` within `token`
    pub fn parse(token: &[u8], offset: usize) -> CcaResult<Self> {
        let end = offset.checked_add(SECTION_HEADER_SIZE);
        match end.and_then(|end| token.get(offset..end)) {
            Some(bytes) => Ok(Self {
                identifier: bytes[0],
                version: bytes[1],
                length: u16::from_be_bytes([bytes[2], bytes[3]]),
            }),
            None => Err(CcaError::malformed_token(
                "section header truncated by the token length",
                offset,
                error_codes::SECTION_TRUNCATED,
            )),
        }
    }

    pub fn encode(&self) -> [u8; SECTION_HEADER_SIZE] {
        let length = self.length.to_be_bytes();
        [self.identifier, self.version, length[0], length[1]]
    }
}

/// Assembles key tokens from a header and a list of sections.
///
/// Well-formed tokens come out of [`TokenBuilder::build`]; the `raw` and
/// `declared_length` knobs exist to produce deliberately damaged tokens.
#[derive(Debug, Clone)]
pub struct TokenBuilder {
    identifier: u8,
    version1: u8,
    declared_length: Option<u16>,
    body: Vec<u8>,
}

impl TokenBuilder {
    /// Start an internal PKA token, version 0
    pub fn internal_pka() -> Self {
        Self {
            identifier: TOKEN_ID_INTERNAL_PKA,
            version1: TOKEN_VERS1_V0,
            declared_length: None,
            body: Vec::new(),
        }
    }

    pub fn identifier(mut self, identifier: u8) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn version1(mut self, version1: u8) -> Self {
        self.version1 = version1;
        self
    }

    /// Override the token length written into the header
    pub fn declared_length(mut self, token_length: u16) -> Self {
        self.declared_length = Some(token_length);
        self
    }

    /// Append a section; its length field covers header and body
    pub fn section(mut self, identifier: u8, version: u8, body: &[u8]) -> Self {
        let length = (SECTION_HEADER_SIZE + body.len()).min(u16::MAX as usize) as u16;
        let header = SectionHeader {
            identifier,
            version,
            length,
        };
        self.body.extend_from_slice(&header.encode());
        self.body.extend_from_slice(body);
        self
    }

    /// Append bytes without any framing
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> CcaResult<Vec<u8>> {
        let total = TOKEN_HEADER_SIZE + self.body.len();
        if total > MAX_PKA_KEY_TOKEN_SIZE {
            return Err(CcaError::invalid_parameter_with_code(
                "token sections",
                &format!("at most {} bytes in total", MAX_PKA_KEY_TOKEN_SIZE),
                &format!("{} bytes", total),
                error_codes::BUFFER_TOO_SMALL,
            ));
        }

        let header = TokenHeader {
            identifier: self.identifier,
            version1: self.version1,
            token_length: self.declared_length.unwrap_or(total as u16),
            version2: 0,
        };

        let mut token = Vec::with_capacity(total);
        token.extend_from_slice(&header.encode());
        token.extend_from_slice(&self.body);
        Ok(token)
    }
}

impl Default for TokenBuilder {
    fn default() -> Self {
        Self::internal_pka()
    }
}
