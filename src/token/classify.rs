//! Key type classification of PKA key tokens.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::header::{SECTION_ID_ECC_PUBL, SECTION_ID_RSA_PUBL};
use super::scanner::find_section;
use crate::error::{error_codes, CcaError, CcaResult};

/// Algorithm of the key held by a PKA key token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "EC")]
    Ec,
    /// Plain RSA. RSA-PSS keys use the same token format and classify as this.
    #[serde(rename = "RSA")]
    Rsa,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Ec => write!(f, "EC"),
            KeyType::Rsa => write!(f, "RSA"),
        }
    }
}

/// Determine the key type from the public key section of the token
pub fn get_key_type(key_token: &[u8]) -> CcaResult<KeyType> {
    if find_section(key_token, SECTION_ID_ECC_PUBL)?.is_some() {
        return Ok(KeyType::Ec);
    }
    if find_section(key_token, SECTION_ID_RSA_PUBL)?.is_some() {
        return Ok(KeyType::Rsa);
    }

    Err(CcaError::UnrecognizedKeyType {
        cause: "token has neither an ECC nor an RSA public key section".to_string(),
        error_code: error_codes::UNRECOGNIZED_KEY_TYPE,
    })
}
