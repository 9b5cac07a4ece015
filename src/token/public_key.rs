/*!
 * Public key extraction from PKA key tokens
 *
 * Reads the ECC and RSA public key sections of internal PKA tokens and exports
 * the keys as JSON Web Keys or `rsa` public keys.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::header::{SECTION_HEADER_SIZE, SECTION_ID_ECC_PUBL, SECTION_ID_RSA_PUBL};
use super::scanner::{require_section, Section};
use crate::curves::{self, CurveFamily, CurveInfo};
use crate::error::{error_codes, CcaError, CcaResult};

// ECC public key section: reserved[4], curve type, reserved, prime bits, q length, q
const ECC_PUBL_CURVE_TYPE: usize = 8;
const ECC_PUBL_PRIME_BITS: usize = 10;
const ECC_PUBL_Q_LENGTH: usize = 12;
const ECC_PUBL_Q: usize = 14;

// RSA public key section: reserved[2], e length, modulus bits, n length, e, n
const RSA_PUBL_EXP_LENGTH: usize = 6;
const RSA_PUBL_MODULUS_BITS: usize = 8;
const RSA_PUBL_MODULUS_LENGTH: usize = 10;
const RSA_PUBL_EXPONENT: usize = 12;

/// Uncompressed point marker
const EC_POINT_UNCOMPRESSED: u8 = 0x04;

fn read_u16(section: &Section<'_>, at: usize) -> CcaResult<u16> {
    match section.as_bytes().get(at..at + 2) {
        Some(field) => Ok(u16::from_be_bytes([field[0], field[1]])),
        None => Err(section_content_error(section, "section too short for its fixed fields")),
    }
}

fn section_content_error(section: &Section<'_>, cause: &str) -> CcaError {
    CcaError::malformed_token(
        &format!("section {:#04x}: {}", section.identifier(), cause),
        section.offset(),
        error_codes::SECTION_CONTENT_INVALID,
    )
}

fn base64url(bytes: &[u8]) -> String {
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// ECC public key held by a key token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EccPublicKey {
    pub curve_family: CurveFamily,
    pub prime_bits: u16,
    /// Public point, normally uncompressed (0x04 || x || y)
    pub q: Vec<u8>,
}

impl EccPublicKey {
    /// Read the ECC public key section of `key_token`
    pub fn from_token(key_token: &[u8]) -> CcaResult<Self> {
        let section = require_section(key_token, SECTION_ID_ECC_PUBL)?;
        Self::from_section(&section)
    }

    pub fn from_section(section: &Section<'_>) -> CcaResult<Self> {
        let bytes = section.as_bytes();
        let curve_type = *bytes
            .get(ECC_PUBL_CURVE_TYPE)
            .ok_or_else(|| section_content_error(section, "section too short for its fixed fields"))?;
        let curve_family = CurveFamily::from_byte(curve_type)
            .ok_or_else(|| section_content_error(section, "unknown curve type"))?;
        let prime_bits = read_u16(section, ECC_PUBL_PRIME_BITS)?;
        let q_length = read_u16(section, ECC_PUBL_Q_LENGTH)? as usize;

        let q = bytes
            .get(ECC_PUBL_Q..ECC_PUBL_Q + q_length)
            .ok_or_else(|| section_content_error(section, "public key exceeds the section"))?;

        Ok(Self {
            curve_family,
            prime_bits,
            q: q.to_vec(),
        })
    }

    /// Encode as an ECC public key section body (everything after the section header)
    pub fn section_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(ECC_PUBL_Q - SECTION_HEADER_SIZE + self.q.len());
        body.extend_from_slice(&[0u8; 4]);
        body.push(self.curve_family.to_byte());
        body.push(0);
        body.extend_from_slice(&self.prime_bits.to_be_bytes());
        body.extend_from_slice(&(self.q.len() as u16).to_be_bytes());
        body.extend_from_slice(&self.q);
        body
    }

    /// The curve this key lives on
    pub fn curve(&self) -> Option<&'static CurveInfo> {
        curves::curve_by_family_and_bits(self.curve_family, self.prime_bits)
    }

    /// The affine coordinates of an uncompressed public point
    pub fn coordinates(&self) -> CcaResult<(&[u8], &[u8])> {
        let curve = self.curve().ok_or_else(|| {
            CcaError::invalid_parameter_with_code(
                "curve",
                "a supported curve",
                &format!("{:?} with {} bits", self.curve_family, self.prime_bits),
                error_codes::UNSUPPORTED_CURVE,
            )
        })?;

        let coordinate_len = curve.coordinate_len();
        if self.q.len() != curve.public_point_len() || self.q[0] != EC_POINT_UNCOMPRESSED {
            return Err(CcaError::invalid_parameter(
                "public key",
                &format!("an uncompressed point of {} bytes", curve.public_point_len()),
                &format!("{} bytes", self.q.len()),
            ));
        }

        let (x, y) = self.q[1..].split_at(coordinate_len);
        Ok((x, y))
    }

    /// Export as a JSON Web Key; only curves with a registered JOSE name qualify
    pub fn to_jwk(&self) -> CcaResult<JsonWebKey> {
        let (x, y) = self.coordinates()?;
        let crv = self.curve().and_then(|curve| curve.jwk_name).ok_or_else(|| {
            CcaError::invalid_parameter_with_code(
                "curve",
                "P-256, P-384 or P-521",
                &format!("{:?} with {} bits", self.curve_family, self.prime_bits),
                error_codes::UNSUPPORTED_CURVE,
            )
        })?;

        Ok(JsonWebKey::Ec {
            crv: crv.to_string(),
            x: base64url(x),
            y: base64url(y),
        })
    }
}

/// RSA public key information held by a key token.
///
/// Private key tokens carry the modulus in their private section, so the public
/// section of such tokens only has the exponent and the modulus size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub modulus_bits: u16,
    pub exponent: Vec<u8>,
    pub modulus: Option<Vec<u8>>,
}

impl RsaPublicKey {
    /// Read the RSA public key section of `key_token`
    pub fn from_token(key_token: &[u8]) -> CcaResult<Self> {
        let section = require_section(key_token, SECTION_ID_RSA_PUBL)?;
        Self::from_section(&section)
    }

    pub fn from_section(section: &Section<'_>) -> CcaResult<Self> {
        let bytes = section.as_bytes();
        let exponent_len = read_u16(section, RSA_PUBL_EXP_LENGTH)? as usize;
        let modulus_bits = read_u16(section, RSA_PUBL_MODULUS_BITS)?;
        let modulus_len = read_u16(section, RSA_PUBL_MODULUS_LENGTH)? as usize;

        let exponent_end = RSA_PUBL_EXPONENT + exponent_len;
        let exponent = bytes
            .get(RSA_PUBL_EXPONENT..exponent_end)
            .ok_or_else(|| section_content_error(section, "public exponent exceeds the section"))?;

        let modulus = if modulus_len == 0 {
            None
        } else {
            let modulus = bytes
                .get(exponent_end..exponent_end + modulus_len)
                .ok_or_else(|| section_content_error(section, "modulus exceeds the section"))?;
            Some(modulus.to_vec())
        };

        Ok(Self {
            modulus_bits,
            exponent: exponent.to_vec(),
            modulus,
        })
    }

    /// Encode as an RSA public key section body (everything after the section header)
    pub fn section_body(&self) -> Vec<u8> {
        let modulus = self.modulus.as_deref().unwrap_or(&[]);
        let mut body = Vec::with_capacity(
            RSA_PUBL_EXPONENT - SECTION_HEADER_SIZE + self.exponent.len() + modulus.len(),
        );
        body.extend_from_slice(&[0u8; 2]);
        body.extend_from_slice(&(self.exponent.len() as u16).to_be_bytes());
        body.extend_from_slice(&self.modulus_bits.to_be_bytes());
        body.extend_from_slice(&(modulus.len() as u16).to_be_bytes());
        body.extend_from_slice(&self.exponent);
        body.extend_from_slice(modulus);
        body
    }

    /// The public exponent as an integer
    pub fn public_exponent(&self) -> u64 {
        self.exponent
            .iter()
            .fold(0u64, |value, byte| (value << 8) | u64::from(*byte))
    }

    fn require_modulus(&self) -> CcaResult<&[u8]> {
        self.modulus.as_deref().ok_or_else(|| {
            CcaError::invalid_parameter(
                "key token",
                "an RSA public key section carrying the modulus",
                "a section without modulus",
            )
        })
    }

    /// Convert to an `rsa` public key
    pub fn to_rsa_public_key(&self) -> CcaResult<rsa::RsaPublicKey> {
        let modulus = self.require_modulus()?;
        rsa::RsaPublicKey::new(
            rsa::BigUint::from_bytes_be(modulus),
            rsa::BigUint::from_bytes_be(&self.exponent),
        )
        .map_err(|e| {
            CcaError::invalid_parameter("RSA public key", "a valid modulus and exponent", &e.to_string())
        })
    }

    pub fn to_jwk(&self) -> CcaResult<JsonWebKey> {
        let modulus = self.require_modulus()?;
        Ok(JsonWebKey::Rsa {
            n: base64url(modulus),
            e: base64url(&self.exponent),
        })
    }
}

/// Public JSON Web Key (RFC 7517)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum JsonWebKey {
    #[serde(rename = "EC")]
    Ec { crv: String, x: String, y: String },
    #[serde(rename = "RSA")]
    Rsa { n: String, e: String },
}

impl JsonWebKey {
    pub fn to_json(&self) -> CcaResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// RFC 7638 SHA-256 thumbprint, base64url encoded
    pub fn thumbprint(&self) -> String {
        // members in lexicographic order, no whitespace
        let canonical = match self {
            JsonWebKey::Ec { crv, x, y } => format!(
                r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
                crv, x, y
            ),
            JsonWebKey::Rsa { n, e } => format!(r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#, e, n),
        };
        base64url(&Sha256::digest(canonical.as_bytes()))
    }
}
