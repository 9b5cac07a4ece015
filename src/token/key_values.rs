//! Key-value structures passed to the PKA key token build verb.

use crate::curves::{self, CurveFamily};
use crate::error::{error_codes, CcaError, CcaResult};

/// Encoded size of the ECC key-value structure
pub const ECC_KEY_VALUES_SIZE: usize = 8;

/// Size of the RSA key-value structure without its public exponent
pub const RSA_KEY_VALUES_FIXED_SIZE: usize = 18;

/// Capacity of the RSA public exponent field
pub const RSA_MAX_EXPONENT_SIZE: usize = 3;

pub const RSA_MIN_MODULUS_BITS: usize = 512;
pub const RSA_MAX_MODULUS_BITS: usize = 4096;

/// Largest modulus for which the coprocessor may choose the exponent itself
pub const RSA_MAX_RANDOM_EXPONENT_MODULUS_BITS: usize = 2048;

/// ECC key-value structure for key pair generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EccKeyValues {
    pub curve_family: CurveFamily,
    pub curve_bits: u16,
    pub private_key_len: u16,
    pub public_key_len: u16,
}

impl EccKeyValues {
    /// Key values for generating a pair on the curve `nid`
    pub fn for_curve(nid: i32) -> CcaResult<Self> {
        let curve_family = if curves::is_prime_curve(nid) {
            CurveFamily::Prime
        } else if curves::is_brainpool_curve(nid) {
            CurveFamily::Brainpool
        } else {
            return Err(CcaError::invalid_parameter_with_code(
                "curve",
                "a prime or brainpool curve",
                &format!("unsupported curve: {}", nid),
                error_codes::UNSUPPORTED_CURVE,
            ));
        };

        let curve_bits = curves::curve_prime_bits(nid).ok_or_else(|| {
            CcaError::invalid_parameter_with_code(
                "curve",
                "a curve with a known prime length",
                &nid.to_string(),
                error_codes::UNSUPPORTED_CURVE,
            )
        })?;

        Ok(Self {
            curve_family,
            curve_bits,
            private_key_len: 0,
            public_key_len: 0,
        })
    }

    pub fn to_bytes(&self) -> [u8; ECC_KEY_VALUES_SIZE] {
        let bits = self.curve_bits.to_be_bytes();
        let private_len = self.private_key_len.to_be_bytes();
        let public_len = self.public_key_len.to_be_bytes();
        [
            self.curve_family.to_byte(),
            0,
            bits[0],
            bits[1],
            private_len[0],
            private_len[1],
            public_len[0],
            public_len[1],
        ]
    }

    pub fn parse(bytes: &[u8]) -> CcaResult<Self> {
        if bytes.len() < ECC_KEY_VALUES_SIZE {
            return Err(CcaError::invalid_parameter(
                "ECC key values",
                &format!("{} bytes", ECC_KEY_VALUES_SIZE),
                &format!("{} bytes", bytes.len()),
            ));
        }
        let curve_family = CurveFamily::from_byte(bytes[0]).ok_or_else(|| {
            CcaError::invalid_parameter_with_code(
                "curve type",
                "0x00 (prime) or 0x01 (brainpool)",
                &format!("{:#04x}", bytes[0]),
                error_codes::UNSUPPORTED_CURVE,
            )
        })?;

        Ok(Self {
            curve_family,
            curve_bits: u16::from_be_bytes([bytes[2], bytes[3]]),
            private_key_len: u16::from_be_bytes([bytes[4], bytes[5]]),
            public_key_len: u16::from_be_bytes([bytes[6], bytes[7]]),
        })
    }
}

/// Big-endian encoding of the public exponents the coprocessor accepts
pub fn encode_public_exponent(public_exponent: u32) -> Option<&'static [u8]> {
    match public_exponent {
        3 => Some(&[0x03]),
        5 => Some(&[0x05]),
        17 => Some(&[0x11]),
        257 => Some(&[0x01, 0x01]),
        65537 => Some(&[0x01, 0x00, 0x01]),
        _ => None,
    }
}

/// RSA key-value structure for key pair generation.
///
/// The CRT component lengths are always zero at generation time, so only the
/// modulus size and the public exponent are carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsaKeyValues {
    pub modulus_bits: u16,
    pub modulus_len: u16,
    exponent: [u8; RSA_MAX_EXPONENT_SIZE],
    exponent_len: usize,
}

impl RsaKeyValues {
    /// Key values for a `modulus_bits` key; `public_exponent` 0 lets the
    /// coprocessor pick the exponent
    pub fn new(modulus_bits: usize, public_exponent: u32) -> CcaResult<Self> {
        if !(RSA_MIN_MODULUS_BITS..=RSA_MAX_MODULUS_BITS).contains(&modulus_bits) {
            return Err(CcaError::invalid_parameter_with_code(
                "modulus_bits",
                &format!(
                    "between {} and {}",
                    RSA_MIN_MODULUS_BITS, RSA_MAX_MODULUS_BITS
                ),
                &modulus_bits.to_string(),
                error_codes::UNSUPPORTED_MODULUS_SIZE,
            ));
        }

        let mut exponent = [0u8; RSA_MAX_EXPONENT_SIZE];
        let exponent_len = if public_exponent == 0 {
            if modulus_bits > RSA_MAX_RANDOM_EXPONENT_MODULUS_BITS {
                return Err(CcaError::invalid_parameter_with_code(
                    "public_exponent",
                    &format!(
                        "an explicit exponent for keys > {} bits",
                        RSA_MAX_RANDOM_EXPONENT_MODULUS_BITS
                    ),
                    "0",
                    error_codes::EXPONENT_SIZE_MISMATCH,
                ));
            }
            0
        } else {
            let encoded = encode_public_exponent(public_exponent).ok_or_else(|| {
                CcaError::invalid_parameter_with_code(
                    "public_exponent",
                    "0, 3, 5, 17, 257 or 65537",
                    &public_exponent.to_string(),
                    error_codes::UNSUPPORTED_EXPONENT,
                )
            })?;
            exponent[..encoded.len()].copy_from_slice(encoded);
            encoded.len()
        };

        Ok(Self {
            modulus_bits: modulus_bits as u16,
            modulus_len: 0,
            exponent,
            exponent_len,
        })
    }

    /// Exponent bytes actually sent; empty when the coprocessor chooses
    pub fn public_exponent_bytes(&self) -> &[u8] {
        &self.exponent[..self.exponent_len]
    }

    /// Length of the structure as handed to the build verb
    pub fn encoded_len(&self) -> usize {
        RSA_KEY_VALUES_FIXED_SIZE + self.exponent_len
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.extend_from_slice(&self.modulus_bits.to_be_bytes());
        bytes.extend_from_slice(&self.modulus_len.to_be_bytes());
        bytes.extend_from_slice(&(self.exponent_len as u16).to_be_bytes());
        // reserved, p, q, dp, dq and u lengths
        bytes.extend_from_slice(&[0u8; 12]);
        bytes.extend_from_slice(self.public_exponent_bytes());
        bytes
    }

    pub fn parse(bytes: &[u8]) -> CcaResult<Self> {
        if bytes.len() < RSA_KEY_VALUES_FIXED_SIZE {
            return Err(CcaError::invalid_parameter(
                "RSA key values",
                &format!("at least {} bytes", RSA_KEY_VALUES_FIXED_SIZE),
                &format!("{} bytes", bytes.len()),
            ));
        }

        let exponent_len = u16::from_be_bytes([bytes[4], bytes[5]]) as usize;
        let available = bytes.len() - RSA_KEY_VALUES_FIXED_SIZE;
        if exponent_len > RSA_MAX_EXPONENT_SIZE || exponent_len > available {
            return Err(CcaError::invalid_parameter_with_code(
                "public exponent length",
                &format!("at most {} bytes", RSA_MAX_EXPONENT_SIZE.min(available)),
                &exponent_len.to_string(),
                error_codes::UNSUPPORTED_EXPONENT,
            ));
        }

        let mut exponent = [0u8; RSA_MAX_EXPONENT_SIZE];
        exponent[..exponent_len].copy_from_slice(
            &bytes[RSA_KEY_VALUES_FIXED_SIZE..RSA_KEY_VALUES_FIXED_SIZE + exponent_len],
        );

        Ok(Self {
            modulus_bits: u16::from_be_bytes([bytes[0], bytes[1]]),
            modulus_len: u16::from_be_bytes([bytes[2], bytes[3]]),
            exponent,
            exponent_len,
        })
    }
}
