/*!
 * Key pair generation in the coprocessor
 *
 * Both generators run the same two verbs: PKA key token build turns a key-value
 * structure into a key skeleton, and PKA key generate turns the skeleton into an
 * internal key token enciphered under the current master key. The generated token
 * is written into the caller's buffer and its length returned.
 */

pub mod ecc;
pub mod rsa;


pub use self::ecc::generate_ecc_key_pair;
pub use self::rsa::generate_rsa_key_pair;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::curves;
use crate::error::{error_codes, CcaError, CcaResult};
use crate::facility::{keywords, FacilityHandle, PkaVerbs, RuleArray};
use crate::token::header::MAX_PKA_KEY_TOKEN_SIZE;
use crate::token::key_values::RsaKeyValues;

/// Parameters of a key pair to generate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KeySpec {
    /// An ECC key pair on a named curve (OpenSSL or JOSE name)
    Ecc { curve: String },
    /// An RSA key pair; `public_exponent` 0 lets the coprocessor choose
    Rsa {
        modulus_bits: usize,
        public_exponent: u32,
    },
}

impl Default for KeySpec {
    fn default() -> Self {
        KeySpec::Ecc {
            curve: "prime256v1".to_string(),
        }
    }
}

impl KeySpec {
    pub fn ecc(curve: &str) -> Self {
        KeySpec::Ecc {
            curve: curve.to_string(),
        }
    }

    pub fn rsa(modulus_bits: usize, public_exponent: u32) -> Self {
        KeySpec::Rsa {
            modulus_bits,
            public_exponent,
        }
    }

    /// Check the parameters without contacting the facility
    pub fn validate(&self) -> CcaResult<()> {
        match self {
            KeySpec::Ecc { curve } => curve_nid(curve).map(|_| ()),
            KeySpec::Rsa {
                modulus_bits,
                public_exponent,
            } => RsaKeyValues::new(*modulus_bits, *public_exponent).map(|_| ()),
        }
    }
}

/// OpenSSL identifier of a supported curve, by OpenSSL or JOSE name
pub fn curve_nid(curve: &str) -> CcaResult<i32> {
    curves::curve_by_name(curve)
        .map(|info| info.nid)
        .ok_or_else(|| {
            CcaError::invalid_parameter_with_code(
                "curve",
                "a supported curve name",
                curve,
                error_codes::UNSUPPORTED_CURVE,
            )
        })
}

/// Generate the key pair described by `spec` into `key_token`
pub fn generate_key_pair<F: FacilityHandle + ?Sized>(
    facility: &F,
    spec: &KeySpec,
    key_token: &mut [u8],
) -> CcaResult<usize> {
    match spec {
        KeySpec::Ecc { curve } => generate_ecc_key_pair(facility, curve_nid(curve)?, key_token),
        KeySpec::Rsa {
            modulus_bits,
            public_exponent,
        } => generate_rsa_key_pair(facility, *modulus_bits, *public_exponent, key_token),
    }
}

/// Generate the key pair described by `spec` into a new buffer of the token's size
pub fn generate_key_token<F: FacilityHandle + ?Sized>(
    facility: &F,
    spec: &KeySpec,
) -> CcaResult<Vec<u8>> {
    let mut key_token = vec![0u8; MAX_PKA_KEY_TOKEN_SIZE];
    let length = generate_key_pair(facility, spec, &mut key_token)?;
    key_token.truncate(length);
    Ok(key_token)
}

pub(crate) fn require_output_buffer(key_token: &[u8]) -> CcaResult<()> {
    if key_token.is_empty() {
        return Err(CcaError::invalid_parameter_with_code(
            "key_token",
            "a non-empty output buffer",
            "0 bytes",
            error_codes::BUFFER_TOO_SMALL,
        ));
    }
    Ok(())
}

/// Run key token build and key generate; the output buffer is cleared on failure
pub(crate) fn build_and_generate(
    verbs: &dyn PkaVerbs,
    build_rules: &RuleArray,
    key_values: &[u8],
    key_token: &mut [u8],
) -> CcaResult<usize> {
    let mut skeleton = Zeroizing::new(vec![0u8; MAX_PKA_KEY_TOKEN_SIZE]);

    log::debug!(
        "Building key skeleton: rules: {} key values: {} bytes",
        build_rules,
        key_values.len()
    );
    let skeleton_len = verbs.key_token_build(build_rules, key_values, &mut skeleton)?;

    let generate_rules = RuleArray::new(&[keywords::MASTER]);
    log::debug!(
        "Generating key pair: rules: {} skeleton: {} bytes",
        generate_rules,
        skeleton_len
    );
    match verbs.key_generate(&generate_rules, &skeleton[..skeleton_len], key_token) {
        Ok(length) => Ok(length),
        Err(e) => {
            key_token.zeroize();
            Err(e)
        }
    }
}
