//! RSA key pair generation.

use zeroize::Zeroize;

use super::{build_and_generate, require_output_buffer};
use crate::error::CcaResult;
use crate::facility::{keywords, FacilityHandle, RuleArray};
use crate::token::key_values::RsaKeyValues;

/// Generate an RSA key pair with a `modulus_bits` modulus.
///
/// `public_exponent` must be 3, 5, 17, 257 or 65537, or 0 to let the coprocessor
/// choose one (only for moduli up to 2048 bits). Buffer handling is the same as
/// for [`generate_ecc_key_pair`](super::generate_ecc_key_pair).
pub fn generate_rsa_key_pair<F: FacilityHandle + ?Sized>(
    facility: &F,
    modulus_bits: usize,
    public_exponent: u32,
    key_token: &mut [u8],
) -> CcaResult<usize> {
    require_output_buffer(key_token)?;
    let verbs = facility.resolve()?;

    key_token.zeroize();

    let key_values = RsaKeyValues::new(modulus_bits, public_exponent)?;
    let build_rules = RuleArray::new(&[keywords::RSA_AESC, keywords::KEY_MGMT]);

    let length = build_and_generate(verbs.as_ref(), &build_rules, &key_values.to_bytes(), key_token)?;
    log::info!(
        "Generated RSA key pair: {} bits, public exponent {}, token {} bytes",
        modulus_bits,
        public_exponent,
        length
    );
    Ok(length)
}
