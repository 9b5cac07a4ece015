//! ECC key pair generation.

use zeroize::Zeroize;

use super::{build_and_generate, require_output_buffer};
use crate::error::CcaResult;
use crate::facility::{keywords, FacilityHandle, RuleArray};
use crate::token::key_values::EccKeyValues;

/// Generate an ECC key pair on the curve `curve_nid` (an OpenSSL curve identifier).
///
/// The key token is written to the start of `key_token` and its length returned.
/// The buffer is cleared before the facility is invoked and again if generation
/// fails. Prime and brainpool curves are supported; anything else is rejected
/// without calling the facility.
pub fn generate_ecc_key_pair<F: FacilityHandle + ?Sized>(
    facility: &F,
    curve_nid: i32,
    key_token: &mut [u8],
) -> CcaResult<usize> {
    require_output_buffer(key_token)?;
    let verbs = facility.resolve()?;

    key_token.zeroize();

    let key_values = EccKeyValues::for_curve(curve_nid)?;
    let build_rules = RuleArray::new(&[keywords::ECC_PAIR, keywords::KEY_MGMT, keywords::ECC_VER1]);

    let length = build_and_generate(verbs.as_ref(), &build_rules, &key_values.to_bytes(), key_token)?;
    log::info!(
        "Generated ECC key pair: curve {} ({:?}, {} bits), token {} bytes",
        curve_nid,
        key_values.curve_family,
        key_values.curve_bits,
        length
    );
    Ok(length)
}
