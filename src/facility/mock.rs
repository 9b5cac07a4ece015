/*!
 * In-process facility double
 *
 * `MockFacility` answers the three PKA verbs without a coprocessor. Key skeletons and
 * key tokens it produces have the real section layout, so tokens coming out of it can
 * be scanned, classified and re-enciphered. Key material is a deterministic
 * SHA-256 stream and carries no secret.
 *
 * Every verb call is recorded before any injected failure is applied.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use super::{check_status, keywords, FacilityHandle, PkaVerbs, RuleArray, Verb};
use crate::curves;
use crate::error::{error_codes, CcaError, CcaResult};
use crate::token::header::{
    TokenBuilder, SECTION_ID_ECC_PRIV, SECTION_ID_ECC_PUBL, SECTION_ID_RSA_CRT_4096_OPK_PRIV,
    SECTION_ID_RSA_PUBL,
};
use crate::token::key_values::{EccKeyValues, RsaKeyValues};
use crate::token::public_key::{EccPublicKey, RsaPublicKey};
use crate::token::scanner::find_section;

const SKELETON_MAGIC: &[u8; 4] = b"MSKL";
const SKELETON_ECC: u8 = 0x01;
const SKELETON_RSA: u8 = 0x02;

/// Return and reason code reported when an output buffer is too small
pub const RC_BUFFER_TOO_SMALL: (i64, i64) = (8, 2054);

/// Return and reason code reported for input the mock cannot interpret
pub const RC_INVALID_INPUT: (i64, i64) = (8, 72);

/// Marker byte written into private section bodies
const PRIVATE_SECTION_VERSION: u8 = 0x00;

/// Default exponent chosen when the caller leaves it to the coprocessor
const DEFAULT_PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

/// Mask applied to private key material on each re-encipherment
const REENCIPHER_MASK: u8 = 0xa5;

/// One verb invocation seen by a [`MockFacility`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub verb: Verb,
    /// Rule array keywords without padding
    pub rules: Vec<String>,
    /// Key values for build, skeleton for generate, token (before the change) for change
    pub data: Vec<u8>,
}

/// A facility double with failure injection and call recording
#[derive(Debug, Default)]
pub struct MockFacility {
    missing: Vec<Verb>,
    failures: Mutex<HashMap<Verb, (i64, i64)>>,
    calls: Mutex<Vec<RecordedCall>>,
    sequence: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockFacility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make resolution fail as if the library lacked `verb`
    pub fn without_entry_point(mut self, verb: Verb) -> Self {
        if !self.missing.contains(&verb) {
            self.missing.push(verb);
        }
        self
    }

    /// Make every later call of `verb` fail with the given codes
    pub fn fail_verb(&self, verb: Verb, return_code: i64, reason_code: i64) {
        lock(&self.failures).insert(verb, (return_code, reason_code));
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Forget the recorded calls. Tokens generated afterwards still differ from
    /// earlier ones.
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// All calls recorded so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_to(&self, verb: Verb) -> Vec<RecordedCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.verb == verb)
            .cloned()
            .collect()
    }

    fn record(&self, verb: Verb, rules: &RuleArray, data: &[u8]) -> CcaResult<u64> {
        lock(&self.calls).push(RecordedCall {
            verb,
            rules: rules.keywords().iter().map(|k| k.as_str().to_string()).collect(),
            data: data.to_vec(),
        });
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some((return_code, reason_code)) = lock(&self.failures).get(&verb).copied() {
            check_status(verb, return_code, reason_code)?;
        }
        Ok(sequence)
    }
}

impl FacilityHandle for MockFacility {
    fn resolve(&self) -> CcaResult<Box<dyn PkaVerbs + '_>> {
        if let Some(verb) = Verb::ALL.iter().find(|verb| self.missing.contains(*verb)) {
            return Err(CcaError::binding_unavailable(
                verb.entry_point(),
                "entry point not provided by the mock facility",
                error_codes::ENTRY_POINT_MISSING,
            ));
        }
        Ok(Box::new(MockVerbs { facility: self }))
    }
}

struct MockVerbs<'a> {
    facility: &'a MockFacility,
}

fn reject(verb: Verb, code: (i64, i64)) -> CcaError {
    log::warn!(
        "{} failed: return_code: {} reason_code: {}",
        verb,
        code.0,
        code.1
    );
    CcaError::facility_failure(verb, code.0, code.1)
}

fn write_output(verb: Verb, output: &[u8], buffer: &mut [u8]) -> CcaResult<usize> {
    if output.len() > buffer.len() {
        return Err(reject(verb, RC_BUFFER_TOO_SMALL));
    }
    buffer[..output.len()].copy_from_slice(output);
    Ok(output.len())
}

/// Deterministic filler bytes derived from `seed`
fn key_material(seed: &[u8], len: usize) -> Vec<u8> {
    let mut material = Vec::with_capacity(len + 32);
    let mut counter: u32 = 0;
    while material.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(counter.to_be_bytes());
        material.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    material.truncate(len);
    material
}

fn ecc_key_token(key_values: &EccKeyValues, seed: &[u8]) -> CcaResult<Vec<u8>> {
    let curve = curves::curve_by_family_and_bits(key_values.curve_family, key_values.curve_bits)
        .ok_or_else(|| reject(Verb::KeyGenerate, RC_INVALID_INPUT))?;

    let coordinate_len = curve.coordinate_len();
    let mut q = Vec::with_capacity(curve.public_point_len());
    q.push(0x04);
    q.extend_from_slice(&key_material(seed, 2 * coordinate_len));

    let public_key = EccPublicKey {
        curve_family: key_values.curve_family,
        prime_bits: key_values.curve_bits,
        q,
    };

    let mut private_body = vec![curve.family.to_byte(), 0];
    private_body.extend_from_slice(&key_values.curve_bits.to_be_bytes());
    private_body.extend_from_slice(&key_material(&[seed, &b"d"[..]].concat(), coordinate_len));

    TokenBuilder::internal_pka()
        .section(SECTION_ID_ECC_PRIV, PRIVATE_SECTION_VERSION, &private_body)
        .section(SECTION_ID_ECC_PUBL, 0x00, &public_key.section_body())
        .build()
}

fn rsa_key_token(key_values: &RsaKeyValues, seed: &[u8]) -> CcaResult<Vec<u8>> {
    let exponent = match key_values.public_exponent_bytes() {
        [] => DEFAULT_PUBLIC_EXPONENT.to_vec(),
        exponent => exponent.to_vec(),
    };
    let modulus_bytes = (key_values.modulus_bits as usize + 7) / 8;

    let public_key = RsaPublicKey {
        modulus_bits: key_values.modulus_bits,
        exponent,
        modulus: None,
    };

    let mut private_body = key_values.modulus_bits.to_be_bytes().to_vec();
    private_body.extend_from_slice(&key_material(seed, modulus_bytes));

    TokenBuilder::internal_pka()
        .section(SECTION_ID_RSA_CRT_4096_OPK_PRIV, PRIVATE_SECTION_VERSION, &private_body)
        .section(SECTION_ID_RSA_PUBL, 0x00, &public_key.section_body())
        .build()
}

impl PkaVerbs for MockVerbs<'_> {
    fn key_token_build(
        &self,
        rules: &RuleArray,
        key_values: &[u8],
        skeleton: &mut [u8],
    ) -> CcaResult<usize> {
        let verb = Verb::KeyTokenBuild;
        self.facility.record(verb, rules, key_values)?;

        let algorithm = if rules.contains(keywords::ECC_PAIR) {
            EccKeyValues::parse(key_values).map_err(|_| reject(verb, RC_INVALID_INPUT))?;
            SKELETON_ECC
        } else if rules.contains(keywords::RSA_AESC) {
            RsaKeyValues::parse(key_values).map_err(|_| reject(verb, RC_INVALID_INPUT))?;
            SKELETON_RSA
        } else {
            return Err(reject(verb, RC_INVALID_INPUT));
        };

        let mut output = SKELETON_MAGIC.to_vec();
        output.push(algorithm);
        output.extend_from_slice(key_values);
        write_output(verb, &output, skeleton)
    }

    fn key_generate(
        &self,
        rules: &RuleArray,
        skeleton: &[u8],
        key_token: &mut [u8],
    ) -> CcaResult<usize> {
        let verb = Verb::KeyGenerate;
        let sequence = self.facility.record(verb, rules, skeleton)?;

        if !rules.contains(keywords::MASTER) {
            return Err(reject(verb, RC_INVALID_INPUT));
        }
        let (algorithm, key_values) = skeleton
            .strip_prefix(SKELETON_MAGIC.as_slice())
            .and_then(<[u8]>::split_first)
            .ok_or_else(|| reject(verb, RC_INVALID_INPUT))?;

        let seed = [&sequence.to_be_bytes()[..], skeleton].concat();
        let token = match *algorithm {
            SKELETON_ECC => {
                let key_values =
                    EccKeyValues::parse(key_values).map_err(|_| reject(verb, RC_INVALID_INPUT))?;
                ecc_key_token(&key_values, &seed)?
            }
            SKELETON_RSA => {
                let key_values =
                    RsaKeyValues::parse(key_values).map_err(|_| reject(verb, RC_INVALID_INPUT))?;
                rsa_key_token(&key_values, &seed)?
            }
            _ => return Err(reject(verb, RC_INVALID_INPUT)),
        };

        write_output(verb, &token, key_token)
    }

    fn key_token_change(&self, rules: &RuleArray, key_token: &mut [u8]) -> CcaResult<()> {
        let verb = Verb::KeyTokenChange;
        self.facility.record(verb, rules, key_token)?;

        let private_id = if rules.contains(keywords::ECC) {
            SECTION_ID_ECC_PRIV
        } else if rules.contains(keywords::RSA) {
            SECTION_ID_RSA_CRT_4096_OPK_PRIV
        } else {
            return Err(reject(verb, RC_INVALID_INPUT));
        };
        if !rules.contains(keywords::RTNMK) && !rules.contains(keywords::RTCMK) {
            return Err(reject(verb, RC_INVALID_INPUT));
        }

        let (start, end) = match find_section(key_token, private_id) {
            Ok(Some(section)) => (section.offset() + 4, section.offset() + section.len()),
            _ => return Err(reject(verb, RC_INVALID_INPUT)),
        };

        // the first four body bytes stay readable
        let material = key_token
            .get_mut(start + 4..end)
            .ok_or_else(|| reject(verb, RC_INVALID_INPUT))?;
        for byte in material.iter_mut() {
            *byte ^= REENCIPHER_MASK;
        }
        Ok(())
    }
}
