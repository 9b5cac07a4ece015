/*!
 * CCA facility binding
 *
 * The key operations drive the coprocessor through three PKA verbs of the CCA
 * host library. This module defines the capability those operations need
 * ([`PkaVerbs`]), how it is obtained from a facility handle ([`FacilityHandle`]),
 * the rule array keywords, and the wrapping of return and reason codes.
 *
 * Two handles are provided: [`CcaLibrary`], which resolves the verbs from the
 * shared library by name, and [`MockFacility`], an in-process double.
 */

use std::fmt;

use crate::error::{error_codes, CcaError, CcaResult};

pub mod library;
pub mod mock;

pub use library::CcaLibrary;
pub use mock::MockFacility;
pub use mock::RecordedCall;

/// Size of one rule array keyword
pub const KEYWORD_SIZE: usize = 8;

/// Size of key identifiers, key names and transport key identifiers
pub const KEY_ID_SIZE: usize = 64;

/// Return code / reason code of a change request against an unloaded master key
pub const RC_MASTER_KEY_NOT_LOADED: (i64, i64) = (12, 764);

/// The CCA verbs this crate calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// CSNDPKB, PKA key token build
    KeyTokenBuild,
    /// CSNDPKG, PKA key generate
    KeyGenerate,
    /// CSNDKTC, PKA key token change
    KeyTokenChange,
}

impl Verb {
    pub const ALL: [Verb; 3] = [Verb::KeyTokenBuild, Verb::KeyGenerate, Verb::KeyTokenChange];

    /// Symbol name of the verb in the host library
    pub fn entry_point(&self) -> &'static str {
        match self {
            Verb::KeyTokenBuild => "CSNDPKB",
            Verb::KeyGenerate => "CSNDPKG",
            Verb::KeyTokenChange => "CSNDKTC",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Verb::KeyTokenBuild => "PKA key token build",
            Verb::KeyGenerate => "PKA key generate",
            Verb::KeyTokenChange => "PKA key token change",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CCA {} ({})", self.entry_point(), self.description())
    }
}

/// A rule array keyword: ASCII, left-aligned, blank-padded to 8 bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keyword([u8; KEYWORD_SIZE]);

impl Keyword {
    pub const fn new(keyword: &str) -> Self {
        let bytes = keyword.as_bytes();
        assert!(bytes.len() <= KEYWORD_SIZE, "rule array keywords have at most 8 characters");

        let mut padded = [b' '; KEYWORD_SIZE];
        let mut i = 0;
        while i < bytes.len() {
            padded[i] = bytes[i];
            i += 1;
        }
        Keyword(padded)
    }

    pub fn as_bytes(&self) -> &[u8; KEYWORD_SIZE] {
        &self.0
    }

    /// The keyword without its padding
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("").trim_end()
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keyword({:?})", self.as_str())
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule array keywords used by this crate
pub mod keywords {
    use super::Keyword;

    pub const ECC_PAIR: Keyword = Keyword::new("ECC-PAIR");
    pub const ECC_VER1: Keyword = Keyword::new("ECC-VER1");
    pub const RSA_AESC: Keyword = Keyword::new("RSA-AESC");
    pub const KEY_MGMT: Keyword = Keyword::new("KEY-MGMT");
    pub const MASTER: Keyword = Keyword::new("MASTER");
    pub const ECC: Keyword = Keyword::new("ECC");
    pub const RSA: Keyword = Keyword::new("RSA");
    /// Re-encipher to the new master key
    pub const RTNMK: Keyword = Keyword::new("RTNMK");
    /// Re-encipher from the old to the current master key
    pub const RTCMK: Keyword = Keyword::new("RTCMK");
}

/// Keywords passed to a verb
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleArray(Vec<Keyword>);

impl RuleArray {
    pub fn new(keywords: &[Keyword]) -> Self {
        RuleArray(keywords.to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, keyword: Keyword) -> bool {
        self.0.contains(&keyword)
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.0
    }

    /// Concatenated keywords as the verbs expect them
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|keyword| keyword.0).collect()
    }
}

impl fmt::Display for RuleArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keywords: Vec<&str> = self.0.iter().map(Keyword::as_str).collect();
        f.write_str(&keywords.join(" "))
    }
}

/// The PKA verbs of a resolved facility.
///
/// Implementations report nonzero return codes as [`CcaError::FacilityFailure`]
/// (see [`check_status`]) and never report more output than the buffer holds.
pub trait PkaVerbs {
    /// Build a key skeleton from a key-value structure; returns the skeleton length
    fn key_token_build(
        &self,
        rules: &RuleArray,
        key_values: &[u8],
        skeleton: &mut [u8],
    ) -> CcaResult<usize>;

    /// Generate a key pair from a skeleton; returns the key token length
    fn key_generate(
        &self,
        rules: &RuleArray,
        skeleton: &[u8],
        key_token: &mut [u8],
    ) -> CcaResult<usize>;

    /// Change a key token in place
    fn key_token_change(&self, rules: &RuleArray, key_token: &mut [u8]) -> CcaResult<()>;
}

/// A loaded facility from which the PKA verbs can be resolved
pub trait FacilityHandle {
    /// Resolve all verbs, failing if any entry point is missing
    fn resolve(&self) -> CcaResult<Box<dyn PkaVerbs + '_>>;
}

/// Turn a verb's return and reason codes into a result
pub fn check_status(verb: Verb, return_code: i64, reason_code: i64) -> CcaResult<()> {
    if return_code == 0 {
        return Ok(());
    }

    log::warn!(
        "{} failed: return_code: {} reason_code: {}",
        verb,
        return_code,
        reason_code
    );
    Err(CcaError::facility_failure(verb, return_code, reason_code))
}

/// Validate a length reported back by a verb against the buffer it wrote to
pub fn check_output_length(verb: Verb, reported: i64, capacity: usize) -> CcaResult<usize> {
    match usize::try_from(reported) {
        Ok(length) if length <= capacity => Ok(length),
        _ => {
            log::warn!(
                "{} reported {} bytes of output for a {} byte buffer",
                verb,
                reported,
                capacity
            );
            Err(CcaError::FacilityFailure {
                verb,
                return_code: 0,
                reason_code: 0,
                error_code: error_codes::VERB_OUTPUT_INVALID,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_padding() {
        assert_eq!(keywords::MASTER.as_bytes(), b"MASTER  ");
        assert_eq!(keywords::RTNMK.as_bytes(), b"RTNMK   ");
        assert_eq!(keywords::ECC_PAIR.as_bytes(), b"ECC-PAIR");
        assert_eq!(keywords::ECC.as_str(), "ECC");
    }

    #[test]
    fn test_rule_array_bytes() {
        let rules = RuleArray::new(&[keywords::RSA_AESC, keywords::KEY_MGMT]);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.to_bytes(), b"RSA-AESCKEY-MGMT".to_vec());
        assert_eq!(rules.to_string(), "RSA-AESC KEY-MGMT");
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(Verb::KeyGenerate, 0, 0).is_ok());
        // a warning with return code 0 is still success
        assert!(check_status(Verb::KeyGenerate, 0, 2).is_ok());

        let err = check_status(Verb::KeyTokenBuild, 8, 2054).unwrap_err();
        assert_eq!(err.facility_codes(), Some((8, 2054)));
    }

    #[test]
    fn test_check_output_length() {
        assert_eq!(check_output_length(Verb::KeyGenerate, 120, 3500).unwrap(), 120);
        assert!(check_output_length(Verb::KeyGenerate, 3501, 3500).is_err());
        assert!(check_output_length(Verb::KeyGenerate, -1, 3500).is_err());
    }

    #[test]
    fn test_output_length_error_carries_no_verb_codes() {
        let err = check_output_length(Verb::KeyTokenChange, 4000, 3500).unwrap_err();
        assert_eq!(err.error_code(), error_codes::VERB_OUTPUT_INVALID);
        assert_eq!(err.kind(), crate::error::ErrorKind::FacilityFailure);
        assert_eq!(err.facility_codes(), None);
    }
}
