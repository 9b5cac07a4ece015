/*!
 * Master key change for PKA key tokens
 *
 * Re-enciphers the private key of an internal PKA key token in place, either under
 * the new master key or from the old to the current master key. The token keeps its
 * length.
 */

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CcaError, CcaResult};
use crate::facility::{keywords, FacilityHandle, Keyword, RuleArray, Verb, RC_MASTER_KEY_NOT_LOADED};
use crate::token::{get_key_type, KeyType};

/// Which master key a token is re-enciphered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReencipherDirection {
    /// From the current master key to the new master key register
    ToNewMasterKey,
    /// From the old master key to the current master key
    OldToCurrent,
}

impl ReencipherDirection {
    pub fn keyword(&self) -> Keyword {
        match self {
            ReencipherDirection::ToNewMasterKey => keywords::RTNMK,
            ReencipherDirection::OldToCurrent => keywords::RTCMK,
        }
    }
}

impl fmt::Display for ReencipherDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReencipherDirection::ToNewMasterKey => write!(f, "current to new master key"),
            ReencipherDirection::OldToCurrent => write!(f, "old to current master key"),
        }
    }
}

fn algorithm_keyword(key_type: KeyType) -> Keyword {
    match key_type {
        KeyType::Ec => keywords::ECC,
        KeyType::Rsa => keywords::RSA,
    }
}

/// Re-encipher the private key held by `key_token` in place.
///
/// The key type is determined first, so tokens that cannot be classified are
/// rejected before the facility is asked to change anything. A change rejected
/// because the target master key register is not loaded is reported as
/// [`CcaError::DeviceNotReady`].
pub fn reencipher_key<F: FacilityHandle + ?Sized>(
    facility: &F,
    key_token: &mut [u8],
    direction: ReencipherDirection,
) -> CcaResult<()> {
    if key_token.is_empty() {
        return Err(CcaError::invalid_parameter("key_token", "a key token", "0 bytes"));
    }

    let verbs = facility.resolve()?;
    let key_type = get_key_type(key_token)?;

    let rules = RuleArray::new(&[algorithm_keyword(key_type), direction.keyword()]);
    log::debug!("Changing {} key token: rules: {}", key_type, rules);

    verbs.key_token_change(&rules, key_token).map_err(|err| {
        match err.facility_codes() {
            Some(codes) if codes == RC_MASTER_KEY_NOT_LOADED => {
                CcaError::device_not_ready(Verb::KeyTokenChange, codes.0, codes.1)
            }
            _ => err,
        }
    })?;

    log::info!("Re-enciphered {} key token ({})", key_type, direction);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::NID_SECP384R1;
    use crate::error::{error_codes, ErrorKind};
    use crate::facility::MockFacility;
    use crate::keygen::{generate_ecc_key_pair, generate_rsa_key_pair};
    use crate::token::header::{SECTION_ID_ECC_PRIV, SECTION_ID_RSA_PUBL};
    use crate::token::{find_section, TokenBuilder, MAX_PKA_KEY_TOKEN_SIZE};

    fn ecc_token(facility: &MockFacility) -> Vec<u8> {
        let mut token = vec![0u8; MAX_PKA_KEY_TOKEN_SIZE];
        let length = generate_ecc_key_pair(facility, NID_SECP384R1, &mut token).unwrap();
        token.truncate(length);
        token
    }

    #[test]
    fn test_reencipher_ecc() {
        let facility = MockFacility::new();
        let mut token = ecc_token(&facility);
        let original = token.clone();

        reencipher_key(&facility, &mut token, ReencipherDirection::ToNewMasterKey).unwrap();

        assert_eq!(token.len(), original.len());
        assert_ne!(token, original);
        // still a valid token with the same key type
        assert_eq!(get_key_type(&token).unwrap(), KeyType::Ec);
        let private = find_section(&token, SECTION_ID_ECC_PRIV).unwrap().unwrap();
        assert_eq!(private.len(), find_section(&original, SECTION_ID_ECC_PRIV).unwrap().unwrap().len());

        let calls = facility.calls_to(Verb::KeyTokenChange);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].rules, vec!["ECC", "RTNMK"]);
        assert_eq!(calls[0].data, original);
    }

    #[test]
    fn test_reencipher_rsa_old_to_current() {
        let facility = MockFacility::new();
        let mut token = vec![0u8; MAX_PKA_KEY_TOKEN_SIZE];
        let length = generate_rsa_key_pair(&facility, 2048, 65537, &mut token).unwrap();
        let token = &mut token[..length];

        reencipher_key(&facility, token, ReencipherDirection::OldToCurrent).unwrap();

        let calls = facility.calls_to(Verb::KeyTokenChange);
        assert_eq!(calls[0].rules, vec!["RSA", "RTCMK"]);
    }

    #[test]
    fn test_master_key_not_loaded() {
        let facility = MockFacility::new();
        let mut token = ecc_token(&facility);
        facility.fail_verb(Verb::KeyTokenChange, 12, 764);

        let err = reencipher_key(&facility, &mut token, ReencipherDirection::ToNewMasterKey)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceNotReady);
        assert_eq!(err.errno(), -libc::ENODEV);
        assert_eq!(err.facility_codes(), Some((12, 764)));
    }

    #[test]
    fn test_other_change_failures() {
        let facility = MockFacility::new();
        let mut token = ecc_token(&facility);

        for (return_code, reason_code) in [(12, 765), (8, 764), (16, 0)] {
            facility.fail_verb(Verb::KeyTokenChange, return_code, reason_code);
            let err = reencipher_key(&facility, &mut token, ReencipherDirection::OldToCurrent)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::FacilityFailure);
            assert_eq!(err.errno(), -libc::EIO);
            assert_eq!(err.facility_codes(), Some((return_code, reason_code)));
        }
    }

    #[test]
    fn test_unclassifiable_token_is_not_changed() {
        let facility = MockFacility::new();
        let mut token = TokenBuilder::internal_pka()
            .section(SECTION_ID_ECC_PRIV, 0, &[0u8; 40])
            .build()
            .unwrap();

        let err = reencipher_key(&facility, &mut token, ReencipherDirection::ToNewMasterKey)
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.error_code(), error_codes::UNRECOGNIZED_KEY_TYPE);
        assert!(facility.calls().is_empty());
    }

    #[test]
    fn test_malformed_token_is_not_changed() {
        let facility = MockFacility::new();
        let mut token = TokenBuilder::internal_pka()
            .section(SECTION_ID_RSA_PUBL, 0, &[0u8; 12])
            .declared_length(200)
            .build()
            .unwrap();
        token.resize(200, 0);

        let err = reencipher_key(&facility, &mut token, ReencipherDirection::ToNewMasterKey)
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(facility.calls().is_empty());
    }

    #[test]
    fn test_empty_token() {
        let facility = MockFacility::new();
        let err = reencipher_key(&facility, &mut [], ReencipherDirection::ToNewMasterKey)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
