// Key lifecycle tests: generate, classify, inspect and re-encipher key tokens
// against the in-process facility

use cca_pka::curves::{self, NID_BRAINPOOL_P256R1, NID_PRIME256V1};
use cca_pka::facility::{MockFacility, Verb};
use cca_pka::prelude::*;
use cca_pka::token::MAX_PKA_KEY_TOKEN_SIZE;

#[test]
fn test_ecc_lifecycle() {
    let facility = MockFacility::new();

    let mut token = generate_key_token(&facility, &KeySpec::ecc("prime256v1")).unwrap();
    assert_eq!(get_key_type(&token).unwrap(), KeyType::Ec);

    let public_key = EccPublicKey::from_token(&token).unwrap();
    let jwk = public_key.to_jwk().unwrap();
    match &jwk {
        JsonWebKey::Ec { crv, x, y } => {
            assert_eq!(crv, "P-256");
            // 32 bytes base64url without padding
            assert_eq!(x.len(), 43);
            assert_eq!(y.len(), 43);
        }
        other => panic!("unexpected key: {:?}", other),
    }
    assert_eq!(jwk.thumbprint().len(), 43);

    let before = token.clone();
    reencipher_key(&facility, &mut token, ReencipherDirection::ToNewMasterKey).unwrap();
    reencipher_key(&facility, &mut token, ReencipherDirection::OldToCurrent).unwrap();

    // the public key does not change with the master key
    assert_eq!(EccPublicKey::from_token(&token).unwrap(), public_key);
    assert_eq!(token.len(), before.len());
    assert_eq!(facility.calls_to(Verb::KeyTokenChange).len(), 2);
}

#[test]
fn test_rsa_lifecycle() {
    let facility = MockFacility::new();

    let mut token = vec![0u8; MAX_PKA_KEY_TOKEN_SIZE];
    let length = generate_rsa_key_pair(&facility, 4096, 65537, &mut token).unwrap();
    let token = &mut token[..length];

    assert_eq!(get_key_type(token).unwrap(), KeyType::Rsa);
    let public_key = RsaPublicKey::from_token(token).unwrap();
    assert_eq!(public_key.modulus_bits, 4096);
    assert_eq!(public_key.exponent, vec![0x01, 0x00, 0x01]);
    // private key tokens keep the modulus in the private section
    assert!(public_key.to_jwk().is_err());

    reencipher_key(&facility, token, ReencipherDirection::ToNewMasterKey).unwrap();
    assert_eq!(get_key_type(token).unwrap(), KeyType::Rsa);
}

#[test]
fn test_every_supported_curve() {
    let facility = MockFacility::new();

    for curve in curves::supported_curves() {
        let mut token = [0u8; MAX_PKA_KEY_TOKEN_SIZE];
        let length = generate_ecc_key_pair(&facility, curve.nid, &mut token)
            .unwrap_or_else(|e| panic!("{}: {}", curve.name, e));

        let public_key = EccPublicKey::from_token(&token[..length]).unwrap();
        assert_eq!(public_key.curve().map(|c| c.nid), Some(curve.nid), "{}", curve.name);
        assert_eq!(public_key.q.len(), curve.public_point_len());
        assert_eq!(public_key.to_jwk().is_ok(), curve.jwk_name.is_some());
    }
}

#[test]
fn test_generated_tokens_differ() {
    let facility = MockFacility::new();
    let mut first = [0u8; 512];
    let mut second = [0u8; 512];

    let n1 = generate_ecc_key_pair(&facility, NID_BRAINPOOL_P256R1, &mut first).unwrap();
    let n2 = generate_ecc_key_pair(&facility, NID_BRAINPOOL_P256R1, &mut second).unwrap();
    assert_eq!(n1, n2);
    assert_ne!(first[..n1], second[..n2]);
}

#[test]
fn test_master_key_change_not_ready() {
    let facility = MockFacility::new();
    let mut token = [0u8; 512];
    let length = generate_ecc_key_pair(&facility, NID_PRIME256V1, &mut token).unwrap();
    let original = token;

    facility.fail_verb(Verb::KeyTokenChange, 12, 764);
    let err = reencipher_key(&facility, &mut token[..length], ReencipherDirection::ToNewMasterKey)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeviceNotReady);
    assert!(err.suggested_remediation().is_some());
    // a failed change leaves the token alone
    assert_eq!(token, original);
}

#[test]
fn test_generate_key_pair_into_buffer() {
    let facility = MockFacility::new();
    let config = CcaConfig::default();

    let mut token = [0u8; MAX_PKA_KEY_TOKEN_SIZE];
    let length = generate_key_pair(&facility, &config.key_spec, &mut token).unwrap();
    assert_eq!(get_key_type(&token[..length]).unwrap(), KeyType::Ec);
}

#[test]
fn test_open_facility_without_library() {
    let config = CcaConfig {
        library_path: "/nonexistent/lib/libcsulcca.so".into(),
        ..CcaConfig::default()
    };

    let err = open_facility(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BindingUnavailable);
    assert_eq!(err.errno(), -libc::EIO);
}
