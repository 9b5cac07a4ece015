#![no_main]

use cca_pka::token::{
    find_section, get_key_type, sections, EccPublicKey, RsaPublicKey,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Section lookup with every identifier the scanner may meet
    for section_id in [0x02u8, 0x04, 0x05, 0x06, 0x08, 0x09, 0x20, 0x21, 0x30, 0x31] {
        if let Ok(Some(section)) = find_section(data, section_id) {
            assert!(section.offset() + section.len() <= data.len());
            assert_eq!(section.identifier(), section_id);
        }
    }

    // Iteration terminates
    if let Ok(iter) = sections(data) {
        let _ = iter.count();
    }

    if get_key_type(data).is_ok() {
        let _ = EccPublicKey::from_token(data).and_then(|key| key.to_jwk());
        let _ = RsaPublicKey::from_token(data).and_then(|key| key.to_jwk());
    }
});
