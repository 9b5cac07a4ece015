#![no_main]

use arbitrary::Arbitrary;
use cca_pka::facility::{MockFacility, Verb};
use cca_pka::{reencipher_key, ReencipherDirection};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct ReencipherFuzzInput {
    token: Vec<u8>,
    to_new_master_key: bool,
    change_fails: Option<(i16, i16)>,
}

fuzz_target!(|input: ReencipherFuzzInput| {
    let facility = MockFacility::new();
    if let Some((return_code, reason_code)) = input.change_fails {
        facility.fail_verb(Verb::KeyTokenChange, return_code.into(), reason_code.into());
    }

    let direction = if input.to_new_master_key {
        ReencipherDirection::ToNewMasterKey
    } else {
        ReencipherDirection::OldToCurrent
    };

    let mut token = input.token.clone();
    let result = reencipher_key(&facility, &mut token, direction);

    // Token length never changes, and unclassifiable tokens never reach the facility
    assert_eq!(token.len(), input.token.len());
    if let Err(err) = result {
        if err.is_invalid_argument() {
            assert!(facility.calls().is_empty());
            assert_eq!(token, input.token);
        }
    }
});
