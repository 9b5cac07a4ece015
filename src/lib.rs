/*!
 * CCA PKA key token library
 *
 * This crate drives an IBM CCA cryptographic coprocessor through the CCA host
 * library to work with internal PKA (public key algorithm) key tokens:
 *
 * - ECC and RSA key pair generation under the current master key
 * - key type classification of existing tokens
 * - re-enciphering tokens during a master key change
 * - public key extraction and JSON Web Key export
 *
 * Key tokens are opaque byte buffers owned by the caller. The coprocessor is
 * reached through a [`FacilityHandle`]: [`CcaLibrary`] loads the host library,
 * [`MockFacility`] answers the same verbs in process.
 *
 * ```
 * use cca_pka::prelude::*;
 *
 * fn main() -> Result<(), CcaError> {
 *     let facility = MockFacility::new();
 *
 *     let mut token = generate_key_token(&facility, &KeySpec::ecc("P-256"))?;
 *     assert_eq!(get_key_type(&token)?, KeyType::Ec);
 *
 *     reencipher_key(&facility, &mut token, ReencipherDirection::ToNewMasterKey)?;
 *     Ok(())
 * }
 * ```
 */

/// Common error types
pub mod error;

/// Elliptic curves supported by the coprocessor
pub mod curves;

/// Key token layout, scanning and classification
pub mod token;

/// Binding to the CCA host library verbs
pub mod facility;

/// ECC and RSA key pair generation
pub mod keygen;

/// Master key change for key tokens
pub mod reencipher;

/// Library configuration
pub mod config;

pub use config::CcaConfig;
pub use error::{CcaError, CcaResult, ErrorKind};
pub use facility::{CcaLibrary, FacilityHandle, MockFacility, PkaVerbs};
pub use keygen::{
    generate_ecc_key_pair, generate_key_pair, generate_key_token, generate_rsa_key_pair, KeySpec,
};
pub use reencipher::{reencipher_key, ReencipherDirection};
pub use token::{get_key_type, KeyType};

/// Open the CCA host library named by `config`
pub fn open_facility(config: &CcaConfig) -> CcaResult<CcaLibrary> {
    config.validate()?;
    CcaLibrary::from_config(config)
}

/// The types and operations most callers need.
pub mod prelude {
    pub use crate::config::CcaConfig;
    pub use crate::error::{CcaError, CcaResult, ErrorKind};
    pub use crate::facility::{CcaLibrary, FacilityHandle, MockFacility};
    pub use crate::keygen::{
        generate_ecc_key_pair, generate_key_pair, generate_key_token, generate_rsa_key_pair,
        KeySpec,
    };
    pub use crate::open_facility;
    pub use crate::reencipher::{reencipher_key, ReencipherDirection};
    pub use crate::token::{get_key_type, EccPublicKey, JsonWebKey, KeyType, RsaPublicKey};
}
