/*!
 * CCA key token format
 *
 * This module implements the binary layout of CCA PKA key tokens: the token and
 * section headers, the key-value structures used to build key skeletons, the
 * section scanner, key type classification and public key extraction.
 */

pub mod classify;
pub mod header;
pub mod key_values;
pub mod public_key;
pub mod scanner;


pub use classify::get_key_type;
pub use classify::KeyType;
pub use header::SectionHeader;
pub use header::TokenBuilder;
pub use header::TokenHeader;
pub use header::MAX_PKA_KEY_TOKEN_SIZE;
pub use key_values::EccKeyValues;
pub use key_values::RsaKeyValues;
pub use public_key::EccPublicKey;
pub use public_key::JsonWebKey;
pub use public_key::RsaPublicKey;
pub use scanner::find_section;
pub use scanner::sections;
pub use scanner::Section;
