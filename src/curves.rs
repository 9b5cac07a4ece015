/*!
 * Elliptic curve parameters known to the CCA ECC key token formats
 *
 * Curves are identified by their OpenSSL numeric identifiers (NIDs), the same
 * numbering key-management clients use when they name a curve.
 */

use serde::{Deserialize, Serialize};

pub const NID_PRIME192V1: i32 = 409;
pub const NID_SECP224R1: i32 = 713;
pub const NID_PRIME256V1: i32 = 415;
pub const NID_SECP384R1: i32 = 715;
pub const NID_SECP521R1: i32 = 716;
pub const NID_BRAINPOOL_P160R1: i32 = 921;
pub const NID_BRAINPOOL_P192R1: i32 = 923;
pub const NID_BRAINPOOL_P224R1: i32 = 925;
pub const NID_BRAINPOOL_P256R1: i32 = 927;
pub const NID_BRAINPOOL_P320R1: i32 = 929;
pub const NID_BRAINPOOL_P384R1: i32 = 931;
pub const NID_BRAINPOOL_P512R1: i32 = 933;

/// Curve family tag as stored in key-value structures and ECC token sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveFamily {
    /// NIST prime curves
    Prime,
    /// Brainpool r1 curves
    Brainpool,
}

impl CurveFamily {
    /// Wire value of the family tag
    pub fn to_byte(self) -> u8 {
        match self {
            CurveFamily::Prime => 0x00,
            CurveFamily::Brainpool => 0x01,
        }
    }

    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(CurveFamily::Prime),
            0x01 => Some(CurveFamily::Brainpool),
            _ => None,
        }
    }
}

/// Static description of a supported curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveInfo {
    pub nid: i32,
    pub name: &'static str,
    pub family: CurveFamily,
    pub prime_bits: u16,
    /// Curve name registered for JSON Web Keys, if any
    pub jwk_name: Option<&'static str>,
}

impl CurveInfo {
    /// Size in bytes of one field element
    pub fn coordinate_len(&self) -> usize {
        (self.prime_bits as usize + 7) / 8
    }

    /// Size in bytes of an uncompressed public point
    pub fn public_point_len(&self) -> usize {
        1 + 2 * self.coordinate_len()
    }
}

const CURVES: &[CurveInfo] = &[
    CurveInfo {
        nid: NID_PRIME192V1,
        name: "prime192v1",
        family: CurveFamily::Prime,
        prime_bits: 192,
        jwk_name: None,
    },
    CurveInfo {
        nid: NID_SECP224R1,
        name: "secp224r1",
        family: CurveFamily::Prime,
        prime_bits: 224,
        jwk_name: None,
    },
    CurveInfo {
        nid: NID_PRIME256V1,
        name: "prime256v1",
        family: CurveFamily::Prime,
        prime_bits: 256,
        jwk_name: Some("P-256"),
    },
    CurveInfo {
        nid: NID_SECP384R1,
        name: "secp384r1",
        family: CurveFamily::Prime,
        prime_bits: 384,
        jwk_name: Some("P-384"),
    },
    CurveInfo {
        nid: NID_SECP521R1,
        name: "secp521r1",
        family: CurveFamily::Prime,
        prime_bits: 521,
        jwk_name: Some("P-521"),
    },
    CurveInfo {
        nid: NID_BRAINPOOL_P160R1,
        name: "brainpoolP160r1",
        family: CurveFamily::Brainpool,
        prime_bits: 160,
        jwk_name: None,
    },
    CurveInfo {
        nid: NID_BRAINPOOL_P192R1,
        name: "brainpoolP192r1",
        family: CurveFamily::Brainpool,
        prime_bits: 192,
        jwk_name: None,
    },
    CurveInfo {
        nid: NID_BRAINPOOL_P224R1,
        name: "brainpoolP224r1",
        family: CurveFamily::Brainpool,
        prime_bits: 224,
        jwk_name: None,
    },
    CurveInfo {
        nid: NID_BRAINPOOL_P256R1,
        name: "brainpoolP256r1",
        family: CurveFamily::Brainpool,
        prime_bits: 256,
        jwk_name: None,
    },
    CurveInfo {
        nid: NID_BRAINPOOL_P320R1,
        name: "brainpoolP320r1",
        family: CurveFamily::Brainpool,
        prime_bits: 320,
        jwk_name: None,
    },
    CurveInfo {
        nid: NID_BRAINPOOL_P384R1,
        name: "brainpoolP384r1",
        family: CurveFamily::Brainpool,
        prime_bits: 384,
        jwk_name: None,
    },
    CurveInfo {
        nid: NID_BRAINPOOL_P512R1,
        name: "brainpoolP512r1",
        family: CurveFamily::Brainpool,
        prime_bits: 512,
        jwk_name: None,
    },
];

/// Look up a curve by NID
pub fn curve_info(nid: i32) -> Option<&'static CurveInfo> {
    CURVES.iter().find(|curve| curve.nid == nid)
}

pub fn is_prime_curve(nid: i32) -> bool {
    matches!(curve_info(nid), Some(curve) if curve.family == CurveFamily::Prime)
}

pub fn is_brainpool_curve(nid: i32) -> bool {
    matches!(curve_info(nid), Some(curve) if curve.family == CurveFamily::Brainpool)
}

/// Bit length of the curve's prime
pub fn curve_prime_bits(nid: i32) -> Option<u16> {
    curve_info(nid).map(|curve| curve.prime_bits)
}

/// Look up a curve by its OpenSSL short name or JOSE name
pub fn curve_by_name(name: &str) -> Option<&'static CurveInfo> {
    CURVES.iter().find(|curve| {
        curve.name.eq_ignore_ascii_case(name)
            || curve.jwk_name.map_or(false, |jwk| jwk.eq_ignore_ascii_case(name))
    })
}

/// Reverse lookup from the fields found in an ECC token section
pub fn curve_by_family_and_bits(family: CurveFamily, prime_bits: u16) -> Option<&'static CurveInfo> {
    CURVES
        .iter()
        .find(|curve| curve.family == family && curve.prime_bits == prime_bits)
}

/// All curves the CCA ECC formats support
pub fn supported_curves() -> &'static [CurveInfo] {
    CURVES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_classification() {
        assert!(is_prime_curve(NID_PRIME256V1));
        assert!(!is_brainpool_curve(NID_PRIME256V1));
        assert!(is_brainpool_curve(NID_BRAINPOOL_P320R1));
        assert!(!is_prime_curve(NID_BRAINPOOL_P320R1));

        // secp256k1 is neither
        assert!(!is_prime_curve(714));
        assert!(!is_brainpool_curve(714));
    }

    #[test]
    fn test_prime_bits() {
        assert_eq!(curve_prime_bits(NID_SECP521R1), Some(521));
        assert_eq!(curve_prime_bits(NID_BRAINPOOL_P512R1), Some(512));
        assert_eq!(curve_prime_bits(0), None);
    }

    #[test]
    fn test_name_lookup() {
        assert_eq!(curve_by_name("P-384").map(|c| c.nid), Some(NID_SECP384R1));
        assert_eq!(curve_by_name("brainpoolp256r1").map(|c| c.nid), Some(NID_BRAINPOOL_P256R1));
        assert!(curve_by_name("secp256k1").is_none());
    }

    #[test]
    fn test_point_length() {
        let p521 = curve_info(NID_SECP521R1).unwrap();
        assert_eq!(p521.coordinate_len(), 66);
        assert_eq!(p521.public_point_len(), 133);
        assert_eq!(
            curve_by_family_and_bits(CurveFamily::Brainpool, 384).map(|c| c.nid),
            Some(NID_BRAINPOOL_P384R1)
        );
    }
}
