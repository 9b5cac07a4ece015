//! Section scanner for CCA internal PKA key tokens.

use super::header::{
    SectionHeader, TokenHeader, SECTION_HEADER_SIZE, TOKEN_HEADER_SIZE, TOKEN_VERS1_V0,
};
use crate::error::{error_codes, CcaError, CcaResult};

/// A section located inside a caller's key token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    offset: usize,
    header: SectionHeader,
    bytes: &'a [u8],
}

impl<'a> Section<'a> {
    pub fn identifier(&self) -> u8 {
        self.header.identifier
    }

    pub fn version(&self) -> u8 {
        self.header.version
    }

    /// Offset of the section from the start of the token
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The whole section, header included
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The section without its header
    pub fn body(&self) -> &'a [u8] {
        &self.bytes[SECTION_HEADER_SIZE..]
    }
}

/// Validate the token header of an internal PKA token, version 0
pub fn validate_pka_token(key_token: &[u8]) -> CcaResult<TokenHeader> {
    let header = TokenHeader::parse(key_token)?;

    let token_length = header.token_length as usize;
    if token_length > key_token.len() {
        return Err(CcaError::malformed_token(
            &format!(
                "token length {} exceeds the buffer size {}",
                token_length,
                key_token.len()
            ),
            2,
            error_codes::TOKEN_LENGTH_EXCEEDS_BUFFER,
        ));
    }
    if token_length < TOKEN_HEADER_SIZE {
        return Err(CcaError::malformed_token(
            &format!("token length {} is smaller than the token header", token_length),
            2,
            error_codes::TOKEN_TOO_SHORT,
        ));
    }
    if !header.is_internal_pka() {
        return Err(CcaError::malformed_token(
            &format!("not an internal PKA token: identifier {:#04x}", header.identifier),
            0,
            error_codes::NOT_INTERNAL_PKA_TOKEN,
        ));
    }
    if header.version1 != TOKEN_VERS1_V0 {
        return Err(CcaError::malformed_token(
            &format!("invalid token version {:#04x}", header.version1),
            1,
            error_codes::UNSUPPORTED_TOKEN_VERSION,
        ));
    }

    Ok(header)
}

/// Iterator over the sections of a validated token.
///
/// Every yielded section lies within the declared token length, so a section
/// running past the end is an error here even though [`find_section`] skips
/// over it. After the first error the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct Sections<'a> {
    token: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Iterator for Sections<'a> {
    type Item = CcaResult<Section<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.token.len() {
            return None;
        }

        match read_section(self.token, self.offset) {
            Ok(section) => {
                self.offset += section.len();
                Some(Ok(section))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

fn read_section(token: &[u8], offset: usize) -> CcaResult<Section<'_>> {
    let header = read_section_header(token, offset)?;
    bounded_section(token, offset, header)
}

// Headers shorter than themselves would stall the walk
fn read_section_header(token: &[u8], offset: usize) -> CcaResult<SectionHeader> {
    let header = SectionHeader::parse(token, offset)?;

    let length = header.length as usize;
    if length < SECTION_HEADER_SIZE {
        return Err(CcaError::malformed_token(
            &format!(
                "section {:#04x} has length {}, smaller than its header",
                header.identifier, length
            ),
            offset,
            error_codes::SECTION_LENGTH_INVALID,
        ));
    }

    Ok(header)
}

fn bounded_section(token: &[u8], offset: usize, header: SectionHeader) -> CcaResult<Section<'_>> {
    let end = offset + header.length as usize;
    if end > token.len() {
        return Err(CcaError::malformed_token(
            &format!(
                "section {:#04x} exceeds the token length ({} > {})",
                header.identifier,
                end,
                token.len()
            ),
            offset,
            error_codes::SECTION_EXCEEDS_TOKEN,
        ));
    }

    Ok(Section {
        offset,
        header,
        bytes: &token[offset..end],
    })
}

/// Iterate over the sections of an internal PKA key token
pub fn sections(key_token: &[u8]) -> CcaResult<Sections<'_>> {
    let header = validate_pka_token(key_token)?;

    Ok(Sections {
        token: &key_token[..header.token_length as usize],
        offset: TOKEN_HEADER_SIZE,
        failed: false,
    })
}

/// Find the section with identifier `section_id`.
///
/// Only the matching section has to end within the token. A section that runs
/// past the end before a match simply ends the walk, and the result is
/// `Ok(None)`. Truncated section headers and lengths shorter than a section
/// header are errors wherever they occur, as are tokens that are not internal
/// PKA tokens.
pub fn find_section(key_token: &[u8], section_id: u8) -> CcaResult<Option<Section<'_>>> {
    let header = validate_pka_token(key_token)?;
    let token = &key_token[..header.token_length as usize];

    let scan_error = |err: CcaError| {
        log::debug!(
            "Scanning key token (header {}) failed: {}",
            hex::encode(&key_token[..TOKEN_HEADER_SIZE]),
            err
        );
        err
    };

    let mut offset = TOKEN_HEADER_SIZE;
    while offset < token.len() {
        let section_header = read_section_header(token, offset).map_err(scan_error)?;
        if section_header.identifier == section_id {
            return bounded_section(token, offset, section_header)
                .map(Some)
                .map_err(scan_error);
        }
        offset += section_header.length as usize;
    }

    log::debug!("Section {:#04x} not found", section_id);
    Ok(None)
}

/// Like [`find_section`], but a missing section is an error
pub fn require_section(key_token: &[u8], section_id: u8) -> CcaResult<Section<'_>> {
    find_section(key_token, section_id)?.ok_or_else(|| {
        CcaError::malformed_token(
            &format!("section {:#04x} not found", section_id),
            TOKEN_HEADER_SIZE,
            error_codes::SECTION_NOT_FOUND,
        )
    })
}
