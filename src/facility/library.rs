/*!
 * CCA host library binding
 *
 * Loads the CCA host library (libcsulcca) and resolves the PKA verbs from it by
 * symbol name. Each call to [`FacilityHandle::resolve`] looks the symbols up again.
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr;

use libc::{c_long, c_uchar};
use libloading::{Library, Symbol};
use zeroize::Zeroizing;

use super::{
    check_output_length, check_status, FacilityHandle, PkaVerbs, RuleArray, Verb, KEY_ID_SIZE,
};
use crate::config::CcaConfig;
use crate::error::{error_codes, CcaError, CcaResult};

/// CSNDPKB, PKA key token build
type CsndpkbFn = unsafe extern "C" fn(
    return_code: *mut c_long,
    reason_code: *mut c_long,
    exit_data_length: *mut c_long,
    exit_data: *mut c_uchar,
    rule_array_count: *mut c_long,
    rule_array: *mut c_uchar,
    key_values_structure_length: *mut c_long,
    key_values_structure: *mut c_uchar,
    key_name_length: *mut c_long,
    key_name: *mut c_uchar,
    reserved_1_length: *mut c_long,
    reserved_1: *mut c_uchar,
    reserved_2_length: *mut c_long,
    reserved_2: *mut c_uchar,
    reserved_3_length: *mut c_long,
    reserved_3: *mut c_uchar,
    reserved_4_length: *mut c_long,
    reserved_4: *mut c_uchar,
    reserved_5_length: *mut c_long,
    reserved_5: *mut c_uchar,
    token_length: *mut c_long,
    token: *mut c_uchar,
);

/// CSNDPKG, PKA key generate
type CsndpkgFn = unsafe extern "C" fn(
    return_code: *mut c_long,
    reason_code: *mut c_long,
    exit_data_length: *mut c_long,
    exit_data: *mut c_uchar,
    rule_array_count: *mut c_long,
    rule_array: *mut c_uchar,
    regeneration_data_length: *mut c_long,
    regeneration_data: *mut c_uchar,
    skeleton_key_token_length: *mut c_long,
    skeleton_key_token: *mut c_uchar,
    transport_key_identifier: *mut c_uchar,
    generated_key_identifier_length: *mut c_long,
    generated_key_identifier: *mut c_uchar,
);

/// CSNDKTC, PKA key token change
type CsndktcFn = unsafe extern "C" fn(
    return_code: *mut c_long,
    reason_code: *mut c_long,
    exit_data_length: *mut c_long,
    exit_data: *mut c_uchar,
    rule_array_count: *mut c_long,
    rule_array: *mut c_uchar,
    key_identifier_length: *mut c_long,
    key_identifier: *mut c_uchar,
);

/// A loaded CCA host library
pub struct CcaLibrary {
    library: Library,
    path: PathBuf,
}

impl fmt::Debug for CcaLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CcaLibrary").field("path", &self.path).finish()
    }
}

impl CcaLibrary {
    /// Load the host library at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> CcaResult<Self> {
        let path = path.as_ref().to_path_buf();
        log::info!("Loading CCA host library: {}", path.display());

        // SAFETY: loading runs the library's initializers; the CCA host library
        // has no initialization-order requirements towards this process.
        let library = unsafe { Library::new(&path) }.map_err(|e| {
            CcaError::binding_unavailable(
                &path.display().to_string(),
                &format!("Failed to load CCA host library: {}", e),
                error_codes::LIBRARY_LOAD_FAILED,
            )
        })?;

        Ok(Self { library, path })
    }

    /// Load the host library named by the configuration
    pub fn from_config(config: &CcaConfig) -> CcaResult<Self> {
        Self::open(&config.library_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FacilityHandle for CcaLibrary {
    fn resolve(&self) -> CcaResult<Box<dyn PkaVerbs + '_>> {
        let verbs = CcaVerbs {
            build: lookup(&self.library, Verb::KeyTokenBuild)?,
            generate: lookup(&self.library, Verb::KeyGenerate)?,
            change: lookup(&self.library, Verb::KeyTokenChange)?,
        };
        Ok(Box::new(verbs))
    }
}

fn lookup<'lib, T>(library: &'lib Library, verb: Verb) -> CcaResult<Symbol<'lib, T>> {
    let name = format!("{}\0", verb.entry_point());

    // SAFETY: T is the documented prototype of the verb named by `name`.
    unsafe { library.get::<T>(name.as_bytes()) }.map_err(|e| {
        log::warn!("Failed to get {} from the CCA host library: {}", verb.entry_point(), e);
        CcaError::binding_unavailable(verb.entry_point(), &e.to_string(), error_codes::ENTRY_POINT_MISSING)
    })
}

/// Verb entry points resolved from a [`CcaLibrary`]
struct CcaVerbs<'lib> {
    build: Symbol<'lib, CsndpkbFn>,
    generate: Symbol<'lib, CsndpkgFn>,
    change: Symbol<'lib, CsndktcFn>,
}

impl PkaVerbs for CcaVerbs<'_> {
    fn key_token_build(
        &self,
        rules: &RuleArray,
        key_values: &[u8],
        skeleton: &mut [u8],
    ) -> CcaResult<usize> {
        let mut return_code: c_long = 0;
        let mut reason_code: c_long = 0;
        let mut exit_data_length: c_long = 0;
        let mut rule_array_count = rules.len() as c_long;
        let mut rule_array = rules.to_bytes();
        let mut key_values_length = key_values.len() as c_long;
        let mut key_values = key_values.to_vec();
        let mut key_name_length: c_long = 0;
        let mut key_name = [0u8; KEY_ID_SIZE];
        let mut reserved_length: c_long = 0;
        let reserved_length: *mut c_long = &mut reserved_length;
        let mut skeleton_length = skeleton.len() as c_long;

        // SAFETY: every pointer refers to a live local or to `skeleton`, whose
        // capacity is passed in `skeleton_length`.
        unsafe {
            (*self.build)(
                &mut return_code,
                &mut reason_code,
                &mut exit_data_length,
                ptr::null_mut(),
                &mut rule_array_count,
                rule_array.as_mut_ptr(),
                &mut key_values_length,
                key_values.as_mut_ptr(),
                &mut key_name_length,
                key_name.as_mut_ptr(),
                reserved_length,
                ptr::null_mut(),
                reserved_length,
                ptr::null_mut(),
                reserved_length,
                ptr::null_mut(),
                reserved_length,
                ptr::null_mut(),
                reserved_length,
                ptr::null_mut(),
                &mut skeleton_length,
                skeleton.as_mut_ptr(),
            );
        }

        check_status(Verb::KeyTokenBuild, return_code.into(), reason_code.into())?;
        check_output_length(Verb::KeyTokenBuild, skeleton_length.into(), skeleton.len())
    }

    fn key_generate(
        &self,
        rules: &RuleArray,
        skeleton: &[u8],
        key_token: &mut [u8],
    ) -> CcaResult<usize> {
        let mut return_code: c_long = 0;
        let mut reason_code: c_long = 0;
        let mut rule_array_count = rules.len() as c_long;
        let mut rule_array = rules.to_bytes();
        let mut regeneration_data_length: c_long = 0;
        let mut regeneration_data = [0u8; KEY_ID_SIZE];
        let mut skeleton_length = skeleton.len() as c_long;
        let mut skeleton = Zeroizing::new(skeleton.to_vec());
        let mut transport_key_identifier = [0u8; KEY_ID_SIZE];
        let mut token_length = key_token.len() as c_long;

        // SAFETY: as for CSNDPKB; `key_token` capacity is passed in `token_length`.
        unsafe {
            (*self.generate)(
                &mut return_code,
                &mut reason_code,
                ptr::null_mut(),
                ptr::null_mut(),
                &mut rule_array_count,
                rule_array.as_mut_ptr(),
                &mut regeneration_data_length,
                regeneration_data.as_mut_ptr(),
                &mut skeleton_length,
                skeleton.as_mut_ptr(),
                transport_key_identifier.as_mut_ptr(),
                &mut token_length,
                key_token.as_mut_ptr(),
            );
        }

        check_status(Verb::KeyGenerate, return_code.into(), reason_code.into())?;
        check_output_length(Verb::KeyGenerate, token_length.into(), key_token.len())
    }

    fn key_token_change(&self, rules: &RuleArray, key_token: &mut [u8]) -> CcaResult<()> {
        let mut return_code: c_long = 0;
        let mut reason_code: c_long = 0;
        let mut exit_data_length: c_long = 0;
        let mut rule_array_count = rules.len() as c_long;
        let mut rule_array = rules.to_bytes();
        let mut token_length = key_token.len() as c_long;

        // SAFETY: as for CSNDPKB; the token is changed in place within its length.
        unsafe {
            (*self.change)(
                &mut return_code,
                &mut reason_code,
                &mut exit_data_length,
                ptr::null_mut(),
                &mut rule_array_count,
                rule_array.as_mut_ptr(),
                &mut token_length,
                key_token.as_mut_ptr(),
            );
        }

        check_status(Verb::KeyTokenChange, return_code.into(), reason_code.into())?;
        check_output_length(Verb::KeyTokenChange, token_length.into(), key_token.len())?;
        Ok(())
    }
}
