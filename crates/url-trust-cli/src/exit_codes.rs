//! Exit codes for `url-trust`.
//! Scripts branch on these, so they are part of the public contract.
//!
//! Library errors map through [`TrustError::exit_code`]: 2 for config and
//! key material, 3 for registry or relay failures, 4 for signing.

use url_trust::TrustError;

pub const SUCCESS: i32 = 0;
pub const NOT_TRUSTED: i32 = 1; // Verification ran and said no
pub const CONFIG_ERROR: i32 = 2; // Bad arguments, key file or key material

/// Exit code for a failed command, taken from the library error when there is one.
pub fn for_error(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<TrustError>()
        .map(TrustError::exit_code)
        .unwrap_or(CONFIG_ERROR)
}
