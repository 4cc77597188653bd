//! Error handlers
//!
//! Provides error reporting and exit code mapping for the binary.

use crate::error::types::BundleError;
use log::error;

/// Handle a bundle error
pub fn handle_error(err: &BundleError) {
    error!("Storage bundle error: {}", err);
}

/// Convert error to a process exit code
pub fn error_to_exit_code(err: &BundleError) -> i32 {
    match err {
        BundleError::Config(_) => 78,
        BundleError::Registry(_) => 78,
        BundleError::UnknownAdapter { .. } => 78,
        BundleError::Resolve(_) => 70,
        BundleError::Adapter(_) => 70,
        BundleError::Mount(_) => 70,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::types::{RegistryError, ResolveError};

    #[test]
    fn test_configuration_errors_map_to_config_exit_code() {
        let err = BundleError::Registry(RegistryError::DuplicateStorage("a".into()));
        assert_eq!(error_to_exit_code(&err), 78);
    }

    #[test]
    fn test_resolution_errors_map_to_software_exit_code() {
        let err = BundleError::Resolve(ResolveError::StorageNotFound("a".into()));
        assert_eq!(error_to_exit_code(&err), 70);
    }
}
