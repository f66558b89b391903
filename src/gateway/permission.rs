//! Trusted-input permission checks
//!
//! Active taps only receive events once the process is trusted for
//! accessibility. The check runs once at startup.

use serde::{Deserialize, Serialize};

use super::GatewayError;

/// Result of the permission status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionReport {
    /// Process is trusted for accessibility / input monitoring
    pub trusted: bool,
    /// Daemon version
    pub version: String,
}

impl PermissionReport {
    /// Query the current status without prompting
    pub fn current() -> Self {
        Self {
            trusted: is_trusted(false),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Fail with `PermissionDenied` unless the process is trusted.
/// Shows the system grant dialog when it is not.
pub fn ensure_trusted() -> Result<(), GatewayError> {
    if is_trusted(true) {
        Ok(())
    } else {
        Err(GatewayError::PermissionDenied)
    }
}

#[cfg(target_os = "macos")]
pub fn is_trusted(prompt: bool) -> bool {
    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
    use core_foundation::string::CFString;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
    }

    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let value = if prompt {
        CFBoolean::true_value()
    } else {
        CFBoolean::false_value()
    };
    let options = CFDictionary::from_CFType_pairs(&[(key.as_CFType(), value.as_CFType())]);

    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()) }
}

#[cfg(not(target_os = "macos"))]
pub fn is_trusted(_prompt: bool) -> bool {
    false
}
