// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status_reasons.rs`

#[cfg(test)]
mod tests {
    use crate::status_reasons::*;
    use std::collections::HashSet;

    const ALL_REASONS: &[&str] = &[
        REASON_RECONCILING,
        REASON_CONFIGURED,
        REASON_NO_MAC_ADDRESSES,
        REASON_ERROR,
        REASON_NETWORK_NAMESPACE_NOT_FOUND,
        REASON_RESERVATION_FAILED,
        REASON_SUBNET_NOT_FOUND,
        REASON_KEA_UNSUPPORTED,
        REASON_KEA_COMMAND_FAILED,
        REASON_KEA_UNREACHABLE,
        REASON_KEA_TIMEOUT,
        REASON_KEA_MALFORMED_RESPONSE,
        REASON_INVALID_CONFIGURATION,
    ];

    #[test]
    fn test_reasons_are_camel_case() {
        for reason in ALL_REASONS {
            assert!(
                reason.chars().next().is_some_and(char::is_uppercase),
                "{reason} should start with an uppercase letter"
            );
            assert!(
                reason.chars().all(char::is_alphanumeric),
                "{reason} should contain only letters and digits"
            );
        }
    }

    #[test]
    fn test_reasons_are_unique() {
        let unique: HashSet<_> = ALL_REASONS.iter().collect();
        assert_eq!(unique.len(), ALL_REASONS.len());
    }

    #[test]
    fn test_reason_values() {
        assert_eq!(REASON_CONFIGURED, "Configured");
        assert_eq!(REASON_NO_MAC_ADDRESSES, "NoMACAddresses");
        assert_eq!(REASON_KEA_UNSUPPORTED, "KeaCommandUnsupported");
    }
}
