//! Storage key constants.

/// Storage keys used by the session.
pub struct StorageKeys;

impl StorageKeys {
    /// Access token (secret)
    pub const ACCESS_TOKEN: &'static str = "accessToken";

    /// Refresh token (secret)
    pub const REFRESH_TOKEN: &'static str = "refreshToken";

    /// Biometric opt-in flag (plain preference)
    pub const PREFERS_BIOMETRIC: &'static str = "prefersBiometricAuthentication";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_are_unique() {
        let keys = [
            StorageKeys::ACCESS_TOKEN,
            StorageKeys::REFRESH_TOKEN,
            StorageKeys::PREFERS_BIOMETRIC,
        ];
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "Storage keys must be unique");
    }
}
