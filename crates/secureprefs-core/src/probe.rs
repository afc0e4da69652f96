use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

/// Raised by the legacy lock-pattern setting lookup when the platform does
/// not carry the setting at all. A missing setting is a normal negative
/// answer, never a failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("lock screen setting not found: {name}")]
pub struct SettingNotFound {
    pub name: String,
}

/// Host-supplied facts about the device lock screen. Implementations are
/// provided by the embedding layer (or by test fakes); this crate only
/// decides which facts to consult.
pub trait LockScreen: Send + Sync {
    /// Whether the platform generation offers the unified device-secure
    /// query.
    fn supports_unified_query(&self) -> bool;

    /// Unified query: a lock-screen credential of any kind (PIN, pattern,
    /// password, biometric) is configured.
    fn device_secure(&self) -> bool;

    /// Legacy keyguard check. Known to report SIM locks as secure, which
    /// is why the legacy path cross-checks the lock-pattern setting.
    fn keyguard_secure(&self) -> bool;

    /// Legacy lock-pattern setting lookup.
    fn lock_pattern_enabled(&self) -> Result<bool, SettingNotFound>;
}

/// Computes the device-protection answer. Selected once at initialization;
/// probing itself can never fail.
pub trait DeviceSecurityProbe: Send + Sync {
    fn is_device_protected(&self) -> bool;
}

/// Probe for platforms with a single authoritative device-secure query.
pub struct UnifiedProbe {
    lock: Arc<dyn LockScreen>,
}

impl UnifiedProbe {
    pub fn new(lock: Arc<dyn LockScreen>) -> Self {
        Self { lock }
    }
}

impl DeviceSecurityProbe for UnifiedProbe {
    fn is_device_protected(&self) -> bool {
        self.lock.device_secure()
    }
}

/// Dual-check probe for platform generations predating the unified query:
/// the device counts as protected if either the keyguard or the
/// lock-pattern setting says so.
pub struct LegacyProbe {
    lock: Arc<dyn LockScreen>,
}

impl LegacyProbe {
    pub fn new(lock: Arc<dyn LockScreen>) -> Self {
        Self { lock }
    }
}

impl DeviceSecurityProbe for LegacyProbe {
    fn is_device_protected(&self) -> bool {
        let pattern_set = self.lock.lock_pattern_enabled().unwrap_or(false);
        self.lock.keyguard_secure() || pattern_set
    }
}

/// Select the probe variant matching the host platform's capabilities.
pub fn select_probe(lock: Arc<dyn LockScreen>) -> Box<dyn DeviceSecurityProbe> {
    if lock.supports_unified_query() {
        debug!("using unified device-security probe");
        Box::new(UnifiedProbe::new(lock))
    } else {
        debug!("using legacy keyguard/lock-pattern probe");
        Box::new(LegacyProbe::new(lock))
    }
}

/// Lock screen with a fixed, host-injected answer. Used by embedders that
/// already know the device state (and by the CLI, which reads it from
/// config).
pub struct StaticLockScreen {
    protected: bool,
}

impl StaticLockScreen {
    pub fn new(protected: bool) -> Self {
        Self { protected }
    }
}

impl LockScreen for StaticLockScreen {
    fn supports_unified_query(&self) -> bool {
        true
    }

    fn device_secure(&self) -> bool {
        self.protected
    }

    fn keyguard_secure(&self) -> bool {
        self.protected
    }

    fn lock_pattern_enabled(&self) -> Result<bool, SettingNotFound> {
        Ok(self.protected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLockScreen {
        unified: Option<bool>,
        keyguard: bool,
        pattern: Result<bool, SettingNotFound>,
    }

    impl LockScreen for FakeLockScreen {
        fn supports_unified_query(&self) -> bool {
            self.unified.is_some()
        }

        fn device_secure(&self) -> bool {
            self.unified.unwrap_or(false)
        }

        fn keyguard_secure(&self) -> bool {
            self.keyguard
        }

        fn lock_pattern_enabled(&self) -> Result<bool, SettingNotFound> {
            self.pattern.clone()
        }
    }

    #[test]
    fn unified_platform_uses_unified_answer() {
        let probe = select_probe(Arc::new(FakeLockScreen {
            unified: Some(true),
            // Legacy facts disagree; they must not be consulted.
            keyguard: false,
            pattern: Ok(false),
        }));
        assert!(probe.is_device_protected());
    }

    #[test]
    fn legacy_platform_ors_keyguard_and_pattern() {
        let keyguard_only = select_probe(Arc::new(FakeLockScreen {
            unified: None,
            keyguard: true,
            pattern: Ok(false),
        }));
        assert!(keyguard_only.is_device_protected());

        let pattern_only = select_probe(Arc::new(FakeLockScreen {
            unified: None,
            keyguard: false,
            pattern: Ok(true),
        }));
        assert!(pattern_only.is_device_protected());

        let neither = select_probe(Arc::new(FakeLockScreen {
            unified: None,
            keyguard: false,
            pattern: Ok(false),
        }));
        assert!(!neither.is_device_protected());
    }

    #[test]
    fn missing_setting_counts_as_unprotected() {
        let probe = select_probe(Arc::new(FakeLockScreen {
            unified: None,
            keyguard: false,
            pattern: Err(SettingNotFound {
                name: "lock_pattern_enabled".into(),
            }),
        }));
        assert!(!probe.is_device_protected());
    }

    #[test]
    fn static_lock_screen_reports_injected_answer() {
        let probe = select_probe(Arc::new(StaticLockScreen::new(true)));
        assert!(probe.is_device_protected());
        // Stable across repeated calls.
        assert!(probe.is_device_protected());
    }
}
