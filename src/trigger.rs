//! Keyboard hotkey polling for the toggle button
//!
//! Scans the evdev input devices for one advertising the configured key
//! and polls its live key state. Polling is non-blocking so the bridge's
//! cycle cadence is unaffected while the key is up.

use evdev::{Device, Key};
use thiserror::Error;
use tracing::debug;

/// Errors from trigger setup
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("unknown key name '{0}' (expected an evdev key name like 'grave' or 'KEY_F13')")]
    UnknownKey(String),

    #[error("no input device advertising {0:?} found (check /dev/input permissions)")]
    NoDevice(Key),
}

/// Non-blocking external trigger input
pub trait TriggerSource {
    /// Whether the trigger is currently asserted
    fn is_asserted(&mut self) -> bool;
}

impl<T: TriggerSource + ?Sized> TriggerSource for Box<T> {
    fn is_asserted(&mut self) -> bool {
        (**self).is_asserted()
    }
}

/// Trigger that is never asserted (hotkey disabled)
pub struct NoTrigger;

impl TriggerSource for NoTrigger {
    fn is_asserted(&mut self) -> bool {
        false
    }
}

/// Polls one keyboard's key state for the configured key
pub struct KeyTrigger {
    device: Device,
    key: Key,
}

impl KeyTrigger {
    /// Find an input device supporting `key_name` and attach to it
    pub fn open(key_name: &str) -> Result<Self, TriggerError> {
        let key = parse_key(key_name)?;

        for (path, device) in evdev::enumerate() {
            let supported = device
                .supported_keys()
                .map_or(false, |keys| keys.contains(key));
            if supported {
                debug!("polling {:?} on {}", key, path.display());
                return Ok(Self { device, key });
            }
        }
        Err(TriggerError::NoDevice(key))
    }

    /// The key being polled
    pub fn key(&self) -> Key {
        self.key
    }
}

impl TriggerSource for KeyTrigger {
    fn is_asserted(&mut self) -> bool {
        // Treat a failed state read (device unplugged) as "not pressed"
        self.device
            .get_key_state()
            .map(|state| state.contains(self.key))
            .unwrap_or(false)
    }
}

/// Parse a key name, accepting both "grave" and "KEY_GRAVE" spellings
fn parse_key(name: &str) -> Result<Key, TriggerError> {
    let mut canonical = name.to_ascii_uppercase();
    if !canonical.starts_with("KEY_") {
        canonical = format!("KEY_{canonical}");
    }
    canonical
        .parse::<Key>()
        .map_err(|_| TriggerError::UnknownKey(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_accepts_both_spellings() {
        assert_eq!(parse_key("grave").unwrap(), Key::KEY_GRAVE);
        assert_eq!(parse_key("KEY_GRAVE").unwrap(), Key::KEY_GRAVE);
        assert_eq!(parse_key("f13").unwrap(), Key::KEY_F13);
    }

    #[test]
    fn test_parse_key_rejects_nonsense() {
        assert!(matches!(
            parse_key("not-a-key"),
            Err(TriggerError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_no_trigger_is_never_asserted() {
        let mut t = NoTrigger;
        assert!(!t.is_asserted());
    }
}
