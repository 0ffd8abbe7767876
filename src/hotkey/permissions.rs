//! Startup checks for global key access
//!
//! A failed check is reported once as [`HotkeyError::PermissionDenied`].
//! Callers log it and start the listener anyway, since some setups work
//! without the access these probes look for.

use crate::error::HotkeyError;

/// Check whether this process can observe (and optionally grab) global keys
pub fn check(suppress_passthrough: bool) -> Result<(), HotkeyError> {
    #[cfg(target_os = "macos")]
    {
        let _ = suppress_passthrough;
        // AXIsProcessTrusted is cached per process; the tap probe is not
        if !check_accessibility_permission() && !is_accessibility_granted() {
            return Err(HotkeyError::PermissionDenied(
                "Accessibility permission not granted. Grant access in: \
                 System Settings > Privacy & Security > Accessibility, then restart clipstamp"
                    .to_string(),
            ));
        }
        Ok(())
    }

    #[cfg(target_os = "linux")]
    {
        if suppress_passthrough {
            if is_root() {
                return Ok(());
            }
            return probe_input_devices();
        }
        if std::env::var_os("DISPLAY").is_none() {
            return Err(HotkeyError::PermissionDenied(
                "No X11 display (DISPLAY is unset). Global key events cannot be observed; \
                 run under X11/XWayland or enable block mode with access to /dev/input"
                    .to_string(),
            ));
        }
        Ok(())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = suppress_passthrough;
        Ok(())
    }
}

/// Whether the process runs with an effective user id of root
#[cfg(unix)]
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

/// Grabbing on Linux reads keyboards straight from /dev/input
#[cfg(target_os = "linux")]
fn probe_input_devices() -> Result<(), HotkeyError> {
    use evdev::{Device, Key};

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| HotkeyError::PermissionDenied(format!("/dev/input: {}", e)))?;

    let mut denied = 0usize;
    for entry in input_dir.flatten() {
        let path = entry.path();
        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);
        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                let is_keyboard = device
                    .supported_keys()
                    .map(|keys| keys.contains(Key::KEY_A) && keys.contains(Key::KEY_ENTER))
                    .unwrap_or(false);
                if is_keyboard {
                    tracing::debug!(
                        "Keyboard readable: {:?} ({})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    return Ok(());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => denied += 1,
            Err(e) => tracing::trace!("Skipping {:?}: {}", path, e),
        }
    }

    let reason = if denied > 0 {
        "Cannot read keyboards in /dev/input. Add your user to the 'input' group \
         (sudo usermod -aG input $USER) and log out and back in, or run as root"
    } else {
        "No keyboard found in /dev/input"
    };
    Err(HotkeyError::PermissionDenied(reason.to_string()))
}

/// Check if Accessibility permission is granted by trying to create an event tap.
#[cfg(target_os = "macos")]
fn is_accessibility_granted() -> bool {
    use core_graphics::event::{
        CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    };

    CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        |_, _, _| None,
    )
    .is_ok()
}

/// Check if Accessibility permission is granted, prompting the user if not.
///
/// Calls AXIsProcessTrustedWithOptions with kAXTrustedCheckOptionPrompt=true,
/// which makes macOS show the "App wants to control this computer" dialog
/// if permission hasn't been granted yet.
#[cfg(target_os = "macos")]
fn check_accessibility_permission() -> bool {
    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrustedWithOptions(options: core_foundation::base::CFTypeRef) -> bool;
    }

    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFDictionary;
    use core_foundation::string::CFString;

    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let value = CFBoolean::true_value();
    let options = CFDictionary::from_CFType_pairs(&[(key.as_CFType(), value.as_CFType())]);

    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef() as _) }
}
