//! macOS key tap using CGEventTap.
//!
//! This implementation installs an active (not listen-only) Core Graphics
//! event tap for system-defined events so volume keys can be swallowed before
//! the OS volume HUD sees them. It requires Accessibility permission.

use super::backend::{KeyEventHandler, KeyTap, RawKeyEvent, SystemDefinedPayload, TapDisposition};
use super::event::NX_SYSDEFINED;
use crate::error::BridgeError;
use objc2::runtime::AnyObject;
use objc2::{class, msg_send};
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long `enable` waits for the tap thread to report success.
const TAP_STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

/// macOS key tap using CGEventTap
pub struct MacOSKeyTap {
    /// Whether the tap thread should keep running
    running: Arc<AtomicBool>,
    /// Event handler installed by `register`
    handler: Option<KeyEventHandler>,
    /// Handle to the tap thread
    thread_handle: Option<JoinHandle<()>>,
}

/// Returns true if the process currently has macOS Accessibility permission.
/// This is safe to call at any time and does not show a system dialog.
fn check_accessibility_permission() -> bool {
    unsafe { macos_ffi::AXIsProcessTrusted() }
}

/// Prompt macOS to show the Accessibility permission dialog for this process.
/// Returns the current trust state.
fn request_accessibility_permission() -> bool {
    unsafe {
        let key = macos_ffi::kAXTrustedCheckOptionPrompt as macos_ffi::CFTypeRef;
        let value = macos_ffi::kCFBooleanTrue;

        let options = macos_ffi::CFDictionaryCreate(
            std::ptr::null(),
            &key,
            &value,
            1,
            &macos_ffi::kCFTypeDictionaryKeyCallBacks,
            &macos_ffi::kCFTypeDictionaryValueCallBacks,
        );

        if options.is_null() {
            error!("[Hotkey] Failed to create CFDictionary for AXIsProcessTrustedWithOptions");
            return macos_ffi::AXIsProcessTrusted();
        }

        let trusted = macos_ffi::AXIsProcessTrustedWithOptions(options);
        macos_ffi::CFRelease(options as macos_ffi::CFTypeRef);
        info!(
            "[Hotkey] AXIsProcessTrustedWithOptions(prompt=true) returned: {}",
            trusted
        );
        trusted
    }
}

impl MacOSKeyTap {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            handler: None,
            thread_handle: None,
        }
    }
}

impl KeyTap for MacOSKeyTap {
    fn register(&mut self, handler: KeyEventHandler) -> Result<(), BridgeError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(BridgeError::HotkeyUnavailable(
                "cannot replace the handler of a running tap".to_string(),
            ));
        }
        self.handler = Some(handler);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), BridgeError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let handler = self.handler.clone().ok_or_else(|| {
            BridgeError::HotkeyUnavailable("no key event handler registered".to_string())
        })?;

        if !check_accessibility_permission() {
            request_accessibility_permission();
            let msg = "Volume keys require Accessibility permission. Grant it to volbridged in System Settings > Privacy & Security > Accessibility, then restart the daemon.".to_string();
            info!("[Hotkey] Accessibility permission not granted");
            return Err(BridgeError::HotkeyUnavailable(msg));
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("volbridge-keytap".to_string())
            .spawn(move || {
                info!("[Hotkey] Starting macOS event tap for volume keys");

                if let Err(e) = run_event_tap(running.clone(), handler, ready_tx) {
                    error!("[Hotkey] Event tap error: {}", e);
                }
                running.store(false, Ordering::SeqCst);

                info!("[Hotkey] Event tap thread exiting");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                BridgeError::HotkeyUnavailable(format!("failed to spawn tap thread: {}", e))
            })?;
        self.thread_handle = Some(handle);

        match ready_rx.recv_timeout(TAP_STARTUP_TIMEOUT) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => {
                self.disable();
                Err(BridgeError::HotkeyUnavailable(reason))
            }
            Err(_) => {
                self.disable();
                Err(BridgeError::HotkeyUnavailable(
                    "event tap did not start in time".to_string(),
                ))
            }
        }
    }

    fn disable(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        // The thread will exit when it detects running is false
        if let Some(handle) = self.thread_handle.take() {
            info!("[Hotkey] Stopping event tap");
            let _ = handle.join();
        }
    }

    fn is_enabled(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for MacOSKeyTap {
    fn drop(&mut self) {
        self.disable();
    }
}

struct EventTapContext {
    handler: KeyEventHandler,
    /// The tap's mach port, for re-enabling after the system disables it
    tap: AtomicPtr<std::ffi::c_void>,
}

/// Run the CGEventTap on this thread
fn run_event_tap(
    running: Arc<AtomicBool>,
    handler: KeyEventHandler,
    ready: Sender<Result<(), String>>,
) -> Result<(), String> {
    unsafe {
        let event_mask = 1u64 << NX_SYSDEFINED;

        let context = Box::new(EventTapContext {
            handler,
            tap: AtomicPtr::new(std::ptr::null_mut()),
        });
        let context_ptr = Box::into_raw(context);

        let tap = macos_ffi::CGEventTapCreate(
            macos_ffi::kCGSessionEventTap,
            macos_ffi::kCGHeadInsertEventTap,
            macos_ffi::kCGEventTapOptionDefault,
            event_mask,
            event_tap_callback,
            context_ptr as *mut std::ffi::c_void,
        );

        if tap.is_null() {
            let _ = Box::from_raw(context_ptr);
            let msg = "Failed to create event tap. Check Accessibility permissions.".to_string();
            let _ = ready.send(Err(msg.clone()));
            return Err(msg);
        }
        (*context_ptr).tap.store(tap, Ordering::SeqCst);

        let run_loop_source = macos_ffi::CFMachPortCreateRunLoopSource(std::ptr::null(), tap, 0);

        if run_loop_source.is_null() {
            macos_ffi::CFRelease(tap as *const std::ffi::c_void);
            let _ = Box::from_raw(context_ptr);
            let msg = "Failed to create run loop source".to_string();
            let _ = ready.send(Err(msg.clone()));
            return Err(msg);
        }

        let run_loop = macos_ffi::CFRunLoopGetCurrent();
        macos_ffi::CFRunLoopAddSource(run_loop, run_loop_source, macos_ffi::kCFRunLoopCommonModes);

        macos_ffi::CGEventTapEnable(tap, true);

        debug!("[Hotkey] Event tap created and enabled");
        let _ = ready.send(Ok(()));

        while running.load(Ordering::SeqCst) {
            let result = macos_ffi::CFRunLoopRunInMode(macos_ffi::kCFRunLoopDefaultMode, 0.1, true);

            if result == macos_ffi::kCFRunLoopRunFinished {
                break;
            }
        }

        macos_ffi::CGEventTapEnable(tap, false);
        macos_ffi::CFRunLoopRemoveSource(
            run_loop,
            run_loop_source,
            macos_ffi::kCFRunLoopCommonModes,
        );
        macos_ffi::CFRelease(run_loop_source as *const std::ffi::c_void);
        macos_ffi::CFRelease(tap as *const std::ffi::c_void);
        let _ = Box::from_raw(context_ptr);

        debug!("[Hotkey] Event tap cleaned up");
    }

    Ok(())
}

extern "C" fn event_tap_callback(
    _proxy: macos_ffi::CGEventTapProxy,
    event_type: macos_ffi::CGEventType,
    event: macos_ffi::CGEventRef,
    user_info: *mut std::ffi::c_void,
) -> macos_ffi::CGEventRef {
    let context = unsafe { &*(user_info as *const EventTapContext) };

    if event_type == macos_ffi::kCGEventTapDisabledByTimeout
        || event_type == macos_ffi::kCGEventTapDisabledByUserInput
    {
        warn!("[Hotkey] Event tap disabled by the system ({:#x}); re-enabling", event_type);
        let tap = context.tap.load(Ordering::SeqCst);
        if !tap.is_null() {
            unsafe { macos_ffi::CGEventTapEnable(tap, true) };
        }
        return event;
    }

    let raw = RawKeyEvent {
        event_type,
        payload: system_defined_payload(event_type, event),
    };

    match (context.handler)(raw) {
        TapDisposition::Consume => std::ptr::null_mut(),
        TapDisposition::PassThrough => event,
    }
}

/// Read the `NSEvent` subtype and `data1` of a system-defined event.
fn system_defined_payload(
    event_type: macos_ffi::CGEventType,
    event: macos_ffi::CGEventRef,
) -> Option<SystemDefinedPayload> {
    if event_type != NX_SYSDEFINED || event.is_null() {
        return None;
    }

    objc2::rc::autoreleasepool(|_| unsafe {
        let ns_event: *mut AnyObject = msg_send![class!(NSEvent), eventWithCGEvent: event];
        if ns_event.is_null() {
            return None;
        }
        let subtype: i16 = msg_send![ns_event, subtype];
        let data1: isize = msg_send![ns_event, data1];
        Some(SystemDefinedPayload {
            subtype,
            data1: data1 as i64,
        })
    })
}

/// FFI bindings for macOS APIs
#[allow(non_upper_case_globals)]
mod macos_ffi {
    use std::ffi::c_void;

    // Types
    pub type CGEventTapProxy = *mut c_void;
    pub type CGEventRef = *mut c_void;
    pub type CGEventType = u32;
    pub type CFMachPortRef = *mut c_void;
    pub type CFRunLoopSourceRef = *mut c_void;
    pub type CFRunLoopRef = *mut c_void;
    pub type CFAllocatorRef = *const c_void;
    pub type CFStringRef = *const c_void;
    pub type CFTypeRef = *const c_void;

    // Pseudo event types delivered when the system turns the tap off
    pub const kCGEventTapDisabledByTimeout: CGEventType = 0xFFFF_FFFE;
    pub const kCGEventTapDisabledByUserInput: CGEventType = 0xFFFF_FFFF;

    // Event tap locations
    pub const kCGSessionEventTap: u32 = 1;
    pub const kCGHeadInsertEventTap: u32 = 0;
    pub const kCGEventTapOptionDefault: u32 = 0;

    // Run loop constants
    pub const kCFRunLoopRunFinished: i32 = 1;

    // Callback type
    pub type CGEventTapCallBack =
        extern "C" fn(CGEventTapProxy, CGEventType, CGEventRef, *mut c_void) -> CGEventRef;

    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        pub static kCFRunLoopCommonModes: CFStringRef;
        pub static kCFRunLoopDefaultMode: CFStringRef;

        pub fn CFRunLoopGetCurrent() -> CFRunLoopRef;
        pub fn CFRunLoopAddSource(rl: CFRunLoopRef, source: CFRunLoopSourceRef, mode: CFStringRef);
        pub fn CFRunLoopRemoveSource(
            rl: CFRunLoopRef,
            source: CFRunLoopSourceRef,
            mode: CFStringRef,
        );
        pub fn CFRunLoopRunInMode(
            mode: CFStringRef,
            seconds: f64,
            return_after_source_handled: bool,
        ) -> i32;
        pub fn CFMachPortCreateRunLoopSource(
            allocator: CFAllocatorRef,
            port: CFMachPortRef,
            order: i64,
        ) -> CFRunLoopSourceRef;
        pub fn CFRelease(cf: CFTypeRef);
    }

    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        pub fn CGEventTapCreate(
            tap: u32,
            place: u32,
            options: u32,
            events_of_interest: u64,
            callback: CGEventTapCallBack,
            user_info: *mut c_void,
        ) -> CFMachPortRef;
        pub fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
    }

    // NSEvent lives in AppKit
    #[link(name = "AppKit", kind = "framework")]
    extern "C" {}

    // Additional CoreFoundation types for AXIsProcessTrustedWithOptions
    pub type CFDictionaryRef = *const c_void;
    pub type CFIndex = isize;

    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        pub static kCFBooleanTrue: CFTypeRef;
        pub static kCFTypeDictionaryKeyCallBacks: c_void;
        pub static kCFTypeDictionaryValueCallBacks: c_void;
        pub fn CFDictionaryCreate(
            allocator: CFAllocatorRef,
            keys: *const CFTypeRef,
            values: *const CFTypeRef,
            num_values: CFIndex,
            key_callbacks: *const c_void,
            value_callbacks: *const c_void,
        ) -> CFDictionaryRef;
    }

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        pub static kAXTrustedCheckOptionPrompt: CFStringRef;

        pub fn AXIsProcessTrusted() -> bool;
        pub fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
    }
}
