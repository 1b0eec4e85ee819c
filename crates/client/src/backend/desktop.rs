//! Live desktop backend: primary-monitor capture, synthetic keys, and a
//! polled stop hotkey.
use anyhow::{Context, Result};
use bot_core::{
    CaptureError, Frame, FrameSource, InputDevice, InputError, Key, StopSignal, SystemClock,
};
use client_bootstrap::Backends;
use device_query::{DeviceQuery, DeviceState, Keycode};
use enigo::{Direction as KeyDirection, Enigo, Keyboard, Settings};

pub fn backends(stop_key: Key) -> Result<Backends> {
    let screen = ScreenCapture::primary().context("Failed to open the primary monitor")?;
    let keyboard = SyntheticKeyboard::new()?;
    let hotkey = Hotkey::new(stop_key)?;
    tracing::info!("Press {} to stop", stop_key);

    Ok(Backends {
        frames: Box::new(screen),
        input: Box::new(keyboard),
        stop: Box::new(hotkey),
        clock: Box::new(SystemClock::new()),
    })
}

/// Full-screen capture of the primary monitor.
pub struct ScreenCapture {
    monitor: xcap::Monitor,
}

impl ScreenCapture {
    pub fn primary() -> Result<Self, CaptureError> {
        let monitors = xcap::Monitor::all().map_err(|e| CaptureError::Backend(e.to_string()))?;
        let primary = monitors.iter().position(|m| m.is_primary()).unwrap_or(0);
        let monitor = monitors
            .into_iter()
            .nth(primary)
            .ok_or(CaptureError::NoDisplay)?;
        tracing::info!(
            "Capturing monitor '{}' ({}x{})",
            monitor.name(),
            monitor.width(),
            monitor.height()
        );
        Ok(Self { monitor })
    }
}

impl FrameSource for ScreenCapture {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let rgba = self
            .monitor
            .capture_image()
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        Ok(image::DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}

/// Key events injected through the OS input API.
pub struct SyntheticKeyboard {
    enigo: Enigo,
}

impl SyntheticKeyboard {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow::anyhow!("Failed to connect to the input system: {e}"))?;
        Ok(Self { enigo })
    }

    fn send(&mut self, key: Key, direction: KeyDirection) -> Result<(), InputError> {
        self.enigo
            .key(enigo_key(key)?, direction)
            .map_err(|e| InputError::Backend(e.to_string()))
    }
}

impl InputDevice for SyntheticKeyboard {
    fn press(&mut self, key: Key) -> Result<(), InputError> {
        self.send(key, KeyDirection::Press)
    }

    fn release(&mut self, key: Key) -> Result<(), InputError> {
        self.send(key, KeyDirection::Release)
    }
}

fn enigo_key(key: Key) -> Result<enigo::Key, InputError> {
    use enigo::Key as E;

    let mapped = match key {
        Key::Left => E::LeftArrow,
        Key::Right => E::RightArrow,
        Key::Up => E::UpArrow,
        Key::Down => E::DownArrow,
        Key::Space => E::Space,
        Key::Enter => E::Return,
        Key::Tab => E::Tab,
        Key::Escape => E::Escape,
        Key::Shift => E::Shift,
        Key::Control => E::Control,
        Key::Alt => E::Alt,
        Key::Delete => E::Delete,
        Key::Home => E::Home,
        Key::End => E::End,
        Key::PageUp => E::PageUp,
        Key::PageDown => E::PageDown,
        Key::Function(1) => E::F1,
        Key::Function(2) => E::F2,
        Key::Function(3) => E::F3,
        Key::Function(4) => E::F4,
        Key::Function(5) => E::F5,
        Key::Function(6) => E::F6,
        Key::Function(7) => E::F7,
        Key::Function(8) => E::F8,
        Key::Function(9) => E::F9,
        Key::Function(10) => E::F10,
        Key::Function(11) => E::F11,
        Key::Function(12) => E::F12,
        Key::Function(_) => return Err(InputError::Unsupported(key)),
        Key::Char(c) => E::Unicode(c),
    };
    Ok(mapped)
}

/// Stops the loop while the configured key is held down.
pub struct Hotkey {
    device: DeviceState,
    codes: Vec<Keycode>,
}

impl Hotkey {
    pub fn new(key: Key) -> Result<Self> {
        let codes = keycodes(key)
            .with_context(|| format!("Key '{key}' cannot be used as the stop hotkey"))?;
        Ok(Self {
            device: DeviceState::new(),
            codes,
        })
    }
}

impl StopSignal for Hotkey {
    fn should_stop(&mut self) -> bool {
        let pressed = self.device.get_keys();
        self.codes.iter().any(|code| pressed.contains(code))
    }
}

fn keycodes(key: Key) -> Result<Vec<Keycode>> {
    let codes = match key {
        Key::Left => vec![Keycode::Left],
        Key::Right => vec![Keycode::Right],
        Key::Up => vec![Keycode::Up],
        Key::Down => vec![Keycode::Down],
        Key::Space => vec![Keycode::Space],
        Key::Enter => vec![Keycode::Enter],
        Key::Tab => vec![Keycode::Tab],
        Key::Escape => vec![Keycode::Escape],
        Key::Shift => vec![Keycode::LShift, Keycode::RShift],
        Key::Control => vec![Keycode::LControl, Keycode::RControl],
        Key::Alt => vec![Keycode::LAlt, Keycode::RAlt],
        Key::Delete => vec![Keycode::Delete],
        Key::Home => vec![Keycode::Home],
        Key::End => vec![Keycode::End],
        Key::PageUp => vec![Keycode::PageUp],
        Key::PageDown => vec![Keycode::PageDown],
        Key::Function(n) => vec![parse_keycode(&format!("F{n}"))?],
        Key::Char(c) if c.is_ascii_digit() => vec![parse_keycode(&format!("Key{c}"))?],
        Key::Char(c) => vec![parse_keycode(&c.to_ascii_uppercase().to_string())?],
    };
    Ok(codes)
}

fn parse_keycode(name: &str) -> Result<Keycode> {
    name.parse::<Keycode>()
        .map_err(|e| anyhow::anyhow!("no keycode named {name}: {e}"))
}
