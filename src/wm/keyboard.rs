//! Keyboard Module
//!
//! Key and button bindings: keysym and modifier names from the
//! configuration, passive grabs on each root, and lookup of the action for
//! an incoming key press.

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, warn};
use x11rb::protocol::xproto::Window;

use crate::config::KeysConfig;
use crate::wm::client_flags::MaximiseFlags;
use crate::wm::display::DisplayServer;
use crate::wm::keymove::{Corner, Direction};

// Core modifier bits
const SHIFT_MASK: u16 = 1 << 0;
const LOCK_MASK: u16 = 1 << 1;
const CONTROL_MASK: u16 = 1 << 2;
const MOD1_MASK: u16 = 1 << 3;
const MOD2_MASK: u16 = 1 << 4;
const MOD3_MASK: u16 = 1 << 5;
const MOD4_MASK: u16 = 1 << 6;
const MOD5_MASK: u16 = 1 << 7;

/// Errors in user supplied binding names
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("unknown key name {0:?}")]
    UnknownKey(String),
    #[error("unknown modifier name {0:?}")]
    UnknownModifier(String),
}

/// Keyboard shortcut action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Show desktop N on the output under the pointer
    SwitchDesktop(u32),
    PrevDesktop,
    NextDesktop,
    /// Back to the desktop shown before the last switch
    ToggleDesktop,
    Fix,
    Info,
    Maximise(MaximiseFlags),
    ExchangeOutputs,
    ToggleDocks,
    Expand,
    Lower,
    Next,
    /// Ask the current client to close
    Close,
    /// Kill the current client's connection
    Kill,
    Nudge(Direction),
    /// Resize by one size increment
    Resize(Direction),
    Corner(Corner),
}

/// Mouse button action on a client frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Drag,
    Sweep,
    Lower,
}

impl ButtonAction {
    pub fn from_button(button: u8) -> Option<Self> {
        match button {
            1 => Some(ButtonAction::Drag),
            2 => Some(ButtonAction::Sweep),
            3 => Some(ButtonAction::Lower),
            _ => None,
        }
    }
}

/// Key binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    /// Modifier mask
    pub modifiers: u16,
    pub keysym: u32,
    pub action: KeyAction,
}

/// Translate a keysym name. Covers the names the default bindings use plus
/// the printable ASCII range.
pub fn keysym_from_name(name: &str) -> Option<u32> {
    let named = match name {
        "Tab" => Some(0xff09),
        "Return" => Some(0xff0d),
        "Escape" => Some(0xff1b),
        "Left" => Some(0xff51),
        "Up" => Some(0xff52),
        "Right" => Some(0xff53),
        "Down" => Some(0xff54),
        "Insert" => Some(0xff63),
        "KP_Insert" => Some(0xff9e),
        "Delete" => Some(0xffff),
        "space" => Some(0x20),
        "equal" => Some(0x3d),
        "minus" => Some(0x2d),
        "plus" => Some(0x2b),
        "comma" => Some(0x2c),
        "period" => Some(0x2e),
        "slash" => Some(0x2f),
        _ => None,
    };
    if named.is_some() {
        return named;
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_graphic() => Some(c.to_ascii_lowercase() as u32),
        _ => None,
    }
}

/// Translate a modifier name to its mask bit.
pub fn modifier_from_name(name: &str) -> Option<u16> {
    match name {
        "Shift" => Some(SHIFT_MASK),
        "Lock" => Some(LOCK_MASK),
        "Control" | "Ctrl" => Some(CONTROL_MASK),
        "Mod1" | "Alt" => Some(MOD1_MASK),
        "Mod2" => Some(MOD2_MASK),
        "Mod3" => Some(MOD3_MASK),
        "Mod4" | "Super" => Some(MOD4_MASK),
        "Mod5" => Some(MOD5_MASK),
        _ => None,
    }
}

fn parse_modifiers(names: &[String]) -> Result<u16, BindingError> {
    names.iter().try_fold(0u16, |mask, name| {
        modifier_from_name(name)
            .map(|bit| mask | bit)
            .ok_or_else(|| BindingError::UnknownModifier(name.clone()))
    })
}

fn parse_key(name: &str) -> Result<u32, BindingError> {
    keysym_from_name(name).ok_or_else(|| BindingError::UnknownKey(name.to_string()))
}

/// Every binding in force, resolved to masks and keysyms
#[derive(Debug, Clone)]
pub struct Bindings {
    pub keys: Vec<KeyBinding>,
    /// Held during a drag or sweep to change its behaviour
    pub alt_mask: u16,
    pub button_mask: u16,
}

impl Bindings {
    pub fn from_config(config: &KeysConfig) -> Result<Self, BindingError> {
        let mask = parse_modifiers(&config.modifiers)?;
        let next_mask = parse_modifiers(&config.next_modifiers)?;
        let alt_mask = parse_modifiers(&config.alt_modifiers)?;

        let mut keys = Vec::new();
        let mut bind = |modifiers: u16, name: &str, action: KeyAction| -> Result<(), BindingError> {
            keys.push(KeyBinding {
                modifiers,
                keysym: parse_key(name)?,
                action,
            });
            Ok(())
        };

        // 1..9 then 0 select desktops 0..9
        for n in 0..10u32 {
            let digit = char::from(b'0' + ((n + 1) % 10) as u8).to_string();
            bind(mask, &digit, KeyAction::SwitchDesktop(n))?;
        }
        bind(mask, &config.prev_desktop, KeyAction::PrevDesktop)?;
        bind(mask, &config.next_desktop, KeyAction::NextDesktop)?;
        bind(mask, &config.toggle_desktop, KeyAction::ToggleDesktop)?;
        bind(mask, &config.fix, KeyAction::Fix)?;
        bind(mask, &config.info, KeyAction::Info)?;
        bind(mask, &config.maximise, KeyAction::Maximise(MaximiseFlags::HORZ | MaximiseFlags::VERT))?;
        bind(mask, &config.maximise_vert, KeyAction::Maximise(MaximiseFlags::VERT))?;
        bind(mask, &config.fullscreen, KeyAction::Maximise(MaximiseFlags::FULLSCREEN))?;
        bind(mask, &config.exchange, KeyAction::ExchangeOutputs)?;
        bind(mask, &config.docks, KeyAction::ToggleDocks)?;
        bind(mask, &config.expand, KeyAction::Expand)?;
        bind(mask, &config.lower, KeyAction::Lower)?;
        bind(mask, &config.close, KeyAction::Close)?;
        bind(next_mask, &config.next, KeyAction::Next)?;

        for (name, direction) in [
            (&config.move_left, Direction::Left),
            (&config.move_right, Direction::Right),
            (&config.move_up, Direction::Up),
            (&config.move_down, Direction::Down),
        ] {
            bind(mask, name, KeyAction::Nudge(direction))?;
            bind(mask | alt_mask, name, KeyAction::Resize(direction))?;
        }
        for (name, corner) in [
            (&config.top_left, Corner::TopLeft),
            (&config.top_right, Corner::TopRight),
            (&config.bottom_left, Corner::BottomLeft),
            (&config.bottom_right, Corner::BottomRight),
        ] {
            bind(mask, name, KeyAction::Corner(corner))?;
        }

        // The alt modifier turns close into kill and a vertical maximise
        // into a horizontal one
        bind(mask | alt_mask, &config.close, KeyAction::Kill)?;
        bind(mask | alt_mask, &config.maximise_vert, KeyAction::Maximise(MaximiseFlags::HORZ))?;

        Ok(Self {
            keys,
            alt_mask,
            button_mask: parse_modifiers(&config.button_modifiers)?,
        })
    }

    /// Strip Lock and NumLock so bindings match regardless of either.
    pub fn clean_mask(state: u16, numlock_mask: u16) -> u16 {
        state & !(LOCK_MASK | numlock_mask) & 0xff
    }

    pub fn lookup(&self, keysym: u32, state: u16, numlock_mask: u16) -> Option<KeyAction> {
        let state = Self::clean_mask(state, numlock_mask);
        self.keys
            .iter()
            .find(|b| b.keysym == keysym && b.modifiers == state)
            .map(|b| b.action)
    }

    /// Modifier combinations to grab so Lock and NumLock do not matter.
    fn lock_combinations(mask: u16, numlock_mask: u16) -> Vec<u16> {
        let mut combos = vec![mask, mask | LOCK_MASK];
        if numlock_mask != 0 {
            combos.push(mask | numlock_mask);
            combos.push(mask | numlock_mask | LOCK_MASK);
        }
        combos
    }

    /// Release previous grabs on `root` and grab every bound key.
    pub fn grab_keys<D: DisplayServer>(&self, display: &mut D, root: Window) -> Result<()> {
        display.ungrab_keys(root)?;
        let numlock = display.numlock_mask();
        for binding in &self.keys {
            let keycodes = display.keysym_to_keycodes(binding.keysym);
            if keycodes.is_empty() {
                warn!("No keycode for keysym 0x{:x}, {:?} unbound", binding.keysym, binding.action);
                continue;
            }
            for keycode in keycodes {
                for modifiers in Self::lock_combinations(binding.modifiers, numlock) {
                    display.grab_key(root, modifiers, keycode)?;
                }
            }
        }
        debug!("Grabbed {} key bindings on root 0x{:x}", self.keys.len(), root);
        Ok(())
    }

    /// Grab the drag/sweep/lower buttons on a client frame.
    pub fn grab_buttons<D: DisplayServer>(&self, display: &mut D, frame: Window) -> Result<()> {
        let numlock = display.numlock_mask();
        for button in 1..=3 {
            for modifiers in Self::lock_combinations(self.button_mask, numlock) {
                display.grab_button(frame, modifiers, button)?;
            }
        }
        Ok(())
    }
}
