//! Modifier key definitions
//!
//! Platform-neutral mirror of the macOS CGEventFlags bits, plus a
//! snapshot struct of the modifiers we care about.

use std::ops::BitOr;

/// Raw modifier bitmask as carried by flags-changed and keyboard events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierFlags(pub u64);

impl ModifierFlags {
    pub const EMPTY: Self = Self(0);
    /// kCGEventFlagMaskShift
    pub const SHIFT: Self = Self(0x0002_0000);
    /// kCGEventFlagMaskControl
    pub const CONTROL: Self = Self(0x0004_0000);
    /// kCGEventFlagMaskAlternate
    pub const OPTION: Self = Self(0x0008_0000);
    /// kCGEventFlagMaskCommand
    pub const COMMAND: Self = Self(0x0010_0000);

    pub fn bits(self) -> u64 {
        self.0
    }

    /// True if every bit of `other` is set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ModifierFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Which modifiers are currently pressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Control key is held
    pub control: bool,
    /// Option/Alt key is held
    pub option: bool,
    /// Command key is held
    pub command: bool,
    /// Shift key is held
    pub shift: bool,
}

impl ModifierState {
    pub fn from_flags(flags: ModifierFlags) -> Self {
        Self {
            control: flags.contains(ModifierFlags::CONTROL),
            option: flags.contains(ModifierFlags::OPTION),
            command: flags.contains(ModifierFlags::COMMAND),
            shift: flags.contains(ModifierFlags::SHIFT),
        }
    }

    /// Check if all modifiers are released
    pub fn is_empty(&self) -> bool {
        !self.control && !self.option && !self.command && !self.shift
    }
}
