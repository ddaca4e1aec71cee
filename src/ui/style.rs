//! Console palette and glyphs
//!
//! Colors go through `colored`, so `colored::control::set_override(false)`
//! (set by `--no-color` / `NO_COLOR`) turns every style below into plain text.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::{Colorize, CustomColor};

/// When true, glyphs and bars use plain ASCII instead of Unicode.
static ASCII_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_ascii_mode(enabled: bool) {
    ASCII_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_ascii_mode() -> bool {
    ASCII_MODE.load(Ordering::Relaxed)
}

pub struct Palette;

impl Palette {
    pub const AMBER: CustomColor = CustomColor {
        r: 212,
        g: 163,
        b: 115,
    };
    pub const BLOOM: CustomColor = CustomColor {
        r: 144,
        g: 190,
        b: 109,
    };
    pub const COPPER: CustomColor = CustomColor {
        r: 184,
        g: 115,
        b: 51,
    };
    pub const WILT: CustomColor = CustomColor {
        r: 188,
        g: 108,
        b: 37,
    };
    pub const STONE: CustomColor = CustomColor {
        r: 128,
        g: 128,
        b: 128,
    };
}

/// Semantic styling for console elements
pub trait TimelineStyle {
    fn heading(self) -> colored::ColoredString;
    fn step_name(self) -> colored::ColoredString;
    fn success(self) -> colored::ColoredString;
    fn warning(self) -> colored::ColoredString;
    fn timestamp(self) -> colored::ColoredString;
    fn muted(self) -> colored::ColoredString;
}

impl TimelineStyle for &str {
    fn heading(self) -> colored::ColoredString {
        self.custom_color(Palette::AMBER).bold()
    }

    fn step_name(self) -> colored::ColoredString {
        self.custom_color(Palette::COPPER).bold()
    }

    fn success(self) -> colored::ColoredString {
        self.custom_color(Palette::BLOOM)
    }

    fn warning(self) -> colored::ColoredString {
        self.custom_color(Palette::WILT)
    }

    fn timestamp(self) -> colored::ColoredString {
        self.custom_color(Palette::STONE).dimmed()
    }

    fn muted(self) -> colored::ColoredString {
        self.custom_color(Palette::STONE)
    }
}

pub struct Glyphs;

impl Glyphs {
    pub fn play() -> &'static str {
        if is_ascii_mode() {
            ">"
        } else {
            "▶"
        }
    }
    pub fn done() -> &'static str {
        if is_ascii_mode() {
            "[ok]"
        } else {
            "✔"
        }
    }
    pub fn branch() -> &'static str {
        if is_ascii_mode() {
            "[+]"
        } else {
            "⤷"
        }
    }
    pub fn stop() -> &'static str {
        if is_ascii_mode() {
            "[x]"
        } else {
            "■"
        }
    }
}

/// Render a fixed-width bar for `ratio` in `[0, 1]`.
pub fn progress_bar(ratio: f64, width: usize) -> String {
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let empty = width - filled;
    let (full, blank) = if is_ascii_mode() {
        ("#", ".")
    } else {
        ("█", "░")
    };
    format!("{}{}", full.repeat(filled), blank.repeat(empty))
}
