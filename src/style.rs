//! Colors, themes and text helpers for reporter output.
//!
//! The palette a reporter draws with depends on two inputs: the terminal's
//! [`ColorLevel`] and the configured theme name. Terminals below 256 colors
//! always get the base ANSI palette; richer terminals get the theme's hex
//! colors, downsampled to the xterm cube when 24-bit color is unavailable.
//!
//! ```rust,ignore
//! let palette = Palette::resolve("solarized", ColorLevel::TrueColor);
//! let text = paint("4.00s", palette.get(ColorType::Failure), ColorLevel::TrueColor);
//! ```

use std::sync::OnceLock;

use owo_colors::{AnsiColors, OwoColorize, XtermColors};
use regex::Regex;
use unicode_width::UnicodeWidthChar;

/// Color support of the output terminal, ordered from none to 24-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ColorLevel {
    #[default]
    None,
    Basic,
    Ansi256,
    TrueColor,
}

/// Semantic color slot, chosen from a task's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorType {
    Failure,
    Pending,
    Success,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Bold,
    Dim,
    Italic,
    Underline,
    Inverse,
    Strikethrough,
}

/// One palette entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Ansi(AnsiColors),
    Rgb(u8, u8, u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub failure: Paint,
    pub pending: Paint,
    pub success: Paint,
    pub warning: Paint,
}

impl Palette {
    /// The ANSI-16 palette every terminal with color understands.
    pub const BASE: Self = Self {
        failure: Paint::Ansi(AnsiColors::Red),
        pending: Paint::Ansi(AnsiColors::BrightBlack),
        success: Paint::Ansi(AnsiColors::Green),
        warning: Paint::Ansi(AnsiColors::Yellow),
    };

    pub const SOLARIZED: Self = Self {
        failure: Paint::Rgb(0xdc, 0x32, 0x2f),
        pending: Paint::Rgb(0x93, 0xa1, 0xa1),
        success: Paint::Rgb(0x85, 0x99, 0x00),
        warning: Paint::Rgb(0xb5, 0x89, 0x00),
    };

    pub const DRACULA: Self = Self {
        failure: Paint::Rgb(0xff, 0x55, 0x55),
        pending: Paint::Rgb(0x62, 0x72, 0xa4),
        success: Paint::Rgb(0x50, 0xfa, 0x7b),
        warning: Paint::Rgb(0xf1, 0xfa, 0x8c),
    };

    pub const NORD: Self = Self {
        failure: Paint::Rgb(0xbf, 0x61, 0x6a),
        pending: Paint::Rgb(0x4c, 0x56, 0x6a),
        success: Paint::Rgb(0xa3, 0xbe, 0x8c),
        warning: Paint::Rgb(0xeb, 0xcb, 0x8b),
    };

    /// Looks up a named theme. `None` for `"default"` and unknown names.
    pub fn theme(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "solarized" => Some(Self::SOLARIZED),
            "dracula" => Some(Self::DRACULA),
            "nord" => Some(Self::NORD),
            _ => None,
        }
    }

    pub fn resolve(theme: &str, level: ColorLevel) -> Self {
        if level < ColorLevel::Ansi256 {
            return Self::BASE;
        }
        Self::theme(theme).unwrap_or(Self::BASE)
    }

    pub fn get(&self, color: ColorType) -> Paint {
        match color {
            ColorType::Failure => self.failure,
            ColorType::Pending => self.pending,
            ColorType::Success => self.success,
            ColorType::Warning => self.warning,
        }
    }
}

/// Colors `text` with `paint` as far as `level` allows.
pub fn paint(text: &str, paint: Paint, level: ColorLevel) -> String {
    match (level, paint) {
        (ColorLevel::None, _) => text.to_string(),
        (_, Paint::Ansi(color)) => text.color(color).to_string(),
        (ColorLevel::TrueColor, Paint::Rgb(r, g, b)) => text.truecolor(r, g, b).to_string(),
        (_, Paint::Rgb(r, g, b)) => text.color(XtermColors::from(rgb_to_256(r, g, b))).to_string(),
    }
}

/// Applies `modifier` on top of already painted text.
pub fn modify(text: &str, modifier: Modifier) -> String {
    match modifier {
        Modifier::Bold => text.bold().to_string(),
        Modifier::Dim => text.dimmed().to_string(),
        Modifier::Italic => text.italic().to_string(),
        Modifier::Underline => text.underline().to_string(),
        Modifier::Inverse => text.reversed().to_string(),
        Modifier::Strikethrough => text.strikethrough().to_string(),
    }
}

/// Nearest xterm-256 index for an RGB color.
pub fn rgb_to_256(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        return match r {
            0..8 => 16,
            249.. => 231,
            _ => 232 + ((r - 8) / 10).min(23),
        };
    }
    16 + 36 * cube_index(r) + 6 * cube_index(g) + cube_index(b)
}

// Cube levels are 0, 95, 135, 175, 215, 255; split at their midpoints.
fn cube_index(v: u8) -> u8 {
    match v {
        0..48 => 0,
        48..115 => 1,
        _ => (v - 35) / 40,
    }
}

fn ansi_regex() -> &'static Regex {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    ANSI.get_or_init(|| {
        Regex::new(r"\x1b(?:\[[0-9;?]*[a-zA-Z]|\][^\x07]*\x07|[a-zA-Z])")
            .expect("ANSI pattern is valid")
    })
}

/// Removes ANSI escape sequences.
pub fn strip(text: &str) -> String {
    ansi_regex().replace_all(text, "").into_owned()
}

/// Terminal columns taken by `text` once escape sequences are removed.
pub fn visible_width(text: &str) -> usize {
    strip(text).chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// Cuts `text` to at most `columns` visible columns, keeping escape
/// sequences intact so styles opened before the cut still get closed.
pub fn truncate(text: &str, columns: usize) -> String {
    if visible_width(text) <= columns {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut width = 0;
    let mut full = false;
    let mut last = 0;
    for escape in ansi_regex().find_iter(text) {
        if !full {
            full = push_columns(&mut out, &text[last..escape.start()], columns, &mut width);
        }
        out.push_str(escape.as_str());
        last = escape.end();
    }
    if !full {
        push_columns(&mut out, &text[last..], columns, &mut width);
    }
    if last > 0 {
        out.push_str("\x1b[0m");
    }
    out
}

// Returns true once the column budget is used up.
fn push_columns(out: &mut String, segment: &str, columns: usize, width: &mut usize) -> bool {
    for c in segment.chars() {
        let w = c.width().unwrap_or(0);
        if *width + w > columns {
            return true;
        }
        *width += w;
        out.push(c);
    }
    false
}
