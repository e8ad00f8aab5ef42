use ratatui::style::{Color, Modifier, Style};

/// One Dark palette shared by every grid widget.
/// Kept in its own crate so style tweaks don't rebuild the engine.

// Color constants
pub const ACCENT_BLUE: Color = Color::Rgb(97, 175, 239);
pub const ACCENT_CYAN: Color = Color::Rgb(86, 182, 194);
pub const ACCENT_GREEN: Color = Color::Rgb(152, 195, 121);
pub const ACCENT_ORANGE: Color = Color::Rgb(209, 154, 102);
pub const ACCENT_PURPLE: Color = Color::Rgb(198, 120, 221);
pub const BG_PRIMARY: Color = Color::Rgb(40, 44, 52);
pub const BG_SECONDARY: Color = Color::Rgb(33, 37, 43);
pub const BG_SELECTION: Color = Color::Rgb(62, 68, 81);
pub const BG_TERTIARY: Color = Color::Rgb(44, 49, 58);
pub const BORDER_FOCUSED: Color = Color::Rgb(97, 175, 239);
pub const BORDER_NORMAL: Color = Color::Rgb(92, 99, 112);
pub const ERROR: Color = Color::Rgb(224, 108, 117);
pub const FG_PRIMARY: Color = Color::Rgb(171, 178, 191);
pub const FG_SECONDARY: Color = Color::Rgb(92, 99, 112);
pub const INFO: Color = Color::Rgb(97, 175, 239);
pub const SUCCESS: Color = Color::Rgb(152, 195, 121);
pub const WARNING: Color = Color::Rgb(229, 192, 123);

pub const STYLE_BG_PRIMARY: Style = Style::new().bg(BG_PRIMARY).fg(FG_PRIMARY);
pub const STYLE_INPUT: Style = Style::new().bg(BG_TERTIARY).fg(FG_PRIMARY);
pub const STYLE_BORDER_NORMAL: Style = Style::new().fg(BORDER_NORMAL);
pub const STYLE_BORDER_FOCUSED: Style = Style::new().fg(BORDER_FOCUSED);
pub const STYLE_MUTED: Style = Style::new().fg(FG_SECONDARY);
pub const STYLE_STATUS_BAR: Style = Style::new().bg(BG_SECONDARY).fg(FG_PRIMARY);
pub const STYLE_INFO: Style = Style::new().fg(INFO);
pub const STYLE_NUMBER: Style = Style::new().fg(ACCENT_ORANGE);
pub const STYLE_NULL: Style = Style::new().fg(FG_SECONDARY);

use once_cell::sync::Lazy;

pub static STYLE_SELECTION_ACTIVE: Lazy<Style> =
  Lazy::new(|| Style::new().bg(ACCENT_BLUE).fg(BG_PRIMARY).add_modifier(Modifier::BOLD));

pub static STYLE_ROW_MARKED: Lazy<Style> =
  Lazy::new(|| Style::new().bg(BG_SELECTION).fg(FG_PRIMARY).add_modifier(Modifier::BOLD));

pub static STYLE_HEADER: Lazy<Style> =
  Lazy::new(|| Style::new().bg(BG_SELECTION).fg(ACCENT_CYAN).add_modifier(Modifier::BOLD));

pub static STYLE_HEADER_SORTED: Lazy<Style> =
  Lazy::new(|| Style::new().bg(BG_SELECTION).fg(ACCENT_PURPLE).add_modifier(Modifier::BOLD | Modifier::UNDERLINED));

pub static STYLE_TITLE: Lazy<Style> = Lazy::new(|| Style::new().fg(ACCENT_BLUE).add_modifier(Modifier::BOLD));

pub static STYLE_SUCCESS: Lazy<Style> = Lazy::new(|| Style::new().fg(SUCCESS).add_modifier(Modifier::BOLD));

pub static STYLE_WARNING: Lazy<Style> = Lazy::new(|| Style::new().fg(WARNING).add_modifier(Modifier::BOLD));

pub static STYLE_ERROR: Lazy<Style> = Lazy::new(|| Style::new().fg(ERROR).add_modifier(Modifier::BOLD));

pub static STYLE_FIELD_FOCUSED: Lazy<Style> =
  Lazy::new(|| Style::new().bg(BG_SELECTION).fg(ACCENT_GREEN).add_modifier(Modifier::BOLD));

#[inline(always)]
pub fn bg_primary() -> Style { STYLE_BG_PRIMARY }

#[inline(always)]
pub fn input() -> Style { STYLE_INPUT }

#[inline(always)]
pub fn selection_active() -> Style { *STYLE_SELECTION_ACTIVE }

#[inline(always)]
pub fn row_marked() -> Style { *STYLE_ROW_MARKED }

#[inline(always)]
pub fn border_normal() -> Style { STYLE_BORDER_NORMAL }

#[inline(always)]
pub fn border_focused() -> Style { STYLE_BORDER_FOCUSED }

#[inline(always)]
pub fn header() -> Style { *STYLE_HEADER }

#[inline(always)]
pub fn header_sorted() -> Style { *STYLE_HEADER_SORTED }

#[inline(always)]
pub fn title() -> Style { *STYLE_TITLE }

#[inline(always)]
pub fn success() -> Style { *STYLE_SUCCESS }

#[inline(always)]
pub fn warning() -> Style { *STYLE_WARNING }

#[inline(always)]
pub fn error() -> Style { *STYLE_ERROR }

#[inline(always)]
pub fn info() -> Style { STYLE_INFO }

#[inline(always)]
pub fn muted() -> Style { STYLE_MUTED }

#[inline(always)]
pub fn status_bar() -> Style { STYLE_STATUS_BAR }

#[inline(always)]
pub fn number() -> Style { STYLE_NUMBER }

#[inline(always)]
pub fn null_value() -> Style { STYLE_NULL }

#[inline(always)]
pub fn field_focused() -> Style { *STYLE_FIELD_FOCUSED }

#[inline(always)]
pub fn border(focused: bool) -> Style {
  if focused {
    STYLE_BORDER_FOCUSED
  } else {
    STYLE_BORDER_NORMAL
  }
}
