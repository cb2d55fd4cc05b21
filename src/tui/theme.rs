//! Colour tokens for the dashboard, with `NO_COLOR` support.

#![allow(missing_docs)]

use std::env;

use crossterm::style::Color;

use crate::topics::projection::StyleTag;
use crate::topics::source::TopicState;

/// Color output mode for compatibility with `NO_COLOR` and `--no-color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Enabled,
    Disabled,
}

impl ColorMode {
    #[must_use]
    pub const fn from_no_color_flag(no_color: bool) -> Self {
        if no_color {
            Self::Disabled
        } else {
            Self::Enabled
        }
    }

    /// Disabled by the flag or by a `NO_COLOR` variable in the environment.
    #[must_use]
    pub fn from_environment(no_color_flag: bool) -> Self {
        Self::from_no_color_flag(no_color_flag || env::var_os("NO_COLOR").is_some())
    }
}

/// Maps semantic styles to terminal colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    mode: ColorMode,
}

impl Theme {
    #[must_use]
    pub const fn new(mode: ColorMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub const fn color_enabled(self) -> bool {
        matches!(self.mode, ColorMode::Enabled)
    }

    /// Foreground for a cell style, or `Reset` when colour is off.
    #[must_use]
    pub const fn cell(self, style: StyleTag) -> Color {
        if !self.color_enabled() {
            return Color::Reset;
        }
        match style {
            StyleTag::Plain | StyleTag::Neutral => Color::White,
            StyleTag::Index => Color::DarkGrey,
            StyleTag::ItemKey | StyleTag::Merchant => Color::DarkCyan,
            StyleTag::Name | StyleTag::Collection => Color::Cyan,
            StyleTag::User => Color::Blue,
            StyleTag::Date => Color::DarkYellow,
            StyleTag::Size | StyleTag::Used | StyleTag::Rate => Color::Magenta,
            StyleTag::Type | StyleTag::Version => Color::Grey,
            StyleTag::Coin | StyleTag::App | StyleTag::Job => Color::DarkMagenta,
            StyleTag::CoinOverspend | StyleTag::Failed | StyleTag::Cross => Color::Red,
            StyleTag::CoinLimit | StyleTag::Pending | StyleTag::Highlight => Color::Yellow,
            StyleTag::Tick | StyleTag::Done => Color::Green,
            StyleTag::Active => Color::Cyan,
        }
    }

    /// Banner and title accent.
    #[must_use]
    pub const fn accent(self) -> Color {
        if self.color_enabled() {
            Color::Cyan
        } else {
            Color::Reset
        }
    }

    #[must_use]
    pub const fn muted(self) -> Color {
        if self.color_enabled() {
            Color::DarkGrey
        } else {
            Color::Reset
        }
    }

    #[must_use]
    pub const fn auth(self, authenticated: bool) -> Color {
        match (self.color_enabled(), authenticated) {
            (false, _) => Color::Reset,
            (true, true) => Color::Green,
            (true, false) => Color::Red,
        }
    }

    #[must_use]
    pub const fn state(self, state: TopicState) -> Color {
        if !self.color_enabled() {
            return Color::Reset;
        }
        match state {
            TopicState::Fresh => Color::Green,
            TopicState::Stale => Color::DarkYellow,
            TopicState::Fetching => Color::Cyan,
            TopicState::Failed => Color::Red,
            TopicState::Idle => Color::DarkGrey,
        }
    }
}
