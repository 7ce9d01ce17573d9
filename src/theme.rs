use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug)]
pub struct Theme {
    pub accent: Color,
    pub green: Color,
    pub yellow: Color,
    pub red: Color,
    pub dim: Color,
    pub surface: Color,
    pub surface_light: Color,
    pub text: Color,
    pub text_dim: Color,
    pub border: Color,
    pub highlight_bg: Color,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThemeName {
    #[default]
    Default,
    Emerald,
    Sand,
    Night,
}

impl ThemeName {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Emerald => "Emerald",
            Self::Sand => "Sand",
            Self::Night => "Night",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Default => Self::Emerald,
            Self::Emerald => Self::Sand,
            Self::Sand => Self::Night,
            Self::Night => Self::Default,
        }
    }

    pub fn theme(&self) -> Theme {
        match self {
            Self::Default => Theme {
                accent: Color::Rgb(100, 180, 255),
                green: Color::Rgb(80, 220, 130),
                yellow: Color::Rgb(240, 200, 80),
                red: Color::Rgb(240, 90, 90),
                dim: Color::Rgb(100, 100, 115),
                surface: Color::Reset,
                surface_light: Color::Reset,
                text: Color::Rgb(220, 220, 230),
                text_dim: Color::Rgb(140, 140, 155),
                border: Color::Rgb(55, 55, 70),
                highlight_bg: Color::Rgb(60, 60, 80),
            },
            Self::Emerald => Theme {
                accent: Color::Rgb(52, 211, 153),
                green: Color::Rgb(110, 231, 183),
                yellow: Color::Rgb(251, 191, 36),
                red: Color::Rgb(248, 113, 113),
                dim: Color::Rgb(75, 105, 95),
                surface: Color::Reset,
                surface_light: Color::Rgb(6, 45, 34),
                text: Color::Rgb(236, 253, 245),
                text_dim: Color::Rgb(134, 180, 160),
                border: Color::Rgb(20, 83, 65),
                highlight_bg: Color::Rgb(6, 78, 59),
            },
            Self::Sand => Theme {
                accent: Color::Rgb(214, 158, 46),
                green: Color::Rgb(132, 165, 93),
                yellow: Color::Rgb(236, 201, 75),
                red: Color::Rgb(197, 48, 48),
                dim: Color::Rgb(146, 131, 116),
                surface: Color::Reset,
                surface_light: Color::Rgb(60, 52, 40),
                text: Color::Rgb(245, 235, 215),
                text_dim: Color::Rgb(180, 165, 140),
                border: Color::Rgb(102, 88, 66),
                highlight_bg: Color::Rgb(80, 70, 52),
            },
            Self::Night => Theme {
                accent: Color::Rgb(136, 192, 208),
                green: Color::Rgb(163, 190, 140),
                yellow: Color::Rgb(235, 203, 139),
                red: Color::Rgb(191, 97, 106),
                dim: Color::Rgb(76, 86, 106),
                surface: Color::Reset,
                surface_light: Color::Reset,
                text: Color::Rgb(236, 239, 244),
                text_dim: Color::Rgb(129, 161, 193),
                border: Color::Rgb(67, 76, 94),
                highlight_bg: Color::Rgb(67, 76, 94),
            },
        }
    }
}
