use std::env;

use ratatui::style::{Color, Modifier, Style};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Auto,
    TrueColor,
    Ansi256,
    Ansi16,
}

impl ColorMode {
    pub fn detect_auto() -> Self {
        // Override via env if provided
        if let Ok(v) = env::var("ADDRESS_FORM_COLOR_MODE") {
            return match v.to_ascii_lowercase().as_str() {
                "24bit" | "truecolor" | "rgb" => ColorMode::TrueColor,
                "256" | "ansi256" => ColorMode::Ansi256,
                "16" | "ansi16" | "ansi" => ColorMode::Ansi16,
                _ => ColorMode::Auto,
            };
        }

        if let Ok(v) = env::var("COLORTERM") {
            let l = v.to_ascii_lowercase();
            if l.contains("truecolor") || l.contains("24bit") {
                return ColorMode::TrueColor;
            }
        }
        if let Ok(v) = env::var("TERM") {
            if v.to_ascii_lowercase().contains("256color") {
                return ColorMode::Ansi256;
            }
        }
        ColorMode::Ansi16
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UiGroup {
    Container,
    Border,
    Dimmed,
    Label,
    LabelFocused,
    Input,
    Error,
    Button,
    ButtonFocused,
    ButtonDisabled,
    Suggestion,
    SuggestionHighlighted,
    Marker,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Clone, Debug)]
pub struct Palette {
    pub background: Rgb,
    pub fg: Rgb,
    pub dim: Rgb,
    pub border: Rgb,
    pub primary: Rgb,
    pub primary_hover: Rgb,
    pub on_primary: Rgb,
    pub error: Rgb,
    pub marker: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgb(0xf7, 0xf7, 0xf7),
            fg: Rgb(0x21, 0x21, 0x21),
            dim: Rgb(0x75, 0x75, 0x75),
            border: Rgb(0xbd, 0xbd, 0xbd),
            primary: Rgb(0x62, 0x00, 0xea),
            primary_hover: Rgb(0x37, 0x00, 0xb3),
            on_primary: Rgb(0xff, 0xff, 0xff),
            error: Rgb(0xd3, 0x2f, 0x2f),
            marker: Rgb(0x21, 0x96, 0xf3),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Theme {
    pub mode: ColorMode,
    pub palette: Palette,
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_env_auto()
    }
}

impl Theme {
    pub fn from_env_auto() -> Self {
        Self {
            mode: ColorMode::detect_auto(),
            palette: Palette::default(),
        }
    }

    pub fn with_mode(mode: ColorMode) -> Self {
        Self {
            mode,
            palette: Palette::default(),
        }
    }

    pub fn style(&self, group: UiGroup) -> Style {
        let p = &self.palette;
        match group {
            UiGroup::Container => Style::default()
                .fg(self.color(p.fg))
                .bg(self.color(p.background)),
            UiGroup::Border => Style::default().fg(self.color(p.border)),
            UiGroup::Dimmed => Style::default().fg(self.color(p.dim)),
            UiGroup::Label => Style::default().fg(self.color(p.fg)),
            UiGroup::LabelFocused => Style::default()
                .fg(self.color(p.primary))
                .add_modifier(Modifier::BOLD),
            UiGroup::Input => Style::default().fg(self.color(p.fg)),
            UiGroup::Error => Style::default().fg(self.color(p.error)),
            UiGroup::Button => Style::default()
                .fg(self.color(p.on_primary))
                .bg(self.color(p.primary)),
            UiGroup::ButtonFocused => Style::default()
                .fg(self.color(p.on_primary))
                .bg(self.color(p.primary_hover))
                .add_modifier(Modifier::BOLD),
            UiGroup::ButtonDisabled => Style::default()
                .fg(self.color(p.dim))
                .bg(self.color(p.border))
                .add_modifier(Modifier::DIM),
            UiGroup::Suggestion => Style::default().fg(self.color(p.fg)),
            UiGroup::SuggestionHighlighted => Style::default()
                .fg(self.color(p.on_primary))
                .bg(self.color(p.primary)),
            UiGroup::Marker => Style::default()
                .fg(self.color(p.marker))
                .add_modifier(Modifier::BOLD),
        }
    }

    pub fn color(&self, rgb: Rgb) -> Color {
        let mode = match self.mode {
            ColorMode::Auto => ColorMode::detect_auto(),
            m => m,
        };
        match mode {
            ColorMode::TrueColor => Color::Rgb(rgb.0, rgb.1, rgb.2),
            ColorMode::Ansi256 => Color::Indexed(rgb_to_ansi256(rgb.0, rgb.1, rgb.2)),
            ColorMode::Ansi16 | ColorMode::Auto => ansi16_from_rgb(rgb.0, rgb.1, rgb.2),
        }
    }
}

fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    // 6x6x6 cube or grayscale ramp, whichever is closer
    let r_idx = (r as f32 / 255.0 * 5.0).round() as u8;
    let g_idx = (g as f32 / 255.0 * 5.0).round() as u8;
    let b_idx = (b as f32 / 255.0 * 5.0).round() as u8;
    let color_idx = 16 + 36 * r_idx + 6 * g_idx + b_idx;

    let avg = (r as u16 + g as u16 + b as u16) as f32 / 3.0;
    let gray_idx = (avg / 255.0 * 23.0).round() as u8;
    let gray_color = 232 + gray_idx;

    let cube = |idx: u8, c: u8| (idx as f32 * 255.0 / 5.0 - c as f32).abs();
    let dcube = cube(r_idx, r) + cube(g_idx, g) + cube(b_idx, b);
    let gval = gray_idx as f32 * 255.0 / 23.0;
    let dgray = (gval - r as f32).abs() + (gval - g as f32).abs() + (gval - b as f32).abs();
    if dgray + 15.0 < dcube { gray_color } else { color_idx }
}

fn ansi16_from_rgb(r: u8, g: u8, b: u8) -> Color {
    let bright = (r as u16 + g as u16 + b as u16) / 3 > 128;
    let nearest = [
        (Color::Black, (0, 0, 0)),
        (Color::Red, (205, 0, 0)),
        (Color::Green, (0, 205, 0)),
        (Color::Yellow, (205, 205, 0)),
        (Color::Blue, (0, 0, 238)),
        (Color::Magenta, (205, 0, 205)),
        (Color::Cyan, (0, 205, 205)),
        (Color::Gray, (229, 229, 229)),
    ]
    .into_iter()
    .min_by_key(|(_, (cr, cg, cb))| {
        (*cr as i32 - r as i32).abs() + (*cg as i32 - g as i32).abs() + (*cb as i32 - b as i32).abs()
    })
    .map(|(c, _)| c)
    .unwrap_or(Color::White);

    match (nearest, bright) {
        (c, false) => c,
        (Color::Black, true) => Color::DarkGray,
        (Color::Red, true) => Color::LightRed,
        (Color::Green, true) => Color::LightGreen,
        (Color::Yellow, true) => Color::LightYellow,
        (Color::Blue, true) => Color::LightBlue,
        (Color::Magenta, true) => Color::LightMagenta,
        (Color::Cyan, true) => Color::LightCyan,
        _ => Color::White,
    }
}
