use common::{DEFAULT_ICON_SIZE_PX, DEFAULT_SHORTCUT_URL, Settings};

/// The icon sizes the grid knows how to lay out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconSize {
    Small,
    Medium,
    #[default]
    Large,
}

impl IconSize {
    pub const ALL: [IconSize; 3] = [IconSize::Small, IconSize::Medium, IconSize::Large];

    /// Unknown sizes fall back to the 60px default.
    pub fn from_px(px: u32) -> Self {
        match px {
            48 => Self::Small,
            54 => Self::Medium,
            DEFAULT_ICON_SIZE_PX => Self::Large,
            _ => Self::default(),
        }
    }

    pub fn px(self) -> u32 {
        match self {
            Self::Small => 48,
            Self::Medium => 54,
            Self::Large => 60,
        }
    }

    pub fn columns(self) -> u32 {
        match self {
            Self::Small => 6,
            Self::Medium => 5,
            Self::Large => 4,
        }
    }
}

/// Column count for a raw icon size.
pub fn columns_for(px: u32) -> u32 {
    IconSize::from_px(px).columns()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub icon_size: IconSize,
}

impl GridLayout {
    pub fn new(icon_size: IconSize) -> Self {
        Self { icon_size }
    }

    pub fn columns(&self) -> u32 {
        self.icon_size.columns()
    }

    /// The two layout variables the stylesheet reads.
    pub fn css_variables(&self) -> [(&'static str, String); 2] {
        [
            ("--icon-size", format!("{}px", self.icon_size.px())),
            ("--grid-columns", self.columns().to_string()),
        ]
    }

    pub fn inline_style(&self) -> String {
        self.css_variables()
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// View state owned by the settings panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsView {
    pub icon_size: IconSize,
    pub shortcut_url: String,
}

impl Default for SettingsView {
    fn default() -> Self {
        Self {
            icon_size: IconSize::default(),
            shortcut_url: DEFAULT_SHORTCUT_URL.to_string(),
        }
    }
}

impl SettingsView {
    pub fn layout(&self) -> GridLayout {
        GridLayout::new(self.icon_size)
    }

    /// Merges whatever fields the server sent; absent fields keep their value.
    pub fn apply(&mut self, settings: &Settings) {
        if let Some(px) = settings.icon_size {
            self.icon_size = IconSize::from_px(px);
        }
        if let Some(url) = settings.shortcut_url.as_deref() {
            let url = url.trim();
            if !url.is_empty() {
                self.shortcut_url = url.to_string();
            }
        }
    }
}
