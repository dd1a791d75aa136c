use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use common::AppEntry;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Category,
    LaunchCount,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Name, SortKey::Category, SortKey::LaunchCount];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Category => "category",
            Self::LaunchCount => "launchCount",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Category => "Category",
            Self::LaunchCount => "Most launched",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortKey(pub String);

impl fmt::Display for UnknownSortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown sort key '{}' (expected name, category or launchCount)",
            self.0
        )
    }
}

impl std::error::Error for UnknownSortKey {}

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "name" => Ok(Self::Name),
            "category" => Ok(Self::Category),
            "launchCount" | "launch-count" | "launch_count" => Ok(Self::LaunchCount),
            other => Err(UnknownSortKey(other.to_string())),
        }
    }
}

/// Locale-style collation in three levels: base letters ignoring accents and
/// case, then accents (unaccented first), then case (lowercase first).
pub fn collate(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| accented_letters(a).cmp(accented_letters(b)))
        .then_with(|| case_order(a, b))
}

fn base_letters(raw: &str) -> impl Iterator<Item = char> + '_ {
    raw.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
}

fn accented_letters(raw: &str) -> impl Iterator<Item = char> + '_ {
    raw.nfd().flat_map(char::to_lowercase)
}

fn case_order(a: &str, b: &str) -> Ordering {
    for (left, right) in a.chars().zip(b.chars()) {
        if left == right {
            continue;
        }
        return match (left.is_lowercase(), right.is_lowercase()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => left.cmp(&right),
        };
    }
    a.chars().count().cmp(&b.chars().count())
}

pub fn compare(key: SortKey, a: &AppEntry, b: &AppEntry) -> Ordering {
    match key {
        SortKey::Name => collate(&a.name, &b.name),
        SortKey::Category => collate(&a.category, &b.category),
        SortKey::LaunchCount => b.launch_count.cmp(&a.launch_count),
    }
}

/// Stable sort: ties keep their current relative order.
pub fn sort_apps(apps: &mut [AppEntry], key: SortKey) {
    apps.sort_by(|a, b| compare(key, a, b));
}

/// Category filter; an empty selection shows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    selected: Option<String>,
}

impl CategoryFilter {
    pub fn new(selection: Option<&str>) -> Self {
        let selected = selection
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());
        Self { selected }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn matches(&self, app: &AppEntry) -> bool {
        match &self.selected {
            None => true,
            Some(category) => app.category == *category,
        }
    }
}

/// Filters then sorts a copy of the collection for rendering.
pub fn arrange(apps: &[AppEntry], filter: &CategoryFilter, sort: Option<SortKey>) -> Vec<AppEntry> {
    let mut visible = apps
        .iter()
        .filter(|app| filter.matches(app))
        .cloned()
        .collect::<Vec<_>>();
    if let Some(key) = sort {
        sort_apps(&mut visible, key);
    }
    visible
}
