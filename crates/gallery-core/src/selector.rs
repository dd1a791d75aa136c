use common::{AppEntry, normalize_category};

use crate::arrange::collate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// A drop-down list of categories keyed by lowercase value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    options: Vec<SelectOption>,
    selected: Option<String>,
}

impl Selector {
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }

    /// Appends the option unless its value is already present. Returns whether it was added.
    pub fn ensure_option(&mut self, label: &str, value: &str) -> bool {
        if self.contains(value) {
            return false;
        }
        self.options.push(SelectOption {
            label: label.to_string(),
            value: value.to_string(),
        });
        true
    }

    pub fn select(&mut self, value: &str) {
        self.ensure_option(value, value);
        self.selected = Some(value.to_string());
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }
}

/// What the server said about an "ensure category" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    Exists(String),
    Created(String),
}

impl CategoryOutcome {
    pub fn value(&self) -> String {
        match self {
            Self::Exists(name) | Self::Created(name) => normalize_category(name),
        }
    }
}

/// The edit-form selector and the filter selector, kept in step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPanel {
    pub edit: Selector,
    pub filter: Selector,
}

impl CategoryPanel {
    /// Seeds both selectors from the listed categories and those in use by apps.
    pub fn seeded(listed: &[String], apps: &[AppEntry]) -> Self {
        let mut values = listed
            .iter()
            .map(|name| normalize_category(name))
            .chain(apps.iter().map(|app| app.category.clone()))
            .collect::<Vec<_>>();
        values.sort_by(|a, b| collate(a, b));
        values.dedup();

        let mut panel = Self::default();
        for value in &values {
            panel.edit.ensure_option(value, value);
            panel.filter.ensure_option(value, value);
        }
        panel
    }

    /// Applies an add-category result. `requested` is the label the user typed.
    pub fn apply(&mut self, requested: &str, outcome: &CategoryOutcome) -> String {
        let value = outcome.value();
        match outcome {
            CategoryOutcome::Exists(_) => {}
            CategoryOutcome::Created(_) => {
                let label = requested.trim();
                let label = if label.is_empty() { value.as_str() } else { label };
                self.edit.ensure_option(label, &value);
                self.filter.ensure_option(label, &value);
            }
        }
        self.edit.select(&value);
        value
    }
}
