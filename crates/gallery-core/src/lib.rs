//! Presentation logic for the gallery: layout, ordering, selectors, forms and
//! the import/export document shapes. Nothing here performs I/O.

pub mod arrange;
pub mod form;
pub mod launch;
pub mod layout;
pub mod selector;
pub mod transfer;

pub use arrange::{CategoryFilter, SortKey, arrange, collate, sort_apps};
pub use form::{EditForm, launch_summary};
pub use launch::{app_store_search_url, launch_url};
pub use layout::{GridLayout, IconSize, SettingsView, columns_for};
pub use selector::{CategoryOutcome, CategoryPanel, SelectOption, Selector};
pub use transfer::{
    EXPORT_FORMAT, EXPORT_VERSION, ExportDocument, ImportFormatError, export_file_name,
    parse_import, repair_entries,
};
