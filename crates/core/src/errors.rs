use thiserror::Error;

use crate::config::ConfigError;
use crate::dataset::loader::LoadError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("required input missing: {table} ({detail})")]
    MissingInput { table: &'static str, detail: String },
    #[error("not enough usable data for {what}: {rows} usable rows")]
    DegenerateData { what: &'static str, rows: usize },
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    DataLoad(#[from] LoadError),
}

impl DomainError {
    pub fn missing_input(table: &'static str, detail: impl Into<String>) -> Self {
        Self::MissingInput { table, detail: detail.into() }
    }

    pub fn degenerate(what: &'static str, rows: usize) -> Self {
        Self::DegenerateData { what, rows }
    }
}

impl ApplicationError {
    /// Stable class labels used by command payloads and log fields.
    /// A missing input file counts as a load failure, not an analysis one.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::MissingInput { .. }) => "data_load",
            Self::Domain(_) => "analysis",
            Self::Config(_) => "config",
            Self::DataLoad(_) => "data_load",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn domain_error_wraps_into_application_error() {
        let application = ApplicationError::from(DomainError::degenerate("orders", 0));

        assert!(matches!(
            application,
            ApplicationError::Domain(DomainError::DegenerateData { what: "orders", rows: 0 })
        ));
        assert_eq!(application.class(), "analysis");
    }

    #[test]
    fn missing_input_display_names_table_and_detail() {
        let error = DomainError::missing_input("menu", "file not found: data/raw/menu_items.csv");

        assert_eq!(
            error.to_string(),
            "required input missing: menu (file not found: data/raw/menu_items.csv)"
        );
    }

    #[test]
    fn missing_input_classifies_as_a_load_failure() {
        let application = ApplicationError::from(DomainError::missing_input("orders", "gone"));

        assert_eq!(application.class(), "data_load");
    }

    #[test]
    fn degenerate_data_display_reports_row_count() {
        let error = DomainError::degenerate("satisfaction", 0);

        assert_eq!(error.to_string(), "not enough usable data for satisfaction: 0 usable rows");
    }
}
