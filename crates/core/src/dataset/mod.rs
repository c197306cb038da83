//! Dataset container and ingestion.
//!
//! [`loader`] reads the four CSV tables into domain rows with the cleaning
//! rules applied; [`sample`] writes a seeded synthetic snapshot in the same
//! file format.

pub mod loader;
pub mod sample;

use serde::Serialize;

use crate::domain::menu::MenuItem;
use crate::domain::order::Order;
use crate::domain::survey::SatisfactionSurvey;
use crate::domain::visit::Visit;

/// The cleaned in-memory snapshot all engines read from.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub orders: Vec<Order>,
    pub visits: Vec<Visit>,
    pub satisfaction: Vec<SatisfactionSurvey>,
    pub menu: Vec<MenuItem>,
}

impl Dataset {
    /// Row count across the three fact tables (menu is a catalog, not facts).
    pub fn data_points(&self) -> usize {
        self.orders.len() + self.visits.len() + self.satisfaction.len()
    }
}

/// Kept/dropped row accounting from one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub orders_kept: usize,
    pub orders_dropped: usize,
    pub visits_kept: usize,
    pub visits_dropped: usize,
    pub surveys_kept: usize,
    pub surveys_dropped: usize,
    pub menu_items: usize,
    pub duplicate_menu_items: usize,
}

impl CleaningReport {
    pub fn total_dropped(&self) -> usize {
        self.orders_dropped + self.visits_dropped + self.surveys_dropped
    }
}
