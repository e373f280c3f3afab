pub mod app;

pub use app::{AlertSection, AppConfig, BudgetSection};
