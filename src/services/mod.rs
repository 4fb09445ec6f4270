//! Service layer for pecha business logic.
//!
//! This module contains domain logic separated from UI concerns.
//! Services report progress through events so any front end can drive them.

pub mod import;

pub use import::{
    apply_statistics, ImportEvent, PageReport, PageStatus, VolumeImport, VolumeImporter,
    VolumeStatistics,
};
