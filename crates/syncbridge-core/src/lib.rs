//! # syncbridge-core: Pure Translation Logic for SyncBridge
//!
//! This crate holds every record that crosses the bridge between the Source
//! business system and the Target accounting system, plus the pure rules that
//! translate one side's schema into the other's.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SyncBridge Layers                               │
//! │                                                                         │
//! │  apps/connector  ──►  syncbridge-sync  ──►  syncbridge-db               │
//! │                              │                    │                     │
//! │                              └─────────┬──────────┘                     │
//! │                                        ▼                                │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  syncbridge-core (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   types.rs        Source/Target records, DateRange, Upsert     │   │
//! │  │   money.rs        Money (integer cents), TaxRate (bps)          │   │
//! │  │   mapper.rs       Source ⇄ Target translation, chrono refs      │   │
//! │  │   validation.rs   Natural-key checks before a write             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: the mapper never fails and never touches I/O
//! 2. **Integer Money**: all amounts are cents (i64), rates are basis points
//! 3. **Caller-owned clock**: anything date-relative takes `today` as input
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use syncbridge_core::mapper::chrono_reference;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
//! assert_eq!(chrono_reference("SAGE", date, "FA-0042"), "SAGE-FA-20240315-FA-0042");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod mapper;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use mapper::{MappingDefault, MappingDefaults};
pub use money::{Money, TaxRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tag identifying the Target system inside generated chrono references.
pub const DEFAULT_SOURCE_TAG: &str = "SAGE";

/// Status code stamped on every imported purchase invoice header (validated).
pub const IMPORTED_PURCHASE_STATUS: &str = "2";
