//! # rf-disc
//!
//! MakeMKV robot-protocol handling for ripforge.
//!
//! `makemkvcon -r` emits a line-oriented protocol (`TAG:field,field,...`
//! with optionally quoted fields). This crate turns that output into a
//! structured disc catalog and derives a deterministic rip selection from it:
//!
//! - **Protocol records** ([`protocol`]) -- typed per-line records with a
//!   permissive quoted-field splitter.
//! - **Catalog** ([`catalog`]) -- titles and tracks folded from `TINFO` /
//!   `SINFO` records, keyed by output filename.
//! - **Selection** ([`select`]) -- main-title heuristic plus preference-
//!   scored audio and subtitle track choice.
//! - **Rip progress** ([`progress`]) -- `PRGC`/`PRGV` lines rendered as a
//!   single status string.

pub mod catalog;
pub mod progress;
pub mod protocol;
pub mod select;

pub use catalog::{ScanResult, Title, TitleCatalog, Track, TrackKind};
pub use progress::RipProgress;
pub use protocol::{parse_fields, DriveRecord, Record};
pub use select::{preference_score, select, Selection};
