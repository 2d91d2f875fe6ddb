// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # cspscope
//!
//! Flattens vendor-published DDF (Device Description Framework) schemas into a
//! catalog of addressable OMA-URI settings, then asks the local MDM stack what
//! value each one currently has.
//!
//! ## Architecture
//!
//! - **Schema** (`ddf`): path algebra, allowed-value rendering, tree walk
//! - **Catalog** (`catalog`): flat entries, filtering, JSON export
//! - **Ingestion** (`ingest`): local files → cached package → fresh download
//! - **Gate** (`gate`): scoped embedded-mode flag with guaranteed restore
//! - **Protocol** (`mdm`): SyncML `Get` over the local management channel
//! - **Orchestration** (`orchestrator`): ingest → gate → query → release
//!
//! ## Library usage
//!
//! ```no_run
//! use cspscope::ddf::parse_bytes;
//!
//! let xml = std::fs::read("Policy.xml").unwrap();
//! for entry in parse_bytes(&xml).unwrap() {
//!     println!("{} -> {}", entry.name, entry.path);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod ddf;
pub mod error;
pub mod gate;
pub mod ingest;
pub mod mdm;
pub mod orchestrator;
pub mod paths;
