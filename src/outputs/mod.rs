//! Output generation for scraped articles.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2026-10-17/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```

pub mod json;
