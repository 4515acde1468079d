//! Output writers for the prepared feed.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── 2025-05-06/
//! │   └── news.json
//! └── 2025-05-07/
//!     └── news.json
//! ```

pub mod json;
