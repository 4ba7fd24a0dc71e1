//! rowflow Playground - demos and sample data.
//!
//! # Available Binaries
//!
//! - **`cutflow-demo`**: books a small analysis over synthetic collision
//!   events, runs it once and prints the results and the cutflow report
//!
//! # Usage
//!
//! ```bash
//! cargo run --package rowflow-playground --bin cutflow-demo -- --slots 4 --events 100000
//! ```

pub mod data;
pub mod utils;

pub use data::{synthetic_events, EventGenerator};
pub use utils::{print_divider, print_header, print_report};
