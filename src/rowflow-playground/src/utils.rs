//! Formatting utilities for the playground.

use rowflow_engine::CutflowReport;

/// Print a section header.
pub fn print_header(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a thin divider.
pub fn print_divider() {
    println!("{}", "-".repeat(60));
}

/// Print a cutflow report, one named filter per line.
pub fn print_report(report: &CutflowReport) {
    if report.is_empty() {
        println!("(no named filters)");
        return;
    }
    print!("{report}");
}
