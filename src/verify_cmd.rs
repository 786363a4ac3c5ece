//! Verify command implementation

use anyhow::Result;
use graphvault::output::{output_json, JsonResponse};
use graphvault::verify::verify_store;
use graphvault::{GraphService, OutputFormat};

/// Exit code 1 when any issue is found
pub fn run_verify(service: &GraphService, output_format: OutputFormat, exec_id: &str) -> Result<u8> {
    let store = service.version_store();
    let report = verify_store(store)?;

    if output_format == OutputFormat::Json {
        output_json(&JsonResponse::new(&report, exec_id))?;
        return Ok(if report.is_clean() { 0 } else { 1 });
    }

    println!("Store verification: {}", store.root().display());

    let sections = [
        ("Missing payloads", "-", &report.missing_payloads),
        ("Orphaned payloads", "+", &report.orphaned_payloads),
        ("Unreadable payloads", "!", &report.unreadable_payloads),
        ("Count mismatches", "~", &report.count_mismatches),
    ];
    for (title, marker, locators) in sections {
        if locators.is_empty() {
            continue;
        }
        println!("{} ({}):", title, locators.len());
        for locator in locators {
            println!("  {} {}", marker, locator);
        }
    }

    if report.is_clean() {
        println!("All {} commits consistent.", report.commits_checked);
        Ok(0)
    } else {
        println!("Total: {} issues", report.total_issues());
        Ok(1)
    }
}
