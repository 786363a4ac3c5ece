//! Compare command implementation

use anyhow::Result;
use graphvault::output::{output_json, JsonResponse};
use graphvault::{GraphService, OutputFormat};

pub fn run_compare(
    service: &GraphService,
    owner: &str,
    repo: &str,
    from: &str,
    to: &str,
    output_format: OutputFormat,
    exec_id: &str,
) -> Result<u8> {
    let comparison = service.compare(owner, repo, from, to)?;

    match output_format {
        OutputFormat::Json => output_json(&JsonResponse::new(&comparison, exec_id))?,
        OutputFormat::Human => {
            let summary = comparison.summary;
            println!("{}/{}: {} -> {}", owner, repo, from, to);
            println!(
                "Nodes: +{} -{}  Relationships: +{} -{}",
                summary.nodes_added,
                summary.nodes_removed,
                summary.relationships_added,
                summary.relationships_removed
            );
            for node in &comparison.diff.nodes_added {
                println!("  + {} [{}]", node.id, node.label);
            }
            for node in &comparison.diff.nodes_removed {
                println!("  - {} [{}]", node.id, node.label);
            }
            for rel in &comparison.diff.relationships_added {
                println!("  + {}", rel.composite_key());
            }
            for rel in &comparison.diff.relationships_removed {
                println!("  - {}", rel.composite_key());
            }
            if comparison.diff.is_empty() {
                println!("Graphs are identical.");
            }
        }
    }
    Ok(0)
}
