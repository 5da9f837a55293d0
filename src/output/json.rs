//! Resource graph as JSON for the serialization collaborator.

use crate::error::TopologyError;
use crate::processing::ResourceGraph;

/// Pretty JSON of the graph: `{"resources": [{kind, name, attributes, refs}, ..]}`.
pub fn graph_json(graph: &ResourceGraph) -> Result<String, TopologyError> {
    serde_json::to_string_pretty(graph)
        .map_err(|e| TopologyError::Output(format!("Error serializing resources: {e}")))
}

/// Write the graph to `path`, or to stdout when no path is given.
pub fn write_graph(graph: &ResourceGraph, path: Option<&str>) -> Result<(), TopologyError> {
    let json = graph_json(graph)?;
    match path {
        Some(path) => {
            log::info!("Writing {} resources to {path}", graph.len());
            std::fs::write(path, json)
                .map_err(|e| TopologyError::Output(format!("Error writing {path}: {e}")))
        }
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
