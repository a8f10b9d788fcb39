use std::io::Write;

use serde::Serialize;

use super::miner::{EtmError, TerminationReason};
use crate::process_tree::process_tree_struct::ProcessTree;

///
/// Quality of one lineage in one generation
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TracePoint {
    /// Generation (`0` is the initial population)
    pub generation: usize,
    /// Quality of the lineage's tree in that generation
    pub quality: f64,
}

///
/// Quality history of one lineage (one slot of the population)
///
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineageTrace {
    /// Index of the lineage in the population
    pub lineage: usize,
    /// Quality per generation, in order
    pub points: Vec<TracePoint>,
}

impl LineageTrace {
    /// Empty trace of the given lineage
    pub fn new(lineage: usize) -> Self {
        Self {
            lineage,
            points: Vec::new(),
        }
    }

    /// Record the quality of a generation
    pub fn push(&mut self, generation: usize, quality: f64) {
        self.points.push(TracePoint {
            generation,
            quality,
        });
    }

    /// Quality recorded last
    pub fn last_quality(&self) -> Option<f64> {
        self.points.last().map(|p| p.quality)
    }
}

#[derive(Serialize)]
struct TraceRow {
    lineage: usize,
    generation: usize,
    quality: f64,
}

///
/// Writes lineage traces as CSV with the columns `lineage`, `generation` and `quality`
///
pub fn write_lineage_traces_csv<W: Write>(
    traces: &[LineageTrace],
    writer: W,
) -> Result<(), EtmError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for trace in traces {
        for point in &trace.points {
            csv_writer.serialize(TraceRow {
                lineage: trace.lineage,
                generation: point.generation,
                quality: point.quality,
            })?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

///
/// Outcome of a search
///
#[derive(Debug, Clone, Serialize)]
pub struct EtmResult {
    /// Best tree found
    pub best_tree: ProcessTree,
    /// Quality of the best tree
    pub best_quality: f64,
    /// Why the search stopped
    pub termination: TerminationReason,
    /// Number of completed mutation rounds
    pub generations: usize,
    /// Best quality after initialization and after every completed mutation round
    pub best_quality_history: Vec<f64>,
    /// Quality history of every lineage
    pub lineage_traces: Vec<LineageTrace>,
}

impl EtmResult {
    /// Export the lineage traces as CSV
    pub fn write_lineage_traces_csv<W: Write>(&self, writer: W) -> Result<(), EtmError> {
        write_lineage_traces_csv(&self.lineage_traces, writer)
    }

    /// Export the result as JSON
    pub fn export_json<W: Write>(&self, writer: W) -> Result<(), EtmError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
