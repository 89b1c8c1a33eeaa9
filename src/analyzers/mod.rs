pub mod output_analyzer;

pub use output_analyzer::{MetricCoverage, OutputAnalyzer, OutputSummary, Violation};
