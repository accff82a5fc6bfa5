//! Health dashboard: overall score, grade, smells, problematic symbols.

use serde::Serialize;

use crate::cancel::CancelToken;
use crate::error::LciError;
use crate::index::CodeIndex;

use super::metrics::{
    complexity_metrics, coupling_cohesion, quality_metrics, ComplexityMetrics, CouplingCohesion,
    QualityMetrics,
};

/// Files longer than this count as a size smell.
const LARGE_FILE_LINES: usize = 500;

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SmellCounts {
    pub high_complexity: usize,
    pub large_files: usize,
    pub low_cohesion_packages: usize,
}

impl SmellCounts {
    pub fn total(&self) -> usize {
        self.high_complexity + self.large_files + self.low_cohesion_packages
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProblematicSymbol {
    pub name: String,
    pub path: String,
    pub line: u32,
    pub object_id: String,
    pub severity: &'static str,
    pub reason: String,
}

/// Extension point: the regex-based allocation detector behind this shape
/// produced too many false positives, so the analyzer stays off until an
/// AST-based escape analyzer replaces it. The formatter path still renders
/// the shape when a future analyzer fills it.
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MemoryPressureAnalysis {
    /// (path, pressure score) pairs, worst first.
    pub scores: Vec<(String, f64)>,
    pub hotspots: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HealthOptions {
    /// Off by default; see `MemoryPressureAnalysis`.
    pub memory_pressure: bool,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HealthDashboard {
    /// 0–10, higher is healthier.
    pub score: f64,
    pub grade: &'static str,
    pub complexity: ComplexityMetrics,
    pub coupling: CouplingCohesion,
    pub quality: QualityMetrics,
    pub smells: SmellCounts,
    pub problematic: Vec<ProblematicSymbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_pressure: Option<MemoryPressureAnalysis>,
}

fn grade_for(score: f64) -> &'static str {
    if score >= 8.5 {
        "A"
    } else if score >= 7.0 {
        "B"
    } else if score >= 5.5 {
        "C"
    } else if score >= 4.0 {
        "D"
    } else {
        "F"
    }
}

/// Blend weights for the 0–10 health score: inverted complexity, inverted
/// coupling, cohesion, inverted smell density.
const W_COMPLEXITY: f64 = 0.30;
const W_COUPLING: f64 = 0.25;
const W_COHESION: f64 = 0.25;
const W_SMELLS: f64 = 0.20;

pub fn health_dashboard(
    index: &CodeIndex,
    options: &HealthOptions,
    cancel: &CancelToken,
) -> Result<HealthDashboard, LciError> {
    let complexity = complexity_metrics(index);
    let coupling = coupling_cohesion(index, cancel)?;

    let large_files = (0..index.files.len() as u32)
        .filter(|&id| index.files.lines(id).len() > LARGE_FILE_LINES)
        .count();
    let smells = SmellCounts {
        high_complexity: complexity.high,
        large_files,
        low_cohesion_packages: coupling
            .low_cohesion_packages
            .iter()
            .filter(|p| p.cohesion < 0.3)
            .count(),
    };

    let mut problematic: Vec<ProblematicSymbol> = complexity
        .high_complexity_funcs
        .iter()
        .map(|f| ProblematicSymbol {
            name: f.name.clone(),
            path: f.path.clone(),
            line: f.line,
            object_id: f.object_id.clone(),
            severity: if f.complexity > 20 { "high" } else { "medium" },
            reason: format!("cyclomatic complexity {}", f.complexity),
        })
        .collect();
    problematic.truncate(10);

    let quality = quality_metrics(&complexity, &coupling);

    // Normalized component scores, all in [0, 1] where 1 is healthy.
    let complexity_norm = (complexity.avg / 20.0).min(1.0);
    let smell_density = if index.symbols.is_empty() {
        0.0
    } else {
        (smells.total() as f64 / index.symbols.len() as f64 * 10.0).min(1.0)
    };
    let cohesion_avg = if coupling.packages.is_empty() {
        0.5
    } else {
        coupling.avg_cohesion
    };

    let score = 10.0
        * (W_COMPLEXITY * (1.0 - complexity_norm)
            + W_COUPLING * (1.0 - coupling.avg_coupling)
            + W_COHESION * cohesion_avg
            + W_SMELLS * (1.0 - smell_density));
    let score = (score * 10.0).round() / 10.0;

    Ok(HealthDashboard {
        score,
        grade: grade_for(score),
        complexity,
        coupling,
        quality,
        smells,
        problematic,
        memory_pressure: options.memory_pressure.then(MemoryPressureAnalysis::default),
    })
}
