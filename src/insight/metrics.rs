//! Complexity, coupling, and cohesion metrics over the indexed symbol set.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cancel::CancelToken;
use crate::error::LciError;
use crate::index::{is_test_path, CodeIndex};

// ─── Complexity ──────────────────────────────────────────────────────

/// Distribution bucket edges: low < 5, medium 5–10, high > 10.
const MEDIUM_EDGE: u16 = 5;
const HIGH_EDGE: u16 = 10;

/// Number of worst offenders reported.
const TOP_COMPLEX_FUNCS: usize = 10;

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FunctionComplexity {
    pub name: String,
    pub path: String,
    pub line: u32,
    pub complexity: u16,
    pub object_id: String,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityMetrics {
    pub avg: f64,
    pub median: f64,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub high_complexity_funcs: Vec<FunctionComplexity>,
}

pub fn complexity_metrics(index: &CodeIndex) -> ComplexityMetrics {
    let mut values: Vec<(u16, u32)> = index
        .symbols
        .iter()
        .filter(|(_, s)| s.kind.is_callable())
        .map(|(ord, s)| (s.complexity, ord))
        .collect();

    if values.is_empty() {
        return ComplexityMetrics::default();
    }

    let sum: u64 = values.iter().map(|&(c, _)| c as u64).sum();
    let avg = sum as f64 / values.len() as f64;

    let mut sorted: Vec<u16> = values.iter().map(|&(c, _)| c).collect();
    sorted.sort_unstable();
    let median = if sorted.len() % 2 == 1 {
        sorted[sorted.len() / 2] as f64
    } else {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) as f64 / 2.0
    };

    let low = sorted.iter().filter(|&&c| c < MEDIUM_EDGE).count();
    let medium = sorted
        .iter()
        .filter(|&&c| (MEDIUM_EDGE..=HIGH_EDGE).contains(&c))
        .count();
    let high = sorted.iter().filter(|&&c| c > HIGH_EDGE).count();

    values.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    let high_complexity_funcs = values
        .iter()
        .take(TOP_COMPLEX_FUNCS)
        .filter(|&&(c, _)| c > HIGH_EDGE)
        .map(|&(c, ord)| {
            let symbol = index.symbols.get(ord).expect("iterated ordinal");
            FunctionComplexity {
                name: symbol.name.clone(),
                path: index.files.path(symbol.file_id).unwrap_or("").to_string(),
                line: symbol.line,
                complexity: c,
                object_id: index.symbols.object_id(ord),
            }
        })
        .collect();

    ComplexityMetrics {
        avg: (avg * 100.0).round() / 100.0,
        median,
        low,
        medium,
        high,
        high_complexity_funcs,
    }
}

// ─── Packages ────────────────────────────────────────────────────────

/// A package is the directory path relative to the project root.
pub fn package_of(path: &str) -> String {
    path.rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_else(|| ".".to_string())
}

/// Open question resolved: a package is test-related iff more than half of
/// its files carry a test marker.
pub fn is_test_package(files: &[&str]) -> bool {
    if files.is_empty() {
        return false;
    }
    let marked = files.iter().filter(|f| is_test_path(f)).count();
    marked * 2 > files.len()
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetrics {
    pub package: String,
    pub symbols: usize,
    pub internal: usize,
    pub efferent: usize,
    pub afferent: usize,
    /// internal / (internal + efferent); 0.5 with no references.
    pub cohesion: f64,
    /// min(efferent / (symbols × 5), 1.0).
    pub coupling: f64,
    /// Martin's I = Ce / (Ca + Ce); 0.5 when isolated.
    pub instability: f64,
    pub test_related: bool,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CouplingCohesion {
    pub packages: Vec<PackageMetrics>,
    pub avg_cohesion: f64,
    pub min_cohesion: f64,
    pub avg_coupling: f64,
    pub avg_instability: f64,
    pub max_instability: f64,
    /// Five lowest-cohesion packages, test-related ones excluded.
    pub low_cohesion_packages: Vec<PackageMetrics>,
}

/// Number of low-cohesion packages reported.
const LOW_COHESION_LIMIT: usize = 5;

/// Enumerate references and bucket per package. Checks cancellation between
/// packages — this is the long pole of the intelligence aggregator.
pub fn coupling_cohesion(
    index: &CodeIndex,
    cancel: &CancelToken,
) -> Result<CouplingCohesion, LciError> {
    struct Acc {
        symbols: usize,
        internal: usize,
        efferent: usize,
        afferent: usize,
        files: Vec<String>,
    }
    let mut acc: BTreeMap<String, Acc> = BTreeMap::new();

    for file_id in 0..index.files.len() as u32 {
        let Some(path) = index.files.path(file_id) else {
            continue;
        };
        let package = package_of(path);
        let entry = acc.entry(package).or_insert_with(|| Acc {
            symbols: 0,
            internal: 0,
            efferent: 0,
            afferent: 0,
            files: Vec::new(),
        });
        entry.symbols += index.symbols.in_file(file_id).len();
        entry.files.push(path.to_string());
    }

    for edge in index.refs.edges() {
        let source_pkg = index
            .symbols
            .get(edge.source)
            .and_then(|s| index.files.path(s.file_id))
            .map(package_of);
        let target_pkg = index
            .symbols
            .get(edge.target)
            .and_then(|s| index.files.path(s.file_id))
            .map(package_of);
        let (Some(source_pkg), Some(target_pkg)) = (source_pkg, target_pkg) else {
            continue;
        };

        if source_pkg == target_pkg {
            if let Some(a) = acc.get_mut(&source_pkg) {
                a.internal += 1;
            }
        } else {
            if let Some(a) = acc.get_mut(&source_pkg) {
                a.efferent += 1;
            }
            if let Some(a) = acc.get_mut(&target_pkg) {
                a.afferent += 1;
            }
        }
    }

    let mut packages = Vec::new();
    for (package, a) in acc {
        cancel.check()?;

        let cohesion = if a.internal + a.efferent == 0 {
            0.5
        } else {
            a.internal as f64 / (a.internal + a.efferent) as f64
        };
        let coupling = if a.symbols == 0 {
            0.0
        } else {
            (a.efferent as f64 / (a.symbols as f64 * 5.0)).min(1.0)
        };
        let instability = if a.afferent + a.efferent == 0 {
            0.5
        } else {
            a.efferent as f64 / (a.afferent + a.efferent) as f64
        };
        let file_refs: Vec<&str> = a.files.iter().map(String::as_str).collect();

        packages.push(PackageMetrics {
            package,
            symbols: a.symbols,
            internal: a.internal,
            efferent: a.efferent,
            afferent: a.afferent,
            cohesion: round2(cohesion),
            coupling: round2(coupling),
            instability: round2(instability),
            test_related: is_test_package(&file_refs),
        });
    }

    if packages.is_empty() {
        return Ok(CouplingCohesion::default());
    }

    let n = packages.len() as f64;
    let avg_cohesion = packages.iter().map(|p| p.cohesion).sum::<f64>() / n;
    let min_cohesion = packages
        .iter()
        .map(|p| p.cohesion)
        .fold(f64::INFINITY, f64::min);
    let avg_coupling = packages.iter().map(|p| p.coupling).sum::<f64>() / n;
    let avg_instability = packages.iter().map(|p| p.instability).sum::<f64>() / n;
    let max_instability = packages
        .iter()
        .map(|p| p.instability)
        .fold(0.0f64, f64::max);

    let mut ranked: Vec<PackageMetrics> = packages
        .iter()
        .filter(|p| !p.test_related)
        .cloned()
        .collect();
    ranked.sort_by(|a, b| {
        a.cohesion
            .total_cmp(&b.cohesion)
            .then_with(|| a.package.cmp(&b.package))
    });
    ranked.truncate(LOW_COHESION_LIMIT);

    Ok(CouplingCohesion {
        packages,
        avg_cohesion: round2(avg_cohesion),
        min_cohesion: round2(min_cohesion),
        avg_coupling: round2(avg_coupling),
        avg_instability: round2(avg_instability),
        max_instability: round2(max_instability),
        low_cohesion_packages: ranked,
    })
}

// ─── Quality ─────────────────────────────────────────────────────────

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// 0–100, higher is better.
    pub maintainability_index: f64,
    /// Share of callable symbols above the high-complexity edge.
    pub technical_debt_ratio: f64,
}

pub fn quality_metrics(complexity: &ComplexityMetrics, coupling: &CouplingCohesion) -> QualityMetrics {
    let total = complexity.low + complexity.medium + complexity.high;
    let debt = if total == 0 {
        0.0
    } else {
        complexity.high as f64 / total as f64
    };
    let maintainability =
        (100.0 - complexity.avg * 4.0 - coupling.avg_coupling * 30.0).clamp(0.0, 100.0);
    QualityMetrics {
        maintainability_index: round2(maintainability),
        technical_debt_ratio: round2(debt),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
