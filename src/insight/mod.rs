//! Codebase intelligence aggregator: health, complexity, coupling,
//! cohesion, module boundaries, and domain vocabulary — rendered as
//! compact LCF/1.0 text.

pub mod domain;
pub mod health;
pub mod lcf;
pub mod metrics;

use std::collections::BTreeMap;

use crate::cancel::CancelToken;
use crate::error::{CommonMistake, LciError};
use crate::index::CodeIndex;

use self::domain::domain_vocabulary;
use self::health::{health_dashboard, HealthOptions};
use self::lcf::{num, LcfWriter, HOTSPOTS_LIMIT, MEMORY_SCORES_LIMIT};
use self::metrics::{complexity_metrics, coupling_cohesion, package_of, quality_metrics};

// ─── Modes ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightMode {
    Overview,
    Detailed,
    Statistics,
    Unified,
    Structure,
    GitAnalyze,
    GitHotspots,
}

impl InsightMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "overview" => Some(Self::Overview),
            "detailed" => Some(Self::Detailed),
            "statistics" => Some(Self::Statistics),
            "unified" => Some(Self::Unified),
            "structure" => Some(Self::Structure),
            "git_analyze" => Some(Self::GitAnalyze),
            "git_hotspots" => Some(Self::GitHotspots),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Detailed => "detailed",
            Self::Statistics => "statistics",
            Self::Unified => "unified",
            Self::Structure => "structure",
            Self::GitAnalyze => "git_analyze",
            Self::GitHotspots => "git_hotspots",
        }
    }

    fn tier(&self) -> u8 {
        match self {
            Self::Overview | Self::Structure => 1,
            Self::Detailed => 2,
            Self::Statistics | Self::Unified => 3,
            Self::GitAnalyze | Self::GitHotspots => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailedAnalysis {
    Modules,
    Layers,
    Features,
    Terms,
    Relationships,
}

impl DetailedAnalysis {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "modules" => Some(Self::Modules),
            "layers" => Some(Self::Layers),
            "features" => Some(Self::Features),
            "terms" => Some(Self::Terms),
            "relationships" => Some(Self::Relationships),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InsightRequest {
    pub mode: Option<InsightMode>,
    pub analysis: Option<DetailedAnalysis>,
    /// Statistics subset: complexity, coupling, cohesion, quality.
    /// Empty means all.
    pub metrics: Vec<String>,
    /// Overrides the mode's tier number in the payload header.
    pub tier: Option<u8>,
}

// ─── Entry point ─────────────────────────────────────────────────────

/// Run one `code_insight` query and render the LCF payload.
pub fn code_insight(
    index: &CodeIndex,
    request: &InsightRequest,
    options: &HealthOptions,
    cancel: &CancelToken,
) -> Result<String, LciError> {
    let mode = request.mode.unwrap_or(InsightMode::Overview);

    match mode {
        InsightMode::GitAnalyze | InsightMode::GitHotspots => {
            return Err(LciError::validation(
                "mode",
                "git analysis is not wired into this build",
                mode.as_str(),
                "E_MODE_UNAVAILABLE",
                vec![CommonMistake {
                    mistake: format!(r#"{{"mode": "{}"}}"#, mode.as_str()),
                    corrected: r#"{"mode": "overview"}"#.to_string(),
                }],
            ));
        }
        InsightMode::Detailed if request.analysis.is_none() => {
            return Err(LciError::validation(
                "analysis",
                "mode 'detailed' requires an analysis of modules, layers, features, terms, or relationships",
                "",
                "E_MISSING_ANALYSIS",
                vec![CommonMistake {
                    mistake: r#"{"mode": "detailed"}"#.to_string(),
                    corrected: r#"{"mode": "detailed", "analysis": "modules"}"#.to_string(),
                }],
            ));
        }
        _ => {}
    }

    if !index.is_ready() {
        return Err(LciError::IndexUnavailable(
            "index not initialized".to_string(),
        ));
    }

    let mut w = LcfWriter::new(mode.as_str(), request.tier.unwrap_or(mode.tier()));

    match mode {
        InsightMode::Overview => {
            write_overview(&mut w, index, options, cancel)?;
        }
        InsightMode::Detailed => {
            let analysis = request.analysis.expect("validated above");
            write_detailed(&mut w, index, analysis, cancel)?;
        }
        InsightMode::Statistics => {
            write_statistics(&mut w, index, &request.metrics, options, cancel)?;
        }
        InsightMode::Unified => {
            write_overview(&mut w, index, options, cancel)?;
            cancel.check()?;
            write_detailed(&mut w, index, DetailedAnalysis::Modules, cancel)?;
            cancel.check()?;
            write_statistics(&mut w, index, &[], options, cancel)?;
        }
        InsightMode::Structure => {
            write_structure(&mut w, index);
        }
        InsightMode::GitAnalyze | InsightMode::GitHotspots => unreachable!("rejected above"),
    }

    Ok(w.finish())
}

// ─── Section writers ─────────────────────────────────────────────────

fn write_overview(
    w: &mut LcfWriter,
    index: &CodeIndex,
    options: &HealthOptions,
    cancel: &CancelToken,
) -> Result<(), LciError> {
    let dash = health_dashboard(index, options, cancel)?;

    w.section("overview").kv(&[
        ("files", index.files.len().to_string()),
        ("symbols", index.symbols.len().to_string()),
        ("references", index.refs.len().to_string()),
        ("packages", dash.coupling.packages.len().to_string()),
        ("generation", index.generation.to_string()),
    ]);

    w.section("health").kv(&[
        ("score", num(dash.score)),
        ("grade", dash.grade.to_string()),
        ("avgComplexity", num(dash.complexity.avg)),
        ("avgCohesion", num(dash.coupling.avg_cohesion)),
        ("maintainability", num(dash.quality.maintainability_index)),
    ]);

    let vocab = domain_vocabulary(index);
    {
        let mut section = w.section("domains");
        for term in vocab.iter().take(5) {
            section.kv(&[
                ("domain", term.domain.clone()),
                ("confidence", num(term.confidence)),
                ("count", term.count.to_string()),
                ("terms", term.terms.iter().take(6).cloned().collect::<Vec<_>>().join(",")),
            ]);
        }
    }

    write_memory_pressure(w, &dash);
    Ok(())
}

fn write_detailed(
    w: &mut LcfWriter,
    index: &CodeIndex,
    analysis: DetailedAnalysis,
    cancel: &CancelToken,
) -> Result<(), LciError> {
    match analysis {
        DetailedAnalysis::Modules => {
            let cc = coupling_cohesion(index, cancel)?;
            let mut section = w.section("modules");
            for p in &cc.packages {
                section.kv(&[
                    ("package", p.package.clone()),
                    ("symbols", p.symbols.to_string()),
                    ("cohesion", num(p.cohesion)),
                    ("instability", num(p.instability)),
                    ("afferent", p.afferent.to_string()),
                    ("efferent", p.efferent.to_string()),
                ]);
            }
        }
        DetailedAnalysis::Layers => {
            let mut layers: BTreeMap<String, (usize, usize)> = BTreeMap::new();
            for file_id in 0..index.files.len() as u32 {
                let Some(path) = index.files.path(file_id) else {
                    continue;
                };
                let layer = path.split('/').next().unwrap_or(".").to_string();
                let entry = layers.entry(layer).or_insert((0, 0));
                entry.0 += 1;
                entry.1 += index.symbols.in_file(file_id).len();
            }
            let mut section = w.section("layers");
            for (layer, (files, symbols)) in layers {
                section.kv(&[
                    ("layer", layer),
                    ("files", files.to_string()),
                    ("symbols", symbols.to_string()),
                ]);
            }
        }
        DetailedAnalysis::Features => {
            let vocab = domain_vocabulary(index);
            let mut section = w.section("features");
            for term in &vocab {
                section.kv(&[
                    ("feature", term.domain.clone()),
                    ("confidence", num(term.confidence)),
                    ("count", term.count.to_string()),
                ]);
            }
        }
        DetailedAnalysis::Terms => {
            let vocab = domain_vocabulary(index);
            let mut section = w.section("terms");
            for term in &vocab {
                section.line(format!("{}: {}", term.domain, term.terms.join(",")));
            }
        }
        DetailedAnalysis::Relationships => {
            let mut by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
            for edge in index.refs.edges() {
                *by_kind.entry(edge.kind.as_str()).or_insert(0) += 1;
            }
            let pairs: Vec<(&str, String)> = by_kind
                .iter()
                .map(|(k, v)| (*k, v.to_string()))
                .collect();
            {
                let mut section = w.section("relationships");
                if !pairs.is_empty() {
                    section.kv(&pairs);
                }
            }

            // Most-connected symbols.
            let mut ranked: Vec<(usize, u32)> = index
                .symbols
                .iter()
                .map(|(ord, _)| {
                    let stats = index.refs.stats(ord);
                    (stats.incoming + stats.outgoing, ord)
                })
                .filter(|&(total, _)| total > 0)
                .collect();
            ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
            let mut section = w.section("hubs");
            for &(total, ord) in ranked.iter().take(10) {
                let symbol = index.symbols.get(ord).expect("ranked ordinal");
                let location = format!(
                    "{}:{}",
                    index.files.path(symbol.file_id).unwrap_or(""),
                    symbol.line
                );
                section.entry(
                    if total > 20 { "high" } else { "info" },
                    symbol.kind.as_str(),
                    &symbol.name,
                    &location,
                    &index.symbols.object_id(ord),
                );
            }
        }
    }
    Ok(())
}

fn wants_metric(subset: &[String], name: &str) -> bool {
    subset.is_empty() || subset.iter().any(|m| m.eq_ignore_ascii_case(name))
}

fn write_statistics(
    w: &mut LcfWriter,
    index: &CodeIndex,
    subset: &[String],
    options: &HealthOptions,
    cancel: &CancelToken,
) -> Result<(), LciError> {
    let complexity = complexity_metrics(index);
    let cc = coupling_cohesion(index, cancel)?;

    if wants_metric(subset, "complexity") {
        let mut section = w.section("complexity");
        section.kv(&[
            ("avg", num(complexity.avg)),
            ("median", num(complexity.median)),
            ("low", complexity.low.to_string()),
            ("medium", complexity.medium.to_string()),
            ("high", complexity.high.to_string()),
        ]);
        for f in &complexity.high_complexity_funcs {
            let location = format!("{}:{}", f.path, f.line);
            section.entry(
                if f.complexity > 20 { "high" } else { "medium" },
                "function",
                &f.name,
                &location,
                &f.object_id,
            );
        }
    }

    if wants_metric(subset, "coupling") {
        w.section("coupling").kv(&[
            ("avg", num(cc.avg_coupling)),
            ("avgInstability", num(cc.avg_instability)),
            ("maxInstability", num(cc.max_instability)),
        ]);
    }

    if wants_metric(subset, "cohesion") {
        let mut section = w.section("cohesion");
        section.kv(&[
            ("avg", num(cc.avg_cohesion)),
            ("min", num(cc.min_cohesion)),
        ]);
        for p in &cc.low_cohesion_packages {
            section.line(format!("low: {} cohesion={}", p.package, num(p.cohesion)));
        }
    }

    if wants_metric(subset, "quality") {
        let quality = quality_metrics(&complexity, &cc);
        w.section("quality").kv(&[
            ("maintainability", num(quality.maintainability_index)),
            ("debtRatio", num(quality.technical_debt_ratio)),
        ]);

        cancel.check()?;
        let dash = health_dashboard(index, options, cancel)?;
        {
            let mut section = w.section("smells");
            if dash.smells.total() > 0 {
                section.kv(&[
                    ("highComplexity", dash.smells.high_complexity.to_string()),
                    ("largeFiles", dash.smells.large_files.to_string()),
                    ("lowCohesion", dash.smells.low_cohesion_packages.to_string()),
                ]);
            }
        }
        {
            // All provided problem symbols are shown (no extra cap here).
            let mut section = w.section("problem_symbols");
            for p in &dash.problematic {
                let location = format!("{}:{}", p.path, p.line);
                section.entry(p.severity, "function", &p.name, &location, &p.object_id);
            }
        }
        write_memory_pressure(w, &dash);
    }

    Ok(())
}

fn write_memory_pressure(w: &mut LcfWriter, dash: &health::HealthDashboard) {
    let Some(ref mp) = dash.memory_pressure else {
        return;
    };
    let mut section = w.section("memory_pressure");
    for (path, score) in mp.scores.iter().take(MEMORY_SCORES_LIMIT) {
        section.kv(&[("path", path.clone()), ("score", num(*score))]);
    }
    for hotspot in mp.hotspots.iter().take(HOTSPOTS_LIMIT) {
        section.line(format!("hotspot: {}", hotspot));
    }
}

fn write_structure(w: &mut LcfWriter, index: &CodeIndex) {
    let mut dirs: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for file_id in 0..index.files.len() as u32 {
        let Some(path) = index.files.path(file_id) else {
            continue;
        };
        let entry = dirs.entry(package_of(path)).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += index.symbols.in_file(file_id).len();
    }
    let mut section = w.section("structure");
    for (dir, (files, symbols)) in dirs {
        section.kv(&[
            ("dir", dir),
            ("files", files.to_string()),
            ("symbols", symbols.to_string()),
        ]);
    }
}
