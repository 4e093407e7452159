//! Shared bootstrap for the tutor binaries: logging, configuration, the index
//! store and console rendering.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tutor_core::config::{Config, Settings};
use tutor_core::traits::Embedder;
use tutor_embed::get_default_embedder;
use tutor_index::{IndexStore, StoreSettings};
use tutor_rag::{GeneralAnswer, MathAnswer, ResponseBody, TutorResponse};

/// Logs go to stderr so stdout carries only answers. `-v` counts pick the
/// level; without them `RUST_LOG` applies, defaulting to `warn`.
pub fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

pub struct Bootstrap {
    pub config: Config,
    pub settings: Settings,
}

impl Bootstrap {
    pub fn load(config_dir: Option<&Path>) -> Result<Self> {
        let config = match config_dir {
            Some(dir) => Config::load_from(dir),
            None => Config::load(),
        }
        .context("loading configuration")?;
        let settings = config.settings()?;
        Ok(Self { config, settings })
    }

    pub fn index_dir(&self, override_dir: Option<PathBuf>) -> Result<PathBuf> {
        match override_dir {
            Some(dir) => Ok(dir),
            None => Ok(self.config.index_dir()?),
        }
    }

    pub fn data_dir(&self, override_dir: Option<PathBuf>) -> Result<PathBuf> {
        match override_dir {
            Some(dir) => Ok(dir),
            None => Ok(self.config.data_dir()?),
        }
    }

    /// Empty store wired to the configured embedder.
    pub fn new_store(&self) -> Result<IndexStore> {
        let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&self.settings).context("creating embedder")?);
        Ok(IndexStore::new(self.settings.routing.subject_order(), embedder, StoreSettings::from(&self.settings)))
    }

    /// Store restored from `index_dir`. Missing artifacts leave subjects empty.
    pub fn open_store(&self, index_dir: &Path) -> Result<Arc<IndexStore>> {
        let store = self.new_store()?;
        let loaded = store
            .restore(index_dir)
            .with_context(|| format!("restoring indices from {}", index_dir.display()))?;
        info!(loaded, dir = %index_dir.display(), "opened index store");
        Ok(Arc::new(store))
    }
}

/// Console rendering of a structured answer.
pub fn render_response(response: &TutorResponse) -> String {
    let mut out = String::new();
    match &response.body {
        ResponseBody::General(g) => render_general(&mut out, g),
        ResponseBody::Math(m) => render_math(&mut out, m),
    }
    let meta = &response.metadata;
    let _ = writeln!(
        out,
        "\n📚 {} | 🌐 {} | 🔢 {} | 📄 {} docs | confidence {:.2}",
        meta.subject,
        meta.language,
        if meta.is_computational_problem { "math" } else { "general" },
        meta.documents_retrieved,
        meta.confidence
    );
    out
}

fn render_general(out: &mut String, g: &GeneralAnswer) {
    let _ = writeln!(out, "📌 {}\n", g.caption);
    let _ = writeln!(out, "{}", g.summary);
    if !g.bullet_points.is_empty() {
        out.push('\n');
        for b in &g.bullet_points {
            let _ = writeln!(out, "  • {}", b.point);
        }
    }
    for table in &g.table {
        if let Some(header) = table.get("header").and_then(|h| h.as_str()) {
            let _ = writeln!(out, "\n  {header}");
        }
        let rows = table.get("rows").and_then(|r| r.as_array()).map_or(&[][..], Vec::as_slice);
        for row in rows {
            let property = row.get("property").and_then(|v| v.as_str()).unwrap_or_default();
            let value = row.get("value").map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string)).unwrap_or_default();
            let _ = writeln!(out, "    {property}: {value}");
        }
    }
}

fn render_math(out: &mut String, m: &MathAnswer) {
    let _ = writeln!(out, "📐 {}\n", m.caption);
    if !m.problem.is_empty() {
        let _ = writeln!(out, "Problem: {}\n", m.problem);
    }
    for step in &m.steps {
        let _ = writeln!(out, "Step {}: {}", step.step_number, step.action);
        for line in [&step.explanation, &step.expression, &step.result] {
            if !line.is_empty() {
                let _ = writeln!(out, "    {line}");
            }
        }
    }
    if !m.final_answer.is_empty() {
        let _ = writeln!(out, "\n✅ Answer: {}", m.final_answer);
    }
    if !m.concept_used.is_empty() {
        let _ = writeln!(out, "Concepts: {}", m.concept_used.join(", "));
    }
    for tip in &m.tips {
        let _ = writeln!(out, "💡 {tip}");
    }
}
