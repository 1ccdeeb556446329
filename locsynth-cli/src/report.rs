//! Human and JSON renderings of what a command did.

use std::path::Path;

use locsynth::{ResourceTarget, RunReport};
use serde::Serialize;

/// Serializable view of a [`RunReport`], paths relative to the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub android: Vec<String>,
    pub ios_tables: Vec<String>,
    pub registered: Vec<String>,
    pub manifest: Option<String>,
}

impl RunSummary {
    pub fn new(report: &RunReport, root: &Path) -> Self {
        let mut summary = RunSummary {
            android: report.android.iter().map(|p| relative(p, root)).collect(),
            ..RunSummary::default()
        };
        if let Some(ios) = &report.ios {
            summary.ios_tables = ios.tables.iter().map(|p| relative(p, root)).collect();
            summary.registered = ios.registered.clone();
            summary.manifest = ios.manifest.as_deref().map(|p| relative(p, root));
        }
        summary
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        section(&mut out, "Android resources", &self.android);
        section(&mut out, "iOS string tables", &self.ios_tables);
        section(&mut out, "Registered in Xcode project", &self.registered);
        match &self.manifest {
            Some(manifest) => out.push_str(&format!("Project manifest updated: {manifest}\n")),
            None if !self.ios_tables.is_empty() => out.push_str("Project manifest unchanged\n"),
            None => {}
        }
        if out.is_empty() {
            out.push_str("Nothing to do: no translations matched\n");
        }
        out
    }
}

/// One resolved `{locale, documentPath}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetRow {
    pub locale: String,
    pub document: String,
}

impl TargetRow {
    pub fn from_targets(targets: &[ResourceTarget], root: &Path) -> Vec<Self> {
        targets
            .iter()
            .map(|target| TargetRow {
                locale: target.locale.to_string(),
                document: relative(&target.document_path, root),
            })
            .collect()
    }

    pub fn render(rows: &[Self]) -> String {
        let width = rows.iter().map(|r| r.locale.len()).max().unwrap_or(0);
        rows.iter()
            .map(|row| format!("{:<width$}  {}\n", row.locale, row.document))
            .collect()
    }
}

fn section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("{title} ({}):\n", items.len()));
    for item in items {
        out.push_str(&format!("  {item}\n"));
    }
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
