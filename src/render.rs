//! Terminal rendering for rota-core types.

use owo_colors::OwoColorize;
use rota_core::local::Applied;
use rota_core::reconcile::ReconcileSummary;
use rota_core::remote::{RemoteArtifact, RemoteContainer};
use rota_core::resolver::{ResolutionSource, ResolvedContainer};

use crate::utils::tui::pluralize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for ReconcileSummary {
    fn render(&self) -> String {
        if self.is_empty() {
            return "No record changes".dimmed().to_string();
        }

        let mut lines = Vec::new();
        for change in &self.changes {
            let mut parts = Vec::new();
            if change.added > 0 {
                parts.push(format!("+{}", change.added).green().to_string());
            }
            if change.updated > 0 {
                parts.push(format!("~{}", change.updated).yellow().to_string());
            }
            if change.removed > 0 {
                parts.push(format!("-{}", change.removed).red().to_string());
            }
            lines.push(format!("   {} {}", change.collection, parts.join(" ")));
        }

        let (added, updated, removed) = self.totals();
        lines.push(format!(
            "\n{} added, {} updated, {} removed",
            pluralize("record", added),
            updated,
            removed
        ));
        lines.join("\n")
    }
}

impl Render for Applied {
    fn render(&self) -> String {
        match (self.written, self.summary.is_empty()) {
            (false, _) => "Local roster already up to date".dimmed().to_string(),
            (true, true) => "Local roster reordered to match".dimmed().to_string(),
            (true, false) => self.summary.render(),
        }
    }
}

fn format_size(bytes: Option<u64>) -> String {
    match bytes {
        Some(b) if b >= 1024 * 1024 => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
        Some(b) if b >= 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        Some(b) => format!("{b} B"),
        None => "?".to_string(),
    }
}

impl Render for RemoteArtifact {
    fn render(&self) -> String {
        let modified = self
            .last_modified_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let owner = if self.owned_by_current_principal {
            String::new()
        } else {
            format!(" {}", "(shared with you)".dimmed())
        };

        format!(
            "{}  {}  {}  {}{}",
            modified,
            self.name.bold(),
            format_size(self.size_bytes).dimmed(),
            self.id.dimmed(),
            owner
        )
    }
}

impl Render for RemoteContainer {
    fn render(&self) -> String {
        let location = match &self.space_id {
            Some(space) => format!("shared drive {space}"),
            None if self.is_shared => "My Drive, shared".to_string(),
            None => "My Drive".to_string(),
        };
        format!("{} ({}) {}", self.name.bold(), location, self.id.dimmed())
    }
}

impl Render for ResolvedContainer {
    fn render(&self) -> String {
        let source = match self.source {
            ResolutionSource::Pinned => "pinned by fixed_container_id",
            ResolutionSource::Found => "found by name",
            ResolutionSource::Created => "created",
            ResolutionSource::CreatedRaceLost => "created, but another client's folder won",
        };

        let mut lines = vec![format!("{}\n   {}", self.container.render(), source.dimmed())];

        if self.has_duplicates() {
            lines.push(format!(
                "\n{}",
                format!(
                    "{} with the same name also exist:",
                    pluralize("other folder", self.duplicates.len())
                )
                .yellow()
            ));
            for duplicate in &self.duplicates {
                lines.push(format!("   {}", duplicate.render()));
            }
            lines.push(format!(
                "\nSet {} in config.toml to pin every client to one folder.",
                format!("fixed_container_id = \"{}\"", self.container.id).bold()
            ));
        }

        lines.join("\n")
    }
}
