use chrono::{DateTime, SecondsFormat, Utc};
use common::{ImportRequest, ImportSummary};
use gallery_core::{ExportDocument, parse_import, repair_entries};
use serde_json::Value;
use tracing::info;

use crate::{GalleryClient, GalleryError, Result};

impl GalleryClient {
    pub async fn export(&self, now: DateTime<Utc>) -> Result<ExportDocument> {
        let apps = self.list_apps().await?;
        info!(apps = apps.len(), "exported collection");
        Ok(ExportDocument::new(apps, now))
    }

    /// Parses an import file. A shape error returns before any request is made.
    pub async fn import_text(&self, text: &str) -> Result<ImportSummary> {
        let entries = parse_import(text)?;
        self.import_entries(entries).await
    }

    pub async fn import_entries(&self, apps: Vec<Value>) -> Result<ImportSummary> {
        let total = apps.len();
        let summary: ImportSummary = self
            .execute_json(
                self.http
                    .post(self.url("/api/apps/import"))
                    .json(&ImportRequest { apps }),
                "import apps",
            )
            .await?;

        if summary.status != "success" {
            return Err(GalleryError::Rejected {
                action: "import apps",
                status: summary.status,
                message: summary.error,
            });
        }

        info!(
            submitted = total,
            imported = summary.imported,
            updated = summary.updated,
            "imported apps"
        );
        Ok(summary)
    }

    /// Rewrites every stored entry into the current layout and re-imports it.
    pub async fn repair(&self, now: DateTime<Utc>) -> Result<ImportSummary> {
        let stored = self.list_apps_raw().await?;
        let stamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let repaired = repair_entries(&stored, &stamp);
        info!(
            stored = stored.len(),
            repaired = repaired.len(),
            "repairing collection"
        );
        self.import_entries(repaired).await
    }
}
