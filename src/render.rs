//! Pre-invoice document renderer.
//!
//! Renders an HTML pre-invoice into the configured invoices directory.
//! The layout mirrors the classic pre-invoice sheet: header with
//! reference and date, client block, item table, total in Kz, optional
//! notes.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::emitter::DocumentRenderer;
use crate::error::EmitError;
use crate::pipeline::types::QuotationDraft;

const INVOICE_TEMPLATE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Pre-invoice {{ reference }}</title></head>
<body>
  <h1>Pre-invoice</h1>
  <p>Reference: {{ reference }}<br>Date: {{ generated_at }}</p>
  <h2>Client</h2>
  <p>{{ draft.client_name }}<br>{{ draft.client_email }}</p>
  <h2>Items</h2>
  <table border="1" cellspacing="0" cellpadding="4">
    <tr><th>Description</th><th>Qty</th><th>Unit price</th></tr>
    {% for item in draft.line_items -%}
    <tr><td>{{ item.description }}</td><td>{{ item.quantity }}</td><td>{{ item.unit_price }} Kz</td></tr>
    {% endfor -%}
  </table>
  <p><strong>Total: {{ draft.total }} Kz</strong></p>
  {% if draft.notes %}<p>Notes: {{ draft.notes }}</p>{% endif %}
</body>
</html>
"#;

/// Writes `prefatura-<reference>.html` files into an invoices directory.
pub struct HtmlInvoiceRenderer {
    invoices_dir: PathBuf,
}

impl HtmlInvoiceRenderer {
    pub fn new(invoices_dir: PathBuf) -> Self {
        Self { invoices_dir }
    }
}

#[async_trait]
impl DocumentRenderer for HtmlInvoiceRenderer {
    async fn render(
        &self,
        reference: &str,
        draft: &QuotationDraft,
    ) -> Result<PathBuf, EmitError> {
        tokio::fs::create_dir_all(&self.invoices_dir)
            .await
            .map_err(|e| EmitError::Render(format!("creating invoices dir: {e}")))?;

        let mut context = tera::Context::new();
        context.insert("reference", reference);
        context.insert("draft", draft);
        context.insert("generated_at", &Utc::now().format("%Y-%m-%d %H:%M UTC").to_string());

        let html = tera::Tera::one_off(INVOICE_TEMPLATE, &context, true)
            .map_err(|e| EmitError::Render(format!("template: {e}")))?;

        let path = self.invoices_dir.join(format!("prefatura-{reference}.html"));
        tokio::fs::write(&path, html)
            .await
            .map_err(|e| EmitError::Render(format!("writing {}: {e}", path.display())))?;

        debug!(path = %path.display(), "Wrote pre-invoice");
        Ok(path)
    }
}
