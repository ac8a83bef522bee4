//! # HTMLページ描画
//!
//! `error.html`、`signature_detail.html`、一覧ページとそのインライン断片を生成する。
//! 埋め込む値はすべて `escape` を通す。


use crits_types::Signature;

use crate::service::{ListPage, SignatureDetail};
use crate::urls;

/// HTMLエスケープ（`& < > " '`）。
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>CRITs - {}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

/// `error.html`
pub fn error_page(message: &str) -> String {
    document(
        "Error",
        &format!("<div class=\"error\">{}</div>", escape(message)),
    )
}

/// `signature_detail.html`
pub fn detail_page(detail: &SignatureDetail, is_admin: bool) -> String {
    let sig = &detail.signature;
    let mut body = String::new();

    body.push_str(&format!(
        "<h1>{}</h1>\n<table class=\"details\">\n",
        escape(&sig.title)
    ));
    for (label, value) in [
        ("ID", sig.id.clone()),
        ("Link ID", sig.link_id.clone()),
        ("Version", sig.version.to_string()),
        ("Data Type", sig.data_type.clone()),
        ("Status", sig.status.clone()),
        ("Description", sig.description.clone()),
        ("SHA-256", sig.sha256.clone()),
        ("Analyst", sig.analyst.clone()),
        ("Created", sig.created.to_string()),
        ("Modified", sig.modified.to_string()),
    ] {
        body.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            label,
            escape(&value)
        ));
    }
    body.push_str("</table>\n");

    body.push_str(&format!(
        "<h2>Data</h2>\n<pre class=\"signature-data\">{}</pre>\n",
        escape(&sig.data)
    ));

    body.push_str("<h2>Sources</h2>\n<ul class=\"sources\">\n");
    for source in &sig.sources {
        for inst in &source.instances {
            body.push_str(&format!(
                "<li>{} ({}, {}) by {} at {}</li>\n",
                escape(&source.name),
                escape(&inst.method),
                escape(&inst.reference),
                escape(&inst.analyst),
                inst.date
            ));
        }
    }
    body.push_str("</ul>\n");

    push_list(&mut body, "Buckets", "buckets", &sig.bucket_list);
    push_list(&mut body, "Tickets", "tickets", &sig.tickets);

    body.push_str("<h2>Relationships</h2>\n<ul class=\"relationships\">\n");
    for rel in &sig.relationships {
        body.push_str(&format!(
            "<li>{}: {} {}</li>\n",
            escape(&rel.relationship),
            escape(&rel.object_type),
            escape(&rel.object_id)
        ));
    }
    body.push_str("</ul>\n");

    body.push_str("<h2>Versions</h2>\n<ul class=\"versions\">\n");
    for v in &detail.versions {
        let marker = if v.version == sig.version { " (current)" } else { "" };
        body.push_str(&format!(
            "<li><a href=\"{}\">Version {}</a>{}</li>\n",
            escape(&v.link),
            v.version,
            marker
        ));
    }
    body.push_str("</ul>\n");

    if is_admin {
        body.push_str(&format!(
            "<a class=\"remove\" href=\"{}\">Remove</a>\n",
            escape(&urls::remove_path(&sig.id))
        ));
    }

    document(&sig.title, &body)
}

fn push_list(body: &mut String, heading: &str, class: &str, items: &[String]) {
    body.push_str(&format!("<h2>{heading}</h2>\n<ul class=\"{class}\">\n"));
    for item in items {
        body.push_str(&format!("<li>{}</li>\n", escape(item)));
    }
    body.push_str("</ul>\n");
}

fn listing_row(sig: &Signature) -> String {
    format!(
        "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        escape(&urls::detail_path(&sig.id)),
        escape(&sig.title),
        escape(&sig.data_type),
        sig.version,
        escape(&sig.description),
        sig.modified
    )
}

/// 一覧テーブルの断片（`inline`）。
pub fn listing_table(page: &ListPage) -> String {
    let mut out = String::from(
        "<table class=\"signatures\">\n<thead><tr><th>Title</th><th>Type</th><th>Version</th><th>Description</th><th>Modified</th></tr></thead>\n<tbody>\n",
    );
    for sig in &page.signatures {
        out.push_str(&listing_row(sig));
        out.push('\n');
    }
    out.push_str(&format!(
        "</tbody>\n</table>\n<div class=\"total\">{} signature(s)</div>",
        page.total
    ));
    out
}

/// 一覧ページ。
pub fn listing_page(page: &ListPage) -> String {
    let body = format!(
        "<h1>Signatures</h1>\n<a class=\"export\" href=\"{}csv/\">Export CSV</a>\n{}",
        urls::LISTING_PATH,
        listing_table(page)
    );
    document("Signatures", &body)
}
