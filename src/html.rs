//! Static HTML export of the rendered film table.
//!
//! The page keeps the `films-tbody` / `searchInput` element ids and carries a
//! small inline script, so the export filters live in a browser without any
//! other assets.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::domain::FVError;
use crate::format::escape_html;
use crate::table::{COLUMN_NAMES, Row, Table};

/// Render the whole page. Rows hidden by the current filter stay in the page with `display: none`.
pub fn render_page(table: &Table, title: &str, filter: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <input type="text" id="searchInput" placeholder="Search films..." value="{filter}">
    <table>
        <thead>
            <tr>{header}</tr>
        </thead>
        <tbody id="films-tbody">
{rows}        </tbody>
    </table>
    <script>{js}</script>
</body>
</html>
"#,
        title = escape_html(title),
        css = inline_css(),
        filter = escape_html(filter),
        header = render_header(),
        rows = render_rows(table),
        js = inline_javascript(),
    )
}

pub fn write_page(path: &Path, table: &Table, title: &str, filter: &str) -> Result<(), FVError> {
    if table.is_empty() {
        warn!("Exporting a table without rows");
    }
    let page = render_page(table, title, filter);
    fs::write(path, &page)?;
    info!(
        "Wrote {} rows ({} bytes) to {}",
        table.len(),
        page.len(),
        path.display()
    );
    Ok(())
}

fn render_header() -> String {
    COLUMN_NAMES
        .iter()
        .map(|name| format!("<th>{name}</th>"))
        .collect()
}

fn render_rows(table: &Table) -> String {
    table.rows().iter().map(render_row).collect()
}

fn render_row(row: &Row) -> String {
    let cells: String = row
        .cells()
        .iter()
        .map(|c| format!("<td>{}</td>", escape_html(c)))
        .collect();
    if row.is_visible() {
        format!("            <tr>{cells}</tr>\n")
    } else {
        format!("            <tr style=\"display: none\">{cells}</tr>\n")
    }
}

fn inline_css() -> &'static str {
    "body{font-family:sans-serif;margin:2em}\
     #searchInput{width:100%;padding:.5em;margin-bottom:1em}\
     table{border-collapse:collapse;width:100%}\
     th,td{border:1px solid #ddd;padding:.4em;text-align:left}\
     th{background:#f4f4f4}"
}

fn inline_javascript() -> &'static str {
    "const input=document.getElementById('searchInput');\
     const tbody=document.getElementById('films-tbody');\
     input.addEventListener('input',()=>{\
     const term=input.value.toLowerCase();\
     for(const row of tbody.rows){\
     const text=Array.from(row.cells,c=>c.textContent).join(' ').toLowerCase();\
     row.style.display=text.includes(term)?'':'none';}});"
}
