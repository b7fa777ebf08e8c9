//! 通用資源表格：以欄位定義與每列操作參數化，取代各實體重複的清單畫面。

use crate::utils::error::{AdminError, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub title: &'static str,
}

impl Column {
    pub const fn new(key: &'static str, title: &'static str) -> Self {
        Self { key, title }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    View,
    Edit,
    Delete,
    ChangePassword,
    ToggleActive,
    Stats,
}

impl fmt::Display for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::ChangePassword => "password",
            Self::ToggleActive => "toggle",
            Self::Stats => "stats",
        };
        f.write_str(label)
    }
}

pub trait Resource: Serialize {
    /// 複數名稱，例如 "users"
    const NAME: &'static str;

    fn columns() -> &'static [Column];

    fn cell(&self, key: &str) -> String;

    fn actions(&self) -> Vec<RowAction> {
        vec![RowAction::View, RowAction::Edit, RowAction::Delete]
    }

    fn allows(&self, action: RowAction) -> bool {
        self.actions().contains(&action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Tsv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unsupported format '{}'. Valid formats: table, csv, tsv, json",
                other
            )),
        }
    }
}

pub struct ResourceTable<'a, R: Resource> {
    rows: &'a [R],
    with_actions: bool,
}

impl<'a, R: Resource> ResourceTable<'a, R> {
    pub fn new(rows: &'a [R]) -> Self {
        Self {
            rows,
            with_actions: true,
        }
    }

    pub fn without_actions(mut self) -> Self {
        self.with_actions = false;
        self
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = R::columns().iter().map(|c| c.title.to_string()).collect();
        if self.with_actions {
            headers.push("Actions".to_string());
        }
        headers
    }

    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = R::columns().iter().map(|c| row.cell(c.key)).collect();
                if self.with_actions {
                    cells.push(
                        row.actions()
                            .iter()
                            .map(|a| a.to_string())
                            .collect::<Vec<_>>()
                            .join(" "),
                    );
                }
                cells
            })
            .collect()
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => Ok(self.render_text()),
            OutputFormat::Csv => self.render_delimited(b','),
            OutputFormat::Tsv => self.render_delimited(b'\t'),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self.rows)?),
        }
    }

    fn render_text(&self) -> String {
        if self.rows.is_empty() {
            return format!("No {} found.", R::NAME.replace('_', " "));
        }

        let headers = self.headers();
        let records = self.records();
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for record in &records {
            for (i, cell) in record.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let format_line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = vec![format_line(&headers)];
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        lines.extend(records.iter().map(|r| format_line(r)));
        lines.join("\n")
    }

    fn render_delimited(&self, delimiter: u8) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());
        writer.write_record(self.headers())?;
        for record in self.records() {
            writer.write_record(record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AdminError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| AdminError::invalid_state(e.to_string()))
    }
}

/// 以「鍵: 值」形式顯示單筆資料
pub fn render_detail<R: Resource>(row: &R, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(row)?);
    }
    let width = R::columns()
        .iter()
        .map(|c| c.title.chars().count())
        .max()
        .unwrap_or(0);
    Ok(R::columns()
        .iter()
        .map(|c| format!("{:<width$}  {}", c.title, row.cell(c.key), width = width))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
}

/// 頁碼從 1 開始；超出範圍時取最後一頁
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per_page;
    Page {
        items: items.iter().skip(start).take(per_page).cloned().collect(),
        page,
        total_pages,
    }
}

pub fn yes_no(value: bool) -> String {
    let label = if value { "yes" } else { "no" };
    label.to_string()
}

pub fn or_dash(value: Option<impl ToString>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}
