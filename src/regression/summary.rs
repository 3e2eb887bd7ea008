//! Side-by-side regression tables, one column per model.

use std::fmt::Write as _;

use super::ols::OlsFit;

/// Significance stars for a two-sided p-value.
pub fn stars(p_value: f64) -> &'static str {
    if p_value < 0.01 {
        "***"
    } else if p_value < 0.05 {
        "**"
    } else if p_value < 0.1 {
        "*"
    } else {
        ""
    }
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    /// (coefficient cell, standard error cell) per reported regressor.
    cells: Vec<(String, String)>,
    r_squared: f64,
    nobs: usize,
}

/// Summary table comparing fits of the same specification across jurisdictions.
///
/// Only regressors listed in the table's order are reported; a regressor a
/// model does not carry is left blank in that column.
#[derive(Debug, Clone)]
pub struct SummaryTable {
    pub title: String,
    /// (regressor name in the fit, display label) in row order.
    order: Vec<(String, String)>,
    columns: Vec<Column>,
}

impl SummaryTable {
    pub fn new(title: impl Into<String>, order: &[(&str, &str)]) -> Self {
        Self {
            title: title.into(),
            order: order
                .iter()
                .map(|&(name, label)| (name.to_string(), label.to_string()))
                .collect(),
            columns: Vec::new(),
        }
    }

    pub fn add_column(&mut self, name: impl Into<String>, fit: &OlsFit) {
        let cells = self
            .order
            .iter()
            .map(|(regressor, _)| match fit.coefficient(regressor) {
                Some(c) => (
                    format!("{:.4}{}", c.estimate, stars(c.p_value)),
                    format!("({:.4})", c.std_error),
                ),
                None => (String::new(), String::new()),
            })
            .collect();
        self.columns.push(Column {
            name: name.into(),
            cells,
            r_squared: fit.r_squared,
            nobs: fit.nobs,
        });
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn body_rows(&self) -> Vec<(String, Vec<String>)> {
        let mut rows = Vec::new();
        for (i, (_, label)) in self.order.iter().enumerate() {
            rows.push((
                label.clone(),
                self.columns.iter().map(|c| c.cells[i].0.clone()).collect(),
            ));
            rows.push((
                String::new(),
                self.columns.iter().map(|c| c.cells[i].1.clone()).collect(),
            ));
        }
        rows.push((
            "R-squared".to_string(),
            self.columns
                .iter()
                .map(|c| format!("{:.4}", c.r_squared))
                .collect(),
        ));
        rows.push((
            "N".to_string(),
            self.columns.iter().map(|c| c.nobs.to_string()).collect(),
        ));
        rows
    }

    /// Fixed-width plain-text rendering.
    pub fn render_text(&self) -> String {
        let header: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        let rows = self.body_rows();

        let label_width = rows
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0);
        let cell_width = rows
            .iter()
            .flat_map(|(_, cells)| cells.iter().map(String::len))
            .chain(header.iter().map(String::len))
            .max()
            .unwrap_or(0)
            + 2;
        let rule = "=".repeat(label_width + cell_width * header.len());

        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{rule}");
        let _ = write!(out, "{:label_width$}", "");
        for h in &header {
            let _ = write!(out, "{h:>cell_width$}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "-".repeat(rule.len()));
        for (label, cells) in &rows {
            let _ = write!(out, "{label:label_width$}");
            for cell in cells {
                let _ = write!(out, "{cell:>cell_width$}");
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "{rule}");
        let _ = write!(out, "Standard errors in parentheses. * p<.1, ** p<.05, *** p<.01");
        out
    }

    /// LaTeX `tabular` body (no surrounding table environment).
    pub fn render_latex(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\\begin{{tabular}}{{l{}}}", "r".repeat(self.columns.len()));
        let _ = writeln!(out, "\\hline");
        let header: Vec<String> = self.columns.iter().map(|c| latex_escape(&c.name)).collect();
        let _ = writeln!(out, " & {} \\\\", header.join(" & "));
        let _ = writeln!(out, "\\hline");
        for (label, cells) in self.body_rows() {
            let cells: Vec<String> = cells.iter().map(|c| latex_escape(c)).collect();
            let _ = writeln!(out, "{} & {} \\\\", latex_escape(&label), cells.join(" & "));
        }
        let _ = writeln!(out, "\\hline");
        let _ = write!(out, "\\end{{tabular}}");
        out
    }
}

/// Escapes LaTeX specials; a run of stars becomes one math-mode superscript.
fn latex_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            '*' => {
                out.push_str("$^{*");
                while chars.next_if_eq(&'*').is_some() {
                    out.push('*');
                }
                out.push_str("}$");
            }
            _ => out.push(ch),
        }
    }
    out
}
