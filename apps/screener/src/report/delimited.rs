//! Degraded export: tab-separated, ASCII only.
//!
//! Accented Latin letters are transliterated, anything else outside ASCII becomes `?`.
//! Tabs and line breaks inside a field collapse to single spaces so every record stays on
//! one line.

use std::path::{Path, PathBuf};

use super::{io_error, report_file_name, rows, ReportError, ReportRow, ReportSink};
use crate::models::CandidateRecord;

const HEADER: [&str; 16] = [
    "rank",
    "file",
    "name",
    "email",
    "phone",
    "languages",
    "programming_languages",
    "frameworks",
    "years_experience",
    "education",
    "final_score",
    "initial_score",
    "status",
    "strengths",
    "weaknesses",
    "rationale",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct DelimitedReportSink;

impl ReportSink for DelimitedReportSink {
    fn name(&self) -> &'static str {
        "delimited text"
    }

    fn write(&self, records: &[CandidateRecord], dir: &Path) -> Result<PathBuf, ReportError> {
        let mut body = HEADER.join("\t");
        body.push('\n');
        for row in rows(records) {
            body.push_str(&line(&row));
            body.push('\n');
        }

        std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        let path = dir.join(report_file_name("tsv"));
        std::fs::write(&path, body).map_err(|e| io_error(&path, e))?;
        Ok(path)
    }
}

fn line(row: &ReportRow) -> String {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let score = |s: Option<f64>| s.map(|s| format!("{s:.2}")).unwrap_or_default();
    let fields = [
        row.rank.to_string(),
        row.file_name.clone(),
        opt(&row.name),
        opt(&row.email),
        opt(&row.phone),
        row.languages.join(", "),
        row.programming_languages.join(", "),
        row.frameworks.join(", "),
        row.years_experience.map(|y| y.to_string()).unwrap_or_default(),
        opt(&row.education),
        score(row.final_score),
        score(row.initial_score),
        row.status.clone(),
        row.strengths.join("; "),
        row.weaknesses.join("; "),
        opt(&row.rationale),
    ];
    fields
        .iter()
        .map(|f| ascii_field(f))
        .collect::<Vec<_>>()
        .join("\t")
}

/// ASCII-only, single-line rendering of one field.
pub fn ascii_field(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' | '\n' | '\r' => out.push(' '),
            c if c.is_ascii() => out.push(c),
            c => out.push_str(transliterate(c)),
        }
    }
    out.split(' ')
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn transliterate(c: char) -> &'static str {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'É' | 'È' | 'Ê' | 'Ë' => "E",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'Í' | 'Ì' | 'Î' | 'Ï' => "I",
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "O",
        'ú' | 'ù' | 'û' | 'ü' => "u",
        'Ú' | 'Ù' | 'Û' | 'Ü' => "U",
        'ñ' => "n",
        'Ñ' => "N",
        'ç' => "c",
        'Ç' => "C",
        'ß' => "ss",
        '\u{2013}' | '\u{2014}' => "-",
        '\u{2018}' | '\u{2019}' => "'",
        '\u{201C}' | '\u{201D}' => "\"",
        '\u{2022}' => "*",
        '\u{00A0}' => " ",
        _ => "?",
    }
}
