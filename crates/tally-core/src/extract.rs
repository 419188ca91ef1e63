//! Line classification and field extraction
//!
//! Turns the text of a bank statement into candidate records, one line at a
//! time. Lines that do not start with a statement date are ignored; lines
//! that do but cannot be read are reported with a [`SkipReason`].

use std::iter::FusedIterator;
use std::str::Lines;

use crate::config::StatementFormat;
use crate::models::{CandidateRecord, SkipReason};

/// What a single line of statement text turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Candidate(CandidateRecord),
    Skipped(SkipReason),
}

/// One line of input together with its classification
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedLine<'t> {
    /// 1-based
    pub line_number: usize,
    pub text: &'t str,
    pub outcome: LineOutcome,
}

impl StatementFormat {
    /// Classify every line of `text`, in order
    pub fn scan<'f, 't>(&'f self, text: &'t str) -> Scan<'f, 't> {
        Scan {
            format: self,
            lines: text.lines(),
            line_number: 0,
        }
    }

    /// Candidate records of `text`, in line order
    pub fn extract<'f, 't>(&'f self, text: &'t str) -> Candidates<'f, 't> {
        Candidates(self.scan(text))
    }

    /// Classify a single line
    pub fn classify_line(&self, line_number: usize, line: &str) -> LineOutcome {
        if !self.line_prefix.is_match(line) {
            return LineOutcome::Skipped(SkipReason::NonTransactionLine);
        }

        let Some(caps) = self.line_pattern.captures(line) else {
            return LineOutcome::Skipped(SkipReason::MalformedLine);
        };

        // Groups are validated at load time; an unmatched optional group is malformed
        let (Some(date), Some(amount), Some(token), Some(details)) = (
            caps.name("date"),
            caps.name("amount"),
            caps.name("token"),
            caps.name("details"),
        ) else {
            return LineOutcome::Skipped(SkipReason::MalformedLine);
        };

        let details = details.as_str().trim();

        let Some(parsed_amount) = self.amount.parse(amount.as_str()) else {
            return LineOutcome::Skipped(SkipReason::NumericParseFailure);
        };

        let Some(parsed_date) = self.date.parse(date.as_str()) else {
            return LineOutcome::Skipped(SkipReason::InvalidDate);
        };

        LineOutcome::Candidate(CandidateRecord {
            line_number,
            raw_date: date.as_str().to_string(),
            date: parsed_date,
            raw_amount: amount.as_str().to_string(),
            amount: parsed_amount,
            type_token: token.as_str().to_string(),
            details: details.to_string(),
        })
    }
}

/// Lazy per-line classification, see [`StatementFormat::scan`]
#[derive(Debug, Clone)]
pub struct Scan<'f, 't> {
    format: &'f StatementFormat,
    lines: Lines<'t>,
    line_number: usize,
}

impl<'f, 't> Iterator for Scan<'f, 't> {
    type Item = ScannedLine<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.lines.next()?;
        self.line_number += 1;
        Some(ScannedLine {
            line_number: self.line_number,
            text,
            outcome: self.format.classify_line(self.line_number, text),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.lines.size_hint()
    }
}

impl FusedIterator for Scan<'_, '_> {}

/// Lazy candidate records, see [`StatementFormat::extract`]
#[derive(Debug, Clone)]
pub struct Candidates<'f, 't>(Scan<'f, 't>);

impl Iterator for Candidates<'_, '_> {
    type Item = CandidateRecord;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.0.by_ref() {
            if let LineOutcome::Candidate(record) = line.outcome {
                return Some(record);
            }
        }
        None
    }
}

impl FusedIterator for Candidates<'_, '_> {}
