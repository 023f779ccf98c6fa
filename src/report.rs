//! Builds the per-paper report records from a dump of platform notes.
//!
//! A dump is a flat list of notes: submission notes (which carry a paper
//! number) plus everything posted on their forums. The builder groups notes
//! by forum and produces one record per submission with scores, note-type
//! counts, and participation figures, using the conference configuration for
//! anything platform-specific.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use crate::conference::{ConferenceConfig, Note};
use crate::model::{CellValue, Record};

/// Number of per-reviewer score columns in the report.
pub const REVIEWER_SLOTS: usize = 5;

/// Column written to the sheet as the stable row key.
pub const KEY_COLUMN: &str = "paper_number";

/// Report column order, used when writing headers.
pub fn columns(config: &ConferenceConfig) -> Vec<String> {
    let mut columns = vec![
        "paper_title".to_string(),
        "paper_number".to_string(),
        "paper_url".to_string(),
        "withdrawn".to_string(),
        "num_reviewers".to_string(),
        "avg_score".to_string(),
    ];
    for slot in 1..=REVIEWER_SLOTS {
        columns.push(format!("reviewer{slot}_score"));
    }
    columns.push("avg_final_score".to_string());
    for slot in 1..=REVIEWER_SLOTS {
        columns.push(format!("reviewer{slot}_final_score"));
    }
    for (tag, _) in config.note_classifiers {
        columns.push(format!("{tag}_count"));
    }
    columns.push("others_count".to_string());
    columns.push("reviewer_participation".to_string());
    columns
}

/// Builds one record per submission found in `notes`.
#[instrument(level = "info", skip_all, fields(conference = config.name, notes = notes.len()))]
pub fn build_report(notes: &[Note], config: &ConferenceConfig) -> Vec<Record> {
    let mut by_forum: BTreeMap<&str, Vec<&Note>> = BTreeMap::new();
    for note in notes {
        by_forum.entry(note.forum.as_str()).or_default().push(note);
    }

    let mut records = Vec::new();
    for note in notes {
        if !is_submission(note) {
            continue;
        }
        let forum_notes = by_forum
            .get(note.forum.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        if let Some(record) = summarize_paper(note, forum_notes, config) {
            records.push(record);
        }
    }

    info!(papers = records.len(), "report built");
    records
}

fn is_submission(note: &Note) -> bool {
    note.number.is_some() && note.invitation_ends_with("/-/Submission")
}

/// Summarises one submission and its forum into a report record.
///
/// Reviewer slots beyond the reviews that exist are omitted rather than
/// blanked, so a later merge-mode write never clobbers hand-entered cells.
fn summarize_paper(
    paper: &Note,
    forum_notes: &[&Note],
    config: &ConferenceConfig,
) -> Option<Record> {
    let number = (config.paper_number)(paper)?;
    debug!(paper = number, "summarising paper");

    let review_invitation = format!(
        "{}/Submission{}/-/Official_Review",
        config.conference_id, number
    );
    let reviews: Vec<&Note> = forum_notes
        .iter()
        .copied()
        .filter(|note| note.invitations.iter().any(|i| i == &review_invitation))
        .collect();

    let mut record = Record::new();
    record.insert("paper_number".to_string(), CellValue::Int(number));
    record.insert(
        "paper_title".to_string(),
        CellValue::Text(
            paper
                .content_value("title")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        ),
    );
    record.insert(
        "paper_url".to_string(),
        CellValue::Text(format!("https://openreview.net/forum?id={}", paper.forum)),
    );

    let withdrawn = paper
        .content_value("venue")
        .and_then(|v| v.as_str())
        .is_some_and(|venue| venue.contains("Withdrawn"));
    record.insert(
        "withdrawn".to_string(),
        CellValue::Text(withdrawn.to_string()),
    );
    record.insert(
        "num_reviewers".to_string(),
        CellValue::Int(reviews.len() as i64),
    );

    if let Some(extract) = config.rating {
        let scores: Vec<Option<i64>> = reviews.iter().map(|review| extract(review)).collect();
        insert_scores(&mut record, &scores, "avg_score", "reviewer", "_score");
    } else {
        record.insert("avg_score".to_string(), CellValue::Text("N/A".to_string()));
    }

    if let Some(extract) = config.final_rating {
        let scores: Vec<Option<i64>> = reviews.iter().map(|review| extract(review)).collect();
        insert_scores(
            &mut record,
            &scores,
            "avg_final_score",
            "reviewer",
            "_final_score",
        );
    } else {
        record.insert(
            "avg_final_score".to_string(),
            CellValue::Text("N/A".to_string()),
        );
    }

    let mut classified_total = 0i64;
    for (tag, classify) in config.note_classifiers {
        let count = forum_notes.iter().filter(|note| classify(note)).count() as i64;
        classified_total += count;
        record.insert(format!("{tag}_count"), CellValue::Int(count));
    }
    record.insert(
        "others_count".to_string(),
        CellValue::Int(forum_notes.len() as i64 - classified_total),
    );

    let participation = forum_notes
        .iter()
        .filter(|note| note.has_field("comment"))
        .count() as i64;
    record.insert(
        "reviewer_participation".to_string(),
        CellValue::Int(participation),
    );

    Some(record)
}

/// Fills the average column and the per-reviewer slot columns for one score
/// set. Missing individual scores and unused slots are omitted.
fn insert_scores(
    record: &mut Record,
    scores: &[Option<i64>],
    avg_column: &str,
    slot_prefix: &str,
    slot_suffix: &str,
) {
    let present: Vec<i64> = scores.iter().flatten().copied().collect();
    let average = if present.is_empty() {
        CellValue::Text("N/A".to_string())
    } else {
        let mean = present.iter().sum::<i64>() as f64 / present.len() as f64;
        CellValue::Number((mean * 100.0).round() / 100.0)
    };
    record.insert(avg_column.to_string(), average);

    for (slot, score) in scores.iter().take(REVIEWER_SLOTS).enumerate() {
        if let Some(score) = score {
            record.insert(
                format!("{slot_prefix}{}{slot_suffix}", slot + 1),
                CellValue::Int(*score),
            );
        }
    }
}
