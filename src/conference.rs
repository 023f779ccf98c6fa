//! Conference-specific extraction expressed as declarative configuration.
//!
//! Each conference differs in how its review platform structures ratings and
//! discussion notes. Rather than branching on a conference name throughout
//! the code, a [`ConferenceConfig`] bundles the extractors and classifiers
//! once; it is selected by name at startup and passed by value to whatever
//! needs it. All predicates are pure functions over an immutable [`Note`],
//! so they can be tested without any network access.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SyncError};

/// One note on the review platform: a submission, a review, a comment, a
/// rebuttal, and so on. Content fields follow the platform's
/// `{"field": {"value": ...}}` wrapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: String,
    /// Forum (discussion thread) identifier the note belongs to.
    #[serde(default)]
    pub forum: String,
    /// Submission number; present on submission notes only.
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub invitations: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub readers: Vec<String>,
    #[serde(default)]
    pub signatures: Vec<String>,
    #[serde(default)]
    pub content: BTreeMap<String, Value>,
}

impl Note {
    /// Unwraps `content[field]["value"]`, falling back to the raw entry when
    /// the field is not wrapped.
    pub fn content_value(&self, field: &str) -> Option<&Value> {
        let entry = self.content.get(field)?;
        match entry.get("value") {
            Some(value) => Some(value),
            None => Some(entry),
        }
    }

    /// Integer content field, accepting both numeric and string encodings.
    pub fn content_int(&self, field: &str) -> Option<i64> {
        let value = self.content_value(field)?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.content.contains_key(field)
    }

    pub fn invitation_ends_with(&self, suffix: &str) -> bool {
        self.invitations.iter().any(|i| i.ends_with(suffix))
    }

    /// True when any writer group's trailing segment starts with `prefix`,
    /// e.g. `.../Submission12/Reviewer_abcd` for prefix `Reviewer`.
    pub fn any_writer_role(&self, prefix: &str) -> bool {
        any_role(&self.writers, prefix)
    }

    pub fn any_reader_role(&self, prefix: &str) -> bool {
        any_role(&self.readers, prefix)
    }
}

fn any_role(groups: &[String], prefix: &str) -> bool {
    groups
        .iter()
        .any(|g| g.rsplit('/').next().unwrap_or("").starts_with(prefix))
}

/// Extracts a rating from a review note, `None` when the field is absent.
pub type RatingExtractor = fn(&Note) -> Option<i64>;

/// Extracts the submission number from a submission note.
pub type PaperNumberExtractor = fn(&Note) -> Option<i64>;

/// Classifies a forum note under a tag such as `review` or `rebuttal`.
pub type NoteClassifier = fn(&Note) -> bool;

/// Everything conference-specific, bundled as plain data.
#[derive(Clone, Copy)]
pub struct ConferenceConfig {
    pub name: &'static str,
    /// Platform identifier, e.g. `ICLR.cc/2026/Conference`.
    pub conference_id: &'static str,
    /// Initial review rating, when the conference exposes one.
    pub rating: Option<RatingExtractor>,
    /// Final or updated rating, when the conference exposes one.
    pub final_rating: Option<RatingExtractor>,
    pub paper_number: PaperNumberExtractor,
    /// Tag -> predicate pairs; tag order defines report column order.
    pub note_classifiers: &'static [(&'static str, NoteClassifier)],
}

impl std::fmt::Debug for ConferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConferenceConfig")
            .field("name", &self.name)
            .field("conference_id", &self.conference_id)
            .finish_non_exhaustive()
    }
}

/// Looks up a built-in conference configuration by name.
pub fn builtin(name: &str) -> Result<&'static ConferenceConfig> {
    ALL.iter()
        .find(|config| config.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| SyncError::UnknownConference(name.to_string()))
}

pub static ALL: &[ConferenceConfig] = &[ICLR2026, NEURIPS2025, ICCV2025, ICML2025];

fn paper_number(note: &Note) -> Option<i64> {
    note.number
}

fn rating_field(note: &Note) -> Option<i64> {
    note.content_int("rating")
}

fn is_official_review(note: &Note) -> bool {
    note.invitation_ends_with("Official_Review")
}

fn is_final_justification(note: &Note) -> bool {
    note.has_field("final_justification") && is_official_review(note)
}

fn is_reviewer_author_exchange(note: &Note) -> bool {
    note.any_writer_role("Reviewer") && note.any_reader_role("Author")
}

fn is_other_comment(note: &Note) -> bool {
    note.invitation_ends_with("Official_Comment") && !is_reviewer_author_exchange(note)
}

fn is_discussion_comment(note: &Note) -> bool {
    note.invitation_ends_with("Official_Comment") && is_reviewer_author_exchange(note)
}

fn is_rebuttal(note: &Note) -> bool {
    note.invitation_ends_with("Rebuttal")
}

fn is_rebuttal_acknowledgement(note: &Note) -> bool {
    note.invitation_ends_with("Mandatory_Acknowledgement")
}

fn is_ac_letter_from_author(note: &Note) -> bool {
    note.invitation_ends_with("Author_AC_Confidential_Comment") && note.any_writer_role("Author")
}

fn is_ac_letter_from_ac(note: &Note) -> bool {
    note.invitation_ends_with("Author_AC_Confidential_Comment")
        && note.any_writer_role("Area_Chair")
}

/// Shared by ICLR and NeurIPS, which run the same discussion workflow.
const DISCUSSION_CLASSIFIERS: &[(&str, NoteClassifier)] = &[
    ("review", is_official_review),
    ("final_justification", is_final_justification),
    ("other_comment", is_other_comment),
    ("discussion_comment", is_discussion_comment),
    ("rebuttal", is_rebuttal),
    ("rebuttal_acknowledgement", is_rebuttal_acknowledgement),
    ("ac_letter_author", is_ac_letter_from_author),
    ("ac_letter_ac", is_ac_letter_from_ac),
];

pub const ICLR2026: ConferenceConfig = ConferenceConfig {
    name: "ICLR2026",
    conference_id: "ICLR.cc/2026/Conference",
    rating: Some(rating_field),
    final_rating: None,
    paper_number,
    note_classifiers: DISCUSSION_CLASSIFIERS,
};

pub const NEURIPS2025: ConferenceConfig = ConferenceConfig {
    name: "NeurIPS2025",
    conference_id: "NeurIPS.cc/2025/Conference",
    rating: Some(rating_field),
    final_rating: None,
    paper_number,
    note_classifiers: DISCUSSION_CLASSIFIERS,
};

fn iccv_final_rating(note: &Note) -> Option<i64> {
    // Encoded as "N: description"; only the leading integer matters.
    let value = note.content_value("final_recommendation")?;
    let text = value.as_str()?;
    text.split(':').next()?.trim().parse().ok()
}

fn iccv_is_review(note: &Note) -> bool {
    note.has_field("preliminary_recommendation")
}

fn has_comment_field(note: &Note) -> bool {
    note.has_field("comment")
}

fn iccv_is_rebuttal(note: &Note) -> bool {
    note.has_field("pdf") && !note.has_field("abstract")
}

fn iccv_is_ac_letter(note: &Note) -> bool {
    iccv_is_rebuttal(note) && note.content_value("confidential_comments_to_AC").is_some()
}

pub const ICCV2025: ConferenceConfig = ConferenceConfig {
    name: "ICCV2025",
    conference_id: "thecvf.com/ICCV/2025/Conference",
    rating: None,
    final_rating: Some(iccv_final_rating),
    paper_number,
    note_classifiers: &[
        ("review", iccv_is_review),
        ("comment", has_comment_field),
        ("rebuttal", iccv_is_rebuttal),
        ("ac_letter", iccv_is_ac_letter),
    ],
};

fn icml_rating(note: &Note) -> Option<i64> {
    note.content_int("overall_recommendation")
}

fn icml_is_review(note: &Note) -> bool {
    note.has_field("summary")
}

fn icml_is_acknowledgement(note: &Note) -> bool {
    note.has_field("acknowledgement")
}

fn icml_is_rebuttal(note: &Note) -> bool {
    note.has_field("rebuttal")
}

pub const ICML2025: ConferenceConfig = ConferenceConfig {
    name: "ICML2025",
    conference_id: "ICML.cc/2025/Conference",
    rating: Some(icml_rating),
    final_rating: None,
    paper_number,
    note_classifiers: &[
        ("review", icml_is_review),
        ("comment", has_comment_field),
        ("acknowledgement", icml_is_acknowledgement),
        ("rebuttal", icml_is_rebuttal),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note_with_content(fields: &[(&str, Value)]) -> Note {
        Note {
            content: fields
                .iter()
                .map(|(k, v)| (k.to_string(), json!({ "value": v })))
                .collect(),
            ..Note::default()
        }
    }

    #[test]
    fn builtin_lookup_is_case_insensitive() {
        assert_eq!(builtin("iclr2026").expect("found").name, "ICLR2026");
        assert!(matches!(
            builtin("KDD2030"),
            Err(SyncError::UnknownConference(_))
        ));
    }

    #[test]
    fn content_value_unwraps_platform_wrapping() {
        let note = note_with_content(&[("title", json!("Deep Nets"))]);
        assert_eq!(note.content_value("title"), Some(&json!("Deep Nets")));
        assert_eq!(note.content_value("missing"), None);
    }

    #[test]
    fn rating_accepts_numbers_and_numeric_strings() {
        let numeric = note_with_content(&[("rating", json!(6))]);
        let stringly = note_with_content(&[("rating", json!("8"))]);
        assert_eq!(rating_field(&numeric), Some(6));
        assert_eq!(rating_field(&stringly), Some(8));
        assert_eq!(rating_field(&Note::default()), None);
    }

    #[test]
    fn iccv_final_rating_parses_leading_integer() {
        let note = note_with_content(&[("final_recommendation", json!("4: Strong accept"))]);
        assert_eq!(iccv_final_rating(&note), Some(4));
        assert_eq!(iccv_final_rating(&Note::default()), None);
    }

    #[test]
    fn discussion_comment_requires_reviewer_writer_and_author_reader() {
        let base = Note {
            invitations: vec!["ICLR.cc/2026/Conference/Submission7/-/Official_Comment".into()],
            ..Note::default()
        };

        let mut exchange = base.clone();
        exchange.writers = vec!["ICLR.cc/2026/Conference/Submission7/Reviewer_abcd".into()];
        exchange.readers = vec!["ICLR.cc/2026/Conference/Submission7/Authors".into()];
        assert!(is_discussion_comment(&exchange));
        assert!(!is_other_comment(&exchange));

        let mut ac_side = base.clone();
        ac_side.writers = vec!["ICLR.cc/2026/Conference/Submission7/Area_Chair_wGtT".into()];
        assert!(!is_discussion_comment(&ac_side));
        assert!(is_other_comment(&ac_side));
    }

    #[test]
    fn official_review_matches_on_invitation_suffix() {
        let review = Note {
            invitations: vec!["NeurIPS.cc/2025/Conference/Submission3/-/Official_Review".into()],
            ..Note::default()
        };
        assert!(is_official_review(&review));
        assert!(!is_rebuttal(&review));
    }

    #[test]
    fn iccv_ac_letter_needs_pdf_without_abstract_plus_confidential_field() {
        let mut note = note_with_content(&[
            ("pdf", json!("/pdf/xyz")),
            ("confidential_comments_to_AC", json!("please note")),
        ]);
        assert!(iccv_is_ac_letter(&note));
        assert!(iccv_is_rebuttal(&note));

        note.content
            .insert("abstract".to_string(), json!({"value": "text"}));
        assert!(!iccv_is_ac_letter(&note));
    }
}
