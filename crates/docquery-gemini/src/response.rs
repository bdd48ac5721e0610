//! Reduce a generation response to answer text and evidence.
//!
//! Only the first candidate is read. Sources are collected in a fixed order:
//! referenced files, citations, grounding chunks, grounding supports. Files
//! and citations are deduplicated by label in first-seen order; grounding
//! records are appended as-is, duplicates included.

use docquery_core::models::answer::{Answer, Source};

use crate::types::{Candidate, GenerateContentResponse};

pub fn parse_response(response: &GenerateContentResponse) -> Answer {
    let Some(candidate) = response.candidates.first() else {
        return Answer::default();
    };

    let mut sources = Vec::new();
    let text = collect_parts(candidate, &mut sources);
    collect_citations(candidate, &mut sources);
    collect_grounding(candidate, &mut sources);

    Answer { text, sources }
}

/// Join non-empty text parts with a blank line and record file references.
fn collect_parts(candidate: &Candidate, sources: &mut Vec<Source>) -> String {
    let parts = candidate
        .content
        .as_ref()
        .map(|c| c.parts.as_slice())
        .unwrap_or_default();

    let mut fragments: Vec<&str> = Vec::new();

    for part in parts {
        if let Some(text) = part.text.as_deref().filter(|t| !t.is_empty()) {
            fragments.push(text);
        }
        if let Some(file) = &part.file_data {
            let label = first_non_empty(&[&file.display_name, &file.file_uri, &file.file_id]);
            if let Some(label) = label {
                push_label(sources, Source::File(label.to_string()));
            }
        }
    }

    fragments.join("\n\n").trim().to_string()
}

fn collect_citations(candidate: &Candidate, sources: &mut Vec<Source>) {
    let Some(meta) = &candidate.citation_metadata else {
        return;
    };
    for citation in &meta.citations {
        if let Some(label) = first_non_empty(&[&citation.uri, &citation.title]) {
            push_label(sources, Source::Citation(label.to_string()));
        }
    }
}

fn collect_grounding(candidate: &Candidate, sources: &mut Vec<Source>) {
    let Some(meta) = &candidate.grounding_metadata else {
        return;
    };
    sources.extend(
        meta.grounding_chunks
            .iter()
            .filter(|v| has_payload(v))
            .cloned()
            .map(Source::GroundingChunk),
    );
    sources.extend(
        meta.grounding_supports
            .iter()
            .filter(|v| has_payload(v))
            .cloned()
            .map(Source::GroundingSupport),
    );
}

/// Append a label-style source unless its label was already collected.
fn push_label(sources: &mut Vec<Source>, source: Source) {
    let exists = sources
        .iter()
        .any(|existing| existing.label().is_some() && existing.label() == source.label());
    if !exists {
        sources.push(source);
    }
}

fn first_non_empty<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .filter_map(Option::as_deref)
        .find(|s| !s.is_empty())
}

/// `null` and `{}` carry no evidence.
fn has_payload(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}
