use docquery_core::models::answer::Source;
use docquery_gemini::response::parse_response;
use docquery_gemini::types::GenerateContentResponse;
use serde_json::json;

fn response(value: serde_json::Value) -> GenerateContentResponse {
    serde_json::from_value(value).unwrap()
}

#[test]
fn no_candidates_gives_empty_answer() {
    let answer = parse_response(&response(json!({})));
    assert_eq!(answer.text, "");
    assert!(answer.sources.is_empty());

    let answer = parse_response(&response(json!({ "candidates": [] })));
    assert!(answer.is_empty());
}

#[test]
fn candidate_without_content_gives_empty_text() {
    let answer = parse_response(&response(json!({ "candidates": [{ "finishReason": "SAFETY" }] })));
    assert_eq!(answer.text, "");
    assert!(answer.sources.is_empty());
}

#[test]
fn text_parts_are_joined_with_blank_line_and_empty_parts_skipped() {
    let answer = parse_response(&response(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [
                { "text": "A" }, { "text": "" }, { "text": "B" }
            ]}
        }]
    })));
    assert_eq!(answer.text, "A\n\nB");
}

#[test]
fn surrounding_whitespace_is_trimmed() {
    let answer = parse_response(&response(json!({
        "candidates": [{ "content": { "parts": [{ "text": "  \nanswer\n" }] } }]
    })));
    assert_eq!(answer.text, "answer");
}

#[test]
fn only_first_candidate_is_used() {
    let answer = parse_response(&response(json!({
        "candidates": [
            { "content": { "parts": [{ "text": "first" }] } },
            { "content": { "parts": [{ "text": "second" }] },
              "citationMetadata": { "citations": [{ "uri": "https://second" }] } }
        ]
    })));
    assert_eq!(answer.text, "first");
    assert!(answer.sources.is_empty());
}

#[test]
fn file_label_prefers_display_name_then_uri_then_id() {
    let answer = parse_response(&response(json!({
        "candidates": [{ "content": { "parts": [
            { "fileData": { "displayName": "report.pdf", "fileUri": "files/1" } },
            { "fileData": { "displayName": "", "fileUri": "files/2" } },
            { "fileData": { "fileId": "id-3" } },
            { "fileData": {} }
        ]}}]
    })));
    assert_eq!(
        answer.sources,
        vec![
            Source::File("report.pdf".to_string()),
            Source::File("files/2".to_string()),
            Source::File("id-3".to_string()),
        ]
    );
}

#[test]
fn duplicate_citations_appear_once() {
    let answer = parse_response(&response(json!({
        "candidates": [{
            "content": { "parts": [{ "text": "x" }] },
            "citationMetadata": { "citations": [
                { "uri": "https://example.com/a", "startIndex": 0 },
                { "uri": "https://example.com/a", "startIndex": 10 },
                { "title": "Chapter 2" },
                { "uri": "", "title": "" }
            ]}
        }]
    })));
    assert_eq!(
        answer.sources,
        vec![
            Source::Citation("https://example.com/a".to_string()),
            Source::Citation("Chapter 2".to_string()),
        ]
    );
}

#[test]
fn citation_matching_a_file_label_is_not_repeated() {
    let answer = parse_response(&response(json!({
        "candidates": [{
            "content": { "parts": [{ "fileData": { "displayName": "report.pdf" } }] },
            "citationMetadata": { "citations": [{ "title": "report.pdf" }] }
        }]
    })));
    assert_eq!(answer.sources, vec![Source::File("report.pdf".to_string())]);
}

#[test]
fn identical_grounding_chunks_are_both_kept() {
    let chunk = json!({ "retrievedContext": { "title": "report.pdf", "text": "same" } });
    let answer = parse_response(&response(json!({
        "candidates": [{
            "content": { "parts": [{ "text": "x" }] },
            "groundingMetadata": { "groundingChunks": [chunk.clone(), chunk.clone()] }
        }]
    })));
    assert_eq!(
        answer.sources,
        vec![Source::GroundingChunk(chunk.clone()), Source::GroundingChunk(chunk)]
    );
}

#[test]
fn grounding_overlapping_a_citation_is_not_deduplicated() {
    let chunk = json!({ "retrievedContext": { "uri": "https://example.com/a" } });
    let answer = parse_response(&response(json!({
        "candidates": [{
            "citationMetadata": { "citations": [{ "uri": "https://example.com/a" }] },
            "groundingMetadata": { "groundingChunks": [chunk.clone()] }
        }]
    })));
    assert_eq!(
        answer.sources,
        vec![
            Source::Citation("https://example.com/a".to_string()),
            Source::GroundingChunk(chunk),
        ]
    );
}

#[test]
fn sources_follow_composition_order() {
    let chunk = json!({ "retrievedContext": { "text": "chunk" } });
    let support = json!({ "segment": { "startIndex": 0, "endIndex": 6 }, "groundingChunkIndices": [0] });
    let answer = parse_response(&response(json!({
        "candidates": [{
            "content": { "parts": [
                { "text": "Answer" },
                { "fileData": { "displayName": "doc.pdf" } }
            ]},
            "citationMetadata": { "citations": [{ "uri": "https://cite" }] },
            "groundingMetadata": {
                "groundingSupports": [support.clone()],
                "groundingChunks": [chunk.clone()]
            }
        }]
    })));

    assert_eq!(answer.text, "Answer");
    assert_eq!(
        answer.sources,
        vec![
            Source::File("doc.pdf".to_string()),
            Source::Citation("https://cite".to_string()),
            Source::GroundingChunk(chunk),
            Source::GroundingSupport(support),
        ]
    );
}

#[test]
fn empty_grounding_payloads_are_skipped() {
    let answer = parse_response(&response(json!({
        "candidates": [{
            "groundingMetadata": {
                "groundingChunks": [{}, null],
                "groundingSupports": [{}]
            }
        }]
    })));
    assert!(answer.sources.is_empty());
}
