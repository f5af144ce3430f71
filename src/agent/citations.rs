//! Knowledge-base citations of assistant messages.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::store::{Annotation, AssistantMessageItem};

/// Knowledge-base document names, e.g. `03_pneumatiques.pdf`.
static DOCUMENT_FILENAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(0[1-8]_[a-z0-9_\-]+\.(?:pdf|html))").ok());

/// A document cited by an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Stable document key: the provider file id, else the lowercased file name.
    pub document_id: String,
    /// Cited file name.
    pub filename: String,
    /// Document title when known.
    #[serde(default)]
    pub title: Option<String>,
    /// Position of the citation marker; `None` for citations found in the text.
    #[serde(default)]
    pub annotation_index: Option<usize>,
}

fn normalise_filename(name: &str) -> String {
    name.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(name)
        .trim()
        .to_lowercase()
}

fn from_annotation(annotation: &Annotation) -> Option<Citation> {
    let filename = annotation
        .filename
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .map(normalise_filename);
    let document_id = annotation
        .file_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| filename.clone())?;

    Some(Citation {
        filename: filename.unwrap_or_else(|| document_id.clone()),
        document_id,
        title: annotation.title.clone(),
        annotation_index: annotation.index,
    })
}

/// Document names mentioned in `text`, lowercased, first occurrence first.
#[must_use]
pub fn filenames_in_text(text: &str) -> Vec<String> {
    let Some(re) = DOCUMENT_FILENAME_RE.as_ref() else {
        return Vec::new();
    };
    let mut found: Vec<String> = Vec::new();
    for name in re.find_iter(text).map(|m| m.as_str().to_lowercase()) {
        if !found.contains(&name) {
            found.push(name);
        }
    }
    found
}

/// Citations of one message: its annotations, else document names found in its text.
#[must_use]
pub fn extract_citations(message: &AssistantMessageItem) -> Vec<Citation> {
    let annotated: Vec<Citation> = message
        .content
        .iter()
        .flat_map(|block| block.annotations.iter())
        .filter_map(from_annotation)
        .collect();
    if !annotated.is_empty() {
        return annotated;
    }

    let mut citations: Vec<Citation> = Vec::new();
    for block in &message.content {
        for filename in filenames_in_text(&block.text) {
            if citations.iter().all(|citation| citation.filename != filename) {
                citations.push(Citation {
                    document_id: filename.clone(),
                    filename,
                    title: None,
                    annotation_index: None,
                });
            }
        }
    }
    citations
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::store::AssistantMessageContent;

    fn message(text: &str, annotations: Vec<Annotation>) -> AssistantMessageItem {
        AssistantMessageItem {
            id: "msg_1".to_string(),
            thread_id: "thr_1".to_string(),
            created_at: Utc::now(),
            content: vec![AssistantMessageContent {
                text: text.to_string(),
                annotations,
            }],
        }
    }

    #[test]
    fn test_annotations_take_precedence() {
        let annotation = Annotation {
            file_id: Some("file_9".to_string()),
            filename: Some("docs/02_Organisation.HTML".to_string()),
            title: Some("Organisation".to_string()),
            index: Some(12),
        };
        let citations = extract_citations(&message("see 01_pneus.pdf", vec![annotation]));
        assert_eq!(
            citations,
            vec![Citation {
                document_id: "file_9".to_string(),
                filename: "02_organisation.html".to_string(),
                title: Some("Organisation".to_string()),
                annotation_index: Some(12),
            }]
        );
    }

    #[test]
    fn test_text_fallback_dedups() {
        let citations = extract_citations(&message(
            "Voir 01_Pneus.pdf puis 04_maintenances-et-services.html.\nRappel : 01_pneus.pdf",
            vec![Annotation::default()],
        ));
        let names: Vec<&str> = citations.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(names, vec!["01_pneus.pdf", "04_maintenances-et-services.html"]);
        assert!(citations.iter().all(|c| c.annotation_index.is_none()));
    }

    #[test]
    fn test_no_citations() {
        assert!(extract_citations(&message("09_other.pdf and report.pdf", Vec::new())).is_empty());
    }
}
