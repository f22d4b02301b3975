//! PubMed XML (efetch `retmode=xml`) to [`Record`] conversion.
//!
//! Handles the `<PubmedArticleSet><PubmedArticle>` structure. Per article the
//! first `PMID`, `ArticleTitle` and `AbstractText` elements are taken; later
//! occurrences (cited PMIDs in `CommentsCorrections`, structured abstract
//! sections) are ignored.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use super::SearchError;
use crate::models::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Pmid,
    Title,
    Abstract,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"PMID" => Some(Field::Pmid),
            b"ArticleTitle" => Some(Field::Title),
            b"AbstractText" => Some(Field::Abstract),
            _ => None,
        }
    }
}

/// Fields of the article currently being read. `None` means not seen yet.
#[derive(Default)]
struct ArticleDraft {
    pmid: Option<String>,
    title: Option<String>,
    abstract_text: Option<String>,
}

impl ArticleDraft {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Pmid => &mut self.pmid,
            Field::Title => &mut self.title,
            Field::Abstract => &mut self.abstract_text,
        }
    }

    /// Any field with raw text, whitespace included, keeps the article.
    /// Values are trimmed only after that decision.
    fn finish(self) -> Option<Record> {
        let has_text = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        if !(has_text(&self.pmid) || has_text(&self.title) || has_text(&self.abstract_text)) {
            return None;
        }

        let clean = |value: Option<String>| value.map(|v| v.trim().to_string()).unwrap_or_default();
        Some(Record {
            pmid: clean(self.pmid),
            title: clean(self.title),
            abstract_text: clean(self.abstract_text),
        })
    }
}

/// Parse a PubMed article set. Articles with no PMID, title or abstract are
/// skipped with a warning.
pub fn parse_medline_records(xml: &str) -> Result<Vec<Record>, SearchError> {
    let mut records = Vec::new();
    let mut reader = Reader::from_str(xml);

    let mut article: Option<ArticleDraft> = None;
    // Field being captured and how many child elements deep we are inside it
    let mut capture: Option<(Field, usize)> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            SearchError::ParseError(format!(
                "malformed PubMed XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) => {
                if let Some((_, depth)) = capture.as_mut() {
                    *depth += 1;
                } else if e.name().as_ref() == b"PubmedArticle" {
                    article = Some(ArticleDraft::default());
                } else if let (Some(draft), Some(field)) =
                    (article.as_mut(), Field::from_tag(e.name().as_ref()))
                {
                    let slot = draft.slot(field);
                    if slot.is_none() {
                        *slot = Some(String::new());
                        capture = Some((field, 0));
                    }
                }
            }
            Event::Empty(ref e) => {
                // `<AbstractText/>` counts as present but empty
                if capture.is_none() {
                    if let (Some(draft), Some(field)) =
                        (article.as_mut(), Field::from_tag(e.name().as_ref()))
                    {
                        draft.slot(field).get_or_insert_with(String::new);
                    }
                }
            }
            Event::Text(ref e) => {
                if let (Some((field, _)), Some(draft)) = (capture, article.as_mut()) {
                    let text = e
                        .unescape()
                        .map_err(|err| SearchError::ParseError(err.to_string()))?;
                    if let Some(value) = draft.slot(field).as_mut() {
                        value.push_str(&text);
                    }
                }
            }
            Event::CData(ref e) => {
                if let (Some((field, _)), Some(draft)) = (capture, article.as_mut()) {
                    if let Some(value) = draft.slot(field).as_mut() {
                        value.push_str(&String::from_utf8_lossy(e));
                    }
                }
            }
            Event::End(ref e) => {
                if let Some((_, depth)) = capture.as_mut() {
                    if *depth == 0 {
                        capture = None;
                    } else {
                        *depth -= 1;
                    }
                } else if e.name().as_ref() == b"PubmedArticle" {
                    if let Some(draft) = article.take() {
                        match draft.finish() {
                            Some(record) => {
                                debug!(pmid = %record.pmid, "Parsed PubMed article");
                                records.push(record);
                            }
                            None => warn!("Skipping article with missing metadata"),
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}
