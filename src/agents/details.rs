//! Detail Fetcher
//!
//! Retrieves the chosen field for every deduplicated identifier in a single
//! bulk request and renders it for the terminal.

use std::collections::HashSet;

use tracing::info;

use crate::models::{FetchField, Record, RecordId};
use crate::search::{parse_medline_records, FetchFormat, LiteratureSource};
use crate::types::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedDetails {
    /// Identifier list exactly as the service returned it
    IdList(String),
    Titles(Vec<Record>),
    Abstracts(Vec<Record>),
}

impl FetchedDetails {
    pub fn field(&self) -> FetchField {
        match self {
            FetchedDetails::IdList(_) => FetchField::Pmid,
            FetchedDetails::Titles(_) => FetchField::Title,
            FetchedDetails::Abstracts(_) => FetchField::Abstract,
        }
    }

    pub fn render(&self) -> String {
        match self {
            FetchedDetails::IdList(body) => body.clone(),
            FetchedDetails::Titles(records) => records
                .iter()
                .map(|r| format!("PMID: {}\nTitle: {}\n\n", r.pmid, r.title))
                .collect(),
            FetchedDetails::Abstracts(records) => records
                .iter()
                .map(|r| {
                    format!(
                        "PMID: {}\nTitle: {}\nAbstract: {}\n\n",
                        r.pmid, r.title, r.abstract_text
                    )
                })
                .collect(),
        }
    }
}

pub struct DetailFetcher<'a> {
    source: &'a dyn LiteratureSource,
}

impl<'a> DetailFetcher<'a> {
    pub fn new(source: &'a dyn LiteratureSource) -> Self {
        Self { source }
    }

    /// Fetch `field` for all `ids`. An unrecognised field is rejected with
    /// `AppError::Validation` before any request is made.
    pub async fn fetch(&self, ids: &HashSet<RecordId>, field: &str) -> AppResult<FetchedDetails> {
        let field: FetchField = field.parse()?;

        // Sorted only so identical runs issue identical requests
        let mut ids: Vec<RecordId> = ids.iter().cloned().collect();
        ids.sort();

        if ids.is_empty() {
            info!(field = %field, "No identifiers to fetch");
            return Ok(match field {
                FetchField::Pmid => FetchedDetails::IdList(String::new()),
                FetchField::Title => FetchedDetails::Titles(Vec::new()),
                FetchField::Abstract => FetchedDetails::Abstracts(Vec::new()),
            });
        }

        info!(field = %field, count = ids.len(), "Fetching record details");

        match field {
            FetchField::Pmid => {
                let body = self.source.fetch(&ids, FetchFormat::IdList).await?;
                Ok(FetchedDetails::IdList(body))
            }
            FetchField::Title | FetchField::Abstract => {
                let xml = self.source.fetch(&ids, FetchFormat::MedlineXml).await?;
                let records =
                    parse_medline_records(&xml).map_err(|e| AppError::Parse(e.to_string()))?;
                info!(requested = ids.len(), parsed = records.len(), "Parsed PubMed records");
                Ok(if field == FetchField::Title {
                    FetchedDetails::Titles(records)
                } else {
                    FetchedDetails::Abstracts(records)
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::INVALID_FIELD_MESSAGE;
    use crate::search::SearchError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const ARTICLE_SET: &str = r#"<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>111</PMID>
      <Article>
        <ArticleTitle>Small fiber neuropathy in Fabry disease</ArticleTitle>
        <Abstract><AbstractText>Burning pain in the extremities.</AbstractText></Abstract>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation><Article><ArticleTitle></ArticleTitle></Article></MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    /// Serves fixed bodies and counts requests
    struct StaticSource {
        body: Result<String, String>,
        fetches: Mutex<Vec<(Vec<RecordId>, FetchFormat)>>,
    }

    impl StaticSource {
        fn ok(body: &str) -> Self {
            Self {
                body: Ok(body.to_string()),
                fetches: Mutex::new(Vec::new()),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                body: Err(msg.to_string()),
                fetches: Mutex::new(Vec::new()),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LiteratureSource for StaticSource {
        async fn search_ids(&self, _query: &str, _max: usize) -> Result<Vec<RecordId>, SearchError> {
            panic!("fetcher must not search");
        }

        async fn fetch(&self, ids: &[RecordId], format: FetchFormat) -> Result<String, SearchError> {
            self.fetches.lock().unwrap().push((ids.to_vec(), format));
            self.body.clone().map_err(SearchError::RequestFailed)
        }
    }

    fn id_set(values: &[&str]) -> HashSet<RecordId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_bogus_field_makes_no_request() {
        let source = StaticSource::ok("");
        let err = DetailFetcher::new(&source)
            .fetch(&id_set(&["111"]), "bogus")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref msg) if msg == INVALID_FIELD_MESSAGE));
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_pmid_list_returned_verbatim() {
        let source = StaticSource::ok("222\n111\n");
        let details = DetailFetcher::new(&source)
            .fetch(&id_set(&["222", "111"]), "PMID")
            .await
            .unwrap();

        assert_eq!(details, FetchedDetails::IdList("222\n111\n".to_string()));
        assert_eq!(details.render(), "222\n111\n");

        let fetches = source.fetches.lock().unwrap();
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].1, FetchFormat::IdList);
        assert_eq!(fetches[0].0, vec!["111".to_string(), "222".to_string()]);
    }

    #[tokio::test]
    async fn test_title_rendering_skips_empty_records() {
        let source = StaticSource::ok(ARTICLE_SET);
        let details = DetailFetcher::new(&source)
            .fetch(&id_set(&["111", "999"]), "title")
            .await
            .unwrap();

        assert_eq!(details.field(), FetchField::Title);
        assert_eq!(
            details.render(),
            "PMID: 111\nTitle: Small fiber neuropathy in Fabry disease\n\n"
        );
        assert_eq!(source.fetches.lock().unwrap()[0].1, FetchFormat::MedlineXml);
    }

    #[tokio::test]
    async fn test_abstract_rendering() {
        let source = StaticSource::ok(ARTICLE_SET);
        let details = DetailFetcher::new(&source)
            .fetch(&id_set(&["111"]), "abstract")
            .await
            .unwrap();

        assert_eq!(
            details.render(),
            "PMID: 111\nTitle: Small fiber neuropathy in Fabry disease\nAbstract: Burning pain in the extremities.\n\n"
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        let source = StaticSource::failing("connection refused");
        let err = DetailFetcher::new(&source)
            .fetch(&id_set(&["111"]), "title")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Transport(ref msg) if msg.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_empty_id_set_skips_request() {
        let source = StaticSource::ok(ARTICLE_SET);
        let details = DetailFetcher::new(&source)
            .fetch(&HashSet::new(), "abstract")
            .await
            .unwrap();

        assert_eq!(details, FetchedDetails::Abstracts(Vec::new()));
        assert_eq!(details.render(), "");
        assert_eq!(source.fetch_count(), 0);
    }
}
