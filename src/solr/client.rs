//! HTTP client wrapper for a Solr core.

use crate::solr::{
    filters::{collection_filter, rank_documents},
    types::{DocumentIndex, RankedHit, RankingParams, SelectResponse, SolrDocument, SolrError},
};
use crate::store::RecordId;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::json;
use std::collections::BTreeSet;

const SIMILARITY_FIELDS: &str = "abstract,author,keyword,title,fulltext";

/// Lightweight HTTP client for one Solr core.
///
/// Open it once per run and hand it to the synchronizer; the underlying connection pool is reused
/// for every chunk.
pub struct SolrClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
}

impl SolrClient {
    /// Construct a client for the core at `url` (for example `http://localhost:8983/solr/records`).
    pub fn new(url: &str) -> Result<Self, SolrError> {
        let client = Client::builder().user_agent("bibsolr/0.1").build()?;
        let base_url = normalize_base_url(url).map_err(SolrError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized Solr HTTP client");
        Ok(Self { client, base_url })
    }

    /// Base URL of the core, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Add or overwrite one document.
    pub async fn add(&self, document: &SolrDocument) -> Result<(), SolrError> {
        let response = self
            .request(Method::POST, "update")
            .query(&[("wt", "json")])
            .json(&[document])
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::trace!(recid = document.id, "Document submitted");
        })
        .await
    }

    /// Commit pending documents.
    pub async fn commit(&self) -> Result<(), SolrError> {
        let response = self
            .request(Method::POST, "update")
            .query(&[("wt", "json")])
            .json(&json!({ "commit": {} }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(core = %self.base_url, "Commit acknowledged");
        })
        .await
    }

    /// Return every record id matching `field:query`.
    pub async fn search_ids(
        &self,
        field: &str,
        query: &str,
    ) -> Result<BTreeSet<RecordId>, SolrError> {
        let q = format!("{field}:{query}");
        let count = self.select(&[("q", q.as_str()), ("fl", "id"), ("rows", "0")]).await?;
        let total = count.response.num_found;
        if total == 0 {
            return Ok(BTreeSet::new());
        }

        let rows = total.to_string();
        let page = self
            .select(&[("q", q.as_str()), ("fl", "id"), ("rows", rows.as_str())])
            .await?;
        let ids = page
            .response
            .docs
            .iter()
            .map(|doc| doc.recid())
            .collect::<Result<BTreeSet<_>, _>>()?;
        tracing::debug!(field, query, hits = ids.len(), "Solr search completed");
        Ok(ids)
    }

    /// Rank the records of `hitset` against `query`, least relevant first.
    pub async fn ranked(
        &self,
        query: &str,
        hitset: &BTreeSet<RecordId>,
        params: &RankingParams,
        rows: usize,
    ) -> Result<Vec<RankedHit>, SolrError> {
        let filter = collection_filter(hitset, params.cutoff_amount);
        let rows = rows.to_string();
        let time_allowed = params.cutoff_time_ms.to_string();
        let mut query_params = vec![
            ("q", query),
            ("fl", "id,score"),
            ("rows", rows.as_str()),
            ("timeAllowed", time_allowed.as_str()),
        ];
        if !filter.is_empty() {
            query_params.push(("fq", filter.as_str()));
        }

        let payload = self.select(&query_params).await?;
        let hits = rank_documents(&payload.response.docs)?;
        tracing::debug!(query, hits = hits.len(), "Solr ranking completed");
        Ok(hits)
    }

    /// Rank the records of `hitset` by similarity to `recid`, least similar first.
    ///
    /// The source record is part of the result and normally comes last. Solr is asked for
    /// `rows * more_results_factor` documents and the `rows` most similar are kept.
    pub async fn similar_ranked(
        &self,
        recid: RecordId,
        hitset: &BTreeSet<RecordId>,
        params: &RankingParams,
        rows: usize,
    ) -> Result<Vec<RankedHit>, SolrError> {
        let mlt = &params.similar;
        let q = format!("id:{recid}");
        let filter = collection_filter(hitset, params.cutoff_amount);
        let fetched = rows.saturating_mul(mlt.more_results_factor.max(1)).to_string();
        let time_allowed = params.cutoff_time_ms.to_string();
        let min_term_freq = mlt.min_term_freq.to_string();
        let min_doc_freq = mlt.min_doc_freq.to_string();
        let min_word_len = mlt.min_word_len.to_string();
        let max_word_len = mlt.max_word_len.to_string();
        let max_query_terms = mlt.max_query_terms.to_string();
        let max_tokens_parsed = mlt.max_tokens_parsed.to_string();
        let mut query_params = vec![
            ("q", q.as_str()),
            ("fl", "id,score"),
            ("mlt.fl", SIMILARITY_FIELDS),
            ("mlt.match.include", "true"),
            ("mlt.mintf", min_term_freq.as_str()),
            ("mlt.mindf", min_doc_freq.as_str()),
            ("mlt.minwl", min_word_len.as_str()),
            ("mlt.maxwl", max_word_len.as_str()),
            ("mlt.maxqt", max_query_terms.as_str()),
            ("mlt.maxntp", max_tokens_parsed.as_str()),
            ("mlt.boost", if mlt.boost { "true" } else { "false" }),
            ("rows", fetched.as_str()),
            ("timeAllowed", time_allowed.as_str()),
            ("wt", "json"),
        ];
        if !filter.is_empty() {
            query_params.push(("fq", filter.as_str()));
        }

        let response = self
            .request(Method::GET, "mlt")
            .query(&query_params)
            .send()
            .await?;
        let payload: SelectResponse = self.read_json(response).await?;
        let mut hits = rank_documents(&payload.response.docs)?;
        let hits = hits.split_off(hits.len().saturating_sub(rows));
        tracing::debug!(recid, hits = hits.len(), "Solr similarity ranking completed");
        Ok(hits)
    }

    async fn select(&self, params: &[(&str, &str)]) -> Result<SelectResponse, SolrError> {
        let response = self
            .request(Method::GET, "select")
            .query(params)
            .query(&[("wt", "json")])
            .send()
            .await?;
        self.read_json(response).await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        self.client.request(method, url)
    }

    async fn read_json(&self, response: reqwest::Response) -> Result<SelectResponse, SolrError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.failure(response).await)
        }
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), SolrError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            Err(self.failure(response).await)
        }
    }

    async fn failure(&self, response: reqwest::Response) -> SolrError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = SolrError::UnexpectedStatus { status, body };
        tracing::error!(core = %self.base_url, error = %error, "Solr request failed");
        error
    }
}

#[async_trait]
impl DocumentIndex for SolrClient {
    async fn submit(&self, document: &SolrDocument) -> Result<(), SolrError> {
        self.add(document).await
    }

    async fn commit(&self) -> Result<(), SolrError> {
        SolrClient::commit(self).await
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string().trim_end_matches('/').to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };

    fn client_for(server: &MockServer) -> SolrClient {
        SolrClient::new(&server.base_url()).expect("client")
    }

    #[test]
    fn normalize_base_url_strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("http://localhost:8983/solr/core/").expect("url"),
            "http://localhost:8983/solr/core"
        );
        assert!(normalize_base_url("not a url").is_err());
        assert!(matches!(
            SolrClient::new("::"),
            Err(SolrError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn add_posts_document_array_to_update_handler() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/update")
                    .query_param("wt", "json")
                    .json_body(json!([{
                        "id": 3,
                        "abstract": "a",
                        "author": "b",
                        "fulltext": "",
                        "keyword": "k1 k2",
                        "title": "t"
                    }]));
                then.status(200).json_body(json!({ "responseHeader": { "status": 0 } }));
            })
            .await;

        let document = SolrDocument {
            id: 3,
            abstract_text: "a".into(),
            author: "b".into(),
            fulltext: String::new(),
            keyword: "k1 k2".into(),
            title: "t".into(),
        };
        client_for(&server).add(&document).await.expect("add");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn commit_failure_surfaces_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/update").json_body(json!({ "commit": {} }));
                then.status(500).body("core is locked");
            })
            .await;

        let error = client_for(&server).commit().await.unwrap_err();
        match error {
            SolrError::UnexpectedStatus { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "core is locked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_ids_counts_then_fetches_all_rows() {
        let server = MockServer::start_async().await;
        let count = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/select")
                    .query_param("q", "fulltext:higgs")
                    .query_param("rows", "0");
                then.status(200).json_body(json!({
                    "response": { "numFound": 3, "start": 0, "docs": [] }
                }));
            })
            .await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/select")
                    .query_param("q", "fulltext:higgs")
                    .query_param("rows", "3");
                then.status(200).json_body(json!({
                    "response": {
                        "numFound": 3,
                        "start": 0,
                        "docs": [{ "id": "56" }, { "id": "47" }, { "id": "55" }]
                    }
                }));
            })
            .await;

        let ids = client_for(&server)
            .search_ids("fulltext", "higgs")
            .await
            .expect("search");
        count.assert_async().await;
        page.assert_async().await;
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![47, 55, 56]);
    }

    #[tokio::test]
    async fn search_ids_skips_second_request_without_hits() {
        let server = MockServer::start_async().await;
        let count = server
            .mock_async(|when, then| {
                when.method(GET).path("/select");
                then.status(200).json_body(json!({
                    "response": { "numFound": 0, "start": 0, "docs": [] }
                }));
            })
            .await;

        let ids = client_for(&server)
            .search_ids("fulltext", "Willnotfind")
            .await
            .expect("search");
        assert!(ids.is_empty());
        count.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn ranked_sends_collection_filter_and_cutoffs() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/select")
                    .query_param("q", "fulltext:\"higgs boson\"")
                    .query_param("fq", "id:(55 56)")
                    .query_param("fl", "id,score")
                    .query_param("rows", "10")
                    .query_param("timeAllowed", "2000");
                then.status(200).json_body(json!({
                    "response": {
                        "numFound": 2,
                        "start": 0,
                        "maxScore": 3.0,
                        "docs": [{ "id": "56", "score": 3.0 }, { "id": "55", "score": 1.5 }]
                    }
                }));
            })
            .await;

        let hitset: BTreeSet<RecordId> = [55, 56].into_iter().collect();
        let hits = client_for(&server)
            .ranked(
                "fulltext:\"higgs boson\"",
                &hitset,
                &RankingParams::default(),
                10,
            )
            .await
            .expect("ranked");
        mock.assert_async().await;
        let ids: Vec<RecordId> = hits.iter().map(|hit| hit.recid).collect();
        assert_eq!(ids, vec![55, 56]);
    }

    #[tokio::test]
    async fn similar_ranked_keeps_source_record_as_best_hit() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/mlt")
                    .query_param("q", "id:10")
                    .query_param("mlt.fl", SIMILARITY_FIELDS)
                    .query_param("mlt.match.include", "true")
                    .query_param("mlt.mintf", "0")
                    .query_param("mlt.mindf", "0")
                    .query_param("mlt.minwl", "0")
                    .query_param("mlt.maxwl", "0")
                    .query_param("mlt.maxqt", "25")
                    .query_param("mlt.maxntp", "1000")
                    .query_param("mlt.boost", "false")
                    .query_param("rows", "10");
                then.status(200).json_body(json!({
                    "response": {
                        "numFound": 4,
                        "start": 0,
                        "docs": [
                            { "id": "10", "score": 9.0 },
                            { "id": "12", "score": 4.5 },
                            { "id": "11", "score": 2.0 },
                            { "id": "13", "score": 1.0 }
                        ]
                    }
                }));
            })
            .await;

        let hits = client_for(&server)
            .similar_ranked(10, &BTreeSet::new(), &RankingParams::default(), 2)
            .await
            .expect("similar");
        mock.assert_async().await;
        let ids: Vec<RecordId> = hits.iter().map(|hit| hit.recid).collect();
        assert_eq!(ids, vec![12, 10]);
        assert_eq!(hits[1].relevance, 100);
        assert_eq!(hits[0].relevance, 50);
    }
}
