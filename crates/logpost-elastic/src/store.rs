//! Elasticsearch implementation of [`MessageStore`].

use logpost_core::{
    to_document, IdSequence, LogError, Message, MessageId, MessageStore, SearchPage, SearchRequest,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::ElasticConfig;
use crate::error::{ElasticError, Result};
use crate::mapping::{index_body, max_seq_body, parse_max_seq, parse_search_response};

/// Message store backed by a single Elasticsearch index.
///
/// Ids come from a per-instance [`IdSequence`] seeded from the highest
/// stored `seq` when the schema is ensured. Documents are written with
/// create-only semantics, so two instances that race on an id get an
/// error instead of overwriting each other.
#[derive(Debug)]
pub struct ElasticStore {
    client: Client,
    config: ElasticConfig,
    sequence: IdSequence,
}

impl ElasticStore {
    /// Creates a store for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ElasticConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            config,
            sequence: IdSequence::new(),
        })
    }

    /// The index name.
    #[must_use]
    pub fn index(&self) -> &str {
        &self.config.index
    }

    /// The id the next write will use.
    #[must_use]
    pub fn next_id(&self) -> MessageId {
        self.sequence.peek()
    }

    fn index_url(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.config.base_url(), self.config.index, suffix)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.config.username {
            Some(user) => builder.basic_auth(user, self.config.password.as_ref()),
            None => builder,
        }
    }

    /// Returns true if the index exists.
    ///
    /// # Errors
    ///
    /// Returns an error for any status other than 200 or 404.
    pub async fn index_exists(&self) -> Result<bool> {
        let response = self.request(Method::HEAD, self.index_url("")).send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ElasticError::Status {
                status: status.as_u16(),
                body: String::new(),
            }),
        }
    }

    /// Creates the index with its mapping. Returns false if another client
    /// created it first.
    ///
    /// # Errors
    ///
    /// Returns an error if Elasticsearch refuses the index for any other reason.
    pub async fn create_index(&self) -> Result<bool> {
        let response = self
            .request(Method::PUT, self.index_url(""))
            .json(&index_body())
            .send()
            .await?;
        match check(response).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_already_exists() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Highest `seq` stored in the index, or zero if it is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregation fails.
    pub async fn highest_seq(&self) -> Result<u64> {
        let response = self
            .request(Method::POST, self.index_url("/_search"))
            .json(&max_seq_body())
            .send()
            .await?;
        let body: Value = check(response).await?.json().await?;
        parse_max_seq(&body)
    }

    /// Indexes one document under `id`, failing if the id is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if Elasticsearch rejects the document.
    pub async fn create_document(&self, id: MessageId, document: &Value) -> Result<()> {
        let mut builder = self
            .request(Method::PUT, self.index_url(&format!("/_create/{id}")))
            .json(document);
        if self.config.refresh {
            builder = builder.query(&[("refresh", "wait_for")]);
        }
        check(builder.send().await?).await?;
        Ok(())
    }

    /// Executes a search request against the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails or the response cannot be read.
    pub async fn run_search(&self, body: &Value) -> Result<SearchPage> {
        let response = self
            .request(Method::POST, self.index_url("/_search"))
            .json(body)
            .send()
            .await?;
        let body: Value = check(response).await?.json().await?;
        parse_search_response(body)
    }

    /// Deletes the index. A missing index counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if Elasticsearch refuses the deletion.
    pub async fn delete_index(&self) -> Result<()> {
        let response = self.request(Method::DELETE, self.index_url("")).send().await?;
        match check(response).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn fail(&self, operation: &'static str, err: ElasticError) -> LogError {
        error!(index = %self.config.index, operation, error = %err, "elasticsearch request failed");
        err.into()
    }

    fn fail_search(&self, query: &Value, err: ElasticError) -> LogError {
        error!(
            index = %self.config.index,
            operation = "search",
            error = %err,
            query = %query,
            "elasticsearch request failed"
        );
        err.into()
    }
}

impl MessageStore for ElasticStore {
    async fn ensure_schema(&self) -> logpost_core::Result<()> {
        let exists = self
            .index_exists()
            .await
            .map_err(|e| self.fail("ensure_schema", e))?;

        if exists {
            info!(index = %self.config.index, "message index already exists");
        } else if self
            .create_index()
            .await
            .map_err(|e| self.fail("ensure_schema", e))?
        {
            info!(index = %self.config.index, "created message index");
        } else {
            info!(index = %self.config.index, "message index created concurrently");
        }

        let highest = self
            .highest_seq()
            .await
            .map_err(|e| self.fail("ensure_schema", e))?;
        self.sequence.seed(highest);
        debug!(index = %self.config.index, highest, "seeded id sequence");
        Ok(())
    }

    async fn write(&self, message: &Message) -> logpost_core::Result<MessageId> {
        let id = self.sequence.next_id();
        let document = to_document(id, message)?;
        self.create_document(id, &document)
            .await
            .map_err(|e| self.fail("write", e))?;
        Ok(id)
    }

    async fn search(&self, request: &SearchRequest) -> logpost_core::Result<SearchPage> {
        let body = request.to_json();
        self.run_search(&body)
            .await
            .map_err(|e| self.fail_search(&body, e))
    }

    async fn teardown(&self) -> logpost_core::Result<()> {
        self.delete_index()
            .await
            .map_err(|e| self.fail("teardown", e))?;
        info!(index = %self.config.index, "deleted message index");
        Ok(())
    }
}

/// Passes successful responses through and turns the rest into [`ElasticError::Status`].
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ElasticError::Status {
        status: status.as_u16(),
        body,
    })
}
