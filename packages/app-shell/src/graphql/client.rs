//! GraphQL client for making requests to the API server

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use suspense::{FetchError, Network, QueryDefinition, Variables};

/// GraphQL request body
#[derive(Debug, Serialize)]
pub struct GraphQLRequest<'a, V: Serialize> {
    pub query: &'static str,
    #[serde(rename = "operationName")]
    pub operation_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<&'a V>,
}

/// GraphQL response wrapper
#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error
#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    pub locations: Option<Vec<GraphQLErrorLocation>>,
    pub path: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLErrorLocation {
    pub line: i32,
    pub column: i32,
}

/// Error type for GraphQL operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("GraphQL error: {0}")]
    GraphQL(String),

    #[error("No data returned")]
    NoData,
}

impl From<ClientError> for FetchError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Network(err) => FetchError::Network(err.to_string()),
            ClientError::GraphQL(message) => FetchError::GraphQL(message),
            ClientError::NoData => FetchError::NoData,
        }
    }
}

/// GraphQL client for making requests
#[derive(Clone)]
pub struct GraphQLClient {
    client: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl GraphQLClient {
    /// Create a new GraphQL client
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            auth_token: None,
        }
    }

    /// Create a client with authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a GraphQL query
    pub async fn query<V, R>(&self, query: &QueryDefinition, variables: Option<&V>) -> Result<R, ClientError>
    where
        V: Serialize,
        R: DeserializeOwned,
    {
        let request = GraphQLRequest {
            query: query.text(),
            operation_name: query.name(),
            variables,
        };

        let mut req = self.client.post(&self.endpoint).json(&request);

        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let response = req.send().await?.error_for_status()?;
        let graphql_response: GraphQLResponse<R> = response.json().await?;

        if let Some(errors) = graphql_response.errors {
            if let Some(first_error) = errors.first() {
                return Err(ClientError::GraphQL(first_error.message.clone()));
            }
        }

        graphql_response.data.ok_or(ClientError::NoData)
    }
}

/// [`Network`] that sends queries to the GraphQL API.
#[derive(Clone)]
pub struct GraphQLNetwork {
    client: GraphQLClient,
}

impl GraphQLNetwork {
    pub fn new(client: GraphQLClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for GraphQLNetwork {
    async fn execute(&self, query: &QueryDefinition, variables: &Variables) -> Result<Value, FetchError> {
        tracing::debug!(query = query.name(), endpoint = self.client.endpoint(), "executing GraphQL query");
        let variables = (!variables.is_empty()).then_some(variables);
        Ok(self.client.query(query, variables).await?)
    }
}
