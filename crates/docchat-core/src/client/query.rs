use super::http::{build_agent, classify, truncate};
use super::{HealthStatus, QueryClient, QueryError, QueryRequest, QueryResponse};
use crate::config::ClientConfig;
use crate::logging::WireLog;

#[derive(serde::Deserialize)]
struct HealthBody {
    status: HealthStatus,
}

/// `ureq` client for `POST /query` and `GET /health`.
pub struct HttpQueryClient {
    agent: ureq::Agent,
    query_url: String,
    health_url: String,
    wire: WireLog,
}

impl HttpQueryClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            agent: build_agent(config.request_timeout()),
            query_url: config.endpoint("query"),
            health_url: config.endpoint("health"),
            wire: WireLog::open(config.log_dir.as_deref(), "query"),
        }
    }

    /// Ask the backend whether its index is ready.
    pub fn health(&self) -> Result<HealthStatus, QueryError> {
        self.wire.line("REQUEST", &format!("GET {}", self.health_url));
        let response = self
            .agent
            .get(&self.health_url)
            .call()
            .map_err(|e| classify(e, &self.wire))?;

        let body: HealthBody = response
            .into_json()
            .map_err(|e| QueryError::Malformed(e.to_string()))?;
        self.wire.line("RESPONSE", &format!("{:?}", body.status));
        Ok(body.status)
    }
}

impl QueryClient for HttpQueryClient {
    fn query(&self, request: &QueryRequest) -> Result<QueryResponse, QueryError> {
        self.wire.line(
            "REQUEST",
            &format!("POST {} {}", self.query_url, truncate(&request.query)),
        );
        log::debug!("Querying {}", self.query_url);

        let response = self
            .agent
            .post(&self.query_url)
            .send_json(request)
            .map_err(|e| classify(e, &self.wire))?;

        let body: QueryResponse = response
            .into_json()
            .map_err(|e| QueryError::Malformed(e.to_string()))?;
        self.wire.line("RESPONSE", &truncate(&body.answer));

        if body.answer.trim().is_empty() {
            return Err(QueryError::EmptyAnswer);
        }
        Ok(body)
    }
}
