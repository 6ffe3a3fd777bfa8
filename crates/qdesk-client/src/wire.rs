//! Response bodies of the REST endpoint

use qdesk_core::{Credentials, QdeskError, QueryResults, Result, TargetRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Body of `POST /connections`
#[derive(Serialize)]
pub(crate) struct OpenBody<'a> {
    pub target: &'a str,
    #[serde(flatten)]
    pub credentials: &'a Credentials,
}

/// Body of `POST /connections/{id}/queries`
#[derive(Serialize)]
pub(crate) struct QueryBody<'a> {
    pub sql: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct CreatedConnection {
    id: String,
}

#[derive(Deserialize)]
struct QueryData {
    attributes: QueryResults,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryResponse {
    Wrapped(Envelope<QueryData>),
    Flat(QueryResults),
}

fn decode<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| QdeskError::InvalidResponse(format!("malformed {} response: {}", what, e)))
}

pub(crate) fn parse_created(body: &str) -> Result<String> {
    let envelope: Envelope<CreatedConnection> = decode(body, "connection")?;
    if envelope.data.id.is_empty() {
        return Err(QdeskError::InvalidResponse(
            "endpoint returned an empty connection id".into(),
        ));
    }
    Ok(envelope.data.id)
}

pub(crate) fn parse_query_results(body: &str) -> Result<QueryResults> {
    match decode::<QueryResponse>(body, "query")? {
        QueryResponse::Wrapped(envelope) => Ok(envelope.data.attributes),
        QueryResponse::Flat(results) => Ok(results),
    }
}

pub(crate) fn parse_targets(body: &str) -> Result<Vec<TargetRef>> {
    let envelope: Envelope<Vec<TargetRef>> = decode(body, "target list")?;
    Ok(envelope.data)
}
