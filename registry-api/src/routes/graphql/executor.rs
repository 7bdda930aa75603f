//! Runs a validated query against the search service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tracing::{debug, error};

use super::error::GraphqlError;
use super::parser::parse;
use super::validation::{validate, PlannedField};
use crate::domain::models::{Location, OrganizationAggregate};
use crate::domain::search::SearchService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: Option<String>,
    /// An object, or an object encoded as a JSON string
    #[serde(default)]
    pub variables: Option<Json>,
    pub operation_name: Option<String>,
}

/// `data` is omitted when the request failed before execution started.
#[derive(Debug, Serialize)]
pub struct GraphqlResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Json>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

impl GraphqlResponse {
    fn failed(errors: Vec<GraphqlError>) -> Self {
        Self { data: None, errors }
    }
}

fn variables(raw: Option<Json>) -> Result<Map<String, Json>, GraphqlError> {
    match raw {
        None | Some(Json::Null) => Ok(Map::new()),
        Some(Json::Object(map)) => Ok(map),
        Some(Json::String(s)) if s.trim().is_empty() => Ok(Map::new()),
        Some(Json::String(s)) => match serde_json::from_str(&s) {
            Ok(Json::Object(map)) => Ok(map),
            Ok(Json::Null) => Ok(Map::new()),
            _ => Err(GraphqlError::new("Variables must be a JSON object")),
        },
        Some(_) => Err(GraphqlError::new("Variables must be a JSON object")),
    }
}

pub async fn execute(search: &SearchService, request: GraphqlRequest) -> GraphqlResponse {
    let Some(query) = request.query.filter(|q| !q.trim().is_empty()) else {
        return GraphqlResponse::failed(vec![GraphqlError::new("No query string was present")]);
    };
    let variables = match variables(request.variables) {
        Ok(variables) => variables,
        Err(err) => return GraphqlResponse::failed(vec![err]),
    };
    let document = match parse(&query) {
        Ok(document) => document,
        Err(err) => {
            debug!(error = %err, "Rejected unparsable query");
            return GraphqlResponse::failed(vec![err.into()]);
        }
    };
    let fields = match validate(&document, request.operation_name.as_deref(), &variables) {
        Ok(fields) => fields,
        Err(errors) => {
            debug!(errors = errors.len(), "Rejected invalid query");
            return GraphqlResponse::failed(errors);
        }
    };

    let mut data = Map::new();
    let mut errors = vec![];
    for field in &fields {
        let value = match field.name() {
            "search" => match run_search(search, field).await {
                Ok(value) => value,
                Err(err) => {
                    errors.push(err);
                    Json::Null
                }
            },
            _ => Json::from("Query"),
        };
        data.insert(field.key.clone(), value);
    }

    GraphqlResponse {
        data: Some(Json::Object(data)),
        errors,
    }
}

async fn run_search(search: &SearchService, field: &PlannedField) -> Result<Json, GraphqlError> {
    let term = field.arguments.get("term").and_then(Json::as_str);
    let first = field.arguments.get("first").and_then(Json::as_i64);

    let results = search.search(term, first).await.map_err(|err| {
        if err.is_validation() {
            debug!(error = %err, "Rejected search arguments");
        } else {
            error!(error = %err, "Search failed");
        }
        GraphqlError::new(err.to_string())
            .at(field.pos)
            .with_path(vec![field.key.clone()])
    })?;

    Ok(Json::Array(
        results
            .iter()
            .map(|aggregate| search_result(aggregate, &field.selections))
            .collect(),
    ))
}

fn search_result(aggregate: &OrganizationAggregate, selections: &[PlannedField]) -> Json {
    let mut object = Map::new();
    for field in selections {
        let value = match field.name() {
            "id" => Json::String(aggregate.id().to_string()),
            "names" => Json::from(aggregate.name_strings()),
            "tags" => Json::from(aggregate.distinct_tag_names()),
            "locations" => Json::Array(
                aggregate
                    .locations
                    .iter()
                    .map(|location| location_result(location, &field.selections))
                    .collect(),
            ),
            _ => Json::from("SearchResult"),
        };
        object.insert(field.key.clone(), value);
    }
    Json::Object(object)
}

fn location_result(location: &Location, selections: &[PlannedField]) -> Json {
    let mut object = Map::new();
    for field in selections {
        let value = match field.name() {
            "city" => Json::from(location.city.clone()),
            "country" => Json::from(location.country.clone()),
            "content" => Json::from(location.content.clone().unwrap_or_default()),
            _ => Json::from("Location"),
        };
        object.insert(field.key.clone(), value);
    }
    Json::Object(object)
}
