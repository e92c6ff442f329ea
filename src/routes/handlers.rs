use std::collections::HashMap;
use std::time::{Duration, Instant};

use slog::debug;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::record::Record;
use crate::resource::ResourceKind;
use crate::routes::{
    query,
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::schema::{validate, Operation};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn list(
    environment: Environment,
    kind: ResourceKind,
    raw_query: HashMap<String, String>,
) -> RouteResult {
    timed! {
        let schema = kind.schema();
        let error_handler = |e: BackendError| Rejection::new(Context::list(schema.name), e);

        debug!(environment.logger, "Listing records..."; "resource" => schema.name);
        let selection = query::list_selection(schema, &raw_query);

        let records = environment
            .store(kind)
            .list(&selection)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::list(records))
    }
}

pub async fn retrieve(environment: Environment, kind: ResourceKind, id: String) -> RouteResult {
    timed! {
        let schema = kind.schema();
        let error_handler =
            |e: BackendError| Rejection::new(Context::retrieve(schema.name, id.clone()), e);

        let id_number = parse_id(&id).map_err(&error_handler)?;
        debug!(environment.logger, "Retrieving record..."; "resource" => schema.name, "id" => id_number);

        let record = environment
            .store(kind)
            .get(id_number)
            .await
            .map_err(&error_handler)?;

        with_status(json(&SuccessResponse::record(record)), StatusCode::OK)
    }
}

pub async fn create(environment: Environment, kind: ResourceKind, body: Record) -> RouteResult {
    timed! {
        let schema = kind.schema();
        let error_handler = |e: BackendError| Rejection::new(Context::create(schema.name), e);

        debug!(environment.logger, "Creating record..."; "resource" => schema.name);
        validate(schema, Operation::Create, &body).map_err(&error_handler)?;

        let record = environment
            .store(kind)
            .create(body)
            .await
            .map_err(&error_handler)?;

        with_status(json(&SuccessResponse::record(record)), StatusCode::CREATED)
    }
}

pub async fn replace(
    environment: Environment,
    kind: ResourceKind,
    id: String,
    body: Record,
) -> RouteResult {
    timed! {
        let schema = kind.schema();
        let error_handler =
            |e: BackendError| Rejection::new(Context::replace(schema.name, id.clone()), e);

        // validation runs before the lookup, so a malformed body
        // against a missing id answers 400, not 404
        validate(schema, Operation::Replace, &body).map_err(&error_handler)?;

        let id_number = parse_id(&id).map_err(&error_handler)?;
        debug!(environment.logger, "Replacing record..."; "resource" => schema.name, "id" => id_number);

        let record = environment
            .store(kind)
            .replace(id_number, body)
            .await
            .map_err(&error_handler)?;

        with_status(json(&SuccessResponse::record(record)), StatusCode::OK)
    }
}

pub async fn patch(
    environment: Environment,
    kind: ResourceKind,
    id: String,
    body: Record,
) -> RouteResult {
    timed! {
        let schema = kind.schema();
        let error_handler =
            |e: BackendError| Rejection::new(Context::patch(schema.name, id.clone()), e);

        validate(schema, Operation::Patch, &body).map_err(&error_handler)?;

        let id_number = parse_id(&id).map_err(&error_handler)?;
        debug!(environment.logger, "Patching record..."; "resource" => schema.name, "id" => id_number);

        let record = environment
            .store(kind)
            .patch(id_number, body)
            .await
            .map_err(&error_handler)?;

        with_status(json(&SuccessResponse::record(record)), StatusCode::OK)
    }
}

pub async fn delete(environment: Environment, kind: ResourceKind, id: String) -> RouteResult {
    timed! {
        let schema = kind.schema();
        let error_handler =
            |e: BackendError| Rejection::new(Context::delete(schema.name, id.clone()), e);

        let id_number = parse_id(&id).map_err(&error_handler)?;
        debug!(environment.logger, "Deleting record..."; "resource" => schema.name, "id" => id_number);

        let record = environment
            .store(kind)
            .delete(id_number)
            .await
            .map_err(&error_handler)?;

        with_status(json(&SuccessResponse::record(record)), StatusCode::OK)
    }
}

// Path ids are compared as integers; a segment that does not parse
// behaves as a missing record rather than a routing failure.
fn parse_id(raw: &str) -> Result<i64, BackendError> {
    raw.parse().map_err(|_| BackendError::not_found(raw))
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
