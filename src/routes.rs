use std::sync::Arc;

use slog::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};
use warp::{Filter, Reply};

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::resource::ResourceKind;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

use rejection::ErrorBody;

/// Builds the whole `/api` surface: all six CRUD routes for each
/// resource, with every rejection translated to its pinned envelope.
pub fn make_api(
    environment: Environment,
) -> impl Filter<Extract = impl Reply, Error = reject::Rejection> + Clone {
    let logger = environment.logger.clone();

    let resource_routes = |kind| {
        make_list_route(environment.clone(), kind)
            .or(make_retrieve_route(environment.clone(), kind))
            .or(make_create_route(environment.clone(), kind))
            .or(make_replace_route(environment.clone(), kind))
            .or(make_patch_route(environment.clone(), kind))
            .or(make_delete_route(environment.clone(), kind))
    };

    resource_routes(ResourceKind::Tracks)
        .or(resource_routes(ResourceKind::Playlists))
        .recover(move |r| format_rejection(logger.clone(), r))
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?e, "status" => %status_code_for(e), "message" => %e);

        return Ok(with_status(json(&r.body()), status_code_for(e)));
    }

    if let Some(e) = rej.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(with_status(
            json(&ErrorBody::Validation {
                error: e.to_string(),
            }),
            StatusCode::BAD_REQUEST,
        ));
    }

    if rej.find::<reject::UnsupportedMediaType>().is_some() {
        return Ok(with_status(
            json(&ErrorBody::Validation {
                error: "request body must be JSON".to_owned(),
            }),
            StatusCode::BAD_REQUEST,
        ));
    }

    // an unmatched path and a matched path with the wrong verb both
    // answer the same catch-all envelope
    if rej.is_not_found() || rej.find::<reject::MethodNotAllowed>().is_some() {
        return Ok(with_status(
            json(&ErrorBody::failure("Route not found")),
            StatusCode::NOT_FOUND,
        ));
    }

    error!(logger, "Unhandled rejection"; "rejection" => ?rej);

    Ok(with_status(
        json(&ErrorBody::failure("Something went wrong!")),
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        Validation { .. } => StatusCode::BAD_REQUEST,
        NotFound { .. } => StatusCode::NOT_FOUND,
        Storage { .. } | MalformedDocument { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use std::collections::HashMap;

    use warp::filters::BoxedFilter;
    use warp::path::{end, param as par};
    use warp::Filter;
    use warp::Reply;
    use warp::{delete as d, get as g, patch as pt, path as p, post, put, query};

    use super::handlers;
    use crate::environment::Environment;
    use crate::record::Record;
    use crate::resource::ResourceKind;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment, kind: ResourceKind) -> Route {
            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(warp::any().map(move || kind))
                .and(p("api"))
                .and(p(kind.path()));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_list_route => list, rt; end(), g(), query::<HashMap<String, String>>());
    route!(make_retrieve_route => retrieve, rt; par::<String>(), end(), g());
    route!(make_create_route => create, rt; end(), post(), warp::body::json::<Record>());
    route!(make_replace_route => replace, rt; par::<String>(), end(), put(), warp::body::json::<Record>());
    route!(make_patch_route => patch, rt; par::<String>(), end(), pt(), warp::body::json::<Record>());
    route!(make_delete_route => delete, rt; par::<String>(), end(), d());
}
