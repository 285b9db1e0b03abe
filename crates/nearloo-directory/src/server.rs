//! Directory HTTP endpoints.
//!
//! | route | method |
//! |---|---|
//! | `/api/places` | GET |
//! | `/api/places/add` | POST `{place}` |
//! | `/api/places/delete` | POST `{id}` |
//! | `/api/reviews?placeId=` | GET |
//! | `/api/reviews/add` | POST review |
//!
//! Every response is JSON: `{ok, items}` or `{ok: false, error}`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;

use chrono::Utc;
use nearloo_core::DirectoryError;
use serde::Serialize;
use serde_json::Value;
use warp::http::{Method, StatusCode};
use warp::hyper::body::Bytes;
use warp::reply::{Json, WithStatus};
use warp::Filter;

use crate::directory::PlaceDirectory;
use crate::record::ApiResponse;
use crate::validate::{normalize_review, parse_delete, parse_new_place};

type JsonReply = WithStatus<Json>;

fn reply<T: Serialize>(body: &ApiResponse<T>, status: StatusCode) -> JsonReply {
    warp::reply::with_status(warp::reply::json(body), status)
}

fn error_reply(message: &str, status: StatusCode) -> JsonReply {
    reply(&ApiResponse::<Value>::error(message), status)
}

fn method_not_allowed() -> JsonReply {
    error_reply("Method not allowed", StatusCode::METHOD_NOT_ALLOWED)
}

fn respond<T: Serialize>(result: Result<Vec<T>, DirectoryError>) -> JsonReply {
    match result {
        Ok(items) => reply(&ApiResponse::items(items), StatusCode::OK),
        Err(DirectoryError::Validation(e)) => error_reply(&e.message, StatusCode::BAD_REQUEST),
        Err(e) => {
            tracing::error!("Directory request failed: {}", e);
            error_reply("Server error", StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Parse a request body; an empty body reads as `{}`.
fn parse_body(body: &Bytes) -> Result<Value, JsonReply> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|_| error_reply("Invalid JSON", StatusCode::BAD_REQUEST))
}

async fn list_places(method: Method, directory: PlaceDirectory) -> Result<JsonReply, Infallible> {
    if method != Method::GET {
        return Ok(method_not_allowed());
    }
    Ok(respond(directory.list_places().await))
}

async fn add_place(
    method: Method,
    body: Bytes,
    directory: PlaceDirectory,
) -> Result<JsonReply, Infallible> {
    if method != Method::POST {
        return Ok(method_not_allowed());
    }
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(reply) => return Ok(reply),
    };
    let place = match parse_new_place(&payload, Utc::now()) {
        Ok(place) => place,
        Err(e) => return Ok(error_reply(&e.message, StatusCode::BAD_REQUEST)),
    };

    tracing::info!("Adding place {}", place.id);
    Ok(respond(directory.add_place(place).await))
}

async fn delete_place(
    method: Method,
    body: Bytes,
    directory: PlaceDirectory,
) -> Result<JsonReply, Infallible> {
    if method != Method::POST {
        return Ok(method_not_allowed());
    }
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(reply) => return Ok(reply),
    };
    let id = match parse_delete(&payload) {
        Ok(id) => id,
        Err(e) => return Ok(error_reply(&e.message, StatusCode::BAD_REQUEST)),
    };

    tracing::info!("Deleting place {}", id);
    Ok(respond(directory.delete_place(&id).await))
}

async fn list_reviews(
    method: Method,
    query: HashMap<String, String>,
    directory: PlaceDirectory,
) -> Result<JsonReply, Infallible> {
    if method != Method::GET {
        return Ok(method_not_allowed());
    }
    let place_id = query.get("placeId").map(String::as_str).unwrap_or_default();
    Ok(respond(directory.list_reviews(place_id).await))
}

async fn add_review(
    method: Method,
    body: Bytes,
    directory: PlaceDirectory,
) -> Result<JsonReply, Infallible> {
    if method != Method::POST {
        return Ok(method_not_allowed());
    }
    // a malformed body reads as an empty review and fails on placeId
    let payload = parse_body(&body).unwrap_or(Value::Null);
    let review = match normalize_review(&payload, Utc::now()) {
        Ok(review) => review,
        Err(e) => return Ok(error_reply(&e.message, StatusCode::BAD_REQUEST)),
    };

    Ok(respond(directory.add_review(review).await))
}

fn with_directory(
    directory: PlaceDirectory,
) -> impl Filter<Extract = (PlaceDirectory,), Error = Infallible> + Clone {
    warp::any().map(move || directory.clone())
}

/// All directory routes.
pub fn routes(
    directory: PlaceDirectory,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let places = warp::path!("api" / "places")
        .and(warp::method())
        .and(with_directory(directory.clone()))
        .and_then(list_places);

    let places_add = warp::path!("api" / "places" / "add")
        .and(warp::method())
        .and(warp::body::bytes())
        .and(with_directory(directory.clone()))
        .and_then(add_place);

    let places_delete = warp::path!("api" / "places" / "delete")
        .and(warp::method())
        .and(warp::body::bytes())
        .and(with_directory(directory.clone()))
        .and_then(delete_place);

    let reviews = warp::path!("api" / "reviews")
        .and(warp::method())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_directory(directory.clone()))
        .and_then(list_reviews);

    let reviews_add = warp::path!("api" / "reviews" / "add")
        .and(warp::method())
        .and(warp::body::bytes())
        .and(with_directory(directory))
        .and_then(add_review);

    places
        .or(places_add)
        .or(places_delete)
        .or(reviews)
        .or(reviews_add)
        .with(warp::reply::with::header("Cache-Control", "no-store"))
        .with(warp::trace::request())
}

/// Serve the directory until the process exits.
pub async fn serve(directory: PlaceDirectory, addr: SocketAddr) {
    tracing::info!("Directory listening on http://{}", addr);
    warp::serve(routes(directory)).run(addr).await;
}
