use actix_web::{http::header, http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;
use crate::core::DiscoveryError;
use crate::models::{AutocompleteQuery, CustomLocationRequest, DeviceLocationRequest, PhotoQuery, PlaceDetailsResponse};
use crate::routes::sessions::{discovery_error_response, error_response, AppState};

/// Photo width used for detail galleries
const DETAIL_PHOTO_WIDTH: u32 = 800;

/// Configure location settings and place lookup routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/users/{user_id}/location", web::get().to(get_location))
        .route("/users/{user_id}/location/current", web::put().to(use_current_location))
        .route("/users/{user_id}/location/custom", web::put().to(use_custom_location))
        .route("/places/autocomplete", web::get().to(autocomplete))
        .route("/places/photos/{reference}", web::get().to(place_photo))
        .route("/places/{place_id}", web::get().to(place_details));
}

/// Location preference and a readable description of it
///
/// GET /api/v1/users/{user_id}/location
async fn get_location(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let user_id = path.into_inner();
    let device = state.devices.device(&user_id).await;
    let resolver = state.resolver_for(&user_id, device);

    HttpResponse::Ok().json(resolver.summary().await)
}

/// Switch to the device location
///
/// PUT /api/v1/users/{user_id}/location/current
///
/// Request body:
/// ```json
/// { "device": { "permissionGranted": true, "latitude": 52.52, "longitude": 13.40 } }
/// ```
async fn use_current_location(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<DeviceLocationRequest>,
) -> impl Responder {
    let user_id = path.into_inner();
    let device = state.devices.device_with_report(&user_id, Some(req.device)).await;
    let resolver = state.resolver_for(&user_id, device);

    match resolver.use_current_location().await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => {
            tracing::info!("Could not switch {} to current location: {}", user_id, e);
            discovery_error_response(&e)
        }
    }
}

/// Switch to a custom location
///
/// PUT /api/v1/users/{user_id}/location/custom
///
/// Request body (both fields optional):
/// ```json
/// { "placeId": "string", "description": "Paris, France" }
/// ```
async fn use_custom_location(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: Option<web::Json<CustomLocationRequest>>,
) -> impl Responder {
    let user_id = path.into_inner();
    let req = req.map(|r| r.into_inner()).unwrap_or_default();

    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let device = state.devices.device(&user_id).await;
    let resolver = state.resolver_for(&user_id, device);

    let Some(place_id) = req.place_id else {
        return HttpResponse::Ok().json(resolver.use_custom_location().await);
    };

    let point = match state.places.place_location(&place_id).await {
        Ok(Some(point)) => point,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "place_not_found",
                format!("No coordinates for place {}", place_id),
            )
        }
        Err(e) => {
            tracing::error!("Failed to look up place {}: {}", place_id, e);
            return discovery_error_response(&DiscoveryError::from(e));
        }
    };

    let description = req
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| "Custom Location".to_string());

    HttpResponse::Ok().json(resolver.set_custom_location(point, &description).await)
}

/// City suggestions for the location picker
///
/// GET /api/v1/places/autocomplete?input=par
async fn autocomplete(
    state: web::Data<AppState>,
    query: web::Query<AutocompleteQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    match state.places.autocomplete_cities(&query.input).await {
        Ok(predictions) => HttpResponse::Ok().json(serde_json::json!({
            "predictions": predictions,
        })),
        Err(e) => {
            tracing::error!("Autocomplete failed for {:?}: {}", query.input, e);
            discovery_error_response(&DiscoveryError::from(e))
        }
    }
}

/// Path of the photo proxy for one reference
fn photo_path(reference: &str, max_width: u32) -> String {
    format!(
        "/api/v1/places/photos/{}?maxwidth={}",
        urlencoding::encode(reference),
        max_width
    )
}

/// Restaurant details with photo URLs served through this API
///
/// GET /api/v1/places/{place_id}
async fn place_details(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let place_id = path.into_inner();

    match state.places.place_details(&place_id).await {
        Ok(Some(details)) => {
            let photo_urls = details
                .photo_references
                .iter()
                .map(|r| photo_path(r, DETAIL_PHOTO_WIDTH))
                .collect();
            HttpResponse::Ok().json(PlaceDetailsResponse { details, photo_urls })
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            "place_not_found",
            format!("No details for place {}", place_id),
        ),
        Err(e) => {
            tracing::error!("Failed to fetch details for {}: {}", place_id, e);
            discovery_error_response(&DiscoveryError::from(e))
        }
    }
}

/// Restaurant photo, fetched upstream with the server key
///
/// GET /api/v1/places/photos/{reference}?maxwidth=800
async fn place_photo(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PhotoQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let reference = path.into_inner();
    let max_width = query.max_width.unwrap_or(DETAIL_PHOTO_WIDTH);

    match state.places.fetch_photo(&reference, max_width).await {
        Ok(photo) => HttpResponse::Ok()
            .content_type(photo.content_type)
            .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
            .body(photo.data),
        Err(e) => {
            tracing::error!("Failed to fetch photo {}: {}", reference, e);
            discovery_error_response(&DiscoveryError::from(e))
        }
    }
}
