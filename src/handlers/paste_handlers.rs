//! Request dispatch targets for `/`: index page, upload and delete.
//!
//! - `GET /`    → pre-rendered index page
//! - `POST *`   → upload (multipart or urlencoded form)
//! - `DELETE /` → delete a paste; `DELETE` on any other path is a 400
//! - anything else → 400

use crate::{
    errors::PasteError,
    models::paste::PasteData,
    services::{
        cookie::paste_cookie,
        delete::{DeleteQuery, delete_paste},
        upload::{CONTENT_TYPE_HTML, FilePart, UploadForm, upload_paste},
    },
    state::AppState,
};
use axum::{
    Form,
    extract::{FromRequest, Multipart, OriginalUri, Query, Request, State, rejection::QueryRejection},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use rand::rngs::OsRng;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

/// Fields accepted from an urlencoded upload.
#[derive(Debug, Deserialize)]
struct UrlencodedUpload {
    content: Option<String>,
    syntax: Option<String>,
}

/// `GET /` — serve the index page rendered at startup.
pub async fn index(State(state): State<AppState>) -> Response {
    info!("Sending index page");
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_HTML))],
        state.index_html.clone(),
    )
        .into_response()
}

/// `POST` on any path — store a paste and redirect to its HTML view.
pub async fn upload(State(state): State<AppState>, request: Request) -> Result<Response, PasteError> {
    info!("Received request: POST {}", request.uri().path());

    let form = parse_upload_form(&state, request).await?;
    let input = form.into_input()?;
    let outcome = upload_paste(&state, input, &mut OsRng).await?;

    let mut response = (StatusCode::FOUND, [(header::LOCATION, outcome.html_url.clone())]).into_response();

    let data = PasteData::single(&outcome.keys, Utc::now());
    match paste_cookie(&data).map(|cookie| HeaderValue::from_str(&cookie.to_string())) {
        Ok(Ok(value)) => {
            response.headers_mut().append(header::SET_COOKIE, value);
            debug!("Set base64-encoded paste_data cookie");
        }
        Ok(Err(err)) => error!("Invalid paste_data cookie header: {}", err),
        Err(err) => error!("Failed to serialize paste data: {}", err),
    }

    debug!("Redirecting to URL: {}", outcome.html_url);
    Ok(response)
}

/// `DELETE /?raw=&html=&key=`
pub async fn delete(
    State(state): State<AppState>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<StatusCode, PasteError> {
    info!("Received request: DELETE /");
    let Query(query) = query.map_err(|err| {
        warn!("Malformed delete query: {}", err);
        PasteError::client(err.to_string())
    })?;
    let request = query.into_request()?;
    delete_paste(state.store.as_ref(), &request).await?;
    Ok(StatusCode::OK)
}

/// `DELETE` on any path other than `/`.
pub async fn delete_elsewhere(OriginalUri(uri): OriginalUri) -> StatusCode {
    warn!("Invalid DELETE path: {}", uri.path());
    StatusCode::BAD_REQUEST
}

/// Any method without a handler.
pub async fn unsupported_method(method: Method) -> StatusCode {
    warn!("Unsupported request method: {}", method);
    StatusCode::BAD_REQUEST
}

/// Read the upload body under the configured size bound.
async fn parse_upload_form(state: &AppState, request: Request) -> Result<UploadForm, PasteError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state).await.map_err(|err| {
            warn!("Error parsing form: {}", err);
            PasteError::client(err.to_string())
        })?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<UrlencodedUpload>::from_request(request, state)
            .await
            .map_err(|err| {
                warn!("Error parsing form: {}", err);
                PasteError::client(err.to_string())
            })?;
        Ok(UploadForm {
            content: fields.content,
            syntax: fields.syntax,
            file: None,
        })
    } else {
        warn!("Unsupported upload content type: {:?}", content_type);
        Err(PasteError::client("unsupported content type"))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<UploadForm, PasteError> {
    let bad_part = |err: axum::extract::multipart::MultipartError| {
        warn!("Error parsing form: {}", err);
        PasteError::client(err.to_string())
    };

    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_part)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => form.content = Some(field.text().await.map_err(bad_part)?),
            "syntax" => form.syntax = Some(field.text().await.map_err(bad_part)?),
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_part)?;
                // a file input left empty arrives with no filename
                if !filename.is_empty() {
                    form.file = Some(FilePart {
                        filename,
                        content_type,
                        bytes,
                    });
                }
            }
            other => debug!("Ignoring form field {:?}", other),
        }
    }
    Ok(form)
}
