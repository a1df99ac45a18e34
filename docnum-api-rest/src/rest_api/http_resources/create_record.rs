/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! API resource for creating a document with the next free code.

use crate::rest_api::AppState;
use crate::rest_api::common::ApiErrorMapper;
use crate::rest_api::common::CreateRecordRequest;
use crate::rest_api::common::RecordResponse;
use actix_web::Error;
use actix_web::HttpResponse;
use actix_web::error;
use actix_web::http::StatusCode;
use actix_web::post;
use actix_web::web::Bytes;
use actix_web::web::Data;
use actix_web::web::Path;
use actix_web::web::PayloadConfig;
use docnum::CodeScope;

/// Limit payload size to 64 KiB.
pub const MAX_DOCUMENT_SIZE: usize = 64 * 1024;

/// Body extraction limits of this resource.
pub fn payload_config() -> PayloadConfig {
    PayloadConfig::new(MAX_DOCUMENT_SIZE)
}

/// Create a document with the next free code of the tenant's numbering scheme.
#[utoipa::path(
    tag = "records",
    params(
        ("tenant_id", description = "Tenant identifier."),
        ("sequence", description = "Numbering scheme, e.g. `sales_order`."),
    ),
    request_body(
        content = CreateRecordRequest,
        description = "Optional business data. An empty body is allowed.",
        content_type = "application/json",
    ),
    responses(
        (status = 201, description = "Created.", body = RecordResponse),
        (status = 400, description = "Bad Request. Malformed or larger than 64 KiB."),
        (status = 409, description = "Conflict. The code could not be assigned or the reference is taken."),
        (status = 500, description = "Internal server error."),
    ),
)]
#[post("/tenants/{tenant_id}/sequences/{sequence}/records")]
pub async fn create_record(
    app_state: Data<AppState>,
    path: Path<(String, String)>,
    body: Result<Bytes, Error>,
) -> Result<HttpResponse, Error> {
    let (tenant_id, sequence) = path.into_inner();
    let scope = CodeScope::new(&tenant_id, &sequence).map_err(ApiErrorMapper::from_error)?;
    let body = body.map_err(|e| error::ErrorBadRequest(format!("Unreadable request body: {e}")))?;
    let request = parse_request(&body)?;
    let record = app_state
        .numbering
        .create(&scope, request.into())
        .await
        .inspect_err(|e| log::info!("Creating document in '{scope}' failed: {e}"))
        .map_err(ApiErrorMapper::from_error)?;
    Ok(HttpResponse::build(StatusCode::CREATED).json(RecordResponse::from(record.as_ref())))
}

/// Parse the JSON body. A blank body creates a document without business data.
fn parse_request(body: &[u8]) -> Result<CreateRecordRequest, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateRecordRequest::default());
    }
    serde_json::from_slice::<CreateRecordRequest>(body)
        .map_err(|e| error::ErrorBadRequest(format!("Malformed request body: {e}")))
}
