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

//! API resource for retrieving a document by code.

use crate::rest_api::AppState;
use crate::rest_api::common::ApiErrorMapper;
use crate::rest_api::common::RecordResponse;
use actix_web::Error;
use actix_web::HttpResponse;
use actix_web::get;
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::web::Path;
use docnum::CodeScope;

/// Retrieve a document by its code.
#[utoipa::path(
    tag = "records",
    params(
        ("tenant_id", description = "Tenant identifier."),
        ("sequence", description = "Numbering scheme, e.g. `sales_order`."),
        ("code", description = "Sequential code of the document."),
    ),
    responses(
        (status = 200, description = "Return the document.", body = RecordResponse),
        (status = 400, description = "Bad Request."),
        (status = 404, description = "No document with the code was found."),
        (status = 500, description = "Internal server error."),
    ),
)]
#[get("/tenants/{tenant_id}/sequences/{sequence}/records/{code}")]
pub async fn get_record(
    app_state: Data<AppState>,
    path: Path<(String, String, u64)>,
) -> Result<HttpResponse, Error> {
    let (tenant_id, sequence, code) = path.into_inner();
    let scope = CodeScope::new(&tenant_id, &sequence).map_err(ApiErrorMapper::from_error)?;
    let record = app_state
        .numbering
        .get(&scope, code)
        .await
        .map_err(ApiErrorMapper::from_error)?;
    Ok(HttpResponse::build(StatusCode::OK).json(RecordResponse::from(record.as_ref())))
}
