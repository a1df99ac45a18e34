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

//! JSON representations of requests and responses.

use docnum::NewDocument;
use docnum::NumberedRecord;
use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;

/// Request to create a document.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateRecordRequest {
    /// Optional business reference. Unique per tenant.
    #[serde(default)]
    pub external_ref: Option<String>,
    /// Opaque business payload.
    #[serde(default)]
    pub payload: Option<String>,
}

impl From<CreateRecordRequest> for NewDocument {
    fn from(value: CreateRecordRequest) -> Self {
        Self {
            external_ref: value.external_ref,
            payload: value.payload,
        }
    }
}

/// A document with its assigned code.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RecordResponse {
    /// Store assigned identifier.
    pub id: u64,
    /// Tenant identifier.
    pub tenant_id: String,
    /// Numbering scheme.
    pub sequence: String,
    /// Sequential code, unique per tenant and numbering scheme.
    pub code: u64,
    /// Business reference.
    pub external_ref: Option<String>,
    /// Opaque business payload.
    pub payload: Option<String>,
    /// Time of creation in epoch microseconds.
    pub created_micros: u64,
}

impl From<&NumberedRecord> for RecordResponse {
    fn from(value: &NumberedRecord) -> Self {
        Self {
            id: value.id,
            tenant_id: value.scope.tenant_id().to_string(),
            sequence: value.scope.sequence().to_string(),
            code: value.code,
            external_ref: value.external_ref.to_owned(),
            payload: value.payload.to_owned(),
            created_micros: value.created_micros,
        }
    }
}

/// Highest assigned code of a numbering scheme.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LastCodeResponse {
    /// `null` when no code has been assigned yet.
    pub code: Option<u64>,
}
