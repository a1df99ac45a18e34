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

//! Storage of numbered records.
//!
//! The store owns the uniqueness constraint that sequential code assignment
//! coordinates through. Implementations must reject a second record with the
//! same code in the same [CodeScope] atomically.

mod local_record_store;

pub use self::local_record_store::LocalRecordStore;

use crate::DocnumError;
use crate::DocnumErrorKind;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Name of the column holding the tenant identifier.
pub const TENANT_ID_COLUMN: &str = "tenant_id";
/// Name of the column holding the numbering scheme.
pub const SEQUENCE_COLUMN: &str = "sequence";
/// Name of the column holding the optional business reference.
pub const EXTERNAL_REF_COLUMN: &str = "external_ref";

/// Scope within which codes are unique: a tenant and one of its numbering
/// schemes (e.g. `sales_order` or `stock_transfer`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeScope {
    tenant_id: String,
    sequence: String,
}

impl CodeScope {
    /// Max length in bytes of the tenant identifier and the sequence name.
    pub const MAX_NAME_LEN: usize = 64;

    /// Return a new instance or [DocnumErrorKind::Malformed] if either name is
    /// empty, too long or contains other characters than ASCII alphanumerics,
    /// `-` and `_`.
    pub fn new(tenant_id: &str, sequence: &str) -> Result<Self, DocnumError> {
        Self::validate_name(TENANT_ID_COLUMN, tenant_id)?;
        Self::validate_name(SEQUENCE_COLUMN, sequence)?;
        Ok(Self {
            tenant_id: tenant_id.to_string(),
            sequence: sequence.to_string(),
        })
    }

    fn validate_name(field: &str, value: &str) -> Result<(), DocnumError> {
        if value.is_empty() || value.len() > Self::MAX_NAME_LEN {
            return Err(DocnumErrorKind::Malformed.error_with_msg(format!(
                "The {field} must be 1 to {} bytes long.",
                Self::MAX_NAME_LEN
            )));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DocnumErrorKind::Malformed.error_with_msg(format!(
                "The {field} '{value}' contains illegal characters."
            )));
        }
        Ok(())
    }

    /// Return the tenant identifier.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Return the name of the numbering scheme.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }
}

impl fmt::Display for CodeScope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.sequence)
    }
}

/// A persisted record with a sequential code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedRecord {
    /// Store assigned identifier.
    pub id: u64,
    /// Scope the code is unique within.
    pub scope: CodeScope,
    /// Sequential code. Always positive.
    pub code: u64,
    /// Optional business reference, unique per tenant.
    pub external_ref: Option<String>,
    /// Opaque business payload.
    pub payload: Option<String>,
    /// Time of creation in epoch microseconds.
    pub created_micros: u64,
}

/// A record to insert.
#[derive(Debug, Clone)]
pub struct NewRecord {
    /// Scope the code is unique within.
    pub scope: CodeScope,
    /// Candidate code.
    pub code: u64,
    /// Optional business reference, unique per tenant.
    pub external_ref: Option<String>,
    /// Opaque business payload.
    pub payload: Option<String>,
}

/// Persistence of [NumberedRecord]s.
#[async_trait]
pub trait NumberedRecordStore: Send + Sync {
    /// Return the highest code currently stored in the scope.
    async fn max_code(&self, scope: &CodeScope) -> Result<Option<u64>, DocnumError>;

    /// Atomically insert a new record.
    ///
    /// Fails with [DocnumErrorKind::UniqueViolation] covering
    /// `tenant_id, sequence, code` when the code is taken in the scope, and
    /// covering `tenant_id, external_ref` when the reference is taken by the
    /// tenant. A failed insert leaves nothing behind.
    async fn insert(&self, record: NewRecord) -> Result<Arc<NumberedRecord>, DocnumError>;

    /// Return the record with `code` in the scope.
    async fn get(&self, scope: &CodeScope, code: u64) -> Result<Arc<NumberedRecord>, DocnumError>;

    /// Return all records in the scope ordered by code.
    async fn list(&self, scope: &CodeScope) -> Result<Vec<Arc<NumberedRecord>>, DocnumError>;
}

#[cfg(test)]
mod test {
    //! Scope validation tests.

    use super::*;

    #[test]
    fn test_valid_scope() {
        let scope = CodeScope::new("acme-01", "sales_order").unwrap();
        assert_eq!(scope.tenant_id(), "acme-01");
        assert_eq!(scope.sequence(), "sales_order");
        assert_eq!(scope.to_string(), "acme-01/sales_order");
    }

    #[test]
    fn test_malformed_scope() {
        for (tenant_id, sequence) in [
            ("", "invoice"),
            ("acme", ""),
            ("acme/1", "invoice"),
            ("acme", "in voice"),
            ("acme", "fatura\u{e7}"),
        ] {
            let e = CodeScope::new(tenant_id, sequence).unwrap_err();
            assert_eq!(e.kind(), &DocnumErrorKind::Malformed, "{tenant_id}/{sequence}");
        }
        let too_long = "t".repeat(CodeScope::MAX_NAME_LEN + 1);
        assert!(CodeScope::new(&too_long, "invoice").is_err());
        assert!(CodeScope::new(&too_long[1..], "invoice").is_ok());
    }
}
