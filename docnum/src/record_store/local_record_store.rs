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

//! Lock-free in-memory record store.

use super::CodeScope;
use super::EXTERNAL_REF_COLUMN;
use super::NewRecord;
use super::NumberedRecord;
use super::NumberedRecordStore;
use super::SEQUENCE_COLUMN;
use super::TENANT_ID_COLUMN;
use crate::DocnumError;
use crate::DocnumErrorKind;
use crate::code_retry::CODE_COLUMN;
use async_trait::async_trait;
use crossbeam_skiplist::SkipMap;
use crossbeam_skiplist::map::Entry;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/** Lock-free in-memory implementation of [NumberedRecordStore].

Uniqueness of `(scope, code)` and `(tenant_id, external_ref)` is enforced
by [SkipMap::get_or_insert]: the insert that ends up owning the entry is the
one whose value is present in the map afterwards. A record is only published
under its code once every other constraint holds.
*/
#[derive(Default)]
pub struct LocalRecordStore {
    last_id: AtomicU64,
    records_by_scope_and_code: SkipMap<(CodeScope, u64), Arc<NumberedRecord>>,
    record_id_by_tenant_and_external_ref: SkipMap<(String, String), u64>,
}

impl LocalRecordStore {
    /// Return a new instance.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Return a fresh record identifier.
    fn next_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Claim the external reference for the record or fail if another record
    /// of the same tenant already holds it.
    ///
    /// Returns the claimed entry so that the claim can be released if the
    /// record is rejected for other reasons.
    fn claim_external_ref(
        &self,
        record: &NumberedRecord,
    ) -> Result<Option<Entry<'_, (String, String), u64>>, DocnumError> {
        let Some(external_ref) = &record.external_ref else {
            return Ok(None);
        };
        let entry = self.record_id_by_tenant_and_external_ref.get_or_insert(
            (record.scope.tenant_id().to_string(), external_ref.to_owned()),
            record.id,
        );
        if *entry.value() != record.id {
            return Err(DocnumError::unique_violation(
                [TENANT_ID_COLUMN, EXTERNAL_REF_COLUMN],
                format!(
                    "Reference '{external_ref}' is already used by tenant '{}'.",
                    record.scope.tenant_id()
                ),
            ));
        }
        Ok(Some(entry))
    }
}

#[async_trait]
impl NumberedRecordStore for LocalRecordStore {
    async fn max_code(&self, scope: &CodeScope) -> Result<Option<u64>, DocnumError> {
        Ok(self
            .records_by_scope_and_code
            .upper_bound(Bound::Included(&(scope.to_owned(), u64::MAX)))
            .filter(|entry| &entry.key().0 == scope)
            .map(|entry| entry.key().1))
    }

    async fn insert(&self, record: NewRecord) -> Result<Arc<NumberedRecord>, DocnumError> {
        if record.code == 0 {
            return Err(DocnumErrorKind::Malformed.error_with_msg("Codes start at 1."));
        }
        let new_record = Arc::new(NumberedRecord {
            id: self.next_id(),
            scope: record.scope,
            code: record.code,
            external_ref: record.external_ref,
            payload: record.payload,
            created_micros: crate::time::get_timestamp_micros(),
        });
        // The reference claim is not observable through the store, so it is
        // taken before the record becomes visible under its code.
        let external_ref_claim = self.claim_external_ref(&new_record)?;
        let entry = self.records_by_scope_and_code.get_or_insert(
            (new_record.scope.to_owned(), new_record.code),
            Arc::clone(&new_record),
        );
        if !Arc::ptr_eq(entry.value(), &new_record) {
            if let Some(claim) = external_ref_claim {
                claim.remove();
            }
            if log::log_enabled!(log::Level::Trace) {
                log::trace!(
                    "Code {} in '{}' was taken by record {}.",
                    new_record.code,
                    new_record.scope,
                    entry.value().id
                );
            }
            return Err(DocnumError::unique_violation(
                [TENANT_ID_COLUMN, SEQUENCE_COLUMN, CODE_COLUMN],
                format!(
                    "Code {} is already assigned in '{}'.",
                    new_record.code, new_record.scope
                ),
            ));
        }
        Ok(new_record)
    }

    async fn get(&self, scope: &CodeScope, code: u64) -> Result<Arc<NumberedRecord>, DocnumError> {
        self.records_by_scope_and_code
            .get(&(scope.to_owned(), code))
            .as_ref()
            .map(Entry::value)
            .map(Arc::clone)
            .ok_or_else(|| {
                DocnumErrorKind::NotFound.error_with_msg(format!("No code {code} in '{scope}'."))
            })
    }

    async fn list(&self, scope: &CodeScope) -> Result<Vec<Arc<NumberedRecord>>, DocnumError> {
        Ok(self
            .records_by_scope_and_code
            .range((scope.to_owned(), 0)..=(scope.to_owned(), u64::MAX))
            .map(|entry| Arc::clone(entry.value()))
            .collect())
    }
}
