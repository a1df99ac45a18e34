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

//! Creation of documents with sequential per-tenant codes.

use crate::CodeScope;
use crate::DocnumError;
use crate::DocnumErrorKind;
use crate::RetryOptions;
use crate::code_retry::CODE_COLUMN;
use crate::code_retry::with_code_retry;
use crate::record_store::NewRecord;
use crate::record_store::NumberedRecord;
use crate::record_store::NumberedRecordStore;
use std::sync::Arc;

/// Business data of a document to create.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    /// Optional business reference, unique per tenant.
    pub external_ref: Option<String>,
    /// Opaque business payload.
    pub payload: Option<String>,
}

/// Assigns the next free code of a [CodeScope] to new documents.
pub struct DocumentNumbering {
    store: Arc<dyn NumberedRecordStore>,
    options: RetryOptions,
}

impl DocumentNumbering {
    /// Return a new instance.
    pub fn new(store: Arc<dyn NumberedRecordStore>, options: RetryOptions) -> Arc<Self> {
        Arc::new(Self { store, options })
    }

    /// Return the retry limits in use.
    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Return the code to propose on `attempt` when the highest known code is
    /// `last_code`.
    pub fn candidate_code(last_code: Option<u64>, attempt: u32) -> Result<u64, DocnumError> {
        last_code
            .unwrap_or(0)
            .checked_add(1)
            .and_then(|code| code.checked_add(u64::from(attempt)))
            .ok_or_else(|| DocnumErrorKind::Malformed.error_with_msg("Code space is exhausted."))
    }

    /// Create a document with the next free code of the scope.
    ///
    /// The highest code is read from the store on every attempt.
    pub async fn create(
        &self,
        scope: &CodeScope,
        document: NewDocument,
    ) -> Result<Arc<NumberedRecord>, DocnumError> {
        let res = with_code_retry(
            |attempt| {
                let document = document.clone();
                async move {
                    let last_code = self.store.max_code(scope).await?;
                    let code = Self::candidate_code(last_code, attempt)?;
                    self.store
                        .insert(NewRecord {
                            scope: scope.to_owned(),
                            code,
                            external_ref: document.external_ref,
                            payload: document.payload,
                        })
                        .await
                }
            },
            self.options,
        )
        .await;
        match &res {
            Ok(record) => {
                log::debug!(
                    "Assigned code {} to record {} in '{scope}'.",
                    record.code,
                    record.id
                );
            }
            Err(e) if e.is_unique_violation_on(CODE_COLUMN) => {
                log::info!(
                    "Gave up assigning a code in '{scope}' after {} attempts: {e}",
                    u64::from(self.options.max_retries) + 1
                );
            }
            Err(e) => {
                log::debug!("Failed to create document in '{scope}': {e}");
            }
        }
        res
    }

    /// Return the highest assigned code of the scope.
    pub async fn last_code(&self, scope: &CodeScope) -> Result<Option<u64>, DocnumError> {
        self.store.max_code(scope).await
    }

    /// Return the document with `code` in the scope.
    pub async fn get(
        &self,
        scope: &CodeScope,
        code: u64,
    ) -> Result<Arc<NumberedRecord>, DocnumError> {
        self.store.get(scope, code).await
    }

    /// Return all documents of the scope ordered by code.
    pub async fn list(&self, scope: &CodeScope) -> Result<Vec<Arc<NumberedRecord>>, DocnumError> {
        self.store.list(scope).await
    }
}

#[cfg(test)]
mod test {
    //! Document numbering tests.

    use super::*;
    use crate::LocalRecordStore;

    #[test]
    fn test_candidate_code() {
        assert_eq!(DocumentNumbering::candidate_code(None, 0).unwrap(), 1);
        assert_eq!(DocumentNumbering::candidate_code(Some(41), 0).unwrap(), 42);
        assert_eq!(DocumentNumbering::candidate_code(Some(41), 2).unwrap(), 44);
        assert_eq!(
            DocumentNumbering::candidate_code(Some(u64::MAX), 0)
                .unwrap_err()
                .kind(),
            &DocnumErrorKind::Malformed
        );
        assert!(DocumentNumbering::candidate_code(Some(u64::MAX - 1), 1).is_err());
    }

    #[tokio::test]
    async fn test_codes_are_sequential_per_scope() {
        let numbering = DocumentNumbering::new(LocalRecordStore::new(), RetryOptions::default());
        let orders = CodeScope::new("acme", "sales_order").unwrap();
        let transfers = CodeScope::new("acme", "stock_transfer").unwrap();
        for expected in 1..=3 {
            let record = numbering
                .create(&orders, NewDocument::default())
                .await
                .unwrap();
            assert_eq!(record.code, expected);
        }
        let record = numbering
            .create(
                &transfers,
                NewDocument {
                    external_ref: None,
                    payload: Some("{\"from\":\"A\",\"to\":\"B\"}".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(record.code, 1);
        assert_eq!(record.payload.as_deref(), Some("{\"from\":\"A\",\"to\":\"B\"}"));
        assert_eq!(numbering.last_code(&orders).await.unwrap(), Some(3));
        assert_eq!(numbering.get(&orders, 2).await.unwrap().code, 2);
        assert_eq!(numbering.list(&orders).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_code_space_is_malformed() {
        let store = LocalRecordStore::new();
        let scope = CodeScope::new("acme", "invoice").unwrap();
        store
            .insert(NewRecord {
                scope: scope.clone(),
                code: u64::MAX,
                external_ref: None,
                payload: None,
            })
            .await
            .unwrap();
        let numbering = DocumentNumbering::new(store, RetryOptions::default());
        let e = numbering
            .create(&scope, NewDocument::default())
            .await
            .unwrap_err();
        assert_eq!(e.kind(), &DocnumErrorKind::Malformed);
    }

    #[tokio::test]
    async fn test_duplicate_external_ref_fails() {
        let numbering = DocumentNumbering::new(LocalRecordStore::new(), RetryOptions::default());
        let invoices = CodeScope::new("acme", "invoice").unwrap();
        let document = NewDocument {
            external_ref: Some("NFE-3519".to_string()),
            payload: None,
        };
        numbering.create(&invoices, document.clone()).await.unwrap();
        let e = numbering.create(&invoices, document).await.unwrap_err();
        assert_eq!(e.kind(), &DocnumErrorKind::UniqueViolation);
        assert!(!e.is_unique_violation_on(CODE_COLUMN));
        assert_eq!(numbering.last_code(&invoices).await.unwrap(), Some(1));
    }
}
