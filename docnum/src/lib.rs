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

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Per-tenant sequential document numbering.
//!
//! Document codes (order numbers, transfer numbers, invoice numbers, ...) are
//! assigned as the current maximum code of the tenant's numbering scheme plus
//! one. Concurrent writers are resolved by the store's uniqueness constraint
//! and [code_retry::SequentialCodeAssigner], which re-runs the losing writer
//! with the next attempt index.

pub mod code_retry;
mod docnum_error;
pub mod document_numbering;
pub mod record_store;
mod time;

pub use self::code_retry::RetryOptions;
pub use self::code_retry::with_code_retry;
pub use self::docnum_error::DocnumError;
pub use self::docnum_error::DocnumErrorKind;
pub use self::document_numbering::DocumentNumbering;
pub use self::document_numbering::NewDocument;
pub use self::record_store::CodeScope;
pub use self::record_store::LocalRecordStore;
pub use self::record_store::NumberedRecord;
pub use self::record_store::NumberedRecordStore;
