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

//! Library errors.

use std::error::Error;
use std::fmt;

/// Cause of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocnumErrorKind {
    /// General failure. See message for details.
    Unspecified,
    /// Connectivity related problem. See message for details.
    Connection,
    /// The record could not be found.
    NotFound,
    /// The input is not in the expected format.
    Malformed,
    /// A write would have violated a uniqueness constraint.
    ///
    /// See [DocnumError::columns] for the columns covered by the constraint.
    UniqueViolation,
    /// The operation was cancelled before it completed.
    Cancelled,
}

impl DocnumErrorKind {
    /// Create a new instance with an error message.
    pub fn error_with_msg<S: AsRef<str>>(self, msg: S) -> DocnumError {
        DocnumError {
            kind: self,
            msg: Some(msg.as_ref().to_string()),
            columns: Vec::new(),
        }
    }

    /// Create a new instance without an error message.
    pub fn error(self) -> DocnumError {
        DocnumError {
            kind: self,
            msg: None,
            columns: Vec::new(),
        }
    }
}

impl fmt::Display for DocnumErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/** Library error.

Create a new instance via [DocnumErrorKind] or, for uniqueness constraint
violations, via [DocnumError::unique_violation].
*/
#[derive(Debug)]
pub struct DocnumError {
    kind: DocnumErrorKind,
    msg: Option<String>,
    columns: Vec<String>,
}

impl DocnumError {
    /// Return a [DocnumErrorKind::UniqueViolation] of the constraint covering
    /// `columns`.
    pub fn unique_violation<C, S>(columns: C, msg: S) -> Self
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        S: AsRef<str>,
    {
        Self {
            kind: DocnumErrorKind::UniqueViolation,
            msg: Some(msg.as_ref().to_string()),
            columns: columns
                .into_iter()
                .map(|column| column.as_ref().to_string())
                .collect(),
        }
    }

    /// Return the type of error.
    pub fn kind(&self) -> &DocnumErrorKind {
        &self.kind
    }

    /// Return the columns of the violated uniqueness constraint.
    ///
    /// Empty for all other kinds of errors.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Return `true` if this is a uniqueness violation of a constraint that
    /// includes `column`.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        self.kind == DocnumErrorKind::UniqueViolation
            && self.columns.iter().any(|c| c == column)
    }
}

impl fmt::Display for DocnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.msg, self.columns.is_empty()) {
            (Some(msg), true) => write!(f, "{} {}", self.kind, msg),
            (Some(msg), false) => {
                write!(f, "{} ({}) {}", self.kind, self.columns.join(", "), msg)
            }
            (None, true) => write!(f, "{}", self.kind),
            (None, false) => write!(f, "{} ({})", self.kind, self.columns.join(", ")),
        }
    }
}

impl AsRef<DocnumError> for DocnumError {
    fn as_ref(&self) -> &DocnumError {
        self
    }
}

impl Error for DocnumError {}

#[cfg(test)]
mod test {
    //! Error formatting and classification tests.

    use super::*;

    #[test]
    fn test_unique_violation_columns() {
        let e = DocnumError::unique_violation(["tenant_id", "sequence", "code"], "code 7 taken");
        assert_eq!(e.kind(), &DocnumErrorKind::UniqueViolation);
        assert!(e.is_unique_violation_on("code"));
        assert!(!e.is_unique_violation_on("external_ref"));
        assert_eq!(
            e.to_string(),
            "UniqueViolation (tenant_id, sequence, code) code 7 taken"
        );
    }

    #[test]
    fn test_other_kinds_have_no_columns() {
        let e = DocnumErrorKind::NotFound.error_with_msg("no record");
        assert!(e.columns().is_empty());
        assert!(!e.is_unique_violation_on("code"));
        assert_eq!(e.to_string(), "NotFound no record");
        assert_eq!(DocnumErrorKind::Cancelled.error().to_string(), "Cancelled");
    }
}
