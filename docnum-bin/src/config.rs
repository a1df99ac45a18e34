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

//! Configuration parsing.

use docnum::RetryOptions;
use std::str::FromStr;

/// Return the address the HTTP server binds to.
pub fn bind_address() -> String {
    env_or_default("DOCNUM_BIND_ADDRESS", "0.0.0.0")
}

/// Return the port the HTTP server binds to.
pub fn bind_port() -> u16 {
    parse_or_default(&env_or_default("DOCNUM_BIND_PORT", "8080"), 8080)
}

/// Return how many times code assignment is retried on conflicts.
pub fn retry_options() -> RetryOptions {
    RetryOptions::with_max_retries(parse_or_default(
        &env_or_default(
            "DOCNUM_MAX_RETRIES",
            &RetryOptions::DEFAULT_MAX_RETRIES.to_string(),
        ),
        RetryOptions::DEFAULT_MAX_RETRIES,
    ))
}

/// Get environment variable by name or return a default value if the variable
/// isn't set.
fn env_or_default(name: &str, default_value: &str) -> String {
    std::env::var(name)
        .inspect_err(|_e| log::warn!("Missing env.{name} -> using default value '{default_value}'"))
        .unwrap_or(default_value.to_string())
}

/// Parse `value` or return `default_value` if it isn't valid.
fn parse_or_default<T: FromStr + std::fmt::Display>(value: &str, default_value: T) -> T {
    value
        .trim()
        .parse()
        .inspect_err(|_e| log::warn!("Invalid value '{value}' -> using default '{default_value}'"))
        .unwrap_or(default_value)
}
