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

//! REST API CLI for Docnum.

use reqwest::StatusCode;
use std::collections::HashSet;
use std::process::ExitCode;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Basic CLI for creating documents and checking code assignment under load.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = init_logger() {
        println!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    let mut args = std::env::args();
    let cli_name = args.next().unwrap_or_default();
    match args.next().as_deref() {
        Some("create") => {
            if let Some(tenant_id) = args.next()
                && let Some(sequence) = args.next()
            {
                let base_url = args.next().unwrap_or(DEFAULT_BASE_URL.to_string());
                let client = reqwest::Client::new();
                if let Some(code) = create_record(&client, &base_url, &tenant_id, &sequence).await
                {
                    log::info!("Created document with code {code} in '{tenant_id}/{sequence}'.");
                    return ExitCode::SUCCESS;
                }
            }
        }
        Some("last") => {
            if let Some(tenant_id) = args.next()
                && let Some(sequence) = args.next()
            {
                let base_url = args.next().unwrap_or(DEFAULT_BASE_URL.to_string());
                if let Some(code) = get_last_code(&base_url, &tenant_id, &sequence).await {
                    match code {
                        Some(code) => log::info!("{code}"),
                        None => log::info!("No code has been assigned in '{tenant_id}/{sequence}'."),
                    }
                    return ExitCode::SUCCESS;
                }
            }
        }
        Some("load") => {
            if let Some(tenant_id) = args.next()
                && let Some(sequence) = args.next()
                && let Some(count) = args.next().and_then(|count| count.parse::<usize>().ok())
            {
                let base_url = args.next().unwrap_or(DEFAULT_BASE_URL.to_string());
                if run_load(&base_url, &tenant_id, &sequence, count).await {
                    return ExitCode::SUCCESS;
                }
            }
        }
        Some(_other) => {}
        None => {}
    }
    log::info!(
        "{cli_name} - Docnum REST CLI

Usage:
    {cli_name} create <tenant_id> <sequence> [base_url]
    {cli_name} last <tenant_id> <sequence> [base_url]
    {cli_name} load <tenant_id> <sequence> <count> [base_url]

Example
    {cli_name} create acme sales_order {DEFAULT_BASE_URL}
    "
    );
    ExitCode::FAILURE
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .filter(Some("hyper_util"), log::LevelFilter::Info)
        .filter(Some("reqwest"), log::LevelFilter::Info)
        .write_style(env_logger::fmt::WriteStyle::Auto)
        .target(env_logger::fmt::Target::Stdout)
        .is_test(false)
        .parse_env(
            env_logger::Env::new()
                .filter("LOG_LEVEL")
                .write_style("LOG_STYLE"),
        )
        .try_init()
}

/// Invoke REST API to create a document and return its code.
pub async fn create_record(
    client: &reqwest::Client,
    base_url: &str,
    tenant_id: &str,
    sequence: &str,
) -> Option<u64> {
    let url = format!("{base_url}/api/v1/tenants/{tenant_id}/sequences/{sequence}/records");
    if log::log_enabled!(log::Level::Debug) {
        log::debug!("POST '{url}'");
    }
    match client.post(&url).send().await {
        Ok(response) => match response.status() {
            StatusCode::CREATED => {
                return response
                    .text()
                    .await
                    .inspect_err(|e| log::warn!("Failed reading response from '{url}': {e}"))
                    .ok()
                    .and_then(|body| parse_code(&body));
            }
            StatusCode::CONFLICT => {
                log::info!("Code assignment conflict at '{url}'. Please retry.");
            }
            _other_status => {
                log::info!("Unexpected response status from '{url}': {response:?}");
            }
        },
        Err(e) => {
            log::warn!("Request to '{url}' failed: {e}");
        }
    }
    None
}

/// Invoke REST API and return the highest assigned code.
pub async fn get_last_code(base_url: &str, tenant_id: &str, sequence: &str) -> Option<Option<u64>> {
    let url = format!("{base_url}/api/v1/tenants/{tenant_id}/sequences/{sequence}/last");
    if log::log_enabled!(log::Level::Debug) {
        log::debug!("GET '{url}'");
    }
    match reqwest::get(&url).await {
        Ok(response) => match response.status() {
            StatusCode::OK => {
                return response
                    .text()
                    .await
                    .inspect_err(|e| log::warn!("Failed reading response from '{url}': {e}"))
                    .ok()
                    .map(|body| parse_code(&body));
            }
            _other_status => {
                log::info!("Unexpected response status from '{url}': {response:?}");
            }
        },
        Err(e) => {
            log::warn!("Request to '{url}' failed: {e}");
        }
    }
    None
}

/// Create `count` documents concurrently and verify that all assigned codes
/// are distinct.
async fn run_load(base_url: &str, tenant_id: &str, sequence: &str, count: usize) -> bool {
    let client = reqwest::Client::new();
    let mut join_set = tokio::task::JoinSet::new();
    for _ in 0..count {
        let client = client.clone();
        let base_url = base_url.to_string();
        let tenant_id = tenant_id.to_string();
        let sequence = sequence.to_string();
        join_set.spawn(async move {
            create_record(&client, &base_url, &tenant_id, &sequence).await
        });
    }
    let mut codes = HashSet::with_capacity(count);
    let mut failures = 0;
    let mut duplicates = 0;
    while let Some(res) = join_set.join_next().await {
        match res.ok().flatten() {
            Some(code) => {
                if !codes.insert(code) {
                    log::warn!("Code {code} was assigned more than once.");
                    duplicates += 1;
                }
            }
            None => failures += 1,
        }
    }
    log::info!(
        "Created {} documents with distinct codes in '{tenant_id}/{sequence}'. Failed: {failures}. Duplicates: {duplicates}.",
        codes.len()
    );
    duplicates == 0
}

/// Extract the `code` field from a JSON response body.
fn parse_code(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .inspect_err(|e| log::warn!("Response was not JSON: {e}"))
        .ok()
        .and_then(|value| value.get("code").and_then(serde_json::Value::as_u64))
}
