// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::Parser;
use cmd::{Cli, run};
use std::process::ExitCode;

#[allow(clippy::print_stdout)]
fn print_response(json: &str) {
    println!("{}", json);
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();
    let response = run(&cli).await?;
    let json = serde_json::to_string_pretty(&response)?;

    print_response(&json);

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
