//! `daycoach parse` — Split raw model output into a message and code blocks.

use daycoach_assistant::{format_for_display, parse_response};
use std::io::Read;

pub fn run(path: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {path}: {e}"))?
    };

    let response = parse_response(&raw);
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", format_for_display(&response));
        eprintln!();
        eprintln!("  {} code block(s)", response.code_block_count());
    }
    Ok(())
}
