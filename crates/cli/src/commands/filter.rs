//! `daycoach filter` — Run the content filter over a message.

use daycoach_config::AppConfig;
use daycoach_core::locale::Locale;
use daycoach_security::ContentFilter;

pub fn run(
    text: &str,
    locale: &str,
    max_length: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let max_length = match max_length {
        Some(limit) => limit,
        None => AppConfig::load()?.filter.max_length,
    };

    let result = ContentFilter::new(max_length).check(text, Locale::from_code(locale));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
