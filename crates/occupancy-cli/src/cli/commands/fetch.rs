//! One-shot fetch command, for checking the page and the parser

use crate::client::{FetchOptions, WebDriverFetcher};
use crate::error::Result;
use crate::models::LOCATIONS;
use crate::parse;

/// Fetch and parse the page once without touching any store. With `raw`
/// the unparsed body text is printed instead.
pub async fn fetch(webdriver_url: String, fetch_options: FetchOptions, raw: bool) -> Result<()> {
    let fetcher = WebDriverFetcher::new(&webdriver_url, fetch_options);
    let content = fetcher.fetch_page().await?;

    if raw {
        println!("{content}");
        return Ok(());
    }

    let reading = parse::parse_reading(&content, parse::facility_now())?;
    println!("{}", reading.timestamp_text());
    for (location, level) in LOCATIONS.iter().zip(reading.levels) {
        println!("{location:<20} {level:>3}%");
    }
    Ok(())
}
