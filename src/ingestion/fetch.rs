use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::Client;
use rss::{Channel, Item};

use crate::parsing::FeedEntry;

pub async fn fetch_feed(client: &Client, url: &str) -> Result<Bytes> {
    let resp = client.get(url).send().await.with_context(|| format!("GET {url}"))?;
    let resp = resp.error_for_status().with_context(|| format!("GET {url}"))?;
    let bytes = resp.bytes().await.with_context(|| format!("read body of {url}"))?;
    Ok(bytes)
}

pub fn parse_entries(xml: &[u8]) -> Result<Vec<FeedEntry>> {
    let channel = Channel::read_from(xml).context("parse rss channel")?;
    Ok(channel.items().iter().map(to_entry).collect())
}

fn to_entry(item: &Item) -> FeedEntry {
    // some feeds only carry a Dublin Core date
    let published = item
        .pub_date()
        .map(str::to_string)
        .or_else(|| item.dublin_core_ext().and_then(|dc| dc.dates().first().cloned()));
    FeedEntry {
        title: item.title().map(str::to_string),
        link: item.link().map(str::to_string),
        description: item.description().map(str::to_string),
        published,
    }
}
