//! Inspect command handler
//!
//! Shows what the store currently holds for each expected group, without
//! polling. Useful to understand a failed verification.

use anyhow::Result;
use clap::Args;
use colored::*;
use logprobe_core::domain::{LogGroup, LogStream};
use logprobe_engine::{GroupClassifier, GroupLookup, LogStore};
use serde_json::json;
use std::process::ExitCode;

use super::RequestArgs;
use crate::config::{Config, OutputFormat};

/// Arguments of `logprobe inspect`
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Also list the streams of every group found
    #[arg(long)]
    pub streams: bool,
}

/// Groups listed for one lookup, with their streams when requested
struct Listing {
    lookup: GroupLookup,
    groups: Vec<(LogGroup, Vec<LogStream>)>,
}

/// Handle the inspect command
///
/// # Arguments
/// * `args` - Request flags
/// * `config` - The CLI configuration
pub async fn handle_inspect(args: InspectArgs, config: &Config) -> Result<ExitCode> {
    let request = args.request.to_request();
    request.validate()?;
    let store = config.engine.store(config.backend)?;

    let mut listings = Vec::new();
    for category in &request.categories {
        for lookup in GroupClassifier::lookups(&request, *category)? {
            listings.push(list(store.as_ref(), lookup, args.streams).await?);
        }
    }

    match config.format {
        OutputFormat::Text => listings.iter().for_each(print_listing),
        OutputFormat::Json => {
            let value: Vec<_> = listings
                .iter()
                .map(|listing| {
                    json!({
                        "expected": listing.lookup.name,
                        "category": listing.lookup.category,
                        "groups": listing.groups.iter().map(|(group, streams)| json!({
                            "group": group,
                            "streams": streams,
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn list(store: &dyn LogStore, lookup: GroupLookup, with_streams: bool) -> Result<Listing> {
    let mut groups = Vec::new();
    for group in store.list_groups(&lookup).await? {
        let streams = if with_streams {
            store.list_streams(&group, None).await?
        } else {
            Vec::new()
        };
        groups.push((group, streams));
    }
    Ok(Listing { lookup, groups })
}

fn print_listing(listing: &Listing) {
    println!(
        "{} {} ({})",
        "▸".cyan(),
        listing.lookup.name.bold(),
        listing.lookup.category
    );

    if listing.groups.is_empty() {
        println!("    {}", "no matching group".yellow());
    }
    for (group, streams) in &listing.groups {
        let marker = if group.name == listing.lookup.name {
            "exact".green()
        } else {
            "prefix match".yellow()
        };
        println!("    {} [{}]", group.name, marker);
        for stream in streams {
            match &stream.identity {
                Some(identity) => println!("      {} {}", stream.name.dimmed(), identity),
                None => println!("      {} {}", stream.name.dimmed(), "unrecognised".dimmed()),
            }
        }
    }
    println!();
}
