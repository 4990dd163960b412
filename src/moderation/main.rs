//! Standalone moderation tool for listings whose address was not verified.
//!
//! Lists the moderation queue of a listing store and approves or rejects
//! entries. Approved listings become visible to renters; rejected ones are
//! removed.

use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rental_listing_bot::listings::{JsonListingStore, Listing, ListingId, ListingStore};

/// Address moderation tool.
#[derive(Parser, Debug)]
#[command(name = "listing_moderation")]
#[command(about = "Reviews listings sent for address moderation")]
#[command(version)]
struct Args {
    /// Path to the listings JSON store.
    #[arg(short, long, default_value = "listings.json")]
    file: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show listings waiting for review.
    List {
        /// Show description and photo count for each listing.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Accept the typed address and publish the listing.
    Approve {
        /// Listing ID.
        id: ListingId,
    },

    /// Delete the listing.
    Reject {
        /// Listing ID.
        id: ListingId,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if !Path::new(&args.file).exists() {
        eprintln!("✗ Listing store not found: {}", args.file);
        return ExitCode::FAILURE;
    }

    let store = match JsonListingStore::open(&args.file).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("✗ Failed to load listing store: {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Command::List { verbose } => list_pending(&store, verbose).await,
        Command::Approve { id } => match store.approve(id).await {
            Ok(listing) => {
                println!("✓ Listing {} approved: {}", listing.id, listing.address);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("✗ Failed to approve listing {id}: {e}");
                ExitCode::FAILURE
            }
        },
        Command::Reject { id } => match store.reject(id).await {
            Ok(listing) => {
                println!("✓ Listing {} rejected and removed", listing.id);
                println!("  Owner to notify: tg://user?id={}", listing.owner_id);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("✗ Failed to reject listing {id}: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn list_pending(store: &JsonListingStore, verbose: bool) -> ExitCode {
    let pending = match store.pending_review().await {
        Ok(pending) => pending,
        Err(e) => {
            eprintln!("✗ Failed to read moderation queue: {e}");
            return ExitCode::FAILURE;
        }
    };

    if pending.is_empty() {
        println!("✓ No listings are waiting for moderation.");
        return ExitCode::SUCCESS;
    }

    println!("{} listing(s) waiting for moderation:\n", pending.len());
    for listing in &pending {
        print_listing(listing, verbose);
    }
    ExitCode::SUCCESS
}

fn print_listing(listing: &Listing, verbose: bool) {
    println!(
        "[{}] {} (owner {}, submitted {})",
        listing.id,
        listing.address,
        listing.owner_id,
        listing.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    if verbose {
        println!(
            "  {} rooms, floor {}, {} RUB, {} photo(s)",
            listing.rooms,
            listing.storey,
            listing.price,
            listing.photos.len()
        );
        println!("  \"{}\"", truncate(&listing.description, 60));
    }
}

/// Truncates a string for display.
fn truncate(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", chars[..max_len].iter().collect::<String>())
    }
}
