//! Dry run: list the workout emails the sync would pick up and show what
//! would be extracted from each, without touching Strava or read flags.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use workout_core::WorkoutTextExtractor;
use workout_sync::config::Config;
use workout_sync::imap_client::ImapClient;

#[derive(Parser)]
#[command(name = "inspect-mailbox")]
#[command(about = "Show how unread workout emails would be parsed")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "WORKOUT_SYNC_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Stop after this many emails
    #[arg(short = 'n', long, default_value_t = 10)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let extractor = WorkoutTextExtractor::new(config.workout_zone()?);

    println!("Connecting to {}...", config.imap.host);

    let mut client = ImapClient::connect(
        &config.imap.host,
        config.imap.port,
        &config.imap.username,
        &config.imap.password,
    )
    .await?;

    let uids = client
        .search_unseen_containing(&config.imap.mailbox, &config.workout.link_prefix)
        .await?;

    println!(
        "Found {} unread emails containing {}\n",
        uids.len(),
        config.workout.link_prefix
    );
    println!("{:-<80}", "");

    for uid in uids.into_iter().take(cli.limit) {
        let email = match client.fetch_message(&config.imap.mailbox, uid).await? {
            Some(email) => email,
            None => {
                println!("UID {}: no body returned", uid);
                continue;
            }
        };

        println!("UID {}: {}", uid, email.subject);
        match extractor.extract(&email.subject, &email.text_body) {
            Ok(record) => {
                println!("  Time:        {}", record.display_time());
                println!("  Offset:      {}", record.occurred_at.offset());
                println!("  Description: {:?}", record.description);
            }
            Err(e) => println!("  Not extractable: {}", e),
        }
        println!("{:-<80}", "");
    }

    client.logout().await?;

    Ok(())
}
