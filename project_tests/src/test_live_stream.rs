//! # Live Stream Diagnostic
//!
//! Connects to the real Jetstream, runs every post through the extractor and
//! prints what it finds. Nothing is sent downstream.

use std::time::{Duration, Instant};

use clap::Parser;
use futures_util::StreamExt;
use lib_paperstream::configs::pipeline_config::{DEFAULT_STREAM_URL, POST_COLLECTION};
use lib_paperstream::{Category, EventProcessor};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

#[derive(Parser)]
#[clap(about = "Print links extracted from the live Bluesky firehose")]
struct Args {
    #[clap(long, default_value = DEFAULT_STREAM_URL)]
    url: String,

    #[clap(long, default_value_t = 30, help = "Seconds to listen before exiting.")]
    seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    println!("[*] Connecting to {}", args.url);
    let (ws_stream, _) = connect_async(args.url.as_str()).await?;
    let (_write, mut read) = ws_stream.split();

    let processor = EventProcessor::new(POST_COLLECTION);
    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let (mut posts, mut hits) = (0u64, 0u64);

    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let frame = match tokio::time::timeout(remaining, read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => text,
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(e))) => {
                eprintln!("[ERROR] {}", e);
                break;
            }
            Ok(None) | Err(_) => break,
        };

        let Ok(event) = processor.decode(frame.as_str()) else { continue };
        let Some(post) = processor.qualify(&event) else { continue };
        posts += 1;

        let extraction = post.extract();
        for category in Category::ALL {
            for entity in extraction.get(category) {
                hits += 1;
                println!("{:<14} {:<48} {}", category, entity.canonical_id, post.post_uri);
            }
        }
        if let Some(quoted) = &post.quoted_post_uri {
            if !extraction.is_empty() {
                println!("{:<14} quotes {}", "", quoted);
            }
        }
    }

    println!("-----------------------------------------------");
    println!("[INFO] {} posts, {} entities in {}s", posts, hits, args.seconds);
    Ok(())
}
