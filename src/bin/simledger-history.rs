#![forbid(unsafe_code)]
//! Print the stored chain as a table

use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use simledger::cli::{format_timestamp, inspect_blockchain, open_blockchain, short_hash};
use simledger::config::load_config;

const LOGO: &str = r#"
╔═══════════════════════════════════════════════════════════════╗
║                 ⛓️  SimLedger Chain History ⛓️                 ║
╚═══════════════════════════════════════════════════════════════╝
"#;

/// Longest payload shown in full before truncation
const PAYLOAD_PREVIEW: usize = 24;

#[derive(Parser, Debug)]
#[command(name = "simledger-history", about = "Show every block in the ledger")]
struct Args {
    /// Re-verify every hash and link before printing
    #[arg(long)]
    verify: bool,

    /// Show newest blocks first
    #[arg(long)]
    newest_first: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    println!("{}", LOGO.bright_magenta());

    let config = load_config()?;
    let chain = if args.verify {
        inspect_blockchain(&config)?
    } else {
        open_blockchain(&config)?
    };

    println!("{}", format!("📁 Store: {}", config.database.path).cyan());
    println!(
        "{}",
        format!("🔐 Access policy: {}", chain.access_policy()).cyan()
    );
    println!();

    if args.verify {
        match chain.integrity_fault() {
            None => println!("{}", "✅ Chain verified: every hash and link is intact".green()),
            Some(fault) => {
                println!("{}", format!("❌ Chain verification failed: {}", fault).red().bold());
                println!();
            }
        }
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Index")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Hash")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Previous")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Txs")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Payloads")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Date")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
        ]);

    let mut blocks: Vec<_> = chain.blocks().iter().collect();
    if args.newest_first {
        blocks.reverse();
    }

    let mut tx_count = 0;
    for block in blocks {
        tx_count += block.transactions.len();
        let color = if block.is_genesis() {
            TableColor::Magenta
        } else {
            TableColor::White
        };

        let payloads = block
            .transactions
            .iter()
            .map(|tx| {
                let s = tx.as_str();
                if s.chars().count() > PAYLOAD_PREVIEW {
                    let head: String = s.chars().take(PAYLOAD_PREVIEW - 3).collect();
                    format!("{}...", head)
                } else {
                    s.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        table.add_row(vec![
            Cell::new(format!("#{}", block.index)).fg(color),
            Cell::new(short_hash(&block.hash_str())).fg(TableColor::Yellow),
            Cell::new(short_hash(&hex::encode(block.previous_hash))).fg(TableColor::Grey),
            Cell::new(block.transactions.len()).fg(color),
            Cell::new(payloads).fg(TableColor::White),
            Cell::new(format_timestamp(block.timestamp)).fg(TableColor::Grey),
        ]);
    }

    println!("{}", table);
    println!();
    println!(
        "{}",
        format!(
            "📊 {} blocks, {} transactions",
            chain.chain_length(),
            tx_count
        )
        .bright_blue()
        .bold()
    );

    Ok(())
}
