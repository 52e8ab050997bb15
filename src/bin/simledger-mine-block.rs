#![forbid(unsafe_code)]
//! Submit transactions and mine them into the configured ledger store

use clap::Parser;
use colored::*;
use simledger::cli::{format_timestamp, load_blockchain_from_config, parse_caller_arg};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "simledger-mine-block", about = "Mine pending payloads into a new block")]
struct Args {
    /// Transaction payload to include; repeat for several
    #[arg(long = "tx", value_name = "PAYLOAD")]
    transactions: Vec<String>,

    /// Caller address (64 hex chars); omitted means the anonymous caller
    #[arg(long)]
    caller: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let caller = parse_caller_arg(args.caller.as_deref())?;

    let (_config, mut chain) = load_blockchain_from_config()?;

    for payload in args.transactions {
        chain.add_transaction(&caller, payload)?;
    }

    let new_index = chain.chain_length();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!(
        "║              ⛏️  MINING BLOCK {:<32}║",
        new_index
    );
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    let start_time = Instant::now();
    let block = chain.mine_block(&caller)?;
    let elapsed = start_time.elapsed();

    println!("{}", "✅ Block mined and saved".bright_green().bold());
    println!("   Index:         {}", block.index.to_string().bright_white());
    println!("   Hash:          {}", block.hash_str().bright_yellow());
    println!("   Previous hash: {}", hex::encode(block.previous_hash));
    println!("   Timestamp:     {}", format_timestamp(block.timestamp));
    println!("   Transactions:  {}", block.transactions.len());
    for tx in &block.transactions {
        println!("     - {}", tx.as_str().cyan());
    }
    println!("   Took:          {:.2?}", elapsed);
    println!(
        "\n{}",
        format!("⛓️  Chain length is now {}", chain.chain_length()).bright_cyan()
    );

    Ok(())
}
