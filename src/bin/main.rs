#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "SimLedger CLI".bright_cyan().bold());
    println!("{}", "-------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but most functionality is in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!(
        "  - {}  {}",
        "simledger-node".bright_white(),
        "run the ledger node and REST API".dimmed()
    );
    println!(
        "  - {}  {}",
        "simledger-mine-block".bright_white(),
        "submit payloads and mine them into the local store".dimmed()
    );
    println!(
        "  - {}  {}",
        "simledger-history".bright_white(),
        "print the stored chain, optionally verifying it".dimmed()
    );
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!(
        "{}",
        "  cargo run --bin simledger-mine-block -- --tx A --tx B".italic()
    );
}
