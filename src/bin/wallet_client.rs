//! Command-line client for the wallet gateway
//!
//! Run with: cargo run --bin wallet_client -- get_balance W1

use digital_wallet::client::{Command, WalletClient, HELP};
use digital_wallet::config::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        println!("{}", HELP);
        return Ok(());
    }

    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            println!("{}", e);
            println!();
            println!("{}", HELP);
            std::process::exit(2);
        }
    };

    let config = ClientConfig::from_env()?;
    let client = WalletClient::new(&config)?;

    match client.execute(&command).await {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", e);
            std::process::exit(1);
        }
    }
}
