use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use epqw::{keyfile, logging};
use rpassword::read_password;
use secrecy::SecretString;

/// Decrypt a wallet and show its public fingerprints. Never prints secrets.
#[derive(Parser)]
#[command(name = "keyload")]
#[command(version)]
struct Args {
    /// Wallet name (prompted when omitted)
    #[arg(long)]
    wallet: Option<String>,

    /// Read the password from this environment variable instead of prompting
    #[arg(long, value_name = "VAR")]
    pass_env: Option<String>,

    /// Print the full public keys as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let wallet_name = match args.wallet {
        Some(w) => w,
        None => {
            print!("Wallet name to load: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            line.trim().to_owned()
        }
    };

    let password = match &args.pass_env {
        Some(var) => SecretString::new(std::env::var(var).context("missing env var for password")?),
        None => {
            print!("Enter decryption password: ");
            io::stdout().flush()?;
            SecretString::new(read_password()?)
        }
    };

    let path = keyfile::wallet_path(&wallet_name)?;
    let keypair = keyfile::load(&path, &password)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let public = keypair.public_keys();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&public)?);
        return Ok(());
    }

    println!("\n✅ Wallet loaded successfully!\n");
    println!("Address          : {}", keypair.address());
    println!("PQ scheme        : {}", keypair.pq_scheme());
    println!("Classical pk fp  : {}…", public.classical_fingerprint());
    println!("PQ pk fp         : {}…", public.pq_fingerprint());
    Ok(())
}
