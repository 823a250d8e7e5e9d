use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use epqw::config::WalletConfig;
use epqw::envelope::{decode, verify_composite_with};
use epqw::{keyfile, logging, PublicKeys, SignedTransaction};
use rpassword::read_password;
use secrecy::SecretString;

/// Check a hybrid signature against a wallet's public keys.
#[derive(Parser)]
#[command(name = "verify")]
#[command(version)]
struct Cli {
    /// Public keys as written by `keyload --json`; no password needed
    #[arg(long, global = true, conflicts_with = "wallet")]
    pubkeys: Option<PathBuf>,

    /// Wallet name, decrypted to obtain its public keys
    #[arg(long, global = true)]
    wallet: Option<String>,

    /// Read the password from this environment variable instead of prompting
    #[arg(long, global = true, value_name = "VAR")]
    pass_env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify an envelope over a message file
    Message(MessageArgs),
    /// Verify a signed transaction
    Tx(TxArgs),
}

#[derive(ClapArgs)]
struct MessageArgs {
    #[arg(long, short = 'f')]
    file: PathBuf,

    /// Envelope as hex
    #[arg(long, conflicts_with = "sig_file")]
    sig: Option<String>,

    /// Envelope as raw bytes
    #[arg(long)]
    sig_file: Option<PathBuf>,
}

#[derive(ClapArgs)]
struct TxArgs {
    /// Signed transaction as raw bytes
    #[arg(long, short = 'f')]
    file: PathBuf,
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn public_keys(cli: &Cli) -> Result<PublicKeys> {
    if let Some(path) = &cli.pubkeys {
        return serde_json::from_slice(&read(path)?).context("invalid public key JSON");
    }
    let name = match &cli.wallet {
        Some(w) => w.clone(),
        None => {
            print!("Wallet name: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            line.trim().to_owned()
        }
    };
    let password = match &cli.pass_env {
        Some(var) => SecretString::new(std::env::var(var).context("missing env var for password")?),
        None => {
            print!("Enter verification password: ");
            io::stdout().flush()?;
            SecretString::new(read_password()?)
        }
    };
    let path = keyfile::wallet_path(&name)?;
    let keypair = keyfile::load(&path, &password)
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(keypair.public_keys())
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = WalletConfig::from_env().context("failed to load wallet config")?;
    let keys = public_keys(&cli)?;

    let ok = match &cli.command {
        Command::Message(args) => {
            let message = read(&args.file)?;
            let raw = match (&args.sig, &args.sig_file) {
                (Some(h), _) => hex::decode(h.trim()).context("invalid hex in --sig")?,
                (None, Some(p)) => read(p)?,
                (None, None) => return Err(anyhow!("one of --sig or --sig-file is required")),
            };
            let envelope = decode(&raw).context("malformed envelope")?;
            keys.pq_scheme == envelope.version().pq_scheme()
                && verify_composite_with(
                    config.verification,
                    &message,
                    &envelope,
                    &keys.classical,
                    &keys.pq,
                )
        }
        Command::Tx(args) => {
            let signed = SignedTransaction::from_bytes(&read(&args.file)?)
                .context("malformed signed transaction")?;
            println!("To               : {}", signed.unsigned().recipient());
            println!("Value            : {} wei", signed.unsigned().value());
            println!("Nonce            : {}", signed.unsigned().nonce());
            signed.verify(&keys, config.verification)
        }
    };

    println!("{}", if ok { "✅ signature valid" } else { "❌ signature invalid" });
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
