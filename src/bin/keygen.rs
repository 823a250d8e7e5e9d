use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;
use epqw::config::WalletConfig;
use epqw::envelope::EnvelopeVersion;
use epqw::{keyfile, logging, KeyStore};
use rand::rngs::OsRng;
use rpassword::read_password;
use secrecy::{ExposeSecret, SecretString};

/// Generate a hybrid wallet and store it encrypted under ~/wallets/<name>/.
#[derive(Parser)]
#[command(name = "keygen")]
#[command(version)]
struct Args {
    /// Wallet name (prompted when omitted)
    #[arg(long)]
    wallet: Option<String>,

    /// Read the password from this environment variable instead of prompting
    #[arg(long, value_name = "VAR")]
    pass_env: Option<String>,

    /// Envelope version the wallet signs with (1 = Dilithium5, 2 = Dilithium3, 3 = Dilithium2)
    #[arg(long)]
    envelope_version: Option<u8>,

    /// Overwrite an existing wallet file
    #[arg(long)]
    force: bool,
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

fn new_password(pass_env: Option<&str>) -> Result<SecretString> {
    if let Some(var) = pass_env {
        let val = std::env::var(var).context("missing env var for password")?;
        return Ok(SecretString::new(val));
    }
    print!("Enter encryption password: ");
    io::stdout().flush()?;
    let first = SecretString::new(read_password()?);
    print!("Repeat password: ");
    io::stdout().flush()?;
    let second = SecretString::new(read_password()?);
    if first.expose_secret() != second.expose_secret() {
        bail!("passwords do not match");
    }
    Ok(first)
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    let config = WalletConfig::from_env().context("failed to load wallet config")?;

    let version = match args.envelope_version {
        Some(v) => EnvelopeVersion::try_from(v)?,
        None => config.envelope_version,
    };

    let wallet_name = match args.wallet {
        Some(w) => w,
        None => prompt_line("Wallet name: ")?,
    };
    let path = keyfile::wallet_path(&wallet_name)?;
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let password = new_password(args.pass_env.as_deref())?;
    if password.expose_secret().is_empty() {
        bail!("empty password");
    }

    let keypair = KeyStore::from_os_rng(version.pq_scheme())
        .generate()
        .context("key generation failed")?;
    let sealed = keyfile::seal(&keypair, &password, &config.kdf, &mut OsRng)?;
    keyfile::save(&path, &sealed)?;

    let public = keypair.public_keys();
    println!("✅ Keys generated and stored encrypted in {}", path.display());
    println!("Address          : {}", keypair.address());
    println!("PQ scheme        : {}", keypair.pq_scheme());
    println!("Classical pk fp  : {}…", public.classical_fingerprint());
    println!("PQ pk fp         : {}…", public.pq_fingerprint());
    Ok(())
}
