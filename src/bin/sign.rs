use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use epqw::config::WalletConfig;
use epqw::envelope::{verify_composite, EnvelopeVersion};
use epqw::{keyfile, logging, KeyPair, TransactionBuilder};
use rpassword::read_password;
use secrecy::SecretString;

/// Produce a hybrid signature with a stored wallet.
#[derive(Parser)]
#[command(name = "sign")]
#[command(version)]
struct Cli {
    /// Wallet name (prompted when omitted)
    #[arg(long, global = true)]
    wallet: Option<String>,

    /// Read the password from this environment variable instead of prompting
    #[arg(long, global = true, value_name = "VAR")]
    pass_env: Option<String>,

    /// Write the raw bytes here instead of printing hex
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign arbitrary bytes; output is a hybrid envelope
    Message(MessageArgs),
    /// Build and sign a transfer; output is a signed transaction
    Tx(TxArgs),
}

#[derive(ClapArgs)]
struct MessageArgs {
    /// Read the message from a file
    #[arg(long, short = 'f', conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Message text (prompted when neither this nor --file is given)
    text: Option<String>,
}

#[derive(ClapArgs)]
struct TxArgs {
    /// Recipient address (0x-prefixed hex)
    #[arg(long)]
    to: String,

    /// Amount in wei
    #[arg(long, allow_hyphen_values = true)]
    value: i128,

    #[arg(long)]
    nonce: u64,
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn open_wallet(name: Option<String>, pass_env: Option<&str>) -> Result<KeyPair> {
    let name = match name {
        Some(w) => w,
        None => prompt_line("Wallet name: ")?,
    };
    let password = match pass_env {
        Some(var) => SecretString::new(std::env::var(var).context("missing env var for password")?),
        None => {
            print!("Enter signing password: ");
            io::stdout().flush()?;
            SecretString::new(read_password()?)
        }
    };
    let path = keyfile::wallet_path(&name)?;
    keyfile::load(&path, &password).with_context(|| format!("failed to open {}", path.display()))
}

fn emit(out: Option<&PathBuf>, bytes: &[u8]) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
            println!("✅ {} bytes written → {}", bytes.len(), path.display());
        }
        None => println!("{}", hex::encode(bytes)),
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = WalletConfig::from_env().context("failed to load wallet config")?;

    let keypair = open_wallet(cli.wallet, cli.pass_env.as_deref())?;
    let builder = TransactionBuilder::new(EnvelopeVersion::for_scheme(keypair.pq_scheme()));
    let builder = match config.chain.max_value_wei {
        Some(cap) => builder.with_max_value(cap),
        None => builder,
    };
    let public = keypair.public_keys();

    match cli.command {
        Command::Message(args) => {
            let message = match (args.file, args.text) {
                (Some(p), _) => {
                    fs::read(&p).with_context(|| format!("failed to read {}", p.display()))?
                }
                (None, Some(s)) => s.into_bytes(),
                (None, None) => prompt_line("Message (single line): ")?.into_bytes(),
            };
            let envelope = builder.sign_message(&message, &keypair)?;

            let ok = verify_composite(&message, &envelope, &public.classical, &public.pq);
            let mut tampered = message.clone();
            match tampered.first_mut() {
                Some(b) => *b ^= 1,
                None => tampered.push(1),
            }
            let tampered_ok = verify_composite(&tampered, &envelope, &public.classical, &public.pq);
            eprintln!("Verify(original): {}", if ok { "OK" } else { "FAIL" });
            eprintln!(
                "Verify(tampered): {}",
                if tampered_ok { "UNEXPECTED OK" } else { "FAIL (expected)" }
            );
            emit(cli.out.as_ref(), &envelope.to_bytes())?;
        }
        Command::Tx(args) => {
            let to: epqw::Address = args.to.parse()?;
            let unsigned =
                builder.build_unsigned(to.as_bytes(), args.value, args.nonce, config.chain.params())?;
            let signed = builder.sign(&unsigned, &keypair)?;
            eprintln!("Tx hash          : 0x{}", hex::encode(signed.hash()));
            emit(cli.out.as_ref(), &signed.to_bytes())?;
        }
    }
    Ok(())
}
