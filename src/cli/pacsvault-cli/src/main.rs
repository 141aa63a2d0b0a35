//! Pacsvault CLI - Command line interface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pacsvault_envelope::{frame, EncryptedObjectStore, EncryptionConfig, EnvelopeCipher};
use pacsvault_storage::ObjectStore;
use pacsvault_storage_fs::{FilesystemStore, StorageStructure};

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "pacsvault")]
#[command(about = "Pacsvault - archive medical images with envelope encryption")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new base64-encoded master-key file
    Genkey {
        /// Output key file path
        #[arg(short, long)]
        out: PathBuf,
        /// Overwrite the output file if it exists
        #[arg(long)]
        force: bool,
    },
    /// Encrypt a single file
    Encrypt {
        /// Encryption configuration file (JSON)
        #[arg(short, long, env = "PACSVAULT_CONFIG")]
        config: PathBuf,
        /// Plaintext input file
        input: PathBuf,
        /// Encrypted output file
        output: PathBuf,
    },
    /// Decrypt a single file
    Decrypt {
        /// Encryption configuration file (JSON)
        #[arg(short, long, env = "PACSVAULT_CONFIG")]
        config: PathBuf,
        /// Encrypted input file
        input: PathBuf,
        /// Plaintext output file
        output: PathBuf,
    },
    /// Print the header of an encrypted file
    Inspect {
        /// Encrypted input file
        input: PathBuf,
    },
    /// Operate on a filesystem archive
    Store {
        /// Archive root directory
        #[arg(long, env = "PACSVAULT_ROOT")]
        root: PathBuf,
        /// Directory layout (flat, legacy)
        #[arg(long, default_value = "flat")]
        structure: String,
        /// Fsync after every write
        #[arg(long)]
        fsync: bool,
        /// Encryption configuration file (JSON); omit to store plaintext
        #[arg(short, long, env = "PACSVAULT_CONFIG")]
        config: Option<PathBuf>,
        #[command(subcommand)]
        command: StoreCommands,
    },
}

#[derive(Subcommand)]
enum StoreCommands {
    /// Store a file as an object
    Put {
        /// Object id
        id: String,
        /// Input file
        input: PathBuf,
    },
    /// Retrieve an object into a file
    Get {
        /// Object id
        id: String,
        /// Output file
        output: PathBuf,
    },
    /// Delete an object
    Delete {
        /// Object id
        id: String,
    },
    /// Show the logical size of an object
    Info {
        /// Object id
        id: String,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Genkey { out, force } => generate_key_file(&out, force),
        Commands::Encrypt {
            config,
            input,
            output,
        } => encrypt_file(&config, &input, &output).await,
        Commands::Decrypt {
            config,
            input,
            output,
        } => decrypt_file(&config, &input, &output).await,
        Commands::Inspect { input } => inspect_file(&input),
        Commands::Store {
            root,
            structure,
            fsync,
            config,
            command,
        } => run_store_command(&root, &structure, fsync, config.as_deref(), command).await,
    }
}

// ============================================================================
// Commands
// ============================================================================

fn generate_key_file(out: &Path, force: bool) -> Result<()> {
    if out.exists() && !force {
        bail!("'{}' already exists, pass --force to overwrite", out.display());
    }

    let key = pacsvault_crypto::random::generate_key();
    let encoded = format!("{}\n", BASE64.encode(&*key));

    std::fs::write(out, encoded)
        .with_context(|| format!("failed to write key file '{}'", out.display()))?;

    println!("wrote new master key to '{}'", out.display());
    println!("register it under a fresh id in the StorageEncryption section");

    Ok(())
}

async fn encrypt_file(config: &Path, input: &Path, output: &Path) -> Result<()> {
    let cipher = load_cipher(config)?;

    let plaintext = std::fs::read(input)
        .with_context(|| format!("failed to read '{}'", input.display()))?;

    let frame = cipher.encrypt(&plaintext).await?;

    std::fs::write(output, &frame)
        .with_context(|| format!("failed to write '{}'", output.display()))?;

    println!(
        "encrypted {} bytes -> {} bytes under master key {}",
        plaintext.len(),
        frame.len(),
        cipher.key_store().current_master_key_id()
    );

    Ok(())
}

async fn decrypt_file(config: &Path, input: &Path, output: &Path) -> Result<()> {
    let cipher = load_cipher(config)?;

    let frame = std::fs::read(input)
        .with_context(|| format!("failed to read '{}'", input.display()))?;

    let plaintext = cipher.decrypt(&frame).await?;

    std::fs::write(output, &plaintext)
        .with_context(|| format!("failed to write '{}'", output.display()))?;

    println!("decrypted {} bytes -> {} bytes", frame.len(), plaintext.len());

    Ok(())
}

fn inspect_file(input: &Path) -> Result<()> {
    let data = std::fs::read(input)
        .with_context(|| format!("failed to read '{}'", input.display()))?;

    let header = frame::parse_header(&data)?;

    println!("version:        A1");
    println!(
        "master key id:  {} (0x{:08x})",
        header.master_key_id, header.master_key_id
    );
    println!("frame size:     {} bytes", data.len());
    println!("payload size:   {} bytes", data.len() - frame::OVERHEAD_SIZE);

    Ok(())
}

async fn run_store_command(
    root: &Path,
    structure: &str,
    fsync: bool,
    config: Option<&Path>,
    command: StoreCommands,
) -> Result<()> {
    let structure = match structure {
        "flat" => StorageStructure::Flat,
        "legacy" => StorageStructure::Legacy,
        other => bail!("invalid storage structure '{other}', allowed values are 'flat' and 'legacy'"),
    };

    let backend = FilesystemStore::open(root)?
        .with_structure(structure)
        .with_fsync(fsync);

    let cipher = match config {
        Some(path) => Some(Arc::new(load_cipher(path)?)),
        None => None,
    };

    let store = EncryptedObjectStore::new(backend, cipher);

    match command {
        StoreCommands::Put { id, input } => {
            let data = std::fs::read(&input)
                .with_context(|| format!("failed to read '{}'", input.display()))?;
            store.write(&id, &data).await?;
            println!("stored '{id}' ({} bytes)", data.len());
        }
        StoreCommands::Get { id, output } => {
            let data = store.read(&id).await?;
            std::fs::write(&output, &data)
                .with_context(|| format!("failed to write '{}'", output.display()))?;
            println!("retrieved '{id}' ({} bytes)", data.len());
        }
        StoreCommands::Delete { id } => {
            store.delete(&id).await?;
            println!("deleted '{id}'");
        }
        StoreCommands::Info { id } => {
            let size = store.size(&id).await?;
            println!("object:  {id}");
            println!("size:    {size} bytes");
            println!(
                "crypto:  {}",
                if store.encryption_enabled() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }
    }

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Loads the encryption configuration and builds a cipher from it.
///
/// The file may either be the `StorageEncryption` section itself or a larger
/// configuration object containing one.
fn load_cipher(path: &Path) -> Result<EnvelopeCipher> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config '{}'", path.display()))?;

    let mut value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in config '{}'", path.display()))?;

    if let Some(section) = value.get_mut("StorageEncryption") {
        value = section.take();
    }

    let config: EncryptionConfig = serde_json::from_value(value)
        .with_context(|| format!("invalid StorageEncryption section in '{}'", path.display()))?;

    match config.into_cipher()? {
        Some(cipher) => Ok(cipher),
        None => bail!(
            "encryption is disabled in '{}'; enable it or omit the config",
            path.display()
        ),
    }
}
