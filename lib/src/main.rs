use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use hss_types::VerificationResult;
use hsslms_lib::lms::config::check_pairing;
use hsslms_lib::lms::{
    FileStore, HssConfig, HssPrivateKey, HssPublicKey, HssSignature, HssSigner, LevelParams,
    LmotsAlgorithm, LmsAlgorithm, DEFAULT_LEVELS, DEFAULT_LMOTS_TYPE, DEFAULT_LMS_TYPE,
};
use hsslms_lib::{BenchmarkMetrics, BenchmarkReport};
use rand::rngs::OsRng;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "hsslms")]
#[command(about = "HSS/LMS hash-based signatures (RFC 8554)", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a key pair, writing NAME.prv and NAME.pub
    Genkey {
        name: String,

        /// Number of HSS levels
        #[arg(short, long, default_value_t = DEFAULT_LEVELS)]
        levels: usize,

        /// LMS parameter set, by name or type id
        #[arg(long, default_value_t = DEFAULT_LMS_TYPE)]
        lms_type: LmsAlgorithm,

        /// LM-OTS parameter set, by name or type id
        #[arg(long, default_value_t = DEFAULT_LMOTS_TYPE)]
        lmots_type: LmotsAlgorithm,

        /// JSON configuration with per-level parameters; overrides the flags above
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Sign files with NAME.prv, writing FILE.sig next to each
    Sign {
        name: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Verify FILE.sig against FILE with NAME.pub
    Verify {
        name: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pretty-print a .pub, .prv or .sig file
    Show {
        file: PathBuf,

        /// Print a JSON summary instead
        #[arg(long)]
        json: bool,
    },

    /// List the registered parameter pairings
    Params {
        #[arg(long)]
        json: bool,
    },

    /// Time key generation, signing and verification
    Bench {
        #[arg(short, long, default_value_t = DEFAULT_LEVELS)]
        levels: usize,

        #[arg(long, default_value_t = DEFAULT_LMS_TYPE)]
        lms_type: LmsAlgorithm,

        #[arg(long, default_value_t = DEFAULT_LMOTS_TYPE)]
        lmots_type: LmotsAlgorithm,

        /// Number of messages to sign
        #[arg(short = 'n', long, default_value = "16")]
        count: usize,

        /// Output file for benchmark results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match cli.command {
        Commands::Genkey {
            name,
            levels,
            lms_type,
            lmots_type,
            config,
        } => {
            let config = match config {
                Some(path) => HssConfig::from_json(&fs::read_to_string(path)?)?,
                None => HssConfig::uniform(levels, lms_type, lmots_type)?,
            };
            genkey(&name, &config)?;
        }
        Commands::Sign { name, files } => sign_files(&name, &files)?,
        Commands::Verify { name, files, json } => verify_files(&name, &files, json)?,
        Commands::Show { file, json } => show(&file, json)?,
        Commands::Params { json } => list_params(json)?,
        Commands::Bench {
            levels,
            lms_type,
            lmots_type,
            count,
            output,
        } => {
            let config = HssConfig::uniform(levels, lms_type, lmots_type)?;
            run_benchmark(&config, count, output)?;
        }
    }

    Ok(())
}

fn with_suffix(path: impl AsRef<Path>, suffix: &str) -> PathBuf {
    let mut name = path.as_ref().as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn genkey(name: &str, config: &HssConfig) -> Result<(), Box<dyn Error>> {
    let store = FileStore::new(with_suffix(name, ".prv"));
    if store.exists() {
        return Err(format!("{} already exists", store.path().display()).into());
    }

    info!("Generating {}-level HSS key {}", config.depth(), name);
    let signer = HssSigner::create(store, config, &mut OsRng)?;
    let public = signer.public_key()?;
    let pub_path = with_suffix(name, ".pub");
    fs::write(&pub_path, public.to_bytes())?;

    println!("Private key: {}", signer.store().path().display());
    println!("Public key:  {}", pub_path.display());
    println!("Signatures available: {}", signer.remaining()?);
    Ok(())
}

fn sign_files(name: &str, files: &[PathBuf]) -> Result<(), Box<dyn Error>> {
    let signer = HssSigner::open(FileStore::new(with_suffix(name, ".prv")))?;
    for file in files {
        let message = fs::read(file)?;
        let signature = signer.sign(&message, &mut OsRng)?;
        let sig_path = with_suffix(file, ".sig");
        fs::write(&sig_path, signature.to_bytes())?;
        info!("Signed {} -> {}", file.display(), sig_path.display());
    }
    println!("Signatures remaining: {}", signer.remaining()?);
    Ok(())
}

fn verify_files(name: &str, files: &[PathBuf], json: bool) -> Result<(), Box<dyn Error>> {
    let public = HssPublicKey::from_bytes(&fs::read(with_suffix(name, ".pub"))?)?;

    let mut results = Vec::with_capacity(files.len());
    for file in files {
        let message = fs::read(file)?;
        let valid = match fs::read(with_suffix(file, ".sig")) {
            Ok(signature) => public.verify_bytes(&message, &signature),
            Err(e) => {
                error!("Cannot read signature for {}: {}", file.display(), e);
                false
            }
        };
        results.push(VerificationResult {
            file: file.display().to_string(),
            valid,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            let status = if result.valid { "valid" } else { "INVALID" };
            println!("{}: {}", result.file, status);
        }
    }

    let failures = results.iter().filter(|r| !r.valid).count();
    if failures > 0 {
        return Err(format!("{failures} signature(s) failed verification").into());
    }
    Ok(())
}

fn show(file: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(file)?;
    let extension = file.extension().and_then(|e| e.to_str()).unwrap_or("");

    match extension {
        "pub" => {
            let key = HssPublicKey::from_bytes(&bytes)?;
            print_item(&key, &key.summary(), json)
        }
        "prv" => {
            let key = HssPrivateKey::from_bytes(&bytes)?;
            print_item(&key, &key.summary(), json)
        }
        "sig" => {
            let sig = HssSignature::from_bytes(&bytes)?;
            print_item(&sig, &sig.summary(), json)
        }
        _ => {
            if let Ok(key) = HssPublicKey::from_bytes(&bytes) {
                print_item(&key, &key.summary(), json)
            } else if let Ok(sig) = HssSignature::from_bytes(&bytes) {
                print_item(&sig, &sig.summary(), json)
            } else {
                let key = HssPrivateKey::from_bytes(&bytes)?;
                print_item(&key, &key.summary(), json)
            }
        }
    }
}

fn print_item<T, S>(item: &T, summary: &S, json: bool) -> Result<(), Box<dyn Error>>
where
    T: std::fmt::Display,
    S: serde::Serialize,
{
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        print!("{item}");
    }
    Ok(())
}

fn list_params(json: bool) -> Result<(), Box<dyn Error>> {
    let pairings: Vec<LevelParams> = LmsAlgorithm::ALL
        .iter()
        .flat_map(|&lms| {
            LmotsAlgorithm::ALL
                .iter()
                .filter(move |&&lmots| check_pairing(lms, lmots).is_ok())
                .map(move |&lmots| LevelParams { lms, lmots })
        })
        .collect();

    if json {
        let summaries: Vec<_> = pairings.iter().map(LevelParams::summary).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!(
        "{:<18} {:<18} {:<13} {:>3} {:>3} {:>10} {:>9}",
        "LMS", "LM-OTS", "hash", "w", "h", "leaves", "sig bytes"
    );
    for pairing in &pairings {
        let s = pairing.summary();
        println!(
            "{:<18} {:<18} {:<13} {:>3} {:>3} {:>10} {:>9}",
            s.lms_name,
            s.lmots_name,
            s.hash_function,
            s.w,
            s.tree_height,
            s.leaves,
            s.signature_size_bytes
        );
    }
    Ok(())
}

fn run_benchmark(
    config: &HssConfig,
    count: usize,
    output_file: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    info!("Starting HSS benchmark with {} signatures", count);
    let metrics = BenchmarkMetrics::run(config, count, &mut OsRng)?;

    if !metrics.all_valid {
        error!("Signature verification failed!");
        return Err("Signature verification failed".into());
    }

    let mut report = BenchmarkReport::new();
    report.add_metrics(metrics);

    if let Some(output_path) = output_file {
        report.save_json(&output_path)?;
        info!("Benchmark results saved to {}", output_path.display());
    }

    println!("\n{}", report.summary());
    Ok(())
}
