use remap_core::error::Result;
use remap_core::mapping::document::MappingDocument;
use remap_core::mapping::{merge, proguard, tiny, writer};
use remap_core::{ArtifactKind, CacheKey, CacheStore, MappingTable};

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about = "remapdev CLI (alpha)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, ValueEnum)]
enum FormatArg {
    Tiny,
    Proguard,
}

#[derive(Copy, Clone, ValueEnum)]
enum KindArg {
    Jar,
    Mapping,
    Renamed,
    Decompiled,
    DecompiledMods,
}

impl From<KindArg> for ArtifactKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Jar => ArtifactKind::RawJar,
            KindArg::Mapping => ArtifactKind::MappingFile,
            KindArg::Renamed => ArtifactKind::RenamedJar,
            KindArg::Decompiled => ArtifactKind::DecompiledTree,
            KindArg::DecompiledMods => ArtifactKind::DecompiledMods,
        }
    }
}

#[derive(Subcommand)]
enum MapCommands {
    /// Translate a class name
    Class {
        file: PathBuf,
        name: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        legacy: bool,
    },
    /// Translate a field by owner and name
    Field {
        file: PathBuf,
        owner: String,
        name: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        legacy: bool,
    },
    /// Translate a method by owner, name and descriptor
    Method {
        file: PathBuf,
        owner: String,
        name: String,
        descriptor: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        legacy: bool,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// List published keys for one artifact kind (JSON)
    List {
        root: PathBuf,
        #[arg(long, value_enum)]
        kind: KindArg,
    },
    /// Print the canonical path of a cached artifact, if present
    Locate {
        root: PathBuf,
        version: String,
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long, default_value = "")]
        scheme: String,
    },
    /// Stage and atomically publish an artifact into the cache
    Publish {
        root: PathBuf,
        version: String,
        file: PathBuf,
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long, default_value = "")]
        scheme: String,
        /// Expected blake3 hex digest; publication fails on mismatch
        #[arg(long)]
        hash: Option<String>,
    },
}

#[derive(Subcommand)]
enum Commands {
    /// Merge ProGuard + intermediary mappings into a Tiny v2 file
    Convert {
        proguard: PathBuf,
        intermediary: PathBuf,
        out: PathBuf,
    },

    /// Print namespaces and entry counts of a mapping file
    Inspect {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "tiny")]
        format: FormatArg,
    },

    #[command(subcommand)]
    /// Translate one symbol between two namespaces
    Map(MapCommands),

    #[command(subcommand)]
    /// Query or fill the artifact cache
    Cache(CacheCommands),
}

fn load_document(file: &Path, legacy: bool) -> Result<MappingDocument> {
    let content = fs::read_to_string(file)?;
    if legacy {
        proguard::parse(&content, "obfuscated", "deobfuscated")
    } else {
        tiny::parse(&content)
    }
}

fn convert(proguard_path: &Path, intermediary_path: &Path, out: &Path) -> Result<()> {
    println!("[1/4] Reading ProGuard mappings: {}", proguard_path.display());
    let pg_doc = proguard::parse(&fs::read_to_string(proguard_path)?, "named", "official")?;
    println!(
        "  classes={} fields={} methods={}",
        pg_doc.classes.len(),
        pg_doc.field_count(),
        pg_doc.method_count()
    );

    println!(
        "[2/4] Reading intermediary mappings: {}",
        intermediary_path.display()
    );
    let tiny_doc = tiny::parse(&fs::read_to_string(intermediary_path)?)?;
    println!(
        "  namespaces={:?} classes={}",
        tiny_doc.namespaces,
        tiny_doc.classes.len()
    );

    println!("[3/4] Merging mappings...");
    let merged = merge::merge(&tiny_doc, &pg_doc)?;

    println!("[4/4] Writing Tiny v2 output: {}", out.display());
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(out, writer::write_tiny(&merged))?;

    println!();
    println!("Conversion complete!");
    println!("  classes={}", merged.classes.len());
    println!("  fields={}", merged.field_count());
    println!("  methods={}", merged.method_count());
    Ok(())
}

fn copy_into_staging(store: &CacheStore, file: &Path) -> Result<PathBuf> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "staged".to_string());
    let staged = store.staging_dir().join(name);
    if file.is_dir() {
        copy_tree(file, &staged)?;
    } else {
        fs::copy(file, &staged)?;
    }
    Ok(staged)
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            proguard,
            intermediary,
            out,
        } => convert(&proguard, &intermediary, &out)?,

        Commands::Inspect { file, format } => {
            let doc = load_document(&file, matches!(format, FormatArg::Proguard))?;
            println!("namespaces: {}", doc.namespaces.join(", "));
            println!("classes:    {}", doc.classes.len());
            println!("fields:     {}", doc.field_count());
            println!("methods:    {}", doc.method_count());
        }

        Commands::Map(map_cmd) => {
            let (file, from, to, legacy) = match &map_cmd {
                MapCommands::Class {
                    file, from, to, legacy, ..
                }
                | MapCommands::Field {
                    file, from, to, legacy, ..
                }
                | MapCommands::Method {
                    file, from, to, legacy, ..
                } => (file.clone(), from.clone(), to.clone(), *legacy),
            };
            let doc = load_document(&file, legacy)?;
            let table = MappingTable::build(&doc, &from, &to)?;
            let translated = match &map_cmd {
                MapCommands::Class { name, .. } => table.class(name),
                MapCommands::Field { owner, name, .. } => table.field(owner, name),
                MapCommands::Method {
                    owner,
                    name,
                    descriptor,
                    ..
                } => table.method(owner, name, descriptor),
            };
            match translated {
                Some(name) => println!("{name}"),
                None => {
                    eprintln!("not found");
                    std::process::exit(1);
                }
            }
        }

        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::List { root, kind } => {
                let store = CacheStore::open(root)?;
                let keys = store.list(kind.into())?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&keys)
                        .map_err(|e| std::io::Error::other(e.to_string()))?
                );
            }
            CacheCommands::Locate {
                root,
                version,
                kind,
                scheme,
            } => {
                let store = CacheStore::open(root)?;
                let key = CacheKey::new(version, scheme);
                match store.locate(kind.into(), &key) {
                    Some(path) => println!("{}", path.display()),
                    None => {
                        eprintln!("not cached");
                        std::process::exit(1);
                    }
                }
            }
            CacheCommands::Publish {
                root,
                version,
                file,
                kind,
                scheme,
                hash,
            } => {
                let store = CacheStore::open(root)?;
                let key = CacheKey::new(version, scheme);
                let staged = copy_into_staging(&store, &file)?;
                let published = store.publish(kind.into(), &key, &staged, hash.as_deref())?;
                println!("{}", published.display());
            }
        },
    }

    Ok(())
}
