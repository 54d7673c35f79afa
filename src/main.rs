//! AIDA CLI - tools for working with compiled type maps
//!
//! Commands:
//!   aida inspect <blob>         - Display the types declared in a blob
//!   aida lookup <blob> <name>   - Resolve one type by name
//!   aida builtins               - Display or regenerate the builtin types

use aida::{FieldWalk, Limits, TypeCode, TypeKind, TypeMap, TypeRegistry};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "aida")]
#[command(about = "Tools for working with AIDA type maps", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a type map and display its types
    Inspect {
        /// Path to the .aidatypes file
        blob_file: PathBuf,

        /// Show the content digest
        #[arg(long, short = 'H')]
        hash: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up a type by name, falling back to the builtins
    Lookup {
        /// Path to the .aidatypes file
        blob_file: PathBuf,

        /// Exact type name
        name: String,

        /// Follow type references to their target
        #[arg(long)]
        resolve: bool,
    },
    /// Display the builtin types
    Builtins {
        /// Write the encoded builtin blob to this file instead
        #[arg(long)]
        emit: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Inspect {
            blob_file,
            hash,
            json,
        } => inspect_command(&blob_file, hash, json),
        Commands::Lookup {
            blob_file,
            name,
            resolve,
        } => lookup_command(&blob_file, &name, resolve),
        Commands::Builtins { emit } => builtins_command(emit.as_deref()),
    }
}

fn load(blob_file: &Path) -> anyhow::Result<TypeMap> {
    TypeMap::try_load(blob_file, &Limits::default()).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load {} (errno {}): {}",
            blob_file.display(),
            e.errno(),
            e
        )
    })
}

fn inspect_command(blob_file: &Path, show_hash: bool, json: bool) -> anyhow::Result<()> {
    let map = load(blob_file)?;

    if json {
        print_json(&map, show_hash)?;
    } else {
        if show_hash {
            if let Some(digest) = map.digest() {
                println!("digest: {}", digest.to_hex());
            }
        }
        println!("types: {}", map.type_count());
        for ty in map.types() {
            print!("{}", ty.pretty("  "));
        }
    }

    if map.has_structural_error() {
        log::warn!("{} contains structural errors", blob_file.display());
    }
    Ok(())
}

fn lookup_command(blob_file: &Path, name: &str, resolve: bool) -> anyhow::Result<()> {
    let registry = TypeRegistry::new();
    let map = load(blob_file)?;
    registry.add(&map);

    let found = registry
        .lookup(name)
        .ok_or_else(|| anyhow::anyhow!("No type named '{}' in {}", name, blob_file.display()))?;
    let found = if resolve {
        found.resolve(&registry)
    } else {
        found
    };
    print!("{}", found.pretty(""));

    registry.shutdown();
    Ok(())
}

fn builtins_command(emit: Option<&Path>) -> anyhow::Result<()> {
    match emit {
        Some(path) => {
            let bytes = aida_format::encode(&aida::typemap::builtin_declarations())
                .map_err(|e| anyhow::anyhow!("Failed to encode builtins: {}", e))?;
            std::fs::write(path, &bytes)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
            println!("wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            for ty in TypeMap::builtins().types() {
                print!("{}", ty.pretty(""));
            }
        }
    }
    Ok(())
}

fn print_json(map: &TypeMap, show_hash: bool) -> anyhow::Result<()> {
    let mut output = serde_json::json!({
        "types": map
            .types()
            .map(|t| type_to_json(&t, &mut FieldWalk::new(), 0))
            .collect::<Vec<_>>(),
    });
    if show_hash {
        output["digest"] = serde_json::json!(map.digest().map(|d| d.to_hex()));
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn type_to_json(ty: &TypeCode, walk: &mut FieldWalk, depth: usize) -> serde_json::Value {
    let mut value = serde_json::json!({
        "name": ty.name(),
        "kind": ty.kind().name(),
        "aux": ty.aux_data(),
    });
    match ty.kind() {
        TypeKind::Enum => {
            value["values"] = serde_json::json!(ty.enum_values());
        }
        TypeKind::Record | TypeKind::Sequence => {
            value["fields"] = walk
                .fields(ty, depth)
                .iter()
                .map(|field| type_to_json(field, walk, depth + 1))
                .collect();
        }
        TypeKind::Instance => {
            value["prerequisites"] = (0..ty.prerequisite_count())
                .map(|i| serde_json::json!(ty.prerequisite(i).origin()))
                .collect();
        }
        TypeKind::TypeReference => {
            value["target"] = serde_json::json!(ty.origin());
        }
        _ => {}
    }
    value
}
