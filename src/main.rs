use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use secureops::common::write_string_to_file;
use secureops::config::{AppConfig, ConfigOverrides};
use secureops::database::seed_data::seed_sample_hierarchy;
use secureops::database::{establish_connection, migrate, MigrateDirection};
use secureops::export::{self, ExportFormat};
use secureops::hierarchy::{HierarchyNode, NodeId, Site, Staff, TreeNode};
use secureops::services::HierarchyService;
use secureops::store::{MemoryRecordStore, RecordStore, SqlRecordStore};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// YAML configuration file
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path, or `:memory:`
    #[clap(short, long, global = true)]
    database: Option<String>,
    /// Use an in-memory record store preloaded with sample data
    #[clap(long, global = true)]
    memory: bool,
    #[clap(long, global = true)]
    max_depth: Option<usize>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Insert the sample site tree and org chart into empty tables
    Seed,
    /// Print the hierarchy as an indented tree
    Tree {
        #[clap(long)]
        staff: bool,
        #[clap(short, long)]
        root: Option<NodeId>,
    },
    /// List direct children, or the roots when no id is given
    Children {
        #[clap(long)]
        staff: bool,
        id: Option<NodeId>,
    },
    /// Print the chain of parents or supervisors above a node
    Chain {
        #[clap(long)]
        staff: bool,
        id: NodeId,
    },
    /// Move a node under a new parent, or make it a root
    Reparent {
        #[clap(long)]
        staff: bool,
        id: NodeId,
        #[clap(short, long)]
        parent: Option<NodeId>,
    },
    /// Report dangling references, duplicates and cycles
    Check {
        #[clap(long)]
        staff: bool,
    },
    Export {
        #[clap(long)]
        staff: bool,
        #[clap(short, long, value_enum)]
        format: ExportFormat,
        #[clap(short, long)]
        root: Option<NodeId>,
        #[clap(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init,
    Migrate {
        #[clap(subcommand)]
        direction: MigrateDirection,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let config = AppConfig::load(
        args.config.as_deref(),
        ConfigOverrides {
            database: args.database.clone(),
            log_level: args.log_level.clone(),
            max_depth: args.max_depth,
        },
    )?;
    setup_logging(&config.log_level);
    if let Some(path) = &args.config {
        info!("Loaded configuration from {}", path.display());
    }

    match args.command {
        Commands::Db { command } => {
            if args.memory {
                anyhow::bail!("db commands need a SQLite database, not --memory");
            }
            let db = establish_connection(&config.database_url()).await?;
            match command {
                DbCommands::Init => {
                    info!("Initializing database: {}", config.database);
                    migrate(&db, MigrateDirection::Up).await?;
                }
                DbCommands::Migrate { direction } => {
                    info!("Running database migration: {:?}", direction);
                    migrate(&db, direction).await?;
                }
            }
        }
        Commands::Seed => {
            let store = open_store(&config, args.memory).await?;
            let report = seed_sample_hierarchy(store.as_ref()).await?;
            println!("Seeded {} sites and {} staff", report.sites, report.staff);
        }
        Commands::Tree { staff, root } => {
            let store = open_store(&config, args.memory).await?;
            if staff {
                print_tree(&service::<Staff>(store, &config), root).await?;
            } else {
                print_tree(&service::<Site>(store, &config), root).await?;
            }
        }
        Commands::Children { staff, id } => {
            let store = open_store(&config, args.memory).await?;
            if staff {
                print_children(&service::<Staff>(store, &config), id).await?;
            } else {
                print_children(&service::<Site>(store, &config), id).await?;
            }
        }
        Commands::Chain { staff, id } => {
            let store = open_store(&config, args.memory).await?;
            if staff {
                print_chain(&service::<Staff>(store, &config), id).await?;
            } else {
                print_chain(&service::<Site>(store, &config), id).await?;
            }
        }
        Commands::Reparent { staff, id, parent } => {
            let store = open_store(&config, args.memory).await?;
            if staff {
                service::<Staff>(store, &config).reparent(id, parent).await?;
            } else {
                service::<Site>(store, &config).reparent(id, parent).await?;
            }
            println!(
                "Moved {} under {}",
                id,
                parent.map_or_else(|| "root".to_string(), |p| p.to_string())
            );
        }
        Commands::Check { staff } => {
            let store = open_store(&config, args.memory).await?;
            if staff {
                check(&service::<Staff>(store, &config)).await?;
            } else {
                check(&service::<Site>(store, &config)).await?;
            }
        }
        Commands::Export {
            staff,
            format,
            root,
            output,
        } => {
            let store = open_store(&config, args.memory).await?;
            let rendered = if staff {
                export::render(&service::<Staff>(store, &config).org_chart(root).await?, format)?
            } else {
                export::render(&service::<Site>(store, &config).org_chart(root).await?, format)?
            };
            match output {
                Some(path) => {
                    write_string_to_file(&path, &rendered)?;
                    info!("Wrote {} export to {}", format.extension(), path);
                }
                None => print!("{}", rendered),
            }
        }
    }

    Ok(())
}

async fn open_store(config: &AppConfig, memory: bool) -> Result<Arc<dyn RecordStore>> {
    if memory {
        let store = MemoryRecordStore::new();
        seed_sample_hierarchy(&store).await?;
        info!("Using in-memory record store with sample data");
        return Ok(Arc::new(store));
    }

    let db = establish_connection(&config.database_url()).await?;
    migrate(&db, MigrateDirection::Up).await?;
    Ok(Arc::new(SqlRecordStore::new(db)))
}

fn service<N: HierarchyNode>(store: Arc<dyn RecordStore>, config: &AppConfig) -> HierarchyService<N> {
    HierarchyService::new(store).with_max_depth(config.max_depth)
}

fn describe<N: HierarchyNode>(node: &N) -> String {
    let mut line = format!("[{}] {}", node.id(), node.label());
    if !node.kind().is_empty() {
        line.push_str(&format!(" ({})", node.kind()));
    }
    if let Some(score) = node.compliance() {
        line.push_str(&format!(" {:.0}%", score));
    }
    line
}

fn print_tree_node<N: HierarchyNode>(tree: &TreeNode<N>) {
    println!("{}{}", "  ".repeat(tree.depth), describe(&tree.node));
    for child in &tree.children {
        print_tree_node(child);
    }
}

async fn print_tree<N: HierarchyNode>(service: &HierarchyService<N>, root: Option<NodeId>) -> Result<()> {
    for tree in service.org_chart(root).await? {
        print_tree_node(&tree);
    }
    Ok(())
}

async fn print_children<N: HierarchyNode>(service: &HierarchyService<N>, id: Option<NodeId>) -> Result<()> {
    for child in service.children_of(id).await? {
        println!("{}", describe(&child));
    }
    Ok(())
}

async fn print_chain<N: HierarchyNode>(service: &HierarchyService<N>, id: NodeId) -> Result<()> {
    let chain = service.ancestor_chain(id).await?;
    if chain.is_empty() {
        println!("{} is a root", id);
        return Ok(());
    }
    let labels: Vec<String> = chain.iter().map(|n| n.label().to_string()).collect();
    println!("{}", labels.join(" -> "));
    Ok(())
}

async fn check<N: HierarchyNode>(service: &HierarchyService<N>) -> Result<()> {
    let graph = service.load().await?;
    println!("{}", graph.stats());
    if let Err(errors) = graph.verify_integrity() {
        for error in &errors {
            println!("  {}", error);
        }
        anyhow::bail!("{} hierarchy has {} integrity problems", N::FLAVOR, errors.len());
    }
    println!("{} hierarchy OK", N::FLAVOR);
    Ok(())
}

fn setup_logging(log_level: &str) {
    let log_level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "handlebars=off,sqlx=warn,sea_orm_migration=warn,{}",
            log_level
        )))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
