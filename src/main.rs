use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use workload_policy::policy::pattern::PATTERN_ALL;
use workload_policy::{ConstNamespacer, Manifests, Pattern, Policy, PolicyUpdate, ResourceId, Set};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "workload-policy")]
#[command(about = "Edit workload policy annotations in manifest files", long_about = None)]
struct Cli {
    /// Namespace assumed for documents that declare none.
    #[arg(long, global = true, env = "WORKLOAD_POLICY_NAMESPACE", default_value = "default")]
    namespace: String,

    #[arg(long, global = true, env = "WORKLOAD_POLICY_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add or remove policies on one workload.
    Update {
        #[arg(short, long)]
        file: PathBuf,

        /// Workload id, `namespace:kind/name`.
        #[arg(short, long)]
        workload: String,

        #[command(flatten)]
        changes: PolicyFlags,

        /// JSON policy update, `{"add": {...}, "remove": {...}}`.
        #[arg(long)]
        update: Option<PathBuf>,

        /// Write the result here instead of stdout.
        #[arg(short = 'o', long, conflicts_with = "in_place")]
        output: Option<PathBuf>,

        /// Overwrite the input file.
        #[arg(long)]
        in_place: bool,
    },
    /// Print the policies of one workload as JSON.
    Show {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        workload: String,
    },
    /// List the resources in a manifest file.
    List {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct PolicyFlags {
    #[arg(long)]
    automate: bool,

    #[arg(long)]
    deautomate: bool,

    #[arg(long)]
    lock: bool,

    #[arg(long)]
    unlock: bool,

    /// Who is locking or unlocking.
    #[arg(long)]
    user: Option<String>,

    /// Why the workload is locked.
    #[arg(long)]
    message: Option<String>,

    /// Tag filter for one container, `container=pattern`. A pattern of `*` removes the filter.
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Tag filter for every container.
    #[arg(long)]
    tag_all: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let manifests = Manifests::new(ConstNamespacer::new(cli.namespace));

    match cli.cmd {
        Commands::Update {
            file,
            workload,
            changes,
            update,
            output,
            in_place,
        } => {
            let id: ResourceId = workload.parse()?;
            let mut policy_update = calculate_policy_changes(&changes)?;
            if let Some(path) = update {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("read policy update {}", path.display()))?;
                let from_file: PolicyUpdate = serde_json::from_str(&text)
                    .with_context(|| format!("parse policy update {}", path.display()))?;
                policy_update = from_file.merge(policy_update);
            }
            if policy_update.is_empty() {
                bail!("no policy changes requested");
            }

            let def = std::fs::read(&file).with_context(|| format!("read manifest {}", file.display()))?;
            let out = manifests
                .update_workload_policies(&def, &id, &policy_update)
                .with_context(|| format!("update policies of {id} in {}", file.display()))?;

            match (output, in_place) {
                (Some(path), _) => std::fs::write(&path, &out)
                    .with_context(|| format!("write {}", path.display()))?,
                (None, true) => std::fs::write(&file, &out)
                    .with_context(|| format!("write {}", file.display()))?,
                (None, false) => print!("{}", String::from_utf8_lossy(&out)),
            }
            let changed = out != def;
            tracing::info!(workload = %id, changed, "updated policies");
        }
        Commands::Show { file, workload } => {
            let id: ResourceId = workload.parse()?;
            let def = std::fs::read(&file).with_context(|| format!("read manifest {}", file.display()))?;
            let policies = manifests.workload_policies(&def, &id)?;
            println!("{}", serde_json::to_string_pretty(&policies)?);
        }
        Commands::List { file } => {
            let def = std::fs::read(&file).with_context(|| format!("read manifest {}", file.display()))?;
            for id in manifests.resource_ids(&def)? {
                println!("{id}");
            }
        }
    }

    Ok(())
}

/// Turn command-line flags into a policy update.
fn calculate_policy_changes(flags: &PolicyFlags) -> Result<PolicyUpdate> {
    if flags.automate && flags.deautomate {
        bail!("--automate and --deautomate both specified");
    }
    if flags.lock && flags.unlock {
        bail!("--lock and --unlock both specified");
    }

    let mut add = Set::new();
    let mut remove = Set::new();

    if flags.automate {
        add.insert(Policy::Automated, "true");
    }
    if flags.deautomate {
        remove.insert(Policy::Automated, "true");
    }
    if flags.lock {
        add.insert(Policy::Locked, "true");
        if let Some(user) = &flags.user {
            add.insert(Policy::LockedUser, user.as_str());
        }
        if let Some(message) = &flags.message {
            add.insert(Policy::LockedMsg, message.as_str());
        }
    }
    if flags.unlock {
        remove.insert(Policy::Locked, "true");
        remove.insert(Policy::LockedUser, "");
        remove.insert(Policy::LockedMsg, "");
    }

    if let Some(pattern) = &flags.tag_all {
        add.insert(Policy::tag_all(), canonical_pattern(pattern)?);
    }
    for pair in &flags.tags {
        let Some((container, pattern)) = pair.split_once('=') else {
            bail!("invalid container/tag pair: {pair:?}. Expected format is 'container=filter'");
        };
        if container.is_empty() || pattern.contains('=') {
            bail!("invalid container/tag pair: {pair:?}. Expected format is 'container=filter'");
        }
        if pattern == "*" {
            remove.insert(Policy::tag(container), PATTERN_ALL);
        } else {
            add.insert(Policy::tag(container), canonical_pattern(pattern)?);
        }
    }

    Ok(PolicyUpdate::new(add, remove))
}

fn canonical_pattern(pattern: &str) -> Result<String> {
    let parsed = Pattern::new(pattern).with_context(|| format!("invalid tag pattern {pattern:?}"))?;
    Ok(parsed.to_string())
}
