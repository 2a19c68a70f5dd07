use anyhow::Context;
use clap::{Parser, Subcommand};
use objlens::config::RuntimeConfig;
use objlens::debugger::{self, ObjectHandle, Session};
use objlens::snapshot::Snapshot;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Heap snapshot (toml) used as a debugee
    #[arg(long, env = "OBJLENS_SNAPSHOT")]
    snapshot: String,

    /// Maximum number of children to render, overrides snapshot setting
    #[arg(long)]
    max_children: Option<usize>,

    /// Runtime configuration file (default: ~/.config/objlens/runtime.toml)
    #[arg(long)]
    runtime_config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one-line summary of an object
    Summary {
        #[arg(value_parser = parse_address)]
        address: u64,
    },
    /// Print deep summary of an object
    Expand {
        #[arg(value_parser = parse_address)]
        address: u64,
    },
    /// Print children of an object, one per line
    Children {
        #[arg(value_parser = parse_address)]
        address: u64,
    },
    /// Print declared type name of an object
    TypeName {
        #[arg(value_parser = parse_address)]
        address: u64,
    },
    /// Print summaries of all snapshot objects
    Dump,
}

fn parse_address(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address `{s}`: {e}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = RuntimeConfig::load(args.runtime_config.as_deref());
    let snapshot = Snapshot::from_file(&args.snapshot)
        .with_context(|| format!("load snapshot `{}`", args.snapshot))?;
    let target = snapshot.into_target(&config);
    if let Some(max_children) = args.max_children {
        target.set_max_children(Some(max_children));
    }

    match args.command {
        Command::Summary { address } => {
            let summary = debugger::summary(&target, &config, ObjectHandle::object(address))?;
            println!("{summary}");
        }
        Command::Expand { address } => {
            let summary =
                debugger::full_summary(&target, &config, ObjectHandle::object(address))?;
            println!("{summary}");
        }
        Command::Children { address } => {
            let session = Session::new(&target, &config);
            let provider = session.build_provider(ObjectHandle::object(address));
            let cap = session.max_children()?;
            for index in 0..provider.child_count().min(cap) {
                if let Some(child) = provider.child_at(index)? {
                    println!("{} = {}", child.name, child.value.summary()?);
                }
            }
            if provider.child_count() > cap {
                println!("...");
            }
        }
        Command::TypeName { address } => {
            let session = Session::new(&target, &config);
            match session.type_name(ObjectHandle::object(address))? {
                Some(name) => println!("{name}"),
                None => println!("unknown type"),
            }
        }
        Command::Dump => {
            let addresses: Vec<_> = target.snapshot().object_addresses().collect();
            for address in addresses {
                let handle = ObjectHandle::object(address);
                let summary = debugger::summary(&target, &config, handle)?;
                println!("{handle}: {summary}");
            }
        }
    }

    Ok(())
}
