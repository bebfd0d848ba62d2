// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subnet Allocator CLI
//!
//! Allocates subnets from the normal and Kubernetes pools, provisions pool
//! roots, validates CIDR input and lists pool contents.
//!
//! Configuration comes from the environment (see `subnet_allocator::config`).
//! Project, host network and owner fall back to `GCP_PROJECT`, `HOST_VPC`
//! and `GITLAB_USER_EMAIL` when not given as flags.
//!
//! Run with: cargo run --bin subnet-allocator -- allocate normal --prefix 24 --seed 10.0.0.0/16

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use subnet_allocator::allocation::{KubernetesPrefixes, KubernetesRequest, NormalRequest};
use subnet_allocator::config::{AllocatorConfig, Backend, RequestDefaults};
use subnet_allocator::domain::{validate_cidr_format, CidrBlock, ResourceClass};
use subnet_allocator::pool::{AddressPoolStore, InMemoryPoolStore, NatsPoolStore};
use subnet_allocator::report::AllocationReport;
use subnet_allocator::service::{with_retry, SubnetAllocator};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Where to write the JSON allocation result
    #[arg(long, default_value = "allocation_results.json")]
    output: PathBuf,

    /// Where to write the plain-text allocation report
    #[arg(long, default_value = "cidr_allocation_report.txt")]
    report: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Allocate address space from a class pool
    Allocate {
        #[command(subcommand)]
        kind: AllocateKind,
    },

    /// Add a root block to a class pool
    Provision {
        #[arg(long)]
        class: ResourceClass,
        #[arg(long)]
        cidr: CidrBlock,
    },

    /// Check that a CIDR is well formed
    Validate {
        #[arg(long)]
        cidr: String,
        #[arg(long)]
        class: ResourceClass,
    },

    /// Print the available blocks and allocations of a class pool
    List {
        #[arg(long)]
        class: ResourceClass,
    },
}

#[derive(Subcommand)]
enum AllocateKind {
    /// One subnet from the normal pool
    Normal {
        /// Required prefix length
        #[arg(long)]
        prefix: u8,
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Primary, services and pods ranges from the kubernetes pool
    Kubernetes {
        #[arg(long)]
        primary_prefix: u8,
        #[arg(long)]
        services_prefix: u8,
        #[arg(long)]
        pods_prefix: u8,
        #[command(flatten)]
        request: RequestArgs,
    },
}

#[derive(Args)]
struct RequestArgs {
    #[arg(long)]
    project: Option<String>,

    #[arg(long)]
    host_network: Option<String>,

    /// Requester identity recorded on the allocation
    #[arg(long)]
    owner: Option<String>,

    /// Root blocks to provision before allocating (for the memory backend)
    #[arg(long = "seed")]
    seeds: Vec<CidrBlock>,
}

/// Request identity after environment fallbacks
struct Identity {
    project: String,
    host_network: String,
    owner: String,
}

impl RequestArgs {
    fn identity(&self, defaults: &RequestDefaults) -> Identity {
        let pick = |flag: &Option<String>, fallback: &Option<String>| {
            flag.clone().or_else(|| fallback.clone()).unwrap_or_default()
        };
        Identity {
            project: pick(&self.project, &defaults.project),
            host_network: pick(&self.host_network, &defaults.host_network),
            owner: pick(&self.owner, &defaults.owner),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AllocatorConfig::from_env().context("Failed to load configuration")?;

    if let Command::Validate { cidr, class } = &cli.command {
        return validate(cidr, *class);
    }

    match config.backend {
        Backend::Memory => {
            info!("using in-memory pool store");
            run(SubnetAllocator::new(InMemoryPoolStore::new()), &cli, &config).await
        }
        Backend::Nats => {
            info!(servers = ?config.nats.servers, stream = %config.stream.stream_name, "using NATS pool store");
            let store = NatsPoolStore::connect(&config.nats, config.stream.clone())
                .await
                .context("Failed to open NATS pool store")?;
            run(SubnetAllocator::new(store), &cli, &config).await
        }
    }
}

async fn run<S: AddressPoolStore>(
    allocator: SubnetAllocator<S>,
    cli: &Cli,
    config: &AllocatorConfig,
) -> Result<()> {
    match &cli.command {
        Command::Allocate { kind } => {
            let report = allocate(&allocator, kind, config).await?;
            write_report(&report, &cli.output, &cli.report)?;
            print!("{}", report.render_text());

            if !report.is_success() {
                bail!(
                    "allocation failed: {}",
                    report.message.as_deref().unwrap_or("unknown error")
                );
            }
            Ok(())
        }
        Command::Provision { class, cidr } => {
            allocator
                .provision(*class, *cidr)
                .await
                .with_context(|| format!("Failed to provision {} into the {} pool", cidr, class))?;
            println!("Provisioned {} into the {} pool", cidr, class);
            Ok(())
        }
        Command::List { class } => list(&allocator, *class).await,
        Command::Validate { cidr, class } => validate(cidr, *class),
    }
}

async fn allocate<S: AddressPoolStore>(
    allocator: &SubnetAllocator<S>,
    kind: &AllocateKind,
    config: &AllocatorConfig,
) -> Result<AllocationReport> {
    let (class, request) = match kind {
        AllocateKind::Normal { request, .. } => (ResourceClass::Normal, request),
        AllocateKind::Kubernetes { request, .. } => (ResourceClass::Kubernetes, request),
    };

    let identity = request.identity(&config.defaults);

    // Seeding is part of the run; a bad seed still gets a failure report.
    for seed in &request.seeds {
        if let Err(err) = allocator.provision(class, *seed).await {
            error!(kind = err.kind(), error = %err, seed = %seed, "failed to seed pool");
            return Ok(AllocationReport::failure(
                class,
                Some(identity.project),
                Some(identity.host_network),
                &err,
                0,
            ));
        }
    }

    let report = match kind {
        AllocateKind::Normal { prefix, .. } => {
            let request = NormalRequest::new(
                identity.project.clone(),
                identity.host_network.clone(),
                *prefix,
                identity.owner.clone(),
            );
            let (result, attempts) =
                with_retry(&config.retry, || allocator.allocate_normal(&request)).await;
            match result {
                Ok(allocation) => AllocationReport::normal(&allocation, attempts),
                Err(err) => {
                    error!(kind = err.kind(), error = %err, attempts, "normal allocation failed");
                    AllocationReport::failure(
                        class,
                        Some(identity.project),
                        Some(identity.host_network),
                        &err,
                        attempts,
                    )
                }
            }
        }
        AllocateKind::Kubernetes {
            primary_prefix,
            services_prefix,
            pods_prefix,
            ..
        } => {
            let request = KubernetesRequest::new(
                identity.project.clone(),
                identity.host_network.clone(),
                KubernetesPrefixes::new(*primary_prefix, *services_prefix, *pods_prefix),
                identity.owner.clone(),
            );
            let (result, attempts) =
                with_retry(&config.retry, || allocator.allocate_kubernetes(&request)).await;
            match result {
                Ok(allocation) => AllocationReport::kubernetes(&allocation, attempts),
                Err(err) => {
                    error!(kind = err.kind(), error = %err, attempts, "kubernetes allocation failed");
                    AllocationReport::failure(
                        class,
                        Some(identity.project),
                        Some(identity.host_network),
                        &err,
                        attempts,
                    )
                }
            }
        }
    };

    Ok(report)
}

fn write_report(report: &AllocationReport, output: &Path, text: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize result")?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    std::fs::write(text, report.render_text())
        .with_context(|| format!("Failed to write {}", text.display()))?;
    info!(output = %output.display(), report = %text.display(), "wrote allocation report");
    Ok(())
}

async fn list<S: AddressPoolStore>(allocator: &SubnetAllocator<S>, class: ResourceClass) -> Result<()> {
    let available = allocator
        .available(class)
        .await
        .context("Failed to read available blocks")?;
    let allocations = allocator
        .allocations(class)
        .await
        .context("Failed to read allocations")?;

    println!("Available ({} pool):", class);
    for entry in &available {
        match entry.parent {
            Some(parent) => println!("  {}  (from {})", entry.block, parent),
            None => println!("  {}", entry.block),
        }
    }

    println!("Allocated ({} pool):", class);
    for record in &allocations {
        println!(
            "  {}  {}  project={} host_network={} owner={}",
            record.block, record.role, record.project, record.host_network, record.created_by
        );
    }
    Ok(())
}

fn validate(cidr: &str, class: ResourceClass) -> Result<()> {
    if !validate_cidr_format(cidr) {
        bail!("Invalid CIDR format: {}", cidr);
    }

    let result = serde_json::json!({
        "status": "success",
        "cidr": cidr,
        "type": class,
        "timestamp": Utc::now().to_rfc3339(),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
