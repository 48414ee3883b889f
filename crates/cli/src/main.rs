use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tether_core::{ClassKind, Gvk, LabelSelector, ManagedKind, Object, WorkItem};
use tether_enqueue::{
    add_claim, add_propagator, EnqueueRequestForClaim, EnqueueRequestForPropagator, EventHandler,
    WorkQueue,
};
use tether_kubehub::{KubeObject, Role, Router};
use tether_predicate::{
    all_of, has_class_reference_kind, has_class_selector, has_labels,
    has_managed_resource_reference_kind, has_no_class_reference, has_no_class_selector,
    has_no_managed_resource_reference, is_controlled_by_kind, is_managed_kind, is_propagated,
    is_propagator, propagated_from, propagated_to, DeclaredTypeResolver, EventPredicates,
    Predicate,
};
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tetherctl", version, about = "Tether CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Kubernetes namespace (default: all namespaces)
    #[arg(long = "ns", global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Mapper { Claim, Propagator }

#[derive(Args, Debug, Clone, Default)]
struct KindArgs {
    /// Managed resource kind, e.g. "database.example.org/v1alpha1/MySQLInstance"
    #[arg(long = "managed-kind")]
    managed_kind: Option<String>,
    /// Resource class kind
    #[arg(long = "class-kind")]
    class_kind: Option<String>,
    /// Controller owner kind
    #[arg(long = "controller-kind")]
    controller_kind: Option<String>,
    /// Label selector, e.g. "tier=fast,env!=prod,!legacy"
    #[arg(short = 'l', long = "selector")]
    selector: Option<String>,
}

struct Kinds {
    managed: Option<Gvk>,
    class: Option<Gvk>,
    controller: Option<Gvk>,
    selector: Option<LabelSelector>,
}

impl KindArgs {
    fn resolve(&self) -> Result<Kinds> {
        let parse = |flag: &str, v: &Option<String>| -> Result<Option<Gvk>> {
            v.as_deref()
                .map(|s| Gvk::from_str(s).with_context(|| format!("parsing --{flag}")))
                .transpose()
        };
        Ok(Kinds {
            managed: parse("managed-kind", &self.managed_kind)?,
            class: parse("class-kind", &self.class_kind)?,
            controller: parse("controller-kind", &self.controller_kind)?,
            selector: self
                .selector
                .as_deref()
                .map(|s| s.parse::<LabelSelector>().context("parsing --selector"))
                .transpose()?,
        })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify an object manifest and show the work items it maps to
    Classify {
        /// Manifest file (YAML or JSON)
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
        /// Capabilities the object's kind supports: claim, managed or plain
        #[arg(long = "role", default_value_t = Role::Plain)]
        role: Role,
        #[command(flatten)]
        kinds: KindArgs,
    },
    /// Watch objects for a GVK and print the work items their events produce
    Watch {
        /// GVK key, e.g. "v1/Secret" or "database.example.org/v1alpha1/MySQLInstance"
        gvk: String,
        #[arg(long = "role", default_value_t = Role::Plain)]
        role: Role,
        /// Event-to-work-item mapping to apply
        #[arg(long = "mapper", value_enum, default_value_t = Mapper::Claim)]
        mapper: Mapper,
        #[command(flatten)]
        kinds: KindArgs,
    },
}

#[derive(Debug, Serialize)]
struct Verdict {
    classifier: &'static str,
    result: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    namespace: Option<String>,
    name: String,
    verdicts: Vec<Verdict>,
    propagated_from: Option<WorkItem>,
    propagated_to: Option<WorkItem>,
    claim: Vec<WorkItem>,
    propagator: Vec<WorkItem>,
}

fn classifiers(kinds: &Kinds) -> Vec<(&'static str, Predicate)> {
    let mut out = vec![
        ("is_propagator", is_propagator()),
        ("is_propagated", is_propagated()),
        ("has_class_selector", has_class_selector()),
        ("has_no_class_selector", has_no_class_selector()),
        ("has_no_class_reference", has_no_class_reference()),
        ("has_no_managed_resource_reference", has_no_managed_resource_reference()),
    ];
    if let Some(g) = &kinds.managed {
        out.push(("has_managed_resource_reference_kind", has_managed_resource_reference_kind(ManagedKind(g.clone()))));
        out.push(("is_managed_kind", is_managed_kind(ManagedKind(g.clone()), DeclaredTypeResolver)));
    }
    if let Some(g) = &kinds.class {
        out.push(("has_class_reference_kind", has_class_reference_kind(ClassKind(g.clone()))));
    }
    if let Some(g) = &kinds.controller {
        out.push(("is_controlled_by_kind", is_controlled_by_kind(g.clone())));
    }
    if let Some(sel) = &kinds.selector {
        out.push(("has_labels", has_labels(sel.clone())));
    }
    out
}

fn classify(obj: &dyn Object, kinds: &Kinds) -> Report {
    let verdicts = classifiers(kinds)
        .into_iter()
        .map(|(classifier, p)| Verdict { classifier, result: p.matches(obj) })
        .collect();
    let claim = WorkQueue::with_capacity(4);
    add_claim(obj, &claim);
    let propagator = WorkQueue::with_capacity(4);
    add_propagator(obj, &propagator);
    Report {
        namespace: obj.namespace().map(str::to_string),
        name: obj.name().to_string(),
        verdicts,
        propagated_from: propagated_from(obj),
        propagated_to: propagated_to(obj),
        claim: claim.drain_ready(),
        propagator: propagator.drain_ready(),
    }
}

/// Narrow events to the kinds given on the command line; no flags admit everything.
fn watch_filter(kinds: &Kinds) -> Predicate {
    let mut ps = Vec::new();
    if let Some(g) = &kinds.managed {
        ps.push(is_managed_kind(ManagedKind(g.clone()), DeclaredTypeResolver));
    }
    if let Some(g) = &kinds.class {
        ps.push(has_class_reference_kind(ClassKind(g.clone())));
    }
    if let Some(g) = &kinds.controller {
        ps.push(is_controlled_by_kind(g.clone()));
    }
    if let Some(sel) = &kinds.selector {
        ps.push(has_labels(sel.clone()));
    }
    all_of(ps)
}

fn print_report(r: &Report, output: Output) -> Result<()> {
    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(r)?),
        Output::Human => {
            println!("{}/{}", r.namespace.as_deref().unwrap_or("-"), r.name);
            for v in &r.verdicts {
                println!("  {:<36} {}", v.classifier, v.result);
            }
            if let Some(from) = &r.propagated_from {
                println!("  propagated from {}", from);
            }
            if let Some(to) = &r.propagated_to {
                println!("  propagates to   {}", to);
            }
            for item in &r.claim {
                println!("  claim      -> {}", item);
            }
            for item in &r.propagator {
                println!("  propagator -> {}", item);
            }
        }
    }
    Ok(())
}

fn flush(queue: &WorkQueue, output: Output) {
    for item in queue.drain_ready() {
        match output {
            Output::Human => println!("{}", item),
            Output::Json => match serde_json::to_string(&item) {
                Ok(s) => println!("{}", s),
                Err(e) => error!(error = %e, "encoding work item"),
            },
        }
    }
}

fn init_tracing() {
    let env = std::env::var("TETHER_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("TETHER_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid TETHER_METRICS_ADDR; expected host:port");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { file, role, kinds } => {
            let kinds = kinds.resolve()?;
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let raw: serde_json::Value = serde_yaml::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;
            let obj = KubeObject::from_manifest(raw, role)?;
            info!(name = obj.name(), role = %role, "classify invoked");
            print_report(&classify(&obj, &kinds), cli.output)?;
        }
        Commands::Watch { gvk, role, mapper, kinds } => {
            let kinds = kinds.resolve()?;
            let ns = cli.namespace.as_deref();
            info!(gvk = %gvk, ns = ?ns, mapper = ?mapper, "watch invoked");
            let handler: Arc<dyn EventHandler> = match mapper {
                Mapper::Claim => Arc::new(EnqueueRequestForClaim),
                Mapper::Propagator => Arc::new(EnqueueRequestForPropagator),
            };
            let router = Router::new(EventPredicates::new(watch_filter(&kinds)), handler);
            let queue = WorkQueue::from_env();

            let watch = tether_kubehub::run_watch(&gvk, ns, role, &router, &queue);
            tokio::pin!(watch);
            let mut ticker = tokio::time::interval(Duration::from_millis(250));
            loop {
                tokio::select! {
                    res = &mut watch => {
                        flush(&queue, cli.output);
                        if let Err(e) = res {
                            error!(error = ?e, "watcher failed");
                            return Err(e);
                        }
                        break;
                    }
                    _ = ticker.tick() => flush(&queue, cli.output),
                    _ = signal::ctrl_c() => {
                        info!("interrupted; stopping watch");
                        flush(&queue, cli.output);
                        break;
                    }
                }
            }
            if queue.dropped() > 0 {
                info!(dropped = queue.dropped(), "work items evicted at queue capacity");
            }
        }
    }
    Ok(())
}
