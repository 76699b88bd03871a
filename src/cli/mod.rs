//! CLI command definitions and parsing
use crate::action::Verb;
use crate::filtering::FilterSpec;
use crate::patterns::MatchMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "kwild",
    version,
    author = "neur0map",
    about = "Wildcard selection of Kubernetes resources",
    long_about = "kwild reads a `kubectl get <kind> -o json` listing, selects resources by name pattern \
                  (glob, regex, substring or fuzzy), namespace, labels, annotations, age, node and pod \
                  health, then prints or runs the matching kubectl invocations in batches."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/kwild/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Get matching resources
    Get {
        #[command(flatten)]
        select: SelectArgs,

        /// Print a per-value count of this label for the matches
        #[arg(long, value_name = "KEY")]
        group_by_label: Option<String>,
    },

    /// Describe matching resources
    Describe {
        #[command(flatten)]
        select: SelectArgs,
    },

    /// Delete matching resources
    Delete {
        #[command(flatten)]
        select: SelectArgs,

        /// Skip the confirmation threshold
        #[arg(short, long)]
        yes: bool,

        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,

        /// Pass --dry-run=server to kubectl
        #[arg(long)]
        server_dry_run: bool,

        /// Refuse to delete more than N resources without --yes (0 disables)
        #[arg(long, value_name = "N")]
        confirm_threshold: Option<usize>,
    },

    /// Show resource usage of matching resources
    Top {
        #[command(flatten)]
        select: SelectArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

impl Commands {
    /// Verb and selection for resource commands, `None` for `config`
    pub fn selection(&self) -> Option<(Verb, &SelectArgs)> {
        match self {
            Commands::Get { select, .. } => Some((Verb::Get, select)),
            Commands::Describe { select } => Some((Verb::Describe, select)),
            Commands::Delete { select, .. } => Some((Verb::Delete, select)),
            Commands::Top { select } => Some((Verb::Top, select)),
            Commands::Config { .. } => None,
        }
    }
}

/// Resource selection flags shared by every verb
#[derive(Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Resource kind, e.g. pods, svc, deployments
    pub resource: String,

    /// Name pattern (glob unless another mode is chosen)
    pub pattern: Option<String>,

    /// Resource list JSON from `kubectl get <kind> -o json` ("-" for stdin)
    #[arg(short = 'f', long, value_name = "FILE", default_value = "-")]
    pub input: String,

    /// Named filter profile from the config file
    #[arg(long)]
    pub profile: Option<String>,

    /// Use glob matching (the default; overrides a configured mode)
    #[arg(long, conflicts_with_all = ["regex", "contains", "fuzzy"])]
    pub glob: bool,

    /// Use regex matching
    #[arg(long, conflicts_with_all = ["contains", "fuzzy"])]
    pub regex: bool,

    /// Use substring matching
    #[arg(long, conflicts_with = "fuzzy")]
    pub contains: bool,

    /// Use fuzzy matching (tolerates hashed pod name suffixes)
    #[arg(long)]
    pub fuzzy: bool,

    /// Max edit distance for fuzzy matching
    #[arg(long, value_name = "N")]
    pub fuzzy_distance: Option<usize>,

    /// Match names starting with VAL (repeatable)
    #[arg(short, long, value_name = "VAL")]
    pub prefix: Vec<String>,

    /// Add an include pattern (repeatable)
    #[arg(long = "match", value_name = "PATTERN")]
    pub includes: Vec<String>,

    /// Add an exclude pattern (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// Case-insensitive matching
    #[arg(long)]
    pub ignore_case: bool,

    /// Target namespace; wildcards like 'prod-*' select across namespaces
    #[arg(short, long, value_name = "NS")]
    pub namespace: Option<String>,

    /// The listing spans all namespaces
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Filter to an exact namespace (repeatable)
    #[arg(long = "ns", value_name = "NS")]
    pub ns: Vec<String>,

    /// Filter namespaces by prefix (repeatable)
    #[arg(long, value_name = "PFX")]
    pub ns_prefix: Vec<String>,

    /// Filter namespaces by regex (repeatable)
    #[arg(long, value_name = "RE")]
    pub ns_regex: Vec<String>,

    /// Label value glob, key=glob (repeatable)
    #[arg(long = "label", value_name = "KEY=GLOB")]
    pub label: Vec<String>,

    /// Label value prefix, key=prefix
    #[arg(long, value_name = "KEY=PFX")]
    pub label_prefix: Vec<String>,

    /// Label value substring, key=substring
    #[arg(long, value_name = "KEY=SUB")]
    pub label_contains: Vec<String>,

    /// Label value regex, key=regex
    #[arg(long, value_name = "KEY=RE")]
    pub label_regex: Vec<String>,

    /// Require a label key matching this regex
    #[arg(long, value_name = "RE")]
    pub label_key_regex: Vec<String>,

    /// Annotation value glob, key=glob
    #[arg(long = "annotation", value_name = "KEY=GLOB")]
    pub annotation: Vec<String>,

    /// Annotation value prefix, key=prefix
    #[arg(long, value_name = "KEY=PFX")]
    pub annotation_prefix: Vec<String>,

    /// Annotation value substring, key=substring
    #[arg(long, value_name = "KEY=SUB")]
    pub annotation_contains: Vec<String>,

    /// Annotation value regex, key=regex
    #[arg(long, value_name = "KEY=RE")]
    pub annotation_regex: Vec<String>,

    /// Require an annotation key matching this regex
    #[arg(long, value_name = "RE")]
    pub annotation_key_regex: Vec<String>,

    /// Pod phase or container reason (repeatable, any may match)
    #[arg(long, value_name = "STATUS")]
    pub pod_status: Vec<String>,

    /// Only pods that are neither clean Running nor Succeeded
    #[arg(long)]
    pub unhealthy: bool,

    /// Only resources older than DURATION (e.g. 1h, 7d, 1h30m)
    #[arg(long, value_name = "DURATION")]
    pub older_than: Option<String>,

    /// Only resources younger than DURATION
    #[arg(long, value_name = "DURATION")]
    pub younger_than: Option<String>,

    /// Restart count expression: >N, >=N, <N, <=N, =N
    #[arg(long, value_name = "EXPR", allow_hyphen_values = true)]
    pub restarts: Option<String>,

    /// Only pods with at least one container not ready
    #[arg(long)]
    pub containers_not_ready: bool,

    /// Container reason that must be present (repeatable, all required)
    #[arg(long, value_name = "REASON")]
    pub reason: Vec<String>,

    /// Scope --reason to one container
    #[arg(long, value_name = "NAME")]
    pub container_name: Option<String>,

    /// Exact node name (repeatable)
    #[arg(long, value_name = "NAME")]
    pub node: Vec<String>,

    /// Node name prefix
    #[arg(long, value_name = "PFX")]
    pub node_prefix: Vec<String>,

    /// Node name regex
    #[arg(long, value_name = "RE")]
    pub node_regex: Vec<String>,

    /// Names per kubectl invocation
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,
}

impl SelectArgs {
    pub fn mode(&self) -> Option<MatchMode> {
        if self.glob {
            Some(MatchMode::Glob)
        } else if self.regex {
            Some(MatchMode::Regex)
        } else if self.contains {
            Some(MatchMode::Contains)
        } else if self.fuzzy {
            Some(MatchMode::Fuzzy)
        } else {
            None
        }
    }

    /// Whether candidates from several namespaces are in play
    pub fn spans_namespaces(&self) -> bool {
        self.all_namespaces || self.namespace.as_deref().is_some_and(has_wildcard)
    }

    /// Layer the command-line flags over `spec` (defaults plus any profile)
    ///
    /// Prefix includes are added after the mode is settled, so `-p` always
    /// means "starts with" in the final mode.
    pub fn apply_to(&self, spec: &mut FilterSpec) {
        if let Some(mode) = self.mode() {
            spec.mode = Some(mode);
        }
        spec.ignore_case |= self.ignore_case;
        if self.fuzzy_distance.is_some() {
            spec.fuzzy_distance = self.fuzzy_distance;
        }

        spec.includes.extend(self.pattern.iter().cloned());
        spec.includes.extend(self.includes.iter().cloned());
        for prefix in &self.prefix {
            spec.add_prefix_include(prefix);
        }
        spec.excludes.extend(self.excludes.iter().cloned());

        spec.all_namespaces |= self.spans_namespaces();
        match self.namespace.as_deref() {
            Some(ns) if has_wildcard(ns) => spec.namespaces.glob.push(ns.to_string()),
            Some(ns) => spec.namespaces.exact.push(ns.to_string()),
            None => {}
        }
        spec.namespaces.exact.extend(self.ns.iter().cloned());
        spec.namespaces.prefix.extend(self.ns_prefix.iter().cloned());
        spec.namespaces.regex.extend(self.ns_regex.iter().cloned());

        spec.labels.glob.extend(self.label.iter().cloned());
        spec.labels.prefix.extend(self.label_prefix.iter().cloned());
        spec.labels.contains.extend(self.label_contains.iter().cloned());
        spec.labels.regex.extend(self.label_regex.iter().cloned());
        spec.labels.key_regex.extend(self.label_key_regex.iter().cloned());

        spec.annotations.glob.extend(self.annotation.iter().cloned());
        spec.annotations.prefix.extend(self.annotation_prefix.iter().cloned());
        spec.annotations.contains.extend(self.annotation_contains.iter().cloned());
        spec.annotations.regex.extend(self.annotation_regex.iter().cloned());
        spec.annotations.key_regex.extend(self.annotation_key_regex.iter().cloned());

        if self.older_than.is_some() {
            spec.older_than = self.older_than.clone();
        }
        if self.younger_than.is_some() {
            spec.younger_than = self.younger_than.clone();
        }

        let health = &mut spec.health;
        if self.restarts.is_some() {
            health.restarts = self.restarts.clone();
        }
        health.containers_not_ready |= self.containers_not_ready;
        health.reasons.extend(self.reason.iter().cloned());
        if self.container_name.is_some() {
            health.container = self.container_name.clone();
        }
        health.pod_statuses.extend(self.pod_status.iter().cloned());
        health.unhealthy |= self.unhealthy;

        spec.nodes.exact.extend(self.node.iter().cloned());
        spec.nodes.prefix.extend(self.node_prefix.iter().cloned());
        spec.nodes.regex.extend(self.node_regex.iter().cloned());
    }
}

fn has_wildcard(value: &str) -> bool {
    value.contains(['*', '?', '['])
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
