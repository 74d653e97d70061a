use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use qi_core::{
    Analysis, Branch, ChartInput, EngineConfig, Gender, PatternRegistry, Pillar, TransformStatus,
    analyze, export_json,
};

#[derive(Parser)]
#[command(name = "qi", about = "Four-pillar qi accounting engine")]
struct Cli {
    /// Engine config file (TOML). Falls back to $QI_CONFIG, then defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a chart
    Analyze {
        /// Year pillar, e.g. JiaZi or 甲子
        #[arg(long)]
        year: Pillar,
        #[arg(long)]
        month: Pillar,
        #[arg(long)]
        day: Pillar,
        #[arg(long)]
        hour: Pillar,

        /// Ten-year luck pillar
        #[arg(long)]
        luck: Option<Pillar>,
        #[arg(long)]
        annual: Option<Pillar>,
        #[arg(long)]
        monthly: Option<Pillar>,
        #[arg(long)]
        daily: Option<Pillar>,
        #[arg(long)]
        hourly: Option<Pillar>,

        /// Talisman pillar (repeatable)
        #[arg(long = "talisman")]
        talismans: Vec<Pillar>,

        /// Reference month branch for seasonal strength
        #[arg(long)]
        month_branch: Option<Branch>,

        #[arg(long, default_value = "male")]
        gender: Gender,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Print every unit's ledger history
        #[arg(long)]
        explain: bool,
    },

    /// Show the validated pattern evaluation order
    Registry,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os("QI_CONFIG").map(PathBuf::from));
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    read_config(&path)
}

fn read_config(path: &Path) -> Result<EngineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "config loaded");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Analyze {
            year,
            month,
            day,
            hour,
            luck,
            annual,
            monthly,
            daily,
            hourly,
            talismans,
            month_branch,
            gender,
            format,
            explain,
        } => {
            let input = ChartInput {
                natal: [*year, *month, *day, *hour],
                luck: *luck,
                annual: *annual,
                monthly: *monthly,
                daily: *daily,
                hourly: *hourly,
                talismans: talismans.clone(),
                gender: *gender,
                month_branch: *month_branch,
            };
            cmd_analyze(&cli, &input, *format, *explain)
        }
        Commands::Registry => cmd_registry(),
    }
}

fn cmd_analyze(cli: &Cli, input: &ChartInput, format: OutputFormat, explain: bool) -> Result<()> {
    let config = load_config(cli)?;
    let registry = PatternRegistry::standard().context("failed to build pattern registry")?;
    let analysis = analyze(&registry, &config, input).context("analysis failed")?;

    match format {
        OutputFormat::Json => {
            let json = export_json(&analysis).context("failed to serialize analysis")?;
            println!("{json}");
        }
        OutputFormat::Text => print!("{}", render_text(input, &analysis, explain)),
    }
    Ok(())
}

fn render_text(input: &ChartInput, analysis: &Analysis, explain: bool) -> String {
    let mut out = String::new();
    let natal: Vec<String> = input.natal.iter().map(Pillar::to_string).collect();
    let glyphs: Vec<String> = input.natal.iter().map(Pillar::glyphs).collect();
    let _ = writeln!(out, "chart:      {} ({})", natal.join(" "), glyphs.join(" "));

    match (analysis.season.month_branch, analysis.season.ruling_element) {
        (Some(b), Some(e)) => {
            let _ = writeln!(out, "season:     {b} ({e})");
        }
        _ => {
            let _ = writeln!(out, "season:     neutral");
        }
    }

    let dm = &analysis.day_master;
    let _ = writeln!(
        out,
        "day master: {} ({}) qi={:.2} support={:.2} drain={:.2} {}",
        dm.stem,
        dm.element,
        dm.qi,
        dm.support,
        dm.drain,
        if dm.strong { "strong" } else { "weak" }
    );

    let _ = writeln!(out, "\nmatches:    {}", analysis.matches.len());
    for m in &analysis.matches {
        let who: Vec<String> = m.participants.iter().map(|p| p.to_string()).collect();
        let status = match m.transformation {
            TransformStatus::Transformed => " transformed",
            TransformStatus::Partial => " partial",
            TransformStatus::NotApplicable => "",
        };
        let _ = writeln!(
            out,
            "  [{}] {:<20} {:<14} {} extent={} total={:.2}{status}",
            m.index,
            m.spec_id,
            m.name,
            who.join(", "),
            m.extent,
            m.score.total,
        );
    }

    let _ = writeln!(out, "\nnodes:");
    for n in &analysis.nodes {
        let _ = writeln!(
            out,
            "  {:<22} {:<5} {:>8.2} -> {:>8.2}",
            n.id.to_string(),
            n.symbol.to_string(),
            n.base_qi,
            n.final_qi
        );
    }

    let _ = writeln!(out, "\nelements:");
    for (e, total) in analysis.element_totals() {
        let _ = writeln!(out, "  {:<6} {total:>8.2}", e.as_str());
    }

    let s = &analysis.summary;
    let _ = writeln!(
        out,
        "\nevents:     {} (+{:.2} / {:.2})",
        s.event_count, s.total_positive, s.total_negative
    );

    if explain {
        let _ = writeln!(out, "\nhistory:");
        for u in analysis.units() {
            let _ = writeln!(out, "{}", analysis.ledger.narrative(u.id));
        }
    }
    out
}

fn cmd_registry() -> Result<()> {
    let registry = PatternRegistry::standard().context("failed to build pattern registry")?;
    for (i, spec) in registry.order().iter().enumerate() {
        let deps = if spec.depends_on.is_empty() {
            "-".to_string()
        } else {
            spec.depends_on.join(", ")
        };
        println!(
            "{:>2}. {:<20} {:?}/{} base={:<4} after: {deps}",
            i + 1,
            spec.id,
            spec.filter.layer,
            spec.filter.arity,
            spec.base_score,
        );
        if !spec.contradicts.is_empty() {
            println!("    excludes: {}", spec.contradicts.join(", "));
        }
    }
    println!("catalog entries: {}", registry.catalog().len());
    Ok(())
}
