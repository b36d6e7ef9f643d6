use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use serde::Serialize;
use tracing::info;

use draft_core::{
    load_faction_registry_from_env, load_generator_config_from_env, load_tile_catalog_from_env,
    seed_from_label, ActorId, ChannelBroadcast, DraftCollaborators, DraftItem, DraftNotice,
    DraftOrchestrator, DraftSettings, DraftVariant, GenerationRequest, NoticeReceiver,
    SliceGenerator, SliceSummary, FACTION_CATEGORY, SEAT_CATEGORY, SLICE_CATEGORY,
};
use draft_runtime::{encode_outcome_json, encode_slices_json, parse_custom_config};

#[derive(Parser, Debug)]
#[command(author, version, about = "Slice draft generator and arbiter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate slices and print them.
    Generate(GenerateArgs),
    /// Parse a custom configuration string and validate it against a fresh draft.
    ParseConfig(ParseConfigArgs),
    /// Run a scripted draft where every actor claims the items matching its index.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Clone)]
struct DraftArgs {
    /// linear, equidistant or bunker.
    #[arg(long, default_value = "linear")]
    variant: DraftVariant,
    #[arg(long, default_value_t = 6)]
    players: usize,
    /// Slice count; the variant default when omitted.
    #[arg(long)]
    slices: Option<usize>,
    /// Push extra wormholes and legendaries into play.
    #[arg(long)]
    extra: bool,
    #[arg(long, conflicts_with = "session")]
    seed: Option<u64>,
    /// Derive the seed from a session name.
    #[arg(long)]
    session: Option<String>,
}

impl DraftArgs {
    fn seed(&self) -> Option<u64> {
        self.seed
            .or_else(|| self.session.as_deref().map(seed_from_label))
    }

    fn request(&self) -> GenerationRequest {
        GenerationRequest {
            variant: self.variant,
            player_count: self.players,
            slice_count: self.slices,
            extra_features: self.extra,
            seed: self.seed(),
        }
    }

    fn settings(&self) -> DraftSettings {
        let actors = (0..self.players as u32).map(ActorId).collect();
        let mut settings = DraftSettings::new(self.variant, actors);
        settings.slice_count = self.slices;
        settings.extra_features = self.extra;
        settings.seed = self.seed();
        settings
    }
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    draft: DraftArgs,
    /// Print the full schema document instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ParseConfigArgs {
    /// Configuration text, e.g. "19 20 21 22 23|24 25 26 27 28&labels=a|b".
    text: String,
    #[command(flatten)]
    draft: DraftArgs,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    #[command(flatten)]
    draft: DraftArgs,
    /// Custom configuration applied before anyone claims.
    #[arg(long)]
    config: Option<String>,
}

#[derive(Serialize)]
struct ParseReport<'a> {
    parsed: &'a draft_runtime::CustomConfig,
    accepted: bool,
    notices: Vec<DraftNotice>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let generator = SliceGenerator::new(load_tile_catalog_from_env(), load_generator_config_from_env());

    match cli.command {
        Command::Generate(args) => run_generate(&generator, &args),
        Command::ParseConfig(args) => run_parse_config(&generator, &args),
        Command::Simulate(args) => run_simulate(&generator, &args),
    }
}

fn run_generate(generator: &SliceGenerator, args: &GenerateArgs) -> Result<()> {
    let generated = generator
        .generate(&args.draft.request())
        .wrap_err("slice generation failed")?;
    let catalog = generator.catalog();

    if args.json {
        let state = generated.to_state(catalog);
        println!("{}", encode_slices_json(&state)?);
        return Ok(());
    }

    println!(
        "{} draft, {} players, {} slices after {} attempt(s)",
        generated.variant,
        generated.player_count,
        generated.slice_count(),
        generated.attempts
    );
    for (summary, tiles) in generated.summaries(catalog).iter().zip(&generated.slices) {
        println!("{}", format_slice(summary, tiles));
    }
    if !generated.ring.is_empty() {
        let ring: Vec<String> = generated.ring.iter().map(ToString::to_string).collect();
        println!("ring: {}", ring.join(" "));
    }
    if !generated.report.fully_resolved() {
        println!("note: some repair passes accepted the layout as-is");
    }
    Ok(())
}

fn format_slice(summary: &SliceSummary, tiles: &[draft_core::TileId]) -> String {
    let ids: Vec<String> = tiles.iter().map(ToString::to_string).collect();
    format!(
        "{:>2}  {:<20} res {:>4.1}  inf {:>4.1}  total {:>4.1}  wormholes {}  legendary {}",
        draft_core::slice_label(summary.index),
        ids.join(" "),
        summary.optimal_resources,
        summary.optimal_influence,
        summary.total,
        summary.wormholes,
        summary.legendaries
    )
}

fn open_draft(
    generator: &SliceGenerator,
    draft: &DraftArgs,
) -> Result<(DraftOrchestrator, NoticeReceiver)> {
    let (broadcast, notices) = ChannelBroadcast::channel();
    let collaborators = DraftCollaborators::new(
        generator.catalog().clone(),
        load_faction_registry_from_env(),
        Box::new(broadcast),
    )
    .with_turn_order(Box::new(|order: &[ActorId]| {
        info!(target: "slice_draft::cli", order = ?order, "turn_order.set");
    }))
    .with_layout(Box::new(|tiles: &[draft_core::TileId]| {
        info!(target: "slice_draft::cli", tiles = tiles.len(), "layout.applied");
    }));
    let orchestrator = DraftOrchestrator::generate(draft.settings(), generator, collaborators)
        .wrap_err("could not open the draft")?;
    Ok((orchestrator, notices))
}

fn run_parse_config(generator: &SliceGenerator, args: &ParseConfigArgs) -> Result<()> {
    let parsed = parse_custom_config(&args.text)?;
    let (mut draft, notices) = open_draft(generator, &args.draft)?;
    let accepted = draft.apply_custom_config(&args.text).is_ok();
    let report = ParseReport {
        parsed: &parsed,
        accepted,
        notices: notices.try_iter().collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    if accepted {
        Ok(())
    } else {
        Err(eyre!("custom configuration rejected"))
    }
}

fn run_simulate(generator: &SliceGenerator, args: &SimulateArgs) -> Result<()> {
    let (mut draft, notices) = open_draft(generator, &args.draft)?;
    if let Some(text) = &args.config {
        draft
            .apply_custom_config(text)
            .wrap_err("custom configuration rejected")?;
    }

    let factions: Vec<String> = draft.factions().iter().map(|f| f.name.clone()).collect();
    for (index, actor) in draft.settings().actors.clone().into_iter().enumerate() {
        draft.claim(actor, SEAT_CATEGORY, DraftItem::Seat(index))?;
        draft.claim(actor, SLICE_CATEGORY, DraftItem::Slice(index))?;
        draft.claim(actor, FACTION_CATEGORY, DraftItem::Faction(factions[index].clone()))?;
    }
    let outcome = draft.commit()?;

    for notice in notices.try_iter() {
        eprintln!("{}", notice);
    }
    println!("{}", encode_outcome_json(&outcome.to_state())?);
    Ok(())
}
