//! Raceday CLI - run simulated race meetings and settle wagers against them

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use raceday::core::{normalize_probabilities, seed_from_str};
use raceday::ledger::{analyze_by_kind, analyze_by_odds_range, calculate_metrics, DimensionAnalysis};
use raceday::models::Category;
use raceday::{
    load_race_card, spawn_race, BetType, BettingLedger, EngineConfig, LegSelection, Odds,
    RaceCard, RaceEvent, RaceResult, RaceSimulator, RaceSpec, SettlementRecord, SyntheticMarket,
    WagerStatus,
};

const DEFAULT_MEETING: &str = "Synthetic Downs";

#[derive(Parser)]
#[command(name = "raceday")]
#[command(author, version, about = "Simulated race meetings and wagering ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Engine config file (TOML)
    #[arg(long, env = "RACEDAY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the market for each race on a card
    Market {
        /// Race card JSON (a synthetic card is generated if omitted)
        #[arg(long)]
        card: Option<PathBuf>,

        /// Seed for the synthetic card
        #[arg(long, default_value = "1")]
        seed: u64,
    },

    /// Simulate races and print the finishing order
    Simulate {
        /// Race card JSON (a synthetic card is generated if omitted)
        #[arg(long)]
        card: Option<PathBuf>,

        /// Only run this race
        #[arg(long)]
        race: Option<String>,

        /// Race seed (derived from the race id if omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Run on the wall clock, ticking at the configured interval
        #[arg(long)]
        realtime: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a synthetic meeting, bet on it, run it and settle
    Demo {
        /// Number of races
        #[arg(long, default_value = "4")]
        races: u32,

        /// Runners per race
        #[arg(long, default_value = "8")]
        field: usize,

        /// Race category (horse, greyhound, harness, ...)
        #[arg(long, default_value = "horse")]
        category: String,

        /// Stake per wager
        #[arg(long, default_value = "20")]
        stake: f64,

        /// Meeting seed
        #[arg(long, default_value = "2024")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = load_config(cli.config.as_deref())?;

    println!("{}", "Raceday CLI v0.1.0".cyan().bold());
    println!();

    if cli.interactive {
        run_interactive(&config)?;
    } else if let Some(command) = cli.command {
        match command {
            Commands::Market { card, seed } => {
                let card = load_card(card.as_deref(), seed)?;
                show_market(&card, &config);
            }
            Commands::Simulate {
                card,
                race,
                seed,
                realtime,
                json,
            } => {
                let card = load_card(card.as_deref(), seed.unwrap_or(1))?;
                run_simulate(&card, &config, race.as_deref(), seed, realtime, json)?;
            }
            Commands::Demo {
                races,
                field,
                category,
                stake,
                seed,
            } => {
                run_demo(&config, races, field, Category::new(category), stake, seed)?;
            }
        }
    } else {
        println!("Use --help for usage information or --interactive for interactive mode.");
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => {
            let config = EngineConfig::load(p)
                .with_context(|| format!("Failed to load config from {:?}", p))?;
            info!("Loaded engine config from {:?}", p);
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn load_card(path: Option<&Path>, seed: u64) -> Result<RaceCard> {
    match path {
        Some(p) => {
            load_race_card(p).with_context(|| format!("Failed to load race card from {:?}", p))
        }
        None => Ok(SyntheticMarket::default().generate_card(
            DEFAULT_MEETING,
            Category::horse(),
            4,
            8,
            0,
            seed,
        )),
    }
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    Ok(pb)
}

fn show_market(card: &RaceCard, config: &EngineConfig) {
    println!("{} {}", "Meeting:".yellow().bold(), card.meeting);

    for race in &card.races {
        let quote = race.quote();
        let odds: Vec<Odds> = quote.runners.iter().map(|r| r.odds).collect();
        let probs = normalize_probabilities(&odds);
        let terms = config.place_terms.for_category(&race.category);

        println!();
        println!(
            "{} {} ({}, {} runners, {} places paid)",
            format!("R{}", race.race_number).green().bold(),
            race.race_id,
            race.category,
            quote.field_size(),
            terms.places_paid(quote.field_size())
        );
        println!(
            "{:>4} {:<18} {:>8} {:>8} {:>8}",
            "No", "Runner", "Win", "Place", "Prob"
        );
        println!("{}", "-".repeat(50));

        for (runner, p) in quote.runners.iter().zip(&probs) {
            let win = runner.odds.resolve(config.default_starting_price_odds);
            println!(
                "{:>4} {:<18} {:>8} {:>8.2} {:>7.1}%",
                runner.number,
                truncate_name(&runner.name, 18),
                runner.odds.to_string(),
                terms.place_odds(win),
                p * 100.0
            );
        }

        match quote.overround() {
            Some(book) => println!("{}", format!("Book: {:.1}%", book * 100.0).dimmed()),
            None => println!("{}", "Book: no priced runners".dimmed()),
        }
    }
}

fn select_races<'a>(card: &'a RaceCard, race: Option<&str>) -> Result<Vec<&'a RaceSpec>> {
    match race {
        Some(id) => {
            let spec = card
                .race(id)
                .with_context(|| format!("Race {} is not on the card", id))?;
            Ok(vec![spec])
        }
        None => Ok(card.races.iter().collect()),
    }
}

fn run_simulate(
    card: &RaceCard,
    config: &EngineConfig,
    race: Option<&str>,
    seed: Option<u64>,
    realtime: bool,
    json: bool,
) -> Result<()> {
    let races = select_races(card, race)?;

    let mut results = Vec::with_capacity(races.len());
    for spec in races {
        let race_seed = seed.unwrap_or_else(|| seed_from_str(&spec.race_id));
        let sim = RaceSimulator::from_config(spec.clone(), race_seed, config)
            .with_context(|| format!("Cannot simulate race {}", spec.race_id))?;

        let result = if realtime {
            run_realtime(sim)?
        } else {
            let pb = spinner(format!("Running {}...", spec.race_id))?;
            let mut sim = sim;
            let outcome = sim.run_to_completion(spec.advertised_start_ms);
            pb.finish_and_clear();
            outcome.map(|(result, ticks)| {
                info!("{} finished after {} ticks", spec.race_id, ticks);
                result
            })
        };

        match result {
            Some(result) => {
                if !json {
                    print_result(spec, &result);
                }
                results.push(result);
            }
            None => println!("{} {}", spec.race_id, "did not finish".red()),
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).context("Failed to serialize results")?
        );
    }
    Ok(())
}

/// Drive one race on the tokio interval, showing the leader's progress
fn run_realtime(sim: RaceSimulator) -> Result<Option<RaceResult>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    let race_id = sim.race_id().to_string();
    let names: Vec<(String, String)> = sim
        .spec()
        .competitors
        .iter()
        .map(|c| (c.id.clone(), c.name.clone()))
        .collect();

    let pb = ProgressBar::new(1000);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("=>-"),
    );
    pb.set_prefix(race_id);

    let result = runtime.block_on(async move {
        let mut handle = spawn_race(sim);
        let mut result = None;
        while let Some(event) = handle.next_event().await {
            match event {
                RaceEvent::Tick(tick) => {
                    let leader = tick.order.first().cloned().unwrap_or_default();
                    let progress = tick.progress_of(&leader).unwrap_or(0.0);
                    let name = names
                        .iter()
                        .find(|(id, _)| *id == leader)
                        .map(|(_, n)| n.as_str())
                        .unwrap_or("-");
                    pb.set_position((progress * 1000.0) as u64);
                    pb.set_message(format!(
                        "{} leads, {:.1}s to go",
                        name,
                        tick.remaining_ms as f64 / 1000.0
                    ));
                }
                RaceEvent::Finished(r) => {
                    result = Some(r);
                }
            }
        }
        pb.finish_and_clear();

        match result {
            Some(r) => Some(r),
            None => handle.wait().await,
        }
    });
    Ok(result)
}

fn print_result(spec: &RaceSpec, result: &RaceResult) {
    println!(
        "{} {} ({}) seed={}",
        "Result".yellow().bold(),
        spec.race_id,
        spec.meeting,
        result.seed
    );
    println!("{:>4} {:>4} {:<18} {:>10}", "Pos", "No", "Runner", "Time");
    println!("{}", "-".repeat(40));

    for (pos, finish) in result.finish_times_ms.iter().enumerate() {
        let (number, name) = spec
            .competitor(&finish.competitor_id)
            .map(|c| (c.number, c.name.as_str()))
            .unwrap_or((0, finish.competitor_id.as_str()));
        let line = format!(
            "{:>4} {:>4} {:<18} {:>9.2}s",
            pos + 1,
            number,
            truncate_name(name, 18),
            finish.time_ms as f64 / 1000.0
        );
        if pos == 0 {
            println!("{}", line.green());
        } else {
            println!("{}", line);
        }
    }
    println!();
}

/// Runners by shortest price, starting price last
fn by_price(spec: &RaceSpec, sp: f64) -> Vec<&str> {
    let mut runners: Vec<(&str, f64)> = spec
        .competitors
        .iter()
        .map(|c| (c.id.as_str(), c.odds.resolve(sp)))
        .collect();
    runners.sort_by(|a, b| a.1.total_cmp(&b.1));
    runners.into_iter().map(|(id, _)| id).collect()
}

fn run_demo(
    config: &EngineConfig,
    races: u32,
    field: usize,
    category: Category,
    stake: f64,
    seed: u64,
) -> Result<()> {
    let card = SyntheticMarket::default().generate_card(DEFAULT_MEETING, category, races, field, 0, seed);
    let mut ledger = BettingLedger::new(config);
    let sp = config.default_starting_price_odds;

    println!(
        "{}: {} races at {}, balance {:.2}",
        "Demo".green(),
        card.races.len(),
        card.meeting,
        ledger.bankroll().available
    );
    println!();

    // Singles on the top of each market
    let quotes: Vec<_> = card.races.iter().map(|r| r.quote()).collect();
    for (spec, quote) in card.races.iter().zip(&quotes) {
        let ranked = by_price(spec, sp);
        let bets = [BetType::Win, BetType::EachWay, BetType::Place];
        for (competitor, bet) in ranked.iter().zip(bets) {
            match ledger.place_single(quote, competitor, stake, bet) {
                Ok(w) => println!(
                    "  {} {:<9} {:<10} {} @ {:.2} (returns {:.2})",
                    w.id, w.kind.to_string(), spec.race_id, w.legs[0].competitor_name, w.legs[0].win_odds, w.potential_return
                ),
                Err(e) => println!("  {} {}", "rejected:".red(), e),
            }
        }
    }

    // One multi across every favourite
    let favourites: Vec<&str> = card
        .races
        .iter()
        .filter_map(|r| by_price(r, sp).first().copied())
        .collect();
    if (2..=config.max_legs_per_multi).contains(&favourites.len()) {
        let selections: Vec<LegSelection> = quotes
            .iter()
            .zip(&favourites)
            .map(|(q, c)| LegSelection::new(q, c))
            .collect();
        match ledger.place_multi(&selections, stake) {
            Ok(w) => println!(
                "  {} {:<9} {} legs (returns {:.2})",
                w.id,
                w.kind.to_string(),
                w.legs.len(),
                w.potential_return
            ),
            Err(e) => println!("  {} {}", "rejected:".red(), e),
        }
    }
    println!();

    let pb = ProgressBar::new(card.races.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(card.races.len());
    for spec in &card.races {
        pb.set_message(spec.race_id.clone());
        let mut sim = RaceSimulator::from_config(spec.clone(), seed ^ seed_from_str(&spec.race_id), config)
            .with_context(|| format!("Cannot simulate race {}", spec.race_id))?;
        if let Some((result, _)) = sim.run_to_completion(spec.advertised_start_ms) {
            results.push(result);
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    for (spec, result) in card.races.iter().zip(&results) {
        print_result(spec, result);
    }

    let records = ledger.settle_many(&results);
    print_settlements(&records);
    print_summary(&ledger, &records);
    Ok(())
}

fn print_settlements(records: &[SettlementRecord]) {
    println!("{}", "Settlements:".yellow().bold());
    println!(
        "{:>8} {:>9} {:>16} {:>9} {:>10} {:>10}",
        "Wager", "Kind", "Status", "Stake", "Payout", "P/L"
    );
    println!("{}", "-".repeat(68));

    for r in records {
        let status = match r.status {
            WagerStatus::Won => r.status.to_string().green(),
            WagerStatus::SettledPartial => r.status.to_string().yellow(),
            WagerStatus::Lost => r.status.to_string().red(),
            _ => r.status.to_string().normal(),
        };
        println!(
            "{:>8} {:>9} {:>16} {:>9.2} {:>10.2} {:>10.2}",
            r.wager_id.to_string(),
            r.kind.to_string(),
            status,
            r.stake,
            r.payout,
            r.profit_loss
        );
        println!("         {}", r.breakdown.dimmed());
    }
    println!();
}

fn print_summary(ledger: &BettingLedger, records: &[SettlementRecord]) {
    let bank = ledger.bankroll();
    let metrics = calculate_metrics(records);

    println!("{}", "Bankroll:".yellow().bold());
    println!("  Available:   {:>10.2}", bank.available);
    println!("  Locked:      {:>10.2}", bank.locked);
    println!("  Turnover:    {:>10.2}", bank.turnover);
    let pnl = format!("{:>10.2}", bank.settled_pnl);
    println!(
        "  Settled P/L: {}",
        if bank.settled_pnl >= 0.0 { pnl.green() } else { pnl.red() }
    );
    println!("  Open wagers: {:>10}", ledger.open_wagers().len());
    println!();

    println!("{}", "Performance:".yellow().bold());
    println!(
        "  Settled {} (won {}, partial {}, lost {}, void {})",
        metrics.settled, metrics.wins, metrics.partials, metrics.losses, metrics.voids
    );
    println!("  Hit rate:      {:>8.1}%", metrics.hit_rate * 100.0);
    println!("  ROI:           {:>8.1}%", metrics.roi * 100.0);
    println!("  Profit factor: {:>8.2}", metrics.profit_factor);
    println!("  Max drawdown:  {:>8.2}", metrics.max_drawdown);

    print_dimension("Analysis by Kind:", &analyze_by_kind(records));
    print_dimension("Analysis by Odds Range:", &analyze_by_odds_range(records));
}

fn print_dimension(title: &str, analysis: &[DimensionAnalysis]) {
    if analysis.is_empty() {
        return;
    }
    println!("\n{}", title.yellow().bold());
    println!(
        "{:>12} {:>8} {:>8} {:>10} {:>12} {:>10}",
        "Key", "Wagers", "Hits", "Hit Rate", "Profit", "ROI"
    );
    println!("{}", "-".repeat(65));
    for a in analysis {
        println!(
            "{:>12} {:>8} {:>8} {:>9.1}% {:>12.2} {:>9.1}%",
            a.key,
            a.wagers,
            a.hits,
            a.hit_rate * 100.0,
            a.profit,
            a.roi * 100.0
        );
    }
}

fn run_interactive(config: &EngineConfig) -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!("Choose Quit to exit.\n");

    let theme = ColorfulTheme::default();

    loop {
        let options = vec!["Show a market", "Simulate a race", "Run a demo meeting", "Quit"];

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => {
                let seed: u64 = Input::with_theme(&theme)
                    .with_prompt("Card seed")
                    .default(1)
                    .interact_text()?;

                println!();
                show_market(&load_card(None, seed)?, config);
                println!();
            }
            1 => {
                let seed: u64 = Input::with_theme(&theme)
                    .with_prompt("Race seed")
                    .default(1)
                    .interact_text()?;

                let realtime = Select::with_theme(&theme)
                    .with_prompt("Run on the wall clock?")
                    .items(&["No", "Yes"])
                    .default(0)
                    .interact()?
                    == 1;

                let card = load_card(None, seed)?;
                let first = card.races.first().map(|r| r.race_id.clone());
                println!();
                run_simulate(&card, config, first.as_deref(), Some(seed), realtime, false)?;
            }
            2 => {
                let races: u32 = Input::with_theme(&theme)
                    .with_prompt("Number of races")
                    .default(4)
                    .interact_text()?;

                let stake: f64 = Input::with_theme(&theme)
                    .with_prompt("Stake per wager")
                    .default(20.0)
                    .interact_text()?;

                println!();
                run_demo(config, races, 8, Category::horse(), stake, 2024)?;
                println!();
            }
            3 => {
                println!("Goodbye!");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Truncate name to fit display width
fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        name.to_string()
    } else {
        name.chars().take(max_len - 1).collect::<String>() + "…"
    }
}
