// Drawsheet entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Initialize tracing (stderr, so stdout stays clean for listings)
// 3. Load config, creating config/tournament.toml from defaults if needed
// 4. Open the database and load the tournament
// 5. Run the command, saving if it changed anything

mod cli;

use anyhow::Context;
use clap::Parser;
use drawsheet_core::config;
use drawsheet_core::db::Database;
use drawsheet_core::model::{Club, Entrant, Match, Official};
use drawsheet_core::{Tournament, TournamentSettings};
use tracing::info;

use cli::{Actions, Cli, Command, EntrantCommand, ScoreAction, Scores};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to resolve working directory")?,
    };
    let config = config::load_config_at(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: {}, {} courts, best of {} to {}",
        config.tournament.name,
        config.schedule.courts.len(),
        config.scoring.games_to_win * 2 - 1,
        config.scoring.target_points
    );

    let db_path = base_dir.join(&config.db_path);
    let db_path = db_path.to_string_lossy();
    let db = Database::open(&db_path).context("failed to open database")?;
    info!("Database opened at {}", db_path);

    let mut tournament = Tournament::load(
        &db,
        config.tournament.name.clone(),
        TournamentSettings::from(&config),
    )
    .context("failed to load tournament")?;

    if run(&mut tournament, cli.command)? {
        tournament.save(&db).context("failed to save tournament")?;
        info!("Tournament saved");
    }
    Ok(())
}

/// Execute one command. Returns whether the tournament was modified.
fn run(t: &mut Tournament, command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Entrant { action } => match action {
            EntrantCommand::Add {
                id,
                name,
                rank,
                points,
                partner,
                club,
            } => {
                let mut entrant = Entrant::new(id, name, rank).with_points(points);
                entrant.partner_name = partner;
                entrant.club = club;
                let label = format!("{} (rank {})", entrant.display_name(), entrant.rank);
                t.add_entrant(entrant)?;
                println!("Added {label}");
                Ok(true)
            }
            EntrantCommand::List => {
                let mut entrants: Vec<&Entrant> = t.entrants.iter().collect();
                entrants.sort_by_key(|e| e.rank);
                for e in entrants {
                    println!("{:>3}  {:<8} {}", e.rank, e.id, e.display_name());
                }
                Ok(false)
            }
        },
        Command::Official {
            id,
            name,
            level,
            inactive,
        } => {
            t.add_official(Official {
                id,
                name,
                level,
                active: !inactive,
            });
            Ok(true)
        }
        Command::Club {
            id,
            name,
            location,
            manager,
        } => {
            t.add_club(Club {
                id,
                name,
                location,
                manager,
            });
            Ok(true)
        }
        Command::Draw => {
            let count = t.generate_draw();
            println!("Main draw: {} entrants, {} matches", t.entrants.len(), count);
            Ok(true)
        }
        Command::Plate => {
            let count = t.generate_plate()?;
            println!("Plate: {count} matches");
            Ok(true)
        }
        Command::Groups { count } => {
            for group in t.generate_groups(count)? {
                let names: Vec<String> = group.entrants.iter().map(|e| e.display_name()).collect();
                println!("Group {}: {}", group.letter, names.join(", "));
            }
            Ok(true)
        }
        Command::Schedule => {
            let placed = t.auto_schedule();
            println!("Scheduled {placed} matches");
            Ok(placed > 0)
        }
        Command::Place {
            match_id,
            court,
            time,
            force,
        } => {
            if let Some(conflict) = t.place_match(&match_id, &court, time, force)? {
                println!("Overridden: {conflict}");
            }
            println!("{} on {} at {}", match_id, court, time.format("%H:%M"));
            Ok(true)
        }
        Command::Result {
            match_id,
            scores: Scores(games),
        } => {
            let progression = t.record_result(&match_id, games)?;
            print_progression(&match_id, &progression);
            Ok(true)
        }
        Command::Score {
            match_id,
            actions: Actions(actions),
        } => {
            let mut scorer = t.scorer(&match_id)?;
            for action in actions {
                match action {
                    ScoreAction::Point(side) => scorer.score(side)?,
                    ScoreAction::Decision(decision, side) => scorer.decision(decision, side)?,
                    ScoreAction::Warning(side) => scorer.conduct_warning(side)?,
                    ScoreAction::Swap => scorer.swap_sides()?,
                    ScoreAction::Undo => scorer.undo()?,
                }
            }
            let [p1, p2] = scorer.points();
            let [g1, g2] = scorer.games();
            println!("{}: games {g1}-{g2}, points {p1}-{p2}", scorer.record().title());
            if let Some(ball) = scorer.game_ball() {
                println!("{:?} ball to {}", ball.kind, ball.side);
            }
            let progression = t.commit_scorer(scorer)?;
            print_progression(&match_id, &progression);
            Ok(true)
        }
        Command::Walkover { match_id, side } => {
            let progression = t.walkover(&match_id, side)?;
            print_progression(&match_id, &progression);
            Ok(true)
        }
        Command::Referees => {
            let assigned = t.assign_referees()?;
            println!("Assigned referees to {assigned} matches");
            Ok(assigned > 0)
        }
        Command::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&t.matches)?);
            } else {
                println!("{}", t.name);
                for m in t.matches.iter() {
                    println!("{}", match_line(m));
                }
            }
            Ok(false)
        }
        Command::Standings { group } => {
            let letters = match group {
                Some(letter) => vec![letter],
                None => t.group_letters(),
            };
            for letter in letters {
                println!("Group {letter}");
                for row in t.standings(letter) {
                    println!(
                        "  {:<24} P{} W{} L{} {:+} {}pts",
                        row.entrant.display_name(),
                        row.played,
                        row.wins,
                        row.losses,
                        row.game_difference(),
                        row.points
                    );
                }
            }
            Ok(false)
        }
        Command::Report { match_id } => {
            println!("{}", t.report(&match_id)?);
            Ok(false)
        }
        Command::H2h { first, second } => {
            let h2h = t.head_to_head(&first, &second);
            println!(
                "{} {}-{} {} over {} meetings",
                h2h.first,
                h2h.first_wins,
                h2h.second_wins,
                h2h.second,
                h2h.meetings.len()
            );
            Ok(false)
        }
    }
}

fn print_progression(match_id: &str, progression: &drawsheet_core::bracket::Progression) {
    if let Some((next, side)) = &progression.winner_to {
        println!("{match_id} winner -> {next} ({side})");
    }
    if let Some((plate, side)) = &progression.loser_to {
        println!("{match_id} loser -> {plate} ({side})");
    }
}

fn match_line(m: &Match) -> String {
    let when = m
        .schedule
        .as_ref()
        .map(|s| format!("{} {}", s.start.format("%H:%M"), s.court))
        .unwrap_or_else(|| "unscheduled".to_string());
    let scores: Vec<String> = m.scores.iter().map(|g| g.to_string()).collect();
    format!(
        "{:<14} {:<22} {:<40} {:?} {} [{}]",
        m.id,
        m.round_name,
        m.title(),
        m.status,
        scores.join(" "),
        when
    )
}

/// Initialize tracing to stderr; `RUST_LOG` overrides the default filter.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("drawsheet=info,drawsheet_core=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
