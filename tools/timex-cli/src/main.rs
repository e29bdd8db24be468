use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use timex_grammar::{CompiledGrammar, RuleMatch, TemporalType, TimexDictionary, TimexOptions};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Compiles timex grammars and matches text against them")]
struct Cli {
    /// Compare rule regexes and normalization tables case-sensitively
    #[arg(long, global = true)]
    case_sensitive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a grammar and report every error
    Check {
        #[arg(value_name = "GRAMMAR")]
        grammar: PathBuf,
    },
    /// Match text against a grammar and print the matches as JSON
    Match {
        #[arg(value_name = "GRAMMAR")]
        grammar: PathBuf,

        text: String,

        /// Match the whole text against each rule's anchored pattern
        #[arg(long, conflicts_with = "raw")]
        exact: bool,

        /// Print every rule match as a raw record, without overlap or
        /// negative-rule filtering
        #[arg(long)]
        raw: bool,

        /// Temporal types to report: `all` or a list such as `date,time`
        #[arg(long, default_value = "all", value_parser = parse_types)]
        types: TemporalType,
    },
}

fn parse_types(list: &str) -> Result<TemporalType, String> {
    TemporalType::from_list(list).ok_or_else(|| format!("unknown temporal type in '{}'", list))
}

/// JSON shape of one match.
#[derive(Serialize)]
struct MatchReport<'a> {
    value: &'a str,
    index: usize,
    rule_id: &'a str,
    rule_type: &'static str,
    timex: &'a TimexDictionary,
}

impl<'a> From<&'a RuleMatch> for MatchReport<'a> {
    fn from(found: &'a RuleMatch) -> Self {
        Self {
            value: &found.value,
            index: found.index,
            rule_id: &found.rule_id,
            rule_type: found.rule_type.name(),
            timex: &found.timex_dictionary,
        }
    }
}

fn load(path: &Path, options: TimexOptions) -> anyhow::Result<CompiledGrammar> {
    let xml = fs::read_to_string(path).with_context(|| format!("reading grammar {}", path.display()))?;

    match CompiledGrammar::from_xml(&xml, options) {
        Ok(grammar) => Ok(grammar),
        Err(errors) => {
            for error in &errors {
                eprintln!("error: {}", error);
            }
            bail!("{} failed to load with {} error(s)", path.display(), errors.len())
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let options = if cli.case_sensitive {
        TimexOptions::CASE_SENSITIVE
    } else {
        TimexOptions::empty()
    };

    match cli.command {
        Command::Check { grammar } => {
            let compiled = load(&grammar, options)?;
            info!(path = %grammar.display(), "grammar is valid");
            println!(
                "{}: {} rules, {} negative rules",
                grammar.display(),
                compiled.rules().len(),
                compiled.negative_rules().len()
            );
        }
        Command::Match {
            grammar,
            text,
            exact,
            raw,
            types,
        } => {
            let compiled = load(&grammar, options)?;

            if raw {
                let matches: Vec<RuleMatch> = compiled
                    .match_all(&text)?
                    .into_iter()
                    .filter(|found| types.intersects(found.rule_type))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&matches)?);
                return Ok(());
            }

            let matches: Vec<RuleMatch> = if exact {
                compiled.match_exact_typed(&text, types)?.into_iter().collect()
            } else {
                compiled.extract(&text, types)?
            };

            let report: Vec<MatchReport> = matches.iter().map(MatchReport::from).collect();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_match_arguments() {
        let cli = Cli::try_parse_from(["timex", "match", "g.xml", "see you tomorrow", "--types", "date,time"]).unwrap();
        match cli.command {
            Command::Match {
                grammar,
                text,
                exact,
                raw,
                types,
            } => {
                assert_eq!(grammar, PathBuf::from("g.xml"));
                assert_eq!(text, "see you tomorrow");
                assert!(!exact && !raw);
                assert_eq!(types, TemporalType::DATE | TemporalType::TIME);
            }
            Command::Check { .. } => panic!("expected match"),
        }
        assert!(!cli.case_sensitive);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(Cli::try_parse_from(["timex", "match", "g.xml", "x", "--types", "weekday"]).is_err());
        assert!(Cli::try_parse_from(["timex", "match", "g.xml", "x", "--exact", "--raw"]).is_err());

        let cli = Cli::try_parse_from(["timex", "check", "g.xml", "--case-sensitive"]).unwrap();
        assert!(cli.case_sensitive);
    }

    #[test]
    fn test_report_shape() {
        let grammar = CompiledGrammar::from_xml(
            r#"<grammar><rule id="tomorrow" type="date" example="tomorrow"><item>tomorrow<tag>timex["offset_days"] = "1"</tag></item></rule></grammar>"#,
            TimexOptions::empty(),
        )
        .unwrap();
        let matches = grammar.extract("see you tomorrow", TemporalType::all()).unwrap();
        let json = serde_json::to_value(MatchReport::from(&matches[0])).unwrap();

        assert_eq!(json["value"], "tomorrow");
        assert_eq!(json["index"], 8);
        assert_eq!(json["rule_type"], "date");
        assert_eq!(json["timex"]["offset_days"], "1");

        let raw = serde_json::to_value(&matches[0]).unwrap();
        assert_eq!(raw["rule_id"], "tomorrow");
        assert_eq!(raw["timex_dictionary"]["offset_days"], "1");
        let back: RuleMatch = serde_json::from_value(raw).unwrap();
        assert_eq!(back, matches[0]);
    }
}
