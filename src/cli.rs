//! Command-line argument parsing for the `rsm` and `ccu` binaries, grounded
//! in the teacher's `clap` derive usage (styled help, `ValueEnum` for a
//! closed set of string choices, a custom `Display` impl used both for help
//! text and for echoing the parsed value back into log output).

use clap::builder::styling::{AnsiColor, Styles};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default())
        .usage(AnsiColor::Yellow.on_default())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Session-preparation profile requested on the CCU command line, per §4.11
/// and §6. Controls which parameter-accept messages are sent once line
/// state comes up, grounded in `uvm_main.c`'s per-mode message sequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RadarMode {
    /// DR: sends PrinyatParametrySdr then PrinyatParametryTsd.
    Dr,
    /// OR: sends PrinyatParametrySo(knk=400), 3TSO(1024), TimeRef, Reper.
    Or,
    /// OR1: identical session-prep sequence to OR.
    Or1,
    /// VR: sends PrinyatParametrySo(knk=500), 3TSO(512).
    Vr,
}

impl std::fmt::Display for RadarMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RadarMode::Dr => "DR",
            RadarMode::Or => "OR",
            RadarMode::Or1 => "OR1",
            RadarMode::Vr => "VR",
        };
        write!(f, "{s}")
    }
}

/// CCU (controlling unit) command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Radar link emulator CCU", styles = styles())]
pub struct CcuArgs {
    /// Operating mode controlling the session-preparation message sequence.
    #[arg(value_enum, default_value_t = RadarMode::Dr)]
    pub mode: RadarMode,

    /// Path to the INI-style configuration file.
    #[arg(long, default_value = "ccu.ini")]
    pub config: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// RSM (simulated unit) command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Radar link emulator RSM", styles = styles())]
pub struct RsmArgs {
    /// Path to the INI-style configuration file.
    #[arg(long, default_value = "rsm.ini")]
    pub config: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccu_defaults_to_dr_mode() {
        let args = CcuArgs::parse_from(["ccu"]);
        assert_eq!(args.mode, RadarMode::Dr);
        assert_eq!(args.config, PathBuf::from("ccu.ini"));
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn ccu_accepts_mode_and_flags() {
        let args = CcuArgs::parse_from(["ccu", "or1", "--config", "alt.ini", "-vv"]);
        assert_eq!(args.mode, RadarMode::Or1);
        assert_eq!(args.config, PathBuf::from("alt.ini"));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn radar_mode_display_matches_spec_names() {
        assert_eq!(RadarMode::Dr.to_string(), "DR");
        assert_eq!(RadarMode::Or1.to_string(), "OR1");
        assert_eq!(RadarMode::Vr.to_string(), "VR");
    }

    #[test]
    fn rsm_parses_config_and_verbosity() {
        let args = RsmArgs::parse_from(["rsm", "--config", "rsm2.ini", "-v"]);
        assert_eq!(args.config, PathBuf::from("rsm2.ini"));
        assert_eq!(args.verbose, 1);
    }
}
