use clap::Parser;
use proptest::prelude::*;

use omegafold_task::cli::CliArgs;
use omegafold_task::types::RunName;

fn parse_with_name(name: &str) -> Result<CliArgs, clap::Error> {
    CliArgs::try_parse_from(["omegafold-task", "--run-name", name, "--input-file", "seq.fasta"])
}

#[test]
fn names_with_space_or_slash_are_rejected() {
    assert!(parse_with_name("bad run").is_err());
    assert!(parse_with_name("bad/run").is_err());
    assert!(parse_with_name("").is_err());
}

#[test]
fn plain_names_are_accepted() {
    let args = parse_with_name("Good-Run_1").unwrap();
    assert_eq!(args.run_name.as_str(), "Good-Run_1");
}

proptest! {
    #[test]
    fn accepts_exactly_the_safe_alphabet(name in "\\PC{0,16}") {
        let safe = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        prop_assert_eq!(RunName::parse(&name).is_ok(), safe);
    }

    #[test]
    fn safe_names_round_trip_through_the_cli(name in "[A-Za-z0-9_-]{1,24}") {
        prop_assume!(!name.starts_with('-'));
        let args = parse_with_name(&name).unwrap();
        prop_assert_eq!(args.run_name.as_str(), name.as_str());
    }
}
