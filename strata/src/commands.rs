use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("strata")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("strata")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Writes a sample walk configuration")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Where to write the configuration file")
                        .default_value("strata.json"),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing file at the specified location.")
                        .required(false),
                ),
        )
        .subcommand(
            command!("check")
                .about("Validates a walk configuration and its selectors without fetching anything")
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(true)
                        .help("Path to the walk configuration file")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("walk")
                .about(
                    "Walk a site depth by depth, following the links each target selects, \
                and save every URL discovered.",
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(true)
                        .help("Path to the walk configuration file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-u --"seed-url" <URL>)
                        .required(false)
                        .help("Override the seed URL from the configuration"),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Override the output directory")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Record dump format: json, sqlite")
                        .value_parser(["json", "sqlite"]),
                )
                .arg(
                    arg!(-a --"user-agent" <UA>)
                        .required(false)
                        .help("Send a fixed User-Agent instead of rotating the built-in list"),
                )
                .arg(
                    arg!(-r --"retries" <NUM>)
                        .required(false)
                        .help("Retries per request on timeouts, 429 and 5xx responses")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    arg!(-b --"backoff" <FACTOR>)
                        .required(false)
                        .help("Backoff factor in seconds, doubled on each retry")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(-t --"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"terminal-out" <PATH>)
                        .required(false)
                        .help("Also write the terminal frontier as JSON to this path")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"no-progress")
                        .required(false)
                        .help("Disable the progress spinner")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_walk_overrides_parse() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "strata",
                "walk",
                "-c",
                "shop.json",
                "--format",
                "sqlite",
                "--retries",
                "3",
                "--backoff",
                "0.5",
                "-v",
            ])
            .unwrap();

        let (name, walk) = matches.subcommand().unwrap();
        assert_eq!(name, "walk");
        assert_eq!(walk.get_one::<String>("format").unwrap(), "sqlite");
        assert_eq!(*walk.get_one::<u32>("retries").unwrap(), 3);
        assert_eq!(*walk.get_one::<f64>("backoff").unwrap(), 0.5);
        assert!(walk.get_flag("verbose"));
    }

    #[test]
    fn test_walk_requires_config() {
        let result = command_argument_builder().try_get_matches_from(["strata", "walk"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = command_argument_builder().try_get_matches_from([
            "strata", "walk", "-c", "x.json", "--format", "xml",
        ]);
        assert!(result.is_err());
    }
}
