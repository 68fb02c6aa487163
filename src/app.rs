use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

pub fn build_cli() -> Command {
    Command::new("palantir")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Author and watch status-grid dashboards")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("create")
                .about("Create an empty dashboard in the directory specified")
                .arg(Arg::new("dir").help("Dashboard directory").required(true).index(1))
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .help("Name of the dashboard")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Add or remove rows and columns")
                .arg(Arg::new("dir").help("Dashboard directory").required(true).index(1))
                .arg(multi("addrow", "Add a row"))
                .arg(multi("rmrow", "Remove a row"))
                .arg(multi("addcol", "Add a column"))
                .arg(multi("rmcol", "Remove a column")),
        )
        .subcommand(
            Command::new("cell")
                .about("Update a specific cell by row/column id")
                .arg(Arg::new("dir").help("Dashboard directory").required(true).index(1))
                .arg(Arg::new("row").short('r').long("row").help("Row id of the cell").required(true))
                .arg(Arg::new("col").short('c').long("col").help("Column id of the cell").required(true))
                .arg(Arg::new("settext").long("settext").help("New text"))
                .arg(Arg::new("setbgcolor").long("setbgcolor").help("New background color (hex, e.g. #f5f5f5)"))
                .arg(Arg::new("settxtcolor").long("settxtcolor").help("New text color (hex)"))
                .arg(
                    Arg::new("setanimate")
                        .long("setanimate")
                        .help("Animation")
                        .value_parser(["none", "wave", "toggle", "bars"]),
                )
                .arg(
                    Arg::new("setbool")
                        .long("setbool")
                        .help("Cell boolean")
                        .value_parser(["True", "False", "None", "true", "false", "none"]),
                )
                .arg(
                    Arg::new("addimage")
                        .long("addimage")
                        .help("Attach an image to the cell")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("rmimage")
                        .long("rmimage")
                        .help("Remove the image at this index")
                        .value_parser(value_parser!(usize)),
                )
                .arg(Arg::new("addnote").long("addnote").help("Add a note to the cell")),
        )
        .subcommand(
            Command::new("watch")
                .about("Poll a dashboard and keep a rendered page up to date")
                .arg(
                    Arg::new("source")
                        .help("Dashboard directory or base URL (default: $PALANTIR_SOURCE)")
                        .index(1),
                )
                .arg(
                    Arg::new("interval")
                        .long("interval")
                        .help("Seconds between refreshes")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("delay")
                        .long("delay")
                        .help("Milliseconds to wait before each fetch")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Where to write the rendered page")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("cycles")
                        .long("cycles")
                        .help("Stop after this many refreshes")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("templates")
                        .long("templates")
                        .help("Directory of *.html templates")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("detail")
                .about("Render the detail view of one item")
                .arg(Arg::new("source").help("Dashboard directory or base URL").required(true).index(1))
                .arg(Arg::new("id").help("Item id, e.g. row-col").required(true).index(2))
                .arg(
                    Arg::new("templates")
                        .long("templates")
                        .help("Directory of *.html templates")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

fn multi(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .num_args(1..)
        .action(ArgAction::Append)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn update_collects_repeated_values() {
        let m = build_cli()
            .try_get_matches_from(["palantir", "update", "board", "--addrow", "web", "db", "--addcol", "cpu"])
            .unwrap();
        let sub = m.subcommand_matches("update").unwrap();
        let rows: Vec<&String> = sub.get_many::<String>("addrow").unwrap().collect();
        assert_eq!(rows, ["web", "db"]);
        assert!(sub.get_many::<String>("rmcol").is_none());
    }

    #[test]
    fn cell_rejects_unknown_animation() {
        let res = build_cli().try_get_matches_from([
            "palantir", "cell", "board", "-r", "web", "-c", "cpu", "--setanimate", "blink",
        ]);
        assert!(res.is_err());
    }
}
