use clap::{arg, command};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitescout")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitescout")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress the run header, progress and summary").required(false))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("discover")
                .about(
                    "List the pages a site publishes through robots.txt, sitemaps, feeds and \
                llms.txt. Never crawls HTML links.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The site to inspect; a bare domain gets https://")
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of sites to inspect")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(--"max-depth" <DEPTH>)
                        .required(false)
                        .help("How deep nested sitemap indexes are followed")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(-c --"concurrency" <NUM>)
                        .required(false)
                        .help("Fetches in flight at once")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("8"),
                )
                .arg(
                    arg!(--"max-children" <NUM>)
                        .required(false)
                        .help("Child sitemaps followed per sitemap index")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("500"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"deadline" <SECONDS>)
                        .required(false)
                        .help("Stop each site after this many seconds and report what was found")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"retries" <NUM>)
                        .required(false)
                        .help("Retries for 429, 5xx and connection failures")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("2"),
                )
                .arg(
                    arg!(--"user-agent" <UA>)
                        .required(false)
                        .help("User-Agent header sent with every request"),
                )
                .arg(
                    arg!(--"no-feeds")
                        .required(false)
                        .help("Skip RSS/Atom feed probing")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"llms-txt")
                        .required(false)
                        .help("Also read links from /llms.txt")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"same-domain")
                        .required(false)
                        .help("Keep only pages on the site's own domain (www. and port ignored)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"pages-only")
                        .required(false)
                        .help("Drop images, scripts, stylesheets, archives and other assets")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: print to stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(["text", "json", "csv", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-v --"verbose" ...)
                        .required(false)
                        .help("Log to stderr; repeat for more detail (-v info, -vv debug, -vvv trace)"),
                ),
        )
}
