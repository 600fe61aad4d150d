use sitescout::commands::command_argument_builder;
use sitescout::handlers::{handle_discover, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    match chosen_command.subcommand() {
        Some(("discover", primary_command)) => {
            init_tracing(primary_command.get_count("verbose"));
            handle_discover(primary_command, quiet).await
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
