mod check_cmd;
mod cli;
mod filter_cmd;
mod fonts_cmd;
mod info_cmd;
mod links_cmd;
mod outline_cmd;
mod page_range;
mod search_cmd;
mod shared;
mod text_cmd;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    shared::init_tracing(cli.verbose);

    let result = match cli.command {
        cli::Commands::Info {
            ref file,
            format,
            ref password,
        } => info_cmd::run(file, format, password.as_deref()),
        cli::Commands::Outline {
            ref file,
            format,
            ref password,
        } => outline_cmd::run(file, format, password.as_deref()),
        cli::Commands::Links {
            ref file,
            ref pages,
            format,
            ref password,
        } => links_cmd::run(file, pages.as_deref(), format, password.as_deref()),
        cli::Commands::Filter {
            ref file,
            ref output,
            ref drop,
            every_other,
            recurse,
            ref pages,
            ref password,
        } => filter_cmd::run(filter_cmd::FilterArgs {
            file,
            output,
            drop,
            every_other,
            recurse,
            pages: pages.as_deref(),
            password: password.as_deref(),
        }),
        cli::Commands::Fonts {
            ref file,
            ref pages,
            ref substitute,
            format,
            ref password,
        } => fonts_cmd::run(
            file,
            pages.as_deref(),
            substitute.as_deref(),
            format,
            password.as_deref(),
        ),
        cli::Commands::Text {
            ref file,
            ref pages,
            chars,
            format,
            ref password,
        } => text_cmd::run(file, pages.as_deref(), chars, format, password.as_deref()),
        cli::Commands::Search {
            ref file,
            ref needle,
            ref pages,
            max_hits,
            format,
            ref password,
        } => search_cmd::run(
            file,
            needle,
            pages.as_deref(),
            max_hits,
            format,
            password.as_deref(),
        ),
        cli::Commands::Check { ref files } => check_cmd::run(files),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
