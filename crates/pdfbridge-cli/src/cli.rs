use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pdfbridge::ItemKind;

/// Inspect PDF outlines, links and text, filter content streams, and
/// exercise handler bridging.
#[derive(Debug, Parser)]
#[command(name = "pdfbridge", about, version)]
pub struct Cli {
    /// Log engine activity at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Display page count, password state and metadata
    Info {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Password for encrypted PDFs
        #[arg(long)]
        password: Option<String>,
    },

    /// Walk the outline (table of contents) depth-first
    Outline {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Password for encrypted PDFs
        #[arg(long)]
        password: Option<String>,
    },

    /// List link annotations
    Links {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Password for encrypted PDFs
        #[arg(long)]
        password: Option<String>,
    },

    /// Remove content items from pages and save the result
    Filter {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Where to write the filtered PDF
        #[arg(long, short, value_name = "OUT")]
        output: PathBuf,

        /// Item kinds to remove (repeatable)
        #[arg(long, value_enum)]
        drop: Vec<DropKind>,

        /// Keep the first item of each stream, drop the second, and so on
        #[arg(long)]
        every_other: bool,

        /// Also filter Form XObjects placed on the pages
        #[arg(long)]
        recurse: bool,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Password for encrypted PDFs
        #[arg(long)]
        password: Option<String>,
    },

    /// List page fonts and how they resolve
    Fonts {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Font file returned by the system-font hooks
        #[arg(long, value_name = "FONTFILE")]
        substitute: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Password for encrypted PDFs
        #[arg(long)]
        password: Option<String>,
    },

    /// Print page text, optionally character by character
    Text {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// List every character with its origin, size and font
        #[arg(long)]
        chars: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Password for encrypted PDFs
        #[arg(long)]
        password: Option<String>,
    },

    /// Find text on pages, ignoring case
    Search {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Text to find; whitespace matches any run of spaces or line breaks
        #[arg(value_name = "TEXT")]
        needle: String,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Most quads reported per page
        #[arg(long, default_value_t = 20)]
        max_hits: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Password for encrypted PDFs
        #[arg(long)]
        password: Option<String>,
    },

    /// Run the engine self-checks against one or more PDFs
    Check {
        /// PDF files to check
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON output
    Json,
}

/// Item kinds accepted by `filter --drop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DropKind {
    /// Text-showing operators
    Text,
    /// Painted paths and shadings
    Paths,
    /// Image XObjects, forms and inline images
    Images,
}

impl DropKind {
    /// The filter item kinds removed for this flag.
    pub fn item_kinds(self) -> &'static [ItemKind] {
        match self {
            DropKind::Text => &[ItemKind::Text],
            DropKind::Paths => &[ItemKind::Path, ItemKind::Shading],
            DropKind::Images => &[ItemKind::XObject, ItemKind::InlineImage],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_info_subcommand_with_file() {
        let cli = Cli::parse_from(["pdfbridge", "info", "test.pdf"]);
        assert!(!cli.verbose);
        match cli.command {
            Commands::Info {
                ref file, format, ..
            } => {
                assert_eq!(file, &PathBuf::from("test.pdf"));
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("expected Info subcommand"),
        }
    }

    #[test]
    fn parse_outline_json_with_verbose_after_subcommand() {
        let cli = Cli::parse_from(["pdfbridge", "outline", "doc.pdf", "--format", "json", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Outline {
                format: OutputFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn parse_filter_with_repeated_drop() {
        let cli = Cli::parse_from([
            "pdfbridge",
            "filter",
            "in.pdf",
            "--output",
            "out.pdf",
            "--drop",
            "text",
            "--drop",
            "images",
            "--recurse",
        ]);
        match cli.command {
            Commands::Filter {
                ref output,
                ref drop,
                every_other,
                recurse,
                ..
            } => {
                assert_eq!(output, &PathBuf::from("out.pdf"));
                assert_eq!(drop, &[DropKind::Text, DropKind::Images]);
                assert!(!every_other);
                assert!(recurse);
            }
            _ => panic!("expected Filter subcommand"),
        }
    }

    #[test]
    fn filter_requires_output() {
        let result = Cli::try_parse_from(["pdfbridge", "filter", "in.pdf"]);
        assert!(result.is_err());
    }

    #[test]
    fn check_requires_a_file() {
        assert!(Cli::try_parse_from(["pdfbridge", "check"]).is_err());
        let cli = Cli::parse_from(["pdfbridge", "check", "a.pdf", "b.pdf"]);
        match cli.command {
            Commands::Check { ref files } => assert_eq!(files.len(), 2),
            _ => panic!("expected Check subcommand"),
        }
    }

    #[test]
    fn parse_search_with_default_max_hits() {
        let cli = Cli::parse_from(["pdfbridge", "search", "doc.pdf", "compression"]);
        match cli.command {
            Commands::Search {
                ref needle,
                max_hits,
                format,
                ..
            } => {
                assert_eq!(needle, "compression");
                assert_eq!(max_hits, 20);
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("expected Search subcommand"),
        }
        assert!(Cli::try_parse_from(["pdfbridge", "search", "doc.pdf"]).is_err());
    }

    #[test]
    fn parse_text_with_chars() {
        let cli = Cli::parse_from(["pdfbridge", "text", "doc.pdf", "--chars", "--pages", "2"]);
        match cli.command {
            Commands::Text {
                chars, ref pages, ..
            } => {
                assert!(chars);
                assert_eq!(pages.as_deref(), Some("2"));
            }
            _ => panic!("expected Text subcommand"),
        }
    }

    #[test]
    fn drop_kinds_map_to_items() {
        assert_eq!(DropKind::Text.item_kinds(), &[ItemKind::Text]);
        assert!(DropKind::Images.item_kinds().contains(&ItemKind::InlineImage));
    }
}
