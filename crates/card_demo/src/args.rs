//! Command-line argument parsing for the card demo.
//
// This stays hand-rolled; two flags and one operand do not justify a parser
// dependency.

/// Result of parsing command-line arguments.
#[derive(Clone)]
pub struct ParsedArgs {
    pub verbose: bool,
    /// Checkout URL to open; the first non-flag operand.
    pub url: Option<String>,
}

/// Parse command-line arguments.
pub fn parse_args() -> ParsedArgs {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    let url = args.iter().skip(1).find(|a| !a.starts_with('-')).cloned();
    ParsedArgs { verbose, url }
}
