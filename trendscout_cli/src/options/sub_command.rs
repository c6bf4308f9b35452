use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// fetch interest over time for keywords.
    Fetch {
        /// Comma separated keywords. Duplicates and blanks are dropped.
        #[clap(short, long, value_delimiter = ',', required = true)]
        keywords: Vec<String>,
    },
    /// fetch the curated growth niches.
    Curated,
    /// compare selected curated niches with custom products.
    Compare {
        /// Comma separated curated niches, at most 6.
        #[clap(short, long, value_delimiter = ',')]
        selected: Vec<String>,
        /// Comma separated custom products, at most 6.
        #[clap(short, long, value_delimiter = ',')]
        custom: Vec<String>,
    },
    /// list the supported region codes.
    Regions,
}
