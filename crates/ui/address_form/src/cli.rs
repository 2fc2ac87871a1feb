use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "address-form",
    version,
    about = "Address form with live geocoding suggestions and map preview"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Cmd>,

    /// Geocoding search endpoint (overrides the configuration file)
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Tick rate, i.e. number of ticks per second
    #[arg(short, long, global = true, value_name = "FLOAT", default_value_t = 4.0)]
    pub tick_rate: f64,

    /// Frame rate, i.e. number of frames per second
    #[arg(short, long, global = true, value_name = "FLOAT", default_value_t = 30.0)]
    pub frame_rate: f64,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Run interactive TUI (default)
    Run,
    /// One-shot lookup, prints normalized suggestions as JSON
    Search {
        query: String,
        /// Maximum number of suggestions
        #[arg(long)]
        limit: Option<usize>,
    },
}
