use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xuanke", about = "Course-registration automation for the jsxsd academic-affairs portal")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Keep the session alive, list viable courses, optionally register
    Run {
        /// Course selection ids (jx0404id) to register for once logged in
        #[arg(short, long)]
        enroll: Vec<String>,
    },
    /// Log in once and enter the current registration round
    Login,
    /// Probe the portal and report whether the session is authenticated
    Status,
    /// Fetch all course catalogs and print the viable offerings
    Courses,
    /// Submit registration requests for the given selection ids
    Enroll {
        /// Course selection ids (jx0404id)
        course_ids: Vec<String>,
    },
    /// List the registration rounds the portal currently offers
    Rounds,
}
