//! `elrep-server` is the application server for the election results
//! reporting system. It serves the public results dashboard and the
//! admin data-entry API. There is expected to be a single
//! `elrep-server` instance per deployment.
//!
//! Uses Postgres as its database server and SQLx to connect to it. See
//! the README at the repository root for more information on setup.

#![warn(
    clippy::all,
    clippy::todo,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::mem_forget,
    clippy::unused_self,
    clippy::filter_map_next,
    clippy::needless_continue,
    clippy::needless_borrow,
    clippy::match_wildcard_for_single_variants,
    clippy::if_let_mutex,
    clippy::await_holding_lock,
    clippy::match_on_vec_items,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::lossy_float_literal,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::fn_params_excessive_bools,
    clippy::exit,
    clippy::inefficient_to_string,
    clippy::linkedlist,
    clippy::macro_use_imports,
    clippy::option_option,
    clippy::verbose_file_reads,
    clippy::unnested_or_patterns,
    clippy::str_to_string,
    rust_2018_idioms,
    future_incompatible,
    nonstandard_style,
    missing_debug_implementations
)]

use clap::Parser;
use elrep_server::{app, config::Config, db, log};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
    let config = Config::parse();
    log::setup(&config)?;
    let pool = db::setup(&config).await?;

    app::run(app::setup(pool, config.clone()), &config).await
}
