//! Binary entry point wiring the ambient stack together (spec §6): installs
//! logging, reads [`workorder_runtime::RuntimeConfig`] from the
//! environment, and loads the recipe catalog a [`workorder_runtime::WorkOrderService`]
//! would be built around.
//!
//! This binary stops short of actually serving work orders: the LLM client
//! and SQL probe implementations, and the ingress that would accept
//! `user_text` from outside the process, are all explicit non-goals of this
//! workspace (spec §1) — an embedding application supplies those and
//! constructs its own `WorkOrderService`. What lives here is what the
//! teacher's own `main.rs` does before it gets to `actix_web::HttpServer`:
//! read configuration, fail loudly if it's wrong, and load what the rest of
//! the process needs to run.
#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

use std::path::Path;
use std::{env, process};
use tracing::info;
use workorder_recipes::RecipeStore;
use workorder_runtime::RuntimeConfig;

fn main() {
    workorder_runtime::init_tracing();

    let config = RuntimeConfig::from_env().unwrap_or_else(|err| {
        eprintln!("invalid configuration: {}", err);
        process::exit(1);
    });
    info!(
        worker_pool_size = config.worker_pool_size,
        queue_depth = config.queue_depth,
        back_pressure = %config.back_pressure,
        "runtime configuration loaded"
    );

    let recipe_dir = env::var("WORKORDER_RECIPE_DIR").unwrap_or_else(|_| "./recipes".to_owned());
    let mut catalog = RecipeStore::new();
    let status = catalog.load_directory(Path::new(&recipe_dir));
    info!(loaded = status.loaded, errors = status.errors.len(), dir = %recipe_dir, "recipe catalog loaded");
    for error in &status.errors {
        tracing::warn!(file = %error.file.display(), reason = %error.reason, "recipe failed to load");
    }

    info!("work order runtime ready; awaiting an embedding application's LlmClient and SqlProbe to begin serving work orders");
}
