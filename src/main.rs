//! Parallel PATRICIA-trie full-text index builder and searcher.
//!
//! Binary crate entry point. All CLI logic is in `patricia_search::cli`.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    patricia_search::cli::run();
}
