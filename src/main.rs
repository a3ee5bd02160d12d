fn main() {
    #[cfg(feature = "cli")]
    oxibps::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("oxibps: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
