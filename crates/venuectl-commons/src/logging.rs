/// Initialises the process-wide `env_logger` subscriber. Call this once
/// from the composition-root binary's `main`; library crates only log
/// through the `log` facade and never initialise a subscriber themselves.
pub fn init() {
    let _ = env_logger::try_init();
}
