//! `User-Agent` identifier sent with every outbound request

use std::env;
use std::sync::LazyLock;

const INTEGRATION_ENV_VAR: &str = "RUNPOD_UA_INTEGRATION";

/// Computed once per process.
pub static USER_AGENT: LazyLock<String> =
    LazyLock::new(|| build_user_agent(env::var(INTEGRATION_ENV_VAR).ok().as_deref()));

fn build_user_agent(integration: Option<&str>) -> String {
    let mut agent = format!(
        "RunPod-Rust-SDK/{} ({}; {}) Language/Rust",
        env!("CARGO_PKG_VERSION"),
        env::consts::OS,
        env::consts::ARCH,
    );

    if let Some(method) = integration.filter(|value| !value.is_empty()) {
        agent.push_str(" Integration/");
        agent.push_str(method);
    }

    agent
}
