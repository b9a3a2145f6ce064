use marketfeed_core::{ProviderEntry, ProviderRegistry};

pub fn run(registry: &ProviderRegistry) {
    for line in render(registry.entries()) {
        println!("{line}");
    }
}

fn render(entries: &[ProviderEntry]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<14} {:<8} {:<22} {}",
        "PROVIDER", "TIER", "CREDENTIAL", "CAPABILITIES"
    )];
    for entry in entries {
        let capabilities: Vec<&str> = entry
            .capabilities
            .supported()
            .into_iter()
            .map(|capability| capability.as_str())
            .collect();
        lines.push(format!(
            "{:<14} {:<8} {:<22} {}",
            entry.id.as_str(),
            entry.tier.as_str(),
            entry.credential_env.unwrap_or("-"),
            capabilities.join(",")
        ));
    }
    lines
}
