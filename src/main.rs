use miot_core::app_config::AppConfig;
use miot_core::entity::plan_entities;
use miot_core::mapping::WireMapping;
use miot_core::spec::{HttpSpecSource, SpecCache};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("✅  Loaded configuration, {} device(s)", config.devices().len());

    let cache = SpecCache::new(Arc::new(HttpSpecSource::new(config.spec())?));

    let mut inspected = 0;
    for device in config.devices() {
        let spec = match cache.get_or_load(device.miot_type()).await {
            Ok(spec) => spec,
            Err(error) => {
                warn!("⚠️ Skipping '{}': {}", device.name(), error);
                continue;
            }
        };
        info!(
            "📋 {} at {} is a {} with {} service(s)",
            device.name(),
            device.host(),
            spec.description(),
            spec.services().len()
        );

        for plan in plan_entities(&spec, device) {
            let mapping = WireMapping::build(&spec, &plan.service, plan.kind.extra_services());
            info!("✨ {} '{}' maps {} propert(y/ies)", plan.kind, plan.name, mapping.len());
            for (name, entry) in mapping.iter() {
                let access = entry.access();
                info!(
                    "    {} -> {} ({}{}{})",
                    name,
                    entry.property().full_name(),
                    if access.readable { "r" } else { "-" },
                    if access.writable { "w" } else { "-" },
                    if access.notifiable { "n" } else { "-" },
                );
            }
        }
        inspected += 1;
    }

    info!("🔥 Inspected {}/{} device(s)", inspected, config.devices().len());
    Ok(())
}
