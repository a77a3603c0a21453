mod domain;
mod infrastructure;
mod presentation;

use crate::domain::settings::SettingsService;
use crate::infrastructure::advisory::{
    AdvisoryCredentials, AdvisoryService, DisabledAdvisor, GeminiAdvisor,
};
use crate::infrastructure::bluetooth::connection::ConnectionConfig;
use crate::infrastructure::bluetooth::platform;
use crate::infrastructure::bluetooth::resolver::ChannelIds;
use crate::infrastructure::bluetooth::BluetoothService;
use crate::infrastructure::{haptics, logging};
use crate::presentation::app::RemoteApp;
use crate::presentation::console;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

fn api_key_from_env() -> Option<String> {
    std::env::var("GEMINI_API_KEY")
        .or_else(|_| std::env::var("API_KEY"))
        .ok()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let _logging_guard = logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting Grid Remote");

    if !settings_service.path().exists() {
        if let Err(e) = settings_service.save() {
            warn!("Could not write default settings: {}", e);
        }
    }

    let input = console::stdin_lines();
    #[cfg(windows)]
    let platform = platform::detect(Arc::new(console::ConsolePicker::new(input.clone()))).await;
    #[cfg(not(windows))]
    let platform = platform::detect();

    let channel_ids = ChannelIds::from_strings(
        &settings.transport.service_uuid,
        &settings.transport.write_char_uuid,
    )
    .unwrap_or_else(|e| {
        warn!("Invalid transport identifiers in settings ({}), using defaults", e);
        ChannelIds::default()
    });

    let (event_sender, events) = mpsc::unbounded_channel();
    let bluetooth = BluetoothService::new(
        platform,
        ConnectionConfig { channel_ids },
        event_sender.clone(),
    );

    let advisory: Arc<dyn AdvisoryService> = if settings.advisory.enabled {
        let credentials = AdvisoryCredentials::from_key(api_key_from_env());
        if credentials == AdvisoryCredentials::Missing {
            warn!("No API key set, advisory text is disabled");
        }
        match GeminiAdvisor::new(credentials, settings.advisory.clone()) {
            Ok(advisor) => Arc::new(advisor),
            Err(e) => {
                warn!("Advisory text is disabled: {:#}", e);
                Arc::new(DisabledAdvisor)
            }
        }
    } else {
        Arc::new(DisabledAdvisor)
    };

    let haptics = haptics::from_settings(settings.haptics_enabled);

    RemoteApp::new(bluetooth, event_sender, events, advisory, haptics, input)
        .run()
        .await
}
